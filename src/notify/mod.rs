// Notification collaborator
// Group status changes and admin notices are handed to a Notifier; delivery
// itself (email) happens outside this service

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{Group, GroupStatus, User};

/// Payload sent to a group's creator after approval or rejection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatusNotification {
    pub user_email: String,
    pub user_name: String,
    pub group_title: String,
    pub group_subject: String,
    pub group_description: String,
    pub status: GroupStatus,
}

impl GroupStatusNotification {
    pub fn new(group: &Group, creator: &User) -> Self {
        Self {
            user_email: creator.email.clone(),
            user_name: creator.name.clone(),
            group_title: group.title.clone(),
            group_subject: group.subject.clone(),
            group_description: group.description.clone(),
            status: group.status,
        }
    }
}

/// Free-form notice from an admin to one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotice {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("notification endpoint returned {0}")]
    Status(reqwest::StatusCode),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn group_status_changed(
        &self,
        notification: &GroupStatusNotification,
    ) -> Result<(), NotifyError>;

    async fn send_notice(&self, notice: &UserNotice) -> Result<(), NotifyError>;
}

/// Writes notifications to the log only.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn group_status_changed(
        &self,
        notification: &GroupStatusNotification,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            "Group '{}' is now {}, notify {}",
            notification.group_title,
            notification.status,
            notification.user_email
        );
        Ok(())
    }

    async fn send_notice(&self, notice: &UserNotice) -> Result<(), NotifyError> {
        tracing::info!("Notice '{}' for {}", notice.subject, notice.to_email);
        Ok(())
    }
}

/// POSTs each notification as JSON to a webhook that relays it as email.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn post(&self, body: serde_json::Value) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(&body).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(NotifyError::Status(response.status()))
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn group_status_changed(
        &self,
        notification: &GroupStatusNotification,
    ) -> Result<(), NotifyError> {
        self.post(serde_json::json!({
            "kind": "groupStatus",
            "data": notification,
        }))
        .await
    }

    async fn send_notice(&self, notice: &UserNotice) -> Result<(), NotifyError> {
        self.post(serde_json::json!({
            "kind": "notice",
            "data": notice,
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewGroup, Role};

    #[test]
    fn status_notification_serializes_in_camel_case() {
        let creator = User::new("Ada", "ada@example.com", "", "x".into(), Role::User);
        let mut group = Group::new(
            NewGroup {
                title: "Algorithms".into(),
                subject: "CS".into(),
                description: "Graphs".into(),
                ..Default::default()
            },
            creator.id,
        )
        .unwrap();
        group.review(GroupStatus::Approved).unwrap();

        let json = serde_json::to_value(GroupStatusNotification::new(&group, &creator)).unwrap();
        assert_eq!(json["userEmail"], "ada@example.com");
        assert_eq!(json["groupTitle"], "Algorithms");
        assert_eq!(json["status"], "approved");
    }
}
