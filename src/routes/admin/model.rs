use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::notify::GroupStatusNotification;
use crate::routes::group::GroupSummary;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub message: String,
    pub group: GroupSummary,
    /// Absent when the creator account no longer exists.
    pub notification_data: Option<GroupStatusNotification>,
    pub notification_sent: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NotifyUsersRequest {
    /// Every active non-admin user when omitted or empty.
    pub user_ids: Option<Vec<Uuid>>,
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub subject: String,
    #[validate(length(min = 1, max = 5000, message = "must be 1 to 5000 characters"))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct NotifyUsersResponse {
    pub sent: usize,
    pub failed: usize,
    pub total: usize,
}
