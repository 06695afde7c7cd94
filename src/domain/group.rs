use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DomainError;

pub const DEFAULT_IMAGE: &str = "https://via.placeholder.com/300x200?text=Study+Group";
pub const DEFAULT_MAX_MEMBERS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    Pending,
    Approved,
    Rejected,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Pending => "pending",
            GroupStatus::Approved => "approved",
            GroupStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, GroupStatus::Pending)
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(GroupStatus::Pending),
            "approved" => Ok(GroupStatus::Approved),
            "rejected" => Ok(GroupStatus::Rejected),
            other => Err(format!("unknown group status: {}", other)),
        }
    }
}

/// A chat message embedded in a group document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender: Uuid,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A shared study material link embedded in a group document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewGroup {
    pub title: String,
    pub subject: String,
    pub description: String,
    pub image: Option<String>,
    pub max_members: Option<u32>,
}

/// Partial update applied by the creator or an admin.
#[derive(Debug, Clone, Default)]
pub struct GroupChanges {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub max_members: Option<u32>,
}

/// Outcome of an approve/reject decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Review {
    pub previous: GroupStatus,
    pub current: GroupStatus,
}

impl Review {
    /// True when the group had already left `pending` before this decision.
    pub fn is_retransition(&self) -> bool {
        self.previous.is_terminal()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub description: String,
    pub image: String,
    pub creator: Uuid,
    /// Ordered by join time, creator first.
    pub members: Vec<Uuid>,
    pub messages: Vec<Message>,
    pub materials: Vec<Material>,
    pub status: GroupStatus,
    pub max_members: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn new(draft: NewGroup, creator: Uuid) -> Result<Self, DomainError> {
        let title = required(&draft.title, "title")?;
        let subject = required(&draft.subject, "subject")?;
        let description = required(&draft.description, "description")?;
        let max_members = draft.max_members.unwrap_or(DEFAULT_MAX_MEMBERS);
        if max_members == 0 {
            return Err(DomainError::Invalid(
                "maxMembers must be at least 1".to_string(),
            ));
        }
        let image = draft
            .image
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| DEFAULT_IMAGE.to_string());

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            title,
            subject,
            description,
            image,
            creator,
            members: vec![creator],
            messages: Vec::new(),
            materials: Vec::new(),
            status: GroupStatus::Pending,
            max_members,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    pub fn is_creator(&self, user_id: Uuid) -> bool {
        self.creator == user_id
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_members as usize
    }

    pub fn is_public(&self) -> bool {
        self.status == GroupStatus::Approved
    }

    pub fn join(&mut self, user_id: Uuid) -> Result<(), DomainError> {
        if !self.is_public() {
            return Err(DomainError::GroupNotFound);
        }
        if self.is_member(user_id) {
            return Err(DomainError::AlreadyMember);
        }
        if self.is_full() {
            return Err(DomainError::CapacityExceeded);
        }
        self.members.push(user_id);
        self.touch();
        Ok(())
    }

    pub fn leave(&mut self, user_id: Uuid) -> Result<(), DomainError> {
        if !self.is_member(user_id) {
            return Err(DomainError::NotAMember);
        }
        if self.is_creator(user_id) {
            return Err(DomainError::CreatorCannotLeave);
        }
        self.members.retain(|m| *m != user_id);
        self.touch();
        Ok(())
    }

    pub fn post_message(&mut self, sender: Uuid, content: &str) -> Result<&Message, DomainError> {
        if !self.is_member(sender) {
            return Err(DomainError::NotAMember);
        }
        let content = required(content, "content")?;
        let now = Utc::now();
        self.messages.push(Message {
            id: Uuid::new_v4(),
            sender,
            content,
            timestamp: now,
        });
        self.updated_at = now;
        Ok(&self.messages[self.messages.len() - 1])
    }

    pub fn add_material(
        &mut self,
        uploader: Uuid,
        title: &str,
        url: &str,
    ) -> Result<&Material, DomainError> {
        if !self.is_member(uploader) {
            return Err(DomainError::NotAMember);
        }
        let title = required(title, "title")?;
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(DomainError::Invalid(
                "url must be an http or https link".to_string(),
            ));
        }
        let now = Utc::now();
        self.materials.push(Material {
            id: Uuid::new_v4(),
            title,
            url: url.to_string(),
            uploaded_by: uploader,
            uploaded_at: now,
        });
        self.updated_at = now;
        Ok(&self.materials[self.materials.len() - 1])
    }

    pub fn apply_changes(&mut self, changes: GroupChanges) -> Result<(), DomainError> {
        if let Some(max) = changes.max_members {
            if max == 0 {
                return Err(DomainError::Invalid(
                    "maxMembers must be at least 1".to_string(),
                ));
            }
            if (max as usize) < self.members.len() {
                return Err(DomainError::Invalid(format!(
                    "maxMembers cannot be lower than the current member count ({})",
                    self.members.len()
                )));
            }
        }
        let title = changes.title.as_deref().map(|t| required(t, "title")).transpose()?;
        let subject = changes.subject.as_deref().map(|s| required(s, "subject")).transpose()?;
        let description = changes
            .description
            .as_deref()
            .map(|d| required(d, "description"))
            .transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(subject) = subject {
            self.subject = subject;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(image) = changes.image {
            let image = image.trim();
            self.image = if image.is_empty() {
                DEFAULT_IMAGE.to_string()
            } else {
                image.to_string()
            };
        }
        if let Some(max) = changes.max_members {
            self.max_members = max;
        }
        self.touch();
        Ok(())
    }

    /// Moves the group to `approved` or `rejected`. A decision on a group that
    /// already left `pending` is accepted and overwrites the earlier one.
    pub fn review(&mut self, decision: GroupStatus) -> Result<Review, DomainError> {
        if decision == GroupStatus::Pending {
            return Err(DomainError::Invalid(
                "a group can only be approved or rejected".to_string(),
            ));
        }
        let previous = self.status;
        self.status = decision;
        self.touch();
        Ok(Review {
            previous,
            current: decision,
        })
    }

    /// Drops every trace of `user_id` from this group: membership, messages
    /// and materials. Returns whether anything changed.
    pub fn purge_user(&mut self, user_id: Uuid) -> bool {
        let before = (self.members.len(), self.messages.len(), self.materials.len());
        self.members.retain(|m| *m != user_id);
        self.messages.retain(|m| m.sender != user_id);
        self.materials.retain(|m| m.uploaded_by != user_id);
        let changed = before != (self.members.len(), self.messages.len(), self.materials.len());
        if changed {
            self.touch();
        }
        changed
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn required(value: &str, field: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        Err(DomainError::Invalid(format!("{} is required", field)))
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(max_members: Option<u32>) -> NewGroup {
        NewGroup {
            title: "Linear Algebra".into(),
            subject: "Math".into(),
            description: "Weekly problem sets".into(),
            image: None,
            max_members,
        }
    }

    fn approved_group(creator: Uuid, max_members: u32) -> Group {
        let mut group = Group::new(draft(Some(max_members)), creator).unwrap();
        group.review(GroupStatus::Approved).unwrap();
        group
    }

    #[test]
    fn new_group_is_pending_with_creator_as_member() {
        let creator = Uuid::new_v4();
        let group = Group::new(draft(None), creator).unwrap();
        assert_eq!(group.status, GroupStatus::Pending);
        assert_eq!(group.members, vec![creator]);
        assert_eq!(group.max_members, DEFAULT_MAX_MEMBERS);
        assert_eq!(group.image, DEFAULT_IMAGE);
    }

    #[test]
    fn new_group_rejects_blank_fields_and_zero_capacity() {
        let creator = Uuid::new_v4();
        let mut blank = draft(None);
        blank.subject = "   ".into();
        assert_eq!(
            Group::new(blank, creator),
            Err(DomainError::Invalid("subject is required".into()))
        );
        assert!(matches!(
            Group::new(draft(Some(0)), creator),
            Err(DomainError::Invalid(_))
        ));
    }

    #[test]
    fn join_into_full_group_is_capacity_exceeded() {
        let creator = Uuid::new_v4();
        let mut group = approved_group(creator, 1);
        assert_eq!(group.join(Uuid::new_v4()), Err(DomainError::CapacityExceeded));
        assert_eq!(group.members.len(), 1);
    }

    #[test]
    fn members_never_exceed_capacity() {
        let mut group = approved_group(Uuid::new_v4(), 3);
        for _ in 0..10 {
            let _ = group.join(Uuid::new_v4());
            assert!(group.members.len() <= group.max_members as usize);
        }
        assert_eq!(group.members.len(), 3);
    }

    #[test]
    fn join_twice_is_already_member() {
        let mut group = approved_group(Uuid::new_v4(), 5);
        let user = Uuid::new_v4();
        group.join(user).unwrap();
        assert_eq!(group.join(user), Err(DomainError::AlreadyMember));
    }

    #[test]
    fn join_requires_approved_group() {
        let mut group = Group::new(draft(None), Uuid::new_v4()).unwrap();
        assert_eq!(group.join(Uuid::new_v4()), Err(DomainError::GroupNotFound));
        group.review(GroupStatus::Rejected).unwrap();
        assert_eq!(group.join(Uuid::new_v4()), Err(DomainError::GroupNotFound));
    }

    #[test]
    fn creator_cannot_leave() {
        let creator = Uuid::new_v4();
        let mut group = approved_group(creator, 5);
        assert_eq!(group.leave(creator), Err(DomainError::CreatorCannotLeave));
        assert!(group.is_member(creator));
    }

    #[test]
    fn leave_by_non_member_fails_and_member_leaves() {
        let mut group = approved_group(Uuid::new_v4(), 5);
        let user = Uuid::new_v4();
        assert_eq!(group.leave(user), Err(DomainError::NotAMember));
        group.join(user).unwrap();
        group.leave(user).unwrap();
        assert!(!group.is_member(user));
    }

    #[test]
    fn only_members_post_messages_and_materials() {
        let creator = Uuid::new_v4();
        let mut group = approved_group(creator, 5);
        let outsider = Uuid::new_v4();
        assert_eq!(
            group.post_message(outsider, "hi").unwrap_err(),
            DomainError::NotAMember
        );
        assert_eq!(
            group
                .add_material(outsider, "Notes", "https://example.com")
                .unwrap_err(),
            DomainError::NotAMember
        );

        group.post_message(creator, "first").unwrap();
        group.post_message(creator, "second").unwrap();
        let contents: Vec<_> = group.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second"]);

        let material = group
            .add_material(creator, "Notes", "https://example.com/notes.pdf")
            .unwrap();
        assert_eq!(material.uploaded_by, creator);
    }

    #[test]
    fn material_url_must_be_http() {
        let creator = Uuid::new_v4();
        let mut group = approved_group(creator, 5);
        assert!(matches!(
            group.add_material(creator, "Notes", "ftp://example.com/x"),
            Err(DomainError::Invalid(_))
        ));
        assert!(matches!(
            group.post_message(creator, "   "),
            Err(DomainError::Invalid(_))
        ));
    }

    #[test]
    fn max_members_cannot_drop_below_member_count() {
        let mut group = approved_group(Uuid::new_v4(), 5);
        group.join(Uuid::new_v4()).unwrap();
        let changes = GroupChanges {
            max_members: Some(1),
            ..Default::default()
        };
        assert!(matches!(group.apply_changes(changes), Err(DomainError::Invalid(_))));
        assert_eq!(group.max_members, 5);

        let changes = GroupChanges {
            title: Some("Calculus".into()),
            max_members: Some(2),
            ..Default::default()
        };
        group.apply_changes(changes).unwrap();
        assert_eq!(group.title, "Calculus");
        assert_eq!(group.max_members, 2);
    }

    #[test]
    fn review_records_retransitions() {
        let mut group = Group::new(draft(None), Uuid::new_v4()).unwrap();
        let first = group.review(GroupStatus::Approved).unwrap();
        assert!(!first.is_retransition());
        let second = group.review(GroupStatus::Rejected).unwrap();
        assert!(second.is_retransition());
        assert_eq!(second.previous, GroupStatus::Approved);
        assert_eq!(group.status, GroupStatus::Rejected);
        assert!(group.review(GroupStatus::Pending).is_err());
    }

    #[test]
    fn purge_user_strips_membership_and_authorship() {
        let creator = Uuid::new_v4();
        let user = Uuid::new_v4();
        let mut group = approved_group(creator, 5);
        group.join(user).unwrap();
        group.post_message(user, "bye").unwrap();
        group.post_message(creator, "stay").unwrap();
        group.add_material(user, "Slides", "https://example.com/s").unwrap();

        assert!(group.purge_user(user));
        assert!(!group.is_member(user));
        assert_eq!(group.messages.len(), 1);
        assert!(group.materials.is_empty());
        assert!(!group.purge_user(user));
    }
}
