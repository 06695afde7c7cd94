use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::database::{Store, StoreResult};
use crate::domain::{Group, GroupChanges, GroupStatus, Material, Message, NewGroup, Session, User};
use crate::routes::user::UserSummary;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub subject: String,
    #[validate(length(min = 1, max = 2000, message = "must be 1 to 2000 characters"))]
    pub description: String,
    pub image: Option<String>,
    #[validate(range(min = 1, max = 1000, message = "must be between 1 and 1000"))]
    pub max_members: Option<u32>,
}

impl From<CreateGroupRequest> for NewGroup {
    fn from(req: CreateGroupRequest) -> Self {
        Self {
            title: req.title,
            subject: req.subject,
            description: req.description,
            image: req.image,
            max_members: req.max_members,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 2000, message = "must be 1 to 2000 characters"))]
    pub description: Option<String>,
    pub image: Option<String>,
    #[validate(range(min = 1, max = 1000, message = "must be between 1 and 1000"))]
    pub max_members: Option<u32>,
}

impl From<UpdateGroupRequest> for GroupChanges {
    fn from(req: UpdateGroupRequest) -> Self {
        Self {
            title: req.title,
            subject: req.subject,
            description: req.description,
            image: req.image,
            max_members: req.max_members,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PostMessageRequest {
    #[validate(length(min = 1, max = 2000, message = "must be 1 to 2000 characters"))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddMaterialRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub title: String,
    #[validate(url(message = "must be a valid URL"))]
    pub url: String,
}

/// Listing entry; no messages or materials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub description: String,
    pub image: String,
    pub creator: Option<UserSummary>,
    pub member_count: usize,
    pub max_members: u32,
    pub status: GroupStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    pub user: Option<UserSummary>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialView {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub uploaded_by: Option<UserSummary>,
    pub uploaded_at: DateTime<Utc>,
}

/// Single group with people resolved, as seen by one session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub description: String,
    pub image: String,
    pub creator: Option<UserSummary>,
    pub members: Vec<UserSummary>,
    pub messages: Vec<MessageView>,
    pub materials: Vec<MaterialView>,
    pub status: GroupStatus,
    pub max_members: u32,
    pub member_count: usize,
    pub is_member: bool,
    pub is_creator: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

type People = HashMap<Uuid, User>;

async fn load_people(store: &dyn Store, ids: HashSet<Uuid>) -> StoreResult<People> {
    let ids: Vec<Uuid> = ids.into_iter().collect();
    Ok(store
        .find_users(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect())
}

fn summary_of(people: &People, id: Uuid) -> Option<UserSummary> {
    people.get(&id).map(UserSummary::from)
}

impl GroupSummary {
    fn build(group: &Group, people: &People) -> Self {
        Self {
            id: group.id,
            title: group.title.clone(),
            subject: group.subject.clone(),
            description: group.description.clone(),
            image: group.image.clone(),
            creator: summary_of(people, group.creator),
            member_count: group.members.len(),
            max_members: group.max_members,
            status: group.status,
            created_at: group.created_at,
        }
    }

    /// Summaries for `groups`, keeping their order, with creators resolved in
    /// one store lookup.
    pub async fn list(store: &dyn Store, groups: &[Group]) -> StoreResult<Vec<Self>> {
        let creators = groups.iter().map(|g| g.creator).collect();
        let people = load_people(store, creators).await?;
        Ok(groups.iter().map(|g| Self::build(g, &people)).collect())
    }

    pub async fn one(store: &dyn Store, group: &Group) -> StoreResult<Self> {
        let people = load_people(store, HashSet::from([group.creator])).await?;
        Ok(Self::build(group, &people))
    }
}

impl GroupDetail {
    pub async fn load(store: &dyn Store, group: &Group, viewer: &Session) -> StoreResult<Self> {
        let mut ids: HashSet<Uuid> = group.members.iter().copied().collect();
        ids.insert(group.creator);
        ids.extend(group.messages.iter().map(|m| m.sender));
        ids.extend(group.materials.iter().map(|m| m.uploaded_by));
        let people = load_people(store, ids).await?;

        let message_view = |m: &Message| MessageView {
            id: m.id,
            user: summary_of(&people, m.sender),
            content: m.content.clone(),
            timestamp: m.timestamp,
        };
        let material_view = |m: &Material| MaterialView {
            id: m.id,
            title: m.title.clone(),
            url: m.url.clone(),
            uploaded_by: summary_of(&people, m.uploaded_by),
            uploaded_at: m.uploaded_at,
        };

        Ok(Self {
            id: group.id,
            title: group.title.clone(),
            subject: group.subject.clone(),
            description: group.description.clone(),
            image: group.image.clone(),
            creator: summary_of(&people, group.creator),
            members: group
                .members
                .iter()
                .filter_map(|id| summary_of(&people, *id))
                .collect(),
            messages: group.messages.iter().map(message_view).collect(),
            materials: group.materials.iter().map(material_view).collect(),
            status: group.status,
            max_members: group.max_members,
            member_count: group.members.len(),
            is_member: group.is_member(viewer.user_id),
            is_creator: group.is_creator(viewer.user_id),
            created_at: group.created_at,
            updated_at: group.updated_at,
        })
    }
}
