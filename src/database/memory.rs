// In-process store
// Used when no DATABASE_URL is configured, and by the test suite

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CascadeSummary, Store, StoreError, StoreResult};
use crate::domain::{Group, GroupStatus, User};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    groups: RwLock<HashMap<Uuid, Group>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut groups: Vec<Group>) -> Vec<Group> {
    groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    groups
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::DuplicateEmail);
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete_user_cascade(&self, id: Uuid) -> StoreResult<Option<CascadeSummary>> {
        // users before groups, same order everywhere
        let mut users = self.users.write().await;
        let mut groups = self.groups.write().await;

        if users.remove(&id).is_none() {
            return Ok(None);
        }

        let before = groups.len();
        groups.retain(|_, g| g.creator != id);
        let groups_deleted = before - groups.len();

        let groups_updated = groups
            .values_mut()
            .map(|g| g.purge_user(id))
            .filter(|changed| *changed)
            .count();

        Ok(Some(CascadeSummary {
            groups_deleted,
            groups_updated,
        }))
    }

    async fn insert_group(&self, group: &Group) -> StoreResult<()> {
        self.groups.write().await.insert(group.id, group.clone());
        Ok(())
    }

    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>> {
        Ok(self.groups.read().await.get(&id).cloned())
    }

    async fn list_groups(&self, status: Option<GroupStatus>) -> StoreResult<Vec<Group>> {
        let groups = self
            .groups
            .read()
            .await
            .values()
            .filter(|g| status.is_none_or(|s| g.status == s))
            .cloned()
            .collect();
        Ok(newest_first(groups))
    }

    async fn groups_with_member(&self, user_id: Uuid) -> StoreResult<Vec<Group>> {
        let groups = self
            .groups
            .read()
            .await
            .values()
            .filter(|g| g.is_member(user_id))
            .cloned()
            .collect();
        Ok(newest_first(groups))
    }

    async fn groups_created_by(&self, user_id: Uuid) -> StoreResult<Vec<Group>> {
        let groups = self
            .groups
            .read()
            .await
            .values()
            .filter(|g| g.is_creator(user_id))
            .cloned()
            .collect();
        Ok(newest_first(groups))
    }

    async fn save_group(&self, group: &Group) -> StoreResult<()> {
        self.groups.write().await.insert(group.id, group.clone());
        Ok(())
    }

    async fn delete_group(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.groups.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewGroup, Role};

    fn user(email: &str) -> User {
        User::new("Test", email, "000", "hash".into(), Role::User)
    }

    fn group(creator: Uuid, title: &str) -> Group {
        Group::new(
            NewGroup {
                title: title.into(),
                subject: "Physics".into(),
                description: "Mechanics".into(),
                ..Default::default()
            },
            creator,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let store = MemoryStore::new();
        store.insert_user(&user("a@example.com")).await.unwrap();
        let err = store.insert_user(&user("A@EXAMPLE.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert!(
            store
                .find_user_by_email("A@example.com")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn list_groups_filters_by_status() {
        let store = MemoryStore::new();
        let creator = Uuid::new_v4();
        let pending = group(creator, "Pending");
        let mut approved = group(creator, "Approved");
        approved.review(GroupStatus::Approved).unwrap();
        store.insert_group(&pending).await.unwrap();
        store.insert_group(&approved).await.unwrap();

        let listed = store.list_groups(Some(GroupStatus::Approved)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, approved.id);
        assert_eq!(store.list_groups(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_user_cascades_through_groups() {
        let store = MemoryStore::new();
        let owner = user("owner@example.com");
        let doomed = user("doomed@example.com");
        store.insert_user(&owner).await.unwrap();
        store.insert_user(&doomed).await.unwrap();

        let mut kept = group(owner.id, "Kept");
        kept.review(GroupStatus::Approved).unwrap();
        kept.join(doomed.id).unwrap();
        kept.post_message(doomed.id, "hello").unwrap();
        store.insert_group(&kept).await.unwrap();
        let created = group(doomed.id, "Owned by doomed");
        store.insert_group(&created).await.unwrap();

        let summary = store.delete_user_cascade(doomed.id).await.unwrap().unwrap();
        assert_eq!(
            summary,
            CascadeSummary {
                groups_deleted: 1,
                groups_updated: 1
            }
        );
        assert!(store.find_group(created.id).await.unwrap().is_none());
        let kept = store.find_group(kept.id).await.unwrap().unwrap();
        assert!(!kept.is_member(doomed.id));
        assert!(kept.messages.is_empty());
        assert!(store.find_user(doomed.id).await.unwrap().is_none());
        assert!(store.delete_user_cascade(doomed.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn created_groups_do_not_depend_on_membership() {
        let store = MemoryStore::new();
        let owner = user("owner@example.com");
        let mut owned = group(owner.id, "Owned");
        // creator no longer listed as a member
        owned.members.clear();
        store.insert_group(&owned).await.unwrap();
        store.insert_group(&group(Uuid::new_v4(), "Other")).await.unwrap();

        let created = store.groups_created_by(owner.id).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].id, owned.id);
        assert!(store.groups_with_member(owner.id).await.unwrap().is_empty());
    }
}
