// Authorization gate
// Every role or ownership check goes through `Session::authorize`

use uuid::Uuid;

use super::{DomainError, Group, Role, User};

/// The authenticated caller, resolved from a bearer token on every request.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: Uuid,
    pub role: Role,
    pub name: String,
    pub email: String,
}

/// Something a session may be allowed to do.
#[derive(Debug, Clone, Copy)]
pub enum Capability<'a> {
    /// Read a single group. Non-approved groups are only visible to their
    /// creator and to admins.
    ViewGroup(&'a Group),
    EditGroup(&'a Group),
    DeleteGroup(&'a Group),
    /// Post messages or share materials. Requires membership of a group the
    /// session can see.
    PostToGroup(&'a Group),
    /// Approve or reject groups.
    ReviewGroup,
    /// List groups of every status.
    ViewAllGroups,
    /// List, block, unblock and delete users; send notices.
    ManageUsers,
}

impl Session {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn authorize(&self, capability: Capability<'_>) -> Result<(), DomainError> {
        let allowed = match capability {
            Capability::ViewGroup(group) => {
                if group.is_public() || self.owns_or_moderates(group) {
                    true
                } else {
                    return Err(DomainError::GroupNotFound);
                }
            }
            Capability::EditGroup(group) | Capability::DeleteGroup(group) => {
                self.owns_or_moderates(group)
            }
            Capability::PostToGroup(group) => {
                self.authorize(Capability::ViewGroup(group))?;
                if !group.is_member(self.user_id) {
                    tracing::debug!("user {} is not a member of {}", self.user_id, group.id);
                    return Err(DomainError::NotAMember);
                }
                true
            }
            Capability::ReviewGroup | Capability::ViewAllGroups | Capability::ManageUsers => {
                self.is_admin()
            }
        };

        if allowed {
            Ok(())
        } else {
            tracing::debug!("user {} denied {}", self.user_id, capability_name(&capability));
            Err(DomainError::Unauthorized)
        }
    }

    fn owns_or_moderates(&self, group: &Group) -> bool {
        self.is_admin() || group.is_creator(self.user_id)
    }
}

fn capability_name(capability: &Capability<'_>) -> &'static str {
    match capability {
        Capability::ViewGroup(_) => "view_group",
        Capability::EditGroup(_) => "edit_group",
        Capability::DeleteGroup(_) => "delete_group",
        Capability::PostToGroup(_) => "post_to_group",
        Capability::ReviewGroup => "review_group",
        Capability::ViewAllGroups => "view_all_groups",
        Capability::ManageUsers => "manage_users",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupStatus, NewGroup};

    fn session(role: Role) -> Session {
        Session {
            user_id: Uuid::new_v4(),
            role,
            name: "someone".into(),
            email: "someone@example.com".into(),
        }
    }

    fn group_by(creator: Uuid) -> Group {
        Group::new(
            NewGroup {
                title: "Rust".into(),
                subject: "CS".into(),
                description: "Ownership drills".into(),
                ..Default::default()
            },
            creator,
        )
        .unwrap()
    }

    #[test]
    fn creator_and_admin_may_edit_and_delete() {
        let owner = session(Role::User);
        let admin = session(Role::Admin);
        let stranger = session(Role::User);
        let group = group_by(owner.user_id);

        for s in [&owner, &admin] {
            assert_eq!(s.authorize(Capability::EditGroup(&group)), Ok(()));
            assert_eq!(s.authorize(Capability::DeleteGroup(&group)), Ok(()));
        }
        assert_eq!(
            stranger.authorize(Capability::EditGroup(&group)),
            Err(DomainError::Unauthorized)
        );
        assert_eq!(
            stranger.authorize(Capability::DeleteGroup(&group)),
            Err(DomainError::Unauthorized)
        );
    }

    #[test]
    fn pending_group_is_hidden_from_strangers() {
        let owner = session(Role::User);
        let stranger = session(Role::User);
        let mut group = group_by(owner.user_id);

        assert_eq!(owner.authorize(Capability::ViewGroup(&group)), Ok(()));
        assert_eq!(session(Role::Admin).authorize(Capability::ViewGroup(&group)), Ok(()));
        assert_eq!(
            stranger.authorize(Capability::ViewGroup(&group)),
            Err(DomainError::GroupNotFound)
        );

        group.review(GroupStatus::Approved).unwrap();
        assert_eq!(stranger.authorize(Capability::ViewGroup(&group)), Ok(()));
    }

    #[test]
    fn admin_capabilities_require_admin_role() {
        let user = session(Role::User);
        let admin = session(Role::Admin);
        for capability in [
            Capability::ReviewGroup,
            Capability::ViewAllGroups,
            Capability::ManageUsers,
        ] {
            assert_eq!(user.authorize(capability), Err(DomainError::Unauthorized));
            assert_eq!(admin.authorize(capability), Ok(()));
        }
    }

    #[test]
    fn posting_needs_membership_of_a_visible_group() {
        let owner = session(Role::User);
        let member = session(Role::User);
        let stranger = session(Role::User);
        let mut group = group_by(owner.user_id);
        group.review(GroupStatus::Approved).unwrap();
        group.join(member.user_id).unwrap();

        assert_eq!(member.authorize(Capability::PostToGroup(&group)), Ok(()));
        assert_eq!(owner.authorize(Capability::PostToGroup(&group)), Ok(()));
        assert_eq!(
            stranger.authorize(Capability::PostToGroup(&group)),
            Err(DomainError::NotAMember)
        );

        // a rejected group disappears for everyone but its creator and admins
        group.review(GroupStatus::Rejected).unwrap();
        assert_eq!(
            member.authorize(Capability::PostToGroup(&group)),
            Err(DomainError::GroupNotFound)
        );
        assert_eq!(owner.authorize(Capability::PostToGroup(&group)), Ok(()));
    }
}
