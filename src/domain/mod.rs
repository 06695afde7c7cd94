// Domain model
// Group and user documents, membership rules and the authorization gate

pub mod authority;
pub mod group;
pub mod user;

use thiserror::Error;

pub use authority::{Capability, Session};
pub use group::{Group, GroupChanges, GroupStatus, Material, Message, NewGroup, Review};
pub use user::{Role, User};

/// Failures raised by the membership and moderation rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Group is full")]
    CapacityExceeded,
    #[error("Already a member of this group")]
    AlreadyMember,
    #[error("Not a member of this group")]
    NotAMember,
    #[error("Group creator cannot leave the group")]
    CreatorCannotLeave,
    #[error("Not authorized to perform this action")]
    Unauthorized,
    #[error("Group not found")]
    GroupNotFound,
    #[error("{0}")]
    Invalid(String),
}
