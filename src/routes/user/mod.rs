mod handler;
mod model;

pub use handler::{
    block_user, delete_user, get_profile, list_users, unblock_user, update_profile,
};
pub use model::{UserInfo, UserSummary};
