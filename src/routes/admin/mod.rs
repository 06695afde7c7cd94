mod handler;
mod model;

pub use handler::{
    all_groups, approve_group, approved_groups, group_users, notify_users, reject_group,
    users_for_notification,
};
