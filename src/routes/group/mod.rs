mod handler;
mod model;

pub(crate) use handler::load_group;
pub use handler::{
    add_material, create_group, delete_group, get_group, join_group, leave_group, list_groups,
    post_message, update_group,
};
pub use model::{GroupDetail, GroupSummary, MaterialView, MessageView};
