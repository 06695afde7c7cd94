mod handler;
mod model;

pub use handler::{admin_login, login, register};
