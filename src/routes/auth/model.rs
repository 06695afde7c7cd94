use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::routes::user::UserInfo;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 32, message = "must be at most 32 characters"))]
    pub contact_number: String,
    #[validate(length(min = 6, max = 128, message = "must be 6 to 128 characters"))]
    pub password: String,
    #[serde(default)]
    pub terms_accepted: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub expires_at: i64,
    pub user: UserInfo,
}
