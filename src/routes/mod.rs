use axum::{
    Json, Router,
    extract::{FromRequest, Request},
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::AppError,
    middleware::{auth_middleware, log_errors},
};

pub mod admin;
pub mod auth;
pub mod group;
pub mod user;

/// JSON body that is deserialized and then checked with `validator`.
/// Malformed bodies become a 400 with the usual error payload.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Path ids that are not UUIDs cannot name an existing resource.
pub(crate) fn parse_id(raw: &str, resource: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("{} not found", resource)))
}

#[derive(serde::Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

async fn health() -> impl IntoResponse {
    MessageResponse::new("Study Group Finder API is working!")
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".into())
}

pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/test", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/admin/login", post(auth::admin_login))
        .route("/groups", get(group::list_groups));

    let protected_routes = Router::new()
        // groups
        .route("/groups", post(group::create_group))
        .route(
            "/groups/{id}",
            get(group::get_group)
                .put(group::update_group)
                .delete(group::delete_group),
        )
        .route("/groups/{id}/join", post(group::join_group))
        .route("/groups/{id}/leave", post(group::leave_group))
        .route("/groups/{id}/messages", post(group::post_message))
        .route("/groups/{id}/materials", post(group::add_material))
        // users
        .route(
            "/users/profile",
            get(user::get_profile).put(user::update_profile),
        )
        .route("/users", get(user::list_users))
        .route("/users/{id}/block", put(user::block_user))
        .route("/users/{id}/unblock", put(user::unblock_user))
        .route("/users/{id}", axum::routing::delete(user::delete_user))
        // admin
        .route("/admin/groups", get(admin::all_groups))
        .route("/admin/approved-groups", get(admin::approved_groups))
        .route(
            "/admin/users-for-notification",
            get(admin::users_for_notification),
        )
        .route("/admin/groups/{id}/users", get(admin::group_users))
        .route("/admin/groups/{id}/approve", put(admin::approve_group))
        .route("/admin/groups/{id}/reject", put(admin::reject_group))
        .route("/admin/notifications", post(admin::notify_users))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = Router::new().merge(public_routes).merge(protected_routes);
    let base = state.config.api_base_uri.trim_end_matches('/').to_string();
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(&base, api)
    };

    router
        .fallback(not_found)
        .layer(axum::middleware::from_fn(log_errors))
        .with_state(state)
}
