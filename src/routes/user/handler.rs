use axum::{
    extract::{Extension, Json, Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    domain::{Capability, Session, User},
    error::AppError,
    routes::{ValidatedJson, group::GroupSummary, parse_id},
};

use super::model::{
    DeleteUserResponse, ProfileResponse, UpdateProfileRequest, UserInfo, UserResponse,
};

async fn load_user(state: &AppState, id: Uuid) -> Result<User, AppError> {
    state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Admin actions that target another account, never the caller's own.
fn target_other(session: &Session, raw_id: &str) -> Result<Uuid, AppError> {
    session.authorize(Capability::ManageUsers)?;
    let id = parse_id(raw_id, "User")?;
    if id == session.user_id {
        return Err(AppError::Validation(
            "Admins cannot perform this action on their own account".to_string(),
        ));
    }
    Ok(id)
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(&state, session.user_id).await?;

    let joined = state.store.groups_with_member(user.id).await?;
    let created = state.store.groups_created_by(user.id).await?;

    Ok(Json(ProfileResponse {
        user: UserInfo::from(&user),
        joined_groups: GroupSummary::list(state.store.as_ref(), &joined).await?,
        created_groups: GroupSummary::list(state.store.as_ref(), &created).await?,
    }))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Validation("name cannot be blank".to_string()));
    }

    let mut user = load_user(&state, session.user_id).await?;
    user.update_profile(req.name.as_deref(), req.contact_number.as_deref());
    state.store.save_user(&user).await?;
    // creator names appear in the cached listing
    state.invalidate_group_listing().await;

    tracing::info!("User {} updated profile", user.id);
    Ok(Json(UserResponse {
        message: "Profile updated successfully".to_string(),
        user: UserInfo::from(&user),
    }))
}

/// All accounts (admin)
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    session.authorize(Capability::ManageUsers)?;
    let users = state.store.list_users().await?;
    Ok(Json(users.iter().map(UserInfo::from).collect::<Vec<_>>()))
}

async fn set_blocked(
    state: &AppState,
    session: &Session,
    raw_id: &str,
    blocked: bool,
) -> Result<Json<UserResponse>, AppError> {
    let id = target_other(session, raw_id)?;
    let mut user = load_user(state, id).await?;
    user.set_blocked(blocked);
    state.store.save_user(&user).await?;

    let verb = if blocked { "blocked" } else { "unblocked" };
    tracing::info!("Admin {} {} user {}", session.user_id, verb, user.id);
    Ok(Json(UserResponse {
        message: format!("User {} successfully", verb),
        user: UserInfo::from(&user),
    }))
}

#[axum::debug_handler]
pub async fn block_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    set_blocked(&state, &session, &id, true).await
}

#[axum::debug_handler]
pub async fn unblock_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    set_blocked(&state, &session, &id, false).await
}

/// Delete a user together with the groups they created and their traces in
/// other groups (admin)
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = target_other(&session, &id)?;
    let summary = state
        .store
        .delete_user_cascade(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    state.invalidate_group_listing().await;

    tracing::info!(
        "Admin {} deleted user {} ({} groups deleted, {} groups updated)",
        session.user_id,
        id,
        summary.groups_deleted,
        summary.groups_updated
    );
    Ok(Json(DeleteUserResponse {
        message: "User deleted successfully".to_string(),
        groups_deleted: summary.groups_deleted,
        groups_updated: summary.groups_updated,
    }))
}
