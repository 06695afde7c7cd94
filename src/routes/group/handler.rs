use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    domain::{Capability, Group, GroupStatus, Session},
    error::AppError,
    routes::{MessageResponse, ValidatedJson, parse_id},
};

use super::model::{
    AddMaterialRequest, CreateGroupRequest, GroupDetail, GroupSummary, PostMessageRequest,
    UpdateGroupRequest,
};

pub(crate) async fn load_group(state: &AppState, raw_id: &str) -> Result<Group, AppError> {
    let id = parse_id(raw_id, "Group")?;
    state
        .store
        .find_group(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))
}

async fn detail(
    state: &AppState,
    group: &Group,
    session: &Session,
) -> Result<Json<GroupDetail>, AppError> {
    Ok(Json(GroupDetail::load(state.store.as_ref(), group, session).await?))
}

/// Public listing of approved groups
#[axum::debug_handler]
pub async fn list_groups(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    if let Some(cache) = &state.cache {
        if let Some(groups) = cache.approved_groups::<Vec<GroupSummary>>().await {
            return Ok(Json(groups));
        }
    }

    let groups = state.store.list_groups(Some(GroupStatus::Approved)).await?;
    let summaries = GroupSummary::list(state.store.as_ref(), &groups).await?;

    if let Some(cache) = &state.cache {
        cache.store_approved_groups(&summaries).await;
    }
    Ok(Json(summaries))
}

/// Create a group; it stays pending until an admin reviews it
#[axum::debug_handler]
pub async fn create_group(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ValidatedJson(req): ValidatedJson<CreateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!("User {} is creating group: {}", session.user_id, req.title);

    let group = Group::new(req.into(), session.user_id)?;
    state.store.insert_group(&group).await?;

    tracing::info!("User {} created group {} ({})", session.user_id, group.id, group.title);
    Ok((StatusCode::CREATED, detail(&state, &group, &session).await?))
}

#[axum::debug_handler]
pub async fn get_group(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let group = load_group(&state, &id).await?;
    session.authorize(Capability::ViewGroup(&group))?;
    detail(&state, &group, &session).await
}

/// Edit a group (creator or admin)
#[axum::debug_handler]
pub async fn update_group(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut group = load_group(&state, &id).await?;
    session.authorize(Capability::ViewGroup(&group))?;
    session.authorize(Capability::EditGroup(&group))?;

    group.apply_changes(req.into())?;
    state.store.save_group(&group).await?;
    state.invalidate_group_listing().await;

    tracing::info!("User {} updated group {}", session.user_id, group.id);
    detail(&state, &group, &session).await
}

/// Delete a group (creator or admin)
#[axum::debug_handler]
pub async fn delete_group(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let group = load_group(&state, &id).await?;
    session.authorize(Capability::ViewGroup(&group))?;
    session.authorize(Capability::DeleteGroup(&group))?;

    state.store.delete_group(group.id).await?;
    state.invalidate_group_listing().await;

    tracing::info!("User {} deleted group {}", session.user_id, group.id);
    Ok(MessageResponse::new("Group deleted successfully"))
}

#[axum::debug_handler]
pub async fn join_group(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut group = load_group(&state, &id).await?;
    session.authorize(Capability::ViewGroup(&group))?;

    // load-check-save, concurrent joins near capacity can both pass
    group.join(session.user_id).inspect_err(|e| {
        tracing::debug!("User {} cannot join group {}: {}", session.user_id, group.id, e);
    })?;
    state.store.save_group(&group).await?;
    state.invalidate_group_listing().await;

    tracing::info!("User {} joined group {}", session.user_id, group.id);
    detail(&state, &group, &session).await
}

#[axum::debug_handler]
pub async fn leave_group(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut group = load_group(&state, &id).await?;
    session.authorize(Capability::ViewGroup(&group))?;

    group.leave(session.user_id)?;
    state.store.save_group(&group).await?;
    state.invalidate_group_listing().await;

    tracing::info!("User {} left group {}", session.user_id, group.id);
    detail(&state, &group, &session).await
}

#[axum::debug_handler]
pub async fn post_message(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<PostMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut group = load_group(&state, &id).await?;
    session.authorize(Capability::PostToGroup(&group))?;

    group.post_message(session.user_id, &req.content)?;
    state.store.save_group(&group).await?;

    tracing::debug!("User {} posted in group {}", session.user_id, group.id);
    Ok((StatusCode::CREATED, detail(&state, &group, &session).await?))
}

#[axum::debug_handler]
pub async fn add_material(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<AddMaterialRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut group = load_group(&state, &id).await?;
    session.authorize(Capability::PostToGroup(&group))?;

    group.add_material(session.user_id, &req.title, &req.url)?;
    state.store.save_group(&group).await?;

    tracing::debug!("User {} shared material in group {}", session.user_id, group.id);
    Ok((StatusCode::CREATED, detail(&state, &group, &session).await?))
}
