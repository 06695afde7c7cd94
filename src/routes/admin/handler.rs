use axum::{
    extract::{Extension, Json, Path, State},
    response::IntoResponse,
};
use futures_util::future::join_all;

use crate::{
    AppState,
    domain::{Capability, GroupStatus, Role, Session, User},
    error::AppError,
    notify::{GroupStatusNotification, UserNotice},
    routes::{
        ValidatedJson,
        group::{GroupSummary, load_group},
        user::{UserInfo, UserSummary},
    },
};

use super::model::{NotifyUsersRequest, NotifyUsersResponse, ReviewResponse};

/// Groups of every status, newest first
#[axum::debug_handler]
pub async fn all_groups(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    session.authorize(Capability::ViewAllGroups)?;
    let groups = state.store.list_groups(None).await?;
    Ok(Json(GroupSummary::list(state.store.as_ref(), &groups).await?))
}

#[axum::debug_handler]
pub async fn approved_groups(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    session.authorize(Capability::ViewAllGroups)?;
    let groups = state.store.list_groups(Some(GroupStatus::Approved)).await?;
    Ok(Json(GroupSummary::list(state.store.as_ref(), &groups).await?))
}

fn notifiable(user: &User) -> bool {
    user.role == Role::User && !user.is_blocked
}

/// Active non-admin accounts that can receive notices
#[axum::debug_handler]
pub async fn users_for_notification(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    session.authorize(Capability::ManageUsers)?;
    let users = state.store.list_users().await?;
    Ok(Json(
        users
            .iter()
            .filter(|u| notifiable(u))
            .map(UserSummary::from)
            .collect::<Vec<_>>(),
    ))
}

/// Members of one group, in join order
#[axum::debug_handler]
pub async fn group_users(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    session.authorize(Capability::ManageUsers)?;
    let group = load_group(&state, &id).await?;
    let users = state.store.find_users(&group.members).await?;

    let members: Vec<UserInfo> = group
        .members
        .iter()
        .filter_map(|id| users.iter().find(|u| u.id == *id))
        .map(UserInfo::from)
        .collect();
    Ok(Json(members))
}

async fn review(
    state: &AppState,
    session: &Session,
    raw_id: &str,
    decision: GroupStatus,
) -> Result<Json<ReviewResponse>, AppError> {
    session.authorize(Capability::ReviewGroup)?;
    let mut group = load_group(state, raw_id).await?;

    let review = group.review(decision)?;
    if review.is_retransition() {
        tracing::warn!(
            "Group {} re-reviewed: {} -> {}",
            group.id,
            review.previous,
            review.current
        );
    }
    state.store.save_group(&group).await?;
    state.invalidate_group_listing().await;
    tracing::info!("Admin {} set group {} to {}", session.user_id, group.id, decision);

    // the decision stands even if the creator cannot be told about it
    let creator = state.store.find_user(group.creator).await?;
    let notification_data = creator
        .as_ref()
        .map(|creator| GroupStatusNotification::new(&group, creator));
    let notification_sent = match &notification_data {
        Some(notification) => match state.notifier.group_status_changed(notification).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to notify creator of group {}: {}", group.id, e);
                false
            }
        },
        None => {
            tracing::warn!("Creator of group {} no longer exists", group.id);
            false
        }
    };

    Ok(Json(ReviewResponse {
        message: format!("Group {} successfully", decision),
        group: GroupSummary::one(state.store.as_ref(), &group).await?,
        notification_data,
        notification_sent,
    }))
}

#[axum::debug_handler]
pub async fn approve_group(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    review(&state, &session, &id, GroupStatus::Approved).await
}

#[axum::debug_handler]
pub async fn reject_group(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    review(&state, &session, &id, GroupStatus::Rejected).await
}

/// Send one notice to the listed users, or to every notifiable user
#[axum::debug_handler]
pub async fn notify_users(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ValidatedJson(req): ValidatedJson<NotifyUsersRequest>,
) -> Result<impl IntoResponse, AppError> {
    session.authorize(Capability::ManageUsers)?;

    let recipients: Vec<User> = match req.user_ids.as_deref() {
        Some(ids) if !ids.is_empty() => state.store.find_users(ids).await?,
        _ => state.store.list_users().await?,
    }
    .into_iter()
    .filter(notifiable)
    .collect();

    let notices: Vec<UserNotice> = recipients
        .iter()
        .map(|u| UserNotice {
            to_email: u.email.clone(),
            to_name: u.name.clone(),
            subject: req.subject.clone(),
            message: req.message.clone(),
        })
        .collect();

    let results = join_all(notices.iter().map(|n| state.notifier.send_notice(n))).await;
    let failed = results
        .iter()
        .zip(&notices)
        .filter_map(|(result, notice)| result.as_ref().err().map(|e| (notice, e)))
        .inspect(|(notice, e)| {
            tracing::error!("Failed to send notice to {}: {}", notice.to_email, e)
        })
        .count();

    let total = notices.len();
    tracing::info!(
        "Admin {} sent notice '{}' to {}/{} users",
        session.user_id,
        req.subject,
        total - failed,
        total
    );
    Ok(Json(NotifyUsersResponse {
        sent: total - failed,
        failed,
        total,
    }))
}
