use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    domain::{Role, User, user::normalize_email},
    error::AppError,
    routes::{ValidatedJson, user::UserInfo},
    utils::{generate_token, hash_password, verify_password},
};

use super::model::{AuthResponse, LoginRequest, RegisterRequest};

fn issue_token(state: &AppState, user: &User, message: &str) -> Result<AuthResponse, AppError> {
    let (token, expires_at) = generate_token(user, &state.config)?;
    Ok(AuthResponse {
        message: message.to_string(),
        token,
        expires_at,
        user: UserInfo::from(user),
    })
}

/// Checks credentials and the block flag. Unknown email and wrong password
/// give the same answer.
async fn authenticate(state: &AppState, req: LoginRequest) -> Result<User, AppError> {
    let user = state
        .store
        .find_user_by_email(&normalize_email(&req.email))
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&req.password, &hash))
        .await
        .map_err(AppError::internal)??;
    if !valid {
        tracing::debug!("Wrong password for {}", user.email);
        return Err(AppError::InvalidCredentials);
    }

    if user.is_blocked {
        tracing::warn!("Blocked user {} attempted to log in", user.email);
        return Err(AppError::Forbidden(
            "Your account has been blocked. Please contact the administrator".to_string(),
        ));
    }

    Ok(user)
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !req.terms_accepted {
        return Err(AppError::Validation(
            "You must accept the terms and conditions".to_string(),
        ));
    }
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be blank".to_string()));
    }

    let email = normalize_email(&req.email);
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let cost = state.config.bcrypt_cost;
    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(AppError::internal)??;

    let user = User::new(&req.name, &email, &req.contact_number, password_hash, Role::User);
    // the unique index still catches a concurrent registration
    state.store.insert_user(&user).await?;

    tracing::info!("Registered user {} ({})", user.id, user.email);
    Ok((
        StatusCode::CREATED,
        Json(issue_token(&state, &user, "Registration successful")?),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&state, req).await?;
    tracing::info!("User {} logged in", user.id);
    Ok(Json(issue_token(&state, &user, "Login successful")?))
}

/// Same as login, restricted to admin accounts
#[axum::debug_handler]
pub async fn admin_login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&state, req).await?;
    if !user.is_admin() {
        tracing::warn!("Non-admin {} attempted admin login", user.email);
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    tracing::info!("Admin {} logged in", user.id);
    Ok(Json(issue_token(&state, &user, "Admin login successful")?))
}
