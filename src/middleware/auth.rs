use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use uuid::Uuid;

use crate::{AppState, domain::Session, error::AppError, utils::verify_token};

/// Resolves the bearer token into a `Session` extension. The account is
/// re-read on every request so a block or role change applies to tokens
/// issued earlier.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.map_err(|_| AppError::Unauthenticated)?;

    let claims = verify_token(bearer.token(), &state.config).map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        AppError::Unauthenticated
    })?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthenticated)?;

    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    if user.is_blocked {
        tracing::warn!("Blocked user {} attempted a request", user.id);
        return Err(AppError::Forbidden("Account is blocked".to_string()));
    }

    request.extensions_mut().insert(Session::from_user(&user));
    Ok(next.run(request).await)
}
