use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    models::user::{User, UserRole},
    services::session as session_service,
    state::AppState,
};

/// Resolves the request to an authenticated, active user.
///
/// No token, an invalid or expired token, and an inactive account all
/// collapse into the same 401 so nothing about account state leaks here.
async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = session_service::extract_token(headers)
        .ok_or_else(|| AppError::Authentication("Authentication required".to_string()))?;

    let user = session_service::validate_token(&state.db, &token)
        .await?
        .ok_or_else(|| AppError::Authentication("Authentication required".to_string()))?;

    if !user.is_active {
        return Err(AppError::Authentication("Authentication required".to_string()));
    }

    Ok(user)
}

/// Checks that the user's role is in the allowed set.
pub fn check_role(user: &User, allowed: &[UserRole]) -> Result<(), AppError> {
    if allowed.contains(&user.role) {
        return Ok(());
    }

    let required = allowed
        .iter()
        .map(|role| role.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    Err(AppError::Authorization(format!(
        "Insufficient permissions. Required roles: {}",
        required
    )))
}

/// A middleware that requires a valid session from an active user.
///
/// The resolved `User` is inserted into the request extensions for the
/// handler (and any inner role guard) to pick up.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve_user(&state, request.headers()).await?;
    tracing::debug!("Authenticated user {} ({})", user.id, user.role.as_str());

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// A middleware that requires one of the allowed roles.
///
/// Runs the `require_auth` resolution first unless an outer `require_auth`
/// already did the work; an outer rejection short-circuits before this
/// guard ever runs, so the composition never reaches the role check with
/// an unauthenticated request.
pub async fn require_role(
    state: AppState,
    mut request: Request<Body>,
    next: Next,
    allowed: &[UserRole],
) -> Result<Response, AppError> {
    let user = match request.extensions().get::<User>() {
        Some(user) => user.clone(),
        None => resolve_user(&state, request.headers()).await?,
    };

    check_role(&user, allowed)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// A middleware that requires the ADMIN role.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    require_role(state, request, next, &[UserRole::Admin]).await
}
