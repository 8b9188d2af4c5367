use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::{
    error::{json_error, AppError, Result},
    models::user::{Permissions, User},
    repositories::session as session_repo,
    repositories::user as user_repo,
    services::auth as auth_service,
    services::session as session_service,
    state::AppState,
};

/// The request payload for user login.
#[derive(Deserialize, Validate, Debug)]
pub struct LoginRequest {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

/// The session half of a successful login response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// The response payload for a successful login.
#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: User,
    pub session: SessionPayload,
}

/// The response payload for logout.
#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// The response payload for the current-user endpoint.
#[derive(Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: User,
    pub permissions: Permissions,
}

/// Maps an endpoint outcome to its response.
///
/// Expected failures (validation, authentication, authorization) pass
/// through with their own status and message; anything else becomes the
/// endpoint's fixed generic 500 string, with the detail kept in the logs.
fn unwrap_or_generic(result: Result<Response>, generic: &str) -> Response {
    match result {
        Ok(response) => response,
        Err(
            err @ (AppError::Validation(_)
            | AppError::Authentication(_)
            | AppError::Authorization(_)),
        ) => err.into_response(),
        Err(err) => {
            tracing::error!("{}: {}", generic, err);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, generic)
        }
    }
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let result = match payload {
        Ok(Json(payload)) => login_inner(&state, &cookies, payload).await,
        // A body that does not even parse is an unexpected fault, not a
        // validation outcome.
        Err(rejection) => Err(AppError::Internal(format!(
            "Malformed login payload: {}",
            rejection
        ))),
    };

    unwrap_or_generic(result, "An error occurred during login")
}

async fn login_inner(
    state: &AppState,
    cookies: &Cookies,
    payload: LoginRequest,
) -> Result<Response> {
    payload
        .validate()
        .map_err(|report| AppError::Validation(report.to_string()))?;

    let email = payload.email.trim().to_lowercase();

    let Some(mut user) = user_repo::find_by_email(&state.db, &email).await? else {
        return Err(AppError::Authentication(
            "Invalid email or password".to_string(),
        ));
    };

    // The active check comes before password verification; the distinct
    // message is an accepted disclosure.
    if !user.is_active {
        return Err(AppError::Authentication(
            "Account is inactive. Please contact support.".to_string(),
        ));
    }

    if !auth_service::verify_password(&payload.password, &user.password) {
        return Err(AppError::Authentication(
            "Invalid email or password".to_string(),
        ));
    }

    let token = session_service::issue_token();
    let expires_at =
        session_service::session_expiry(Utc::now(), state.config.session_duration_days);
    let session = session_repo::create_session(&state.db, &token, &user.id, expires_at).await?;

    // Separate write from the session insert; a failure in between only
    // leaves a stale last_login behind.
    let now = Utc::now();
    user_repo::update_last_login(&state.db, &user.id, now).await?;
    user.last_login = Some(now);

    cookies.add(session_service::session_cookie(
        &session.token,
        session.expires_at,
    ));

    tracing::info!("✅ User logged in: {}", user.id);

    let response = LoginResponse {
        success: true,
        user,
        session: SessionPayload {
            token: session.token,
            expires_at: session.expires_at,
        },
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles user logout. Idempotent: the client always ends up logged out.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
) -> Response {
    unwrap_or_generic(
        logout_inner(&state, &cookies, &headers).await,
        "An error occurred during logout",
    )
}

async fn logout_inner(
    state: &AppState,
    cookies: &Cookies,
    headers: &HeaderMap,
) -> Result<Response> {
    let Some(token) = session_service::extract_token(headers) else {
        return Err(AppError::Authentication(
            "No session token provided".to_string(),
        ));
    };

    let session = session_repo::find_by_token(&state.db, &token).await?;

    // The clearing cookie goes out on both branches.
    cookies.add(session_service::clear_session_cookie());

    let message = match session {
        Some(session) => {
            session_repo::delete_by_id(&state.db, &session.id).await?;
            tracing::info!("✅ Session {} deleted on logout", session.id);
            "Logged out successfully"
        }
        None => {
            tracing::debug!("Logout with no matching session");
            "Session not found, but logged out"
        }
    };

    let response = MessageResponse {
        success: true,
        message: message.to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Returns the current user with a per-role permissions projection.
#[axum::debug_handler]
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Response {
    unwrap_or_generic(
        me_inner(&state, &headers).await,
        "An error occurred while fetching the session",
    )
}

async fn me_inner(state: &AppState, headers: &HeaderMap) -> Result<Response> {
    let Some(token) = session_service::extract_token(headers) else {
        return Err(AppError::Authentication(
            "Authentication required".to_string(),
        ));
    };

    let Some(user) = session_service::validate_token(&state.db, &token).await? else {
        return Err(AppError::Authentication(
            "Invalid or expired session".to_string(),
        ));
    };

    if !user.is_active {
        return Err(AppError::Authentication("Account is inactive".to_string()));
    }

    let permissions = Permissions::from(user.role);

    let response = MeResponse {
        success: true,
        user,
        permissions,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}
