use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::user::{User, UserRole},
    repositories::user as user_repo,
    services::auth as auth_service,
    state::AppState,
};

/// The request payload for creating a back-office user.
#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8))]
    pub password: String,
    #[garde(length(min = 1))]
    pub first_name: String,
    #[garde(length(min = 1))]
    pub last_name: String,
    #[garde(skip)]
    pub role: UserRole,
}

/// The request payload for updating a user's role or active flag.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// The response payload for the user listing.
#[derive(Serialize)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<User>,
}

/// The response payload for a single user.
#[derive(Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

/// Lists all back-office users.
#[axum::debug_handler]
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let users = user_repo::list_users(&state.db).await?;

    Ok(Json(UsersResponse {
        success: true,
        users,
    }))
}

/// Creates a back-office user.
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(acting_user): Extension<User>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse> {
    payload
        .validate()
        .map_err(|report| AppError::Validation(report.to_string()))?;

    let email = payload.email.trim().to_lowercase();
    let password_hash = auth_service::hash_password(&payload.password)?;

    let user = user_repo::create_user(
        &state.db,
        Uuid::new_v4(),
        &email,
        payload.first_name.trim(),
        payload.last_name.trim(),
        &password_hash,
        payload.role,
    )
    .await?;

    tracing::info!(
        "✅ User {} created by admin {}",
        user.id,
        acting_user.id
    );

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            success: true,
            user,
        }),
    ))
}

/// Updates a user's role and/or active flag.
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(acting_user): Extension<User>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse> {
    if payload.role.is_none() && payload.is_active.is_none() {
        return Err(AppError::Validation(
            "Provide a role and/or an isActive value".to_string(),
        ));
    }

    let user =
        user_repo::update_role_and_active(&state.db, &user_id, payload.role, payload.is_active)
            .await?
            .ok_or(AppError::NotFound)?;

    tracing::info!(
        "✅ User {} updated by admin {} (role: {:?}, active: {:?})",
        user.id,
        acting_user.id,
        payload.role,
        payload.is_active
    );

    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}
