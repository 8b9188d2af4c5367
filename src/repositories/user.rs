use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::user::{User, UserRole},
};

/// A helper function to map a `tokio_postgres::Row` to a `User`.
pub(crate) fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
        first_name: row.try_get("first_name").map_err(|_| AppError::MissingData("first_name".to_string()))?,
        last_name: row.try_get("last_name").map_err(|_| AppError::MissingData("last_name".to_string()))?,
        password: row.try_get("password").map_err(|_| AppError::MissingData("password".to_string()))?,
        role: row.try_get("role").map_err(|_| AppError::MissingData("role".to_string()))?,
        is_active: row.try_get("is_active").map_err(|_| AppError::MissingData("is_active".to_string()))?,
        last_login: row.try_get("last_login").map_err(|_| AppError::MissingData("last_login".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

/// Creates a new user in the database.
///
/// A duplicate email surfaces as a `Validation` error rather than a
/// generic database fault.
pub async fn create_user(
    pool: &Pool,
    id: Uuid,
    email: &str,
    first_name: &str,
    last_name: &str,
    password_hash: &str,
    role: UserRole,
) -> Result<User> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO users (id, email, first_name, last_name, password, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
            &[&id, &email, &first_name, &last_name, &password_hash, &role],
        )
        .await
        .map_err(|e| {
            if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                AppError::Validation("A user with this email already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })?;
    row_to_user(&row)
}

/// Finds a user by their email address. The caller lowercases the email.
pub async fn find_by_email(pool: &Pool, email: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM users
            WHERE email = $1
            "#,
            &[&email],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Lists all users, newest first.
pub async fn list_users(pool: &Pool) -> Result<Vec<User>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT *
            FROM users
            ORDER BY created_at DESC
            "#,
            &[],
        )
        .await?;
    rows.iter().map(row_to_user).collect()
}

/// Records a successful login.
pub async fn update_last_login(pool: &Pool, user_id: &Uuid, at: DateTime<Utc>) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            r#"
            UPDATE users
            SET last_login = $1, updated_at = NOW()
            WHERE id = $2
            "#,
            &[&at, user_id],
        )
        .await?;
    Ok(())
}

/// Updates a user's role and/or active flag. Fields left as `None` keep
/// their current value.
pub async fn update_role_and_active(
    pool: &Pool,
    user_id: &Uuid,
    role: Option<UserRole>,
    is_active: Option<bool>,
) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE users
            SET role = COALESCE($1, role),
                is_active = COALESCE($2, is_active),
                updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
            &[&role, &is_active, user_id],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}
