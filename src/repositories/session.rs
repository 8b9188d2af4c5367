use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::session::Session,
    models::user::User,
    repositories::user::row_to_user,
};

/// A helper function to map a `tokio_postgres::Row` to a `Session`.
///
/// Session columns are aliased with a `session_` prefix so the same row
/// can also carry the joined user columns.
fn row_to_session(row: &Row) -> Result<Session> {
    Ok(Session {
        id: row.try_get("session_id").map_err(|_| AppError::MissingData("session_id".to_string()))?,
        token: row.try_get("session_token").map_err(|_| AppError::MissingData("session_token".to_string()))?,
        user_id: row.try_get("session_user_id").map_err(|_| AppError::MissingData("session_user_id".to_string()))?,
        expires_at: row.try_get("session_expires_at").map_err(|_| AppError::MissingData("session_expires_at".to_string()))?,
        created_at: row.try_get("session_created_at").map_err(|_| AppError::MissingData("session_created_at".to_string()))?,
    })
}

const SESSION_COLUMNS: &str = r#"
    s.id AS session_id,
    s.token AS session_token,
    s.user_id AS session_user_id,
    s.expires_at AS session_expires_at,
    s.created_at AS session_created_at
"#;

/// Inserts a new session row.
pub async fn create_session(
    pool: &Pool,
    token: &str,
    user_id: &Uuid,
    expires_at: DateTime<Utc>,
) -> Result<Session> {
    let client = pool.get().await?;
    let id = Uuid::new_v4();
    let row = client
        .query_one(
            &format!(
                r#"
                INSERT INTO sessions AS s (id, token, user_id, expires_at)
                VALUES ($1, $2, $3, $4)
                RETURNING {SESSION_COLUMNS}
                "#
            ),
            &[&id, &token, user_id, &expires_at],
        )
        .await?;
    row_to_session(&row)
}

/// Finds a session by its token.
pub async fn find_by_token(pool: &Pool, token: &str) -> Result<Option<Session>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!(
                r#"
                SELECT {SESSION_COLUMNS}
                FROM sessions s
                WHERE s.token = $1
                "#
            ),
            &[&token],
        )
        .await?;
    row.map(|r| row_to_session(&r)).transpose()
}

/// Finds a session by its token, joined with the owning user.
///
/// One round trip covers the common validation path, so checking a token
/// never needs a second lookup for the user.
pub async fn find_by_token_with_user(
    pool: &Pool,
    token: &str,
) -> Result<Option<(Session, User)>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!(
                r#"
                SELECT {SESSION_COLUMNS},
                    u.id, u.email, u.first_name, u.last_name, u.password,
                    u.role, u.is_active, u.last_login, u.created_at, u.updated_at
                FROM sessions s
                JOIN users u ON u.id = s.user_id
                WHERE s.token = $1
                "#
            ),
            &[&token],
        )
        .await?;
    row.map(|r| Ok((row_to_session(&r)?, row_to_user(&r)?))).transpose()
}

/// Deletes a session by its ID.
pub async fn delete_by_id(pool: &Pool, session_id: &Uuid) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            r#"
            DELETE FROM sessions
            WHERE id = $1
            "#,
            &[session_id],
        )
        .await?;
    Ok(())
}
