use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents a proof-of-login record.
///
/// A user may hold several sessions at once (one per device); each one is
/// looked up by its opaque `token` and removed independently on logout or
/// on lazy expiry during validation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// The unique identifier for the session row.
    pub id: Uuid,
    /// The opaque random token presented by the client.
    pub token: String,
    /// The ID of the user this session belongs to.
    pub user_id: Uuid,
    /// The timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
}
