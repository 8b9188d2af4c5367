use chrono::{DateTime, Duration, Utc};
use deadpool_postgres::Pool;
use http::{header, HeaderMap};
use tower_cookies::cookie::time;
use tower_cookies::cookie::SameSite;
use tower_cookies::Cookie;
use uuid::Uuid;

use crate::error::Result;
use crate::models::user::User;
use crate::repositories::session as session_repo;

/// The name of the browser cookie holding the session token.
pub const SESSION_COOKIE: &str = "session_token";

/// The exact Authorization scheme prefix: capital B, one trailing space.
const BEARER_PREFIX: &str = "Bearer ";

/// Issues a new opaque session token.
///
/// UUIDv4 from the platform CSPRNG; effectively unique for the lifetime
/// of the system.
pub fn issue_token() -> String {
    Uuid::new_v4().to_string()
}

/// Computes the expiry timestamp for a session issued at `now`.
///
/// The horizon is a policy constant (configured in days), never derived
/// from request input. Pure, so tests can inject a fixed clock.
pub fn session_expiry(now: DateTime<Utc>, duration_days: i64) -> DateTime<Utc> {
    now + Duration::days(duration_days)
}

/// A session with `expires_at` at or before `now` is dead.
fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at <= now
}

/// Validates a session token against the store.
///
/// Returns the owning user (password hash still attached at this layer)
/// when the token maps to a live session. An expired session is deleted
/// on sight, so it can never be revalidated; the next lookup for the same
/// token simply misses.
pub async fn validate_token(pool: &Pool, token: &str) -> Result<Option<User>> {
    if token.is_empty() {
        return Ok(None);
    }

    let Some((session, user)) = session_repo::find_by_token_with_user(pool, token).await? else {
        return Ok(None);
    };

    if is_expired(session.expires_at, Utc::now()) {
        session_repo::delete_by_id(pool, &session.id).await?;
        tracing::debug!("Expired session {} deleted during validation", session.id);
        return Ok(None);
    }

    Ok(Some(user))
}

/// Extracts a session token from the request headers.
///
/// The `Authorization: Bearer` header wins over the `session_token`
/// cookie when both are present. Absence is `None`, never an error.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = value.strip_prefix(BEARER_PREFIX) {
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| cookie_value(raw, SESSION_COOKIE))
        .filter(|token| !token.is_empty())
}

/// Isolates one cookie among the semicolon-separated `name=value` pairs
/// of a `Cookie` header. Entries are trimmed before the split on `=`.
pub fn cookie_value(raw: &str, name: &str) -> Option<String> {
    raw.split(';').map(str::trim).find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Builds the session cookie set on login.
///
/// Max-Age is whole seconds of `expires_at` minus the build time, so it
/// trails the stored expiry by the request's processing latency.
pub fn session_cookie(token: &str, expires_at: DateTime<Utc>) -> Cookie<'static> {
    let max_age = (expires_at - Utc::now()).num_seconds().max(0);
    build_cookie(token.to_string(), max_age)
}

/// Builds the clearing cookie set on logout: same name and flags, empty
/// value, Max-Age=0.
pub fn clear_session_cookie() -> Cookie<'static> {
    build_cookie(String::new(), 0)
}

fn build_cookie(value: String, max_age_secs: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, value);
    cookie.set_http_only(true);
    cookie.set_secure(true);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::seconds(max_age_secs));
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{AUTHORIZATION, COOKIE};

    #[test]
    fn issued_tokens_are_unique() {
        assert_ne!(issue_token(), issue_token());
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let now = Utc::now();
        assert!(is_expired(now, now));
        assert!(is_expired(now - Duration::seconds(1), now));
        assert!(!is_expired(now + Duration::seconds(1), now));
    }

    #[test]
    fn session_expiry_is_a_fixed_horizon() {
        let now = Utc::now();
        assert_eq!(session_expiry(now, 7), now + Duration::days(7));
    }

    #[test]
    fn header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer A".parse().unwrap());
        headers.insert(COOKIE, "session_token=B".parse().unwrap());
        assert_eq!(extract_token(&headers), Some("A".to_string()));
    }

    #[test]
    fn cookie_is_used_when_header_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "session_token=tok123".parse().unwrap());
        assert_eq!(extract_token(&headers), Some("tok123".to_string()));
    }

    #[test]
    fn non_bearer_authorization_falls_back_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        headers.insert(COOKIE, "session_token=tok123".parse().unwrap());
        assert_eq!(extract_token(&headers), Some("tok123".to_string()));
    }

    #[test]
    fn missing_credential_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "other=1; another=2".parse().unwrap());
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn cookie_is_isolated_among_several() {
        let raw = "other=1; session_token=tok123; another=2";
        assert_eq!(cookie_value(raw, SESSION_COOKIE), Some("tok123".to_string()));
        assert_eq!(cookie_value(raw, "other"), Some("1".to_string()));
        assert_eq!(cookie_value(raw, "missing"), None);
    }

    #[test]
    fn session_cookie_carries_the_required_flags() {
        let expires_at = Utc::now() + Duration::days(7);
        let cookie = session_cookie("tok123", expires_at);

        assert_eq!(cookie.name(), "session_token");
        assert_eq!(cookie.value(), "tok123");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));

        let max_age = cookie.max_age().unwrap().whole_seconds();
        assert!(max_age > 0 && max_age <= 7 * 86400);
    }

    #[test]
    fn clear_cookie_drops_immediately() {
        let cookie = clear_session_cookie();
        assert_eq!(cookie.name(), "session_token");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(0)));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    }
}
