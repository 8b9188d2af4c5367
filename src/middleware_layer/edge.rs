use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use http::header;

use crate::error::json_error;
use crate::services::session::{cookie_value, SESSION_COOKIE};

/// The admin login page, exempt from the pre-filter.
const LOGIN_PAGE: &str = "/admin/login";

/// A cheap pre-filter for admin-prefixed paths.
///
/// Only detects the presence of a credential (a `Bearer` header or a
/// `session_token` cookie key); it never decodes or validates the token.
/// A request that carries any credential is passed through to the
/// route-level guards, which perform the authoritative check. This tier
/// stays store-independent so it can run where the pool is unreachable.
pub async fn admin_prefilter(request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path();

    if !is_guarded_path(path) || has_credential(request.headers()) {
        return next.run(request).await;
    }

    tracing::debug!("No credential on guarded path {}", path);

    if path.starts_with("/api/") {
        json_error(StatusCode::UNAUTHORIZED, "Authentication required")
    } else {
        Redirect::to(LOGIN_PAGE).into_response()
    }
}

/// Guarded paths are those prefixed `/admin` or `/api/admin`, except the
/// login page itself.
fn is_guarded_path(path: &str) -> bool {
    if path == LOGIN_PAGE {
        return false;
    }
    path.starts_with("/admin") || path.starts_with("/api/admin")
}

/// Presence-only credential detection.
fn has_credential(headers: &HeaderMap) -> bool {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "));

    bearer
        || headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|raw| cookie_value(raw, SESSION_COOKIE).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{AUTHORIZATION, COOKIE};

    #[test]
    fn scopes_to_admin_prefixes_only() {
        assert!(is_guarded_path("/admin"));
        assert!(is_guarded_path("/admin/bookings"));
        assert!(is_guarded_path("/api/admin/users"));
        assert!(!is_guarded_path("/admin/login"));
        assert!(!is_guarded_path("/"));
        assert!(!is_guarded_path("/api/auth/login"));
        assert!(!is_guarded_path("/packages"));
    }

    #[test]
    fn bearer_header_counts_as_credential() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer anything".parse().unwrap());
        assert!(has_credential(&headers));
    }

    #[test]
    fn session_cookie_key_counts_as_credential() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "theme=dark; session_token=abc".parse().unwrap());
        assert!(has_credential(&headers));
    }

    #[test]
    fn no_credential_is_detected_otherwise() {
        assert!(!has_credential(&HeaderMap::new()));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Basic Zm9v".parse().unwrap());
        headers.insert(COOKIE, "theme=dark".parse().unwrap());
        assert!(!has_credential(&headers));
    }
}
