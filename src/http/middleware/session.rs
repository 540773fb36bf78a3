//! Session validation layer.
//!
//! # Responsibilities
//! - Resolve the session cookie through the registry
//! - Reject API calls with 401 and redirect page loads to the login page
//! - Record the access and hand the session to the handler
//!
//! # Design Decisions
//! - Missing, unknown and expired sessions produce the same response
//! - API calls and pages are told apart by the `/api` prefix

use axum::{
    extract::{Request, State},
    http::{StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;

use crate::http::pipeline::RouteContext;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::session::SessionRecord;

/// Present in request extensions once the session layer has accepted a call.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession(pub SessionRecord);

/// Session check for API routes that require it.
pub async fn require_session(
    State(ctx): State<RouteContext>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    if !ctx.route.requires_session {
        return next.run(req).await;
    }
    authenticate(&ctx.state, &jar, req, next).await
}

/// Session check for static pages. The login page and favicon stay public.
pub async fn require_page_session(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    if is_public_page(req.uri().path(), &state.config.auth.login_path) {
        return next.run(req).await;
    }
    authenticate(&state, &jar, req, next).await
}

async fn authenticate(state: &AppState, jar: &CookieJar, mut req: Request, next: Next) -> Response {
    let now = Utc::now();
    let token = jar
        .get(&state.config.auth.cookie_name)
        .map(|cookie| cookie.value().to_string());

    match state.sessions.validate(token.as_deref(), now) {
        Ok(record) => {
            state.sessions.touch_access(&record.token, now);
            req.extensions_mut().insert(AuthenticatedSession(record));
            next.run(req).await
        }
        Err(e) => {
            metrics::record_auth_failure(e.reason());
            tracing::info!(reason = e.reason(), path = %req.uri().path(), "invalid cookie");
            reject(req.uri(), &state.config.auth.login_path)
        }
    }
}

fn reject(uri: &Uri, login_path: &str) -> Response {
    if uri.path().starts_with("/api") {
        return (StatusCode::UNAUTHORIZED, "invalid cookie").into_response();
    }
    Redirect::to(&login_redirect(login_path, uri.path())).into_response()
}

/// `/login?ref=<path>` with the path query-encoded.
pub fn login_redirect(login_path: &str, original_path: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("ref", original_path)
        .finish();
    format!("{login_path}?{query}")
}

fn is_public_page(path: &str, login_path: &str) -> bool {
    path == "/favicon.ico" || path.starts_with(login_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_encodes_ref() {
        assert_eq!(
            login_redirect("/login", "/sprintboard/"),
            "/login?ref=%2Fsprintboard%2F"
        );
    }

    #[test]
    fn test_public_pages() {
        assert!(is_public_page("/login", "/login"));
        assert!(is_public_page("/login/index.js", "/login"));
        assert!(is_public_page("/favicon.ico", "/login"));
        assert!(!is_public_page("/sprintboard", "/login"));
        assert!(!is_public_page("/", "/login"));
    }

    #[test]
    fn test_reject_shapes() {
        let api: Uri = "/api/get_tasks".parse().unwrap();
        assert_eq!(reject(&api, "/login").status(), StatusCode::UNAUTHORIZED);

        let page: Uri = "/sprintboard".parse().unwrap();
        let response = reject(&page, "/login");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()["location"],
            "/login?ref=%2Fsprintboard"
        );
    }
}
