//! Login and session introspection.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use serde::Deserialize;
use url::Url;

use crate::http::middleware::AuthenticatedSession;
use crate::http::response::{json_response, ApiError};
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub pass: String,
}

/// Check the password, open a session and send the browser back where it
/// came from.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    if form.pass != state.config.auth.login_password {
        tracing::info!("Login rejected: incorrect password");
        return Err(ApiError::Unauthorized("incorrect pw".to_string()));
    }

    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let target = redirect_target(referer).ok_or_else(|| {
        tracing::info!(referer, "Login rejected: invalid ref url");
        ApiError::BadRequest("invalid ref url".to_string())
    })?;

    let token = uuid::Uuid::new_v4().to_string();
    let record = state
        .sessions
        .create_session(&state.config.auth.caller_id, &token, Utc::now())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "could not create session");
            ApiError::Internal("could not create session".to_string())
        })?;

    let cookie = Cookie::build((state.config.auth.cookie_name.clone(), record.token))
        .path("/")
        .build();

    tracing::info!(redirect = %target, "Login successful");
    Ok((jar.add(cookie), Redirect::to(&target)).into_response())
}

/// Where to send the browser after login.
///
/// Reads the `ref` query parameter of the Referer. Anything but a local
/// absolute path becomes `/`. Returns `None` if the Referer is not a URL.
pub fn redirect_target(referer: &str) -> Option<String> {
    if referer.is_empty() {
        return Some("/".to_string());
    }

    let url = Url::parse(referer).ok()?;
    let target = url
        .query_pairs()
        .find(|(key, _)| key == "ref")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();

    if target.starts_with('/') && !target.starts_with("//") {
        Some(target)
    } else {
        Some("/".to_string())
    }
}

pub async fn check_session(
    State(state): State<AppState>,
    Extension(AuthenticatedSession(record)): Extension<AuthenticatedSession>,
) -> Result<Response, ApiError> {
    let remaining = record.remaining_at(Utc::now(), state.sessions.settings().duration);
    json_response(
        &serde_json::json!({ "session_time_remaining_seconds": remaining.num_seconds() }),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_target() {
        assert_eq!(
            redirect_target("http://localhost:8080/login?ref=%2Fsprintboard").as_deref(),
            Some("/sprintboard")
        );
        assert_eq!(
            redirect_target("http://localhost:8080/login").as_deref(),
            Some("/")
        );
        assert_eq!(redirect_target("").as_deref(), Some("/"));
    }

    #[test]
    fn test_redirect_target_rejects_offsite_refs() {
        assert_eq!(
            redirect_target("http://localhost/login?ref=https://evil.example").as_deref(),
            Some("/")
        );
        assert_eq!(
            redirect_target("http://localhost/login?ref=//evil.example").as_deref(),
            Some("/")
        );
    }

    #[test]
    fn test_redirect_target_invalid_referer() {
        assert!(redirect_target("not a url").is_none());
    }
}
