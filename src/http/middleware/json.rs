//! Request media type enforcement.

use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::pipeline::RouteContext;
use crate::http::response::ApiError;

/// Reject non-GET bodies that are not JSON.
///
/// A missing Content-Type is accepted.
pub async fn enforce_json(State(ctx): State<RouteContext>, req: Request, next: Next) -> Response {
    if !ctx.route.enforce_json || req.method() == Method::GET {
        return next.run(req).await;
    }

    if let Some(value) = req.headers().get(header::CONTENT_TYPE) {
        if let Err(e) = check_media_type(value.as_bytes()) {
            return e.into_response();
        }
    }

    next.run(req).await
}

fn check_media_type(raw: &[u8]) -> Result<(), ApiError> {
    let media_type = std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<mime::Mime>().ok())
        .ok_or_else(|| ApiError::BadRequest("malformed Content-Type header".to_string()))?;

    if media_type.essence_str() != mime::APPLICATION_JSON.essence_str() {
        return Err(ApiError::UnsupportedMediaType(
            "Content-Type header must be application/json".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_check() {
        assert!(check_media_type(b"application/json").is_ok());
        assert!(check_media_type(b"application/json; charset=utf-8").is_ok());
        assert!(matches!(
            check_media_type(b"text/plain"),
            Err(ApiError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            check_media_type(b"not a media type"),
            Err(ApiError::BadRequest(_))
        ));
    }
}
