//! Handler return values.
//!
//! Handlers return `Result<ResponseIntent, HandlerError>`. Both sides convert
//! into a placeholder response that carries the value as an extension; the
//! finalize middleware takes it back out. Without the middleware the
//! placeholder still has a sensible status.

use axum::response::{IntoResponse, Response};

use crate::finalizer::{HandlerError, ResponseIntent};

/// Result type for handlers behind the finalize middleware.
pub type HandlerResult = Result<ResponseIntent, HandlerError>;

impl IntoResponse for ResponseIntent {
    fn into_response(self) -> Response {
        let mut response = Response::default();
        if let Some(status) = self.status {
            *response.status_mut() = status;
        }
        response.extensions_mut().insert(self);
        response
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let mut response = Response::default();
        *response.status_mut() = self.status();
        response.extensions_mut().insert(self);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_intent_travels_in_extensions() {
        let mut response = ResponseIntent::redirect_to("/home").into_response();
        let intent = response.extensions_mut().remove::<ResponseIntent>().unwrap();
        assert_eq!(intent.redirect.as_deref(), Some("/home"));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_failure_keeps_status() {
        let response = HandlerError::not_found("missing").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<HandlerError>().is_some());
    }
}
