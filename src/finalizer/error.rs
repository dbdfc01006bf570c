//! Handler failures.

use std::any::Any;
use std::fmt::Display;

use axum::http::StatusCode;

use crate::templates::RenderError;

/// A failure raised by a downstream handler.
///
/// User-facing failures carry a status code and a message that is safe to show
/// to the client as is. Everything else is internal and answered with a 500.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HandlerError {
    #[error("{message}")]
    UserFacing { status: StatusCode, message: String },

    #[error("{message}")]
    Internal { message: String },
}

impl HandlerError {
    pub fn user_facing(status: StatusCode, message: impl Into<String>) -> Self {
        HandlerError::UserFacing {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::user_facing(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::user_facing(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::user_facing(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Display) -> Self {
        HandlerError::Internal {
            message: message.to_string(),
        }
    }

    /// Status code the failure is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::UserFacing { status, .. } => *status,
            HandlerError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_user_facing(&self) -> bool {
        matches!(self, HandlerError::UserFacing { .. })
    }

    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerError::UserFacing { .. } => "user_facing",
            HandlerError::Internal { .. } => "internal",
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::internal(format!("Handler panicked: {detail}"))
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(err)
    }
}

impl From<RenderError> for HandlerError {
    fn from(err: RenderError) -> Self {
        Self::internal(err)
    }
}

/// Message that may be shown to the client for `err`.
///
/// User-facing messages pass through. Internal messages are cut to their first
/// line and absolute paths are reduced to file names.
pub fn error_message(err: &HandlerError) -> String {
    match err {
        HandlerError::UserFacing { message, .. } => message.clone(),
        HandlerError::Internal { message } => {
            let first_line = message.lines().next().unwrap_or_default().trim();
            if first_line.is_empty() {
                return "Unknown error".to_string();
            }
            first_line
                .split(' ')
                .map(strip_directories)
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}

fn strip_directories(word: &str) -> String {
    if word.contains("://") {
        return word.to_string();
    }
    match (word.find('/'), word.rfind('/')) {
        (Some(first), Some(last)) if first < last && starts_path(word, first) => {
            format!("{}{}", &word[..first], &word[last + 1..])
        }
        _ => word.to_string(),
    }
}

fn starts_path(word: &str, slash: usize) -> bool {
    word[..slash]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_by_kind() {
        assert_eq!(HandlerError::not_found("gone").status(), StatusCode::NOT_FOUND);
        assert_eq!(HandlerError::internal("boom").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(HandlerError::forbidden("no").is_user_facing());
    }

    #[test]
    fn test_user_facing_message_verbatim() {
        let err = HandlerError::bad_request("Field /name is required\nsecond line");
        assert_eq!(error_message(&err), "Field /name is required\nsecond line");
    }

    #[test]
    fn test_internal_message_redacted() {
        let err = HandlerError::internal(
            "failed to open /srv/app/data/cache.db: permission denied\n    at main.rs:10",
        );
        assert_eq!(error_message(&err), "failed to open cache.db: permission denied");

        let err = HandlerError::internal("ratio and/or count (/a/b/c.rs:3)");
        assert_eq!(error_message(&err), "ratio and/or count (c.rs:3)");
    }

    #[test]
    fn test_urls_left_intact() {
        let err = HandlerError::internal("fetch of http://judge.local/a/b failed in /srv/app/fetch.rs");
        assert_eq!(error_message(&err), "fetch of http://judge.local/a/b failed in fetch.rs");
    }

    #[test]
    fn test_empty_internal_message() {
        assert_eq!(error_message(&HandlerError::internal("")), "Unknown error");
    }

    #[test]
    fn test_from_panic_payloads() {
        let err = HandlerError::from_panic(Box::new("oops"));
        assert_eq!(err.to_string(), "Handler panicked: oops");

        let err = HandlerError::from_panic(Box::new(String::from("owned")));
        assert_eq!(err.to_string(), "Handler panicked: owned");
    }
}
