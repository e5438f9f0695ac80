use serde_json::{json, Value};
use std::io;
use thiserror::Error;

/// Failure raised by a middleware or action while a request is being handled.
///
/// Every variant maps to an HTTP status code; failures that carry none are
/// reported as `500`.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found")]
    NotFound,
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Internal error: {0}")]
    InternalError(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Panic: {0}")]
    PanicError(String),
    #[error("Too many requests")]
    TooManyRequests,
    #[error("{message}")]
    Status { status: u16, message: String },
}

impl ServerError {
    /// Failure with an explicit status code.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ServerError::Status {
            status,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::BadRequest(_) => 400,
            ServerError::Unauthorized(_) => 401,
            ServerError::Forbidden(_) => 403,
            ServerError::NotFound => 404,
            ServerError::Conflict(_) => 409,
            ServerError::ParseError(_) => 422,
            ServerError::ValidationError(_) => 422,
            ServerError::TooManyRequests => 429,
            ServerError::Status { status, .. } if (400..600).contains(status) => *status,
            ServerError::Status { .. }
            | ServerError::IoError(_)
            | ServerError::InternalError(_)
            | ServerError::PanicError(_) => 500,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ServerError::IoError(_) => "io",
            ServerError::ParseError(_) => "parse",
            ServerError::ValidationError(_) => "validation",
            ServerError::NotFound => "not_found",
            ServerError::BadRequest(_) => "bad_request",
            ServerError::Unauthorized(_) => "unauthorized",
            ServerError::Forbidden(_) => "forbidden",
            ServerError::InternalError(_) => "internal",
            ServerError::Conflict(_) => "conflict",
            ServerError::PanicError(_) => "panic",
            ServerError::TooManyRequests => "too_many_requests",
            ServerError::Status { .. } => "status",
        }
    }

    /// Full diagnostic object, exposed to clients only in development mode.
    pub fn detail(&self) -> Value {
        json!({
            "status": self.status_code(),
            "kind": self.kind(),
            "message": self.to_string(),
        })
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Route or option data rejected while composing the router. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid HTTP verb `{verb}` on {class_name}.{action}")]
    InvalidVerb {
        verb: String,
        class_name: String,
        action: String,
    },
    #[error("invalid route path `{path}` on {class_name}: {reason}")]
    InvalidPath {
        path: String,
        class_name: String,
        reason: &'static str,
    },
    #[error("invalid engine settings: {0}")]
    Settings(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_status_is_kept_and_bogus_status_falls_back_to_500() {
        assert_eq!(ServerError::status(404, "missing").status_code(), 404);
        assert_eq!(ServerError::status(200, "not a failure").status_code(), 500);
        assert_eq!(ServerError::InternalError("x".into()).status_code(), 500);
    }

    #[test]
    fn detail_carries_status_and_message() {
        let detail = ServerError::Forbidden("no access".into()).detail();
        assert_eq!(detail["status"], 403);
        assert_eq!(detail["kind"], "forbidden");
        assert_eq!(detail["message"], "Forbidden: no access");
    }
}
