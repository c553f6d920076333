use axum::http::StatusCode;
use thiserror::Error;
use tracing_error::SpanTrace;

#[derive(Error, Debug)]
pub enum ToolforgeError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-2xx answer from the CRUD service, reduced to its best message.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error("Invalid tool specification")]
    InvalidSpecification(Vec<String>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    /// Client-side form validation failed; never sent to the network.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String, SpanTrace),
}

impl ToolforgeError {
    pub fn internal(msg: impl Into<String>) -> Self {
        ToolforgeError::Internal(msg.into(), SpanTrace::capture())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ToolforgeError::Api { status, .. } => (*status, "UPSTREAM_ERROR"),
            ToolforgeError::InvalidSpecification(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_SPECIFICATION")
            }
            ToolforgeError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ToolforgeError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ToolforgeError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ToolforgeError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ToolforgeError::Serialization(_) => (StatusCode::BAD_REQUEST, "SERIALIZATION_ERROR"),
            ToolforgeError::Network(_) => (StatusCode::BAD_GATEWAY, "NETWORK_ERROR"),
            ToolforgeError::Database(_) | ToolforgeError::Migration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
            }
            ToolforgeError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            ToolforgeError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
            ToolforgeError::Internal(_, _) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

#[derive(Debug)]
pub struct ObservedError {
    pub inner: ToolforgeError,
    pub span_trace: SpanTrace,
}

impl std::fmt::Display for ObservedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for ObservedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner)
    }
}

impl<E> From<E> for ObservedError
where
    E: Into<ToolforgeError>,
{
    fn from(error: E) -> Self {
        Self {
            inner: error.into(),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl axum::response::IntoResponse for ObservedError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = self.inner.status_and_code();
        let msg = self.inner.to_string();

        if status.is_server_error() {
            tracing::error!("{} ({})\n{}", msg, code, self.span_trace);
        } else {
            tracing::debug!("{} ({})", msg, code);
        }

        let mut body = serde_json::json!({
            "error": msg,
            "message": msg,
            "code": code,
        });
        if let ToolforgeError::InvalidSpecification(errors) | ToolforgeError::Validation(errors) =
            &self.inner
        {
            body["errors"] = serde_json::json!(errors);
        }

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ObservedError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_observed_error_wraps_inner() {
        let err: ObservedError = ToolforgeError::NotFound("Tool not found".into()).into();
        assert_eq!(err.to_string(), "Tool not found");
        assert!(matches!(err.inner, ToolforgeError::NotFound(_)));
    }

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (ToolforgeError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ToolforgeError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                ToolforgeError::InvalidSpecification(vec!["bad".into()]),
                StatusCode::BAD_REQUEST,
            ),
            (ToolforgeError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let observed: ObservedError = err.into();
            let response = observed.into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
