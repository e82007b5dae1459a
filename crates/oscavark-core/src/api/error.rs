use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - session may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rejected: {0}")]
    BadRequest(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// PostgREST code for "no rows" on single-object requests
const PGRST_NO_ROWS: &str = "PGRST116";

/// Postgres unique_violation
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Postgres foreign_key_violation
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// Error body shapes returned by PostgREST (`code`/`message`) and GoTrue
/// (`error_description`, `msg` or `message`).
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<serde_json::Value>,
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    details: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> Option<String> {
        match &self.code {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    fn message(&self) -> Option<String> {
        self.error_description
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.message.clone())
            .or_else(|| self.details.clone())
    }
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message()
            .unwrap_or_else(|| Self::truncate_body(body));

        match parsed.code().as_deref() {
            Some(PGRST_NO_ROWS) => return ApiError::NotFound(message),
            Some(PG_UNIQUE_VIOLATION) => return ApiError::Conflict(message),
            Some(PG_FOREIGN_KEY_VIOLATION) => return ApiError::BadRequest(message),
            _ => {}
        }

        match status.as_u16() {
            400 | 422 => ApiError::BadRequest(message),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(message),
            404 | 406 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(message),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, message)),
        }
    }

    /// The server's message without the variant prefix, for inline display.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::AccessDenied(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::BadRequest(m)
            | ApiError::ServerError(m)
            | ApiError::InvalidResponse(m) => m.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_gotrue_invalid_credentials() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, body);
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Invalid login credentials"));
        assert_eq!(err.user_message(), "Invalid login credentials");
    }

    #[test]
    fn test_gotrue_msg_field() {
        let body = r#"{"code":422,"msg":"User already registered"}"#;
        let err = ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(err.user_message(), "User already registered");
    }

    #[test]
    fn test_postgrest_codes() {
        let no_rows = r#"{"code":"PGRST116","details":"The result contains 0 rows","hint":null,"message":"JSON object requested, multiple (or no) rows returned"}"#;
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_ACCEPTABLE, no_rows),
            ApiError::NotFound(_)
        ));

        let dup = r#"{"code":"23505","details":null,"hint":null,"message":"duplicate key value violates unique constraint \"senior_citizens_osca_id_key\""}"#;
        assert!(matches!(
            ApiError::from_status(StatusCode::CONFLICT, dup),
            ApiError::Conflict(_)
        ));
    }

    #[test]
    fn test_plain_text_body() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream unavailable");
        assert!(matches!(err, ApiError::ServerError(ref m) if m == "upstream unavailable"));
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated"));
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
    }
}
