use serde::Deserialize;
use thiserror::Error;

/// Postgres SQLSTATE for `unique_violation`.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid client configuration: {0}")]
    Config(String),

    #[error("Empty response: {0}")]
    EmptyResponse(String),
}

impl DatabaseError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DatabaseError::UniqueViolation { .. })
    }

    /// Name of the violated constraint, if this is a unique violation.
    pub fn violated_constraint(&self) -> Option<&str> {
        match self {
            DatabaseError::UniqueViolation { constraint } => Some(constraint),
            _ => None,
        }
    }

    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<PostgrestError> = serde_json::from_str(body).ok();

        let code = parsed.as_ref().and_then(|e| e.code.as_deref());
        let message = parsed.as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| body.to_string());

        // A bare 409 without a SQLSTATE is still treated as a duplicate key
        let unique = code == Some(UNIQUE_VIOLATION_CODE) || (status == 409 && code.is_none());
        if unique {
            let constraint = extract_constraint_name(&message).unwrap_or_else(|| "unknown".to_string());
            return DatabaseError::UniqueViolation { constraint };
        }

        match status {
            401 | 403 => DatabaseError::Unauthorized(message),
            404 => DatabaseError::NotFound(message),
            _ => DatabaseError::Api { status, message },
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

// `duplicate key value violates unique constraint "appointments_doctor_slot_key"`
fn extract_constraint_name(message: &str) -> Option<String> {
    let rest = message.split("unique constraint").nth(1)?;
    let start = rest.find('"')? + 1;
    let len = rest[start..].find('"')?;
    Some(rest[start..start + len].to_string())
}
