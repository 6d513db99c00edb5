use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::auth::UserType;
use shared_models::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Credential columns shared by the `doctors` and `patients` tables.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: AuthUser,
}

/// Table and selectable columns for an account kind.
pub fn account_table(user_type: UserType) -> Result<(&'static str, &'static str), AuthError> {
    match user_type {
        UserType::Doctor => Ok(("doctors", "id,name,email,password_hash,is_active")),
        UserType::Patient => Ok(("patients", "id,name,email,password_hash")),
        UserType::Admin => Err(AuthError::InvalidUserType(user_type.to_string())),
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unsupported account type: {0}")]
    InvalidUserType(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Account not found")]
    NotFound,

    #[error("Token error: {0}")]
    Token(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl From<DatabaseError> for AuthError {
    fn from(err: DatabaseError) -> Self {
        if err.is_unique_violation() {
            AuthError::EmailTaken
        } else {
            AuthError::Database(err)
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidUserType(_) => AppError::BadRequest(err.to_string()),
            AuthError::ValidationError(msg) => AppError::ValidationError(msg),
            AuthError::EmailTaken => AppError::Conflict(err.to_string()),
            AuthError::InvalidCredentials => AppError::Auth(err.to_string()),
            AuthError::AccountDisabled => AppError::Forbidden(err.to_string()),
            AuthError::NotFound => AppError::NotFound(err.to_string()),
            AuthError::Token(msg) => AppError::Auth(msg),
            AuthError::PasswordHash(msg) => AppError::Internal(msg),
            AuthError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
