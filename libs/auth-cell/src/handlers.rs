use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State, Json},
    http::{HeaderMap, StatusCode},
};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{TokenResponse, User, UserType};
use shared_models::error::AppError;
use shared_utils::extractor::bearer_token;
use shared_utils::jwt;
use shared_utils::response::ok;

use crate::models::{AuthError, ChangePasswordRequest, LoginRequest, RegisterRequest};
use crate::services::AccountService;

fn parse_user_type(raw: &str) -> Result<UserType, AppError> {
    match raw.parse::<UserType>() {
        Ok(UserType::Admin) | Err(_) => Err(AuthError::InvalidUserType(raw.to_string()).into()),
        Ok(user_type) => Ok(user_type),
    }
}

#[axum::debug_handler]
pub async fn register(
    State(config): State<Arc<AppConfig>>,
    Path(user_type): Path<String>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user_type = parse_user_type(&user_type)?;

    let auth = AccountService::new(&config).register(user_type, request).await?;

    Ok((StatusCode::CREATED, ok(auth, "Registration successful")))
}

#[axum::debug_handler]
pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Path(user_type): Path<String>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let user_type = parse_user_type(&user_type)?;

    let auth = AccountService::new(&config).login(user_type, request).await?;

    Ok(ok(auth, "Login successful"))
}

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = bearer_token(&headers)?;

    match jwt::validate_token(token, &config.jwt_secret) {
        Ok(user) => {
            let response = TokenResponse {
                valid: true,
                user_id: user.id,
                email: user.email,
                role: user.role,
            };

            Ok(Json(response))
        },
        Err(err) => {
            Err(AppError::Auth(err))
        }
    }
}

pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = bearer_token(&headers)?;

    match jwt::validate_token(token, &config.jwt_secret) {
        Ok(_) => Ok(Json(json!({ "valid": true }))),
        Err(_) => Ok(Json(json!({ "valid": false }))),
    }
}

#[axum::debug_handler]
pub async fn me(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let profile = AccountService::new(&config).current_profile(&user).await?;

    Ok(ok(profile, "Profile fetched successfully"))
}

#[axum::debug_handler]
pub async fn change_password(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    AccountService::new(&config).change_password(&user, request).await?;

    Ok(ok(Value::Null, "Password updated successfully"))
}
