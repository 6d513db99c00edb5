use std::sync::Arc;

use axum::{
    extract::{State, Extension},
    Json,
};
use serde_json::Value;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::response::ok;

use crate::models::NotificationPreferences;
use crate::services::NotificationService;

#[axum::debug_handler]
pub async fn list_notifications(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let feed = NotificationService::new(&config).feed(&user).await?;

    Ok(ok(feed, "Notifications fetched"))
}

#[axum::debug_handler]
pub async fn mark_all_read(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let marker = NotificationService::new(&config).mark_all_read(&user).await?;

    Ok(ok(marker, "Notifications marked as read"))
}

#[axum::debug_handler]
pub async fn get_preferences(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let preferences = NotificationService::new(&config).preferences(&user).await?;

    Ok(ok(preferences, "Notification preferences fetched"))
}

#[axum::debug_handler]
pub async fn update_preferences(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(preferences): Json<NotificationPreferences>,
) -> Result<Json<Value>, AppError> {
    let stored = NotificationService::new(&config)
        .update_preferences(&user, preferences)
        .await?;

    Ok(ok(stored, "Notification preferences updated"))
}
