use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// Standard success envelope: `{"success": true, "message": ..., "data": ...}`.
pub fn ok<T: Serialize>(data: T, message: &str) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": message,
        "data": data,
    }))
}
