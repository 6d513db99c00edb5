use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use appointment_cell::AppointmentError;
use shared_database::DatabaseError;
use shared_models::error::AppError;

/// One feed entry, derived from an appointment the user takes part in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationFeed {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationPreferences {
    pub email: bool,
    pub sms: bool,
    pub promotional: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            sms: false,
            promotional: false,
        }
    }
}

/// Row of `notification_reads`: everything at or before `last_read_at` counts as read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadMarker {
    pub user_id: Uuid,
    pub last_read_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PreferencesRow {
    pub email: bool,
    pub sms: bool,
    pub promotional: bool,
}

impl From<PreferencesRow> for NotificationPreferences {
    fn from(row: PreferencesRow) -> Self {
        Self {
            email: row.email,
            sms: row.sms,
            promotional: row.promotional,
        }
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<AppointmentError> for NotificationError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Database(e) => NotificationError::Database(e),
            other => NotificationError::Forbidden(other.to_string()),
        }
    }
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::Forbidden(msg) => AppError::Forbidden(msg),
            NotificationError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
