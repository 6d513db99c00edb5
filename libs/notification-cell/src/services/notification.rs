use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};

use appointment_cell::models::AppointmentListQuery;
use appointment_cell::services::AppointmentBookingService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    NotificationError, NotificationFeed, NotificationPreferences, PreferencesRow, ReadMarker,
};
use crate::services::feed::build_feed;

pub struct NotificationService {
    supabase: SupabaseClient,
    appointments: AppointmentBookingService,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            appointments: AppointmentBookingService::new(config),
        }
    }

    pub async fn feed(&self, user: &User) -> Result<NotificationFeed, NotificationError> {
        let viewer = user.user_type().ok_or_else(|| {
            NotificationError::Forbidden("Unknown account type".to_string())
        })?;

        let appointments = self.appointments
            .list_appointments(user, AppointmentListQuery::default())
            .await?;

        let path = format!("/rest/v1/notification_reads?select=user_id,last_read_at&user_id=eq.{}", user.id);
        let marker: Option<ReadMarker> = self.supabase.select_one(&path).await?;

        let feed = build_feed(&appointments, viewer, marker.map(|m| m.last_read_at));
        debug!("Feed for {} has {} entries, {} unread", user.id, feed.notifications.len(), feed.unread_count);
        Ok(feed)
    }

    /// Move the read marker to now; everything currently in the feed becomes read.
    pub async fn mark_all_read(&self, user: &User) -> Result<ReadMarker, NotificationError> {
        let row = json!({
            "user_id": user.id,
            "last_read_at": Utc::now().to_rfc3339(),
        });
        let marker: ReadMarker = self.supabase.upsert("notification_reads", "user_id", row).await?;

        info!("Notifications marked read for {}", user.id);
        Ok(marker)
    }

    pub async fn preferences(&self, user: &User) -> Result<NotificationPreferences, NotificationError> {
        let path = format!(
            "/rest/v1/notification_preferences?select=email,sms,promotional&user_id=eq.{}",
            user.id
        );
        let row: Option<PreferencesRow> = self.supabase.select_one(&path).await?;

        Ok(row.map(NotificationPreferences::from).unwrap_or_default())
    }

    pub async fn update_preferences(
        &self,
        user: &User,
        preferences: NotificationPreferences,
    ) -> Result<NotificationPreferences, NotificationError> {
        let row = json!({
            "user_id": user.id,
            "email": preferences.email,
            "sms": preferences.sms,
            "promotional": preferences.promotional,
            "updated_at": Utc::now().to_rfc3339(),
        });
        let stored: PreferencesRow = self.supabase.upsert("notification_preferences", "user_id", row).await?;

        info!("Notification preferences updated for {}", user.id);
        Ok(stored.into())
    }
}
