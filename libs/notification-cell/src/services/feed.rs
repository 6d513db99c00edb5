use chrono::{DateTime, Utc};

use appointment_cell::models::Appointment;
use shared_models::auth::UserType;

use crate::models::{Notification, NotificationFeed};

/// Turn the viewer's appointments into a newest-first feed.
pub fn build_feed(
    appointments: &[Appointment],
    viewer: UserType,
    last_read_at: Option<DateTime<Utc>>,
) -> NotificationFeed {
    let mut notifications: Vec<Notification> = appointments
        .iter()
        .map(|appointment| to_notification(appointment, viewer, last_read_at))
        .collect();

    notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let unread_count = notifications.iter().filter(|n| !n.read).count();

    NotificationFeed {
        notifications,
        unread_count,
    }
}

pub fn to_notification(
    appointment: &Appointment,
    viewer: UserType,
    last_read_at: Option<DateTime<Utc>>,
) -> Notification {
    let counterpart = match viewer {
        UserType::Doctor => appointment.patient_name().unwrap_or("Patient"),
        _ => appointment.doctor_name().unwrap_or("Doctor"),
    };
    let timestamp = appointment.updated_at;

    Notification {
        id: appointment.id,
        title: format!("Appointment {}", appointment.status),
        description: format!("{} appointment with {}", appointment.status, counterpart),
        timestamp,
        read: last_read_at.is_some_and(|marker| timestamp <= marker),
    }
}
