// libs/appointment-cell/src/services/booking.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::services::availability::is_offered_slot;
use doctor_cell::services::{AvailabilityService, DoctorService};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::{User, UserType};

use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, AppointmentScope, AppointmentStatus,
    BookAppointmentRequest, BookedSlotsResponse, CancelAppointmentRequest, PaymentStatus,
    UpdateStatusRequest, APPOINTMENT_COLUMNS, APPOINTMENT_LISTING_COLUMNS,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::pricing::PricingService;

pub struct AppointmentBookingService {
    supabase: SupabaseClient,
    doctor_service: DoctorService,
    availability_service: AvailabilityService,
    pricing_service: PricingService,
    lifecycle_service: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctor_service: DoctorService::new(config),
            availability_service: AvailabilityService::new(config),
            pricing_service: PricingService::new(config),
            lifecycle_service: AppointmentLifecycleService::new(),
        }
    }

    // ==============================================================================
    // BOOKING
    // ==============================================================================

    /// Reserve a slot for `patient_id`.
    ///
    /// Nothing is read to decide whether the slot is free: the row is inserted and the
    /// partial unique index on `(doctor_id, slot_start)` over live appointments rejects
    /// every insert after the first. The rejection surfaces as `SlotAlreadyBooked`.
    pub async fn book_appointment(
        &self,
        patient_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Booking slot {} for doctor {} by patient {}",
               request.slot_start, request.doctor_id, patient_id);

        validate_slot_times(request.slot_start, request.slot_end, Utc::now())?;

        let doctor = self.doctor_service.get_bookable_doctor(request.doctor_id).await?;

        if !is_offered_slot(&doctor, request.slot_start, request.slot_end) {
            warn!("Slot {} - {} is not offered by doctor {}",
                  request.slot_start, request.slot_end, doctor.id);
            return Err(AppointmentError::SlotNotOffered);
        }

        let quote = self.pricing_service.quote(&doctor)?;

        let now = Utc::now().to_rfc3339();
        let row = json!({
            "doctor_id": request.doctor_id,
            "patient_id": patient_id,
            "date": request.slot_start.date_naive(),
            "slot_start": request.slot_start,
            "slot_end": request.slot_end,
            "consultation_type": request.consultation_type,
            "status": AppointmentStatus::Scheduled,
            "symptoms": request.symptoms,
            "consultation_fees": quote.consultation_fees,
            "platform_fees": quote.platform_fees,
            "total_amount": quote.total_amount,
            "payment_status": PaymentStatus::Pending,
            "created_at": now,
            "updated_at": now,
        });

        match self.supabase.insert::<Appointment>("appointments", row).await {
            Ok(appointment) => {
                info!("Appointment {} booked: doctor {} at {}",
                      appointment.id, appointment.doctor_id, appointment.slot_start);
                Ok(appointment)
            }
            Err(e) if e.is_unique_violation() => {
                info!("Slot {} for doctor {} already taken (constraint {})",
                      request.slot_start, request.doctor_id, e.violated_constraint().unwrap_or("unknown"));
                Err(AppointmentError::SlotAlreadyBooked)
            }
            Err(e) => Err(AppointmentError::Database(e)),
        }
    }

    /// Start times of live appointments for the doctor on `date`.
    pub async fn booked_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<BookedSlotsResponse, AppointmentError> {
        let booked = self.availability_service.booked_slot_starts(doctor_id, date).await?;

        Ok(BookedSlotsResponse {
            doctor_id,
            date,
            booked_slots: booked.into_iter().collect(),
        })
    }

    // ==============================================================================
    // READS
    // ==============================================================================

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?select={}&id=eq.{}",
            APPOINTMENT_LISTING_COLUMNS, appointment_id
        );
        self.supabase.select_one(&path).await?
            .ok_or(AppointmentError::NotFound)
    }

    /// Appointment visible to `user`: its doctor, its patient, or an admin.
    pub async fn get_appointment_for(
        &self,
        user: &User,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id).await?;

        if !user.is_admin() && !appointment.is_participant(&user.id) {
            return Err(AppointmentError::Forbidden(
                "Not authorized to view this appointment".to_string(),
            ));
        }

        Ok(appointment)
    }

    pub async fn list_appointments(
        &self,
        user: &User,
        query: AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let owner_filter = match user.user_type() {
            Some(UserType::Doctor) => Some(format!("doctor_id=eq.{}", user.id)),
            Some(UserType::Patient) => Some(format!("patient_id=eq.{}", user.id)),
            Some(UserType::Admin) => None,
            None => return Err(AppointmentError::Forbidden("Unknown account type".to_string())),
        };

        let filters = build_list_filters(owner_filter, &query, Utc::now());
        let path = format!("/rest/v1/appointments?{}", filters.join("&"));

        let appointments: Vec<Appointment> = self.supabase.select(&path).await?;
        debug!("Listed {} appointments for {}", appointments.len(), user.id);
        Ok(appointments)
    }

    // ==============================================================================
    // LIFECYCLE
    // ==============================================================================

    /// Doctor-driven status change along the lifecycle.
    pub async fn update_status(
        &self,
        user: &User,
        appointment_id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id).await?;

        if appointment.doctor_id.to_string() != user.id {
            return Err(AppointmentError::Forbidden(
                "Only the appointment's doctor can change its status".to_string(),
            ));
        }

        self.lifecycle_service.validate_status_transition(appointment.status, request.status)?;

        let mut changes = Map::new();
        changes.insert("status".to_string(), json!(request.status));
        if let Some(prescription) = request.prescription {
            changes.insert("prescription".to_string(), json!(prescription));
        }
        if let Some(notes) = request.notes {
            changes.insert("notes".to_string(), json!(notes));
        }
        if request.status == AppointmentStatus::Cancelled {
            let payment_status = self.lifecycle_service.payment_status_after_cancel(appointment.payment_status);
            changes.insert("payment_status".to_string(), json!(payment_status));
        }

        let updated = self.apply_transition(&appointment, Value::Object(changes)).await?;
        info!("Appointment {} moved {} -> {}", appointment_id, appointment.status, updated.status);
        Ok(updated)
    }

    /// Participant cancellation of a scheduled appointment before it starts.
    /// The cancelled row no longer holds the slot, so it can be booked again.
    pub async fn cancel_appointment(
        &self,
        user: &User,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id).await?;

        if !appointment.is_participant(&user.id) {
            return Err(AppointmentError::Forbidden(
                "Only participants can cancel this appointment".to_string(),
            ));
        }

        self.lifecycle_service.validate_cancellation(appointment.status, appointment.slot_start, Utc::now())?;

        let payment_status = self.lifecycle_service.payment_status_after_cancel(appointment.payment_status);
        let changes = json!({
            "status": AppointmentStatus::Cancelled,
            "cancellation_reason": request.reason,
            "payment_status": payment_status,
        });

        let updated = self.apply_transition(&appointment, changes).await?;
        info!("Appointment {} cancelled by {}", appointment_id, user.id);
        Ok(updated)
    }

    /// Conditional PATCH: applies only while the row still has the status and
    /// payment status we read.
    async fn apply_transition(
        &self,
        appointment: &Appointment,
        mut changes: Value,
    ) -> Result<Appointment, AppointmentError> {
        if let Some(map) = changes.as_object_mut() {
            map.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        let filter = format!(
            "id=eq.{}&status=eq.{}&payment_status=eq.{}&select={}",
            appointment.id,
            urlencoding::encode(appointment.status.as_str()),
            appointment.payment_status.as_str(),
            APPOINTMENT_COLUMNS,
        );
        let updated: Vec<Appointment> = self.supabase.update("appointments", &filter, changes).await?;

        updated.into_iter().next().ok_or_else(|| {
            warn!("Appointment {} changed concurrently", appointment.id);
            AppointmentError::StaleStatus
        })
    }
}

pub fn validate_slot_times(
    slot_start: DateTime<Utc>,
    slot_end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), AppointmentError> {
    if slot_end <= slot_start {
        return Err(AppointmentError::InvalidTime("slot must end after it starts".to_string()));
    }
    if slot_start <= now {
        return Err(AppointmentError::InvalidTime("slot must start in the future".to_string()));
    }
    Ok(())
}

/// PostgREST query parameters for an appointment listing.
pub fn build_list_filters(
    owner_filter: Option<String>,
    query: &AppointmentListQuery,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut parts = vec![format!("select={}", APPOINTMENT_LISTING_COLUMNS)];
    parts.extend(owner_filter);

    if let Some(status) = query.status {
        parts.push(format!("status=eq.{}", urlencoding::encode(status.as_str())));
    }

    let now = now.format("%Y-%m-%dT%H:%M:%SZ");
    match query.scope.unwrap_or_default() {
        AppointmentScope::Upcoming => {
            parts.push(format!("slot_start=gte.{}", now));
            parts.push("order=slot_start.asc".to_string());
        }
        AppointmentScope::Past => {
            parts.push(format!("slot_start=lt.{}", now));
            parts.push("order=slot_start.desc".to_string());
        }
        AppointmentScope::All => {
            parts.push("order=slot_start.desc".to_string());
        }
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_slot_times_must_be_ordered_and_future() {
        let now = Utc.with_ymd_and_hms(2030, 5, 6, 8, 0, 0).unwrap();

        assert!(validate_slot_times(now + Duration::hours(1), now + Duration::minutes(90), now).is_ok());
        assert!(validate_slot_times(now + Duration::hours(1), now + Duration::hours(1), now).is_err());
        assert!(validate_slot_times(now - Duration::minutes(30), now, now).is_err());
    }

    #[test]
    fn test_upcoming_listing_filters() {
        let now = Utc.with_ymd_and_hms(2030, 5, 6, 8, 0, 0).unwrap();
        let query = AppointmentListQuery {
            status: Some(AppointmentStatus::InProgress),
            scope: Some(AppointmentScope::Upcoming),
        };

        let parts = build_list_filters(Some("patient_id=eq.p1".to_string()), &query, now);

        assert!(parts.contains(&"patient_id=eq.p1".to_string()));
        assert!(parts.contains(&"status=eq.In%20Progress".to_string()));
        assert!(parts.contains(&"slot_start=gte.2030-05-06T08:00:00Z".to_string()));
        assert!(parts.contains(&"order=slot_start.asc".to_string()));
    }

    #[test]
    fn test_default_listing_is_newest_first() {
        let parts = build_list_filters(None, &AppointmentListQuery::default(), Utc::now());

        assert!(parts.contains(&"order=slot_start.desc".to_string()));
        assert!(!parts.iter().any(|p| p.starts_with("slot_start=")));
        assert!(!parts.iter().any(|p| p.starts_with("doctor_id=") || p.starts_with("patient_id=")));
    }
}
