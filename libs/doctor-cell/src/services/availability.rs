use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_utils::validation::{parse_clock_time, parse_iso_date};

use crate::models::{
    AvailabilityRange, AvailableSlot, DailyTimeRange, Doctor, DoctorError, DoctorSlotsResponse,
    Slot, MAX_SLOT_DURATION_MINUTES, MIN_SLOT_DURATION_MINUTES,
};
use crate::services::doctor::DoctorService;

pub struct AvailabilityService {
    supabase: SupabaseClient,
    doctor_service: DoctorService,
}

#[derive(Debug, Deserialize)]
struct BookedSlotRow {
    slot_start: DateTime<Utc>,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctor_service: DoctorService::new(config),
        }
    }

    /// Slots of an active doctor on `date`, each flagged bookable or not.
    pub async fn get_available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<DoctorSlotsResponse, DoctorError> {
        debug!("Calculating available slots for doctor {} on {}", doctor_id, date);

        let doctor = self.doctor_service.get_doctor(doctor_id).await?;
        let generated = generate_slots(&doctor, date);

        let booked = if generated.is_empty() {
            BTreeSet::new()
        } else {
            self.booked_slot_starts(doctor_id, date).await?
        };

        let slots = mark_slots(&generated, &booked, Utc::now());
        debug!("Found {} slots ({} bookable) for doctor {} on {}",
               slots.len(), slots.iter().filter(|s| s.available).count(), doctor_id, date);

        Ok(DoctorSlotsResponse {
            doctor_id,
            date,
            slot_duration_minutes: doctor.slot_duration_minutes,
            slots,
        })
    }

    /// Start times held by live (non-cancelled) appointments of the doctor on `date`.
    pub async fn booked_slot_starts(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<BTreeSet<DateTime<Utc>>, DoctorError> {
        let path = format!(
            "/rest/v1/appointments?select=slot_start&doctor_id=eq.{}&date=eq.{}&status=neq.Cancelled",
            doctor_id,
            date.format("%Y-%m-%d"),
        );
        let rows: Vec<BookedSlotRow> = self.supabase.select(&path).await?;

        Ok(rows.into_iter().map(|r| r.slot_start).collect())
    }
}

// ==============================================================================
// SLOT GENERATION
// ==============================================================================

/// Expand a doctor's schedule into the slots offered on `date`. Times are UTC.
pub fn generate_slots(doctor: &Doctor, date: NaiveDate) -> Vec<Slot> {
    if !doctor.is_active || !is_bookable_date(doctor.availability_range.as_ref(), date) {
        return vec![];
    }

    let duration_minutes = doctor.slot_duration_minutes;
    if duration_minutes <= 0 {
        warn!("Doctor {} has non-positive slot duration {}", doctor.id, duration_minutes);
        return vec![];
    }
    let step = Duration::minutes(duration_minutes as i64);

    let mut slots = BTreeSet::new();
    for range in &doctor.daily_time_ranges {
        let (Some(start), Some(end)) = (parse_clock_time(&range.start), parse_clock_time(&range.end)) else {
            warn!("Skipping malformed time range {:?} for doctor {}", range, doctor.id);
            continue;
        };

        let range_end = date.and_time(end).and_utc();
        let mut cursor = date.and_time(start).and_utc();
        while cursor + step <= range_end {
            slots.insert(Slot { start: cursor, end: cursor + step });
            cursor += step;
        }
    }

    // BTreeSet keeps slots ordered by start and drops exact duplicates
    let mut seen_starts = BTreeSet::new();
    slots.into_iter()
        .filter(|slot| seen_starts.insert(slot.start))
        .collect()
}

pub fn is_bookable_date(range: Option<&AvailabilityRange>, date: NaiveDate) -> bool {
    let Some(range) = range else {
        return true;
    };

    if range.start_date.is_some_and(|start| date < start) {
        return false;
    }
    if range.end_date.is_some_and(|end| date > end) {
        return false;
    }

    let weekday = date.weekday().num_days_from_sunday() as u8;
    if range.excluded_weekdays.contains(&weekday) {
        return false;
    }

    !range.blocked_dates.iter().any(|blocked| parse_iso_date(blocked) == Some(date))
}

/// A slot is bookable when nobody holds its start and it has not started yet.
pub fn mark_slots(
    slots: &[Slot],
    booked_starts: &BTreeSet<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<AvailableSlot> {
    slots.iter()
        .map(|slot| AvailableSlot {
            start: slot.start,
            end: slot.end,
            available: slot.start > now && !booked_starts.contains(&slot.start),
        })
        .collect()
}

/// Whether `[start, end)` is exactly one of the slots the doctor offers that day.
pub fn is_offered_slot(doctor: &Doctor, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    generate_slots(doctor, start.date_naive())
        .iter()
        .any(|slot| slot.start == start && slot.end == end)
}

// ==============================================================================
// SCHEDULE VALIDATION
// ==============================================================================

pub fn validate_daily_time_ranges(ranges: &[DailyTimeRange]) -> Result<(), DoctorError> {
    for range in ranges {
        let start = parse_clock_time(&range.start).ok_or_else(|| {
            DoctorError::ValidationError(format!("Invalid start time '{}', expected HH:MM", range.start))
        })?;
        let end = parse_clock_time(&range.end).ok_or_else(|| {
            DoctorError::ValidationError(format!("Invalid end time '{}', expected HH:MM", range.end))
        })?;

        if start >= end {
            return Err(DoctorError::ValidationError(format!(
                "Time range {}-{} must start before it ends", range.start, range.end
            )));
        }
    }
    Ok(())
}

pub fn validate_availability_range(range: &AvailabilityRange) -> Result<(), DoctorError> {
    if let (Some(start), Some(end)) = (range.start_date, range.end_date) {
        if start > end {
            return Err(DoctorError::ValidationError(
                "Availability start date must not be after end date".to_string(),
            ));
        }
    }

    if let Some(day) = range.excluded_weekdays.iter().find(|d| **d > 6) {
        return Err(DoctorError::ValidationError(format!(
            "Excluded weekday {} must be between 0 (Sunday) and 6 (Saturday)", day
        )));
    }

    if let Some(bad) = range.blocked_dates.iter().find(|d| parse_iso_date(d).is_none()) {
        return Err(DoctorError::ValidationError(format!(
            "Blocked date '{}' must be formatted YYYY-MM-DD", bad
        )));
    }

    Ok(())
}

pub fn validate_slot_duration(minutes: i32) -> Result<(), DoctorError> {
    if !(MIN_SLOT_DURATION_MINUTES..=MAX_SLOT_DURATION_MINUTES).contains(&minutes) {
        return Err(DoctorError::ValidationError(format!(
            "Slot duration must be between {} and {} minutes",
            MIN_SLOT_DURATION_MINUTES, MAX_SLOT_DURATION_MINUTES
        )));
    }
    Ok(())
}
