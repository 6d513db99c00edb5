use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;

/// Columns returned to API callers. `password_hash` is deliberately absent.
pub const DOCTOR_COLUMNS: &str = "id,name,email,profile_image,specialization,category,qualification,experience,about,fees,hospital_info,availability_range,daily_time_ranges,slot_duration_minutes,is_verified,is_active,created_at,updated_at";

pub const DEFAULT_SLOT_DURATION_MINUTES: i32 = 30;
pub const MIN_SLOT_DURATION_MINUTES: i32 = 5;
pub const MAX_SLOT_DURATION_MINUTES: i32 = 240;

// ==============================================================================
// CORE DOCTOR MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    pub specialization: Option<Specialization>,
    #[serde(default)]
    pub category: Vec<HealthcareCategory>,
    pub qualification: Option<String>,
    pub experience: Option<i32>,
    pub about: Option<String>,
    pub fees: Option<f64>,
    pub hospital_info: Option<HospitalInfo>,
    #[serde(default)]
    pub availability_range: Option<AvailabilityRange>,
    #[serde(default)]
    pub daily_time_ranges: Vec<DailyTimeRange>,
    #[serde(default = "default_slot_duration")]
    pub slot_duration_minutes: i32,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn consultation_fee(&self) -> f64 {
        self.fees.unwrap_or(0.0)
    }
}

fn default_slot_duration() -> i32 {
    DEFAULT_SLOT_DURATION_MINUTES
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HospitalInfo {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

/// Calendar window in which a doctor takes bookings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AvailabilityRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// 0 = Sunday, 1 = Monday, ...
    #[serde(default)]
    pub excluded_weekdays: Vec<u8>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub blocked_dates: Vec<String>,
}

/// A working-hours window repeated on every bookable day, e.g. `09:00`-`17:00`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyTimeRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Specialization {
    Cardiologist,
    Dermatologist,
    Orthopedic,
    Pediatrician,
    Neurologist,
    Gynecologist,
    #[serde(rename = "General Physician")]
    GeneralPhysician,
    #[serde(rename = "ENT Specialist")]
    EntSpecialist,
    Psychiatrist,
    Ophthalmologist,
    Dentist,
    Urologist,
    Oncologist,
    Endocrinologist,
    Gastroenterologist,
    Pulmonologist,
    Nephrologist,
    Rheumatologist,
}

impl Specialization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Specialization::Cardiologist => "Cardiologist",
            Specialization::Dermatologist => "Dermatologist",
            Specialization::Orthopedic => "Orthopedic",
            Specialization::Pediatrician => "Pediatrician",
            Specialization::Neurologist => "Neurologist",
            Specialization::Gynecologist => "Gynecologist",
            Specialization::GeneralPhysician => "General Physician",
            Specialization::EntSpecialist => "ENT Specialist",
            Specialization::Psychiatrist => "Psychiatrist",
            Specialization::Ophthalmologist => "Ophthalmologist",
            Specialization::Dentist => "Dentist",
            Specialization::Urologist => "Urologist",
            Specialization::Oncologist => "Oncologist",
            Specialization::Endocrinologist => "Endocrinologist",
            Specialization::Gastroenterologist => "Gastroenterologist",
            Specialization::Pulmonologist => "Pulmonologist",
            Specialization::Nephrologist => "Nephrologist",
            Specialization::Rheumatologist => "Rheumatologist",
        }
    }
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum HealthcareCategory {
    #[serde(rename = "Primary Care")]
    PrimaryCare,
    #[serde(rename = "Manage Your Condition")]
    ManageYourCondition,
    #[serde(rename = "Mental & Behavioral Health")]
    MentalAndBehavioralHealth,
    #[serde(rename = "Sexual Health")]
    SexualHealth,
    #[serde(rename = "Children's Health")]
    ChildrensHealth,
    #[serde(rename = "Senior Health")]
    SeniorHealth,
    #[serde(rename = "Women's Health")]
    WomensHealth,
    #[serde(rename = "Men's Health")]
    MensHealth,
    Wellness,
    #[serde(rename = "Heart Health")]
    HeartHealth,
    #[serde(rename = "Skin Care")]
    SkinCare,
    #[serde(rename = "Bone & Joint Health")]
    BoneAndJointHealth,
    #[serde(rename = "Brain & Nerves")]
    BrainAndNerves,
    #[serde(rename = "Eye Care")]
    EyeCare,
    #[serde(rename = "Dental Care")]
    DentalCare,
    #[serde(rename = "Urinary Health")]
    UrinaryHealth,
    #[serde(rename = "Cancer Care")]
    CancerCare,
    #[serde(rename = "Hormonal Health")]
    HormonalHealth,
    #[serde(rename = "Digestive Health")]
    DigestiveHealth,
    #[serde(rename = "Lung Health")]
    LungHealth,
    #[serde(rename = "Kidney Health")]
    KidneyHealth,
    #[serde(rename = "Immune System")]
    ImmuneSystem,
}

impl HealthcareCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthcareCategory::PrimaryCare => "Primary Care",
            HealthcareCategory::ManageYourCondition => "Manage Your Condition",
            HealthcareCategory::MentalAndBehavioralHealth => "Mental & Behavioral Health",
            HealthcareCategory::SexualHealth => "Sexual Health",
            HealthcareCategory::ChildrensHealth => "Children's Health",
            HealthcareCategory::SeniorHealth => "Senior Health",
            HealthcareCategory::WomensHealth => "Women's Health",
            HealthcareCategory::MensHealth => "Men's Health",
            HealthcareCategory::Wellness => "Wellness",
            HealthcareCategory::HeartHealth => "Heart Health",
            HealthcareCategory::SkinCare => "Skin Care",
            HealthcareCategory::BoneAndJointHealth => "Bone & Joint Health",
            HealthcareCategory::BrainAndNerves => "Brain & Nerves",
            HealthcareCategory::EyeCare => "Eye Care",
            HealthcareCategory::DentalCare => "Dental Care",
            HealthcareCategory::UrinaryHealth => "Urinary Health",
            HealthcareCategory::CancerCare => "Cancer Care",
            HealthcareCategory::HormonalHealth => "Hormonal Health",
            HealthcareCategory::DigestiveHealth => "Digestive Health",
            HealthcareCategory::LungHealth => "Lung Health",
            HealthcareCategory::KidneyHealth => "Kidney Health",
            HealthcareCategory::ImmuneSystem => "Immune System",
        }
    }
}

impl fmt::Display for HealthcareCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==============================================================================
// SLOT MODELS
// ==============================================================================

/// A bookable interval produced from a doctor's schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailableSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSlotsResponse {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slot_duration_minutes: i32,
    pub slots: Vec<AvailableSlot>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DoctorSortField {
    Fees,
    Experience,
    Name,
    #[default]
    CreatedAt,
}

impl DoctorSortField {
    pub fn column(&self) -> &'static str {
        match self {
            DoctorSortField::Fees => "fees",
            DoctorSortField::Experience => "experience",
            DoctorSortField::Name => "name",
            DoctorSortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorSearchQuery {
    pub search: Option<String>,
    pub specialization: Option<Specialization>,
    pub category: Option<HealthcareCategory>,
    pub city: Option<String>,
    pub min_fees: Option<f64>,
    pub max_fees: Option<f64>,
    pub sort_by: Option<DoctorSortField>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit as u64) };
        Self { page, limit, total, total_pages }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSearchResponse {
    pub doctors: Vec<Doctor>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub profile_image: Option<String>,
    pub specialization: Option<Specialization>,
    pub category: Option<Vec<HealthcareCategory>>,
    pub qualification: Option<String>,
    pub experience: Option<i32>,
    pub about: Option<String>,
    pub fees: Option<f64>,
    pub hospital_info: Option<HospitalInfo>,
    pub availability_range: Option<AvailabilityRange>,
    pub daily_time_ranges: Option<Vec<DailyTimeRange>>,
    pub slot_duration_minutes: Option<i32>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Doctor is not accepting appointments")]
    Inactive,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            DoctorError::Inactive => AppError::BadRequest(err.to_string()),
            DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
            DoctorError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_specialization_wire_names() {
        let parsed: Specialization = serde_json::from_value(json!("ENT Specialist")).unwrap();
        assert_eq!(parsed, Specialization::EntSpecialist);
        assert_eq!(serde_json::to_value(Specialization::GeneralPhysician).unwrap(), json!("General Physician"));
    }

    #[test]
    fn test_category_wire_names() {
        let parsed: HealthcareCategory = serde_json::from_value(json!("Children's Health")).unwrap();
        assert_eq!(parsed.as_str(), "Children's Health");
        assert!(serde_json::from_value::<HealthcareCategory>(json!("Astrology")).is_err());
    }

    #[test]
    fn test_password_hash_never_serialised() {
        let doctor: Doctor = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "name": "Dr. Mehta",
            "email": "mehta@clinic.example",
            "password_hash": "$argon2id$...",
            "specialization": null,
            "qualification": null,
            "experience": null,
            "about": null,
            "fees": 400.0,
            "hospital_info": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })).unwrap();

        assert!(doctor.password_hash.is_some());
        assert_eq!(doctor.slot_duration_minutes, 30);
        assert!(doctor.is_active);

        let out = serde_json::to_value(&doctor).unwrap();
        assert!(out.get("password_hash").is_none());
    }

    #[test]
    fn test_pagination_rounds_up() {
        assert_eq!(Pagination::new(1, 20, 41).total_pages, 3);
        assert_eq!(Pagination::new(1, 20, 0).total_pages, 0);
    }
}
