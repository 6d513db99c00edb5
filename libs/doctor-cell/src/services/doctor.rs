use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{
    Doctor, DoctorError, DoctorSearchQuery, DoctorSearchResponse, Pagination,
    UpdateDoctorRequest, DOCTOR_COLUMNS,
};
use crate::services::availability::{
    validate_availability_range, validate_daily_time_ranges, validate_slot_duration,
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Public directory search over active doctors.
    pub async fn search_doctors(&self, query: DoctorSearchQuery) -> Result<DoctorSearchResponse, DoctorError> {
        debug!("Searching doctors with filters: {:?}", query);

        let page = query.page.unwrap_or(1);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if page == 0 {
            return Err(DoctorError::ValidationError("page must be at least 1".to_string()));
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(DoctorError::ValidationError(format!("limit must be between 1 and {}", MAX_PAGE_SIZE)));
        }
        if let (Some(min), Some(max)) = (query.min_fees, query.max_fees) {
            if min > max {
                return Err(DoctorError::ValidationError("min_fees must not exceed max_fees".to_string()));
            }
        }

        let path = format!("/rest/v1/doctors?{}", build_search_filters(&query, page, limit).join("&"));
        let (doctors, total): (Vec<Doctor>, Option<u64>) = self.supabase.select_with_count(&path).await?;

        let total = total.unwrap_or(doctors.len() as u64);
        debug!("Doctor search matched {} doctors", total);

        Ok(DoctorSearchResponse {
            doctors,
            pagination: Pagination::new(page, limit, total),
        })
    }

    /// Active doctor by id.
    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        let doctor = self.get_doctor_any(doctor_id).await?;
        if !doctor.is_active {
            return Err(DoctorError::NotFound);
        }
        Ok(doctor)
    }

    /// Doctor by id regardless of the active flag, e.g. for the doctor's own profile.
    pub async fn get_doctor_any(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?select={}&id=eq.{}", DOCTOR_COLUMNS, doctor_id);
        self.supabase.select_one(&path).await?
            .ok_or(DoctorError::NotFound)
    }

    /// Doctor that can take new bookings; inactive doctors are reported as such rather than hidden.
    pub async fn get_bookable_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        let doctor = self.get_doctor_any(doctor_id).await?;
        if !doctor.is_active {
            return Err(DoctorError::Inactive);
        }
        Ok(doctor)
    }

    pub async fn update_profile(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
    ) -> Result<Doctor, DoctorError> {
        debug!("Updating doctor profile: {}", doctor_id);

        let changes = build_profile_changes(request)?;
        let filter = format!("id=eq.{}&select={}", doctor_id, DOCTOR_COLUMNS);
        let updated: Vec<Doctor> = self.supabase.update("doctors", &filter, changes).await?;

        let doctor = updated.into_iter().next().ok_or(DoctorError::NotFound)?;
        info!("Doctor {} profile updated", doctor_id);
        Ok(doctor)
    }
}

/// PostgREST query parameters for a directory search.
pub fn build_search_filters(query: &DoctorSearchQuery, page: u32, limit: u32) -> Vec<String> {
    let mut parts = vec![
        format!("select={}", DOCTOR_COLUMNS),
        "is_active=eq.true".to_string(),
    ];

    if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        // Quoted so commas and parentheses in the term stay inside the or=() value
        let escaped = term.replace('\\', "\\\\").replace('"', "\\\"");
        let pattern = urlencoding::encode(&format!("\"*{}*\"", escaped)).into_owned();
        parts.push(format!("or=(name.ilike.{p},specialization.ilike.{p})", p = pattern));
    }
    if let Some(specialization) = query.specialization {
        parts.push(format!("specialization=eq.{}", urlencoding::encode(specialization.as_str())));
    }
    if let Some(category) = query.category {
        let array_literal = format!("{{\"{}\"}}", category.as_str());
        parts.push(format!("category=cs.{}", urlencoding::encode(&array_literal)));
    }
    if let Some(city) = query.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        parts.push(format!("hospital_info->>city=ilike.{}", urlencoding::encode(city)));
    }
    if let Some(min) = query.min_fees {
        parts.push(format!("fees=gte.{}", min));
    }
    if let Some(max) = query.max_fees {
        parts.push(format!("fees=lte.{}", max));
    }

    let sort_by = query.sort_by.unwrap_or_default();
    let sort_order = query.sort_order.unwrap_or_default();
    parts.push(format!("order={}.{}", sort_by.column(), sort_order.as_str()));
    parts.push(format!("limit={}", limit));
    parts.push(format!("offset={}", (page - 1) as u64 * limit as u64));

    parts
}

fn build_profile_changes(request: UpdateDoctorRequest) -> Result<Value, DoctorError> {
    let mut update_data = serde_json::Map::new();

    if let Some(name) = request.name {
        if name.trim().is_empty() {
            return Err(DoctorError::ValidationError("Name cannot be empty".to_string()));
        }
        update_data.insert("name".to_string(), json!(name.trim()));
    }
    if let Some(profile_image) = request.profile_image {
        update_data.insert("profile_image".to_string(), json!(profile_image));
    }
    if let Some(specialization) = request.specialization {
        update_data.insert("specialization".to_string(), json!(specialization));
    }
    if let Some(category) = request.category {
        update_data.insert("category".to_string(), json!(category));
    }
    if let Some(qualification) = request.qualification {
        update_data.insert("qualification".to_string(), json!(qualification));
    }
    if let Some(experience) = request.experience {
        if experience < 0 {
            return Err(DoctorError::ValidationError("Experience cannot be negative".to_string()));
        }
        update_data.insert("experience".to_string(), json!(experience));
    }
    if let Some(about) = request.about {
        update_data.insert("about".to_string(), json!(about));
    }
    if let Some(fees) = request.fees {
        if !fees.is_finite() || fees < 0.0 {
            return Err(DoctorError::ValidationError("Fees cannot be negative".to_string()));
        }
        update_data.insert("fees".to_string(), json!(fees));
    }
    if let Some(hospital_info) = request.hospital_info {
        update_data.insert("hospital_info".to_string(), json!(hospital_info));
    }
    if let Some(range) = request.availability_range {
        validate_availability_range(&range)?;
        update_data.insert("availability_range".to_string(), json!(range));
    }
    if let Some(ranges) = request.daily_time_ranges {
        validate_daily_time_ranges(&ranges)?;
        update_data.insert("daily_time_ranges".to_string(), json!(ranges));
    }
    if let Some(duration) = request.slot_duration_minutes {
        validate_slot_duration(duration)?;
        update_data.insert("slot_duration_minutes".to_string(), json!(duration));
    }

    if update_data.is_empty() {
        return Err(DoctorError::ValidationError("No profile fields to update".to_string()));
    }

    update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
    Ok(Value::Object(update_data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyTimeRange, DoctorSortField, HealthcareCategory, SortOrder, Specialization};

    #[test]
    fn test_search_filters_encode_values() {
        let query = DoctorSearchQuery {
            search: Some("  heart ".to_string()),
            specialization: Some(Specialization::EntSpecialist),
            category: Some(HealthcareCategory::HeartHealth),
            city: Some("New Delhi".to_string()),
            min_fees: Some(100.0),
            max_fees: Some(800.0),
            sort_by: Some(DoctorSortField::Fees),
            sort_order: Some(SortOrder::Asc),
            page: None,
            limit: None,
        };

        let parts = build_search_filters(&query, 3, 10);

        assert!(parts.contains(&"is_active=eq.true".to_string()));
        assert!(parts.contains(&"or=(name.ilike.%22%2Aheart%2A%22,specialization.ilike.%22%2Aheart%2A%22)".to_string()));
        assert!(parts.contains(&"specialization=eq.ENT%20Specialist".to_string()));
        assert!(parts.contains(&"category=cs.%7B%22Heart%20Health%22%7D".to_string()));
        assert!(parts.contains(&"hospital_info->>city=ilike.New%20Delhi".to_string()));
        assert!(parts.contains(&"fees=gte.100".to_string()));
        assert!(parts.contains(&"fees=lte.800".to_string()));
        assert!(parts.contains(&"order=fees.asc".to_string()));
        assert!(parts.contains(&"offset=20".to_string()));
    }

    #[test]
    fn test_search_term_with_postgrest_syntax_is_quoted() {
        let query = DoctorSearchQuery {
            search: Some("Rao, (Dr)".to_string()),
            ..Default::default()
        };
        let parts = build_search_filters(&query, 1, 20);
        let expected = "%22%2ARao%2C%20%28Dr%29%2A%22";
        assert!(parts.contains(&format!("or=(name.ilike.{e},specialization.ilike.{e})", e = expected)));

        let query = DoctorSearchQuery {
            search: Some(r#"a"b\c"#.to_string()),
            ..Default::default()
        };
        let parts = build_search_filters(&query, 1, 20);
        // "*a\"b\\c*"
        let expected = "%22%2Aa%5C%22b%5C%5Cc%2A%22";
        assert!(parts.contains(&format!("or=(name.ilike.{e},specialization.ilike.{e})", e = expected)));
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let parts = build_search_filters(&DoctorSearchQuery::default(), 1, 20);
        assert!(parts.contains(&"order=created_at.desc".to_string()));
        assert!(parts.contains(&"offset=0".to_string()));
    }

    #[test]
    fn test_profile_changes_validate_schedule() {
        let bad = UpdateDoctorRequest {
            daily_time_ranges: Some(vec![DailyTimeRange { start: "17:00".into(), end: "09:00".into() }]),
            ..Default::default()
        };
        assert!(build_profile_changes(bad).is_err());

        let empty = UpdateDoctorRequest::default();
        assert!(build_profile_changes(empty).is_err());

        let ok = UpdateDoctorRequest {
            fees: Some(600.0),
            slot_duration_minutes: Some(20),
            ..Default::default()
        };
        let changes = build_profile_changes(ok).unwrap();
        assert_eq!(changes["fees"], 600.0);
        assert_eq!(changes["slot_duration_minutes"], 20);
        assert!(changes.get("updated_at").is_some());
    }
}
