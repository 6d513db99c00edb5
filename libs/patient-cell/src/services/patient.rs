use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_utils::validation::is_valid_phone;

use crate::models::{Patient, PatientError, UpdatePatientRequest, BLOOD_GROUPS, PATIENT_COLUMNS};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, PatientError> {
        debug!("Fetching patient: {}", patient_id);

        let path = format!("/rest/v1/patients?select={}&id=eq.{}", PATIENT_COLUMNS, patient_id);
        self.supabase.select_one(&path).await?
            .ok_or(PatientError::NotFound)
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient profile: {}", patient_id);

        let changes = build_profile_changes(request, Utc::now().date_naive())?;
        let filter = format!("id=eq.{}&select={}", patient_id, PATIENT_COLUMNS);
        let updated: Vec<Patient> = self.supabase.update("patients", &filter, changes).await?;

        let patient = updated.into_iter().next().ok_or(PatientError::NotFound)?;
        info!("Patient {} profile updated", patient_id);
        Ok(patient)
    }
}

fn build_profile_changes(request: UpdatePatientRequest, today: NaiveDate) -> Result<Value, PatientError> {
    let mut update_data = serde_json::Map::new();

    if let Some(name) = request.name {
        if name.trim().is_empty() {
            return Err(PatientError::ValidationError("Name cannot be empty".to_string()));
        }
        update_data.insert("name".to_string(), json!(name.trim()));
    }
    if let Some(phone) = request.phone {
        if !is_valid_phone(phone.trim()) {
            return Err(PatientError::ValidationError("Invalid phone number".to_string()));
        }
        update_data.insert("phone".to_string(), json!(phone.trim()));
    }
    if let Some(dob) = request.date_of_birth {
        if dob > today {
            return Err(PatientError::ValidationError("Date of birth cannot be in the future".to_string()));
        }
        update_data.insert("date_of_birth".to_string(), json!(dob));
    }
    if let Some(gender) = request.gender {
        update_data.insert("gender".to_string(), json!(gender));
    }
    if let Some(blood_group) = request.blood_group {
        if !BLOOD_GROUPS.contains(&blood_group.as_str()) {
            return Err(PatientError::ValidationError(format!("Unknown blood group '{}'", blood_group)));
        }
        update_data.insert("blood_group".to_string(), json!(blood_group));
    }
    if let Some(profile_image) = request.profile_image {
        update_data.insert("profile_image".to_string(), json!(profile_image));
    }
    if let Some(contact) = request.emergency_contact {
        if !is_valid_phone(contact.phone.trim()) {
            return Err(PatientError::ValidationError("Invalid emergency contact phone number".to_string()));
        }
        update_data.insert("emergency_contact".to_string(), json!(contact));
    }
    if let Some(history) = request.medical_history {
        update_data.insert("medical_history".to_string(), json!(history));
    }

    if update_data.is_empty() {
        return Err(PatientError::ValidationError("No profile fields to update".to_string()));
    }

    update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
    Ok(Value::Object(update_data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmergencyContact;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[test]
    fn test_future_birth_date_rejected() {
        let request = UpdatePatientRequest {
            date_of_birth: NaiveDate::from_ymd_opt(2026, 3, 2),
            ..Default::default()
        };
        assert!(matches!(
            build_profile_changes(request, today()),
            Err(PatientError::ValidationError(_))
        ));
    }

    #[test]
    fn test_phone_validation() {
        let bad = UpdatePatientRequest {
            phone: Some("phone".to_string()),
            ..Default::default()
        };
        assert!(build_profile_changes(bad, today()).is_err());

        let bad_contact = UpdatePatientRequest {
            emergency_contact: Some(EmergencyContact {
                name: "Ravi".to_string(),
                phone: "12".to_string(),
                relationship: None,
            }),
            ..Default::default()
        };
        assert!(build_profile_changes(bad_contact, today()).is_err());
    }

    #[test]
    fn test_changes_include_only_given_fields() {
        let request = UpdatePatientRequest {
            name: Some("  Meera Joshi ".to_string()),
            blood_group: Some("O+".to_string()),
            ..Default::default()
        };

        let changes = build_profile_changes(request, today()).unwrap();
        assert_eq!(changes["name"], "Meera Joshi");
        assert_eq!(changes["blood_group"], "O+");
        assert!(changes.get("phone").is_none());
        assert!(changes.get("updated_at").is_some());
    }

    #[test]
    fn test_empty_update_rejected() {
        assert!(build_profile_changes(UpdatePatientRequest::default(), today()).is_err());
    }
}
