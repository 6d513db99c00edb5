use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{User, UserType};

use crate::jwt::issue_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub payment_key_id: String,
    pub payment_key_secret: String,
    pub platform_fee: f64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            payment_key_id: "rzp_test_key".to_string(),
            payment_key_secret: "rzp_test_secret".to_string(),
            platform_fee: 50.0,
        }
    }
}

impl TestConfig {
    /// Config pointing the Supabase client at a mock server.
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            jwt_expiry_hours: 24,
            payment_key_id: self.payment_key_id.clone(),
            payment_key_secret: self.payment_key_secret.clone(),
            platform_fee: self.platform_fee,
            allowed_origins: vec![],
            port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: UserType,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::patient("test@example.com")
    }
}

impl TestUser {
    pub fn new(email: &str, role: UserType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, UserType::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, UserType::Patient)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, UserType::Admin)
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.to_string()),
            created_at: Some(Utc::now()),
        }
    }

    pub fn token(&self, secret: &str) -> String {
        issue_token(&self.id, &self.email, self.role, secret, 24)
            .expect("test secret is non-empty")
    }
}

/// Row shapes as returned by PostgREST for the tables this API owns.
pub struct MockRows;

impl MockRows {
    pub fn doctor(id: &str, name: &str, fees: f64) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "email": format!("{}@clinic.example", id),
            "password_hash": null,
            "profile_image": "",
            "specialization": "General Physician",
            "category": ["Primary Care"],
            "qualification": "MBBS",
            "experience": 8,
            "about": "Family medicine",
            "fees": fees,
            "hospital_info": { "name": "City Clinic", "address": "1 Main St", "city": "Pune" },
            "availability_range": {
                "start_date": null,
                "end_date": null,
                "excluded_weekdays": [],
                "blocked_dates": []
            },
            "daily_time_ranges": [{ "start": "09:00", "end": "12:00" }],
            "slot_duration_minutes": 30,
            "is_verified": true,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient(id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "email": format!("{}@mail.example", id),
            "password_hash": null,
            "phone": null,
            "date_of_birth": null,
            "gender": null,
            "blood_group": null,
            "profile_image": "",
            "emergency_contact": null,
            "medical_history": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment(
        id: &str,
        doctor_id: &str,
        patient_id: &str,
        slot_start: DateTime<Utc>,
        status: &str,
    ) -> serde_json::Value {
        let slot_end = slot_start + chrono::Duration::minutes(30);
        json!({
            "id": id,
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "date": slot_start.date_naive().format("%Y-%m-%d").to_string(),
            "slot_start": slot_start.to_rfc3339(),
            "slot_end": slot_end.to_rfc3339(),
            "consultation_type": "Video Consultation",
            "status": status,
            "symptoms": "Headache",
            "consultation_fees": 500.0,
            "platform_fees": 50.0,
            "total_amount": 550.0,
            "payment_status": "Pending",
            "payment_order_id": null,
            "payment_id": null,
            "paid_at": null,
            "prescription": null,
            "notes": null,
            "cancellation_reason": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error(code: &str, message: &str) -> serde_json::Value {
        json!({
            "code": code,
            "details": null,
            "hint": null,
            "message": message
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::validate_token;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_service_key, "test-service-key");
        assert!(app_config.is_configured());
        assert!(app_config.is_payment_configured());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, UserType::Doctor);

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert!(user_model.is_doctor());
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn test_token_round_trip() {
        let config = TestConfig::default();
        let user = TestUser::admin("admin@example.com");
        let validated = validate_token(&user.token(&config.jwt_secret), &config.jwt_secret).unwrap();
        assert!(validated.is_admin());
    }
}
