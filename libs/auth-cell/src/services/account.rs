use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::services::DoctorService;
use patient_cell::services::PatientService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::{User, UserType};
use shared_utils::jwt::issue_token;
use shared_utils::validation::{is_valid_email, is_valid_password, MIN_PASSWORD_LENGTH};

use crate::models::{
    account_table, AccountRow, AuthError, AuthResponse, AuthUser, ChangePasswordRequest,
    LoginRequest, RegisterRequest,
};
use crate::services::password::PasswordService;

pub struct AccountService {
    supabase: SupabaseClient,
    doctor_service: DoctorService,
    patient_service: PatientService,
    jwt_secret: String,
    jwt_expiry_hours: i64,
}

impl AccountService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctor_service: DoctorService::new(config),
            patient_service: PatientService::new(config),
            jwt_secret: config.jwt_secret.clone(),
            jwt_expiry_hours: config.jwt_expiry_hours,
        }
    }

    /// Create an account. The unique index on `email` rejects duplicates.
    pub async fn register(
        &self,
        user_type: UserType,
        request: RegisterRequest,
    ) -> Result<AuthResponse, AuthError> {
        let (table, columns) = account_table(user_type)?;
        let email = normalize_email(&request.email);
        let name = request.name.trim();

        if name.is_empty() {
            return Err(AuthError::ValidationError("Name is required".to_string()));
        }
        if !is_valid_email(&email) {
            return Err(AuthError::ValidationError("Invalid email address".to_string()));
        }
        if !is_valid_password(&request.password) {
            return Err(AuthError::ValidationError(format!(
                "Password must be at least {} characters", MIN_PASSWORD_LENGTH
            )));
        }

        debug!("Registering {} account for {}", user_type, email);

        let password_hash = PasswordService::hash_password(&request.password)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        let row = json!({
            "name": name,
            "email": email,
            "password_hash": password_hash,
            "created_at": now,
            "updated_at": now,
        });

        let account: AccountRow = match self.supabase.insert(&format!("{}?select={}", table, columns), row).await {
            Ok(account) => account,
            Err(e) if e.is_unique_violation() => {
                info!("Registration rejected, email already in use: {}", email);
                return Err(AuthError::EmailTaken);
            }
            Err(e) => return Err(AuthError::Database(e)),
        };

        info!("Registered {} {}", user_type, account.id);
        self.respond_with_token(user_type, account)
    }

    pub async fn login(
        &self,
        user_type: UserType,
        request: LoginRequest,
    ) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&request.email);
        debug!("Login attempt for {} {}", user_type, email);

        let account = self.find_by_email(user_type, &email).await?
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = account.password_hash.as_deref().ok_or(AuthError::InvalidCredentials)?;
        let matches = PasswordService::verify_password(&request.password, hash)
            .map_err(|e| {
                warn!("Stored password hash for {} is unreadable: {}", account.id, e);
                AuthError::InvalidCredentials
            })?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        if account.is_active == Some(false) {
            return Err(AuthError::AccountDisabled);
        }

        info!("{} {} logged in", user_type, account.id);
        self.respond_with_token(user_type, account)
    }

    /// Profile of the authenticated caller: the doctor or patient row, or the token claims for admins.
    pub async fn current_profile(&self, user: &User) -> Result<Value, AuthError> {
        let user_type = user.user_type()
            .ok_or_else(|| AuthError::Token("Token carries no known role".to_string()))?;

        match user_type {
            UserType::Doctor => {
                let doctor = self.doctor_service.get_doctor_any(parse_subject(user)?).await
                    .map_err(|e| match e {
                        doctor_cell::DoctorError::NotFound => AuthError::NotFound,
                        doctor_cell::DoctorError::Database(db) => AuthError::Database(db),
                        other => AuthError::ValidationError(other.to_string()),
                    })?;
                Ok(json!({ "user_type": user_type, "profile": doctor }))
            }
            UserType::Patient => {
                let patient = self.patient_service.get_patient(parse_subject(user)?).await
                    .map_err(|e| match e {
                        patient_cell::PatientError::NotFound => AuthError::NotFound,
                        patient_cell::PatientError::Database(db) => AuthError::Database(db),
                        other => AuthError::ValidationError(other.to_string()),
                    })?;
                Ok(json!({ "user_type": user_type, "profile": patient }))
            }
            UserType::Admin => Ok(json!({
                "user_type": user_type,
                "profile": { "id": user.id, "email": user.email }
            })),
        }
    }

    pub async fn change_password(
        &self,
        user: &User,
        request: ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        let user_type = user.user_type()
            .ok_or_else(|| AuthError::Token("Token carries no known role".to_string()))?;
        let (table, columns) = account_table(user_type)?;
        let account_id = parse_subject(user)?;

        if !is_valid_password(&request.new_password) {
            return Err(AuthError::ValidationError(format!(
                "New password must be at least {} characters", MIN_PASSWORD_LENGTH
            )));
        }
        if request.new_password == request.current_password {
            return Err(AuthError::ValidationError(
                "New password must differ from the current password".to_string(),
            ));
        }

        let path = format!("/rest/v1/{}?select={}&id=eq.{}", table, columns, account_id);
        let account: AccountRow = self.supabase.select_one(&path).await?
            .ok_or(AuthError::NotFound)?;

        let hash = account.password_hash.as_deref().ok_or(AuthError::InvalidCredentials)?;
        let matches = PasswordService::verify_password(&request.current_password, hash)
            .map_err(|_| AuthError::InvalidCredentials)?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = PasswordService::hash_password(&request.new_password)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        let changes = json!({
            "password_hash": new_hash,
            "updated_at": Utc::now().to_rfc3339(),
        });
        let filter = format!("id=eq.{}&select={}", account_id, columns);
        let updated: Vec<AccountRow> = self.supabase.update(table, &filter, changes).await?;
        if updated.is_empty() {
            return Err(AuthError::NotFound);
        }

        info!("Password changed for {} {}", user_type, account_id);
        Ok(())
    }

    async fn find_by_email(&self, user_type: UserType, email: &str) -> Result<Option<AccountRow>, AuthError> {
        let (table, columns) = account_table(user_type)?;
        let path = format!(
            "/rest/v1/{}?select={}&email=eq.{}",
            table,
            columns,
            urlencoding::encode(email),
        );
        Ok(self.supabase.select_one(&path).await?)
    }

    fn respond_with_token(&self, user_type: UserType, account: AccountRow) -> Result<AuthResponse, AuthError> {
        let token = issue_token(
            &account.id.to_string(),
            &account.email,
            user_type,
            &self.jwt_secret,
            self.jwt_expiry_hours,
        ).map_err(AuthError::Token)?;

        Ok(AuthResponse {
            token,
            user: AuthUser {
                id: account.id,
                name: account.name,
                email: account.email,
                user_type,
            },
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn parse_subject(user: &User) -> Result<Uuid, AuthError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AuthError::Token("Token subject is not a valid id".to_string()))
}
