use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentStatus, PaymentStatus, APPOINTMENT_COLUMNS};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    PaymentError, PaymentOrder, PaymentReceipt, VerifyPaymentRequest, ORDER_CURRENCY,
};
use crate::services::signature::verify_payment_signature;

pub struct PaymentService {
    supabase: SupabaseClient,
    key_id: String,
    key_secret: String,
}

impl PaymentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            key_id: config.payment_key_id.clone(),
            key_secret: config.payment_key_secret.clone(),
        }
    }

    fn ensure_configured(&self) -> Result<(), PaymentError> {
        if self.key_id.is_empty() || self.key_secret.is_empty() {
            warn!("Payment keys are missing; refusing payment operation");
            return Err(PaymentError::NotConfigured);
        }
        Ok(())
    }

    /// Open an order for the appointment's total and remember it on the appointment.
    pub async fn create_order(&self, user: &User, appointment_id: Uuid) -> Result<PaymentOrder, PaymentError> {
        self.ensure_configured()?;

        let path = format!("/rest/v1/appointments?select={}&id=eq.{}", APPOINTMENT_COLUMNS, appointment_id);
        let appointment: Appointment = self.supabase.select_one(&path).await?
            .ok_or(PaymentError::AppointmentNotFound)?;

        ensure_payer(&appointment, user)?;
        if appointment.status == AppointmentStatus::Cancelled {
            return Err(PaymentError::AppointmentCancelled);
        }
        if appointment.payment_status == PaymentStatus::Paid {
            return Err(PaymentError::AlreadyPaid);
        }

        let amount = to_minor_units(appointment.total_amount)?;
        let order = PaymentOrder {
            order_id: format!("order_{}", Uuid::new_v4().simple()),
            appointment_id,
            amount,
            currency: ORDER_CURRENCY.to_string(),
            receipt: format!("appt_{}", appointment_id),
            key_id: self.key_id.clone(),
        };

        let changes = json!({
            "payment_order_id": order.order_id,
            "payment_status": PaymentStatus::Pending,
            "updated_at": Utc::now().to_rfc3339(),
        });
        let filter = unsettled_filter(appointment_id);
        let updated: Vec<Appointment> = self.supabase.update("appointments", &filter, changes).await?;
        if updated.is_empty() {
            warn!("Appointment {} was cancelled or paid before order {} was attached", appointment_id, order.order_id);
            return Err(PaymentError::Superseded);
        }

        info!("Created order {} for appointment {} ({} paise)", order.order_id, appointment_id, amount);
        Ok(order)
    }

    /// Check the checkout signature and settle the appointment's payment state.
    pub async fn verify_payment(
        &self,
        user: &User,
        request: VerifyPaymentRequest,
    ) -> Result<PaymentReceipt, PaymentError> {
        self.ensure_configured()?;

        if request.order_id.trim().is_empty() || request.payment_id.trim().is_empty() {
            return Err(PaymentError::ValidationError("order_id and payment_id are required".to_string()));
        }

        let path = format!(
            "/rest/v1/appointments?select={}&payment_order_id=eq.{}",
            APPOINTMENT_COLUMNS,
            urlencoding::encode(&request.order_id),
        );
        let appointment: Appointment = self.supabase.select_one(&path).await?
            .ok_or(PaymentError::OrderNotFound)?;

        ensure_payer(&appointment, user)?;
        if appointment.status == AppointmentStatus::Cancelled {
            return Err(PaymentError::AppointmentCancelled);
        }
        if appointment.payment_status == PaymentStatus::Paid {
            return Err(PaymentError::AlreadyPaid);
        }

        let valid = verify_payment_signature(
            &request.order_id,
            &request.payment_id,
            &request.signature,
            &self.key_secret,
        );

        let now = Utc::now();
        let filter = unsettled_filter(appointment.id);

        if !valid {
            warn!("Signature mismatch for order {} (appointment {})", request.order_id, appointment.id);
            let changes = json!({
                "payment_status": PaymentStatus::Failed,
                "updated_at": now.to_rfc3339(),
            });
            let _: Vec<Appointment> = self.supabase.update("appointments", &filter, changes).await?;
            return Err(PaymentError::InvalidSignature);
        }

        let changes = json!({
            "payment_status": PaymentStatus::Paid,
            "payment_id": request.payment_id,
            "paid_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });
        let updated: Vec<Appointment> = self.supabase.update("appointments", &filter, changes).await?;
        let settled = updated.into_iter().next().ok_or_else(|| {
            warn!("Appointment {} was cancelled or paid during verification of {}", appointment.id, request.order_id);
            PaymentError::Superseded
        })?;

        info!("Payment {} settled appointment {}", request.payment_id, settled.id);
        debug!("Appointment {} paid at {:?}", settled.id, settled.paid_at);

        Ok(PaymentReceipt {
            appointment_id: settled.id,
            order_id: request.order_id,
            payment_id: request.payment_id,
            payment_status: settled.payment_status,
            paid_at: settled.paid_at,
        })
    }
}

/// PATCH filter that only matches while the appointment is live and not yet paid.
fn unsettled_filter(appointment_id: Uuid) -> String {
    format!(
        "id=eq.{}&status=neq.Cancelled&payment_status=neq.Paid&select={}",
        appointment_id, APPOINTMENT_COLUMNS
    )
}

fn ensure_payer(appointment: &Appointment, user: &User) -> Result<(), PaymentError> {
    if appointment.patient_id.to_string() != user.id {
        return Err(PaymentError::Forbidden(
            "Only the appointment's patient can pay for it".to_string(),
        ));
    }
    Ok(())
}

pub fn to_minor_units(amount: f64) -> Result<u64, PaymentError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(PaymentError::ValidationError(format!("Cannot charge an amount of {}", amount)));
    }
    Ok((amount * 100.0).round() as u64)
}
