use tracing::debug;

use doctor_cell::Doctor;
use shared_config::AppConfig;

use crate::models::{AppointmentError, Quote};

pub struct PricingService {
    platform_fee: f64,
}

impl PricingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            platform_fee: config.platform_fee,
        }
    }

    /// Doctor's consultation fee plus the flat platform fee.
    pub fn quote(&self, doctor: &Doctor) -> Result<Quote, AppointmentError> {
        let consultation_fees = doctor.fees.ok_or_else(|| {
            AppointmentError::ValidationError("Doctor has not set a consultation fee".to_string())
        })?;

        let quote = calculate_quote(consultation_fees, self.platform_fee)?;
        debug!("Quoted {:.2} (consultation {:.2} + platform {:.2}) for doctor {}",
               quote.total_amount, quote.consultation_fees, quote.platform_fees, doctor.id);
        Ok(quote)
    }
}

pub fn calculate_quote(consultation_fees: f64, platform_fees: f64) -> Result<Quote, AppointmentError> {
    if !consultation_fees.is_finite() || consultation_fees < 0.0 {
        return Err(AppointmentError::ValidationError("Consultation fee must be a non-negative amount".to_string()));
    }
    if !platform_fees.is_finite() || platform_fees < 0.0 {
        return Err(AppointmentError::ValidationError("Platform fee must be a non-negative amount".to_string()));
    }

    Ok(Quote {
        consultation_fees: round_currency(consultation_fees),
        platform_fees: round_currency(platform_fees),
        total_amount: round_currency(consultation_fees + platform_fees),
    })
}

fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
