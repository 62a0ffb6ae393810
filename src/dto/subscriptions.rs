use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{require_positive, require_text},
    error::{AppError, AppResult},
    models::{PaymentMethod, Subscription},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSubscriptionRequest {
    pub customer_id: Uuid,
    pub payment_method: PaymentMethod,
    pub billing_day: i32,
    pub amount: f64,
    pub card_number: Option<String>,
    pub card_cvv: Option<String>,
}

impl CreateSubscriptionRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_billing_day(self.billing_day)?;
        require_positive("amount", self.amount)?;
        validate_card(self.card_number.as_deref(), self.card_cvv.as_deref())
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSubscriptionRequest {
    pub payment_method: Option<PaymentMethod>,
    pub billing_day: Option<i32>,
    pub amount: Option<f64>,
    pub active: Option<bool>,
    pub card_number: Option<String>,
    pub card_cvv: Option<String>,
}

impl UpdateSubscriptionRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(day) = self.billing_day {
            validate_billing_day(day)?;
        }
        if let Some(amount) = self.amount {
            require_positive("amount", amount)?;
        }
        validate_card(self.card_number.as_deref(), self.card_cvv.as_deref())
    }
}

fn validate_billing_day(day: i32) -> AppResult<()> {
    if !(1..=31).contains(&day) {
        return Err(AppError::BadRequest(
            "billing_day must be between 1 and 31".into(),
        ));
    }
    Ok(())
}

fn validate_card(number: Option<&str>, cvv: Option<&str>) -> AppResult<()> {
    if let Some(number) = number {
        require_text("card_number", number)?;
        if !number.chars().all(|c| c.is_ascii_digit() || c == ' ') {
            return Err(AppError::BadRequest("card_number must be numeric".into()));
        }
    }
    if let Some(cvv) = cvv {
        if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::BadRequest("card_cvv must be 3 or 4 digits".into()));
        }
    }
    Ok(())
}

#[derive(Serialize, ToSchema)]
pub struct SubscriptionList {
    pub items: Vec<Subscription>,
}
