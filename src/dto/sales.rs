use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{require_non_negative, require_positive},
    error::{AppError, AppResult},
    models::{PaymentMethod, PaymentStatus, Sale},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSaleRequest {
    pub product_id: Uuid,
    pub customer_id: Uuid,
    pub price: f64,
    pub cost: f64,
    #[serde(default)]
    pub paid: bool,
    pub quantity: i32,
    pub payment_method: PaymentMethod,
    /// Defaults to pending.
    pub status: Option<PaymentStatus>,
}

impl CreateSaleRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_figures(self.price, self.cost, self.quantity)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSaleRequest {
    pub product_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub price: Option<f64>,
    pub cost: Option<f64>,
    pub paid: Option<bool>,
    pub quantity: Option<i32>,
    pub payment_method: Option<PaymentMethod>,
    pub status: Option<PaymentStatus>,
}

pub(crate) fn validate_figures(price: f64, cost: f64, quantity: i32) -> AppResult<()> {
    require_positive("price", price)?;
    require_non_negative("cost", cost)?;
    if quantity <= 0 {
        return Err(AppError::BadRequest("quantity must be greater than 0".into()));
    }
    Ok(())
}

#[derive(Serialize, ToSchema)]
pub struct SaleList {
    pub items: Vec<Sale>,
}
