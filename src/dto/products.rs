use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dto::{require_non_negative, require_positive, require_text},
    error::{AppError, AppResult},
    models::{Product, ProductDetails},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default = "default_status")]
    pub status: bool,
    pub details: ProductDetails,
}

fn default_status() -> bool {
    true
}

impl CreateProductRequest {
    pub fn validate(&self) -> AppResult<()> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        require_positive("price", self.price)?;
        validate_details(&self.details)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub status: Option<bool>,
    /// Replaces the kind specific data. Must carry the product's current kind.
    pub details: Option<ProductDetails>,
}

impl UpdateProductRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = self.name.as_deref() {
            require_text("name", name)?;
        }
        if let Some(description) = self.description.as_deref() {
            require_text("description", description)?;
        }
        if let Some(price) = self.price {
            require_positive("price", price)?;
        }
        if let Some(details) = self.details.as_ref() {
            validate_details(details)?;
        }
        Ok(())
    }
}

pub(crate) fn validate_details(details: &ProductDetails) -> AppResult<()> {
    match details {
        ProductDetails::Physical {
            sku, stock, weight, ..
        } => {
            require_text("sku", sku)?;
            if *stock < 0 {
                return Err(AppError::BadRequest("stock must not be negative".into()));
            }
            if let Some(weight) = weight {
                require_non_negative("weight", *weight)?;
            }
        }
        ProductDetails::Service {
            duration_months, ..
        } => {
            if *duration_months <= 0 {
                return Err(AppError::BadRequest(
                    "duration_months must be greater than 0".into(),
                ));
            }
        }
    }
    Ok(())
}

#[derive(Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}
