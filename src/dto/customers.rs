use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dto::{require_email, require_text},
    error::{AppError, AppResult},
    models::{Customer, CustomerBasic, Gender},
};

/// Customer fields as sent by clients. Ids and the guardian reference are
/// assigned by the server.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CustomerInput {
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub email: String,
    pub phone: String,
    pub tax_id: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default)]
    pub birthday_flag: bool,
    #[serde(default)]
    pub delinquent_flag: bool,
}

impl CustomerInput {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().chars().count() < 3 {
            return Err(AppError::BadRequest(
                "name must have at least 3 characters".into(),
            ));
        }
        require_email("email", &self.email)?;
        require_text("phone", &self.phone)?;
        require_text("tax_id", &self.tax_id)?;
        require_text("address", &self.address)?;
        require_text("city", &self.city)?;
        require_text("state", &self.state)?;
        require_text("postal_code", &self.postal_code)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct GuardianInput {
    pub father_name: Option<String>,
    pub father_phone: Option<String>,
    pub father_email: Option<String>,
    pub father_tax_id: Option<String>,
    pub mother_name: Option<String>,
    pub mother_phone: Option<String>,
    pub mother_email: Option<String>,
    pub mother_tax_id: Option<String>,
}

impl GuardianInput {
    /// At least one parent must be named; any email given must be well formed.
    pub fn validate(&self) -> AppResult<()> {
        let named = |name: &Option<String>| name.as_deref().is_some_and(|n| !n.trim().is_empty());
        if !named(&self.father_name) && !named(&self.mother_name) {
            return Err(AppError::BadRequest(
                "guardian requires father_name or mother_name".into(),
            ));
        }
        if let Some(email) = self.father_email.as_deref() {
            require_email("father_email", email)?;
        }
        if let Some(email) = self.mother_email.as_deref() {
            require_email("mother_email", email)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCustomerRequest {
    pub customer: CustomerInput,
    /// Required when the customer is under 18; ignored otherwise.
    pub guardian: Option<GuardianInput>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub birthday_flag: Option<bool>,
    pub delinquent_flag: Option<bool>,
}

impl UpdateCustomerRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = self.name.as_deref() {
            if name.trim().chars().count() < 3 {
                return Err(AppError::BadRequest(
                    "name must have at least 3 characters".into(),
                ));
            }
        }
        if let Some(email) = self.email.as_deref() {
            require_email("email", email)?;
        }
        let texts = [
            ("phone", &self.phone),
            ("tax_id", &self.tax_id),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
        ];
        for (field, value) in texts {
            if let Some(value) = value.as_deref() {
                require_text(field, value)?;
            }
        }
        Ok(())
    }
}

#[derive(Serialize, ToSchema)]
pub struct CustomerList {
    pub items: Vec<Customer>,
}

#[derive(Serialize, ToSchema)]
pub struct CustomerBasicList {
    pub items: Vec<CustomerBasic>,
}
