use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dto::require_email,
    error::{AppError, AppResult},
    models::User,
    security::Role,
};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl CreateUserRequest {
    pub fn validate(&self) -> AppResult<()> {
        require_email("email", &self.email)?;
        validate_password(&self.password)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(email) = self.email.as_deref() {
            require_email("email", email)?;
        }
        if let Some(password) = self.password.as_deref() {
            validate_password(password)?;
        }
        Ok(())
    }
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must have at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[derive(Serialize, ToSchema)]
pub struct UserList {
    pub items: Vec<User>,
}
