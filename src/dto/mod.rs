pub mod auth;
pub mod customers;
pub mod products;
pub mod sales;
pub mod subscriptions;
pub mod users;

use crate::error::{AppError, AppResult};

pub(crate) fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

pub(crate) fn require_email(field: &str, value: &str) -> AppResult<()> {
    let valid = value
        .split_once('@')
        .map(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        })
        .unwrap_or(false);
    if !valid {
        return Err(AppError::BadRequest(format!("{field} must be a valid email")));
    }
    Ok(())
}

pub(crate) fn require_positive(field: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::BadRequest(format!("{field} must be greater than 0")));
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::BadRequest(format!("{field} must not be negative")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(require_email("email", "ana@example.com").is_ok());
        assert!(require_email("email", "ana@example").is_err());
        assert!(require_email("email", "@example.com").is_err());
        assert!(require_email("email", "ana example@x.com").is_err());
        assert!(require_email("email", "").is_err());
    }

    #[test]
    fn numeric_bounds() {
        assert!(require_positive("price", 0.01).is_ok());
        assert!(require_positive("price", 0.0).is_err());
        assert!(require_positive("price", f64::NAN).is_err());
        assert!(require_non_negative("cost", 0.0).is_ok());
        assert!(require_non_negative("cost", -1.0).is_err());
    }
}
