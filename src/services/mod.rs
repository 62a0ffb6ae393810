pub mod auth_service;
pub mod customer_service;
pub mod product_service;
pub mod sale_service;
pub mod subscription_service;
pub mod user_service;

use std::str::FromStr;

use sea_orm::prelude::DateTimeWithTimeZone;

use crate::error::{AppError, AppResult};

pub(crate) fn timestamp_now() -> DateTimeWithTimeZone {
    chrono::Utc::now().into()
}

/// Parses an enum stored in a text column. A bad value means the row was
/// written outside this service.
pub(crate) fn parse_column<T>(column: &str, value: &str) -> AppResult<T>
where
    T: FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|err: String| AppError::Internal(anyhow::anyhow!("{column}: {err}")))
}
