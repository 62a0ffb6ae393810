#![allow(dead_code)]

use std::{collections::HashMap, time::Duration};

use chrono::NaiveDate;
use gym_members_api::{
    config::AppConfig,
    db::{OrmConn, sync_schema},
    dto::customers::{CreateCustomerRequest, CustomerInput, GuardianInput},
    middleware::auth::AuthUser,
    models::{Customer, Gender},
    security::{Identity, Role},
    services::customer_service,
    state::AppState,
};
use sea_orm::{ConnectOptions, Database};
use uuid::Uuid;

pub const SUPERADMIN_EMAIL: &str = "root@gym.test";
pub const SUPERADMIN_PASSWORD: &str = "root-password";

pub fn test_config() -> AppConfig {
    let vars = HashMap::from([
        ("DATABASE_URL", "sqlite::memory:"),
        ("JWT_SECRET", "integration-test-secret"),
        ("ENCRYPTION_KEY", "0123456789abcdef0123456789abcdef"),
        ("SUPERADMIN_EMAIL", SUPERADMIN_EMAIL),
        ("SUPERADMIN_PASSWORD", SUPERADMIN_PASSWORD),
        ("PASSWORD_HASH_MEMORY_KIB", "256"),
        ("PASSWORD_HASH_ITERATIONS", "1"),
        ("PASSWORD_HASH_PARALLELISM", "1"),
    ]);
    AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
        .expect("test config is valid")
}

/// Single connection in-memory database so every query sees the same data.
pub async fn memory_db() -> anyhow::Result<OrmConn> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(Duration::from_secs(3600))
        .max_lifetime(Duration::from_secs(3600))
        .sqlx_logging(false);
    let orm = Database::connect(options).await?;
    sync_schema(&orm).await?;
    Ok(orm)
}

pub async fn setup_state() -> anyhow::Result<(AppState, AppConfig)> {
    let config = test_config();
    let orm = memory_db().await?;
    let state = AppState::new(orm, &config)?;
    Ok((state, config))
}

pub fn auth_user(role: Role) -> AuthUser {
    AuthUser(identity(role))
}

pub fn identity(role: Role) -> Identity {
    Identity {
        user_id: Uuid::new_v4(),
        email: format!("{}@gym.test", role.as_str()),
        role,
    }
}

pub fn bearer(state: &AppState, role: Role) -> String {
    let token = state.tokens.issue(&identity(role)).expect("token issued");
    format!("Bearer {token}")
}

pub fn customer_input(name: &str, email: &str, birth_date: NaiveDate) -> CustomerInput {
    CustomerInput {
        name: name.to_string(),
        birth_date,
        gender: Gender::Other,
        email: email.to_string(),
        phone: "+55 81 98888-7777".into(),
        tax_id: "987.654.321-00".into(),
        address: "Av. Boa Viagem, 500".into(),
        city: "Recife".into(),
        state: "PE".into(),
        postal_code: "51020-000".into(),
        birthday_flag: false,
        delinquent_flag: false,
    }
}

pub fn mother(name: &str) -> GuardianInput {
    GuardianInput {
        mother_name: Some(name.to_string()),
        mother_email: Some("mother@example.com".into()),
        ..Default::default()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Creates a customer as of `today`, with a guardian when one is given.
pub async fn customer(
    state: &AppState,
    name: &str,
    birth_date: NaiveDate,
    guardian: Option<GuardianInput>,
    today: NaiveDate,
) -> anyhow::Result<Customer> {
    let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
    let payload = CreateCustomerRequest {
        customer: customer_input(name, &email, birth_date),
        guardian,
    };
    let resp = customer_service::create_customer_on(state, payload, today).await?;
    Ok(resp.data.expect("customer data"))
}
