use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    config::SuperadminConfig,
    db::OrmConn,
    dto::auth::{LoginRequest, LoginResponse},
    entity::users::{ActiveModel, Column, Entity as Users},
    error::{AppError, AppResult},
    response::{ApiResponse, Meta},
    security::{Identity, PasswordHasher, Role},
    services::{parse_column, timestamp_now},
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let user = Users::find()
        .filter(Column::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into())),
    };

    if !state.passwords.verify(&password, &user.password_hash) {
        tracing::info!(user_id = %user.id, "login rejected");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let identity = Identity {
        user_id: user.id,
        email: user.email.clone(),
        role: parse_column::<Role>("users.role", &user.role)?,
    };
    let token = state.tokens.issue(&identity)?;
    tracing::info!(user_id = %user.id, role = %identity.role, "user logged in");

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse { token },
        Some(Meta::empty()),
    ))
}

/// Creates the configured superadmin account unless a user with that email
/// already exists. Returns whether an account was created.
pub async fn bootstrap_superadmin(
    orm: &OrmConn,
    passwords: &PasswordHasher,
    config: &SuperadminConfig,
) -> anyhow::Result<bool> {
    let existing = Users::find()
        .filter(Column::Email.eq(config.email.as_str()))
        .one(orm)
        .await?;
    if existing.is_some() {
        tracing::debug!(email = %config.email, "superadmin already present");
        return Ok(false);
    }

    let now = timestamp_now();
    let user = ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(config.email.clone()),
        password_hash: Set(passwords.hash(&config.password)?),
        role: Set(Role::Superadmin.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(orm)
    .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "superadmin created");
    Ok(true)
}

/// Issues an admin token for a synthetic identity. Only mounted when the
/// test token route is enabled.
pub fn issue_test_token(state: &AppState) -> AppResult<ApiResponse<LoginResponse>> {
    let identity = Identity {
        user_id: Uuid::new_v4(),
        email: "test-token@localhost".into(),
        role: Role::Admin,
    };
    let token = state.tokens.issue(&identity)?;
    tracing::warn!(user_id = %identity.user_id, "issued test token");
    Ok(ApiResponse::success(
        "Test token",
        LoginResponse { token },
        Some(Meta::empty()),
    ))
}
