use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::users::{CreateUserRequest, UpdateUserRequest, UserList},
    entity::users::{ActiveModel, Column, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_superadmin},
    models::User,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    security::Role,
    services::{parse_column, timestamp_now},
    state::AppState,
};

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_superadmin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Users::find().order_by_asc(Column::Email);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(user_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_user(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<User>> {
    ensure_superadmin(user)?;
    let found = match Users::find_by_id(id).one(&state.orm).await? {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("User", user_from_entity(found)?, None))
}

pub async fn create_user(
    state: &AppState,
    user: &AuthUser,
    payload: CreateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_superadmin(user)?;
    payload.validate()?;
    ensure_email_free(state, &payload.email, None).await?;

    let now = timestamp_now();
    let created = ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(payload.email),
        password_hash: Set(state.passwords.hash(&payload.password)?),
        role: Set(payload.role.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(user_id = %created.id, role = %created.role, by = %user.identity().user_id, "user created");
    Ok(ApiResponse::success(
        "User created",
        user_from_entity(created)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_superadmin(user)?;
    payload.validate()?;
    let existing = match Users::find_by_id(id).one(&state.orm).await? {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(email) = payload.email {
        ensure_email_free(state, &email, Some(id)).await?;
        active.email = Set(email);
    }
    if let Some(password) = payload.password {
        active.password_hash = Set(state.passwords.hash(&password)?);
    }
    if let Some(role) = payload.role {
        active.role = Set(role.as_str().to_string());
    }
    active.updated_at = Set(Utc::now().into());

    let updated = active.update(&state.orm).await?;
    tracing::info!(user_id = %updated.id, "user updated");
    Ok(ApiResponse::success(
        "Updated",
        user_from_entity(updated)?,
        Some(Meta::empty()),
    ))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_superadmin(user)?;
    let result = Users::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    tracing::info!(user_id = %id, "user deleted");
    Ok(ApiResponse::done("Deleted"))
}

async fn ensure_email_free(state: &AppState, email: &str, except: Option<Uuid>) -> AppResult<()> {
    let mut finder = Users::find().filter(Column::Email.eq(email));
    if let Some(id) = except {
        finder = finder.filter(Column::Id.ne(id));
    }
    if finder.one(&state.orm).await?.is_some() {
        return Err(AppError::BadRequest("Email is already taken".into()));
    }
    Ok(())
}

fn user_from_entity(model: UserModel) -> AppResult<User> {
    Ok(User {
        id: model.id,
        role: parse_column::<Role>("users.role", &model.role)?,
        email: model.email,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
