use chrono::{DateTime, Local, TimeZone, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::subscriptions::{CreateSubscriptionRequest, SubscriptionList, UpdateSubscriptionRequest},
    entity::{
        Customers,
        subscriptions::{ActiveModel, Column, Entity as Subscriptions, Model as SubscriptionModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{PaymentMethod, PaymentStatus, Subscription},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, SubscriptionQuery},
    rules,
    security::FieldCipher,
    services::{parse_column, timestamp_now},
    state::AppState,
};

pub async fn list_subscriptions(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
    query: SubscriptionQuery,
) -> AppResult<ApiResponse<SubscriptionList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let mut condition = Condition::all();
    if let Some(active) = query.active {
        condition = condition.add(Column::Active.eq(active));
    }
    if let Some(customer_id) = query.customer_id {
        condition = condition.add(Column::CustomerId.eq(customer_id));
    }

    let finder = Subscriptions::find()
        .filter(condition)
        .order_by_asc(Column::NextBillingDate);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|model| subscription_from_entity(&state.cipher, model))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Subscriptions",
        SubscriptionList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_subscription(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Subscription>> {
    ensure_admin(user)?;
    let found = match Subscriptions::find_by_id(id).one(&state.orm).await? {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success(
        "Subscription",
        subscription_from_entity(&state.cipher, found)?,
        None,
    ))
}

pub async fn create_subscription(
    state: &AppState,
    user: &AuthUser,
    payload: CreateSubscriptionRequest,
) -> AppResult<ApiResponse<Subscription>> {
    ensure_admin(user)?;
    create_subscription_at(state, payload, Local::now()).await
}

/// Creates a subscription whose first billing date is computed from `now`.
pub async fn create_subscription_at<Tz: TimeZone>(
    state: &AppState,
    payload: CreateSubscriptionRequest,
    now: DateTime<Tz>,
) -> AppResult<ApiResponse<Subscription>> {
    payload.validate()?;
    if Customers::find_by_id(payload.customer_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::BadRequest(format!(
            "customer {} does not exist",
            payload.customer_id
        )));
    }

    let next_billing = billing_date_from(&now, payload.billing_day)?;
    let created_at = now.fixed_offset();
    let subscription = ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(payload.customer_id),
        payment_method: Set(payload.payment_method.as_str().to_string()),
        card_number: Set(seal_card_number(&state.cipher, payload.card_number.as_deref())),
        card_cvv: Set(payload.card_cvv.as_deref().map(|cvv| state.cipher.encrypt_str(cvv))),
        billing_day: Set(payload.billing_day),
        payment_status: Set(PaymentStatus::Pending.as_str().to_string()),
        next_billing_date: Set(next_billing),
        amount: Set(payload.amount),
        active: Set(true),
        created_at: Set(created_at),
        updated_at: Set(created_at),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(
        subscription_id = %subscription.id,
        customer_id = %subscription.customer_id,
        next_billing_date = %subscription.next_billing_date,
        "subscription created"
    );
    Ok(ApiResponse::success(
        "Subscription created",
        subscription_from_entity(&state.cipher, subscription)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_subscription(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateSubscriptionRequest,
) -> AppResult<ApiResponse<Subscription>> {
    ensure_admin(user)?;
    payload.validate()?;
    let existing = match Subscriptions::find_by_id(id).one(&state.orm).await? {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    if payload.active == Some(true)
        && existing.payment_status == PaymentStatus::Cancelled.as_str()
    {
        return Err(AppError::BadRequest(
            "a cancelled subscription cannot be reactivated".into(),
        ));
    }

    let billing_day_changed = payload
        .billing_day
        .is_some_and(|day| day != existing.billing_day);

    let mut active: ActiveModel = existing.into();
    if let Some(method) = payload.payment_method {
        active.payment_method = Set(method.as_str().to_string());
    }
    if let Some(day) = payload.billing_day {
        active.billing_day = Set(day);
        if billing_day_changed {
            active.next_billing_date = Set(billing_date_from(&Local::now(), day)?);
        }
    }
    if let Some(amount) = payload.amount {
        active.amount = Set(amount);
    }
    if let Some(flag) = payload.active {
        active.active = Set(flag);
    }
    if let Some(number) = payload.card_number.as_deref() {
        active.card_number = Set(seal_card_number(&state.cipher, Some(number)));
    }
    if let Some(cvv) = payload.card_cvv.as_deref() {
        active.card_cvv = Set(Some(state.cipher.encrypt_str(cvv)));
    }
    active.updated_at = Set(timestamp_now());

    let subscription = active.update(&state.orm).await?;
    tracing::info!(subscription_id = %subscription.id, "subscription updated");
    Ok(ApiResponse::success(
        "Updated",
        subscription_from_entity(&state.cipher, subscription)?,
        Some(Meta::empty()),
    ))
}

/// Cancels the subscription. The row is kept for billing history.
pub async fn cancel_subscription(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Subscription>> {
    ensure_admin(user)?;
    let existing = match Subscriptions::find_by_id(id).one(&state.orm).await? {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    active.payment_status = Set(PaymentStatus::Cancelled.as_str().to_string());
    active.active = Set(false);
    active.updated_at = Set(timestamp_now());
    let subscription = active.update(&state.orm).await?;

    tracing::info!(subscription_id = %subscription.id, "subscription cancelled");
    Ok(ApiResponse::success(
        "Subscription cancelled",
        subscription_from_entity(&state.cipher, subscription)?,
        Some(Meta::empty()),
    ))
}

fn billing_date_from<Tz: TimeZone>(
    now: &DateTime<Tz>,
    billing_day: i32,
) -> AppResult<sea_orm::prelude::DateTimeWithTimeZone> {
    let day = u32::try_from(billing_day)
        .map_err(|_| AppError::BadRequest("billing_day must be between 1 and 31".into()))?;
    rules::next_billing_date(now, day)
        .map(|date| date.fixed_offset())
        .ok_or_else(|| AppError::BadRequest("billing_day must be between 1 and 31".into()))
}

fn seal_card_number(cipher: &FieldCipher, number: Option<&str>) -> Option<String> {
    number.map(|n| {
        let digits: String = n.chars().filter(|c| c.is_ascii_digit()).collect();
        cipher.encrypt_str(&digits)
    })
}

fn subscription_from_entity(
    cipher: &FieldCipher,
    model: SubscriptionModel,
) -> AppResult<Subscription> {
    let card_last_four = match model.card_number.as_deref() {
        Some(sealed) => {
            let number = cipher.decrypt_string(sealed)?;
            let skip = number.chars().count().saturating_sub(4);
            Some(number.chars().skip(skip).collect())
        }
        None => None,
    };

    Ok(Subscription {
        id: model.id,
        customer_id: model.customer_id,
        payment_method: parse_column::<PaymentMethod>(
            "subscriptions.payment_method",
            &model.payment_method,
        )?,
        billing_day: model.billing_day,
        payment_status: parse_column::<PaymentStatus>(
            "subscriptions.payment_status",
            &model.payment_status,
        )?,
        next_billing_date: model.next_billing_date.with_timezone(&Utc),
        amount: model.amount,
        active: model.active,
        card_last_four,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
