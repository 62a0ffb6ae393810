use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    db::OrmConn,
    dto::sales::{CreateSaleRequest, SaleList, UpdateSaleRequest, validate_figures},
    entity::{
        Customers, Products,
        sales::{ActiveModel, Column, Entity as Sales, Model as SaleModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{PaymentMethod, PaymentStatus, Sale},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, SaleQuery},
    rules,
    services::{parse_column, timestamp_now},
    state::AppState,
};

pub async fn list_sales(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
    query: SaleQuery,
) -> AppResult<ApiResponse<SaleList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(Column::Status.eq(status.as_str()));
    }
    if let Some(customer_id) = query.customer_id {
        condition = condition.add(Column::CustomerId.eq(customer_id));
    }
    if let Some(product_id) = query.product_id {
        condition = condition.add(Column::ProductId.eq(product_id));
    }

    let finder = Sales::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(sale_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Sales",
        SaleList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_sale(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Sale>> {
    ensure_admin(user)?;
    let sale = match Sales::find_by_id(id).one(&state.orm).await? {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Sale", sale_from_entity(sale)?, None))
}

pub async fn create_sale(
    state: &AppState,
    user: &AuthUser,
    payload: CreateSaleRequest,
) -> AppResult<ApiResponse<Sale>> {
    ensure_admin(user)?;
    payload.validate()?;
    ensure_references(&state.orm, payload.product_id, payload.customer_id).await?;

    let status = rules::settle_sale_status(payload.paid, payload.status.unwrap_or_default());
    let now = timestamp_now();
    let sale = ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(payload.product_id),
        customer_id: Set(payload.customer_id),
        price: Set(payload.price),
        cost: Set(payload.cost),
        profit: Set(rules::sale_profit(payload.price, payload.cost)),
        paid: Set(payload.paid),
        quantity: Set(payload.quantity),
        payment_method: Set(payload.payment_method.as_str().to_string()),
        status: Set(status.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(
        sale_id = %sale.id,
        customer_id = %sale.customer_id,
        profit = sale.profit,
        status = %sale.status,
        "sale created"
    );
    Ok(ApiResponse::success(
        "Sale created",
        sale_from_entity(sale)?,
        Some(Meta::empty()),
    ))
}

/// Merges the partial update into the stored sale, then derives profit and
/// status again from the merged values.
pub async fn update_sale(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateSaleRequest,
) -> AppResult<ApiResponse<Sale>> {
    ensure_admin(user)?;
    let existing = match Sales::find_by_id(id).one(&state.orm).await? {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let product_id = payload.product_id.unwrap_or(existing.product_id);
    let customer_id = payload.customer_id.unwrap_or(existing.customer_id);
    if product_id != existing.product_id || customer_id != existing.customer_id {
        ensure_references(&state.orm, product_id, customer_id).await?;
    }

    let price = payload.price.unwrap_or(existing.price);
    let cost = payload.cost.unwrap_or(existing.cost);
    let quantity = payload.quantity.unwrap_or(existing.quantity);
    validate_figures(price, cost, quantity)?;

    let paid = payload.paid.unwrap_or(existing.paid);
    let status = match payload.status {
        Some(status) => status,
        None => parse_column::<PaymentStatus>("sales.status", &existing.status)?,
    };
    let status = rules::settle_sale_status(paid, status);

    let mut active: ActiveModel = existing.into();
    active.product_id = Set(product_id);
    active.customer_id = Set(customer_id);
    active.price = Set(price);
    active.cost = Set(cost);
    active.profit = Set(rules::sale_profit(price, cost));
    active.paid = Set(paid);
    active.quantity = Set(quantity);
    if let Some(method) = payload.payment_method {
        active.payment_method = Set(method.as_str().to_string());
    }
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(timestamp_now());

    let sale = active.update(&state.orm).await?;
    tracing::info!(sale_id = %sale.id, profit = sale.profit, status = %sale.status, "sale updated");
    Ok(ApiResponse::success(
        "Updated",
        sale_from_entity(sale)?,
        Some(Meta::empty()),
    ))
}

pub async fn delete_sale(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Sales::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    tracing::info!(sale_id = %id, "sale deleted");
    Ok(ApiResponse::done("Deleted"))
}

async fn ensure_references(orm: &OrmConn, product_id: Uuid, customer_id: Uuid) -> AppResult<()> {
    if Products::find_by_id(product_id).one(orm).await?.is_none() {
        return Err(AppError::BadRequest(format!("product {product_id} does not exist")));
    }
    if Customers::find_by_id(customer_id).one(orm).await?.is_none() {
        return Err(AppError::BadRequest(format!("customer {customer_id} does not exist")));
    }
    Ok(())
}

fn sale_from_entity(model: SaleModel) -> AppResult<Sale> {
    Ok(Sale {
        id: model.id,
        product_id: model.product_id,
        customer_id: model.customer_id,
        price: model.price,
        cost: model.cost,
        profit: model.profit,
        paid: model.paid,
        quantity: model.quantity,
        payment_method: parse_column::<PaymentMethod>("sales.payment_method", &model.payment_method)?,
        status: parse_column::<PaymentStatus>("sales.status", &model.status)?,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
