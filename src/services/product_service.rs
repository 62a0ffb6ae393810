use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::{
        PhysicalProducts, Sales, ServiceProducts,
        physical_products, sales, service_products,
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Product, ProductDetails, ProductKind},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProductQuery, ProductSortBy, SortOrder},
    services::{parse_column, timestamp_now},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(Column::Name.contains(search))
                .add(Column::Description.contains(search)),
        );
    }

    if let Some(kind) = query.kind {
        condition = condition.add(Column::Kind.eq(kind.as_str()));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = attach_details(&state.orm, models).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let model = match Products::find_by_id(id).one(&state.orm).await? {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    let details = load_details(&state.orm, &model).await?;
    Ok(ApiResponse::success(
        "Product",
        product_from_entity(model, details),
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    payload.validate()?;

    let id = Uuid::new_v4();
    let now = timestamp_now();
    let txn = state.orm.begin().await?;
    let product = ActiveModel {
        id: Set(id),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        kind: Set(payload.details.kind().as_str().to_string()),
        status: Set(payload.status),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    write_details(&txn, id, &payload.details, false).await?;
    txn.commit().await?;

    tracing::info!(product_id = %product.id, kind = %product.kind, "product created");
    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product, payload.details),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    payload.validate()?;

    let txn = state.orm.begin().await?;
    let existing = match Products::find_by_id(id).one(&txn).await? {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    let kind = parse_column::<ProductKind>("products.kind", &existing.kind)?;
    if let Some(details) = payload.details.as_ref() {
        if details.kind() != kind {
            return Err(AppError::BadRequest(format!(
                "product kind cannot be changed from {kind} to {}",
                details.kind()
            )));
        }
    }

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    active.updated_at = Set(timestamp_now());
    let product = active.update(&txn).await?;

    let details = match payload.details {
        Some(details) => {
            write_details(&txn, id, &details, true).await?;
            details
        }
        None => load_details(&txn, &product).await?,
    };
    txn.commit().await?;

    tracing::info!(product_id = %product.id, "product updated");
    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product, details),
        Some(Meta::empty()),
    ))
}

/// Deletes a product with its variant row. Products that were sold are kept.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    if Products::find_by_id(id).one(&txn).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let sold = Sales::find()
        .filter(sales::Column::ProductId.eq(id))
        .count(&txn)
        .await?;
    if sold > 0 {
        return Err(AppError::BadRequest(format!(
            "product is referenced by {sold} sales"
        )));
    }

    PhysicalProducts::delete_by_id(id).exec(&txn).await?;
    ServiceProducts::delete_by_id(id).exec(&txn).await?;
    Products::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(product_id = %id, "product deleted");
    Ok(ApiResponse::done("Deleted"))
}

async fn write_details<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    details: &ProductDetails,
    existing: bool,
) -> AppResult<()> {
    match details.clone() {
        ProductDetails::Physical {
            sku,
            stock,
            size,
            color,
            weight,
        } => {
            let row = physical_products::ActiveModel {
                product_id: Set(product_id),
                sku: Set(sku),
                stock: Set(stock),
                size: Set(size),
                color: Set(color),
                weight: Set(weight),
            };
            if existing {
                row.update(conn).await?;
            } else {
                row.insert(conn).await?;
            }
        }
        ProductDetails::Service {
            duration_months,
            recurring,
            benefits,
        } => {
            let row = service_products::ActiveModel {
                product_id: Set(product_id),
                duration_months: Set(duration_months),
                recurring: Set(recurring),
                benefits: Set(benefits),
            };
            if existing {
                row.update(conn).await?;
            } else {
                row.insert(conn).await?;
            }
        }
    }
    Ok(())
}

async fn load_details<C: ConnectionTrait>(
    conn: &C,
    product: &ProductModel,
) -> AppResult<ProductDetails> {
    let kind = parse_column::<ProductKind>("products.kind", &product.kind)?;
    let details = match kind {
        ProductKind::Physical => PhysicalProducts::find_by_id(product.id)
            .one(conn)
            .await?
            .map(physical_details),
        ProductKind::Service => ServiceProducts::find_by_id(product.id)
            .one(conn)
            .await?
            .map(service_details),
    };
    details.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "product {} has no {kind} details",
            product.id
        ))
    })
}

/// Loads the variant rows for a page of products with one query per kind.
async fn attach_details<C: ConnectionTrait>(
    conn: &C,
    models: Vec<ProductModel>,
) -> AppResult<Vec<Product>> {
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let mut physical: HashMap<Uuid, ProductDetails> = PhysicalProducts::find()
        .filter(physical_products::Column::ProductId.is_in(ids.clone()))
        .all(conn)
        .await?
        .into_iter()
        .map(|row| (row.product_id, physical_details(row)))
        .collect();
    let mut service: HashMap<Uuid, ProductDetails> = ServiceProducts::find()
        .filter(service_products::Column::ProductId.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|row| (row.product_id, service_details(row)))
        .collect();

    models
        .into_iter()
        .map(|model| {
            let details = match parse_column::<ProductKind>("products.kind", &model.kind)? {
                ProductKind::Physical => physical.remove(&model.id),
                ProductKind::Service => service.remove(&model.id),
            };
            match details {
                Some(details) => Ok(product_from_entity(model, details)),
                None => Err(AppError::Internal(anyhow::anyhow!(
                    "product {} has no {} details",
                    model.id,
                    model.kind
                ))),
            }
        })
        .collect()
}

fn physical_details(row: physical_products::Model) -> ProductDetails {
    ProductDetails::Physical {
        sku: row.sku,
        stock: row.stock,
        size: row.size,
        color: row.color,
        weight: row.weight,
    }
}

fn service_details(row: service_products::Model) -> ProductDetails {
    ProductDetails::Service {
        duration_months: row.duration_months,
        recurring: row.recurring,
        benefits: row.benefits,
    }
}

fn product_from_entity(model: ProductModel, details: ProductDetails) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        status: model.status,
        details,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
