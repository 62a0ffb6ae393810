use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::customers::{CreateCustomerRequest, CustomerBasicList, CustomerList, UpdateCustomerRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Customer,
    response::ApiResponse,
    routes::params::{CustomerQuery, Pagination},
    services::customer_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route("/basic", get(list_customers_basic))
        .route(
            "/{id}",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
}

#[utoipa::path(
    get,
    path = "/clientes",
    params(Pagination, CustomerQuery),
    responses(
        (status = 200, description = "List customers", body = ApiResponse<CustomerList>),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin role required")
    ),
    tag = "Customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
    Query(query): Query<CustomerQuery>,
) -> AppResult<Json<ApiResponse<CustomerList>>> {
    let resp = customer_service::list_customers(&state, &user, pagination, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/clientes/basic",
    responses(
        (status = 200, description = "Id, name and email of every customer", body = ApiResponse<CustomerBasicList>)
    ),
    tag = "Customers"
)]
pub async fn list_customers_basic(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CustomerBasicList>>> {
    let resp = customer_service::list_customers_basic(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/clientes/{id}",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer with guardian", body = ApiResponse<Customer>),
        (status = 404, description = "Customer not found")
    ),
    tag = "Customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    let resp = customer_service::get_customer(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/clientes",
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Customer created", body = ApiResponse<Customer>),
        (status = 400, description = "Invalid customer or missing guardian for a minor")
    ),
    tag = "Customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCustomerRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Customer>>)> {
    let resp = customer_service::create_customer(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/clientes/{id}",
    params(("id" = Uuid, Path, description = "Customer ID")),
    request_body = UpdateCustomerRequest,
    responses(
        (status = 200, description = "Customer updated", body = ApiResponse<Customer>),
        (status = 404, description = "Customer not found")
    ),
    tag = "Customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    let resp = customer_service::update_customer(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/clientes/{id}",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer deleted"),
        (status = 400, description = "Customer has sales or subscriptions"),
        (status = 404, description = "Customer not found")
    ),
    tag = "Customers"
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = customer_service::delete_customer(&state, &user, id).await?;
    Ok(Json(resp))
}
