use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::sales::{CreateSaleRequest, SaleList, UpdateSaleRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Sale,
    response::ApiResponse,
    routes::params::{Pagination, SaleQuery},
    services::sale_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/{id}", get(get_sale).put(update_sale).delete(delete_sale))
}

#[utoipa::path(
    get,
    path = "/sales",
    params(Pagination, SaleQuery),
    responses(
        (status = 200, description = "List sales", body = ApiResponse<SaleList>)
    ),
    tag = "Sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
    Query(query): Query<SaleQuery>,
) -> AppResult<Json<ApiResponse<SaleList>>> {
    let resp = sale_service::list_sales(&state, &user, pagination, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/sales/{id}",
    params(("id" = Uuid, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Get sale", body = ApiResponse<Sale>),
        (status = 404, description = "Sale not found")
    ),
    tag = "Sales"
)]
pub async fn get_sale(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Sale>>> {
    let resp = sale_service::get_sale(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/sales",
    request_body = CreateSaleRequest,
    responses(
        (status = 201, description = "Record sale", body = ApiResponse<Sale>),
        (status = 400, description = "Invalid figures or unknown product/customer")
    ),
    tag = "Sales"
)]
pub async fn create_sale(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSaleRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Sale>>)> {
    let resp = sale_service::create_sale(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/sales/{id}",
    params(("id" = Uuid, Path, description = "Sale ID")),
    request_body = UpdateSaleRequest,
    responses(
        (status = 200, description = "Update sale", body = ApiResponse<Sale>),
        (status = 404, description = "Sale not found")
    ),
    tag = "Sales"
)]
pub async fn update_sale(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSaleRequest>,
) -> AppResult<Json<ApiResponse<Sale>>> {
    let resp = sale_service::update_sale(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/sales/{id}",
    params(("id" = Uuid, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Delete sale"),
        (status = 404, description = "Sale not found")
    ),
    tag = "Sales"
)]
pub async fn delete_sale(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = sale_service::delete_sale(&state, &user, id).await?;
    Ok(Json(resp))
}
