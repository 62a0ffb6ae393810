use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::subscriptions::{CreateSubscriptionRequest, SubscriptionList, UpdateSubscriptionRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Subscription,
    response::ApiResponse,
    routes::params::{Pagination, SubscriptionQuery},
    services::subscription_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscriptions).post(create_subscription))
        .route(
            "/{id}",
            get(get_subscription)
                .put(update_subscription)
                .delete(cancel_subscription),
        )
}

#[utoipa::path(
    get,
    path = "/subscriptions",
    params(Pagination, SubscriptionQuery),
    responses(
        (status = 200, description = "List subscriptions", body = ApiResponse<SubscriptionList>)
    ),
    tag = "Subscriptions"
)]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
    Query(query): Query<SubscriptionQuery>,
) -> AppResult<Json<ApiResponse<SubscriptionList>>> {
    let resp = subscription_service::list_subscriptions(&state, &user, pagination, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/subscriptions/{id}",
    params(("id" = Uuid, Path, description = "Subscription ID")),
    responses(
        (status = 200, description = "Get subscription", body = ApiResponse<Subscription>),
        (status = 404, description = "Subscription not found")
    ),
    tag = "Subscriptions"
)]
pub async fn get_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Subscription>>> {
    let resp = subscription_service::get_subscription(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/subscriptions",
    request_body = CreateSubscriptionRequest,
    responses(
        (status = 201, description = "Create subscription", body = ApiResponse<Subscription>),
        (status = 400, description = "Invalid subscription or unknown customer")
    ),
    tag = "Subscriptions"
)]
pub async fn create_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Subscription>>)> {
    let resp = subscription_service::create_subscription(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/subscriptions/{id}",
    params(("id" = Uuid, Path, description = "Subscription ID")),
    request_body = UpdateSubscriptionRequest,
    responses(
        (status = 200, description = "Update subscription", body = ApiResponse<Subscription>),
        (status = 404, description = "Subscription not found")
    ),
    tag = "Subscriptions"
)]
pub async fn update_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSubscriptionRequest>,
) -> AppResult<Json<ApiResponse<Subscription>>> {
    let resp = subscription_service::update_subscription(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/subscriptions/{id}",
    params(("id" = Uuid, Path, description = "Subscription ID")),
    responses(
        (status = 200, description = "Subscription cancelled", body = ApiResponse<Subscription>),
        (status = 404, description = "Subscription not found")
    ),
    tag = "Subscriptions"
)]
pub async fn cancel_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Subscription>>> {
    let resp = subscription_service::cancel_subscription(&state, &user, id).await?;
    Ok(Json(resp))
}
