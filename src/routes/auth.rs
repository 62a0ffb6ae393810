use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::auth::{LoginRequest, LoginResponse},
    error::AppResult,
    response::ApiResponse,
    services::auth_service::{issue_test_token, login_user},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Mounted only when the test token route is enabled in configuration.
pub fn test_token_router() -> Router<AppState> {
    Router::new().route("/generate-token", get(generate_token))
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    security(()),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = login_user(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/generate-token",
    responses(
        (status = 200, description = "Admin token for a synthetic identity", body = ApiResponse<LoginResponse>)
    ),
    security(()),
    tag = "Auth"
)]
pub async fn generate_token(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = issue_test_token(&state)?;
    Ok(Json(resp))
}
