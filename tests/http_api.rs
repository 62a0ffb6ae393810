mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::{SUPERADMIN_EMAIL, SUPERADMIN_PASSWORD, bearer, setup_state};
use gym_members_api::{
    app::build_app, security::Role, services::auth_service::bootstrap_superadmin,
};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(app: &Router, request: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    builder.body(Body::empty()).expect("request")
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() -> anyhow::Result<()> {
    let (state, config) = setup_state().await?;
    let app = build_app(state, &config);

    let (status, body) = send(&app, get("/clientes", None)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["data"]["error"].is_string());

    let (status, _) = send(&app, get("/clientes", Some("Bearer not-a-jwt"))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn roles_gate_resources() -> anyhow::Result<()> {
    let (state, config) = setup_state().await?;
    let user = bearer(&state, Role::User);
    let admin = bearer(&state, Role::Admin);
    let root = bearer(&state, Role::Superadmin);
    let app = build_app(state, &config);

    let (status, _) = send(&app, get("/produtos", Some(&user))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, get("/produtos?page=1&per_page=5", Some(&admin))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["per_page"], 5);

    let (status, _) = send(&app, get("/users", Some(&admin))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, get("/users", Some(&root))).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn huge_page_returns_empty_list() -> anyhow::Result<()> {
    let (state, config) = setup_state().await?;
    let admin = bearer(&state, Role::Admin);
    let app = build_app(state, &config);

    let (status, body) = send(
        &app,
        get("/clientes?page=9223372036854775807&per_page=100", Some(&admin)),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"], json!([]));
    Ok(())
}

#[tokio::test]
async fn login_with_bootstrapped_superadmin() -> anyhow::Result<()> {
    let (state, config) = setup_state().await?;
    assert!(bootstrap_superadmin(&state.orm, &state.passwords, &config.superadmin).await?);
    assert!(!bootstrap_superadmin(&state.orm, &state.passwords, &config.superadmin).await?);
    let app = build_app(state, &config);

    let (status, _) = send(
        &app,
        post_json(
            "/login",
            None,
            json!({ "email": SUPERADMIN_EMAIL, "password": "wrong-password" }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        post_json(
            "/login",
            None,
            json!({ "email": SUPERADMIN_EMAIL, "password": SUPERADMIN_PASSWORD }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().expect("token").to_string();

    let (status, body) = send(&app, get("/users", Some(&format!("Bearer {token}")))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"][0]["email"], SUPERADMIN_EMAIL);
    assert!(body["data"]["items"][0].get("password_hash").is_none());
    Ok(())
}

#[tokio::test]
async fn customer_creation_over_http() -> anyhow::Result<()> {
    let (state, config) = setup_state().await?;
    let admin = bearer(&state, Role::Admin);
    let app = build_app(state, &config);

    let customer = json!({
        "name": "Tiago Leal",
        "birth_date": "2020-04-04",
        "gender": "male",
        "email": "tiago@example.com",
        "phone": "+55 81 97777-1111",
        "tax_id": "111.222.333-44",
        "address": "Rua do Sol, 9",
        "city": "Recife",
        "state": "PE",
        "postal_code": "50030-000"
    });

    let (status, _) = send(
        &app,
        post_json("/clientes", Some(&admin), json!({ "customer": customer.clone() })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        post_json(
            "/clientes",
            Some(&admin),
            json!({ "customer": customer, "guardian": { "father_name": "Rui Leal" } }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["guardian"]["father_name"], "Rui Leal");

    let (status, body) = send(&app, get("/clientes/basic", Some(&admin))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"][0]["name"], "Tiago Leal");
    assert!(body["data"]["items"][0].get("phone").is_none());
    Ok(())
}

#[tokio::test]
async fn health_docs_and_fallback() -> anyhow::Result<()> {
    let (state, config) = setup_state().await?;
    let app = build_app(state, &config);

    let (status, body) = send(&app, get("/health", None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let response = app.clone().oneshot(get("/health", None)).await?;
    assert!(response.headers().contains_key("x-request-id"));

    let (status, body) = send(&app, get("/nope", None)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/nope");

    let (status, _) = send(&app, get("/generate-token", None)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_token_route_when_enabled() -> anyhow::Result<()> {
    let (state, mut config) = setup_state().await?;
    config.enable_test_token_route = true;
    let app = build_app(state, &config);

    let (status, body) = send(&app, get("/generate-token", None)).await?;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().expect("token");

    let (status, _) = send(&app, get("/sales", Some(token))).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn rate_limit_rejects_excess_requests() -> anyhow::Result<()> {
    let (state, mut config) = setup_state().await?;
    config.rate_limit.max_requests = 2;
    let app = build_app(state, &config);

    for _ in 0..2 {
        let (status, _) = send(&app, get("/health", None)).await?;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(&app, get("/health", None)).await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    Ok(())
}
