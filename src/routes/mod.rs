use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod customers;
pub mod doc;
pub mod health;
pub mod params;
pub mod products;
pub mod sales;
pub mod subscriptions;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router(enable_test_token_route: bool) -> Router<AppState> {
    let router = Router::new()
        .merge(auth::router())
        .nest("/clientes", customers::router())
        .nest("/produtos", products::router())
        .nest("/sales", sales::router())
        .nest("/subscriptions", subscriptions::router())
        .nest("/users", users::router());

    if enable_test_token_route {
        router.merge(auth::test_token_router())
    } else {
        router
    }
}
