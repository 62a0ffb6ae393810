use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::net::SocketAddr;

use gym_members_api::{
    app::build_app,
    config::AppConfig,
    db::{create_orm_conn, sync_schema},
    services::auth_service::bootstrap_superadmin,
    state::AppState,
    tasks::GuardianSweeper,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gym_members_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    sync_schema(&orm).await?;

    let state = AppState::new(orm.clone(), &config)?;
    bootstrap_superadmin(&orm, &state.passwords, &config.superadmin).await?;

    if config.enable_test_token_route {
        tracing::warn!("GET /generate-token is enabled; do not run this configuration in production");
    }

    let shutdown = CancellationToken::new();
    let sweeper = GuardianSweeper::new(orm, config.guardian_sweep_interval);
    let sweeper_task = tokio::spawn(sweeper.run(shutdown.clone()));

    let app = build_app(state, &config);

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await?;

    shutdown.cancel();
    if let Err(err) = sweeper_task.await {
        tracing::error!(error = %err, "guardian sweeper task failed");
    }

    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::error!(error = %err, "failed to listen for ctrl-c");
            }
            tracing::info!("shutdown requested");
        }
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}
