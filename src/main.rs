use std::sync::Arc;

use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use nokeys::config::AppConfig;
use nokeys::db;
use nokeys::handlers;
use nokeys::services::appointments::AppointmentStore;
use nokeys::services::clock::SystemClock;
use nokeys::services::refresh;
use nokeys::services::storage::sqlite::SqliteStore;
use nokeys::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let (notifications_tx, _) = broadcast::channel(256);
    let (view_tx, _) = broadcast::channel(16);

    let store = AppointmentStore::open(
        Box::new(SqliteStore::new(conn)),
        Arc::new(SystemClock),
        notifications_tx.clone(),
    );
    if let Some(e) = store.load_error() {
        tracing::warn!(error = %e, "continuing with an empty appointment list");
    }

    let state = Arc::new(AppState::new(store, notifications_tx, view_tx));

    let sweeper = refresh::spawn_sweeper(state.clone(), config.sweep_interval());
    tracing::info!(
        interval_secs = config.sweep_interval_secs,
        "retention sweeper started"
    );

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    sweeper.abort();
    Ok(())
}
