//! # forecast-dashboard
//!
//! Serves the forecast evaluation API.

use axum::http::HeaderName;
use dashboard::routes::SESSION_HEADER;
use dashboard::{router, AppState, Settings};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dashboard=info,feedback_relay=info,forecast_eval=info,tower_http=info".into()
            }),
        )
        .init();

    let settings = Settings::load_default()?;
    let state = AppState::from_settings(&settings)?;
    tracing::info!(
        records = state.store.len(),
        dropped = state.store.dropped_rows(),
        "forecast data ready"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(SESSION_HEADER)]);

    let app = router(state, settings.server.static_dir.as_deref())
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = settings.bind_address().parse()?;
    tracing::info!("forecast-dashboard v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
