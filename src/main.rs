use std::sync::Arc;

use carbon::config::AppConfig;
use carbon::db::{init_pool, run_migrations};
use carbon::error::AppError;
use carbon::routes::create_router;
use carbon::services::{geocoder::GoogleGeocoder, http_client, impact::ImpactCo2Client};
use carbon::state::AppState;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    let db = init_pool(&config.database_url).await?;

    if let Err(err) = run_migrations(&db).await {
        error!("migration failed: {err:?}");
        return Err(err);
    }

    if config.google_maps_api_key.is_none() {
        warn!("GOOGLE_MAPS_API_KEY not set, trips without a distance will be rejected");
    }

    let client = http_client(config.upstream_timeout)?;
    let geocoder = GoogleGeocoder::new(
        client.clone(),
        config.geocoder_url.clone(),
        config.google_maps_api_key.clone(),
    );
    let impact = ImpactCo2Client::new(client, config.impact_api_url.clone());

    let state = AppState::new(config.clone(), db, Arc::new(geocoder), Arc::new(impact));
    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,carbon=debug,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
