mod color;
mod config;
mod corpus;
mod error;
mod index;
mod models;
mod parser;
mod pattern;
mod payroll;
mod routes;
mod service;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use config::AppConfig;
use corpus::PgConceptCorpus;
use index::DependencyIndex;
use payroll::PgPayrollAggregator;
use service::ConceptService;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conceptos_api=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    let config = AppConfig::from_env();
    tracing::info!(
        addr = %config.server_addr,
        database_url = %config.masked_database_url(),
        pool_size = config.database_pool_size,
        "starting conceptos-api"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database_pool_size)
        .connect(&config.database_url)
        .await?;

    let corpus: Arc<dyn corpus::ConceptCorpus> = Arc::new(PgConceptCorpus::new(pool.clone()));
    let index = Arc::new(DependencyIndex::new());

    if let Err(err) = index.build(corpus.as_ref()).await {
        tracing::error!(error = %err, "initial dependency index build failed");
    }

    spawn_refresh_loop(corpus.clone(), index.clone(), config.cache_expiration);

    let service = Arc::new(ConceptService::new(corpus, index));
    let payroll: Arc<dyn payroll::PayrollAggregator> = Arc::new(PgPayrollAggregator::new(pool));
    let app_state = AppState::new(service, payroll, Arc::new(config.clone()));

    let cors = build_cors_layer(&config.cors_allowed_origins);

    let app = routes::router()
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    tracing::info!(addr = %config.server_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_refresh_loop(
    corpus: Arc<dyn corpus::ConceptCorpus>,
    index: Arc<DependencyIndex>,
    interval: Duration,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately; the initial build already ran
        loop {
            ticker.tick().await;
            tracing::info!("periodic dependency index rebuild starting");
            match index.build(corpus.as_ref()).await {
                Ok(stats) => tracing::info!(?stats, "periodic rebuild finished"),
                Err(err) => tracing::error!(error = %err, "periodic rebuild failed"),
            }
        }
    });
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
