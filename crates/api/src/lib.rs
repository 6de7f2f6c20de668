//! HarvestHub API Server
//!
//! REST API for the farmer/buyer marketplace: advisory endpoints, the
//! farmer dashboard, listing acceptance and demand posting, mandi prices and
//! the crop lifecycle.

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod config;
pub mod context;
pub mod error;
pub mod rate_limit;
mod routes;
pub mod telemetry;

pub use config::AppConfig;
pub use telemetry::init_logging;

use advisor::Advisor;
use classifier::{Classifier, CropDefaults, MspTable};
use fallback::FallbackEngine;
use request_validator::Validator;
use storage::{seed_demo, seed_msp, MarketStore, MemoryStore, MspValue, PriceHistory, SqliteStore};

/// Application state shared across handlers
pub struct AppState {
    /// Marketplace repository
    pub store: Arc<dyn MarketStore>,
    /// Advisory engine
    pub advisor: Advisor,
    /// Band classifier
    pub classifier: Classifier,
    /// Configured MSP table, used when the store has no value
    pub msp: MspTable,
    /// Per-crop onboarding defaults
    pub crops: CropDefaults,
    /// Mandi price history
    pub prices: PriceHistory,
    /// Request field validator
    pub validator: Validator,
    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,
    /// Prometheus handle, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Build state from configuration: open the store, seed reference data,
    /// load price history and set up the advisor.
    pub async fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let classifier = Classifier::new(config.thresholds.clone())?;
        let fallback = FallbackEngine::new(config.fallback.clone(), classifier.clone());
        let advisor = Advisor::new(&config.advisor, fallback)?;

        let store: Arc<dyn MarketStore> = match &config.storage.database_url {
            Some(url) => Arc::new(SqliteStore::connect(url, config.storage.max_connections).await?),
            None => {
                info!("Using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        let msp_values: Vec<MspValue> = config
            .msp
            .prices
            .iter()
            .map(|(crop, price)| MspValue {
                crop: crop.clone(),
                price_per_qtl: *price,
                season: config.msp.season.clone(),
            })
            .collect();
        seed_msp(store.as_ref(), &msp_values).await?;
        if config.server.seed_demo {
            seed_demo(store.as_ref()).await?;
        }

        let prices = PriceHistory::load(&config.storage.price_history_path).unwrap_or_else(|e| {
            warn!("Price history unavailable, series will be synthesized: {}", e);
            PriceHistory::empty()
        });

        Ok(Self {
            store,
            advisor,
            classifier,
            msp: config.msp.clone(),
            crops: config.crops.clone(),
            prices,
            validator: Validator::new(config.validation.clone()),
            cors_origins: config.server.cors_origins.clone(),
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        })
    }

    /// Attach a Prometheus handle for `/metrics`
    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub advisor: ComponentHealth,
    pub database: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub detail: String,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT_LANGUAGE]);

    if origins.is_empty() {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.cors_origins);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/ai/harvest", post(routes::advisor::harvest))
        .route("/api/ai/quantity", post(routes::advisor::quantity))
        .route("/api/ai/sell", post(routes::advisor::sell))
        .route("/api/dashboard/summary", get(routes::dashboard::summary))
        .route("/api/marketplace/accept", post(routes::marketplace::accept))
        .route("/api/marketplace/post-demand", post(routes::marketplace::post_demand))
        .route("/api/marketplace/listings", get(routes::marketplace::open_listings))
        .route("/api/buyers/:uid/overview", get(routes::marketplace::buyer_overview))
        .route("/api/market/prices", get(routes::market::prices))
        .route("/api/onboarding", post(routes::onboarding::onboard))
        .route("/api/farmers/:uid/advance-status", post(routes::farmers::advance_status))
        .route("/api/farmers/:uid/actual-price", post(routes::farmers::actual_price))
        .route("/api/farmers/:uid/harvest-window", post(routes::farmers::harvest_window))
        .route("/api/farmers/:uid/matches", get(routes::farmers::matches))
        .layer(middleware::from_fn(context::propagate_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let database = match state.store.get_msp("paddy").await {
        Ok(_) => ComponentHealth {
            status: "ok".to_string(),
            detail: "reachable".to_string(),
        },
        Err(e) => ComponentHealth {
            status: "error".to_string(),
            detail: e.to_string(),
        },
    };
    let advisor = ComponentHealth {
        status: "ok".to_string(),
        detail: if state.advisor.is_mock() { "mock" } else { "live" }.to_string(),
    };
    let status = if database.status == "ok" { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus { advisor, database },
    })
}

/// Prometheus scrape endpoint
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.metrics.as_ref().map(|h| h.render()).unwrap_or_default();
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

/// Run the server
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let state = AppState::build(&config)
        .await?
        .with_metrics(telemetry::install_metrics());
    let mut app = create_router(Arc::new(state));

    match rate_limit::create_governor_config(&config.server.rate_limit) {
        Some(governor) => {
            info!("Rate limiting: {:?}", config.server.rate_limit);
            app = app.layer(GovernorLayer { config: governor });
        }
        None => warn!("Rate limiting disabled"),
    }

    info!("Starting API server on {}", config.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
