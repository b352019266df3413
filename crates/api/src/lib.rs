//! Vision Inference API Server
//!
//! HTTP front end for a single pre-loaded vision model: `POST /predict`
//! accepts one image and answers with a classification or a detection list.

pub mod error;
pub mod routes;
pub mod settings;

pub use error::PredictError;
pub use settings::{LoggingSettings, MetricsSettings, ServerSettings, Settings};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use inference_engine::ModelHandle;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Error type for startup failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Application state shared across handlers; read-only once serving starts
pub struct AppState {
    /// Process-wide model handle
    pub model: ModelHandle,
    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,
    /// Prometheus exporter, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(model: ModelHandle) -> Self {
        Self {
            model,
            max_upload_bytes: ServerSettings::default().max_upload_bytes,
            metrics: None,
        }
    }

    pub fn with_upload_limit(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn with_metrics(mut self, metrics: Option<PrometheusHandle>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.max_upload_bytes;

    Router::new()
        .route(
            "/",
            get(routes::root::index).fallback(routes::method_not_allowed),
        )
        .route(
            "/predict",
            post(routes::predict::predict).fallback(routes::method_not_allowed),
        )
        .route(
            "/metrics",
            get(routes::prometheus::render).fallback(routes::method_not_allowed),
        )
        .fallback(routes::not_found)
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .with_state(state)
}

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> Result<(), BoxError> {
    let parsed = settings.level.parse::<Level>().ok();
    let level = parsed.unwrap_or(Level::INFO);

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    if parsed.is_none() {
        warn!("Unknown log level {:?}, using info", settings.level);
    }
    Ok(())
}

/// Load the model, then serve until the listener fails
pub async fn run_server(settings: Settings) -> Result<(), BoxError> {
    let model = ModelHandle::load(&settings.model);
    if let ModelHandle::Unavailable { reason } = &model {
        warn!("Serving without a model, /predict will answer 503: {}", reason);
    }

    let metrics = if settings.metrics.enabled {
        Some(PrometheusBuilder::new().install_recorder()?)
    } else {
        None
    };

    let state = AppState::new(model)
        .with_upload_limit(settings.server.max_upload_bytes)
        .with_metrics(metrics);
    let app = create_router(Arc::new(state));

    let addr = settings.server.bind_address();
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
