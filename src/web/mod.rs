pub mod extractors;
pub mod handlers;
pub mod middleware;

use crate::models::{ModelRegistry, ModelStats};
use crate::ripeness::RipenessPipeline;
use crate::storage::UploadStore;
use crate::utils::error::PredictError;
use crate::{Config, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    middleware::from_fn,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

/// Shared handler state, built once in [`serve`].
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<RipenessPipeline>,
    pub uploads: Arc<UploadStore>,
}

impl AppState {
    pub fn new(config: Config, registry: ModelRegistry, uploads: UploadStore) -> Self {
        let pipeline = RipenessPipeline::new(
            Arc::new(registry),
            config.detection_config.confidence_threshold,
        );
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            uploads: Arc::new(uploads),
        }
    }

    /// State backed by the ONNX weights named in `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let registry = ModelRegistry::from_config(&config);
        let uploads = UploadStore::new(&config.upload_dir)?;
        Ok(Self::new(config, registry, uploads))
    }
}

pub async fn serve(config: Config) -> Result<()> {
    let state = AppState::from_config(config.clone())?;
    let app = create_app(state);

    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        PredictError::Config(format!("Invalid bind address {}: {}", config.bind_addr, e))
    })?;

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  POST /predict      - Multipart crop photo upload");
    tracing::info!("  POST /predict/json - JSON base64 upload");
    tracing::info!("  GET  /ping         - Liveness");
    tracing::info!("  GET  /health       - Model readiness");
    tracing::info!("  GET  /api/info     - Service information");

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        PredictError::Internal(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| PredictError::Internal(format!("Server failed to start: {}", e)))?;

    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let server_config = &state.config.server_config;
    let max_request_size = server_config.max_request_size;
    let request_timeout = Duration::from_secs(server_config.request_timeout);

    Router::new()
        .route("/predict", post(handlers::predict_upload_handler))
        .route("/predict/json", post(handlers::predict_json_handler))
        .route("/ping", get(ping_handler))
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_request_size))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(from_fn(middleware::security_headers))
        .layer(from_fn(middleware::request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn ping_handler() -> &'static str {
    "ok"
}

/// Reports readiness without triggering a model load.
async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let registry = state.pipeline.registry();
    Json(json!({
        "status": "healthy",
        "models_ready": registry.is_ready(),
        "last_load_error": registry.last_error(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = &state.config;
    let stats = ModelStats::collect(state.pipeline.registry(), config);
    Json(json!({
        "service": "Smart-farm ripeness service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "models": stats,
        "weights": {
            "ripeness": config.ripeness_model_path(),
            "spoilage": config.spoilage_model_path(),
        },
        "uploads": state.uploads.root(),
        "detection": {
            "confidence_threshold": state.pipeline.confidence_threshold(),
            "iou_threshold": config.detection_config.iou_threshold,
            "input_size": config.detection_config.input_size,
        }
    }))
}
