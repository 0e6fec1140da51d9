// Axum API Server Module
//
// Purpose: HTTP boundary for the crop recommendation pipeline plus the
// read-only lookup endpoints used by the web client's region/season pickers.

#[cfg(feature = "api")]
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};

#[cfg(feature = "api")]
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};

#[cfg(feature = "api")]
use std::sync::Arc;

#[cfg(feature = "api")]
use crate::aliases::{AliasTable, CropNameReconciler};

#[cfg(feature = "api")]
use crate::config::ServiceConfig;

#[cfg(feature = "api")]
use crate::error::RecommendError;

#[cfg(feature = "api")]
use crate::history::HistoricalCropIndex;

#[cfg(feature = "api")]
use crate::persistence::{JsonlPredictionLog, NoopSink, PredictionSink};

#[cfg(feature = "api")]
use crate::ranker::{HybridRanker, RankerConfig};

#[cfg(feature = "api")]
use crate::scorer::SuitabilityScorer;

#[cfg(feature = "api")]
use crate::service::{CropRecommendation, CropRequest, RecommendationService};

// ============================================================================
// Application State
// ============================================================================

#[cfg(feature = "api")]
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecommendationService>,
    pub history: Arc<HistoricalCropIndex>,
}

#[cfg(feature = "api")]
impl AppState {
    /// Load every startup artifact
    ///
    /// The model artifact is required; the historical dataset degrades to
    /// probability-only ranking when it cannot be read.
    pub fn new(config: &ServiceConfig) -> anyhow::Result<Self> {
        tracing::info!("Loading crop model from {}...", config.model_path.display());
        let scorer = SuitabilityScorer::from_json_file(&config.model_path)?;
        tracing::info!(
            "Loaded model '{}' ({} crops, {} seasons)",
            scorer.name(),
            scorer.labels().len(),
            scorer.seasons().len()
        );

        tracing::info!("Loading alias table...");
        let aliases = match &config.alias_table {
            Some(path) => AliasTable::from_file(path)?,
            None => AliasTable::builtin()?,
        };
        tracing::info!("Loaded {} crop aliases", aliases.len());

        tracing::info!("Building historical crop index from {}...", config.history_csv.display());
        let history = HistoricalCropIndex::load_or_unavailable(&config.history_csv, config.include_whole_year);
        let stats = history.stats();
        tracing::info!(
            "Historical index: available={} records={} regions={} seasons={}",
            stats.available,
            stats.records,
            stats.regions,
            stats.seasons
        );

        let sink: Arc<dyn PredictionSink> = match &config.prediction_log {
            Some(path) => {
                tracing::info!("Prediction log: {}", path.display());
                Arc::new(JsonlPredictionLog::new(path.clone()))
            }
            None => {
                tracing::info!("Prediction log disabled");
                Arc::new(NoopSink)
            }
        };

        Ok(Self::from_parts(scorer, history, aliases, config.ranker_config(), sink))
    }

    /// Assemble state from already-loaded parts
    pub fn from_parts(
        scorer: SuitabilityScorer,
        history: HistoricalCropIndex,
        aliases: AliasTable,
        ranker_config: RankerConfig,
        sink: Arc<dyn PredictionSink>,
    ) -> Self {
        let history = Arc::new(history);
        let ranker = HybridRanker::new(
            history.clone(),
            Arc::new(CropNameReconciler::new(aliases)),
            ranker_config,
        );
        let service = Arc::new(RecommendationService::new(Arc::new(scorer), ranker, sink));
        Self { service, history }
    }
}

// ============================================================================
// Router
// ============================================================================

#[cfg(feature = "api")]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Picker data
        .route("/locations", get(get_locations))
        .route("/seasons", get(get_seasons))
        .route("/crops", get(get_crops))

        // Recommendation
        .route("/predict-crop", post(predict_crop))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

#[cfg(feature = "api")]
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// States and their districts, as recorded in the historical dataset
#[cfg(feature = "api")]
async fn get_locations(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "states": state.history.regions(),
        "locations": state.history.sub_regions(),
    }))
}

/// Seasons from the historical dataset, or the model's vocabulary when the
/// dataset is unavailable
#[cfg(feature = "api")]
async fn get_seasons(State(state): State<AppState>) -> impl IntoResponse {
    let seasons = if state.history.is_available() {
        state.history.seasons()
    } else {
        state.service.scorer().seasons()
    };
    Json(serde_json::json!({ "seasons": seasons }))
}

#[cfg(feature = "api")]
async fn get_crops(State(state): State<AppState>) -> impl IntoResponse {
    let crops: Vec<&str> = state.service.scorer().labels().iter().collect();
    Json(serde_json::json!({ "crops": crops }))
}

#[cfg(feature = "api")]
async fn predict_crop(
    State(state): State<AppState>,
    payload: Result<Json<CropRequest>, JsonRejection>,
) -> Result<Json<CropRecommendation>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    tracing::debug!(
        "Crop prediction request (state={:?}, district={:?}, season={:?})",
        request.state,
        request.district,
        request.season
    );

    let recommendation = state.service.recommend(&request)?;
    Ok(Json(recommendation))
}

// ============================================================================
// Error Handling
// ============================================================================

#[cfg(feature = "api")]
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unprocessable(String),
    Internal(String),
}

#[cfg(feature = "api")]
impl From<RecommendError> for AppError {
    fn from(err: RecommendError) -> Self {
        match err {
            RecommendError::InvalidInput(_) | RecommendError::UnsupportedCategory { .. } => {
                AppError::BadRequest(err.to_string())
            }
            RecommendError::NoViableCandidate { .. } => AppError::Unprocessable(err.to_string()),
            RecommendError::DataUnavailable(_) | RecommendError::Model(_) => {
                tracing::error!("Prediction failed: {}", err);
                AppError::Internal(err.to_string())
            }
        }
    }
}

#[cfg(feature = "api")]
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
