//! Crop Advisor
//!
//! Ranks candidate crops for a field from soil and climate readings.
//!
//! Pipeline: a trained classifier scores every crop it knows
//! ([`scorer`]), then the hybrid ranker ([`ranker`]) prefers crops that the
//! historical production records ([`history`]) show being grown in the
//! requested state and season, bridging naming differences through the alias
//! table ([`aliases`]).
//!
//! - `utils/`: text normalization shared by every lookup
//! - `service`: transport-independent request handling
//! - `api_server`: axum HTTP boundary (feature `api`)

pub mod aliases;
pub mod config;
pub mod error;
pub mod features;
pub mod history;
pub mod persistence;
pub mod ranker;
pub mod scorer;
pub mod service;
pub mod utils;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use aliases::{AliasTable, CropNameReconciler};
pub use config::ServiceConfig;
pub use error::{RecommendError, Result};
pub use features::{FeatureVector, Region, SoilReadings};
pub use history::{HistoricalCropIndex, HistoricalRecord};
pub use persistence::{NoopSink, PredictionRecord, PredictionSink};
pub use ranker::{HybridRanker, RankedRecommendation, RankerConfig, Recommendation};
pub use scorer::{LabelSet, ProbabilityDistribution, SuitabilityScorer};
pub use service::{CropRecommendation, CropRequest, RecommendationService};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
#[cfg(feature = "api")]
pub use persistence::JsonlPredictionLog;
