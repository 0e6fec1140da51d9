//! Recommendation Service
//!
//! Transport-independent request handling: validate the typed request, score
//! it, rank it, shape the response and hand the input/output pair to the
//! prediction sink. The HTTP layer in `api_server` is a thin wrapper.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::features::{FeatureVector, SoilReadings};
use crate::persistence::{PredictionRecord, PredictionSink};
use crate::ranker::{FilterMode, HybridRanker, RankedRecommendation};
use crate::scorer::SuitabilityScorer;

/// Crop recommendation request
///
/// Field names follow the JSON body sent by the web client; the capitalised
/// names of the older form are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRequest {
    #[serde(alias = "Nitrogen", alias = "N")]
    pub nitrogen: f64,
    #[serde(alias = "Phosphorus", alias = "P")]
    pub phosphorus: f64,
    #[serde(alias = "Potassium", alias = "K")]
    pub potassium: f64,
    #[serde(alias = "Temperature")]
    pub temperature: f64,
    #[serde(alias = "Humidity")]
    pub humidity: f64,
    #[serde(alias = "pH", alias = "PH")]
    pub ph: f64,
    #[serde(alias = "Rainfall")]
    pub rainfall: f64,
    #[serde(default, alias = "State", alias = "region", skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, alias = "District", skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, alias = "Season", skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
}

impl CropRequest {
    pub fn readings(&self) -> SoilReadings {
        SoilReadings {
            nitrogen: self.nitrogen,
            phosphorus: self.phosphorus,
            potassium: self.potassium,
            temperature: self.temperature,
            humidity: self.humidity,
            ph: self.ph,
            rainfall: self.rainfall,
        }
    }

    pub fn to_features(&self) -> Result<FeatureVector> {
        FeatureVector::new(
            self.readings(),
            self.season.as_deref(),
            self.state.as_deref(),
            self.district.as_deref(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub crop: String,
    /// Display confidence, 0-100
    pub probability: f64,
}

/// Successful recommendation response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRecommendation {
    pub recommended_crop: String,
    pub confidence: f64,
    pub alternatives: Vec<Alternative>,
    /// `historical` or `probability_only`
    pub filter: String,
    pub strict_matches: usize,
    pub season_used: Option<String>,
}

impl CropRecommendation {
    fn from_ranked(ranked: &RankedRecommendation, season_used: Option<String>) -> Self {
        let top = ranked.top();
        Self {
            recommended_crop: top.crop.clone(),
            confidence: top.confidence,
            alternatives: ranked
                .alternatives()
                .iter()
                .map(|r| Alternative {
                    crop: r.crop.clone(),
                    probability: r.confidence,
                })
                .collect(),
            filter: match ranked.filter() {
                FilterMode::Historical => "historical",
                FilterMode::ProbabilityOnly => "probability_only",
            }
            .to_string(),
            strict_matches: ranked.strict_matches(),
            season_used,
        }
    }
}

pub struct RecommendationService {
    scorer: Arc<SuitabilityScorer>,
    ranker: HybridRanker,
    sink: Arc<dyn PredictionSink>,
}

impl RecommendationService {
    pub fn new(scorer: Arc<SuitabilityScorer>, ranker: HybridRanker, sink: Arc<dyn PredictionSink>) -> Self {
        Self { scorer, ranker, sink }
    }

    pub fn scorer(&self) -> &SuitabilityScorer {
        &self.scorer
    }

    /// Score and rank one request
    ///
    /// The sink is only fed on success and its outcome never affects the
    /// returned value.
    pub fn recommend(&self, request: &CropRequest) -> Result<CropRecommendation> {
        let features = request.to_features()?;
        let scored = self.scorer.score_with_season(&features)?;

        // Historical lookup uses the season as requested, not the model default
        let ranked = self
            .ranker
            .rank(&scored.distribution, features.region(), features.season())?;

        let recommendation = CropRecommendation::from_ranked(&ranked, scored.season_used);
        tracing::debug!(
            "Recommended {} ({:.2}) with {} alternatives, filter={}",
            recommendation.recommended_crop,
            recommendation.confidence,
            recommendation.alternatives.len(),
            recommendation.filter
        );

        self.sink
            .submit(PredictionRecord::new(request.clone(), recommendation.clone()));

        Ok(recommendation)
    }
}
