//! Hybrid Ranker
//!
//! Turns a [`ProbabilityDistribution`] into a short ranked list of crops.
//!
//! With a region and season (and a loaded historical index) candidates are
//! split into *strict* matches, crops historically grown there, and the
//! rest. The shortlist is filled from the strict group first and topped up
//! from the rest, each group ordered by raw probability. Without a region,
//! season or dataset the ranker takes the top candidates by probability.
//!
//! Display confidence is computed after ranking and never feeds back into it:
//! `t = max(p, 1e-6)^γ`, scaled to sum to 100 across the shortlist.

use std::sync::Arc;

use serde::Serialize;
use smallvec::SmallVec;

use crate::aliases::CropNameReconciler;
use crate::error::{RecommendError, Result};
use crate::features::Region;
use crate::history::HistoricalCropIndex;
use crate::scorer::ProbabilityDistribution;

/// Floor applied before the emphasis exponent so zero-probability fillers
/// still get a positive display value
const MIN_PROBABILITY: f64 = 1e-6;

pub const DEFAULT_SHORTLIST_LEN: usize = 4;
pub const DEFAULT_EMPHASIS_EXPONENT: f64 = 0.25;

#[derive(Debug, Clone, Copy)]
pub struct RankerConfig {
    pub shortlist_len: usize,
    pub emphasis_exponent: f64,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            shortlist_len: DEFAULT_SHORTLIST_LEN,
            emphasis_exponent: DEFAULT_EMPHASIS_EXPONENT,
        }
    }
}

/// How the shortlist was selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    Historical,
    ProbabilityOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub crop: String,
    /// Raw model probability
    pub probability: f64,
    /// Display value in (0, 100]
    pub confidence: f64,
    /// Passed the historical filter
    pub strict: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedRecommendation {
    items: SmallVec<[Recommendation; DEFAULT_SHORTLIST_LEN]>,
    filter: FilterMode,
}

impl RankedRecommendation {
    /// Best candidate. Always present: an empty shortlist is an error.
    pub fn top(&self) -> &Recommendation {
        &self.items[0]
    }

    pub fn alternatives(&self) -> &[Recommendation] {
        &self.items[1..]
    }

    pub fn items(&self) -> &[Recommendation] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    pub fn strict_matches(&self) -> usize {
        self.items.iter().filter(|r| r.strict).count()
    }
}

pub struct HybridRanker {
    index: Arc<HistoricalCropIndex>,
    reconciler: Arc<CropNameReconciler>,
    config: RankerConfig,
}

impl HybridRanker {
    pub fn new(
        index: Arc<HistoricalCropIndex>,
        reconciler: Arc<CropNameReconciler>,
        config: RankerConfig,
    ) -> Self {
        Self { index, reconciler, config }
    }

    /// Rank `distribution` for an optional region and season
    pub fn rank(
        &self,
        distribution: &ProbabilityDistribution,
        region: Option<&Region>,
        season: Option<&str>,
    ) -> Result<RankedRecommendation> {
        if distribution.is_empty() {
            return Err(RecommendError::NoViableCandidate {
                detail: "the model has no crop labels to rank".to_string(),
            });
        }

        let historical = match (region, season) {
            (Some(region), Some(season)) if self.index.is_available() => Some(self.index.lookup_in(
                &region.primary,
                region.secondary.as_deref(),
                season,
            )),
            (Some(_), Some(_)) => {
                tracing::debug!("Historical index unavailable, ranking by probability only");
                None
            }
            _ => None,
        };

        // Label-set order is the tie-break; sort_by is stable
        let mut candidates: Vec<(&str, f64, bool)> = distribution
            .iter()
            .map(|(label, p)| {
                let strict = historical
                    .is_some_and(|set| self.reconciler.is_historically_valid(label, set));
                (label, p, strict)
            })
            .collect();
        candidates.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| b.1.total_cmp(&a.1)));
        candidates.truncate(self.config.shortlist_len.max(1));

        let raw: SmallVec<[f64; DEFAULT_SHORTLIST_LEN]> = candidates.iter().map(|c| c.1).collect();
        let confidences = display_confidences(&raw, self.config.emphasis_exponent);

        let items = candidates
            .into_iter()
            .zip(confidences)
            .map(|((crop, probability, strict), confidence)| Recommendation {
                crop: crop.to_string(),
                probability,
                confidence,
                strict,
            })
            .collect();

        let filter = if historical.is_some() {
            FilterMode::Historical
        } else {
            FilterMode::ProbabilityOnly
        };

        Ok(RankedRecommendation { items, filter })
    }
}

/// Emphasis transform for the shortlist, in shortlist order
///
/// Computed in log space so a large exponent cannot underflow every term to
/// zero. Values are rounded to two decimals and clamped to a running minimum:
/// a strict match ranked above a more probable filler never shows a lower
/// confidence than the filler.
pub fn display_confidences(probabilities: &[f64], exponent: f64) -> SmallVec<[f64; DEFAULT_SHORTLIST_LEN]> {
    let log_emphasized: SmallVec<[f64; DEFAULT_SHORTLIST_LEN]> = probabilities
        .iter()
        .map(|p| exponent * p.max(MIN_PROBABILITY).ln())
        .collect();
    let max = log_emphasized.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    // Relative weights; the largest is 1 so the total never reaches zero
    let weights: SmallVec<[f64; DEFAULT_SHORTLIST_LEN]> = log_emphasized
        .iter()
        .map(|l| {
            let w = (l - max).exp();
            if w.is_nan() {
                1.0
            } else {
                w
            }
        })
        .collect();
    let total: f64 = weights.iter().sum();

    let mut ceiling = 100.0_f64;
    weights
        .iter()
        .map(|w| {
            let value = round2(100.0 * w / total).clamp(0.01, ceiling);
            ceiling = value;
            value
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
