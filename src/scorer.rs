//! Suitability Scorer - probability distribution over crop labels
//!
//! Wraps a classifier exported by the offline trainer as a JSON artifact and
//! turns a [`FeatureVector`] into a [`ProbabilityDistribution`] over the
//! model's fixed label set.
//!
//! Supported artifacts (`model_type`):
//! - `gaussian_nb`: per-class means/variances + priors, optional per-class
//!   season log-likelihoods
//! - `linear_model`: multinomial logistic regression, `softmax(W·x + b)`,
//!   season one-hot appended to the numeric features
//! - `nearest_centroid`: single-label predictor, degraded to a one-hot
//!   distribution
//!
//! Scoring is pure arithmetic over immutable parameters: identical input and
//! model produce bit-identical output.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::RecommendError;
use crate::features::{FeatureVector, NUMERIC_FEATURES};
use crate::utils::normalization::normalize_name;

/// Allowed deviation of a distribution's sum from 1.0
const SUM_TOLERANCE: f64 = 1e-6;

// ============================================================================
// Label set and distribution
// ============================================================================

/// Ordered crop labels known to the scorer. Cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
    labels: Arc<[String]>,
}

impl LabelSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|s| s.as_str())
    }
}

/// Probability per label, in [`LabelSet`] order
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityDistribution {
    labels: LabelSet,
    probabilities: Vec<f64>,
}

impl ProbabilityDistribution {
    /// Build a distribution, checking shape, range and normalization
    pub fn new(labels: LabelSet, probabilities: Vec<f64>) -> crate::error::Result<Self> {
        if labels.len() != probabilities.len() {
            return Err(RecommendError::Model(format!(
                "{} probabilities for {} labels",
                probabilities.len(),
                labels.len()
            )));
        }
        if let Some(p) = probabilities
            .iter()
            .find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0)
        {
            return Err(RecommendError::Model(format!("probability {} outside [0, 1]", p)));
        }
        if !probabilities.is_empty() {
            let sum: f64 = probabilities.iter().sum();
            if (sum - 1.0).abs() > SUM_TOLERANCE {
                return Err(RecommendError::Model(format!(
                    "probabilities sum to {}, expected 1",
                    sum
                )));
            }
        }

        Ok(Self { labels, probabilities })
    }

    /// All mass on one label
    pub fn one_hot(labels: LabelSet, idx: usize) -> Self {
        let probabilities = (0..labels.len())
            .map(|i| if i == idx { 1.0 } else { 0.0 })
            .collect();
        Self { labels, probabilities }
    }

    /// Convenience constructor from `(label, probability)` pairs
    pub fn from_pairs(pairs: &[(&str, f64)]) -> crate::error::Result<Self> {
        let labels = LabelSet::new(pairs.iter().map(|(l, _)| *l));
        Self::new(labels, pairs.iter().map(|(_, p)| *p).collect())
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.probabilities[i])
    }

    /// `(label, probability)` in label-set order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels.iter().zip(self.probabilities.iter().copied())
    }

    /// Label with the highest probability (first one on ties)
    pub fn argmax(&self) -> Option<(&str, f64)> {
        self.iter()
            .fold(None, |best, (label, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((label, p)),
            })
    }
}

// ============================================================================
// Classifier seam
// ============================================================================

/// Model input after scaling and season encoding
#[derive(Debug, Clone, Copy)]
pub struct ModelInput {
    pub numeric: [f64; NUMERIC_FEATURES],
    /// Index into the model's season vocabulary
    pub season: Option<usize>,
}

/// A trained classifier over a fixed number of classes
pub trait Classifier: Send + Sync {
    fn n_classes(&self) -> usize;

    /// Class probabilities, if the model can produce them
    fn predict_proba(&self, input: &ModelInput) -> Option<Vec<f64>>;

    /// Best class index
    fn predict(&self, input: &ModelInput) -> usize;
}

/// Gaussian naive Bayes (sklearn `GaussianNB` export)
#[derive(Debug)]
struct GaussianNb {
    theta: Vec<[f64; NUMERIC_FEATURES]>,
    var: Vec<[f64; NUMERIC_FEATURES]>,
    log_prior: Vec<f64>,
    season_log_prob: Option<Vec<Vec<f64>>>,
}

impl GaussianNb {
    fn joint_log_likelihood(&self, input: &ModelInput) -> Vec<f64> {
        const LN_2PI: f64 = 1.837_877_066_409_345_5;

        (0..self.theta.len())
            .map(|c| {
                let mut jll = self.log_prior[c];
                for j in 0..NUMERIC_FEATURES {
                    let var = self.var[c][j];
                    let diff = input.numeric[j] - self.theta[c][j];
                    jll -= 0.5 * (LN_2PI + var.ln()) + diff * diff / (2.0 * var);
                }
                if let (Some(table), Some(s)) = (&self.season_log_prob, input.season) {
                    jll += table[c][s];
                }
                jll
            })
            .collect()
    }
}

impl Classifier for GaussianNb {
    fn n_classes(&self) -> usize {
        self.theta.len()
    }

    fn predict_proba(&self, input: &ModelInput) -> Option<Vec<f64>> {
        Some(softmax(&self.joint_log_likelihood(input)))
    }

    fn predict(&self, input: &ModelInput) -> usize {
        argmax(&self.joint_log_likelihood(input))
    }
}

/// Multinomial logistic regression
#[derive(Debug)]
struct LinearModel {
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
    n_seasons: usize,
}

impl LinearModel {
    fn logits(&self, input: &ModelInput) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(row, b)| {
                let numeric: f64 = row[..NUMERIC_FEATURES]
                    .iter()
                    .zip(input.numeric.iter())
                    .map(|(w, x)| w * x)
                    .sum();
                let season = match input.season {
                    Some(s) if s < self.n_seasons => row[NUMERIC_FEATURES + s],
                    _ => 0.0,
                };
                numeric + season + b
            })
            .collect()
    }
}

impl Classifier for LinearModel {
    fn n_classes(&self) -> usize {
        self.weights.len()
    }

    fn predict_proba(&self, input: &ModelInput) -> Option<Vec<f64>> {
        Some(softmax(&self.logits(input)))
    }

    fn predict(&self, input: &ModelInput) -> usize {
        argmax(&self.logits(input))
    }
}

/// Closest-centroid classifier; no probability output
#[derive(Debug)]
struct NearestCentroid {
    centroids: Vec<[f64; NUMERIC_FEATURES]>,
}

impl Classifier for NearestCentroid {
    fn n_classes(&self) -> usize {
        self.centroids.len()
    }

    fn predict_proba(&self, _input: &ModelInput) -> Option<Vec<f64>> {
        None
    }

    fn predict(&self, input: &ModelInput) -> usize {
        let neg_dist: Vec<f64> = self
            .centroids
            .iter()
            .map(|c| {
                -c.iter()
                    .zip(input.numeric.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
            })
            .collect();
        argmax(&neg_dist)
    }
}

/// Numerically stable softmax
///
/// Extreme inputs can push scores out of the finite range. A `+inf` score
/// takes all the mass; if no score is finite the result is uniform. NaN
/// scores get zero mass.
fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::INFINITY {
        let best = argmax(scores);
        return (0..scores.len()).map(|i| if i == best { 1.0 } else { 0.0 }).collect();
    }
    if !max.is_finite() {
        let uniform = 1.0 / scores.len() as f64;
        return vec![uniform; scores.len()];
    }

    let exps: Vec<f64> = scores
        .iter()
        .map(|s| {
            let e = (s - max).exp();
            if e.is_nan() {
                0.0
            } else {
                e
            }
        })
        .collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value, first one on ties
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| {
            if v > bv {
                (i, v)
            } else {
                (bi, bv)
            }
        })
        .0
}

// ============================================================================
// Artifact format
// ============================================================================

#[derive(Debug, Deserialize)]
struct FeatureScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
enum ModelParams {
    GaussianNb {
        theta: Vec<Vec<f64>>,
        var: Vec<Vec<f64>>,
        class_prior: Vec<f64>,
        #[serde(default)]
        season_log_prob: Option<Vec<Vec<f64>>>,
    },
    LinearModel {
        #[serde(alias = "coefficients")]
        weights: Vec<Vec<f64>>,
        #[serde(alias = "intercepts")]
        biases: Vec<f64>,
    },
    NearestCentroid {
        centroids: Vec<Vec<f64>>,
    },
}

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    #[serde(default)]
    model_name: Option<String>,
    classes: Vec<String>,
    #[serde(default)]
    seasons: Vec<String>,
    #[serde(default)]
    default_season: Option<String>,
    #[serde(default)]
    scaler: Option<FeatureScaler>,
    #[serde(flatten)]
    params: ModelParams,
}

fn to_feature_rows(rows: Vec<Vec<f64>>, what: &str) -> Result<Vec<[f64; NUMERIC_FEATURES]>> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            <[f64; NUMERIC_FEATURES]>::try_from(row.as_slice()).map_err(|_| {
                anyhow::anyhow!(
                    "{} row {} has {} values, expected {}",
                    what,
                    i,
                    row.len(),
                    NUMERIC_FEATURES
                )
            })
        })
        .collect()
}

fn ensure_rows(what: &str, got: usize, n_classes: usize) -> Result<()> {
    if got != n_classes {
        anyhow::bail!("{} has {} rows for {} classes", what, got, n_classes);
    }
    Ok(())
}

fn build_classifier(params: ModelParams, n_classes: usize, n_seasons: usize) -> Result<Box<dyn Classifier>> {
    match params {
        ModelParams::GaussianNb { theta, var, class_prior, season_log_prob } => {
            ensure_rows("theta", theta.len(), n_classes)?;
            ensure_rows("var", var.len(), n_classes)?;
            ensure_rows("class_prior", class_prior.len(), n_classes)?;

            let theta = to_feature_rows(theta, "theta")?;
            let var = to_feature_rows(var, "var")?;
            if var.iter().flatten().any(|v| !v.is_finite() || *v <= 0.0) {
                anyhow::bail!("var must be positive and finite");
            }
            if class_prior.iter().any(|p| !p.is_finite() || *p <= 0.0) {
                anyhow::bail!("class_prior must be positive");
            }
            if let Some(table) = &season_log_prob {
                if n_seasons == 0 {
                    anyhow::bail!("season_log_prob given without a season vocabulary");
                }
                ensure_rows("season_log_prob", table.len(), n_classes)?;
                if table.iter().any(|row| row.len() != n_seasons) {
                    anyhow::bail!("season_log_prob rows must have {} values", n_seasons);
                }
            }

            Ok(Box::new(GaussianNb {
                theta,
                var,
                log_prior: class_prior.iter().map(|p| p.ln()).collect(),
                season_log_prob,
            }))
        }
        ModelParams::LinearModel { weights, biases } => {
            ensure_rows("weights", weights.len(), n_classes)?;
            ensure_rows("biases", biases.len(), n_classes)?;
            let width = NUMERIC_FEATURES + n_seasons;
            if let Some(row) = weights.iter().find(|row| row.len() != width) {
                anyhow::bail!("weight rows must have {} values, got {}", width, row.len());
            }
            Ok(Box::new(LinearModel { weights, biases, n_seasons }))
        }
        ModelParams::NearestCentroid { centroids } => {
            ensure_rows("centroids", centroids.len(), n_classes)?;
            Ok(Box::new(NearestCentroid {
                centroids: to_feature_rows(centroids, "centroids")?,
            }))
        }
    }
}

// ============================================================================
// Scorer
// ============================================================================

/// Distribution plus the season value the model actually saw
#[derive(Debug, Clone)]
pub struct Scored {
    pub distribution: ProbabilityDistribution,
    pub season_used: Option<String>,
}

pub struct SuitabilityScorer {
    name: String,
    labels: LabelSet,
    seasons: Vec<String>,
    season_keys: Vec<String>,
    default_season: Option<usize>,
    scaler: Option<([f64; NUMERIC_FEATURES], [f64; NUMERIC_FEATURES])>,
    model: Box<dyn Classifier>,
}

impl fmt::Debug for SuitabilityScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuitabilityScorer")
            .field("name", &self.name)
            .field("labels", &self.labels.len())
            .field("seasons", &self.seasons)
            .finish()
    }
}

impl SuitabilityScorer {
    /// Load a model artifact from disk
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact: {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("Invalid model artifact: {}", path.display()))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let artifact: ModelArtifact =
            serde_json::from_str(json).context("Failed to parse model artifact JSON")?;

        let n_classes = artifact.classes.len();
        let classifier = build_classifier(artifact.params, n_classes, artifact.seasons.len())?;
        let mut scorer = Self::with_classifier(
            artifact.model_name.as_deref().unwrap_or("crop_model"),
            artifact.classes,
            artifact.seasons,
            classifier,
        )?;

        if let Some(default) = artifact.default_season.as_deref() {
            let idx = scorer
                .season_index(default)
                .with_context(|| format!("default_season '{}' not in season vocabulary", default))?;
            scorer.default_season = Some(idx);
        }

        if let Some(scaler) = artifact.scaler {
            let mean = <[f64; NUMERIC_FEATURES]>::try_from(scaler.mean.as_slice())
                .map_err(|_| anyhow::anyhow!("scaler.mean must have {} values", NUMERIC_FEATURES))?;
            let scale = <[f64; NUMERIC_FEATURES]>::try_from(scaler.scale.as_slice())
                .map_err(|_| anyhow::anyhow!("scaler.scale must have {} values", NUMERIC_FEATURES))?;
            if scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
                anyhow::bail!("scaler.scale must be non-zero and finite");
            }
            scorer.scaler = Some((mean, scale));
        }

        Ok(scorer)
    }

    /// Wrap an already-built classifier
    pub fn with_classifier(
        name: &str,
        classes: Vec<String>,
        seasons: Vec<String>,
        model: Box<dyn Classifier>,
    ) -> Result<Self> {
        if classes.is_empty() {
            anyhow::bail!("Model declares no classes");
        }
        if model.n_classes() != classes.len() {
            anyhow::bail!(
                "Classifier has {} classes but {} labels were given",
                model.n_classes(),
                classes.len()
            );
        }

        let mut seen = std::collections::HashSet::new();
        for label in &classes {
            if !seen.insert(normalize_name(label)) {
                anyhow::bail!("Duplicate class label '{}'", label);
            }
        }

        let season_keys: Vec<String> = seasons.iter().map(|s| normalize_name(s)).collect();
        let mut seen = std::collections::HashSet::new();
        for key in &season_keys {
            if key.is_empty() || !seen.insert(key.as_str()) {
                anyhow::bail!("Season vocabulary has an empty or duplicate entry '{}'", key);
            }
        }

        Ok(Self {
            name: name.to_string(),
            labels: LabelSet::new(classes),
            seasons,
            season_keys,
            default_season: None,
            scaler: None,
            model,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Season vocabulary the model was trained on (empty if season-agnostic)
    pub fn seasons(&self) -> &[String] {
        &self.seasons
    }

    fn season_index(&self, season: &str) -> Option<usize> {
        let key = normalize_name(season);
        self.season_keys.iter().position(|k| *k == key)
    }

    /// Map the request season onto the model vocabulary
    ///
    /// Unknown values fail with `UnsupportedCategory`. An absent season uses
    /// the artifact's default season, if any.
    fn resolve_season(&self, season: Option<&str>) -> crate::error::Result<Option<usize>> {
        if self.seasons.is_empty() {
            return Ok(None);
        }
        match season {
            Some(value) => self.season_index(value).map(Some).ok_or_else(|| {
                RecommendError::UnsupportedCategory {
                    field: "season",
                    value: value.to_string(),
                    supported: self.seasons.clone(),
                }
            }),
            None => Ok(self.default_season),
        }
    }

    fn model_input(&self, features: &FeatureVector, season: Option<usize>) -> ModelInput {
        let mut numeric = features.readings().as_array();
        if let Some((mean, scale)) = &self.scaler {
            for j in 0..NUMERIC_FEATURES {
                numeric[j] = (numeric[j] - mean[j]) / scale[j];
            }
        }
        ModelInput { numeric, season }
    }

    /// Probability distribution over [`Self::labels`]
    pub fn score(&self, features: &FeatureVector) -> crate::error::Result<ProbabilityDistribution> {
        self.score_with_season(features).map(|s| s.distribution)
    }

    /// Like [`Self::score`], also reporting the season the model was fed
    pub fn score_with_season(&self, features: &FeatureVector) -> crate::error::Result<Scored> {
        let season = self.resolve_season(features.season())?;
        let input = self.model_input(features, season);

        let distribution = match self.model.predict_proba(&input) {
            Some(probabilities) => ProbabilityDistribution::new(self.labels.clone(), probabilities)?,
            None => ProbabilityDistribution::one_hot(self.labels.clone(), self.model.predict(&input)),
        };

        Ok(Scored {
            distribution,
            season_used: season.map(|i| self.seasons[i].clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::SoilReadings;
    use approx::assert_relative_eq;

    const DEMO_MODEL: &str = include_str!("../data/crop_model.json");

    fn rice_like() -> SoilReadings {
        SoilReadings {
            nitrogen: 80.0,
            phosphorus: 47.0,
            potassium: 40.0,
            temperature: 23.5,
            humidity: 82.0,
            ph: 6.4,
            rainfall: 230.0,
        }
    }

    fn features(season: Option<&str>) -> FeatureVector {
        FeatureVector::new(rice_like(), season, None, None).unwrap()
    }

    fn linear_json(seasons: &str, default_season: &str) -> String {
        format!(
            r#"{{
                "model_type": "linear_model",
                "model_name": "tiny_logreg",
                "classes": ["rice", "maize", "chickpea"],
                "seasons": {seasons},
                "default_season": {default_season},
                "scaler": {{ "mean": [50, 50, 50, 25, 70, 6.5, 100], "scale": [30, 30, 40, 5, 20, 0.7, 60] }},
                "coefficients": [
                    [0.5, 0.0, 0.0, 0.0, 0.8, 0.0, 1.5, 2.0, -1.0],
                    [0.5, 0.0, 0.0, 0.0, 0.2, 0.0, 0.2, 1.0, -0.5],
                    [-0.5, 0.5, 1.0, -1.0, -2.0, 0.5, -0.5, -1.0, 2.0]
                ],
                "intercepts": [0.1, 0.2, -0.1]
            }}"#
        )
    }

    #[test]
    fn test_demo_model_loads_and_scores() {
        let scorer = SuitabilityScorer::from_json_str(DEMO_MODEL).unwrap();
        assert_eq!(scorer.labels().len(), 22);
        assert_eq!(scorer.name(), "crop_gnb_demo");

        let dist = scorer.score(&features(Some("Kharif"))).unwrap();
        assert_eq!(dist.len(), 22);
        assert_relative_eq!(dist.iter().map(|(_, p)| p).sum::<f64>(), 1.0, epsilon = 1e-9);
        assert_eq!(dist.argmax().unwrap().0, "rice");
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let scorer = SuitabilityScorer::from_json_str(DEMO_MODEL).unwrap();
        let fv = features(Some("Rabi"));
        let a = scorer.score(&fv).unwrap();
        let b = scorer.score(&fv).unwrap();
        let bits = |d: &ProbabilityDistribution| d.iter().map(|(_, p)| p.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_unknown_season_is_rejected() {
        let scorer = SuitabilityScorer::from_json_str(DEMO_MODEL).unwrap();
        let err = scorer.score(&features(Some("Monsoon2"))).unwrap_err();
        match err {
            RecommendError::UnsupportedCategory { field, value, supported } => {
                assert_eq!(field, "season");
                assert_eq!(value, "Monsoon2");
                assert!(supported.contains(&"Kharif".to_string()));
                assert_eq!(supported.len(), 6);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_season_matching_is_normalized() {
        let scorer = SuitabilityScorer::from_json_str(DEMO_MODEL).unwrap();
        let scored = scorer.score_with_season(&features(Some("  whole YEAR "))).unwrap();
        assert_eq!(scored.season_used.as_deref(), Some("Whole Year"));
    }

    #[test]
    fn test_linear_model_with_season_one_hot() {
        let scorer = SuitabilityScorer::from_json_str(&linear_json(r#"["Kharif", "Rabi"]"#, "null")).unwrap();

        let kharif = scorer.score(&features(Some("Kharif"))).unwrap();
        let rabi = scorer.score(&features(Some("Rabi"))).unwrap();
        assert_eq!(kharif.argmax().unwrap().0, "rice");
        assert!(rabi.get("chickpea").unwrap() > kharif.get("chickpea").unwrap());

        // No season and no default: season term left out
        let none = scorer.score_with_season(&features(None)).unwrap();
        assert_eq!(none.season_used, None);
        assert_relative_eq!(none.distribution.iter().map(|(_, p)| p).sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_default_season_is_reported() {
        let scorer =
            SuitabilityScorer::from_json_str(&linear_json(r#"["Kharif", "Rabi"]"#, r#""Rabi""#)).unwrap();
        let scored = scorer.score_with_season(&features(None)).unwrap();
        assert_eq!(scored.season_used.as_deref(), Some("Rabi"));
    }

    #[test]
    fn test_default_season_must_be_in_vocabulary() {
        assert!(SuitabilityScorer::from_json_str(&linear_json(r#"["Kharif", "Rabi"]"#, r#""Zaid""#)).is_err());
    }

    #[test]
    fn test_linear_model_dimension_mismatch() {
        // Weights have 9 columns but only one season declared
        assert!(SuitabilityScorer::from_json_str(&linear_json(r#"["Kharif"]"#, "null")).is_err());
    }

    #[test]
    fn test_season_agnostic_model_ignores_season() {
        let json = r#"{
            "model_type": "nearest_centroid",
            "classes": ["rice", "maize", "chickpea"],
            "centroids": [
                [80, 47, 40, 23.7, 82, 6.4, 236],
                [78, 48, 20, 22.4, 65, 6.3, 85],
                [40, 68, 80, 18.9, 17, 7.3, 80]
            ]
        }"#;
        let scorer = SuitabilityScorer::from_json_str(json).unwrap();
        assert!(scorer.seasons().is_empty());
        let scored = scorer.score_with_season(&features(Some("Monsoon2"))).unwrap();
        assert_eq!(scored.season_used, None);
        assert_eq!(scored.distribution.argmax().unwrap(), ("rice", 1.0));
    }

    #[test]
    fn test_label_only_model_degrades_to_one_hot() {
        let json = r#"{
            "model_type": "nearest_centroid",
            "classes": ["rice", "maize", "chickpea"],
            "centroids": [
                [80, 47, 40, 23.7, 82, 6.4, 236],
                [78, 48, 20, 22.4, 65, 6.3, 85],
                [40, 68, 80, 18.9, 17, 7.3, 80]
            ]
        }"#;
        let scorer = SuitabilityScorer::from_json_str(json).unwrap();
        let dist = scorer.score(&features(None)).unwrap();
        let probs: Vec<f64> = dist.iter().map(|(_, p)| p).collect();
        assert_eq!(probs, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_artifact_validation() {
        let duplicate = r#"{
            "model_type": "nearest_centroid",
            "classes": ["rice", "Rice "],
            "centroids": [[1,1,1,1,1,1,1], [2,2,2,2,2,2,2]]
        }"#;
        assert!(SuitabilityScorer::from_json_str(duplicate).is_err());

        let empty = r#"{ "model_type": "nearest_centroid", "classes": [], "centroids": [] }"#;
        assert!(SuitabilityScorer::from_json_str(empty).is_err());

        let short_row = r#"{
            "model_type": "gaussian_nb",
            "classes": ["rice"],
            "theta": [[1,1,1]],
            "var": [[1,1,1,1,1,1,1]],
            "class_prior": [1.0]
        }"#;
        assert!(SuitabilityScorer::from_json_str(short_row).is_err());

        let zero_var = r#"{
            "model_type": "gaussian_nb",
            "classes": ["rice"],
            "theta": [[1,1,1,1,1,1,1]],
            "var": [[1,1,1,0,1,1,1]],
            "class_prior": [1.0]
        }"#;
        assert!(SuitabilityScorer::from_json_str(zero_var).is_err());

        assert!(SuitabilityScorer::from_json_str(r#"{ "model_type": "random_forest", "classes": ["rice"] }"#).is_err());
    }

    #[test]
    fn test_gaussian_nb_season_log_prob() {
        let json = r#"{
            "model_type": "gaussian_nb",
            "classes": ["rice", "chickpea"],
            "seasons": ["Kharif", "Rabi"],
            "theta": [[60,50,50,22,70,6.5,150], [60,50,50,22,70,6.5,150]],
            "var": [[100,100,100,10,50,0.3,900], [100,100,100,10,50,0.3,900]],
            "class_prior": [0.5, 0.5],
            "season_log_prob": [[-0.1, -2.3], [-2.3, -0.1]]
        }"#;
        let scorer = SuitabilityScorer::from_json_str(json).unwrap();
        let kharif = scorer.score(&features(Some("Kharif"))).unwrap();
        let rabi = scorer.score(&features(Some("Rabi"))).unwrap();
        assert_eq!(kharif.argmax().unwrap().0, "rice");
        assert_eq!(rabi.argmax().unwrap().0, "chickpea");
        assert_relative_eq!(kharif.get("rice").unwrap(), rabi.get("chickpea").unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn test_distribution_validation() {
        assert!(ProbabilityDistribution::from_pairs(&[("rice", 0.6), ("maize", 0.3)]).is_err());
        assert!(ProbabilityDistribution::from_pairs(&[("rice", 1.2), ("maize", -0.2)]).is_err());
        assert!(ProbabilityDistribution::from_pairs(&[("rice", 0.6), ("maize", 0.4)]).is_ok());
        assert!(ProbabilityDistribution::from_pairs(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_softmax_and_argmax() {
        let p = softmax(&[1000.0, 1000.0]);
        assert_relative_eq!(p[0], 0.5, epsilon = 1e-12);
        assert_eq!(argmax(&[0.2, 0.5, 0.5]), 1);
    }

    #[test]
    fn test_softmax_non_finite_scores() {
        assert_eq!(softmax(&[1.0, f64::INFINITY, 3.0]), vec![0.0, 1.0, 0.0]);
        assert_eq!(softmax(&[f64::NEG_INFINITY, f64::NEG_INFINITY]), vec![0.5, 0.5]);

        let p = softmax(&[0.0, f64::NAN, 0.0]);
        assert_eq!(p, vec![0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_extreme_readings_still_score() {
        let scorer = SuitabilityScorer::from_json_str(DEMO_MODEL).unwrap();
        let mut readings = rice_like();
        readings.nitrogen = 1e200;
        let fv = FeatureVector::new(readings, None, None, None).unwrap();

        let dist = scorer.score(&fv).unwrap();
        assert_eq!(dist.len(), 22);
        assert_relative_eq!(dist.iter().map(|(_, p)| p).sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(dist.iter().all(|(_, p)| p.is_finite()));
    }
}
