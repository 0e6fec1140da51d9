//! Soil/climate feature vector
//!
//! Immutable per-request input to the suitability scorer and the ranker.

use serde::{Deserialize, Serialize};

use crate::error::{RecommendError, Result};
use crate::utils::normalization::normalize_optional;

/// Number of numeric model inputs
pub const NUMERIC_FEATURES: usize = 7;

/// Numeric feature order expected by every model artifact
pub const FEATURE_NAMES: [&str; NUMERIC_FEATURES] = [
    "nitrogen",
    "phosphorus",
    "potassium",
    "temperature",
    "humidity",
    "ph",
    "rainfall",
];

/// Soil/climate readings for a single field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilReadings {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    /// °C
    pub temperature: f64,
    /// Relative humidity, %
    pub humidity: f64,
    pub ph: f64,
    /// mm
    pub rainfall: f64,
}

impl SoilReadings {
    /// Values in [`FEATURE_NAMES`] order
    pub fn as_array(&self) -> [f64; NUMERIC_FEATURES] {
        [
            self.nitrogen,
            self.phosphorus,
            self.potassium,
            self.temperature,
            self.humidity,
            self.ph,
            self.rainfall,
        ]
    }

    /// Range checks applied at the request boundary
    pub fn validate(&self) -> Result<()> {
        for (name, value) in FEATURE_NAMES.iter().zip(self.as_array()) {
            if !value.is_finite() {
                return Err(RecommendError::InvalidInput(format!(
                    "{} must be a finite number",
                    name
                )));
            }
        }

        let non_negative = [
            ("nitrogen", self.nitrogen),
            ("phosphorus", self.phosphorus),
            ("potassium", self.potassium),
            ("rainfall", self.rainfall),
        ];
        for (name, value) in non_negative {
            if value < 0.0 {
                return Err(RecommendError::InvalidInput(format!(
                    "{} must not be negative (got {})",
                    name, value
                )));
            }
        }

        if !(0.0..=100.0).contains(&self.humidity) {
            return Err(RecommendError::InvalidInput(format!(
                "humidity must be between 0 and 100 (got {})",
                self.humidity
            )));
        }
        if !(0.0..=14.0).contains(&self.ph) {
            return Err(RecommendError::InvalidInput(format!(
                "ph must be between 0 and 14 (got {})",
                self.ph
            )));
        }

        Ok(())
    }
}

/// Primary region (state) with an optional sub-region (district)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub primary: String,
    pub secondary: Option<String>,
}

/// Model + ranker input for one request
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    readings: SoilReadings,
    season: Option<String>,
    region: Option<Region>,
}

impl FeatureVector {
    /// Build and validate a feature vector
    ///
    /// Blank season/region strings count as absent. A sub-region without a
    /// primary region is dropped.
    pub fn new(
        readings: SoilReadings,
        season: Option<&str>,
        region_primary: Option<&str>,
        region_secondary: Option<&str>,
    ) -> Result<Self> {
        readings.validate()?;

        let trimmed = |s: Option<&str>| {
            normalize_optional(s)?;
            s.map(|v| v.trim().to_string())
        };

        let region = trimmed(region_primary).map(|primary| Region {
            primary,
            secondary: trimmed(region_secondary),
        });

        Ok(Self {
            readings,
            season: trimmed(season),
            region,
        })
    }

    pub fn readings(&self) -> &SoilReadings {
        &self.readings
    }

    /// Season as supplied (trimmed, original case)
    pub fn season(&self) -> Option<&str> {
        self.season.as_deref()
    }

    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }
}
