//! Environment-driven configuration
//!
//! Read once at startup. Unparseable values fall back to the default with a
//! warning rather than aborting the server.

use std::path::PathBuf;
use std::str::FromStr;

use crate::ranker::{RankerConfig, DEFAULT_EMPHASIS_EXPONENT, DEFAULT_SHORTLIST_LEN};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MODEL_PATH: &str = "data/crop_model.json";
pub const DEFAULT_HISTORY_CSV: &str = "data/crop_production_sample.csv";
pub const DEFAULT_PREDICTION_LOG: &str = "prediction_log.jsonl";

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub port: u16,
    pub model_path: PathBuf,
    pub history_csv: PathBuf,
    /// `None` uses the built-in alias table
    pub alias_table: Option<PathBuf>,
    /// `None` disables the prediction log
    pub prediction_log: Option<PathBuf>,
    pub shortlist_len: usize,
    pub confidence_exponent: f64,
    pub include_whole_year: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            history_csv: PathBuf::from(DEFAULT_HISTORY_CSV),
            alias_table: None,
            prediction_log: Some(PathBuf::from(DEFAULT_PREDICTION_LOG)),
            shortlist_len: DEFAULT_SHORTLIST_LEN,
            confidence_exponent: DEFAULT_EMPHASIS_EXPONENT,
            include_whole_year: false,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in
    /// production, a map in tests)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let shortlist_len = parse_or(&lookup, "SHORTLIST_LEN", defaults.shortlist_len);
        let shortlist_len = if shortlist_len == 0 {
            tracing::warn!("SHORTLIST_LEN must be at least 1, using {}", DEFAULT_SHORTLIST_LEN);
            DEFAULT_SHORTLIST_LEN
        } else {
            shortlist_len
        };

        let confidence_exponent = parse_or(&lookup, "CONFIDENCE_EXPONENT", defaults.confidence_exponent);
        let confidence_exponent = if confidence_exponent.is_finite() && confidence_exponent > 0.0 {
            confidence_exponent
        } else {
            tracing::warn!(
                "CONFIDENCE_EXPONENT must be positive, using {}",
                DEFAULT_EMPHASIS_EXPONENT
            );
            DEFAULT_EMPHASIS_EXPONENT
        };

        Self {
            port: parse_or(&lookup, "PORT", defaults.port),
            model_path: lookup("MODEL_PATH").map(PathBuf::from).unwrap_or(defaults.model_path),
            history_csv: lookup("HISTORY_CSV").map(PathBuf::from).unwrap_or(defaults.history_csv),
            alias_table: lookup("ALIAS_TABLE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            prediction_log: match lookup("PREDICTION_LOG") {
                Some(v) if v.trim().is_empty() => None,
                Some(v) => Some(PathBuf::from(v)),
                None => defaults.prediction_log,
            },
            shortlist_len,
            confidence_exponent,
            include_whole_year: parse_bool_or(&lookup, "INCLUDE_WHOLE_YEAR", defaults.include_whole_year),
        }
    }

    pub fn ranker_config(&self) -> RankerConfig {
        RankerConfig {
            shortlist_len: self.shortlist_len,
            emphasis_exponent: self.confidence_exponent,
        }
    }

    /// Log the effective configuration
    pub fn log(&self) {
        tracing::info!("Configuration:");
        tracing::info!("  PORT: {}", self.port);
        tracing::info!("  MODEL_PATH: {}", self.model_path.display());
        tracing::info!("  HISTORY_CSV: {}", self.history_csv.display());
        match &self.alias_table {
            Some(path) => tracing::info!("  ALIAS_TABLE: {}", path.display()),
            None => tracing::info!("  ALIAS_TABLE: (built-in)"),
        }
        match &self.prediction_log {
            Some(path) => tracing::info!("  PREDICTION_LOG: {}", path.display()),
            None => tracing::info!("  PREDICTION_LOG: (disabled)"),
        }
        tracing::info!("  SHORTLIST_LEN: {}", self.shortlist_len);
        tracing::info!("  CONFIDENCE_EXPONENT: {}", self.confidence_exponent);
        tracing::info!("  INCLUDE_WHOLE_YEAR: {}", self.include_whole_year);
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {}='{}', using default {}", key, raw, default);
            default
        }),
        None => default,
    }
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        Some(v) => {
            tracing::warn!("Invalid {}='{}', using default {}", key, v, default);
            default
        }
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn config(vars: &[(&str, &str)]) -> ServiceConfig {
        let map: FxHashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg, ServiceConfig::default());
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.prediction_log, Some(PathBuf::from("prediction_log.jsonl")));
        assert_eq!(cfg.ranker_config().shortlist_len, 4);
        // Perennial records are opt-in
        assert!(!cfg.include_whole_year);
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("PORT", "9100"),
            ("MODEL_PATH", "/models/gnb.json"),
            ("ALIAS_TABLE", "/etc/aliases.json"),
            ("SHORTLIST_LEN", "6"),
            ("CONFIDENCE_EXPONENT", "0.5"),
            ("INCLUDE_WHOLE_YEAR", "on"),
        ]);
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.model_path, PathBuf::from("/models/gnb.json"));
        assert_eq!(cfg.alias_table, Some(PathBuf::from("/etc/aliases.json")));
        assert_eq!(cfg.shortlist_len, 6);
        assert_eq!(cfg.confidence_exponent, 0.5);
        assert!(cfg.include_whole_year);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let cfg = config(&[
            ("PORT", "eighty"),
            ("SHORTLIST_LEN", "0"),
            ("CONFIDENCE_EXPONENT", "-1"),
            ("INCLUDE_WHOLE_YEAR", "maybe"),
        ]);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.shortlist_len, DEFAULT_SHORTLIST_LEN);
        assert_eq!(cfg.confidence_exponent, DEFAULT_EMPHASIS_EXPONENT);
        assert!(!cfg.include_whole_year);
    }

    #[test]
    fn test_empty_prediction_log_disables() {
        assert_eq!(config(&[("PREDICTION_LOG", "")]).prediction_log, None);
    }
}
