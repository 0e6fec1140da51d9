//! Error taxonomy for the recommendation pipeline
//!
//! DataUnavailable is recovered inside the pipeline (probability-only
//! fallback) and never reaches an HTTP client. Persistence failures are handled by
//! the prediction log itself and have no variant here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecommendError {
    /// A categorical input the model was never trained on
    #[error("Unsupported {field} '{value}'. Supported values: {}", supported.join(", "))]
    UnsupportedCategory {
        field: &'static str,
        value: String,
        supported: Vec<String>,
    },

    /// Scorer vocabulary and historical filter produced nothing to rank
    #[error("No viable crop candidate: {detail}")]
    NoViableCandidate { detail: String },

    /// Request failed boundary validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Historical dataset missing or unreadable
    #[error("Historical data unavailable: {0}")]
    DataUnavailable(String),

    /// Model artifact inconsistent with the request
    #[error("Model error: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, RecommendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_category_message_lists_supported_values() {
        let err = RecommendError::UnsupportedCategory {
            field: "season",
            value: "Monsoon2".to_string(),
            supported: vec!["Kharif".to_string(), "Rabi".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unsupported season 'Monsoon2'. Supported values: Kharif, Rabi"
        );
    }
}
