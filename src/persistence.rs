//! Prediction log
//!
//! Append-only record of every served recommendation, one JSON object per
//! line. Writing is fire-and-forget: the request path hands a record to the
//! sink and returns; failures are logged and dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::service::{CropRecommendation, CropRequest};

pub const SERVICE_NAME: &str = "Crop Recommendation";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub service: String,
    pub inputs: CropRequest,
    pub prediction: CropRecommendation,
    pub timestamp: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn new(inputs: CropRequest, prediction: CropRecommendation) -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            inputs,
            prediction,
            timestamp: Utc::now(),
        }
    }
}

/// Destination for prediction records. Must never block or fail the caller.
pub trait PredictionSink: Send + Sync {
    fn submit(&self, record: PredictionRecord);
}

/// Discards every record (logging disabled)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl PredictionSink for NoopSink {
    fn submit(&self, _record: PredictionRecord) {}
}

#[cfg(feature = "api")]
pub use jsonl::JsonlPredictionLog;

#[cfg(feature = "api")]
mod jsonl {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use tokio::io::AsyncWriteExt;
    use tokio::sync::Mutex;

    use super::{PredictionRecord, PredictionSink};

    /// JSON-lines file written from detached tokio tasks
    ///
    /// The mutex serialises appends so concurrent requests never interleave
    /// partial lines.
    #[derive(Debug, Clone)]
    pub struct JsonlPredictionLog {
        path: Arc<PathBuf>,
        lock: Arc<Mutex<()>>,
    }

    impl JsonlPredictionLog {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self {
                path: Arc::new(path.into()),
                lock: Arc::new(Mutex::new(())),
            }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        /// Append one record and wait for the write to finish
        pub async fn append(&self, record: &PredictionRecord) -> Result<()> {
            let mut line = serde_json::to_string(record).context("Failed to serialize prediction record")?;
            line.push('\n');

            let _guard = self.lock.lock().await;
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.path.as_path())
                .await
                .with_context(|| format!("Failed to open prediction log: {}", self.path.display()))?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
            Ok(())
        }
    }

    impl PredictionSink for JsonlPredictionLog {
        fn submit(&self, record: PredictionRecord) {
            let Ok(handle) = tokio::runtime::Handle::try_current() else {
                tracing::warn!("No async runtime; prediction record dropped");
                return;
            };
            let log = self.clone();
            handle.spawn(async move {
                if let Err(e) = log.append(&record).await {
                    tracing::warn!("Failed to persist prediction ({:#})", e);
                }
            });
        }
    }
}
