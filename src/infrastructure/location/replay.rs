//! Trace replay location stream
//!
//! Plays a JSON-lines file of position samples, used by simulation mode
//! and tests. Each line is either a sample:
//!
//!   {"latitude":52.52,"longitude":13.405,"accuracy_m":5.0,"at_ms":1000}
//!
//! or a tagged error:
//!
//!   {"error":"timeout"}

use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::{sleep, Duration};

use crate::application::ports::{LocationError, LocationStream};
use crate::domain::geo::Coordinate;

#[derive(Debug, Deserialize)]
struct TraceRecord {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default = "default_accuracy")]
    accuracy_m: f64,
    at_ms: Option<u64>,
    error: Option<String>,
}

fn default_accuracy() -> f64 {
    5.0
}

/// Location stream that replays a recorded trace
pub struct ReplayLocationStream {
    records: VecDeque<Result<Coordinate, LocationError>>,
    /// Optional pacing between samples
    step_delay_ms: u64,
}

impl ReplayLocationStream {
    /// Load a trace file. Malformed lines fail the load rather than being
    /// skipped silently.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| ReplayError::ReadFailed(e.to_string()))?;
        Self::parse(&content)
    }

    /// Parse trace content directly
    pub fn parse(content: &str) -> Result<Self, ReplayError> {
        let mut records = VecDeque::new();
        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: TraceRecord = serde_json::from_str(line)
                .map_err(|e| ReplayError::ParseFailed(number + 1, e.to_string()))?;
            records.push_back(Self::resolve(record, number + 1)?);
        }
        Ok(Self {
            records,
            step_delay_ms: 0,
        })
    }

    /// Pace the replay, sleeping between samples
    pub fn with_step_delay_ms(mut self, delay_ms: u64) -> Self {
        self.step_delay_ms = delay_ms;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn resolve(
        record: TraceRecord,
        line: usize,
    ) -> Result<Result<Coordinate, LocationError>, ReplayError> {
        if let Some(error) = record.error {
            let mapped = match error.as_str() {
                "permission_denied" => LocationError::PermissionDenied,
                "position_unavailable" => {
                    LocationError::PositionUnavailable("from trace".into())
                }
                "timeout" => LocationError::Timeout,
                other => return Err(ReplayError::ParseFailed(line, format!("unknown error tag: {other}"))),
            };
            return Ok(Err(mapped));
        }

        let (Some(lat), Some(lon), Some(at_ms)) = (record.latitude, record.longitude, record.at_ms)
        else {
            return Err(ReplayError::ParseFailed(
                line,
                "sample needs latitude, longitude and at_ms".into(),
            ));
        };
        match Coordinate::new(lat, lon, record.accuracy_m, at_ms) {
            Ok(c) => Ok(Ok(c)),
            Err(e) => Ok(Err(LocationError::PositionUnavailable(e.to_string()))),
        }
    }
}

/// Trace loading errors
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Failed to read trace file: {0}")]
    ReadFailed(String),

    #[error("Failed to parse trace line {0}: {1}")]
    ParseFailed(usize, String),
}

#[async_trait]
impl LocationStream for ReplayLocationStream {
    async fn next_sample(&mut self) -> Option<Result<Coordinate, LocationError>> {
        let next = self.records.pop_front()?;
        if self.step_delay_ms > 0 {
            sleep(Duration::from_millis(self.step_delay_ms)).await;
        }
        Some(next)
    }
}
