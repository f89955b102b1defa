//! Location stream port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::geo::Coordinate;

/// Location stream errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// Fatal: the engine disables itself and reports `no_permission`
    #[error("Location permission denied")]
    PermissionDenied,

    /// Transient: no fix right now, sampling continues
    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),

    /// Transient: the source did not answer in time
    #[error("Location request timed out")]
    Timeout,
}

/// Port for a periodic position source.
///
/// Yields samples or tagged errors until the source is exhausted (`None`),
/// which only happens for finite sources like trace replay.
#[async_trait]
pub trait LocationStream: Send + Sync {
    async fn next_sample(&mut self) -> Option<Result<Coordinate, LocationError>>;
}
