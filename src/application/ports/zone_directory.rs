//! Zone directory port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::zone::Zone;

/// Zone directory errors
#[derive(Debug, Clone, Error)]
pub enum ZoneDirectoryError {
    #[error("Zone directory unreachable: {0}")]
    Unreachable(String),

    #[error("Zone directory rejected the request: {0}")]
    Rejected(String),

    #[error("Failed to parse zone directory response: {0}")]
    ParseError(String),
}

/// Port for the registry of proximity zones.
///
/// Polled on a coarse cadence, independent of the location sampling
/// interval. The returned set may differ arbitrarily between calls; the
/// engine tolerates zones appearing, disappearing, and changing radius.
#[async_trait]
pub trait ZoneDirectory: Send + Sync {
    async fn list_active_zones(&self, site_id: &str) -> Result<Vec<Zone>, ZoneDirectoryError>;
}
