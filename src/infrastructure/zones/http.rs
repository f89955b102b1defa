//! HTTP zone directory adapter

use async_trait::async_trait;
use serde::Deserialize;

use crate::application::ports::{ZoneDirectory, ZoneDirectoryError};
use crate::domain::geo::Coordinate;
use crate::domain::zone::{Zone, ZoneId};

/// Wire shape of one zone from the directory service
#[derive(Debug, Deserialize)]
struct ZoneDto {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    latitude: f64,
    longitude: f64,
    radius_m: f64,
    active: bool,
}

impl ZoneDto {
    fn into_zone(self) -> Result<Zone, ZoneDirectoryError> {
        let center = Coordinate::fixed(self.latitude, self.longitude)
            .map_err(|e| ZoneDirectoryError::ParseError(e.to_string()))?;
        Ok(Zone {
            id: ZoneId::new(self.id),
            name: self.name,
            kind: self.kind,
            center,
            radius_m: self.radius_m,
            active: self.active,
        })
    }
}

/// Zone directory over HTTP/JSON
pub struct HttpZoneDirectory {
    base_url: String,
    client: reqwest::Client,
}

impl HttpZoneDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ZoneDirectory for HttpZoneDirectory {
    async fn list_active_zones(&self, site_id: &str) -> Result<Vec<Zone>, ZoneDirectoryError> {
        let response = self
            .client
            .get(format!("{}/zones", self.base_url))
            .query(&[("site_id", site_id)])
            .send()
            .await
            .map_err(|e| ZoneDirectoryError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ZoneDirectoryError::Rejected(response.status().to_string()));
        }

        let dtos: Vec<ZoneDto> = response
            .json()
            .await
            .map_err(|e| ZoneDirectoryError::ParseError(e.to_string()))?;

        dtos.into_iter().map(ZoneDto::into_zone).collect()
    }
}
