//! HTTP session backend adapter

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::ports::{AudioArtifact, BackendError, SessionBackend, TelemetryEvent};
use crate::domain::geo::Coordinate;
use crate::domain::session::{ArtifactRef, SessionId, TerminationReason};
use crate::domain::zone::ZoneId;

// Request types for the session API

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    zone_id: &'a str,
    latitude: f64,
    longitude: f64,
    accuracy_m: f64,
    captured_at_ms: u64,
}

#[derive(Debug, Serialize)]
struct UpdateSessionRequest<'a> {
    ended_at_ms: u64,
    reason: TerminationReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact_ref: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct StoreArtifactRequest {
    mime_type: String,
    sample_rate: u32,
    duration_ms: u64,
    /// Base64-encoded FLAC bytes
    data: String,
}

// Response types for the session API

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StoreArtifactResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

/// Session backend over HTTP/JSON
pub struct HttpSessionBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSessionBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn error_from_response(response: reqwest::Response) -> BackendError {
        let status = response.status();
        let message = match response.json::<ApiError>().await {
            Ok(e) => e.message.unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };
        BackendError::Rejected(format!("{status}: {message}"))
    }
}

#[async_trait]
impl SessionBackend for HttpSessionBackend {
    async fn create_session(
        &self,
        zone_id: &ZoneId,
        location: &Coordinate,
    ) -> Result<SessionId, BackendError> {
        let body = CreateSessionRequest {
            zone_id: zone_id.as_str(),
            latitude: location.latitude,
            longitude: location.longitude,
            accuracy_m: location.accuracy_m,
            captured_at_ms: location.captured_at_ms,
        };

        let response = self
            .client
            .post(self.url("/sessions"))
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let created: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))?;

        Ok(SessionId::new(created.id))
    }

    async fn update_session(
        &self,
        id: &SessionId,
        ended_at_ms: u64,
        reason: TerminationReason,
        artifact: Option<&ArtifactRef>,
    ) -> Result<(), BackendError> {
        let body = UpdateSessionRequest {
            ended_at_ms,
            reason,
            artifact_ref: artifact.map(|a| a.0.as_str()),
        };

        let response = self
            .client
            .patch(self.url(&format!("/sessions/{}", id)))
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        Ok(())
    }

    async fn store_artifact(&self, artifact: &AudioArtifact) -> Result<ArtifactRef, BackendError> {
        use base64::Engine;

        let body = StoreArtifactRequest {
            mime_type: artifact.mime_type().to_string(),
            sample_rate: artifact.sample_rate,
            duration_ms: artifact.duration_ms,
            data: base64::engine::general_purpose::STANDARD.encode(&artifact.data),
        };

        let response = self
            .client
            .post(self.url("/artifacts"))
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let stored: StoreArtifactResponse = response
            .json()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))?;

        Ok(ArtifactRef::new(stored.id))
    }

    fn post_telemetry(&self, event: TelemetryEvent) {
        // Fire-and-forget: losing an event is fine, blocking the engine
        // loop is not
        let client = self.client.clone();
        let url = self.url("/telemetry");
        tokio::spawn(async move {
            let _ = client.post(url).json(&event).send().await;
        });
    }
}
