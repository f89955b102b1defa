//! Simulation runner
//!
//! Replays a recorded location trace through the full engine with a no-op
//! capture device and an in-memory backend, printing every state change.
//! Useful for validating zone geometry and margins before a site visit.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use serde::Deserialize;

use crate::application::engine::{Engine, EngineEvent};
use crate::application::ports::LocationStream;
use crate::domain::config::EngineConfig;
use crate::domain::geo::Coordinate;
use crate::domain::zone::{Zone, ZoneId};
use crate::infrastructure::{
    ConsoleNotifier, MemoryBackend, MemorySpool, NoopAudioCue, NullCapture, ReplayLocationStream,
};

use super::app::{EXIT_ERROR, EXIT_SUCCESS};
use super::presenter::Presenter;

/// Zone file entry, matching the directory wire shape
#[derive(Debug, Deserialize)]
struct ZoneFileEntry {
    id: String,
    name: String,
    #[serde(rename = "type", default = "default_kind")]
    kind: String,
    latitude: f64,
    longitude: f64,
    radius_m: f64,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_kind() -> String {
    "zone".to_string()
}

fn default_active() -> bool {
    true
}

/// Run the simulation
pub async fn run_simulation(
    trace_path: &Path,
    zones_path: &Path,
    config: EngineConfig,
    step_delay_ms: u64,
) -> ExitCode {
    let presenter = Presenter::new();

    let zones = match load_zones(zones_path).await {
        Ok(z) => z,
        Err(e) => {
            presenter.error(&e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let mut stream = match ReplayLocationStream::open(trace_path).await {
        Ok(s) => s.with_step_delay_ms(step_delay_ms),
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    presenter.info(&format!(
        "Replaying {} samples against {} zones",
        stream.len(),
        zones.len()
    ));

    let backend = Arc::new(MemoryBackend::new());
    let mut engine = Engine::new(
        NullCapture::new(),
        Arc::clone(&backend),
        ConsoleNotifier::new(),
        NoopAudioCue::new(),
        MemorySpool::new(),
        config,
    );

    engine.handle_event(EngineEvent::ZonesRefreshed(zones)).await;

    let mut last_state = engine.current_status().state;
    while let Some(result) = stream.next_sample().await {
        let event = match result {
            Ok(sample) => EngineEvent::Sample(sample),
            Err(e) => EngineEvent::LocationFailed(e),
        };
        engine.handle_event(event).await;

        let status = engine.current_status();
        if status.state != last_state {
            presenter.output(&format!(
                "{} -> {}  (sample at {} ms)",
                last_state,
                status.state,
                status.last_sample_at_ms.unwrap_or(0)
            ));
            last_state = status.state;
        }
    }

    // Wind down anything still open at end of trace
    engine.handle_event(EngineEvent::Shutdown).await;

    let created = backend.created();
    let updated = backend.updated();
    presenter.success(&format!(
        "Trace complete: {} sessions created, {} closed",
        created.len(),
        updated.len()
    ));
    for session in &updated {
        presenter.key_value(
            session.id.as_str(),
            &format!(
                "reason={} artifact={}",
                session.reason,
                session
                    .artifact
                    .as_ref()
                    .map(|a| a.0.as_str())
                    .unwrap_or("(none)")
            ),
        );
    }

    ExitCode::from(EXIT_SUCCESS)
}

async fn load_zones(path: &Path) -> Result<Vec<Zone>, String> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("Failed to read zones file: {e}"))?;
    let entries: Vec<ZoneFileEntry> =
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse zones file: {e}"))?;

    entries
        .into_iter()
        .map(|entry| {
            let center = Coordinate::fixed(entry.latitude, entry.longitude)
                .map_err(|e| format!("Zone {}: {e}", entry.id))?;
            Ok(Zone {
                id: ZoneId::new(entry.id),
                name: entry.name,
                kind: entry.kind,
                center,
                radius_m: entry.radius_m,
                active: entry.active,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_zone_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones.json");
        tokio::fs::write(
            &path,
            r#"[{"id":"showroom-1","name":"Showroom","type":"showroom",
                "latitude":52.52,"longitude":13.405,"radius_m":50.0,"active":true}]"#,
        )
        .await
        .unwrap();

        let zones = load_zones(&path).await.unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].id.as_str(), "showroom-1");
        assert!(zones[0].active);
    }

    #[tokio::test]
    async fn zone_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones.json");
        tokio::fs::write(
            &path,
            r#"[{"id":"a","name":"A","latitude":0.0,"longitude":0.0,"radius_m":30.0}]"#,
        )
        .await
        .unwrap();

        let zones = load_zones(&path).await.unwrap();
        assert!(zones[0].active);
        assert_eq!(zones[0].kind, "zone");
    }

    #[tokio::test]
    async fn invalid_zone_coordinates_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones.json");
        tokio::fs::write(
            &path,
            r#"[{"id":"a","name":"A","latitude":123.0,"longitude":0.0,"radius_m":30.0}]"#,
        )
        .await
        .unwrap();

        assert!(load_zones(&path).await.is_err());
    }
}
