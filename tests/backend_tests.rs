//! HTTP adapter integration tests
//!
//! Exercises the session backend and zone directory adapters against a
//! wiremock server.

use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zone_recorder::application::ports::{
    AudioArtifact, BackendError, SessionBackend, TelemetryEvent, ZoneDirectory,
    ZoneDirectoryError,
};
use zone_recorder::domain::geo::Coordinate;
use zone_recorder::domain::session::{ArtifactRef, SessionId, TerminationReason};
use zone_recorder::domain::zone::ZoneId;
use zone_recorder::infrastructure::{HttpSessionBackend, HttpZoneDirectory};

fn here() -> Coordinate {
    Coordinate::new(52.52, 13.405, 5.0, 1_000).unwrap()
}

#[tokio::test]
async fn create_session_posts_zone_and_location() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .and(body_string_contains("showroom-1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "sess-77"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpSessionBackend::new(server.uri());
    let id = backend
        .create_session(&ZoneId::new("showroom-1"), &here())
        .await
        .unwrap();
    assert_eq!(id, SessionId::new("sess-77"));
}

#[tokio::test]
async fn create_session_maps_server_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "message": "unknown zone"
        })))
        .mount(&server)
        .await;

    let backend = HttpSessionBackend::new(server.uri());
    let err = backend
        .create_session(&ZoneId::new("nope"), &here())
        .await
        .unwrap_err();
    match err {
        BackendError::Rejected(message) => assert!(message.contains("unknown zone")),
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn create_session_maps_connection_failure() {
    // Port 9 is the discard service; nothing listens there
    let backend = HttpSessionBackend::new("http://127.0.0.1:9");
    let err = backend
        .create_session(&ZoneId::new("a"), &here())
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Unreachable(_)));
}

#[tokio::test]
async fn update_session_patches_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/sessions/sess-9"))
        .and(body_string_contains("exited_zone"))
        .and(body_string_contains("artifact-3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpSessionBackend::new(server.uri());
    backend
        .update_session(
            &SessionId::new("sess-9"),
            2_000,
            TerminationReason::ExitedZone,
            Some(&ArtifactRef::new("artifact-3")),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn store_artifact_uploads_base64_flac() {
    let server = MockServer::start().await;
    // [1, 2, 3] encodes to "AQID"
    Mock::given(method("POST"))
        .and(path("/artifacts"))
        .and(body_string_contains("AQID"))
        .and(body_string_contains("audio/flac"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "artifact-42"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpSessionBackend::new(server.uri());
    let artifact = AudioArtifact {
        data: vec![1, 2, 3],
        sample_rate: 16_000,
        duration_ms: 1_500,
    };
    let reference = backend.store_artifact(&artifact).await.unwrap();
    assert_eq!(reference, ArtifactRef::new("artifact-42"));
}

#[tokio::test]
async fn telemetry_is_posted_in_the_background() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/telemetry"))
        .and(body_string_contains("sample_discarded"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let backend = HttpSessionBackend::new(server.uri());
    backend.post_telemetry(TelemetryEvent::SampleDiscarded {
        reason: "accuracy_exceeds_radius".to_string(),
        at_ms: 1_000,
    });

    // The call is fire-and-forget; give the spawned request a moment
    let mut received = 0;
    for _ in 0..50 {
        received = server.received_requests().await.map_or(0, |r| r.len());
        if received > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(received, 1);
}

#[tokio::test]
async fn zone_directory_lists_zones_for_site() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("site_id", "site-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": "showroom-1",
                "name": "Showroom",
                "type": "showroom",
                "latitude": 52.52,
                "longitude": 13.405,
                "radius_m": 50.0,
                "active": true
            },
            {
                "id": "lot-2",
                "name": "Back lot",
                "type": "lot",
                "latitude": 52.521,
                "longitude": 13.406,
                "radius_m": 80.0,
                "active": false
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let directory = HttpZoneDirectory::new(server.uri());
    let zones = directory.list_active_zones("site-3").await.unwrap();

    assert_eq!(zones.len(), 2);
    assert_eq!(zones[0].id.as_str(), "showroom-1");
    assert_eq!(zones[0].radius_m, 50.0);
    assert!(!zones[1].active);
}

#[tokio::test]
async fn zone_directory_rejects_invalid_coordinates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": "broken",
                "name": "Broken",
                "type": "lot",
                "latitude": 200.0,
                "longitude": 0.0,
                "radius_m": 50.0,
                "active": true
            }
        ])))
        .mount(&server)
        .await;

    let directory = HttpZoneDirectory::new(server.uri());
    let err = directory.list_active_zones("site-3").await.unwrap_err();
    assert!(matches!(err, ZoneDirectoryError::ParseError(_)));
}

#[tokio::test]
async fn zone_directory_maps_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let directory = HttpZoneDirectory::new(server.uri());
    let err = directory.list_active_zones("site-3").await.unwrap_err();
    assert!(matches!(err, ZoneDirectoryError::Rejected(_)));
}
