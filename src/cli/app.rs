//! Engine daemon runner

use std::process::ExitCode;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::application::engine::{Engine, EngineEvent};
use crate::application::ports::{LocationError, LocationStream, ZoneDirectory};
use crate::domain::config::EngineConfig;
use crate::infrastructure::{
    CpalCapture, FsArtifactSpool, GpsdLocationStream, HttpSessionBackend, HttpZoneDirectory,
    NotifyRustNotifier, RodioAudioCue,
};

use super::pid_file::{PidFile, PidFileError};
use super::presenter::Presenter;
use super::signals::spawn_signal_handlers;
use super::socket::{ControlSocketServer, SocketPath};

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Event queue depth. Samples buffer here while a backend or device call
/// is in flight; the engine's interval coalescing drains the backlog.
const EVENT_QUEUE_DEPTH: usize = 64;

/// Run the engine daemon
pub async fn run_engine(config: EngineConfig) -> ExitCode {
    let presenter = Presenter::new();

    let Some(site_id) = config.site_id.clone() else {
        presenter.error("No site configured. Set one with: zone-recorder config set site_id <id>");
        return ExitCode::from(EXIT_USAGE_ERROR);
    };
    let Some(api_url) = config.api_url.clone() else {
        presenter.error("No API URL configured. Set one with: zone-recorder config set api_url <url>");
        return ExitCode::from(EXIT_USAGE_ERROR);
    };

    // Acquire PID file
    let pid_file = PidFile::new();
    if let Err(e) = pid_file.acquire() {
        match e {
            PidFileError::AlreadyRunning(pid) => {
                presenter.error(&format!("Another daemon is already running (PID: {})", pid));
            }
            _ => {
                presenter.error(&e.to_string());
            }
        }
        return ExitCode::from(EXIT_ERROR);
    }

    // Create adapters
    let capture = CpalCapture::new();
    let backend = HttpSessionBackend::new(api_url.clone());
    let notifier = NotifyRustNotifier::new();
    let cue = RodioAudioCue::new();
    let spool = FsArtifactSpool::new();
    let directory = HttpZoneDirectory::new(api_url);
    let location = GpsdLocationStream::new(config.gpsd_addr_or_default().to_string());

    let gps_poll_secs = config.gps_accuracy_or_default().poll_interval_secs();
    let zone_refresh_secs = config.zone_refresh_secs_or_default();

    // Create engine
    let mut engine = Engine::new(capture, backend, notifier, cue, spool, config);
    let status = engine.status_handle();

    // Event queue feeding the engine
    let (tx, mut rx) = mpsc::channel::<EngineEvent>(EVENT_QUEUE_DEPTH);

    // Setup signal handlers
    if let Err(e) = spawn_signal_handlers(tx.clone()).await {
        presenter.error(&format!("Failed to setup signal handler: {}", e));
        let _ = pid_file.release();
        return ExitCode::from(EXIT_ERROR);
    }

    // Setup control socket
    let socket_path = SocketPath::new();
    let mut socket_server = ControlSocketServer::new(socket_path.clone());
    if let Err(e) = socket_server.bind() {
        presenter.error(&format!("Failed to bind socket: {}", e));
        let _ = pid_file.release();
        return ExitCode::from(EXIT_ERROR);
    }

    let socket_tx = tx.clone();
    tokio::spawn(async move {
        let _ = socket_server.run(socket_tx, status).await;
    });

    // Zone directory poller, on its own coarse cadence
    spawn_zone_poller(directory, site_id, zone_refresh_secs, tx.clone());

    // Location sampler
    spawn_location_pump(location, gps_poll_secs, tx);

    presenter.engine_status("Started, watching for zone entries...");
    presenter.info(&format!(
        "PID: {} | Socket: {} | SIGINT: exit",
        std::process::id(),
        socket_path.path().display()
    ));

    // Main event loop: all engine mutation happens here, in event order
    while let Some(event) = rx.recv().await {
        if !engine.handle_event(event).await {
            break;
        }
    }

    presenter.engine_status("Shutting down...");
    let _ = pid_file.release();
    ExitCode::from(EXIT_SUCCESS)
}

/// Poll the zone directory and push fresh zone sets into the event queue
fn spawn_zone_poller<D>(
    directory: D,
    site_id: String,
    refresh_secs: u64,
    tx: mpsc::Sender<EngineEvent>,
) where
    D: ZoneDirectory + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(refresh_secs.max(1)));
        loop {
            ticker.tick().await;
            match directory.list_active_zones(&site_id).await {
                Ok(zones) => {
                    if tx.send(EngineEvent::ZonesRefreshed(zones)).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    // Keep the last zone set; the directory is pollable and
                    // will be retried on the next tick
                    eprintln!("Zone refresh failed: {}", e);
                }
            }
        }
    });
}

/// Pump location samples and errors into the event queue
fn spawn_location_pump<L>(mut location: L, poll_secs: u64, tx: mpsc::Sender<EngineEvent>)
where
    L: LocationStream + 'static,
{
    tokio::spawn(async move {
        loop {
            let event = match location.next_sample().await {
                Some(Ok(sample)) => EngineEvent::Sample(sample),
                Some(Err(e)) => {
                    let fatal = e == LocationError::PermissionDenied;
                    let event = EngineEvent::LocationFailed(e);
                    if fatal {
                        let _ = tx.send(event).await;
                        return;
                    }
                    event
                }
                None => return,
            };
            if tx.send(event).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_secs(poll_secs.max(1))).await;
        }
    });
}
