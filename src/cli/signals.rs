//! Signal handlers for the engine daemon

use colored::Colorize;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

use crate::application::engine::EngineEvent;

/// Forward SIGINT and SIGTERM into the engine event queue as shutdown
/// requests, so an open recording is finalized before the process exits.
pub async fn spawn_signal_handlers(tx: mpsc::Sender<EngineEvent>) -> Result<(), std::io::Error> {
    let tx_int = tx.clone();
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::spawn(async move {
        sigint.recv().await;
        eprintln!("{} Received SIGINT (shutdown)", "↓".cyan());
        let _ = tx_int.send(EngineEvent::Shutdown).await;
    });

    let tx_term = tx;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        sigterm.recv().await;
        eprintln!("{} Received SIGTERM (shutdown)", "↓".cyan());
        let _ = tx_term.send(EngineEvent::Shutdown).await;
    });

    Ok(())
}
