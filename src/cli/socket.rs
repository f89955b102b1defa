//! Unix Domain Socket communication for daemon control
//!
//! Line-based commands; `status` answers one JSON line. Commands that act
//! on the engine are funneled into its event queue, never applied directly.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

use crate::application::engine::{ConfirmDecision, EngineEvent, StatusSnapshot};

/// Socket path resolver
#[derive(Debug, Clone)]
pub struct SocketPath {
    path: PathBuf,
}

impl SocketPath {
    /// Create socket path, preferring XDG_RUNTIME_DIR
    pub fn new() -> Self {
        let path = std::env::var("XDG_RUNTIME_DIR")
            .map(|dir| PathBuf::from(dir).join("zone-recorder.sock"))
            .unwrap_or_else(|_| std::env::temp_dir().join("zone-recorder.sock"));
        Self { path }
    }

    /// Get the socket path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if socket file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove socket file if it exists
    pub fn cleanup(&self) -> io::Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl Default for SocketPath {
    fn default() -> Self {
        Self::new()
    }
}

/// Control socket server - listens for commands and feeds the engine queue
pub struct ControlSocketServer {
    socket_path: SocketPath,
    listener: Option<UnixListener>,
}

impl ControlSocketServer {
    /// Create a new socket server
    pub fn new(socket_path: SocketPath) -> Self {
        Self {
            socket_path,
            listener: None,
        }
    }

    /// Bind to the socket
    pub fn bind(&mut self) -> io::Result<()> {
        // Remove stale socket file if it exists
        self.socket_path.cleanup()?;

        // Bind listener
        let listener = UnixListener::bind(self.socket_path.path())?;
        self.listener = Some(listener);
        Ok(())
    }

    /// Get the socket path
    pub fn path(&self) -> &Path {
        self.socket_path.path()
    }

    /// Accept and handle connections.
    ///
    /// Each command is translated to an engine event; the shared status
    /// cell answers status queries without touching the engine.
    pub async fn run(
        &self,
        tx: mpsc::Sender<EngineEvent>,
        status: Arc<StdMutex<StatusSnapshot>>,
    ) -> io::Result<()> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "Socket not bound"))?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let tx = tx.clone();
                    let status = Arc::clone(&status);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, tx, status).await {
                            eprintln!("Socket connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    eprintln!("Socket accept error: {}", e);
                }
            }
        }
    }

    /// Cleanup socket file
    pub fn cleanup(&self) {
        let _ = self.socket_path.cleanup();
    }
}

impl Drop for ControlSocketServer {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Handle a single client connection
async fn handle_connection(
    stream: UnixStream,
    tx: mpsc::Sender<EngineEvent>,
    status: Arc<StdMutex<StatusSnapshot>>,
) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    // Read command
    reader.read_line(&mut line).await?;
    let cmd = line.trim();

    // Process command
    let response: String = match cmd {
        "status" => {
            let snapshot = status
                .lock()
                .map(|guard| serde_json::to_string(&*guard).ok())
                .unwrap_or(None);
            match snapshot {
                Some(json) => format!("{json}\n"),
                None => "error: status unavailable\n".to_string(),
            }
        }
        "stop" => {
            let _ = tx.send(EngineEvent::ManualStop).await;
            "ok\n".to_string()
        }
        "accept" => {
            let _ = tx
                .send(EngineEvent::Confirmation(ConfirmDecision::Accept))
                .await;
            "ok\n".to_string()
        }
        "decline" => {
            let _ = tx
                .send(EngineEvent::Confirmation(ConfirmDecision::Decline))
                .await;
            "ok\n".to_string()
        }
        "enable" => {
            let _ = tx.send(EngineEvent::Enable).await;
            "ok\n".to_string()
        }
        "disable" => {
            let _ = tx.send(EngineEvent::Disable).await;
            "ok\n".to_string()
        }
        "shutdown" => {
            let _ = tx.send(EngineEvent::Shutdown).await;
            "ok\n".to_string()
        }
        _ => "error: unknown command\n".to_string(),
    };

    writer.write_all(response.as_bytes()).await?;
    writer.flush().await?;

    Ok(())
}

/// Control socket client - connects and sends commands
pub struct ControlSocketClient {
    socket_path: SocketPath,
}

impl ControlSocketClient {
    /// Create a new socket client
    pub fn new(socket_path: SocketPath) -> Self {
        Self { socket_path }
    }

    /// Check if daemon appears to be running (socket exists)
    pub fn is_daemon_running(&self) -> bool {
        self.socket_path.exists()
    }

    /// Send a command and receive response
    pub async fn send_command(&self, cmd: &str) -> io::Result<String> {
        let stream = UnixStream::connect(self.socket_path.path()).await?;
        let (reader, mut writer) = stream.into_split();

        // Send command
        writer.write_all(format!("{}\n", cmd).as_bytes()).await?;
        writer.flush().await?;

        // Read response
        let mut reader = BufReader::new(reader);
        let mut response = String::new();
        reader.read_line(&mut response).await?;

        Ok(response)
    }
}
