//! Control command handler - sends commands to the running daemon

use super::args::ControlAction;
use super::presenter::Presenter;
use super::socket::{ControlSocketClient, SocketPath};

/// Handle control subcommand
pub async fn handle_control_command(
    action: ControlAction,
    presenter: &Presenter,
) -> Result<(), String> {
    let client = ControlSocketClient::new(SocketPath::new());

    // Check if daemon is running
    if !client.is_daemon_running() {
        return Err("No daemon running. Start with: zone-recorder run".to_string());
    }

    let cmd = match action {
        ControlAction::Status => "status",
        ControlAction::Stop => "stop",
        ControlAction::Accept => "accept",
        ControlAction::Decline => "decline",
        ControlAction::Enable => "enable",
        ControlAction::Disable => "disable",
        ControlAction::Shutdown => "shutdown",
    };

    let response = client
        .send_command(cmd)
        .await
        .map_err(|e| format!("Failed to communicate with daemon: {}", e))?;

    let response = response.trim();

    if let Some(stripped) = response.strip_prefix("error:") {
        return Err(stripped.trim().to_string());
    }

    match action {
        ControlAction::Status => {
            // Status is machine-readable JSON; keep it on stdout
            presenter.output(response);
        }
        _ => {
            presenter.info(&format!("Command sent: {}", cmd));
        }
    }

    Ok(())
}
