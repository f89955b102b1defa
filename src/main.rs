//! ZoneRecorder CLI entry point

use std::process::ExitCode;

use clap::Parser;

use zone_recorder::cli::{
    app::{run_engine, EXIT_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    control_cmd::handle_control_command,
    presenter::Presenter,
    simulate::run_simulation,
};
use zone_recorder::application::ports::ConfigStore;
use zone_recorder::domain::config::EngineConfig;
use zone_recorder::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let presenter = Presenter::new();

    match cli.command {
        Commands::Config { action } => {
            let store = XdgConfigStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            ExitCode::SUCCESS
        }
        Commands::Control { action } => {
            if let Err(e) = handle_control_command(action, &presenter).await {
                presenter.error(&e);
                return ExitCode::from(EXIT_ERROR);
            }
            ExitCode::SUCCESS
        }
        Commands::Run {
            site_id,
            api_url,
            gpsd,
            mode,
            sample_interval,
            exit_margin,
            gps_accuracy,
            audio_quality,
        } => {
            // CLI flags override the config file, which overrides defaults
            let overlay = EngineConfig {
                site_id,
                api_url,
                gpsd_addr: gpsd,
                mode: mode.map(|m| m.as_config_value().to_string()),
                sample_interval_secs: sample_interval,
                exit_margin_m: exit_margin,
                gps_accuracy: gps_accuracy.map(|t| t.as_config_value().to_string()),
                audio_quality: audio_quality.map(|t| t.as_config_value().to_string()),
                ..Default::default()
            };
            let config = load_merged_config(overlay).await;
            run_engine(config).await
        }
        Commands::Simulate {
            trace,
            zones,
            mode,
            exit_margin,
            sample_interval,
            step_delay_ms,
        } => {
            let overlay = EngineConfig {
                mode: mode.map(|m| m.as_config_value().to_string()),
                exit_margin_m: exit_margin,
                sample_interval_secs: sample_interval,
                ..Default::default()
            };
            let config = load_merged_config(overlay).await;
            run_simulation(&trace, &zones, config, step_delay_ms).await
        }
    }
}

/// Merge CLI overrides over the stored config
async fn load_merged_config(overlay: EngineConfig) -> EngineConfig {
    let store = XdgConfigStore::new();
    let base = store.load().await.unwrap_or_else(|_| EngineConfig::empty());
    base.merge(overlay)
}
