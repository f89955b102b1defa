//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::{AudioQualityTier, GpsAccuracyTier, OperatingMode};
use crate::domain::error::ConfigError;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    // Validate key
    if !is_valid_config_key(key) {
        return Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        });
    }

    // Load existing config
    let mut config = store.load().await?;

    // Update the appropriate field, validating the value shape
    match key {
        "site_id" => config.site_id = Some(value.to_string()),
        "api_url" => config.api_url = Some(value.to_string()),
        "gpsd_addr" => config.gpsd_addr = Some(value.to_string()),
        "enabled" => config.enabled = Some(parse_bool(key, value)?),
        "mode" => {
            value
                .parse::<OperatingMode>()
                .map_err(|e| ConfigError::ValidationError {
                    key: key.to_string(),
                    message: e.to_string(),
                })?;
            config.mode = Some(value.to_string());
        }
        "gps_accuracy" => {
            value
                .parse::<GpsAccuracyTier>()
                .map_err(|e| ConfigError::ValidationError {
                    key: key.to_string(),
                    message: e.to_string(),
                })?;
            config.gps_accuracy = Some(value.to_string());
        }
        "audio_quality" => {
            value
                .parse::<AudioQualityTier>()
                .map_err(|e| ConfigError::ValidationError {
                    key: key.to_string(),
                    message: e.to_string(),
                })?;
            config.audio_quality = Some(value.to_string());
        }
        "sample_interval_secs" => config.sample_interval_secs = Some(parse_u64(key, value)?),
        "zone_refresh_secs" => config.zone_refresh_secs = Some(parse_u64(key, value)?),
        "exit_margin_m" => config.exit_margin_m = Some(parse_f64(key, value)?),
        "notify_sound" => config.notify_sound = Some(parse_bool(key, value)?),
        "notify_vibrate" => config.notify_vibrate = Some(parse_bool(key, value)?),
        _ => unreachable!(), // Already validated
    }

    // Save config
    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    // Validate key
    if !is_valid_config_key(key) {
        return Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        });
    }

    let config = store.load().await?;
    presenter.output(&value_for(&config, key));
    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;
    for key in VALID_CONFIG_KEYS {
        presenter.key_value(key, &value_for(&config, key));
    }
    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().display().to_string());
    Ok(())
}

fn value_for(config: &crate::domain::config::EngineConfig, key: &str) -> String {
    fn show<T: std::fmt::Display>(v: &Option<T>) -> String {
        v.as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(unset)".to_string())
    }

    match key {
        "site_id" => show(&config.site_id),
        "api_url" => show(&config.api_url),
        "gpsd_addr" => show(&config.gpsd_addr),
        "enabled" => show(&config.enabled),
        "mode" => show(&config.mode),
        "gps_accuracy" => show(&config.gps_accuracy),
        "sample_interval_secs" => show(&config.sample_interval_secs),
        "zone_refresh_secs" => show(&config.zone_refresh_secs),
        "exit_margin_m" => show(&config.exit_margin_m),
        "audio_quality" => show(&config.audio_quality),
        "notify_sound" => show(&config.notify_sound),
        "notify_vibrate" => show(&config.notify_vibrate),
        _ => "(unset)".to_string(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: "Value must be 'true' or 'false'".to_string(),
        }),
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::ValidationError {
        key: key.to_string(),
        message: "Value must be a non-negative integer".to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: "Value must be a non-negative number".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::XdgConfigStore;

    fn store() -> (tempfile::TempDir, XdgConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = XdgConfigStore::with_path(dir.path().join("config.toml"));
        (dir, store)
    }

    #[tokio::test]
    async fn set_and_get_round_trip() {
        let (_dir, store) = store();
        let presenter = Presenter::new();

        handle_config_command(
            ConfigAction::Set {
                key: "site_id".to_string(),
                value: "site-42".to_string(),
            },
            &store,
            &presenter,
        )
        .await
        .unwrap();

        let config = store.load().await.unwrap();
        assert_eq!(config.site_id, Some("site-42".to_string()));
    }

    #[tokio::test]
    async fn set_rejects_unknown_key() {
        let (_dir, store) = store();
        let presenter = Presenter::new();

        let err = handle_config_command(
            ConfigAction::Set {
                key: "api_key".to_string(),
                value: "x".to_string(),
            },
            &store,
            &presenter,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn set_rejects_invalid_mode() {
        let (_dir, store) = store();
        let presenter = Presenter::new();

        let err = handle_config_command(
            ConfigAction::Set {
                key: "mode".to_string(),
                value: "sometimes".to_string(),
            },
            &store,
            &presenter,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn set_rejects_invalid_bool() {
        let (_dir, store) = store();
        let presenter = Presenter::new();

        let err = handle_config_command(
            ConfigAction::Set {
                key: "notify_sound".to_string(),
                value: "yes".to_string(),
            },
            &store,
            &presenter,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn set_accepts_margin_values() {
        let (_dir, store) = store();
        let presenter = Presenter::new();

        handle_config_command(
            ConfigAction::Set {
                key: "exit_margin_m".to_string(),
                value: "25.5".to_string(),
            },
            &store,
            &presenter,
        )
        .await
        .unwrap();

        assert_eq!(store.load().await.unwrap().exit_margin_m, Some(25.5));
    }

    #[tokio::test]
    async fn init_twice_fails() {
        let (_dir, store) = store();
        let presenter = Presenter::new();

        handle_config_command(ConfigAction::Init, &store, &presenter)
            .await
            .unwrap();
        let err = handle_config_command(ConfigAction::Init, &store, &presenter)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::AlreadyExists(_)));
    }
}
