//! Application-level configuration loading: game rules from disk, collaborators from the environment.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::services::scoring::CompletionRule;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "HUNT_BACK_CONFIG_PATH";
const DEFAULT_ENTRY_CODE_ATTEMPTS: u32 = 10;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// When an acquisition ends the game.
    pub completion_rule: CompletionRule,
    /// Replaces the game's `durationMinutes` when arming the end-of-game timer.
    pub end_game_delay_override_minutes: Option<u32>,
    /// Generated entry codes tried before a new game is rejected.
    pub entry_code_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            completion_rule: CompletionRule::default(),
            end_game_delay_override_minutes: None,
            entry_code_attempts: DEFAULT_ENTRY_CODE_ATTEMPTS,
        }
    }
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        rule = ?config.completion_rule,
                        "loaded game configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    fn parse(contents: &str) -> serde_json::Result<Self> {
        let mut config = serde_json::from_str::<Self>(contents)?;
        config.entry_code_attempts = config.entry_code_attempts.max(1);
        Ok(config)
    }

    /// Minutes until the end-of-game trigger fires for a game lasting `duration_minutes`.
    pub fn end_game_delay(&self, duration_minutes: u32) -> u32 {
        self.end_game_delay_override_minutes
            .unwrap_or(duration_minutes)
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Storage backend selected with `STORE_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local map; data is lost on restart.
    Memory,
    /// CouchDB over HTTP.
    Couch,
    /// MongoDB.
    Mongo,
}

impl StoreBackend {
    /// Read `STORE_BACKEND`, defaulting to MongoDB.
    pub fn from_env() -> Self {
        let raw = env::var("STORE_BACKEND").unwrap_or_default();
        Self::parse(&raw).unwrap_or_else(|| {
            if !raw.is_empty() {
                warn!(value = %raw, "unknown STORE_BACKEND; using mongo");
            }
            StoreBackend::Mongo
        })
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(StoreBackend::Memory),
            "couch" | "couchdb" => Some(StoreBackend::Couch),
            "mongo" | "mongodb" => Some(StoreBackend::Mongo),
            _ => None,
        }
    }
}

/// Endpoints of the outbound collaborators. Unset entries fall back to log-only delivery
/// or the in-process timer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Push endpoint for development builds (`PUSH_DEV_URL`).
    pub push_dev_url: Option<String>,
    /// Push endpoint for store builds (`PUSH_PRODUCTION_URL`).
    pub push_production_url: Option<String>,
    /// Bearer token sent to both push endpoints (`PUSH_API_TOKEN`).
    pub push_api_token: Option<String>,
    /// Analytics event endpoint (`AUDIT_SINK_URL`).
    pub audit_sink_url: Option<String>,
    /// External end-game timer (`END_GAME_WEBHOOK_URL`).
    pub end_game_webhook_url: Option<String>,
}

impl DispatchSettings {
    /// Read the settings from the environment, ignoring blank values.
    pub fn from_env() -> Self {
        Self {
            push_dev_url: non_empty_var("PUSH_DEV_URL"),
            push_production_url: non_empty_var("PUSH_PRODUCTION_URL"),
            push_api_token: non_empty_var("PUSH_API_TOKEN"),
            audit_sink_url: non_empty_var("AUDIT_SINK_URL"),
            end_game_webhook_url: non_empty_var("END_GAME_WEBHOOK_URL"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        assert_eq!(AppConfig::parse("{}").unwrap(), AppConfig::default());
    }

    #[test]
    fn point_threshold_rule_and_override() {
        let config = AppConfig::parse(
            r#"{
                "completion_rule": { "kind": "point_threshold", "points": 50 },
                "end_game_delay_override_minutes": 1,
                "entry_code_attempts": 0
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.completion_rule,
            CompletionRule::PointThreshold { points: 50 }
        );
        assert_eq!(config.end_game_delay(45), 1);
        assert_eq!(config.entry_code_attempts, 1);
    }

    #[test]
    fn delay_defaults_to_game_duration() {
        assert_eq!(AppConfig::default().end_game_delay(45), 45);
    }

    #[test]
    fn backend_names() {
        assert_eq!(StoreBackend::parse("Memory"), Some(StoreBackend::Memory));
        assert_eq!(StoreBackend::parse("couchdb"), Some(StoreBackend::Couch));
        assert_eq!(StoreBackend::parse(" mongo "), Some(StoreBackend::Mongo));
        assert_eq!(StoreBackend::parse("redis"), None);
    }
}
