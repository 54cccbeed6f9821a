mod defaults;
mod types;
mod validation;

pub use defaults::*;
pub use types::*;
pub use validation::*;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level pairwatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Token handed in through `PAIRWATCH_TOKEN`; takes precedence over the
    /// token file.
    #[serde(skip)]
    pub env_token: Option<String>,

    /// State directory for persistent data.
    #[serde(skip)]
    pub state_dir: PathBuf,

    /// File the configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file, environment, and defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(find_config_file)
            .unwrap_or_else(|| PathBuf::from("pairwatch.json"));

        let mut config = if config_path.exists() {
            let mut config = load_config_file(&config_path)?;
            config.source = Some(config_path);
            config
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config.state_dir = resolve_state_dir();
        validate_config_object(&config)?;

        Ok(config)
    }

    /// Write default configuration to a file.
    pub fn write_default(path: &str) -> Result<()> {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config)?;
        std::fs::write(path, json).with_context(|| format!("Cannot write '{path}'"))?;
        Ok(())
    }

    /// Where the session token is persisted.
    pub fn token_file(&self) -> PathBuf {
        self.session
            .token_file
            .clone()
            .unwrap_or_else(|| self.state_dir.join(TOKEN_FILE_NAME))
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("PAIRWATCH_BACKEND_URL") {
            self.backend.base_url = url;
        }

        if let Ok(url) = std::env::var("PAIRWATCH_REALTIME_URL") {
            self.backend.realtime_url = Some(url);
        }

        if let Ok(ms) = std::env::var("PAIRWATCH_POLL_INTERVAL_MS") {
            if let Ok(ms) = ms.parse() {
                self.sync.poll_interval_ms = ms;
            }
        }

        if let Ok(token) = std::env::var("PAIRWATCH_TOKEN") {
            if !token.trim().is_empty() {
                self.env_token = Some(token);
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            sync: SyncConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
            env_token: None,
            state_dir: resolve_state_dir(),
            source: None,
        }
    }
}

/// Find the configuration file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let candidates = [
        PathBuf::from("pairwatch.json"),
        PathBuf::from("pairwatch.yaml"),
        PathBuf::from("pairwatch.yml"),
        PathBuf::from("pairwatch.toml"),
    ];

    for path in &candidates {
        if path.exists() {
            return Some(path.clone());
        }
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".pairwatch").join("config.json");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

/// Resolve the state directory for persistent data.
fn resolve_state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PAIRWATCH_STATE_DIR") {
        return PathBuf::from(dir);
    }

    dirs::home_dir()
        .map(|h| h.join(".pairwatch"))
        .unwrap_or_else(|| PathBuf::from(".pairwatch"))
}

/// Load configuration from a file path.
fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        _ => {
            // JSON5 is a superset of JSON; fall back to serde_json for its
            // error messages.
            match json5::from_str(&content) {
                Ok(config) => config,
                Err(_) => serde_json::from_str(&content)
                    .with_context(|| format!("Invalid config file '{}'", path.display()))?,
            }
        }
    };

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_conventions() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, "http://localhost:8080");
        assert_eq!(config.backend.whatsapp_prefix, "/whatsapp");
        assert_eq!(config.sync.poll_interval_ms, 2_000);
        assert_eq!(config.sync.history_poll_interval_ms, 3_000);
        assert!(config.sync.realtime_enabled);
    }

    #[test]
    fn realtime_url_is_derived_from_base() {
        let mut backend = BackendConfig::default();
        assert_eq!(backend.resolved_realtime_url(), "ws://localhost:8080/ws");

        backend.base_url = "https://bot.example.com/".into();
        assert_eq!(backend.resolved_realtime_url(), "wss://bot.example.com/ws");

        backend.realtime_url = Some("ws://rt.example.com/socket".into());
        assert_eq!(backend.resolved_realtime_url(), "ws://rt.example.com/socket");
    }

    #[test]
    fn loads_json5_with_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairwatch.json");
        std::fs::write(
            &path,
            r#"{
                // comments are fine
                backend: { baseUrl: "http://10.0.0.5:8080" },
                sync: { pollIntervalMs: 500 },
            }"#,
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.backend.base_url, "http://10.0.0.5:8080");
        assert_eq!(config.backend.whatsapp_prefix, "/whatsapp");
        assert_eq!(config.sync.poll_interval_ms, 500);
        assert_eq!(config.sync.history_poll_interval_ms, 3_000);
    }

    #[test]
    fn loads_yaml_and_toml() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("pairwatch.yaml");
        std::fs::write(&yaml, "logging:\n  level: debug\n  json: true\n").unwrap();
        let config = load_config_file(&yaml).unwrap();
        assert_eq!(config.logging.level, LoggingLevel::Debug);
        assert!(config.logging.json);

        let toml_path = dir.path().join("pairwatch.toml");
        std::fs::write(&toml_path, "[sync]\nrealtimeEnabled = false\n").unwrap();
        let config = load_config_file(&toml_path).unwrap();
        assert!(!config.sync.realtime_enabled);
    }

    #[test]
    fn load_rejects_zero_poll_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairwatch.json");
        std::fs::write(&path, r#"{ sync: { pollIntervalMs: 0 } }"#).unwrap();

        let err = Config::load(path.to_str()).unwrap_err().to_string();
        assert!(err.contains("sync.pollIntervalMs"), "{err}");
    }

    #[test]
    fn load_records_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairwatch.yaml");
        std::fs::write(&path, "sync:\n  historyPollIntervalMs: 1500\n").unwrap();

        let config = Config::load(path.to_str()).unwrap();
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
        assert_eq!(config.sync.history_poll_interval_ms, 1_500);
    }

    #[test]
    fn token_file_defaults_into_state_dir() {
        let mut config = Config::default();
        config.state_dir = PathBuf::from("/tmp/pw-state");
        assert_eq!(config.token_file(), PathBuf::from("/tmp/pw-state/token"));

        config.session.token_file = Some(PathBuf::from("/etc/pw/token"));
        assert_eq!(config.token_file(), PathBuf::from("/etc/pw/token"));
    }
}
