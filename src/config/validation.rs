use super::Config;
use anyhow::Result;
use tracing::warn;

/// Validation errors for configuration.
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate a configuration object.
pub fn validate_config(config: &Config) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    match url::Url::parse(&config.backend.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ConfigValidationError {
            path: "backend.baseUrl".to_string(),
            message: format!("Unsupported scheme '{}', expected http or https", url.scheme()),
        }),
        Err(e) => errors.push(ConfigValidationError {
            path: "backend.baseUrl".to_string(),
            message: format!("Invalid URL: {e}"),
        }),
    }

    if !config.backend.whatsapp_prefix.starts_with('/') {
        errors.push(ConfigValidationError {
            path: "backend.whatsappPrefix".to_string(),
            message: "Prefix must start with '/'".to_string(),
        });
    }

    let realtime = config.backend.resolved_realtime_url();
    match url::Url::parse(&realtime) {
        Ok(url) if matches!(url.scheme(), "ws" | "wss") => {}
        Ok(url) => errors.push(ConfigValidationError {
            path: "backend.realtimeUrl".to_string(),
            message: format!("Unsupported scheme '{}', expected ws or wss", url.scheme()),
        }),
        Err(e) => errors.push(ConfigValidationError {
            path: "backend.realtimeUrl".to_string(),
            message: format!("Invalid URL: {e}"),
        }),
    }

    if config.backend.request_timeout_ms == 0 {
        errors.push(ConfigValidationError {
            path: "backend.requestTimeoutMs".to_string(),
            message: "Timeout must be greater than 0".to_string(),
        });
    }

    if config.sync.poll_interval_ms == 0 {
        errors.push(ConfigValidationError {
            path: "sync.pollIntervalMs".to_string(),
            message: "Interval must be greater than 0".to_string(),
        });
    }

    if config.sync.history_poll_interval_ms == 0 {
        errors.push(ConfigValidationError {
            path: "sync.historyPollIntervalMs".to_string(),
            message: "Interval must be greater than 0".to_string(),
        });
    }

    if config.backend.request_timeout_ms > 0
        && config.sync.poll_interval_ms > 0
        && config.backend.request_timeout_ms > config.sync.poll_interval_ms * 10
    {
        warn!(
            "Request timeout ({}ms) is much longer than the poll interval ({}ms); \
             a hung backend will stall status updates",
            config.backend.request_timeout_ms, config.sync.poll_interval_ms
        );
    }

    errors
}

/// Validate configuration and return Result.
pub fn validate_config_object(config: &Config) -> Result<()> {
    let errors = validate_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("Configuration validation failed:\n{}", messages.join("\n"));
    }
}
