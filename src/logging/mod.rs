use crate::config::LoggingConfig;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` directives are honoured; the configured level applies to this
/// crate's own targets on top of them.
pub fn init(config: &LoggingConfig) {
    let directive = format!("pairwatch={}", config.level.as_str());
    let filter = match directive.parse() {
        Ok(d) => EnvFilter::from_default_env().add_directive(d),
        Err(_) => EnvFilter::from_default_env(),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        eprintln!("pairwatch: logging already initialised: {e}");
    }
}
