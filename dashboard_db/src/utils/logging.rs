//! Logging setup
//!
//! Installs a global `tracing` subscriber from the `[logging]` config section.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::{filter::Directive, fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Parse a level name, defaulting to INFO
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging based on configuration
///
/// Without a `[logging]` section the default config is used. `RUST_LOG` directives
/// are honoured on top of the configured level.
pub fn init_logging(config: &Option<LoggingConfig>) -> Result<()> {
    let default_config = LoggingConfig::default();
    let config = config.as_ref().unwrap_or(&default_config);
    let level = parse_level(&config.level);

    let directive: Directive = format!("dashboard_db={}", level)
        .parse()
        .map_err(|e| Error::ConfigError(format!("Invalid log directive: {}", e)))?;
    let env_filter = EnvFilter::from_default_env().add_directive(directive);
    let json = config.format.eq_ignore_ascii_case("json");

    let result = if let Some(file_path) = &config.file {
        if let Some(parent) = Path::new(file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = Mutex::new(File::create(file_path)?);

        if json {
            tracing::subscriber::set_global_default(
                fmt::Subscriber::builder()
                    .json()
                    .with_env_filter(env_filter)
                    .with_writer(writer)
                    .finish(),
            )
        } else {
            tracing::subscriber::set_global_default(
                fmt::Subscriber::builder()
                    .with_ansi(false)
                    .with_env_filter(env_filter)
                    .with_writer(writer)
                    .finish(),
            )
        }
    } else if config.stdout {
        if json {
            tracing::subscriber::set_global_default(
                fmt::Subscriber::builder()
                    .json()
                    .with_env_filter(env_filter)
                    .finish(),
            )
        } else {
            tracing::subscriber::set_global_default(
                fmt::Subscriber::builder()
                    .with_env_filter(env_filter)
                    .finish(),
            )
        }
    } else {
        return Ok(());
    };

    result.map_err(|e| Error::Unknown(e.to_string()))
}
