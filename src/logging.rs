//! Tracing subscriber setup

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Returns `false`
/// when a subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
    };

    result.is_ok()
}
