//! Tracing subscriber setup for hosts embedding the position manager

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{PositionError, PositionResult};

/// Filter used when `RUST_LOG` is unset
pub fn default_directive(config: &LoggingConfig) -> String {
    format!("position_manager={level},range_core={level}", level = config.level)
}

/// Install the global subscriber.
///
/// Fails instead of panicking when a subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> PositionResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(config)))
        .map_err(|e| PositionError::Configuration(format!("Invalid log filter: {e}")))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| PositionError::Configuration(format!("Failed to install subscriber: {e}")))
}
