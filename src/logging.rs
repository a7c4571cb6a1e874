//! Tracing setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Initialize tracing with the `EVENTSTORAGE_LOG` environment variable.
///
/// Defaults to "info" level if `EVENTSTORAGE_LOG` is not set. Panics if a
/// global subscriber is already installed.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Like [`init_tracing`], but leaves an installed subscriber alone.
///
/// Returns whether this call installed it.
pub fn try_init_tracing() -> bool {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
