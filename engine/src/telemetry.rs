//! Logging setup
//!
//! One-time `tracing-subscriber` installation for the engine. The effective
//! filter is taken from `RUST_LOG` when present, otherwise the requested
//! level is applied both globally and to this crate's target. Debug builds
//! print human-readable events; release builds emit JSON lines for log
//! ingestion.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber at the requested level.
///
/// Calling this after a subscriber is already installed does nothing, so
/// repeated initialization during startup is harmless.
pub fn init_telemetry_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},maestro_engine={level}")));

    let base = tracing_subscriber::registry().with(filter);

    if cfg!(debug_assertions) {
        base.with(fmt::layer().pretty().with_target(false))
            .try_init()
            .ok();
    } else {
        base.with(fmt::layer().json().with_current_span(true))
            .try_init()
            .ok();
    }
}

/// Install the global subscriber at the default "info" level.
pub fn init_telemetry() {
    init_telemetry_with_level("info");
}
