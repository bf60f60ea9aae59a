//! Logging setup.

use crate::error::TelemetryResult;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber for the synchronization core.
///
/// The filter comes from `RUST_LOG`, defaulting to info overall with debug
/// detail for the termbridge crates. `RUST_ENV=production` selects
/// machine-readable JSON lines; anything else gets human-readable output.
pub fn init_logging() -> TelemetryResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,termbridge=debug"));
    let registry = tracing_subscriber::registry().with(env_filter);

    match std::env::var("RUST_ENV").as_deref() {
        Ok("production") => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .init(),
        _ => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_names(true),
            )
            .init(),
    }

    Ok(())
}
