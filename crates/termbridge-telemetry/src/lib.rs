//! Telemetry for the termbridge workspace.
//!
//! Provides structured logging initialization and prometheus metric
//! statics updated by the synchronization core.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
