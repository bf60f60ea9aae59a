//! Connection health monitoring for termbridge.
//!
//! Tracks uptime over sliding windows and judges quote streaming freshness
//! for one connection, reading the connection through an injected capability
//! interface.

pub mod monitor;
pub mod uptime;

pub use monitor::{ConnectionHealthMonitor, HealthInputs, HealthStatus};
pub use uptime::UptimeWindow;
