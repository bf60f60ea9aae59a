//! Client-side synchronization core for a cloud trading terminal bridge.
//!
//! A consumer opens a [`TerminalConnection`] through a [`ConnectionRegistry`];
//! the connection keeps a local replica of the account consistent with the
//! server-side terminal, streams market data, issues trading commands and
//! reports connection health.

pub mod config;
pub mod connection;
pub mod registry;

pub use config::{validate_application, ConnectionOptions};
pub use connection::TerminalConnection;
pub use registry::ConnectionRegistry;

pub use termbridge_health::HealthStatus;
pub use termbridge_sync::{RetryOptions, WaitSynchronizedOptions};
