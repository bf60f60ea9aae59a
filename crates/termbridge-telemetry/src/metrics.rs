//! Prometheus metrics for the synchronization core.
//!
//! Covers connection health, synchronization progress and packet ordering.
//!
//! # Panics
//!
//! Each `register_*` call is unwrapped: it can only fail when two statics
//! claim the same metric name, which is a bug in this module, and the panic
//! fires the first time a metric is touched — before any connection has
//! state worth losing. No registration happens after that point.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, CounterVec, GaugeVec,
};

/// Whether any replica of an account is synchronized (1) or not (0).
pub static CONNECTION_SYNCHRONIZED: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "termbridge_connection_synchronized",
        "Whether any replica of the account is synchronized (1=yes)",
        &["account_id"]
    )
    .unwrap()
});

/// Measured uptime percentage per sliding window.
pub static UPTIME_PERCENT: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "termbridge_uptime_percent",
        "Connection uptime percentage over a sliding window",
        &["account_id", "window"]
    )
    .unwrap()
});

/// Out-of-order packet gaps detected by the packet orderer.
pub static OUT_OF_ORDER_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "termbridge_out_of_order_total",
        "Total out-of-order packet gaps reported",
        &["account_id"]
    )
    .unwrap()
});

/// Failed synchronization attempts that scheduled a retry.
pub static SYNC_RETRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "termbridge_sync_retries_total",
        "Total synchronization attempts that failed and scheduled a retry",
        &["account_id"]
    )
    .unwrap()
});

/// Subscribe attempts issued by the resubscription loop.
pub static SUBSCRIBE_ATTEMPTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "termbridge_subscribe_attempts_total",
        "Total subscribe calls issued by the resubscription loop",
        &["account_id"]
    )
    .unwrap()
});
