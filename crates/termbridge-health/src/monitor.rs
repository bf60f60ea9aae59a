//! Connection health monitor.
//!
//! Samples the connection once per second, accumulates uptime over sliding
//! 1h/1d/1w windows and judges quote streaming freshness against the symbol
//! quote session schedules.

use crate::uptime::UptimeWindow;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use termbridge_core::{Result, SymbolPrice, SymbolSpecification, SynchronizationListener};
use termbridge_telemetry::metrics::UPTIME_PERCENT;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Maximum age of a quote before a symbol stops counting as streamed.
const MIN_QUOTE_INTERVAL: Duration = Duration::from_secs(60);

/// Sampling cadence.
const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

const HOUR_WINDOW: usize = 3600;
const DAY_WINDOW: usize = 86400;
const WEEK_WINDOW: usize = 604800;

/// Read-back surface the monitor samples from its owning connection.
pub trait HealthInputs: Send + Sync {
    fn connected(&self) -> bool;
    fn connected_to_broker(&self) -> bool;
    fn synchronized(&self) -> bool;
    fn subscribed_symbols(&self) -> Vec<String>;
    fn specification(&self, symbol: &str) -> Option<SymbolSpecification>;
}

/// Point-in-time connection health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub connected: bool,
    pub connected_to_broker: bool,
    pub synchronized: bool,
    pub quote_streaming_healthy: bool,
    pub healthy: bool,
    pub message: String,
}

/// Last observed quote for a symbol.
#[derive(Debug, Clone)]
struct QuoteObservation {
    broker_time: NaiveDateTime,
    received_at: DateTime<Utc>,
}

struct Windows {
    hour: UptimeWindow,
    day: UptimeWindow,
    week: UptimeWindow,
}

struct MonitorInner {
    account_id: String,
    inputs: Arc<dyn HealthInputs>,
    quotes: RwLock<HashMap<String, QuoteObservation>>,
    windows: Mutex<Windows>,
}

/// Health monitor for one connection.
pub struct ConnectionHealthMonitor {
    inner: Arc<MonitorInner>,
    tick_token: Mutex<Option<CancellationToken>>,
}

impl ConnectionHealthMonitor {
    pub fn new(account_id: impl Into<String>, inputs: Arc<dyn HealthInputs>) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                account_id: account_id.into(),
                inputs,
                quotes: RwLock::new(HashMap::new()),
                windows: Mutex::new(Windows {
                    hour: UptimeWindow::new(HOUR_WINDOW),
                    day: UptimeWindow::new(DAY_WINDOW),
                    week: UptimeWindow::new(WEEK_WINDOW),
                }),
            }),
            tick_token: Mutex::new(None),
        }
    }

    /// Start the per-second sampling task. Idempotent.
    pub fn start(&self) {
        let mut slot = self.tick_token.lock();
        if slot.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let inner = self.inner.clone();
        let task_token = token.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SAMPLE_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => inner.record_sample(),
                    () = task_token.cancelled() => break,
                }
            }
        });
        *slot = Some(token);
    }

    /// Stop the sampling task.
    pub fn stop(&self) {
        if let Some(token) = self.tick_token.lock().take() {
            token.cancel();
        }
    }

    /// Uptime percentages keyed by window name ("1h", "1d", "1w").
    pub fn uptime(&self) -> HashMap<String, u32> {
        let windows = self.inner.windows.lock();
        HashMap::from([
            ("1h".to_string(), windows.hour.percent()),
            ("1d".to_string(), windows.day.percent()),
            ("1w".to_string(), windows.week.percent()),
        ])
    }

    /// Current health verdict with a human-readable message.
    pub fn health_status(&self) -> HealthStatus {
        self.inner.health_status()
    }

    #[cfg(test)]
    fn record_sample(&self) {
        self.inner.record_sample();
    }

    #[cfg(test)]
    fn set_quote_observation(
        &self,
        symbol: &str,
        broker_time: NaiveDateTime,
        received_at: DateTime<Utc>,
    ) {
        self.inner.quotes.write().insert(
            symbol.to_string(),
            QuoteObservation {
                broker_time,
                received_at,
            },
        );
    }
}

impl MonitorInner {
    fn record_sample(&self) {
        let status = self.health_status();
        let mut windows = self.windows.lock();
        windows.hour.record(status.healthy);
        windows.day.record(status.healthy);
        windows.week.record(status.healthy);

        UPTIME_PERCENT
            .with_label_values(&[&self.account_id, "1h"])
            .set(windows.hour.percent() as f64);
        UPTIME_PERCENT
            .with_label_values(&[&self.account_id, "1d"])
            .set(windows.day.percent() as f64);
        UPTIME_PERCENT
            .with_label_values(&[&self.account_id, "1w"])
            .set(windows.week.percent() as f64);
    }

    fn health_status(&self) -> HealthStatus {
        let connected = self.inputs.connected();
        let connected_to_broker = self.inputs.connected_to_broker();
        let synchronized = self.inputs.synchronized();
        let quote_streaming_healthy = self.quotes_healthy(Utc::now());
        let healthy = connected && connected_to_broker && synchronized && quote_streaming_healthy;

        let message = if healthy {
            "Connection to broker is stable. No health issues detected.".to_string()
        } else {
            let mut reasons = Vec::new();
            if !connected {
                reasons.push("connection to API server is not established or lost");
            }
            if !connected_to_broker {
                reasons.push("connection to broker is not established or lost");
            }
            if !synchronized {
                reasons.push("local terminal state is not synchronized to broker");
            }
            if !quote_streaming_healthy {
                reasons.push("quotes are not streamed from the broker within reasonable time");
            }
            format!("Connection is not healthy because {}.", reasons.join(" and "))
        };

        HealthStatus {
            connected,
            connected_to_broker,
            synchronized,
            quote_streaming_healthy,
            healthy,
            message,
        }
    }

    /// Quote streaming is healthy when some subscribed symbol delivered an
    /// in-session price recently, or when nothing is subscribed at all.
    fn quotes_healthy(&self, now: DateTime<Utc>) -> bool {
        let symbols = self.inputs.subscribed_symbols();
        if symbols.is_empty() {
            return true;
        }
        let freshness_floor =
            now - ChronoDuration::from_std(MIN_QUOTE_INTERVAL).unwrap_or(ChronoDuration::zero());
        let quotes = self.quotes.read();
        symbols.iter().any(|symbol| {
            let Some(observation) = quotes.get(symbol) else {
                return false;
            };
            if observation.received_at < freshness_floor {
                return false;
            }
            self.inputs
                .specification(symbol)
                .map(|spec| spec.in_quote_session(observation.broker_time))
                .unwrap_or(false)
        })
    }
}

#[async_trait]
impl SynchronizationListener for ConnectionHealthMonitor {
    async fn on_symbol_price_updated(
        &self,
        _instance_index: u32,
        price: SymbolPrice,
    ) -> Result<()> {
        debug!(symbol = %price.symbol, "Quote observed");
        self.inner.quotes.write().insert(
            price.symbol.clone(),
            QuoteObservation {
                broker_time: price.broker_time,
                received_at: Utc::now(),
            },
        );
        Ok(())
    }
}
