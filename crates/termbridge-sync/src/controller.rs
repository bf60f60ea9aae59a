//! Synchronization controller.
//!
//! Drives the per-replica synchronization state machine: issues synchronize
//! requests, retries with doubling delays, tracks deal/order completion
//! tokens, reacts to connect/disconnect/reconnect signals and exposes the
//! `wait_synchronized` barrier.

use crate::options::{RetryOptions, WaitSynchronizedOptions};
use crate::state::InstanceSyncState;
use crate::subscribe::SubscribeTask;
use crate::subscriptions::MarketDataSubscriptions;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use termbridge_core::{
    random_synchronization_id, Result, TerminalError, TerminalTransport,
};
use termbridge_state::HistoryStorage;
use termbridge_telemetry::metrics::{CONNECTION_SYNCHRONIZED, SYNC_RETRIES_TOTAL};
use tracing::{debug, info, warn};

struct ControllerInner {
    account_id: String,
    application: String,
    history_start_time: Option<DateTime<Utc>>,
    transport: Arc<dyn TerminalTransport>,
    history_storage: Arc<dyn HistoryStorage>,
    subscriptions: Arc<MarketDataSubscriptions>,
    subscribe_task: Arc<SubscribeTask>,
    retry: RetryOptions,
    states: Mutex<HashMap<u32, InstanceSyncState>>,
}

/// Per-connection synchronization state machine.
pub struct SynchronizationController {
    inner: Arc<ControllerInner>,
}

impl SynchronizationController {
    pub fn new(
        account_id: impl Into<String>,
        application: impl Into<String>,
        history_start_time: Option<DateTime<Utc>>,
        transport: Arc<dyn TerminalTransport>,
        history_storage: Arc<dyn HistoryStorage>,
        subscriptions: Arc<MarketDataSubscriptions>,
        subscribe_task: Arc<SubscribeTask>,
        retry: RetryOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                account_id: account_id.into(),
                application: application.into(),
                history_start_time,
                transport,
                history_storage,
                subscriptions,
                subscribe_task,
                retry,
                states: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Whether any replica finished its current synchronization attempt.
    pub fn synchronized(&self) -> bool {
        self.inner
            .states
            .lock()
            .values()
            .any(|state| state.synchronized)
    }

    /// Whether a synchronization attempt completed both its order and deal
    /// downloads. Without an explicit id, each replica is checked against its
    /// own latest attempt; with `instance_index`, only that replica counts.
    pub fn is_synchronized(
        &self,
        instance_index: Option<u32>,
        synchronization_id: Option<&str>,
    ) -> bool {
        let states = self.inner.states.lock();
        let check = |state: &InstanceSyncState| {
            let id = synchronization_id
                .map(str::to_string)
                .or_else(|| state.last_synchronization_id.clone());
            match id {
                Some(id) => {
                    state.orders_synchronized.contains(&id)
                        && state.deals_synchronized.contains(&id)
                }
                None => false,
            }
        };
        match instance_index {
            Some(index) => states.get(&index).map(check).unwrap_or(false),
            None => states.values().any(check),
        }
    }

    /// Poll until a synchronization attempt completes locally, then delegate
    /// the remaining time budget to the server-side wait.
    pub async fn wait_synchronized(&self, options: WaitSynchronizedOptions) -> Result<()> {
        let timeout = Duration::from_secs(options.timeout_in_seconds);
        let started = tokio::time::Instant::now();
        loop {
            if self.is_synchronized(
                options.instance_index,
                options.synchronization_id.as_deref(),
            ) {
                break;
            }
            if started.elapsed() >= timeout {
                return Err(TerminalError::Timeout {
                    account_id: self.inner.account_id.clone(),
                    synchronization_id: self.inner.timeout_synchronization_id(&options),
                });
            }
            tokio::time::sleep(Duration::from_millis(options.interval_in_milliseconds)).await;
        }

        let application_pattern = options.application_pattern.clone().unwrap_or_else(|| {
            if self.inner.application == "CopyFactory" {
                "CopyFactory.*|RPC".to_string()
            } else {
                "RPC".to_string()
            }
        });
        let time_left = timeout.saturating_sub(started.elapsed());
        self.inner
            .transport
            .wait_synchronized(
                &self.inner.account_id,
                options.instance_index,
                &application_pattern,
                time_left.as_secs(),
            )
            .await
    }

    /// A replica connected: stop the subscribe loop, make a fresh token the
    /// authoritative attempt and run the first synchronize inline. Replica
    /// states beyond the reported replica count are dropped, except the one
    /// that just announced itself.
    pub async fn on_connected(&self, instance_index: u32, replicas: u32) -> Result<()> {
        self.inner.subscribe_task.cancel_pending();
        let key = random_synchronization_id();
        {
            let mut states = self.inner.states.lock();
            let state = self.inner.state_entry(&mut states, instance_index);
            state.should_synchronize = Some(key.clone());
            state.synchronization_retry_interval_in_seconds =
                self.inner.retry.synchronization_retry_base_in_seconds;
            state.synchronized = false;
        }
        info!(
            account_id = %self.inner.account_id,
            instance_index,
            "Replica connected, starting synchronization"
        );
        self.inner
            .clone()
            .ensure_synchronized(instance_index, &key)
            .await;
        self.inner
            .states
            .lock()
            .retain(|index, _| *index < replicas || *index == instance_index);
        Ok(())
    }

    /// A replica disconnected: the in-flight attempt is abandoned and its
    /// token is kept for diagnostics.
    pub async fn on_disconnected(&self, instance_index: u32) -> Result<()> {
        {
            let mut states = self.inner.states.lock();
            if let Some(state) = states.get_mut(&instance_index) {
                state.last_disconnected_synchronization_id = state.last_synchronization_id.take();
                state.should_synchronize = None;
                state.synchronized = false;
                state.disconnected = true;
            }
        }
        self.inner.update_synchronized_metric();
        info!(
            account_id = %self.inner.account_id,
            instance_index,
            "Replica disconnected"
        );
        Ok(())
    }

    pub async fn on_deal_synchronization_finished(
        &self,
        instance_index: u32,
        synchronization_id: String,
    ) -> Result<()> {
        let mut states = self.inner.states.lock();
        let state = self.inner.state_entry(&mut states, instance_index);
        state.deals_synchronized.insert(synchronization_id);
        Ok(())
    }

    pub async fn on_order_synchronization_finished(
        &self,
        instance_index: u32,
        synchronization_id: String,
    ) -> Result<()> {
        let mut states = self.inner.states.lock();
        let state = self.inner.state_entry(&mut states, instance_index);
        state.orders_synchronized.insert(synchronization_id);
        Ok(())
    }

    /// The transport re-established its stream: restart the subscribe loop.
    pub async fn on_reconnected(&self) -> Result<()> {
        self.inner.subscribe_task.cancel_pending();
        let task = self.inner.subscribe_task.clone();
        tokio::spawn(task.subscribe());
        Ok(())
    }

    #[cfg(test)]
    fn state_snapshot(&self, instance_index: u32) -> Option<InstanceSyncState> {
        self.inner.states.lock().get(&instance_index).cloned()
    }
}

impl ControllerInner {
    fn state_entry<'a>(
        &self,
        states: &'a mut HashMap<u32, InstanceSyncState>,
        instance_index: u32,
    ) -> &'a mut InstanceSyncState {
        states.entry(instance_index).or_insert_with(|| {
            InstanceSyncState::new(instance_index, self.retry.synchronization_retry_base_in_seconds)
        })
    }

    fn update_synchronized_metric(&self) {
        let synchronized = self.states.lock().values().any(|state| state.synchronized);
        CONNECTION_SYNCHRONIZED
            .with_label_values(&[&self.account_id])
            .set(if synchronized { 1.0 } else { 0.0 });
    }

    /// Synchronization id used in a timeout message: explicit argument first,
    /// then the latest attempt, then the one captured at disconnect.
    fn timeout_synchronization_id(&self, options: &WaitSynchronizedOptions) -> String {
        if let Some(id) = &options.synchronization_id {
            return id.clone();
        }
        let states = self.states.lock();
        let candidates: Vec<&InstanceSyncState> = match options.instance_index {
            Some(index) => states.get(&index).into_iter().collect(),
            None => states.values().collect(),
        };
        candidates
            .iter()
            .find_map(|state| state.last_synchronization_id.clone())
            .or_else(|| {
                candidates
                    .iter()
                    .find_map(|state| state.last_disconnected_synchronization_id.clone())
            })
            .unwrap_or_else(|| "none".to_string())
    }

    /// Issue one synchronize request from the stored history starting points.
    async fn synchronize(&self, instance_index: u32) -> Result<String> {
        let history_start = self
            .history_start_time
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let starting_history_order_time = self
            .history_storage
            .last_history_order_time(instance_index)
            .await?
            .max(history_start);
        let starting_deal_time = self
            .history_storage
            .last_deal_time(instance_index)
            .await?
            .max(history_start);
        let synchronization_id = random_synchronization_id();
        {
            let mut states = self.states.lock();
            let state = self.state_entry(&mut states, instance_index);
            state.last_synchronization_id = Some(synchronization_id.clone());
        }
        debug!(
            account_id = %self.account_id,
            instance_index,
            synchronization_id = %synchronization_id,
            "Requesting synchronization"
        );
        self.transport
            .synchronize(
                &self.account_id,
                instance_index,
                &synchronization_id,
                starting_history_order_time,
                starting_deal_time,
            )
            .await?;
        Ok(synchronization_id)
    }

    /// One full synchronization attempt: request, then resubscribe every
    /// known market-data symbol. State flips to synchronized only when the
    /// whole attempt succeeded.
    async fn attempt_synchronize(&self, instance_index: u32) -> Result<()> {
        self.synchronize(instance_index).await?;
        for symbol in self.subscriptions.symbols() {
            self.transport
                .subscribe_to_market_data(&self.account_id, instance_index, &symbol)
                .await?;
        }
        {
            let mut states = self.states.lock();
            let state = self.state_entry(&mut states, instance_index);
            state.synchronized = true;
            state.disconnected = false;
            state.synchronization_retry_interval_in_seconds =
                self.retry.synchronization_retry_base_in_seconds;
        }
        self.update_synchronized_metric();
        Ok(())
    }

    /// First attempt runs inline; failures hand over to a detached retry
    /// loop bound to `key`.
    async fn ensure_synchronized(self: Arc<Self>, instance_index: u32, key: &str) {
        match self.attempt_synchronize(instance_index).await {
            Ok(()) => {}
            Err(error) => {
                warn!(
                    account_id = %self.account_id,
                    instance_index,
                    %error,
                    "Synchronization attempt failed"
                );
                SYNC_RETRIES_TOTAL
                    .with_label_values(&[&self.account_id])
                    .inc();
                if let Some(delay) = self.schedule_retry(instance_index, key) {
                    self.spawn_retry_loop(instance_index, key.to_string(), delay);
                }
            }
        }
    }

    /// Take the next retry delay if `key` is still authoritative.
    fn schedule_retry(&self, instance_index: u32, key: &str) -> Option<u64> {
        let mut states = self.states.lock();
        let state = states.get_mut(&instance_index)?;
        if !state.token_matches(key) {
            return None;
        }
        Some(state.take_retry_delay(self.retry.synchronization_retry_cap_in_seconds))
    }

    fn token_matches(&self, instance_index: u32, key: &str) -> bool {
        self.states
            .lock()
            .get(&instance_index)
            .map(|state| state.token_matches(key))
            .unwrap_or(false)
    }

    /// Detached retry loop. Every wakeup re-checks that `key` is still the
    /// authoritative token and abandons silently otherwise.
    fn spawn_retry_loop(self: Arc<Self>, instance_index: u32, key: String, first_delay: u64) {
        tokio::spawn(async move {
            let mut delay = first_delay;
            loop {
                tokio::time::sleep(Duration::from_secs(delay)).await;
                if !self.token_matches(instance_index, &key) {
                    return;
                }
                match self.attempt_synchronize(instance_index).await {
                    Ok(()) => return,
                    Err(error) => {
                        warn!(
                            account_id = %self.account_id,
                            instance_index,
                            %error,
                            "Synchronization retry failed"
                        );
                        SYNC_RETRIES_TOTAL
                            .with_label_values(&[&self.account_id])
                            .inc();
                        match self.schedule_retry(instance_index, &key) {
                            Some(next) => delay = next,
                            None => return,
                        }
                    }
                }
            }
        });
    }
}
