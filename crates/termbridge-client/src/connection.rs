//! Terminal connection facade.
//!
//! Aggregates the terminal state replica, history storage, health monitor,
//! synchronization controller and subscribe loop for one trading account,
//! and exposes the consumer-facing trade and query surface.

use crate::config::ConnectionOptions;
use crate::registry::ConnectionRegistry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use termbridge_core::{
    AccountInformation, Deal, Order, Position, Result, SymbolPrice, SymbolSpecification,
    SynchronizationListener, ReconnectListener, TerminalTransport, TradeRequest, TradeResponse,
};
use termbridge_health::{ConnectionHealthMonitor, HealthInputs, HealthStatus};
use termbridge_state::{HistoryStorage, MemoryHistoryStorage, TerminalState};
use termbridge_sync::{
    MarketDataSubscriptions, SubscribeTask, SynchronizationController, WaitSynchronizedOptions,
};
use tracing::{debug, info};

/// Health-probe view over the connection's shared parts. Composed of the
/// same `Arc`s the connection owns, so the monitor holds no reference back
/// to the facade itself.
struct ConnectionHealthInputs {
    terminal_state: Arc<TerminalState>,
    controller: Arc<SynchronizationController>,
    subscriptions: Arc<MarketDataSubscriptions>,
}

impl HealthInputs for ConnectionHealthInputs {
    fn connected(&self) -> bool {
        self.terminal_state.connected()
    }

    fn connected_to_broker(&self) -> bool {
        self.terminal_state.connected_to_broker()
    }

    fn synchronized(&self) -> bool {
        self.controller.synchronized()
    }

    fn subscribed_symbols(&self) -> Vec<String> {
        self.subscriptions.symbols()
    }

    fn specification(&self, symbol: &str) -> Option<SymbolSpecification> {
        self.terminal_state.specification(symbol)
    }
}

pub(crate) struct ConnectionInner {
    account_id: String,
    options: ConnectionOptions,
    transport: Arc<dyn TerminalTransport>,
    terminal_state: Arc<TerminalState>,
    history_storage: Arc<dyn HistoryStorage>,
    health_monitor: Arc<ConnectionHealthMonitor>,
    controller: Arc<SynchronizationController>,
    subscribe_task: Arc<SubscribeTask>,
    subscriptions: Arc<MarketDataSubscriptions>,
    registry: Weak<ConnectionRegistry>,
    closed: Arc<AtomicBool>,
}

/// Events the facade forwards to the synchronization controller. The facade
/// registers itself for these alongside the state and history listeners.
#[async_trait]
impl SynchronizationListener for ConnectionInner {
    async fn on_connected(&self, instance_index: u32, replicas: u32) -> Result<()> {
        self.controller.on_connected(instance_index, replicas).await
    }

    async fn on_disconnected(&self, instance_index: u32) -> Result<()> {
        self.controller.on_disconnected(instance_index).await
    }

    async fn on_deal_synchronization_finished(
        &self,
        instance_index: u32,
        synchronization_id: String,
    ) -> Result<()> {
        self.controller
            .on_deal_synchronization_finished(instance_index, synchronization_id)
            .await
    }

    async fn on_order_synchronization_finished(
        &self,
        instance_index: u32,
        synchronization_id: String,
    ) -> Result<()> {
        self.controller
            .on_order_synchronization_finished(instance_index, synchronization_id)
            .await
    }
}

#[async_trait]
impl ReconnectListener for ConnectionInner {
    async fn on_reconnected(&self) -> Result<()> {
        self.controller.on_reconnected().await
    }
}

/// A logical connection to one trading account's cloud terminal.
pub struct TerminalConnection {
    inner: Arc<ConnectionInner>,
}

impl TerminalConnection {
    /// Build a connection and wire its listeners into the transport. Called
    /// by [`ConnectionRegistry::connect`].
    pub(crate) fn new(
        account_id: String,
        options: ConnectionOptions,
        transport: Arc<dyn TerminalTransport>,
        registry: Weak<ConnectionRegistry>,
    ) -> Self {
        let terminal_state = Arc::new(TerminalState::new());
        let history_storage = Arc::new(MemoryHistoryStorage::new());
        let storage_listener: Arc<dyn SynchronizationListener> = history_storage.clone();
        let subscriptions = Arc::new(MarketDataSubscriptions::new());
        let closed = Arc::new(AtomicBool::new(false));

        let subscribe_task = Arc::new(SubscribeTask::new(
            account_id.clone(),
            transport.clone(),
            closed.clone(),
            options.retry.subscribe_backoff_base_in_seconds,
            options.retry.subscribe_backoff_cap_in_seconds,
        ));
        let controller = Arc::new(SynchronizationController::new(
            account_id.clone(),
            options.application.clone(),
            options.history_start_time,
            transport.clone(),
            history_storage.clone(),
            subscriptions.clone(),
            subscribe_task.clone(),
            options.retry.clone(),
        ));
        let health_monitor = Arc::new(ConnectionHealthMonitor::new(
            account_id.clone(),
            Arc::new(ConnectionHealthInputs {
                terminal_state: terminal_state.clone(),
                controller: controller.clone(),
                subscriptions: subscriptions.clone(),
            }),
        ));

        let inner = Arc::new(ConnectionInner {
            account_id: account_id.clone(),
            options,
            transport,
            terminal_state,
            history_storage,
            health_monitor,
            controller,
            subscribe_task,
            subscriptions,
            registry,
            closed,
        });

        // Listener order matters: replica and history ingest before the
        // controller reacts to the same frame.
        inner.transport.add_synchronization_listener(
            &account_id,
            inner.terminal_state.clone() as Arc<dyn SynchronizationListener>,
        );
        inner
            .transport
            .add_synchronization_listener(&account_id, storage_listener);
        inner.transport.add_synchronization_listener(
            &account_id,
            inner.health_monitor.clone() as Arc<dyn SynchronizationListener>,
        );
        inner
            .transport
            .add_synchronization_listener(&account_id, inner.clone());
        inner.transport.add_reconnect_listener(inner.clone());
        inner.health_monitor.start();

        info!(account_id = %inner.account_id, "Terminal connection created");
        Self { inner }
    }

    pub fn account_id(&self) -> &str {
        &self.inner.account_id
    }

    pub fn application(&self) -> &str {
        &self.inner.options.application
    }

    /// Options the connection was opened with, including the packet ordering
    /// timeout the transport layer configures its orderer from.
    pub fn options(&self) -> &ConnectionOptions {
        &self.inner.options
    }

    /// Prepare the history storage.
    pub async fn initialize(&self) -> Result<()> {
        self.inner.history_storage.initialize().await
    }

    /// Kick off the resubscription loop. A no-op when the connection is
    /// closed or a loop is already running.
    pub fn subscribe(&self) {
        if self.inner.closed.load(Ordering::SeqCst) {
            return;
        }
        let task = self.inner.subscribe_task.clone();
        tokio::spawn(task.subscribe());
    }

    /// Record a market-data subscription and request streaming.
    pub async fn subscribe_to_market_data(&self, symbol: &str, instance_index: u32) -> Result<()> {
        self.inner.subscriptions.add(symbol);
        self.inner
            .transport
            .subscribe_to_market_data(&self.inner.account_id, instance_index, symbol)
            .await
    }

    /// Stop streaming a symbol. The symbol stays in the subscription set so
    /// a later resynchronization restores it.
    pub async fn unsubscribe_from_market_data(
        &self,
        symbol: &str,
        instance_index: u32,
    ) -> Result<()> {
        self.inner.subscriptions.add(symbol);
        self.inner
            .transport
            .unsubscribe_from_market_data(&self.inner.account_id, instance_index, symbol)
            .await
    }

    /// Symbols requested for streaming on this connection.
    pub fn subscribed_symbols(&self) -> Vec<String> {
        self.inner.subscriptions.symbols()
    }

    /// Execute a trade against the terminal.
    pub async fn trade(&self, request: TradeRequest) -> Result<TradeResponse> {
        request.validate()?;
        self.inner
            .transport
            .trade(&self.inner.account_id, &request)
            .await
    }

    pub async fn get_account_information(&self) -> Result<AccountInformation> {
        self.inner
            .transport
            .get_account_information(&self.inner.account_id)
            .await
    }

    pub async fn get_positions(&self) -> Result<Vec<Position>> {
        self.inner.transport.get_positions(&self.inner.account_id).await
    }

    pub async fn get_position(&self, position_id: &str) -> Result<Position> {
        self.inner
            .transport
            .get_position(&self.inner.account_id, position_id)
            .await
    }

    pub async fn get_orders(&self) -> Result<Vec<Order>> {
        self.inner.transport.get_orders(&self.inner.account_id).await
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        self.inner
            .transport
            .get_order(&self.inner.account_id, order_id)
            .await
    }

    pub async fn get_history_orders_by_ticket(&self, ticket: &str) -> Result<Vec<Order>> {
        self.inner
            .transport
            .get_history_orders_by_ticket(&self.inner.account_id, ticket)
            .await
    }

    pub async fn get_history_orders_by_position(&self, position_id: &str) -> Result<Vec<Order>> {
        self.inner
            .transport
            .get_history_orders_by_position(&self.inner.account_id, position_id)
            .await
    }

    pub async fn get_history_orders_by_time_range(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Order>> {
        self.inner
            .transport
            .get_history_orders_by_time_range(
                &self.inner.account_id,
                start_time,
                end_time,
                offset,
                limit,
            )
            .await
    }

    pub async fn get_deals_by_ticket(&self, ticket: &str) -> Result<Vec<Deal>> {
        self.inner
            .transport
            .get_deals_by_ticket(&self.inner.account_id, ticket)
            .await
    }

    pub async fn get_deals_by_position(&self, position_id: &str) -> Result<Vec<Deal>> {
        self.inner
            .transport
            .get_deals_by_position(&self.inner.account_id, position_id)
            .await
    }

    pub async fn get_deals_by_time_range(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Deal>> {
        self.inner
            .transport
            .get_deals_by_time_range(&self.inner.account_id, start_time, end_time, offset, limit)
            .await
    }

    pub async fn get_symbol_specification(&self, symbol: &str) -> Result<SymbolSpecification> {
        self.inner
            .transport
            .get_symbol_specification(&self.inner.account_id, symbol)
            .await
    }

    pub async fn get_symbol_price(&self, symbol: &str) -> Result<SymbolPrice> {
        self.inner
            .transport
            .get_symbol_price(&self.inner.account_id, symbol)
            .await
    }

    pub async fn save_uptime(&self, uptime: HashMap<String, u32>) -> Result<()> {
        self.inner
            .transport
            .save_uptime(&self.inner.account_id, uptime)
            .await
    }

    /// Clear local history, then delete the server-side history for an
    /// application.
    pub async fn remove_history(&self, application: Option<&str>) -> Result<()> {
        self.inner.history_storage.clear().await?;
        self.inner
            .transport
            .remove_history(&self.inner.account_id, application)
            .await
    }

    /// Clear local history, then delete all server-side application state.
    pub async fn remove_application(&self) -> Result<()> {
        self.inner.history_storage.clear().await?;
        self.inner
            .transport
            .remove_application(&self.inner.account_id)
            .await
    }

    /// Force the transport to re-establish its stream.
    pub async fn reconnect(&self) -> Result<()> {
        self.inner.transport.reconnect(&self.inner.account_id).await
    }

    /// Whether a synchronization attempt completed both history downloads.
    pub fn is_synchronized(
        &self,
        instance_index: Option<u32>,
        synchronization_id: Option<&str>,
    ) -> bool {
        self.inner
            .controller
            .is_synchronized(instance_index, synchronization_id)
    }

    /// Whether any replica finished its current synchronization attempt.
    pub fn synchronized(&self) -> bool {
        self.inner.controller.synchronized()
    }

    /// Wait for synchronization to complete locally and server-side.
    pub async fn wait_synchronized(&self, options: WaitSynchronizedOptions) -> Result<()> {
        self.inner.controller.wait_synchronized(options).await
    }

    pub fn terminal_state(&self) -> Arc<TerminalState> {
        self.inner.terminal_state.clone()
    }

    pub fn history_storage(&self) -> Arc<dyn HistoryStorage> {
        self.inner.history_storage.clone()
    }

    pub fn health_status(&self) -> HealthStatus {
        self.inner.health_monitor.health_status()
    }

    pub fn uptime(&self) -> HashMap<String, u32> {
        self.inner.health_monitor.uptime()
    }

    pub fn closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Close the connection. Idempotent and terminal: unsubscribes the
    /// transport, detaches listeners, removes the connection from its
    /// registry and stops the health monitor.
    pub async fn close(&self) -> Result<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.inner
            .transport
            .unsubscribe(&self.inner.account_id)
            .await?;
        self.inner.subscribe_task.cancel_pending();
        self.inner
            .transport
            .remove_synchronization_listeners(&self.inner.account_id);
        if let Some(registry) = self.inner.registry.upgrade() {
            registry.remove(&self.inner.account_id);
        }
        self.inner.health_monitor.stop();
        self.inner.closed.store(true, Ordering::SeqCst);
        debug!(account_id = %self.inner.account_id, "Terminal connection closed");
        Ok(())
    }
}
