//! Terminal transport interface.
//!
//! The websocket client that actually talks to the cloud terminal lives
//! outside this workspace; the synchronization core drives it through this
//! trait and receives events back through the listener traits. The transport
//! serializes frame delivery per account, so implementations need no
//! additional ordering guarantees beyond the packet orderer's output.

use crate::error::Result;
use crate::listener::{ReconnectListener, SynchronizationListener};
use crate::trade::{TradeRequest, TradeResponse};
use crate::types::{AccountInformation, Deal, Order, Position, SymbolPrice, SymbolSpecification};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Outbound surface of the streaming terminal transport.
#[async_trait]
pub trait TerminalTransport: Send + Sync {
    /// Attach a synchronization listener for an account. Listeners receive
    /// frames in the packet orderer's output order.
    fn add_synchronization_listener(
        &self,
        account_id: &str,
        listener: Arc<dyn SynchronizationListener>,
    );

    /// Detach every synchronization listener registered for an account.
    fn remove_synchronization_listeners(&self, account_id: &str);

    /// Attach a transport-wide reconnect listener.
    fn add_reconnect_listener(&self, listener: Arc<dyn ReconnectListener>);

    /// Ask the server to start streaming events for an account.
    async fn subscribe(&self, account_id: &str) -> Result<()>;

    /// Stop streaming events for an account.
    async fn unsubscribe(&self, account_id: &str) -> Result<()>;

    /// Request a state synchronization for one replica, downloading history
    /// from the given starting points.
    async fn synchronize(
        &self,
        account_id: &str,
        instance_index: u32,
        synchronization_id: &str,
        starting_history_order_time: DateTime<Utc>,
        starting_deal_time: DateTime<Utc>,
    ) -> Result<()>;

    /// Server-side wait for applications matching a pattern to finish
    /// synchronizing.
    async fn wait_synchronized(
        &self,
        account_id: &str,
        instance_index: Option<u32>,
        application_pattern: &str,
        timeout_in_seconds: u64,
    ) -> Result<()>;

    async fn subscribe_to_market_data(
        &self,
        account_id: &str,
        instance_index: u32,
        symbol: &str,
    ) -> Result<()>;

    async fn unsubscribe_from_market_data(
        &self,
        account_id: &str,
        instance_index: u32,
        symbol: &str,
    ) -> Result<()>;

    /// Execute a trade. Non-success terminal results surface as
    /// [`TerminalError::Trade`](crate::error::TerminalError::Trade).
    async fn trade(&self, account_id: &str, request: &TradeRequest) -> Result<TradeResponse>;

    /// Delete server-side history for an application.
    async fn remove_history(&self, account_id: &str, application: Option<&str>) -> Result<()>;

    /// Delete all server-side state for the connection's application.
    async fn remove_application(&self, account_id: &str) -> Result<()>;

    async fn get_account_information(&self, account_id: &str) -> Result<AccountInformation>;

    async fn get_positions(&self, account_id: &str) -> Result<Vec<Position>>;

    async fn get_position(&self, account_id: &str, position_id: &str) -> Result<Position>;

    async fn get_orders(&self, account_id: &str) -> Result<Vec<Order>>;

    async fn get_order(&self, account_id: &str, order_id: &str) -> Result<Order>;

    async fn get_history_orders_by_ticket(
        &self,
        account_id: &str,
        ticket: &str,
    ) -> Result<Vec<Order>>;

    async fn get_history_orders_by_position(
        &self,
        account_id: &str,
        position_id: &str,
    ) -> Result<Vec<Order>>;

    async fn get_history_orders_by_time_range(
        &self,
        account_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Order>>;

    async fn get_deals_by_ticket(&self, account_id: &str, ticket: &str) -> Result<Vec<Deal>>;

    async fn get_deals_by_position(&self, account_id: &str, position_id: &str)
        -> Result<Vec<Deal>>;

    async fn get_deals_by_time_range(
        &self,
        account_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Deal>>;

    async fn get_symbol_specification(
        &self,
        account_id: &str,
        symbol: &str,
    ) -> Result<SymbolSpecification>;

    async fn get_symbol_price(&self, account_id: &str, symbol: &str) -> Result<SymbolPrice>;

    /// Push locally measured uptime percentages (window name to percent).
    async fn save_uptime(&self, account_id: &str, uptime: HashMap<String, u32>) -> Result<()>;

    /// Force the transport to drop and re-establish its stream.
    async fn reconnect(&self, account_id: &str) -> Result<()>;
}
