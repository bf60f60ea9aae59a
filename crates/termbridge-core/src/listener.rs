//! Listener traits for transport-delivered events.
//!
//! The synchronization listener is the dispatch point for ordered frames:
//! the terminal state, history storage, health monitor and the connection
//! facade all implement the subset of hooks they care about. Every hook has
//! a default no-op body.

use crate::error::Result;
use crate::types::{AccountInformation, Deal, Order, Position, SymbolPrice, SymbolSpecification};
use async_trait::async_trait;

/// Receives synchronization events for one account, in packet order.
#[async_trait]
pub trait SynchronizationListener: Send + Sync {
    /// A replica established its terminal connection. `replicas` is the
    /// current replica count for the account.
    async fn on_connected(&self, _instance_index: u32, _replicas: u32) -> Result<()> {
        Ok(())
    }

    /// A replica lost its terminal connection.
    async fn on_disconnected(&self, _instance_index: u32) -> Result<()> {
        Ok(())
    }

    /// Connectivity between the terminal and the broker changed.
    async fn on_broker_connection_status_changed(
        &self,
        _instance_index: u32,
        _connected: bool,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_account_information_updated(
        &self,
        _instance_index: u32,
        _account_information: AccountInformation,
    ) -> Result<()> {
        Ok(())
    }

    /// Initial sync delivered the full position list.
    async fn on_positions_replaced(
        &self,
        _instance_index: u32,
        _positions: Vec<Position>,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_position_updated(&self, _instance_index: u32, _position: Position) -> Result<()> {
        Ok(())
    }

    async fn on_position_removed(&self, _instance_index: u32, _position_id: String) -> Result<()> {
        Ok(())
    }

    /// Initial sync delivered the full pending-order list.
    async fn on_orders_replaced(&self, _instance_index: u32, _orders: Vec<Order>) -> Result<()> {
        Ok(())
    }

    async fn on_order_updated(&self, _instance_index: u32, _order: Order) -> Result<()> {
        Ok(())
    }

    async fn on_order_completed(&self, _instance_index: u32, _order_id: String) -> Result<()> {
        Ok(())
    }

    async fn on_history_order_added(&self, _instance_index: u32, _order: Order) -> Result<()> {
        Ok(())
    }

    async fn on_deal_added(&self, _instance_index: u32, _deal: Deal) -> Result<()> {
        Ok(())
    }

    /// Deal history finished downloading for a synchronization attempt.
    async fn on_deal_synchronization_finished(
        &self,
        _instance_index: u32,
        _synchronization_id: String,
    ) -> Result<()> {
        Ok(())
    }

    /// Order history finished downloading for a synchronization attempt.
    async fn on_order_synchronization_finished(
        &self,
        _instance_index: u32,
        _synchronization_id: String,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_symbol_specification_updated(
        &self,
        _instance_index: u32,
        _specification: SymbolSpecification,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_symbol_price_updated(
        &self,
        _instance_index: u32,
        _price: SymbolPrice,
    ) -> Result<()> {
        Ok(())
    }
}

/// Notified when the transport re-establishes its stream.
#[async_trait]
pub trait ReconnectListener: Send + Sync {
    async fn on_reconnected(&self) -> Result<()>;
}
