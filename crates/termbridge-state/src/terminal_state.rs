//! Terminal state replica.
//!
//! Keeps a read-only local copy of the server-side terminal: connectedness
//! flags, account information, positions and pending orders per replica,
//! plus connection-wide symbol specifications and prices. Mutation happens
//! exclusively through the synchronization listener hooks; consumer code only
//! reads.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use termbridge_core::{
    AccountInformation, Order, Position, Result, SymbolPrice, SymbolSpecification,
    SynchronizationListener,
};
use tracing::debug;

/// Replica data for one instance index.
#[derive(Debug, Default)]
struct InstanceReplica {
    connected: bool,
    connected_to_broker: bool,
    account_information: Option<AccountInformation>,
    positions: HashMap<String, Position>,
    orders: HashMap<String, Order>,
}

type ReplicaEntry = Arc<RwLock<InstanceReplica>>;

/// In-memory replica of the terminal state for one account.
#[derive(Default)]
pub struct TerminalState {
    replicas: DashMap<u32, ReplicaEntry>,
    specifications: DashMap<String, SymbolSpecification>,
    prices: DashMap<String, SymbolPrice>,
}

impl TerminalState {
    pub fn new() -> Self {
        Self::default()
    }

    fn replica(&self, instance_index: u32) -> ReplicaEntry {
        self.replicas
            .entry(instance_index)
            .or_insert_with(|| Arc::new(RwLock::new(InstanceReplica::default())))
            .clone()
    }

    /// The lowest-index connected replica, falling back to the lowest index.
    fn primary_replica(&self) -> Option<ReplicaEntry> {
        let mut indices: Vec<u32> = self.replicas.iter().map(|e| *e.key()).collect();
        indices.sort_unstable();
        let connected = indices
            .iter()
            .find(|idx| {
                self.replicas
                    .get(*idx)
                    .map(|e| e.read().connected)
                    .unwrap_or(false)
            })
            .or_else(|| indices.first());
        connected.and_then(|idx| self.replicas.get(idx).map(|e| e.clone()))
    }

    /// Whether any replica has an established terminal connection.
    pub fn connected(&self) -> bool {
        self.replicas.iter().any(|e| e.value().read().connected)
    }

    /// Whether any replica reports terminal-to-broker connectivity.
    pub fn connected_to_broker(&self) -> bool {
        self.replicas
            .iter()
            .any(|e| e.value().read().connected_to_broker)
    }

    pub fn account_information(&self) -> Option<AccountInformation> {
        self.primary_replica()
            .and_then(|e| e.read().account_information.clone())
    }

    pub fn positions(&self) -> Vec<Position> {
        self.primary_replica()
            .map(|e| e.read().positions.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn position(&self, position_id: &str) -> Option<Position> {
        self.primary_replica()
            .and_then(|e| e.read().positions.get(position_id).cloned())
    }

    pub fn orders(&self) -> Vec<Order> {
        self.primary_replica()
            .map(|e| e.read().orders.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.primary_replica()
            .and_then(|e| e.read().orders.get(order_id).cloned())
    }

    /// Contract specification for a symbol, including quote sessions.
    pub fn specification(&self, symbol: &str) -> Option<SymbolSpecification> {
        self.specifications.get(symbol).map(|e| e.clone())
    }

    /// Latest streamed price for a symbol.
    pub fn price(&self, symbol: &str) -> Option<SymbolPrice> {
        self.prices.get(symbol).map(|e| e.clone())
    }
}

#[async_trait]
impl SynchronizationListener for TerminalState {
    async fn on_connected(&self, instance_index: u32, _replicas: u32) -> Result<()> {
        let replica = self.replica(instance_index);
        let mut guard = replica.write();
        guard.connected = true;
        // A fresh synchronization follows; replica data from the previous
        // session must not survive it.
        guard.account_information = None;
        guard.positions.clear();
        guard.orders.clear();
        debug!(instance_index, "Terminal replica connected");
        Ok(())
    }

    async fn on_disconnected(&self, instance_index: u32) -> Result<()> {
        let replica = self.replica(instance_index);
        let mut guard = replica.write();
        guard.connected = false;
        guard.connected_to_broker = false;
        debug!(instance_index, "Terminal replica disconnected");
        Ok(())
    }

    async fn on_broker_connection_status_changed(
        &self,
        instance_index: u32,
        connected: bool,
    ) -> Result<()> {
        self.replica(instance_index).write().connected_to_broker = connected;
        Ok(())
    }

    async fn on_account_information_updated(
        &self,
        instance_index: u32,
        account_information: AccountInformation,
    ) -> Result<()> {
        self.replica(instance_index).write().account_information = Some(account_information);
        Ok(())
    }

    async fn on_positions_replaced(
        &self,
        instance_index: u32,
        positions: Vec<Position>,
    ) -> Result<()> {
        let replica = self.replica(instance_index);
        let mut guard = replica.write();
        guard.positions = positions
            .into_iter()
            .map(|position| (position.id.clone(), position))
            .collect();
        Ok(())
    }

    async fn on_position_updated(&self, instance_index: u32, position: Position) -> Result<()> {
        self.replica(instance_index)
            .write()
            .positions
            .insert(position.id.clone(), position);
        Ok(())
    }

    async fn on_position_removed(&self, instance_index: u32, position_id: String) -> Result<()> {
        self.replica(instance_index)
            .write()
            .positions
            .remove(&position_id);
        Ok(())
    }

    async fn on_orders_replaced(&self, instance_index: u32, orders: Vec<Order>) -> Result<()> {
        let replica = self.replica(instance_index);
        let mut guard = replica.write();
        guard.orders = orders
            .into_iter()
            .map(|order| (order.id.clone(), order))
            .collect();
        Ok(())
    }

    async fn on_order_updated(&self, instance_index: u32, order: Order) -> Result<()> {
        self.replica(instance_index)
            .write()
            .orders
            .insert(order.id.clone(), order);
        Ok(())
    }

    async fn on_order_completed(&self, instance_index: u32, order_id: String) -> Result<()> {
        self.replica(instance_index).write().orders.remove(&order_id);
        Ok(())
    }

    async fn on_symbol_specification_updated(
        &self,
        _instance_index: u32,
        specification: SymbolSpecification,
    ) -> Result<()> {
        self.specifications
            .insert(specification.symbol.clone(), specification);
        Ok(())
    }

    async fn on_symbol_price_updated(
        &self,
        _instance_index: u32,
        price: SymbolPrice,
    ) -> Result<()> {
        self.prices.insert(price.symbol.clone(), price);
        Ok(())
    }
}
