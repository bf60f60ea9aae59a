//! History storage.
//!
//! Append-only record of deals and history orders ingested from the
//! synchronization stream, queried by the sync controller for the starting
//! points of the next synchronization.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use termbridge_core::{Deal, Order, Result, SynchronizationListener};

/// Storage backend for account history.
///
/// Implementations also act as synchronization listeners to ingest new
/// entries as they stream in.
#[async_trait]
pub trait HistoryStorage: SynchronizationListener {
    /// Prepare the storage. May load previously persisted state.
    async fn initialize(&self) -> Result<()>;

    /// Timestamp of the most recent history order seen for a replica, or the
    /// Unix epoch when none was.
    async fn last_history_order_time(&self, instance_index: u32) -> Result<DateTime<Utc>>;

    /// Timestamp of the most recent deal seen for a replica, or the Unix
    /// epoch when none was.
    async fn last_deal_time(&self, instance_index: u32) -> Result<DateTime<Utc>>;

    /// Wipe all recorded history.
    async fn clear(&self) -> Result<()>;
}

/// History storage kept entirely in memory.
#[derive(Default)]
pub struct MemoryHistoryStorage {
    deals: RwLock<Vec<Deal>>,
    history_orders: RwLock<Vec<Order>>,
    last_deal_time: RwLock<HashMap<u32, DateTime<Utc>>>,
    last_history_order_time: RwLock<HashMap<u32, DateTime<Utc>>>,
}

impl MemoryHistoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded deals, sorted by execution time.
    pub fn deals(&self) -> Vec<Deal> {
        self.deals.read().clone()
    }

    /// Snapshot of recorded history orders, sorted by completion time.
    pub fn history_orders(&self) -> Vec<Order> {
        self.history_orders.read().clone()
    }
}

/// Completion timestamp used to sort and track history orders.
fn history_order_time(order: &Order) -> DateTime<Utc> {
    order.done_time.unwrap_or(order.time)
}

#[async_trait]
impl HistoryStorage for MemoryHistoryStorage {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn last_history_order_time(&self, instance_index: u32) -> Result<DateTime<Utc>> {
        Ok(self
            .last_history_order_time
            .read()
            .get(&instance_index)
            .copied()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
    }

    async fn last_deal_time(&self, instance_index: u32) -> Result<DateTime<Utc>> {
        Ok(self
            .last_deal_time
            .read()
            .get(&instance_index)
            .copied()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
    }

    async fn clear(&self) -> Result<()> {
        self.deals.write().clear();
        self.history_orders.write().clear();
        self.last_deal_time.write().clear();
        self.last_history_order_time.write().clear();
        Ok(())
    }
}

#[async_trait]
impl SynchronizationListener for MemoryHistoryStorage {
    async fn on_deal_added(&self, instance_index: u32, deal: Deal) -> Result<()> {
        {
            let mut deals = self.deals.write();
            if deals.iter().any(|existing| existing.id == deal.id) {
                return Ok(());
            }
            let position = deals
                .iter()
                .position(|existing| existing.time > deal.time)
                .unwrap_or(deals.len());
            deals.insert(position, deal.clone());
        }
        let mut last = self.last_deal_time.write();
        let entry = last
            .entry(instance_index)
            .or_insert(DateTime::<Utc>::UNIX_EPOCH);
        if deal.time > *entry {
            *entry = deal.time;
        }
        Ok(())
    }

    async fn on_history_order_added(&self, instance_index: u32, order: Order) -> Result<()> {
        let time = history_order_time(&order);
        {
            let mut orders = self.history_orders.write();
            if let Some(existing) = orders.iter_mut().find(|existing| existing.id == order.id) {
                // Later update for the same ticket wins.
                *existing = order.clone();
            } else {
                let position = orders
                    .iter()
                    .position(|existing| history_order_time(existing) > time)
                    .unwrap_or(orders.len());
                orders.insert(position, order.clone());
            }
        }
        let mut last = self.last_history_order_time.write();
        let entry = last
            .entry(instance_index)
            .or_insert(DateTime::<Utc>::UNIX_EPOCH);
        if time > *entry {
            *entry = time;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use termbridge_core::{DealType, OrderState, OrderType};

    fn utc(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn deal(id: &str, secs: i64) -> Deal {
        Deal {
            id: id.to_string(),
            deal_type: DealType::Buy,
            symbol: Some("EURUSD".to_string()),
            volume: Some(Decimal::ONE),
            price: Some(Decimal::new(11, 1)),
            profit: None,
            swap: None,
            commission: None,
            time: utc(secs),
            order_id: None,
            position_id: None,
            magic: None,
            comment: None,
            client_id: None,
        }
    }

    fn history_order(id: &str, done_secs: i64) -> Order {
        Order {
            id: id.to_string(),
            order_type: OrderType::Buy,
            state: OrderState::Filled,
            symbol: "EURUSD".to_string(),
            volume: Decimal::ONE,
            current_volume: None,
            open_price: None,
            stop_loss: None,
            take_profit: None,
            time: utc(done_secs - 1),
            done_time: Some(utc(done_secs)),
            position_id: None,
            magic: None,
            comment: None,
            client_id: None,
        }
    }

    #[tokio::test]
    async fn test_last_times_default_to_epoch() {
        let storage = MemoryHistoryStorage::new();
        assert_eq!(
            storage.last_deal_time(0).await.unwrap(),
            DateTime::<Utc>::UNIX_EPOCH
        );
        assert_eq!(
            storage.last_history_order_time(3).await.unwrap(),
            DateTime::<Utc>::UNIX_EPOCH
        );
    }

    #[tokio::test]
    async fn test_deal_ingestion_tracks_per_instance_max() {
        let storage = MemoryHistoryStorage::new();
        storage.on_deal_added(0, deal("1", 100)).await.unwrap();
        storage.on_deal_added(0, deal("2", 50)).await.unwrap();
        storage.on_deal_added(1, deal("3", 200)).await.unwrap();

        assert_eq!(storage.last_deal_time(0).await.unwrap(), utc(100));
        assert_eq!(storage.last_deal_time(1).await.unwrap(), utc(200));
    }

    #[tokio::test]
    async fn test_deals_deduplicate_and_stay_sorted() {
        let storage = MemoryHistoryStorage::new();
        storage.on_deal_added(0, deal("1", 100)).await.unwrap();
        storage.on_deal_added(0, deal("1", 100)).await.unwrap();
        storage.on_deal_added(0, deal("2", 50)).await.unwrap();

        let deals = storage.deals();
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[0].id, "2");
        assert_eq!(deals[1].id, "1");
    }

    #[tokio::test]
    async fn test_history_order_update_replaces_same_ticket() {
        let storage = MemoryHistoryStorage::new();
        let mut first = history_order("10", 100);
        first.state = OrderState::Partial;
        storage.on_history_order_added(0, first).await.unwrap();
        storage
            .on_history_order_added(0, history_order("10", 100))
            .await
            .unwrap();

        let orders = storage.history_orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].state, OrderState::Filled);
        assert_eq!(storage.last_history_order_time(0).await.unwrap(), utc(100));
    }

    #[tokio::test]
    async fn test_clear_wipes_everything() {
        let storage = MemoryHistoryStorage::new();
        storage.on_deal_added(0, deal("1", 100)).await.unwrap();
        storage
            .on_history_order_added(0, history_order("10", 100))
            .await
            .unwrap();
        storage.clear().await.unwrap();

        assert!(storage.deals().is_empty());
        assert!(storage.history_orders().is_empty());
        assert_eq!(
            storage.last_deal_time(0).await.unwrap(),
            DateTime::<Utc>::UNIX_EPOCH
        );
    }
}
