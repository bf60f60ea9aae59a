//! Mock terminal transport for integration tests.
//!
//! Stores registered listeners the way the real transport does, records
//! outbound calls, and routes pushed packets through a real packet orderer
//! before dispatching them to the listeners.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use termbridge_core::{
    AccountInformation, Deal, Order, Packet, Position, ReconnectListener, Result, SymbolPrice,
    SymbolSpecification, SynchronizationListener, TerminalError, TerminalTransport, TradeRequest,
    TradeResponse,
};
use termbridge_packets::{OutOfOrderListener, PacketOrderer};

struct IgnoreGaps;

impl OutOfOrderListener for IgnoreGaps {
    fn on_out_of_order_packet(
        &self,
        _account_id: &str,
        _instance_index: u32,
        _expected_sequence_number: u64,
        _actual_sequence_number: u64,
        _packet: &Packet,
        _received_at: DateTime<Utc>,
    ) {
    }
}

/// Records of outbound transport calls.
#[derive(Default)]
pub struct TransportCalls {
    pub synchronize: Vec<(u32, String, DateTime<Utc>, DateTime<Utc>)>,
    pub market_data_subscribe: Vec<(u32, String)>,
    pub market_data_unsubscribe: Vec<(u32, String)>,
    pub remove_history: Vec<Option<String>>,
    pub trades: Vec<TradeRequest>,
}

pub struct MockTransport {
    listeners: Mutex<HashMap<String, Vec<Arc<dyn SynchronizationListener>>>>,
    reconnect_listeners: Mutex<Vec<Arc<dyn ReconnectListener>>>,
    orderer: PacketOrderer,
    pub calls: Mutex<TransportCalls>,
    pub subscribe_calls: AtomicUsize,
    pub unsubscribe_calls: AtomicUsize,
    pub remove_application_calls: AtomicUsize,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            reconnect_listeners: Mutex::new(Vec::new()),
            orderer: PacketOrderer::new(
                Arc::new(IgnoreGaps),
                std::time::Duration::from_secs(60),
            ),
            calls: Mutex::new(TransportCalls::default()),
            subscribe_calls: AtomicUsize::new(0),
            unsubscribe_calls: AtomicUsize::new(0),
            remove_application_calls: AtomicUsize::new(0),
        }
    }
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn listener_count(&self, account_id: &str) -> usize {
        self.listeners
            .lock()
            .get(account_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn last_synchronization_id(&self) -> String {
        self.calls.lock().synchronize.last().unwrap().1.clone()
    }

    fn listeners_for(&self, account_id: &str) -> Vec<Arc<dyn SynchronizationListener>> {
        self.listeners
            .lock()
            .get(account_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn emit_connected(&self, account_id: &str, instance_index: u32, replicas: u32) {
        for listener in self.listeners_for(account_id) {
            listener
                .on_connected(instance_index, replicas)
                .await
                .unwrap();
        }
    }

    pub async fn emit_disconnected(&self, account_id: &str, instance_index: u32) {
        for listener in self.listeners_for(account_id) {
            listener.on_disconnected(instance_index).await.unwrap();
        }
    }

    pub async fn emit_order_synchronization_finished(
        &self,
        account_id: &str,
        instance_index: u32,
        synchronization_id: &str,
    ) {
        for listener in self.listeners_for(account_id) {
            listener
                .on_order_synchronization_finished(
                    instance_index,
                    synchronization_id.to_string(),
                )
                .await
                .unwrap();
        }
    }

    pub async fn emit_deal_synchronization_finished(
        &self,
        account_id: &str,
        instance_index: u32,
        synchronization_id: &str,
    ) {
        for listener in self.listeners_for(account_id) {
            listener
                .on_deal_synchronization_finished(instance_index, synchronization_id.to_string())
                .await
                .unwrap();
        }
    }

    /// Route a raw frame through the packet orderer and dispatch whatever
    /// comes out in order, the way the real transport does.
    pub async fn push_packet(&self, packet: Packet) {
        for ordered in self.orderer.restore_order(packet) {
            self.dispatch(ordered).await;
        }
    }

    async fn dispatch(&self, packet: Packet) {
        let instance_index = packet.instance();
        let listeners = self.listeners_for(&packet.account_id);
        match packet.packet_type.as_str() {
            "synchronizationStarted" => {}
            "authenticated" => {
                let replicas = packet
                    .body
                    .get("replicas")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(1) as u32;
                for listener in &listeners {
                    listener
                        .on_connected(instance_index, replicas)
                        .await
                        .unwrap();
                }
            }
            "disconnected" => {
                for listener in &listeners {
                    listener.on_disconnected(instance_index).await.unwrap();
                }
            }
            "status" => {
                let connected = packet
                    .body
                    .get("connected")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                for listener in &listeners {
                    listener
                        .on_broker_connection_status_changed(instance_index, connected)
                        .await
                        .unwrap();
                }
            }
            "accountInformation" => {
                let account: AccountInformation = serde_json::from_value(
                    packet.body.get("accountInformation").unwrap().clone(),
                )
                .unwrap();
                for listener in &listeners {
                    listener
                        .on_account_information_updated(instance_index, account.clone())
                        .await
                        .unwrap();
                }
            }
            "specifications" => {
                let specifications: Vec<SymbolSpecification> =
                    serde_json::from_value(packet.body.get("specifications").unwrap().clone())
                        .unwrap();
                for specification in specifications {
                    for listener in &listeners {
                        listener
                            .on_symbol_specification_updated(
                                instance_index,
                                specification.clone(),
                            )
                            .await
                            .unwrap();
                    }
                }
            }
            "prices" => {
                let prices: Vec<SymbolPrice> =
                    serde_json::from_value(packet.body.get("prices").unwrap().clone()).unwrap();
                for price in prices {
                    for listener in &listeners {
                        listener
                            .on_symbol_price_updated(instance_index, price.clone())
                            .await
                            .unwrap();
                    }
                }
            }
            "deals" => {
                let deals: Vec<Deal> =
                    serde_json::from_value(packet.body.get("deals").unwrap().clone()).unwrap();
                for deal in deals {
                    for listener in &listeners {
                        listener
                            .on_deal_added(instance_index, deal.clone())
                            .await
                            .unwrap();
                    }
                }
            }
            "historyOrders" => {
                let orders: Vec<Order> =
                    serde_json::from_value(packet.body.get("historyOrders").unwrap().clone())
                        .unwrap();
                for order in orders {
                    for listener in &listeners {
                        listener
                            .on_history_order_added(instance_index, order.clone())
                            .await
                            .unwrap();
                    }
                }
            }
            other => panic!("mock transport cannot dispatch packet type {other}"),
        }
    }
}

#[async_trait]
impl TerminalTransport for MockTransport {
    fn add_synchronization_listener(
        &self,
        account_id: &str,
        listener: Arc<dyn SynchronizationListener>,
    ) {
        self.listeners
            .lock()
            .entry(account_id.to_string())
            .or_default()
            .push(listener);
    }

    fn remove_synchronization_listeners(&self, account_id: &str) {
        self.listeners.lock().remove(account_id);
    }

    fn add_reconnect_listener(&self, listener: Arc<dyn ReconnectListener>) {
        self.reconnect_listeners.lock().push(listener);
    }

    async fn subscribe(&self, _account_id: &str) -> Result<()> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn unsubscribe(&self, _account_id: &str) -> Result<()> {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn synchronize(
        &self,
        _account_id: &str,
        instance_index: u32,
        synchronization_id: &str,
        starting_history_order_time: DateTime<Utc>,
        starting_deal_time: DateTime<Utc>,
    ) -> Result<()> {
        self.calls.lock().synchronize.push((
            instance_index,
            synchronization_id.to_string(),
            starting_history_order_time,
            starting_deal_time,
        ));
        Ok(())
    }

    async fn wait_synchronized(
        &self,
        _account_id: &str,
        _instance_index: Option<u32>,
        _application_pattern: &str,
        _timeout_in_seconds: u64,
    ) -> Result<()> {
        Ok(())
    }

    async fn subscribe_to_market_data(
        &self,
        _account_id: &str,
        instance_index: u32,
        symbol: &str,
    ) -> Result<()> {
        self.calls
            .lock()
            .market_data_subscribe
            .push((instance_index, symbol.to_string()));
        Ok(())
    }

    async fn unsubscribe_from_market_data(
        &self,
        _account_id: &str,
        instance_index: u32,
        symbol: &str,
    ) -> Result<()> {
        self.calls
            .lock()
            .market_data_unsubscribe
            .push((instance_index, symbol.to_string()));
        Ok(())
    }

    async fn trade(&self, _account_id: &str, request: &TradeRequest) -> Result<TradeResponse> {
        self.calls.lock().trades.push(request.clone());
        Ok(TradeResponse {
            numeric_code: 10009,
            string_code: "TRADE_RETCODE_DONE".to_string(),
            message: "Request completed".to_string(),
            order_id: Some("46870472".to_string()),
            position_id: None,
        })
    }

    async fn remove_history(&self, _account_id: &str, application: Option<&str>) -> Result<()> {
        self.calls
            .lock()
            .remove_history
            .push(application.map(str::to_string));
        Ok(())
    }

    async fn remove_application(&self, _account_id: &str) -> Result<()> {
        self.remove_application_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_account_information(&self, _account_id: &str) -> Result<AccountInformation> {
        Err(TerminalError::Transport("not mocked".to_string()))
    }

    async fn get_positions(&self, _account_id: &str) -> Result<Vec<Position>> {
        Ok(Vec::new())
    }

    async fn get_position(&self, _account_id: &str, _position_id: &str) -> Result<Position> {
        Err(TerminalError::Transport("not mocked".to_string()))
    }

    async fn get_orders(&self, _account_id: &str) -> Result<Vec<Order>> {
        Ok(Vec::new())
    }

    async fn get_order(&self, _account_id: &str, _order_id: &str) -> Result<Order> {
        Err(TerminalError::Transport("not mocked".to_string()))
    }

    async fn get_history_orders_by_ticket(
        &self,
        _account_id: &str,
        _ticket: &str,
    ) -> Result<Vec<Order>> {
        Ok(Vec::new())
    }

    async fn get_history_orders_by_position(
        &self,
        _account_id: &str,
        _position_id: &str,
    ) -> Result<Vec<Order>> {
        Ok(Vec::new())
    }

    async fn get_history_orders_by_time_range(
        &self,
        _account_id: &str,
        _start_time: DateTime<Utc>,
        _end_time: DateTime<Utc>,
        _offset: usize,
        _limit: usize,
    ) -> Result<Vec<Order>> {
        Ok(Vec::new())
    }

    async fn get_deals_by_ticket(&self, _account_id: &str, _ticket: &str) -> Result<Vec<Deal>> {
        Ok(Vec::new())
    }

    async fn get_deals_by_position(
        &self,
        _account_id: &str,
        _position_id: &str,
    ) -> Result<Vec<Deal>> {
        Ok(Vec::new())
    }

    async fn get_deals_by_time_range(
        &self,
        _account_id: &str,
        _start_time: DateTime<Utc>,
        _end_time: DateTime<Utc>,
        _offset: usize,
        _limit: usize,
    ) -> Result<Vec<Deal>> {
        Ok(Vec::new())
    }

    async fn get_symbol_specification(
        &self,
        _account_id: &str,
        _symbol: &str,
    ) -> Result<SymbolSpecification> {
        Err(TerminalError::Transport("not mocked".to_string()))
    }

    async fn get_symbol_price(&self, _account_id: &str, _symbol: &str) -> Result<SymbolPrice> {
        Err(TerminalError::Transport("not mocked".to_string()))
    }

    async fn save_uptime(
        &self,
        _account_id: &str,
        _uptime: HashMap<String, u32>,
    ) -> Result<()> {
        Ok(())
    }

    async fn reconnect(&self, _account_id: &str) -> Result<()> {
        Ok(())
    }
}
