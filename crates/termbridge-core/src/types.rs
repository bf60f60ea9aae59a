//! Terminal domain types.
//!
//! Account, position, order, deal and quote types replicated from the
//! server-side terminal. Monetary quantities are decimals; wall times are
//! UTC, broker times are naive datetimes in the broker's local zone.

use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Account summary replicated from the terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInformation {
    /// Broker display name.
    pub broker: String,
    /// Deposit currency (e.g. "USD").
    pub currency: String,
    /// Trade server name.
    pub server: String,
    pub balance: Decimal,
    pub equity: Decimal,
    pub margin: Decimal,
    pub free_margin: Decimal,
    /// Account leverage (e.g. 100 for 1:100).
    pub leverage: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_level: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionType {
    #[serde(rename = "POSITION_TYPE_BUY")]
    Buy,
    #[serde(rename = "POSITION_TYPE_SELL")]
    Sell,
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// An open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    #[serde(rename = "type")]
    pub position_type: PositionType,
    pub symbol: String,
    pub volume: Decimal,
    pub open_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<Decimal>,
    /// Time the position was opened.
    pub time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magic: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Order type as reported by the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    #[serde(rename = "ORDER_TYPE_BUY")]
    Buy,
    #[serde(rename = "ORDER_TYPE_SELL")]
    Sell,
    #[serde(rename = "ORDER_TYPE_BUY_LIMIT")]
    BuyLimit,
    #[serde(rename = "ORDER_TYPE_SELL_LIMIT")]
    SellLimit,
    #[serde(rename = "ORDER_TYPE_BUY_STOP")]
    BuyStop,
    #[serde(rename = "ORDER_TYPE_SELL_STOP")]
    SellStop,
    #[serde(rename = "ORDER_TYPE_BUY_STOP_LIMIT")]
    BuyStopLimit,
    #[serde(rename = "ORDER_TYPE_SELL_STOP_LIMIT")]
    SellStopLimit,
}

/// Order lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    #[serde(rename = "ORDER_STATE_STARTED")]
    Started,
    #[serde(rename = "ORDER_STATE_PLACED")]
    Placed,
    #[serde(rename = "ORDER_STATE_CANCELED")]
    Canceled,
    #[serde(rename = "ORDER_STATE_PARTIAL")]
    Partial,
    #[serde(rename = "ORDER_STATE_FILLED")]
    Filled,
    #[serde(rename = "ORDER_STATE_REJECTED")]
    Rejected,
    #[serde(rename = "ORDER_STATE_EXPIRED")]
    Expired,
}

impl OrderState {
    /// Whether the order reached a terminal state.
    pub fn is_done(&self) -> bool {
        matches!(
            self,
            Self::Canceled | Self::Filled | Self::Rejected | Self::Expired
        )
    }
}

/// A pending or historical order. History orders carry `done_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub state: OrderState,
    pub symbol: String,
    pub volume: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_volume: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<Decimal>,
    /// Time the order was created.
    pub time: DateTime<Utc>,
    /// Time the order was executed or cancelled. Set on history orders only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magic: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Deal kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealType {
    #[serde(rename = "DEAL_TYPE_BUY")]
    Buy,
    #[serde(rename = "DEAL_TYPE_SELL")]
    Sell,
    #[serde(rename = "DEAL_TYPE_BALANCE")]
    Balance,
}

/// An executed deal from the account history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    #[serde(rename = "type")]
    pub deal_type: DealType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<Decimal>,
    /// Execution time.
    pub time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magic: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// One broker-defined quoting interval within a weekday, in broker-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSessionInterval {
    pub from: NaiveTime,
    pub to: NaiveTime,
}

impl QuoteSessionInterval {
    /// Whether a broker-local time of day falls inside this interval.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.from <= time && time <= self.to
    }
}

/// Symbol contract specification, including the quote session schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSpecification {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_size: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_volume: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_volume: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_step: Option<Decimal>,
    /// Quote sessions keyed by uppercase weekday name ("SUNDAY".."SATURDAY").
    #[serde(default)]
    pub quote_sessions: HashMap<String, Vec<QuoteSessionInterval>>,
}

impl SymbolSpecification {
    /// Quote sessions scheduled for a weekday.
    pub fn quote_sessions_for(&self, weekday: Weekday) -> &[QuoteSessionInterval] {
        self.quote_sessions
            .get(weekday_key(weekday))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether a broker-local datetime falls inside any quote session for
    /// its weekday.
    pub fn in_quote_session(&self, broker_time: NaiveDateTime) -> bool {
        let time = broker_time.time();
        self.quote_sessions_for(broker_time.weekday())
            .iter()
            .any(|session| session.contains(time))
    }
}

fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "SUNDAY",
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
    }
}

/// A streamed quote for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolPrice {
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
    /// Quote time in UTC.
    pub time: DateTime<Utc>,
    /// Quote time in the broker's local zone.
    pub broker_time: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn spec_with_weekday_sessions() -> SymbolSpecification {
        let mut quote_sessions = HashMap::new();
        for day in ["MONDAY", "TUESDAY", "WEDNESDAY", "THURSDAY", "FRIDAY"] {
            quote_sessions.insert(
                day.to_string(),
                vec![QuoteSessionInterval {
                    from: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                    to: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                }],
            );
        }
        SymbolSpecification {
            symbol: "EURUSD".to_string(),
            description: None,
            tick_size: None,
            min_volume: None,
            max_volume: None,
            volume_step: None,
            quote_sessions,
        }
    }

    fn broker_time(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_weekday_inside_session() {
        let spec = spec_with_weekday_sessions();
        // 2026-07-27 is a Monday
        assert!(spec.in_quote_session(broker_time(2026, 7, 27, 10, 30)));
    }

    #[test]
    fn test_weekday_outside_session_hours() {
        let spec = spec_with_weekday_sessions();
        assert!(!spec.in_quote_session(broker_time(2026, 7, 27, 19, 0)));
    }

    #[test]
    fn test_weekend_has_no_sessions() {
        let spec = spec_with_weekday_sessions();
        // 2026-07-26 is a Sunday
        assert!(!spec.in_quote_session(broker_time(2026, 7, 26, 10, 30)));
    }

    #[test]
    fn test_session_boundaries_inclusive() {
        let spec = spec_with_weekday_sessions();
        assert!(spec.in_quote_session(broker_time(2026, 7, 27, 8, 0)));
        assert!(spec.in_quote_session(broker_time(2026, 7, 27, 17, 0)));
    }

    #[test]
    fn test_order_state_terminality() {
        assert!(OrderState::Filled.is_done());
        assert!(OrderState::Canceled.is_done());
        assert!(!OrderState::Placed.is_done());
    }
}
