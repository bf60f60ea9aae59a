//! Trade request and response shapes.
//!
//! Requests form a tagged union over `actionType`; the variants mirror the
//! terminal's trade surface. Market and pending orders share a common options
//! block, extended with filling modes and expiration policy respectively.

use crate::error::{Result, TerminalError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Longest `comment` + `client_id` combination the terminal accepts.
pub const MAX_COMMENT_CLIENT_ID_LENGTH: usize = 26;

/// Order filling policy for market-style executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillingMode {
    #[serde(rename = "ORDER_FILLING_FOK")]
    FillOrKill,
    #[serde(rename = "ORDER_FILLING_IOC")]
    ImmediateOrCancel,
}

/// Pending order expiration policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpirationType {
    #[serde(rename = "ORDER_TIME_GTC")]
    GoodTillCancel,
    #[serde(rename = "ORDER_TIME_DAY")]
    Day,
    #[serde(rename = "ORDER_TIME_SPECIFIED")]
    Specified,
    #[serde(rename = "ORDER_TIME_SPECIFIED_DAY")]
    SpecifiedDay,
}

/// Expiration settings for pending orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationOptions {
    #[serde(rename = "type")]
    pub expiration_type: ExpirationType,
    /// Expiration time, required for the `Specified` policies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

/// Options shared by market-execution trade actions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTradeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magic: Option<i64>,
    /// Allowed slippage in points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filling_modes: Option<Vec<FillingMode>>,
}

/// Options shared by pending-order trade actions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTradeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magic: Option<i64>,
    /// Allowed slippage in points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<ExpirationOptions>,
}

/// A trade command for the terminal, discriminated by `actionType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "actionType")]
pub enum TradeRequest {
    #[serde(rename = "ORDER_TYPE_BUY", rename_all = "camelCase")]
    MarketBuy {
        symbol: String,
        volume: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: MarketTradeOptions,
    },
    #[serde(rename = "ORDER_TYPE_SELL", rename_all = "camelCase")]
    MarketSell {
        symbol: String,
        volume: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: MarketTradeOptions,
    },
    #[serde(rename = "ORDER_TYPE_BUY_LIMIT", rename_all = "camelCase")]
    LimitBuy {
        symbol: String,
        volume: Decimal,
        open_price: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: PendingTradeOptions,
    },
    #[serde(rename = "ORDER_TYPE_SELL_LIMIT", rename_all = "camelCase")]
    LimitSell {
        symbol: String,
        volume: Decimal,
        open_price: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: PendingTradeOptions,
    },
    #[serde(rename = "ORDER_TYPE_BUY_STOP", rename_all = "camelCase")]
    StopBuy {
        symbol: String,
        volume: Decimal,
        open_price: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: PendingTradeOptions,
    },
    #[serde(rename = "ORDER_TYPE_SELL_STOP", rename_all = "camelCase")]
    StopSell {
        symbol: String,
        volume: Decimal,
        open_price: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: PendingTradeOptions,
    },
    #[serde(rename = "ORDER_TYPE_BUY_STOP_LIMIT", rename_all = "camelCase")]
    StopLimitBuy {
        symbol: String,
        volume: Decimal,
        open_price: Decimal,
        /// Limit price activated once the stop level trades.
        stop_limit_price: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: PendingTradeOptions,
    },
    #[serde(rename = "ORDER_TYPE_SELL_STOP_LIMIT", rename_all = "camelCase")]
    StopLimitSell {
        symbol: String,
        volume: Decimal,
        open_price: Decimal,
        /// Limit price activated once the stop level trades.
        stop_limit_price: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
        #[serde(flatten)]
        options: PendingTradeOptions,
    },
    #[serde(rename = "POSITION_MODIFY", rename_all = "camelCase")]
    ModifyPosition {
        position_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
    },
    #[serde(rename = "POSITION_PARTIAL", rename_all = "camelCase")]
    PartialClosePosition {
        position_id: String,
        volume: Decimal,
        #[serde(flatten)]
        options: MarketTradeOptions,
    },
    #[serde(rename = "POSITION_CLOSE_ID", rename_all = "camelCase")]
    ClosePosition {
        position_id: String,
        #[serde(flatten)]
        options: MarketTradeOptions,
    },
    #[serde(rename = "POSITION_CLOSE_BY", rename_all = "camelCase")]
    ClosePositionBy {
        position_id: String,
        close_by_position_id: String,
        #[serde(flatten)]
        options: MarketTradeOptions,
    },
    #[serde(rename = "POSITIONS_CLOSE_SYMBOL", rename_all = "camelCase")]
    CloseSymbolPositions {
        symbol: String,
        #[serde(flatten)]
        options: MarketTradeOptions,
    },
    #[serde(rename = "ORDER_MODIFY", rename_all = "camelCase")]
    ModifyOrder {
        order_id: String,
        open_price: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_loss: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        take_profit: Option<Decimal>,
    },
    #[serde(rename = "ORDER_CANCEL", rename_all = "camelCase")]
    CancelOrder { order_id: String },
}

impl TradeRequest {
    /// Comment and client id carried by the request's options block, when the
    /// action has one.
    fn comment_and_client_id(&self) -> Option<(&Option<String>, &Option<String>)> {
        match self {
            Self::MarketBuy { options, .. }
            | Self::MarketSell { options, .. }
            | Self::PartialClosePosition { options, .. }
            | Self::ClosePosition { options, .. }
            | Self::ClosePositionBy { options, .. }
            | Self::CloseSymbolPositions { options, .. } => {
                Some((&options.comment, &options.client_id))
            }
            Self::LimitBuy { options, .. }
            | Self::LimitSell { options, .. }
            | Self::StopBuy { options, .. }
            | Self::StopSell { options, .. }
            | Self::StopLimitBuy { options, .. }
            | Self::StopLimitSell { options, .. } => Some((&options.comment, &options.client_id)),
            Self::ModifyPosition { .. } | Self::ModifyOrder { .. } | Self::CancelOrder { .. } => {
                None
            }
        }
    }

    /// Check request invariants before submission.
    pub fn validate(&self) -> Result<()> {
        if let Some((comment, client_id)) = self.comment_and_client_id() {
            let combined = comment.as_deref().unwrap_or("").len()
                + client_id.as_deref().unwrap_or("").len();
            if combined > MAX_COMMENT_CLIENT_ID_LENGTH {
                return Err(TerminalError::Validation(format!(
                    "comment and clientId together must not exceed \
                     {MAX_COMMENT_CLIENT_ID_LENGTH} characters, got {combined}"
                )));
            }
        }
        Ok(())
    }
}

/// Result of a trade command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResponse {
    pub numeric_code: i64,
    pub string_code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn test_market_buy_serializes_with_action_type() {
        let request = TradeRequest::MarketBuy {
            symbol: "EURUSD".to_string(),
            volume: Decimal::new(1, 2),
            stop_loss: None,
            take_profit: None,
            options: MarketTradeOptions {
                comment: Some("entry".to_string()),
                ..Default::default()
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["actionType"], "ORDER_TYPE_BUY");
        assert_eq!(value["symbol"], "EURUSD");
        assert_eq!(value["comment"], "entry");
    }

    #[test]
    fn test_stop_limit_round_trip() {
        let value = json!({
            "actionType": "ORDER_TYPE_SELL_STOP_LIMIT",
            "symbol": "GBPUSD",
            "volume": 0.5,
            "openPrice": 1.21,
            "stopLimitPrice": 1.215,
            "expiration": {"type": "ORDER_TIME_DAY"},
        });
        let request: TradeRequest = serde_json::from_value(value).unwrap();
        match request {
            TradeRequest::StopLimitSell {
                ref symbol,
                ref options,
                ..
            } => {
                assert_eq!(symbol, "GBPUSD");
                assert_eq!(
                    options.expiration.as_ref().unwrap().expiration_type,
                    ExpirationType::Day
                );
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_comment_client_id_length_enforced() {
        let request = TradeRequest::ClosePosition {
            position_id: "46214692".to_string(),
            options: MarketTradeOptions {
                comment: Some("a".repeat(20)),
                client_id: Some("b".repeat(7)),
                ..Default::default()
            },
        };
        assert!(matches!(
            request.validate(),
            Err(TerminalError::Validation(_))
        ));
    }

    #[test]
    fn test_comment_client_id_at_limit_passes() {
        let request = TradeRequest::MarketSell {
            symbol: "EURUSD".to_string(),
            volume: Decimal::ONE,
            stop_loss: None,
            take_profit: None,
            options: MarketTradeOptions {
                comment: Some("a".repeat(20)),
                client_id: Some("b".repeat(6)),
                ..Default::default()
            },
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_cancel_order_has_no_options_to_validate() {
        let request = TradeRequest::CancelOrder {
            order_id: "46870472".to_string(),
        };
        assert!(request.validate().is_ok());
    }
}
