//! Core types for the termbridge synchronization workspace.
//!
//! Defines the shared vocabulary of the bridge:
//! - Streaming packet envelope and the terminal domain types it carries
//! - The trade request union and its validation rules
//! - The error taxonomy
//! - The listener and transport traits the other crates plug into

pub mod error;
pub mod listener;
pub mod packet;
pub mod random_id;
pub mod trade;
pub mod transport;
pub mod types;

pub use error::{Result, TerminalError};
pub use listener::{ReconnectListener, SynchronizationListener};
pub use packet::{Packet, SYNCHRONIZATION_STARTED};
pub use random_id::{random_synchronization_id, SYNCHRONIZATION_ID_LENGTH};
pub use trade::{
    ExpirationOptions, ExpirationType, FillingMode, MarketTradeOptions, PendingTradeOptions,
    TradeRequest, TradeResponse, MAX_COMMENT_CLIENT_ID_LENGTH,
};
pub use transport::TerminalTransport;
pub use types::{
    AccountInformation, Deal, DealType, Order, OrderState, OrderType, Position, PositionType,
    QuoteSessionInterval, SymbolPrice, SymbolSpecification,
};
