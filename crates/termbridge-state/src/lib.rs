//! In-memory replica and history storage for termbridge connections.
//!
//! `TerminalState` mirrors the server-side terminal; `MemoryHistoryStorage`
//! records the deal and order history the synchronization stream delivers.
//! Both mutate only through their synchronization listener hooks.

pub mod history;
pub mod terminal_state;

pub use history::{HistoryStorage, MemoryHistoryStorage};
pub use terminal_state::TerminalState;
