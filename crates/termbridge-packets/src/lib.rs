//! Packet ordering for termbridge streaming frames.
//!
//! Provides the per-replica reorder buffer sitting between the raw transport
//! and the synchronization listeners, with gap detection after a configurable
//! silence.

pub mod orderer;

pub use orderer::{OutOfOrderListener, PacketOrderer, WAIT_LIST_SIZE_LIMIT};
