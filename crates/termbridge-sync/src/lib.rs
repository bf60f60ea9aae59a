//! Synchronization machinery for termbridge connections.
//!
//! Provides the per-replica synchronization controller, the cancellable
//! subscribe loop and the market-data subscription set they share with the
//! connection facade.

pub mod controller;
pub mod options;
pub mod state;
pub mod subscribe;
pub mod subscriptions;

pub use controller::SynchronizationController;
pub use options::{RetryOptions, WaitSynchronizedOptions};
pub use state::InstanceSyncState;
pub use subscribe::SubscribeTask;
pub use subscriptions::MarketDataSubscriptions;
