//! Subscribe loop.
//!
//! Keeps asking the server to stream an account until a connect signal stops
//! it, backing off exponentially between attempts. The backoff sleep is
//! cancellable from outside so a connect or close can end the loop promptly.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use termbridge_core::TerminalTransport;
use termbridge_telemetry::metrics::SUBSCRIBE_ATTEMPTS_TOTAL;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Next backoff delay: doubled, capped.
fn next_delay(delay_in_seconds: u64, cap_in_seconds: u64) -> u64 {
    delay_in_seconds.saturating_mul(2).min(cap_in_seconds)
}

/// Cancellable exponential-backoff resubscription task for one account.
pub struct SubscribeTask {
    account_id: String,
    transport: Arc<dyn TerminalTransport>,
    closed: Arc<AtomicBool>,
    is_subscribing: AtomicBool,
    should_retry_subscribe: AtomicBool,
    backoff_token: Mutex<Option<CancellationToken>>,
    base_delay_in_seconds: u64,
    cap_delay_in_seconds: u64,
}

impl SubscribeTask {
    pub fn new(
        account_id: impl Into<String>,
        transport: Arc<dyn TerminalTransport>,
        closed: Arc<AtomicBool>,
        base_delay_in_seconds: u64,
        cap_delay_in_seconds: u64,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            transport,
            closed,
            is_subscribing: AtomicBool::new(false),
            should_retry_subscribe: AtomicBool::new(false),
            backoff_token: Mutex::new(None),
            base_delay_in_seconds,
            cap_delay_in_seconds,
        }
    }

    /// Whether the loop is currently running.
    pub fn is_subscribing(&self) -> bool {
        self.is_subscribing.load(Ordering::SeqCst)
    }

    /// Stop retrying and cancel a pending backoff sleep, if any. Safe to call
    /// when no sleep is pending.
    pub fn cancel_pending(&self) {
        self.should_retry_subscribe.store(false, Ordering::SeqCst);
        if let Some(token) = self.backoff_token.lock().take() {
            token.cancel();
        }
    }

    /// Run the resubscription loop. One-at-a-time: a second call while the
    /// loop is running returns immediately.
    pub async fn subscribe(self: Arc<Self>) {
        if self.is_subscribing.swap(true, Ordering::SeqCst) {
            return;
        }
        self.should_retry_subscribe.store(true, Ordering::SeqCst);
        let mut delay = self.base_delay_in_seconds;

        while self.should_retry_subscribe.load(Ordering::SeqCst)
            && !self.closed.load(Ordering::SeqCst)
        {
            SUBSCRIBE_ATTEMPTS_TOTAL
                .with_label_values(&[&self.account_id])
                .inc();
            if let Err(error) = self.transport.subscribe(&self.account_id).await {
                warn!(
                    account_id = %self.account_id,
                    %error,
                    "Subscribe request failed, will retry"
                );
            }

            let token = CancellationToken::new();
            *self.backoff_token.lock() = Some(token.clone());
            let expired = tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(delay)) => true,
                () = token.cancelled() => false,
            };
            self.backoff_token.lock().take();
            if !expired {
                debug!(account_id = %self.account_id, "Subscribe backoff cancelled");
                break;
            }
            delay = next_delay(delay, self.cap_delay_in_seconds);
        }

        self.is_subscribing.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_sequence_doubles_to_cap() {
        let mut delay = 3u64;
        let mut sequence = vec![delay];
        for _ in 0..8 {
            delay = next_delay(delay, 300);
            sequence.push(delay);
        }
        assert_eq!(sequence, vec![3, 6, 12, 24, 48, 96, 192, 300, 300]);
    }
}
