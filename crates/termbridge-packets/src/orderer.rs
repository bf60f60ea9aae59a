//! Packet orderer.
//!
//! Streaming frames can arrive out of sequence. The orderer buffers future
//! frames per `(account, replica)` key, releases them once the gap closes,
//! and raises a one-shot alert when a gap persists past the ordering timeout.
//! Frames without a sequence number bypass ordering entirely.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use termbridge_core::Packet;
use termbridge_telemetry::metrics::OUT_OF_ORDER_TOTAL;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Most future frames buffered per key before the oldest are dropped.
pub const WAIT_LIST_SIZE_LIMIT: usize = 100;

/// Interval between gap-alert scans.
const GAP_SCAN_INTERVAL: Duration = Duration::from_secs(1);

/// Notified once per key per session when a sequence gap persists past the
/// ordering timeout.
pub trait OutOfOrderListener: Send + Sync {
    fn on_out_of_order_packet(
        &self,
        account_id: &str,
        instance_index: u32,
        expected_sequence_number: u64,
        actual_sequence_number: u64,
        packet: &Packet,
        received_at: DateTime<Utc>,
    );
}

/// A buffered future frame.
#[derive(Debug, Clone)]
struct WaitEntry {
    sequence_number: u64,
    received_at: DateTime<Utc>,
    packet: Packet,
}

/// Sequencing state for one `(account, replica)` key.
#[derive(Debug, Default)]
struct InstanceOrderState {
    /// Sequence number of the most recently delivered frame. `None` until a
    /// session start has been seen.
    sequence_number: Option<u64>,
    /// `sequenceTimestamp` of the most recent session start.
    last_session_start: Option<i64>,
    /// Whether a gap alert already fired for the current session.
    out_of_order_emitted: bool,
    /// Future frames sorted by sequence number.
    wait_list: Vec<WaitEntry>,
}

type InstanceKey = (String, u32);

struct OrdererInner {
    listener: Arc<dyn OutOfOrderListener>,
    ordering_timeout: Duration,
    state: Mutex<HashMap<InstanceKey, InstanceOrderState>>,
}

/// Reorders streaming frames per `(account, replica)` key.
pub struct PacketOrderer {
    inner: Arc<OrdererInner>,
    scan_token: Mutex<Option<CancellationToken>>,
}

impl PacketOrderer {
    /// Create an orderer reporting gaps to `listener` after `ordering_timeout`.
    pub fn new(listener: Arc<dyn OutOfOrderListener>, ordering_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(OrdererInner {
                listener,
                ordering_timeout,
                state: Mutex::new(HashMap::new()),
            }),
            scan_token: Mutex::new(None),
        }
    }

    /// Start the periodic gap-alert scan. Idempotent.
    pub fn start(&self) {
        let mut slot = self.scan_token.lock();
        if slot.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let inner = self.inner.clone();
        let task_token = token.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(GAP_SCAN_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => inner.emit_gap_alerts(),
                    () = task_token.cancelled() => break,
                }
            }
        });
        *slot = Some(token);
    }

    /// Stop the periodic gap-alert scan.
    pub fn stop(&self) {
        if let Some(token) = self.scan_token.lock().take() {
            token.cancel();
        }
    }

    /// Consume one input frame, returning zero or more frames ready for
    /// dispatch in sequence order. Never fails: malformed frames without a
    /// sequence number pass through unchanged.
    pub fn restore_order(&self, packet: Packet) -> Vec<Packet> {
        let Some(sequence_number) = packet.sequence_number else {
            return vec![packet];
        };
        let key = (packet.account_id.clone(), packet.instance());
        let mut state = self.inner.state.lock();
        let entry = state.entry(key).or_default();

        if packet.starts_session() {
            // New session: reset the alert guard, adopt the new baseline and
            // prune frames from before the session start.
            entry.out_of_order_emitted = false;
            entry.sequence_number = Some(sequence_number);
            entry.last_session_start = packet.sequence_timestamp;
            let session_start = entry.last_session_start;
            entry.wait_list.retain(|waiting| {
                matches!(
                    (waiting.packet.sequence_timestamp, session_start),
                    (Some(ts), Some(start)) if ts >= start
                )
            });
            debug!(
                account_id = %packet.account_id,
                instance_index = packet.instance(),
                sequence_number,
                "Synchronization session started"
            );
            let mut ready = vec![packet];
            ready.extend(drain_consecutive(entry));
            return ready;
        }

        if let (Some(ts), Some(start)) = (packet.sequence_timestamp, entry.last_session_start) {
            if ts < start {
                // Leftover from a previous session.
                return Vec::new();
            }
        }

        match entry.sequence_number {
            Some(expected) if sequence_number == expected => {
                // Duplicate of the last delivered frame passes through.
                vec![packet]
            }
            Some(expected) if sequence_number == expected + 1 => {
                entry.sequence_number = Some(sequence_number);
                let mut ready = vec![packet];
                ready.extend(drain_consecutive(entry));
                ready
            }
            _ => {
                let position = entry
                    .wait_list
                    .iter()
                    .position(|waiting| waiting.sequence_number > sequence_number)
                    .unwrap_or(entry.wait_list.len());
                entry.wait_list.insert(
                    position,
                    WaitEntry {
                        sequence_number,
                        received_at: Utc::now(),
                        packet,
                    },
                );
                while entry.wait_list.len() > WAIT_LIST_SIZE_LIMIT {
                    let dropped = entry.wait_list.remove(0);
                    warn!(
                        sequence_number = dropped.sequence_number,
                        "Wait list overflow, dropping buffered frame"
                    );
                }
                Vec::new()
            }
        }
    }

    #[cfg(test)]
    fn scan_for_gaps(&self) {
        self.inner.emit_gap_alerts();
    }
}

impl OrdererInner {
    /// Raise at most one alert per key for wait-list heads older than the
    /// ordering timeout. Keys that never saw a session start are skipped.
    fn emit_gap_alerts(&self) {
        let timeout =
            ChronoDuration::from_std(self.ordering_timeout).unwrap_or(ChronoDuration::zero());
        let threshold = Utc::now() - timeout;
        let mut alerts = Vec::new();
        {
            let mut state = self.state.lock();
            for ((account_id, instance_index), entry) in state.iter_mut() {
                if entry.out_of_order_emitted {
                    continue;
                }
                let Some(expected) = entry.sequence_number else {
                    continue;
                };
                if let Some(head) = entry.wait_list.first() {
                    if head.received_at < threshold {
                        entry.out_of_order_emitted = true;
                        alerts.push((
                            account_id.clone(),
                            *instance_index,
                            expected + 1,
                            head.sequence_number,
                            head.packet.clone(),
                            head.received_at,
                        ));
                    }
                }
            }
        }
        for (account_id, instance_index, expected, actual, packet, received_at) in alerts {
            warn!(
                account_id = %account_id,
                instance_index,
                expected_sequence_number = expected,
                actual_sequence_number = actual,
                "Sequence gap persisted past ordering timeout"
            );
            OUT_OF_ORDER_TOTAL.with_label_values(&[&account_id]).inc();
            self.listener.on_out_of_order_packet(
                &account_id,
                instance_index,
                expected,
                actual,
                &packet,
                received_at,
            );
        }
    }
}

/// Release wait-list frames that became consecutive: the head is taken while
/// its sequence equals the current or the next expected number.
fn drain_consecutive(entry: &mut InstanceOrderState) -> Vec<Packet> {
    let mut ready = Vec::new();
    while let Some(head) = entry.wait_list.first() {
        let Some(expected) = entry.sequence_number else {
            break;
        };
        if head.sequence_number == expected {
            ready.push(entry.wait_list.remove(0).packet);
        } else if head.sequence_number == expected + 1 {
            entry.sequence_number = Some(expected + 1);
            ready.push(entry.wait_list.remove(0).packet);
        } else {
            break;
        }
    }
    ready
}
