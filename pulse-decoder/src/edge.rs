//! Falling-edge capture
//!
//! [`EdgeSource`] is the hand-off point between a level-sensing input and
//! the decoder task. It is meant to be called from a hardware callback:
//! it never blocks beyond a short uncontended lock, only timestamps and
//! pushes onto an unbounded channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

/// A timestamped falling edge on the wallbox signalling line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    /// Monotonic time of the edge
    pub at: Instant,
}

/// Diagnostic counters for an [`EdgeSource`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeStats {
    pub accepted: u64,
    pub bounced: u64,
}

#[derive(Debug)]
struct SourceState {
    /// Last observed line level (`true` = idle/high)
    level: bool,
    last_accepted: Option<Instant>,
}

/// Cloneable producer of [`EdgeEvent`]s
#[derive(Debug, Clone)]
pub struct EdgeSource {
    tx: mpsc::UnboundedSender<EdgeEvent>,
    debounce: Duration,
    state: Arc<Mutex<SourceState>>,
    accepted: Arc<AtomicU64>,
    bounced: Arc<AtomicU64>,
}

impl EdgeSource {
    /// Create a source and the receiver the decoder task consumes
    pub fn channel(debounce: Duration) -> (Self, mpsc::UnboundedReceiver<EdgeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Self {
            tx,
            debounce,
            state: Arc::new(Mutex::new(SourceState {
                level: true,
                last_accepted: None,
            })),
            accepted: Arc::new(AtomicU64::new(0)),
            bounced: Arc::new(AtomicU64::new(0)),
        };
        (source, rx)
    }

    /// Feed a raw level sample; a high→low transition becomes a falling edge
    ///
    /// Returns `true` if an edge was forwarded to the decoder.
    pub fn on_level(&self, level: bool) -> bool {
        let falling = {
            let mut state = self.state.lock();
            let falling = state.level && !level;
            state.level = level;
            falling
        };

        falling && self.falling_edge()
    }

    /// Report a falling edge detected by the input hardware, stamped now
    pub fn falling_edge(&self) -> bool {
        self.falling_edge_at(now())
    }

    /// Report a falling edge with an explicit timestamp
    ///
    /// Returns `true` if the edge passed the debounce filter and the decoder
    /// is still listening.
    pub fn falling_edge_at(&self, at: Instant) -> bool {
        {
            let mut state = self.state.lock();
            if let Some(last) = state.last_accepted {
                if at.saturating_duration_since(last) < self.debounce {
                    self.bounced.fetch_add(1, Ordering::Relaxed);
                    trace!("edge dropped as contact bounce");
                    return false;
                }
            }
            state.last_accepted = Some(at);
        }

        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.tx.send(EdgeEvent { at }).is_ok()
    }

    /// Snapshot of the accepted/bounced counters
    pub fn stats(&self) -> EdgeStats {
        EdgeStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            bounced: self.bounced.load(Ordering::Relaxed),
        }
    }

    /// Whether the decoder task has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Monotonic "now" that follows tokio's clock, so paused-time tests and the
/// decoder task agree on timestamps
pub(crate) fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}
