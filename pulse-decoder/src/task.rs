//! Decoder task: owns the [`PulseDecoder`] and the END watcher
//!
//! A single long-running task consumes the edge channel and wakes on a
//! fixed tick to look for the END quiet period. It suspends only while
//! waiting for an edge or the next tick, so the edge producer is never
//! blocked.

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::DecoderConfig;
use crate::decoder::{DecodeOutcome, PulseDecoder, RejectCause, Selection};
use crate::edge::{now, EdgeEvent};

/// Events published by the decoder task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderEvent {
    /// A train decoded into a valid selection
    SelectionDecoded(Selection),
    /// A train ended with counts outside the wallbox key range
    DecodeRejected(RejectCause),
}

impl From<DecodeOutcome> for DecoderEvent {
    fn from(outcome: DecodeOutcome) -> Self {
        match outcome {
            DecodeOutcome::Selected(selection) => DecoderEvent::SelectionDecoded(selection),
            DecodeOutcome::Rejected(cause) => DecoderEvent::DecodeRejected(cause),
        }
    }
}

/// Run the decoder until the edge channel closes or the event receiver drops
///
/// Events are converted into the caller's event type, so the task can feed
/// a unified dispatcher queue directly.
pub async fn run_decoder<E>(
    config: DecoderConfig,
    mut edges: mpsc::UnboundedReceiver<EdgeEvent>,
    events: mpsc::Sender<E>,
) where
    E: From<DecoderEvent> + Send + 'static,
{
    let mut decoder = PulseDecoder::new(config);
    let mut watcher = tokio::time::interval(decoder.config().poll_interval);
    watcher.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Pulse decoder started");

    loop {
        let outcome = tokio::select! {
            edge = edges.recv() => {
                match edge {
                    Some(edge) => decoder.on_edge(edge.at),
                    None => {
                        info!("Edge source closed, stopping pulse decoder");
                        break;
                    }
                }
            }

            _ = watcher.tick() => decoder.poll_end(now()),
        };

        let Some(outcome) = outcome else {
            continue;
        };

        let event = DecoderEvent::from(outcome);
        match event {
            DecoderEvent::SelectionDecoded(selection) => info!("Decoded {}", selection),
            DecoderEvent::DecodeRejected(cause) => warn!("Rejected pulse train: {}", cause),
        }

        if events.send(E::from(event)).await.is_err() {
            debug!("Decoder event receiver dropped, stopping pulse decoder");
            break;
        }
    }

    info!("Pulse decoder shut down");
}
