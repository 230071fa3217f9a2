//! # Wallbox Pulse Decoder
//!
//! Turns the falling edges of a Seeburg WA-200 wallbox signalling line into
//! selection indices.
//!
//! ## Signal shape
//!
//! Pressing a letter and a digit emits two pulse bursts separated by a long
//! gap:
//!
//! ```text
//!  letter burst (78 ms spacing)      gap (~268 ms)    number burst       quiet (>350 ms)
//! ─┐ ┌─┐ ┌─┐ ┌──────────────────────────┐ ┌─┐ ┌─┐ ┌─────────────────────────────
//!  └─┘ └─┘ └─┘                          └─┘ └─┘ └─┘
//! ```
//!
//! Each inter-edge interval is classified as SHORT, GAP, END or NOISE. SHORT
//! intervals before the gap count letters, after it count numbers. A quiet
//! line closes the train and the counts become a [`Selection`]:
//! `index = (letters − 1) + 20 × numbers + 1`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pulse_decoder::{run_decoder, DecoderConfig, DecoderEvent, EdgeSource};
//!
//! let config = DecoderConfig::default();
//! let (source, edges) = EdgeSource::channel(config.debounce);
//! let (tx, mut rx) = tokio::sync::mpsc::channel::<DecoderEvent>(16);
//!
//! tokio::spawn(run_decoder(config, edges, tx));
//!
//! // From the GPIO callback:
//! source.falling_edge();
//!
//! while let Some(event) = rx.recv().await {
//!     println!("{:?}", event);
//! }
//! ```

pub mod config;
pub mod decoder;
pub mod edge;
pub mod task;

// Re-export main types for convenience
pub use config::{DecoderConfig, DecoderConfigError, PulseWindow};
pub use decoder::{
    DecodeOutcome, PulseClass, PulseDecoder, RejectCause, Selection, LETTER_KEYS, NUMBER_KEYS,
    SLOT_COUNT,
};
pub use edge::{EdgeEvent, EdgeSource, EdgeStats};
pub use task::{run_decoder, DecoderEvent};
