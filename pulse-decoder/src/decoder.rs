//! Pulse-train state machine
//!
//! Pure logic, no I/O and no clock of its own. Feed it falling-edge
//! timestamps through [`PulseDecoder::on_edge`] and let a watcher call
//! [`PulseDecoder::poll_end`] periodically; either call may finish a train.
//!
//! The decoder counts the *intervals* between edges, not the edges: the
//! leading edge of the first pulse has no predecessor, so a burst of N
//! pulses yields N−1 SHORT intervals. The selection formula adds that one
//! back.

use std::fmt;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, trace};

use crate::config::DecoderConfig;

/// Number of letter keys on the wallbox (A–V without I and O)
pub const LETTER_KEYS: u32 = 20;

/// Number of digit keys on the wallbox
pub const NUMBER_KEYS: u32 = 10;

/// Total number of selectable slots
pub const SLOT_COUNT: u16 = (LETTER_KEYS * NUMBER_KEYS) as u16;

/// Classification of one inter-edge interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseClass {
    /// One letter or one number pulse
    Short,
    /// Transition from the letter burst to the number burst
    Gap,
    /// The line has been quiet long enough to end the train
    End,
    /// Anything else; ignored
    Noise,
}

impl DecoderConfig {
    /// Classify an interval between two falling edges
    pub fn classify(&self, delta: std::time::Duration) -> PulseClass {
        if self.short_window.contains(delta) {
            PulseClass::Short
        } else if self.gap_window.contains(delta) {
            PulseClass::Gap
        } else if delta > self.end_quiet {
            PulseClass::End
        } else {
            PulseClass::Noise
        }
    }
}

/// Why a finished train did not produce a selection
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectCause {
    #[error("no letter pulses before the number burst")]
    NoLetters,

    #[error("{0} letter pulses, at most 20 allowed")]
    TooManyLetters(u32),

    #[error("{0} number pulses, at most 9 allowed")]
    TooManyNumbers(u32),
}

impl RejectCause {
    /// Short machine-friendly code shown as a display hint
    pub fn code(&self) -> &'static str {
        "invalid_counts"
    }
}

/// A validated letter/number count pair
///
/// `letter_count` is in `1..=20`, `number_count` in `0..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    letter_count: u8,
    number_count: u8,
}

impl Selection {
    /// Validate raw counts from a finished train
    pub fn from_counts(letter_count: u32, number_count: u32) -> Result<Self, RejectCause> {
        if letter_count == 0 {
            return Err(RejectCause::NoLetters);
        }
        if letter_count > LETTER_KEYS {
            return Err(RejectCause::TooManyLetters(letter_count));
        }
        if number_count >= NUMBER_KEYS {
            return Err(RejectCause::TooManyNumbers(number_count));
        }

        Ok(Self {
            letter_count: letter_count as u8,
            number_count: number_count as u8,
        })
    }

    /// Build the selection that addresses a slot (`0..200`)
    pub fn from_slot(slot: u16) -> Option<Self> {
        if slot >= SLOT_COUNT {
            return None;
        }
        let letters = (slot % LETTER_KEYS as u16) as u32 + 1;
        let numbers = (slot / LETTER_KEYS as u16) as u32;
        Self::from_counts(letters, numbers).ok()
    }

    pub fn letter_count(&self) -> u8 {
        self.letter_count
    }

    pub fn number_count(&self) -> u8 {
        self.number_count
    }

    /// One-based selection index, `(letters − 1) + 20 × numbers + 1`, in `1..=200`
    pub fn index(&self) -> u16 {
        (self.letter_count as u16 - 1) + LETTER_KEYS as u16 * self.number_count as u16 + 1
    }

    /// Zero-based page-set slot, in `0..200`
    pub fn slot(&self) -> u16 {
        self.index() - 1
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "selection {} (letters={}, numbers={})",
            self.index(),
            self.letter_count,
            self.number_count
        )
    }
}

/// Result of a finished train
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    Selected(Selection),
    Rejected(RejectCause),
}

/// Wallbox pulse decoder
///
/// Single consumer per train: one instance is owned by the decoder task and
/// nothing else mutates it.
///
/// # Example
///
/// ```
/// use std::time::{Duration, Instant};
/// use pulse_decoder::{DecodeOutcome, DecoderConfig, PulseDecoder};
///
/// let mut decoder = PulseDecoder::new(DecoderConfig::default());
/// let t0 = Instant::now();
/// let ms = Duration::from_millis;
///
/// // One letter pulse, the letter→number gap, then quiet.
/// decoder.on_edge(t0);
/// decoder.on_edge(t0 + ms(78));
/// decoder.on_edge(t0 + ms(342));
///
/// match decoder.poll_end(t0 + ms(700)) {
///     Some(DecodeOutcome::Selected(selection)) => assert_eq!(selection.index(), 1),
///     other => panic!("unexpected outcome: {:?}", other),
/// }
/// ```
#[derive(Debug)]
pub struct PulseDecoder {
    config: DecoderConfig,

    first_pulse: bool,
    counting_numbers: bool,
    letter_count: u32,
    number_count: u32,
    last_edge: Option<Instant>,
    active: bool,
}

impl PulseDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            first_pulse: true,
            counting_numbers: false,
            letter_count: 0,
            number_count: 0,
            last_edge: None,
            active: false,
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Whether a train is in progress
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current `(letter_count, number_count)`
    pub fn counts(&self) -> (u32, u32) {
        (self.letter_count, self.number_count)
    }

    /// Timestamp of the last accepted (non-noise) edge
    pub fn last_edge(&self) -> Option<Instant> {
        self.last_edge
    }

    /// Process one falling edge
    ///
    /// Returns an outcome only when the edge arrived after the END quiet
    /// period of a train the watcher has not closed yet; that train is
    /// finished first and the edge opens a new one.
    pub fn on_edge(&mut self, at: Instant) -> Option<DecodeOutcome> {
        let mut finished = None;

        if self.active {
            if let Some(last) = self.last_edge {
                if at.saturating_duration_since(last) > self.config.end_quiet {
                    finished = self.finish(at);
                }
            }
        }

        if self.first_pulse {
            // Onset of the first pulse; counting starts on the next edge.
            self.first_pulse = false;
            self.active = true;
            self.last_edge = Some(at);
            trace!("train started");
            return finished;
        }

        let Some(last) = self.last_edge else {
            return finished;
        };
        let delta = at.saturating_duration_since(last);

        match self.config.classify(delta) {
            PulseClass::Short => {
                if self.counting_numbers {
                    self.number_count = self.number_count.saturating_add(1);
                } else {
                    self.letter_count = self.letter_count.saturating_add(1);
                }
                self.last_edge = Some(at);
                trace!(
                    letters = self.letter_count,
                    numbers = self.number_count,
                    "short pulse ({:?})",
                    delta
                );
            }
            PulseClass::Gap => {
                self.counting_numbers = true;
                self.last_edge = Some(at);
                trace!("letter→number gap ({:?})", delta);
            }
            PulseClass::End | PulseClass::Noise => {
                // last_edge stays put so the END watcher is not re-armed.
                debug!("ignoring noise edge ({:?} since last edge)", delta);
            }
        }

        finished
    }

    /// Close the train if the line has been quiet for longer than the END period
    pub fn poll_end(&mut self, now: Instant) -> Option<DecodeOutcome> {
        if !self.active {
            return None;
        }
        let last = self.last_edge?;
        if now.saturating_duration_since(last) > self.config.end_quiet {
            self.finish(now)
        } else {
            None
        }
    }

    /// Drop any train in progress
    pub fn reset(&mut self, now: Instant) {
        self.first_pulse = true;
        self.counting_numbers = false;
        self.letter_count = 0;
        self.number_count = 0;
        self.last_edge = Some(now);
        self.active = false;
    }

    fn finish(&mut self, now: Instant) -> Option<DecodeOutcome> {
        let outcome = if self.letter_count == 0 && self.number_count == 0 && !self.counting_numbers
        {
            debug!("discarding lone edge, no pulse intervals seen");
            None
        } else {
            match Selection::from_counts(self.letter_count, self.number_count) {
                Ok(selection) => {
                    debug!("train finished: {}", selection);
                    Some(DecodeOutcome::Selected(selection))
                }
                Err(cause) => {
                    debug!(
                        letters = self.letter_count,
                        numbers = self.number_count,
                        "train rejected: {}",
                        cause
                    );
                    Some(DecodeOutcome::Rejected(cause))
                }
            }
        };

        self.reset(now);
        outcome
    }
}
