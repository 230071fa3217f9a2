//! Property-based tests for the pulse decoder
//!
//! Trains are generated with jittered timing inside the nominal windows and
//! fed straight into the state machine.

use proptest::prelude::*;
use std::time::{Duration, Instant};

use pulse_decoder::{DecodeOutcome, DecoderConfig, PulseDecoder};

// ============================================================================
// Test Helpers
// ============================================================================

/// Strategy for SHORT intervals (70..=85 ms)
fn short_strategy() -> impl Strategy<Value = u64> {
    70u64..=85
}

/// Strategy for GAP intervals (260..=275 ms)
fn gap_strategy() -> impl Strategy<Value = u64> {
    260u64..=275
}

/// A complete train: letter intervals, gap interval, number intervals, trailing quiet
fn train_strategy() -> impl Strategy<Value = (Vec<u64>, u64, Vec<u64>, u64)> {
    (1usize..=20, 0usize..=9).prop_flat_map(|(letters, numbers)| {
        (
            prop::collection::vec(short_strategy(), letters),
            gap_strategy(),
            prop::collection::vec(short_strategy(), numbers),
            351u64..2_000,
        )
    })
}

/// Feed a train and collect every outcome, polling at the final quiet point
fn run_train(
    decoder: &mut PulseDecoder,
    t0: Instant,
    letters: &[u64],
    gap: u64,
    numbers: &[u64],
    quiet: u64,
) -> (Vec<DecodeOutcome>, Instant) {
    let mut outcomes = Vec::new();
    let mut t = t0;

    outcomes.extend(decoder.on_edge(t));
    for delta in letters {
        t += Duration::from_millis(*delta);
        outcomes.extend(decoder.on_edge(t));
    }
    t += Duration::from_millis(gap);
    outcomes.extend(decoder.on_edge(t));
    for delta in numbers {
        t += Duration::from_millis(*delta);
        outcomes.extend(decoder.on_edge(t));
    }

    let end = t + Duration::from_millis(quiet);
    outcomes.extend(decoder.poll_end(end));
    (outcomes, end)
}

// ============================================================================
// Exactly one selection per well-formed train
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// For any train whose intervals are all SHORT or GAP, the decoder emits
    /// exactly one selection with `index = (Lc − 1) + 20·Nc + 1`.
    #[test]
    fn prop_well_formed_train_decodes_once(
        (letters, gap, numbers, quiet) in train_strategy(),
    ) {
        let mut decoder = PulseDecoder::new(DecoderConfig::default());
        let (outcomes, _) = run_train(&mut decoder, Instant::now(), &letters, gap, &numbers, quiet);

        prop_assert_eq!(outcomes.len(), 1);
        let DecodeOutcome::Selected(selection) = outcomes[0] else {
            return Err(TestCaseError::fail(format!("expected selection, got {:?}", outcomes[0])));
        };

        let lc = letters.len() as u16;
        let nc = numbers.len() as u16;
        prop_assert_eq!(selection.letter_count() as u16, lc);
        prop_assert_eq!(selection.number_count() as u16, nc);
        prop_assert_eq!(selection.index(), (lc - 1) + 20 * nc + 1);
        prop_assert!(selection.slot() < 200);
        prop_assert!(!decoder.is_active());
    }

    /// Noise edges injected after a finished train never produce a second
    /// outcome, however many arrive.
    #[test]
    fn prop_noise_after_train_never_emits(
        (letters, gap, numbers, quiet) in train_strategy(),
        noise in prop::collection::vec(286u64..=349, 1..12),
        settle in 351u64..1_000,
    ) {
        let mut decoder = PulseDecoder::new(DecoderConfig::default());
        let (outcomes, end) = run_train(&mut decoder, Instant::now(), &letters, gap, &numbers, quiet);
        prop_assert_eq!(outcomes.len(), 1);

        let mut t = end;
        for delta in &noise {
            t += Duration::from_millis(*delta);
            prop_assert!(decoder.on_edge(t).is_none());
            prop_assert!(decoder.poll_end(t).is_none());
        }
        prop_assert!(decoder.poll_end(t + Duration::from_millis(settle)).is_none());
        prop_assert_eq!(decoder.counts(), (0, 0));
    }

    /// Counters never go negative and reset to zero after every train.
    #[test]
    fn prop_counters_reset_after_train(
        (letters, gap, numbers, quiet) in train_strategy(),
    ) {
        let mut decoder = PulseDecoder::new(DecoderConfig::default());
        let t0 = Instant::now();
        let (_, end) = run_train(&mut decoder, t0, &letters, gap, &numbers, quiet);
        prop_assert_eq!(decoder.counts(), (0, 0));

        // A second train right after decodes independently
        let (outcomes, _) = run_train(&mut decoder, end + Duration::from_millis(500), &letters, gap, &numbers, quiet);
        prop_assert_eq!(outcomes.len(), 1);
    }
}
