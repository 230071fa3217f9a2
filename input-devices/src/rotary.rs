//! Quadrature rotary encoder
//!
//! Half-step state table: every detent produces two emits, one at the
//! half-way point (both pins low) and one back at rest (both pins high).
//! Contact bounce walks back and forth between neighbouring states and never
//! completes a transition, so no separate debounce is needed. A jump where
//! both pins flip at once lands in a start state without emitting.

/// Direction of one encoder step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    /// Pin levels `(a, b)` seen while turning one detent from rest
    pub fn detent_sequence(self) -> [(bool, bool); 4] {
        match self {
            Rotation::Clockwise => [(false, true), (false, false), (true, false), (true, true)],
            Rotation::CounterClockwise => {
                [(true, false), (false, false), (false, true), (true, true)]
            }
        }
    }
}

const START: u8 = 0x0;
const CCW_BEGIN: u8 = 0x1;
const CW_BEGIN: u8 = 0x2;
const START_MID: u8 = 0x3;
const CW_BEGIN_MID: u8 = 0x4;
const CCW_BEGIN_MID: u8 = 0x5;

const EMIT_CW: u8 = 0x10;
const EMIT_CCW: u8 = 0x20;

/// Next state indexed by `[state][pins]`, `pins = (a << 1) | b`
const TABLE: [[u8; 4]; 6] = [
    // START
    [START_MID, CW_BEGIN, CCW_BEGIN, START],
    // CCW_BEGIN
    [START_MID | EMIT_CCW, START, CCW_BEGIN, START],
    // CW_BEGIN
    [START_MID | EMIT_CW, CW_BEGIN, START, START],
    // START_MID
    [START_MID, CCW_BEGIN_MID, CW_BEGIN_MID, START],
    // CW_BEGIN_MID
    [START_MID, START_MID, CW_BEGIN_MID, START | EMIT_CW],
    // CCW_BEGIN_MID
    [START_MID, CCW_BEGIN_MID, START_MID, START | EMIT_CCW],
];

/// Two-pin half-step decoder
#[derive(Debug, Clone, Default)]
pub struct RotaryEncoder {
    state: u8,
}

impl RotaryEncoder {
    pub fn new() -> Self {
        Self { state: START }
    }

    /// Feed the current pin levels; returns a step when one completes
    pub fn step(&mut self, a: bool, b: bool) -> Option<Rotation> {
        let pins = ((a as usize) << 1) | b as usize;
        let next = TABLE[(self.state & 0x0f) as usize][pins];
        self.state = next & 0x0f;

        match next & 0x30 {
            EMIT_CW => Some(Rotation::Clockwise),
            EMIT_CCW => Some(Rotation::CounterClockwise),
            _ => None,
        }
    }
}
