//! Input peripherals of the wallbox controller box
//!
//! - [`rotary`]: two-pin quadrature encoder, half-step decoding
//! - [`button`]: short/long press classification and its task
//! - [`rfid`]: serial tag reader framing and its task
//!
//! Each device hands its events to the caller's event type through `From`,
//! so every task can feed one dispatcher queue.

pub mod button;
pub mod rfid;
pub mod rotary;

pub use button::{
    run_button, ButtonEdge, ButtonEvent, ButtonId, ButtonInput, Press, PressClassifier,
    PressConfig,
};
pub use rfid::{run_rfid_reader, PageTag, RfidConfig, RfidError, RfidFrameDecoder};
pub use rotary::{RotaryEncoder, Rotation};
