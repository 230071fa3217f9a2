//! Wallbox controller
//!
//! Ties the wallbox crates together into one running controller: the
//! dispatcher that routes decoded selections, RFID tags, encoder steps and
//! button presses to the page-set store and the zone controller, and the
//! display renderer that reports what happened.
//!
//! ```text
//! EdgeSource -> run_decoder ----\
//! ButtonInput -> run_button -----+--> Dispatcher --> ZoneController
//! serial -> run_rfid_reader -----/        |     \--> PageSetStore
//! RotaryEncoder -----------------/        \--------> DisplayRenderer
//! ```
//!
//! The `wallbox` binary builds this pipeline from the command line; the
//! [`bench`] module drives it from a text script when no GPIO is attached.

pub mod bench;
pub mod config;
pub mod dispatcher;
pub mod display;
pub mod logging;

pub use bench::{BenchCommand, BenchError, BenchRig};
pub use config::{ConfigError, ControllerConfig};
pub use dispatcher::{ControllerEvent, Dispatcher, DispatcherHandle};
pub use display::{
    center_line, compose, ClockScreen, ConsoleDisplay, DisplayError, DisplayRenderer, IdleScreen,
    MemoryDisplay, TextDisplay,
};
pub use logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};
