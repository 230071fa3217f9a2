//! Bench driver: run the whole pipeline from a text script instead of GPIO
//!
//! One command per line:
//!
//! ```text
//! # comments and blank lines are ignored
//! edge                    one falling edge on the wallbox line
//! wait 400                sleep for 400 ms
//! press B3                the full pulse train for a slot label
//! cw | ccw                one detent of the volume encoder
//! button encoder short    press and release a button
//! button unit long
//! tag 0004217530          present an RFID tag (decimal payload)
//! ```
//!
//! Edges, buttons and tags go through the same tasks the hardware feeds, so
//! decoder timing, press classification and frame checking all apply.

use std::str::FromStr;
use std::time::Duration;

use input_devices::{
    run_button, run_rfid_reader, ButtonId, ButtonInput, PageTag, Press, PressConfig,
    RotaryEncoder, Rotation,
};
use page_sets::slot_for_label;
use pulse_decoder::{run_decoder, DecoderConfig, EdgeSource, Selection};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::dispatcher::DispatcherHandle;

/// Settle time after a pulse train, on top of the END quiet period
const TRAIN_SETTLE: Duration = Duration::from_millis(100);

/// How long a short button press is held
const SHORT_HOLD: Duration = Duration::from_millis(100);

/// Errors in a bench script line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BenchError {
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("Invalid argument '{value}' for '{command}'")]
    InvalidArgument {
        command: &'static str,
        value: String,
    },

    #[error("Too many arguments for '{0}'")]
    TrailingArguments(&'static str),
}

/// One parsed script line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BenchCommand {
    Edge,
    Wait(Duration),
    Press(Selection),
    Rotate(Rotation),
    Button(ButtonId, Press),
    Tag(PageTag),
}

impl BenchCommand {
    /// Parse a script line; `None` for blank lines and comments
    pub fn parse_line(line: &str) -> Result<Option<Self>, BenchError> {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            return Ok(None);
        }
        line.parse().map(Some)
    }
}

impl FromStr for BenchCommand {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();

        let parsed = match command.as_str() {
            "edge" => BenchCommand::Edge,
            "cw" => BenchCommand::Rotate(Rotation::Clockwise),
            "ccw" => BenchCommand::Rotate(Rotation::CounterClockwise),
            "wait" => {
                let value = words.next().ok_or(BenchError::MissingArgument("wait"))?;
                let ms = value.parse::<u64>().map_err(|_| invalid("wait", value))?;
                BenchCommand::Wait(Duration::from_millis(ms))
            }
            "press" => {
                let value = words.next().ok_or(BenchError::MissingArgument("press"))?;
                let selection = slot_for_label(value)
                    .and_then(Selection::from_slot)
                    .ok_or_else(|| invalid("press", value))?;
                BenchCommand::Press(selection)
            }
            "button" => {
                let button = match words.next() {
                    Some("encoder") => ButtonId::Encoder,
                    Some("unit") => ButtonId::Unit,
                    Some(other) => return Err(invalid("button", other)),
                    None => return Err(BenchError::MissingArgument("button")),
                };
                let press = match words.next() {
                    Some("short") => Press::Short,
                    Some("long") => Press::Long,
                    Some(other) => return Err(invalid("button", other)),
                    None => return Err(BenchError::MissingArgument("button")),
                };
                BenchCommand::Button(button, press)
            }
            "tag" => {
                let value = words.next().ok_or(BenchError::MissingArgument("tag"))?;
                let id = value
                    .parse::<u64>()
                    .ok()
                    .filter(|id| *id <= 0xFF_FFFF_FFFF)
                    .ok_or_else(|| invalid("tag", value))?;
                BenchCommand::Tag(PageTag::new(id))
            }
            _ => return Err(BenchError::UnknownCommand(command)),
        };

        if words.next().is_some() {
            return Err(BenchError::TrailingArguments(parsed.name()));
        }
        Ok(parsed)
    }
}

impl BenchCommand {
    fn name(&self) -> &'static str {
        match self {
            BenchCommand::Edge => "edge",
            BenchCommand::Wait(_) => "wait",
            BenchCommand::Press(_) => "press",
            BenchCommand::Rotate(Rotation::Clockwise) => "cw",
            BenchCommand::Rotate(Rotation::CounterClockwise) => "ccw",
            BenchCommand::Button(..) => "button",
            BenchCommand::Tag(_) => "tag",
        }
    }
}

fn invalid(command: &'static str, value: &str) -> BenchError {
    BenchError::InvalidArgument {
        command,
        value: value.to_string(),
    }
}

/// Simulated peripherals wired to a running dispatcher
pub struct BenchRig {
    edges: EdgeSource,
    encoder_button: ButtonInput,
    unit_button: ButtonInput,
    encoder: RotaryEncoder,
    rfid: DuplexStream,
    handle: DispatcherHandle,
    decoder: DecoderConfig,
    buttons: PressConfig,
    tasks: Vec<JoinHandle<()>>,
}

impl BenchRig {
    /// Spawn the decoder, button and RFID tasks feeding `handle`
    pub fn start(config: &ControllerConfig, handle: DispatcherHandle) -> Self {
        let (edges, edge_rx) = EdgeSource::channel(config.decoder.debounce);
        let (encoder_button, encoder_rx) = ButtonInput::channel();
        let (unit_button, unit_rx) = ButtonInput::channel();
        let (rfid, serial) = tokio::io::duplex(256);

        let tasks = vec![
            tokio::spawn(run_decoder(config.decoder.clone(), edge_rx, handle.sender())),
            tokio::spawn(run_button(
                ButtonId::Encoder,
                config.buttons,
                encoder_rx,
                handle.sender(),
            )),
            tokio::spawn(run_button(
                ButtonId::Unit,
                config.buttons,
                unit_rx,
                handle.sender(),
            )),
            tokio::spawn({
                let sender = handle.sender();
                let rfid_config = config.rfid;
                async move {
                    if let Err(e) = run_rfid_reader(serial, rfid_config, sender).await {
                        warn!("RFID reader stopped: {}", e);
                    }
                }
            }),
        ];

        Self {
            edges,
            encoder_button,
            unit_button,
            encoder: RotaryEncoder::new(),
            rfid,
            handle,
            decoder: config.decoder.clone(),
            buttons: config.buttons,
            tasks,
        }
    }

    /// Execute one command
    pub async fn execute(&mut self, command: &BenchCommand) {
        debug!("Bench: {:?}", command);
        match command {
            BenchCommand::Edge => {
                self.edges.falling_edge();
            }
            BenchCommand::Wait(duration) => tokio::time::sleep(*duration).await,
            BenchCommand::Press(selection) => self.pulse_train(*selection).await,
            BenchCommand::Rotate(rotation) => {
                for (a, b) in rotation.detent_sequence() {
                    if let Some(step) = self.encoder.step(a, b) {
                        self.handle.send(step).await;
                    }
                }
            }
            BenchCommand::Button(button, press) => {
                let input = match button {
                    ButtonId::Encoder => &self.encoder_button,
                    ButtonId::Unit => &self.unit_button,
                };
                let hold = match press {
                    Press::Short => SHORT_HOLD,
                    Press::Long => self.buttons.long_press + SHORT_HOLD,
                };
                input.press();
                tokio::time::sleep(hold).await;
                input.release();
            }
            BenchCommand::Tag(tag) => {
                if let Err(e) = self.rfid.write_all(&tag.to_frame()).await {
                    warn!("Could not write RFID frame: {}", e);
                }
            }
        }
    }

    /// Edges for one selection at the middle of each timing window, then
    /// wait for the decoder to see END
    async fn pulse_train(&self, selection: Selection) {
        let short = midpoint(self.decoder.short_window.min, self.decoder.short_window.max);
        let gap = midpoint(self.decoder.gap_window.min, self.decoder.gap_window.max);

        self.edges.falling_edge();
        for _ in 0..selection.letter_count() {
            tokio::time::sleep(short).await;
            self.edges.falling_edge();
        }
        tokio::time::sleep(gap).await;
        self.edges.falling_edge();
        for _ in 0..selection.number_count() {
            tokio::time::sleep(short).await;
            self.edges.falling_edge();
        }
        tokio::time::sleep(self.decoder.end_quiet + TRAIN_SETTLE).await;
    }

    /// Run every line of `script`; bad lines are logged and skipped
    ///
    /// Returns the number of commands executed.
    pub async fn run_script<R>(&mut self, script: R) -> std::io::Result<usize>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = script.lines();
        let mut executed = 0;
        let mut line_no = 0;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            match BenchCommand::parse_line(&line) {
                Ok(Some(command)) => {
                    self.execute(&command).await;
                    executed += 1;
                }
                Ok(None) => {}
                Err(e) => warn!("Bench line {}: {}", line_no, e),
            }
        }

        info!("Bench script finished after {} commands", executed);
        Ok(executed)
    }

    /// Close every simulated input and wait for the peripheral tasks
    pub async fn finish(self) {
        let Self {
            edges,
            encoder_button,
            unit_button,
            rfid,
            tasks,
            ..
        } = self;
        drop((edges, encoder_button, unit_button, rfid));

        for task in tasks {
            if let Err(e) = task.await {
                warn!("Peripheral task failed: {}", e);
            }
        }
    }
}

fn midpoint(min: Duration, max: Duration) -> Duration {
    min + (max - min) / 2
}
