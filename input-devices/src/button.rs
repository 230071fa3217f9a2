//! Pushbutton short/long press classification
//!
//! After a press the classifier waits up to `long_press` for the release.
//! A release in time is a short press. Otherwise a long press is reported
//! as soon as the timeout expires, and the release that eventually follows
//! is swallowed.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// Press classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Press {
    Short,
    Long,
}

/// Which physical button a press came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    /// Push switch on the rotary encoder shaft
    Encoder,
    /// Zone (unit) select button
    Unit,
}

impl std::fmt::Display for ButtonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ButtonId::Encoder => f.write_str("encoder"),
            ButtonId::Unit => f.write_str("unit"),
        }
    }
}

/// A classified press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: ButtonId,
    pub press: Press,
}

/// Button timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressConfig {
    /// Hold time that turns a press into a long press
    ///
    /// Default: 750ms
    pub long_press: Duration,

    /// Edges closer than this to the previous accepted edge are bounce
    ///
    /// Default: 25ms
    pub debounce: Duration,
}

impl Default for PressConfig {
    fn default() -> Self {
        Self {
            long_press: Duration::from_millis(750),
            debounce: Duration::from_millis(25),
        }
    }
}

impl PressConfig {
    pub fn with_long_press(mut self, long_press: Duration) -> Self {
        self.long_press = long_press;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Pure press/release state machine
#[derive(Debug, Clone)]
pub struct PressClassifier {
    config: PressConfig,
    pressed_at: Option<Instant>,
    long_reported: bool,
    last_edge: Option<Instant>,
}

impl PressClassifier {
    pub fn new(config: PressConfig) -> Self {
        Self {
            config,
            pressed_at: None,
            long_reported: false,
            last_edge: None,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }

    /// When a pending press turns long, if one is pending
    pub fn deadline(&self) -> Option<Instant> {
        match self.pressed_at {
            Some(at) if !self.long_reported => Some(at + self.config.long_press),
            _ => None,
        }
    }

    fn debounced(&mut self, at: Instant) -> bool {
        if let Some(last) = self.last_edge {
            if at.saturating_duration_since(last) < self.config.debounce {
                trace!("Button edge bounced");
                return false;
            }
        }
        self.last_edge = Some(at);
        true
    }

    /// Press edge
    pub fn press(&mut self, at: Instant) {
        if self.pressed_at.is_some() || !self.debounced(at) {
            return;
        }
        self.pressed_at = Some(at);
        self.long_reported = false;
    }

    /// Release edge; returns the classification unless a long press was
    /// already reported for this hold
    pub fn release(&mut self, at: Instant) -> Option<Press> {
        let pressed_at = self.pressed_at?;
        if !self.debounced(at) {
            return None;
        }
        self.pressed_at = None;

        if self.long_reported {
            self.long_reported = false;
            return None;
        }

        if at.saturating_duration_since(pressed_at) < self.config.long_press {
            Some(Press::Short)
        } else {
            Some(Press::Long)
        }
    }

    /// Report a long press once the hold reaches the threshold
    pub fn poll(&mut self, now: Instant) -> Option<Press> {
        let deadline = self.deadline()?;
        if now >= deadline {
            self.long_reported = true;
            Some(Press::Long)
        } else {
            None
        }
    }
}

/// Raw button edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEdge {
    Pressed(Instant),
    Released(Instant),
}

/// Cloneable producer of [`ButtonEdge`]s, stamped with the runtime clock
#[derive(Debug, Clone)]
pub struct ButtonInput {
    tx: mpsc::UnboundedSender<ButtonEdge>,
}

impl ButtonInput {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ButtonEdge>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn press(&self) -> bool {
        self.tx.send(ButtonEdge::Pressed(now())).is_ok()
    }

    pub fn release(&self) -> bool {
        self.tx.send(ButtonEdge::Released(now())).is_ok()
    }

    /// Feed a raw level (`true` = pressed)
    pub fn on_level(&self, pressed: bool) -> bool {
        if pressed {
            self.press()
        } else {
            self.release()
        }
    }
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Classify edges from one button until its input or the receiver closes
pub async fn run_button<E>(
    button: ButtonId,
    config: PressConfig,
    mut edges: mpsc::UnboundedReceiver<ButtonEdge>,
    events: mpsc::Sender<E>,
) where
    E: From<ButtonEvent> + Send + 'static,
{
    let mut classifier = PressClassifier::new(config);
    info!("Button '{}' started", button);

    loop {
        let press = match classifier.deadline() {
            Some(deadline) => {
                let sleep = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline));
                tokio::select! {
                    edge = edges.recv() => match edge {
                        Some(edge) => apply(&mut classifier, edge),
                        None => break,
                    },
                    _ = sleep => classifier.poll(now()),
                }
            }
            None => match edges.recv().await {
                Some(edge) => apply(&mut classifier, edge),
                None => break,
            },
        };

        let Some(press) = press else {
            continue;
        };

        debug!("Button '{}': {:?} press", button, press);
        if events.send(E::from(ButtonEvent { button, press })).await.is_err() {
            break;
        }
    }

    info!("Button '{}' shut down", button);
}

fn apply(classifier: &mut PressClassifier, edge: ButtonEdge) -> Option<Press> {
    match edge {
        ButtonEdge::Pressed(at) => {
            classifier.press(at);
            None
        }
        ButtonEdge::Released(at) => classifier.release(at),
    }
}
