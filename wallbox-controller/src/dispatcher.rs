//! Event dispatcher
//!
//! One task owns the zone controller, the page-set store and the display
//! renderer. Peripheral tasks post [`ControllerEvent`]s into a single queue;
//! the dispatcher handles them one at a time, so a second selection that
//! arrives while a play plan is still being enqueued waits its turn. Between
//! events it polls the active zone for track changes, takes expired
//! messages down and switches to the idle screen.

use std::sync::Arc;
use std::time::Duration;

use input_devices::{ButtonEvent, ButtonId, PageTag, Press, Rotation};
use page_sets::{resolve, PageSetError, PageSetStore};
use pulse_decoder::{DecoderEvent, RejectCause, Selection};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use zone_control::{TrackSnapshot, TransportState, ZoneController};

use crate::config::ControllerConfig;
use crate::display::{DisplayError, DisplayRenderer, IdleScreen};

/// Period of the message expiry and idle check
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_millis(250);

/// Everything the dispatcher reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    Decoder(DecoderEvent),
    Rotation(Rotation),
    Button(ButtonEvent),
    Tag(PageTag),
    /// Clear the display and stop
    Shutdown,
}

impl From<DecoderEvent> for ControllerEvent {
    fn from(event: DecoderEvent) -> Self {
        ControllerEvent::Decoder(event)
    }
}

impl From<Rotation> for ControllerEvent {
    fn from(rotation: Rotation) -> Self {
        ControllerEvent::Rotation(rotation)
    }
}

impl From<ButtonEvent> for ControllerEvent {
    fn from(event: ButtonEvent) -> Self {
        ControllerEvent::Button(event)
    }
}

impl From<PageTag> for ControllerEvent {
    fn from(tag: PageTag) -> Self {
        ControllerEvent::Tag(tag)
    }
}

/// Cloneable producer side of the dispatcher queue
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<ControllerEvent>,
}

impl DispatcherHandle {
    /// Raw sender, for peripheral tasks generic over their event type
    pub fn sender(&self) -> mpsc::Sender<ControllerEvent> {
        self.tx.clone()
    }

    /// Post an event; false once the dispatcher has stopped
    pub async fn send(&self, event: impl Into<ControllerEvent>) -> bool {
        self.tx.send(event.into()).await.is_ok()
    }

    pub async fn shutdown(&self) -> bool {
        self.send(ControllerEvent::Shutdown).await
    }
}

/// The event-routed coordinator
pub struct Dispatcher {
    events: mpsc::Receiver<ControllerEvent>,
    store: Arc<PageSetStore>,
    zones: Arc<ZoneController>,
    renderer: Arc<DisplayRenderer>,
    idle_screen: Box<dyn IdleScreen>,
    ring: Vec<String>,
    volume_step_up: u8,
    volume_step_down: u8,
    message_ttl: Duration,
    track_poll_interval: Duration,
    idle_refresh_interval: Duration,
    last_track: Option<TrackSnapshot>,
}

impl Dispatcher {
    pub fn new(
        config: &ControllerConfig,
        store: Arc<PageSetStore>,
        zones: Arc<ZoneController>,
        renderer: Arc<DisplayRenderer>,
        idle_screen: Box<dyn IdleScreen>,
    ) -> (Self, DispatcherHandle) {
        let (tx, events) = mpsc::channel(config.event_buffer_size);
        let dispatcher = Self {
            events,
            store,
            zones,
            renderer,
            idle_screen,
            ring: config.zones.clone(),
            volume_step_up: config.volume_step_up,
            volume_step_down: config.volume_step_down,
            message_ttl: config.message_ttl,
            track_poll_interval: config.track_poll_interval,
            idle_refresh_interval: config.idle_refresh_interval,
            last_track: None,
        };
        (dispatcher, DispatcherHandle { tx })
    }

    /// Track snapshot last put on the display
    pub fn last_track(&self) -> Option<&TrackSnapshot> {
        self.last_track.as_ref()
    }

    /// Run until `Shutdown` or until every handle is dropped
    pub async fn run(mut self) {
        let mut track_poll = tokio::time::interval(self.track_poll_interval);
        track_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut housekeeping = tokio::time::interval(HOUSEKEEPING_INTERVAL);
        housekeeping.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut idle_refresh = tokio::time::interval(self.idle_refresh_interval);
        idle_refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Dispatcher started: page set '{}', zone '{}'",
            self.store.active().name(),
            self.zones.active_zone().name
        );

        loop {
            tokio::select! {
                event = self.events.recv() => {
                    let Some(event) = event else {
                        info!("All event producers gone, stopping dispatcher");
                        self.teardown().await;
                        break;
                    };
                    if !self.handle(event).await {
                        break;
                    }
                }
                _ = track_poll.tick() => self.poll_track().await,
                _ = housekeeping.tick() => self.housekeeping(Instant::now()).await,
                _ = idle_refresh.tick() => {
                    if self.renderer.is_idle() {
                        self.show_idle_screen().await;
                    }
                }
            }
        }

        info!("Dispatcher shut down");
    }

    /// Handle one event; false after `Shutdown`
    pub async fn handle(&mut self, event: ControllerEvent) -> bool {
        debug!("Dispatching {:?}", event);
        match event {
            ControllerEvent::Decoder(DecoderEvent::SelectionDecoded(selection)) => {
                self.on_selection(selection).await
            }
            ControllerEvent::Decoder(DecoderEvent::DecodeRejected(cause)) => {
                self.on_rejected(cause).await
            }
            ControllerEvent::Rotation(rotation) => self.on_rotation(rotation).await,
            ControllerEvent::Button(event) => self.on_button(event).await,
            ControllerEvent::Tag(tag) => self.on_tag(tag).await,
            ControllerEvent::Shutdown => {
                info!("Shutdown requested");
                self.teardown().await;
                return false;
            }
        }
        true
    }

    async fn on_selection(&mut self, selection: Selection) {
        let page_set = self.store.active();
        let Some(resolution) = resolve(selection.slot(), &page_set) else {
            warn!("{} is outside page set '{}'", selection, page_set.name());
            return;
        };
        let entry = resolution.entry;

        if entry.is_empty() {
            info!("Selection {} is an empty slot", entry.label);
            self.show_message(&["Empty slot", entry.label.as_str()]).await;
            return;
        }

        info!(
            "Selection {} -> '{}' ({})",
            entry.label,
            entry.title,
            entry.action.kind()
        );
        if !self.zones.enqueue_and_play(&resolution.plan).await {
            self.show_message(&["Play failed", entry.label.as_str()]).await;
            return;
        }

        let lines = [entry.title.as_str(), entry.artist.as_str(), entry.label.as_str()];
        if self.show(&lines, Duration::ZERO).await {
            self.last_track = Some(self.zones.track_info().await);
        }
    }

    async fn on_rejected(&mut self, cause: RejectCause) {
        info!("Selection rejected: {}", cause);
        self.show_message(&["Bad selection", cause.code()]).await;
    }

    async fn on_tag(&mut self, tag: PageTag) {
        let payload = tag.payload();
        match self.store.activate(&payload).await {
            Ok(page_set) => {
                let name = page_set.name().to_string();
                self.show_message(&["Loaded", name.as_str()]).await;
            }
            Err(PageSetError::UnknownTag(_)) => {
                info!("Tag {} has no page set", payload);
                self.show_message(&["Unknown tag", payload.as_str()]).await;
            }
            Err(e) => {
                warn!("Could not load page set for tag {}: {}", payload, e);
                self.show_message(&["Load failed", payload.as_str()]).await;
            }
        }
    }

    async fn on_rotation(&mut self, rotation: Rotation) {
        let delta = match rotation {
            Rotation::Clockwise => i32::from(self.volume_step_up),
            Rotation::CounterClockwise => -i32::from(self.volume_step_down),
        };
        if let Some(volume) = self.zones.volume_delta(delta).await {
            let volume = volume.to_string();
            self.show_message(&["Volume", volume.as_str()]).await;
        }
    }

    async fn on_button(&mut self, event: ButtonEvent) {
        match (event.button, event.press) {
            (ButtonId::Encoder, Press::Short) => match self.zones.pause_play_toggle().await {
                Some(TransportState::Playing) => self.show_message(&["Play"]).await,
                Some(_) => self.show_message(&["Pause"]).await,
                None => {}
            },
            (ButtonId::Encoder, Press::Long) => {
                if self.zones.skip_next().await {
                    self.show_message(&["Next track"]).await;
                } else {
                    self.show_message(&["Cannot skip"]).await;
                }
            }
            (ButtonId::Unit, Press::Short) => self.next_zone().await,
            (ButtonId::Unit, Press::Long) => self.show_status().await,
        }
    }

    /// Name after the active zone in the ring, wrapping; the first when the
    /// active zone is not in the ring
    fn next_in_ring(&self) -> Option<&str> {
        let active = self.zones.active_zone().name;
        let next = match self.ring.iter().position(|name| *name == active) {
            Some(i) => (i + 1) % self.ring.len(),
            None => 0,
        };
        self.ring.get(next).map(String::as_str)
    }

    async fn next_zone(&mut self) {
        let Some(name) = self.next_in_ring().map(str::to_string) else {
            return;
        };
        match self.zones.select_active(&name).await {
            Ok(zone) => {
                self.last_track = None;
                self.show_message(&["Zone", zone.name.as_str()]).await;
            }
            Err(e) => {
                warn!("Could not switch to zone '{}': {}", name, e);
                self.show_message(&["Zone unavailable", name.as_str()]).await;
            }
        }
    }

    async fn show_status(&mut self) {
        let zone = self.zones.active_zone();
        let volume = match zone.last_volume {
            Some(volume) => format!("Volume {}", volume),
            None => "Volume ?".to_string(),
        };
        let page_set = self.store.active();
        self.show_message(&[zone.name.as_str(), volume.as_str(), page_set.name()])
            .await;
    }

    /// Re-render when the active zone reports a different track
    pub async fn poll_track(&mut self) {
        let snapshot = self.zones.track_info().await;
        if self.last_track.as_ref() == Some(&snapshot) {
            return;
        }
        if self.renderer.has_message(Instant::now()) {
            return;
        }
        if !has_title(&snapshot) {
            self.last_track = Some(snapshot);
            return;
        }

        debug!("Track changed: '{}' by '{}'", snapshot.title, snapshot.artist);
        let zone = self.zones.active_zone().name;
        let lines = [snapshot.title.as_str(), snapshot.artist.as_str(), zone.as_str()];
        if self.show(&lines, Duration::ZERO).await {
            self.last_track = Some(snapshot);
        }
    }

    /// Take expired messages down and enter the idle screen when quiet
    pub async fn housekeeping(&mut self, now: Instant) {
        if self.renderer.message_expired(now) {
            self.renderer.acknowledge_expiry();
            self.show_home().await;
        }
        if self.renderer.idle_ready(now) {
            debug!("Display quiet, showing idle screen");
            self.show_idle_screen().await;
        }
    }

    /// The screen behind transient messages: the current track when known
    async fn show_home(&mut self) {
        let zone = self.zones.active_zone().name;
        let lines = match self.last_track.as_ref().filter(|track| has_title(track)) {
            Some(track) => vec![track.title.clone(), track.artist.clone(), zone],
            None => vec![self.store.active().name().to_string(), zone],
        };
        self.show(&lines, Duration::ZERO).await;
    }

    async fn show_idle_screen(&mut self) {
        let lines = self.idle_screen.lines().await;
        if let Err(e) = self.renderer.show_idle(&lines).await {
            log_display_error(e);
        }
    }

    async fn show_message(&mut self, lines: &[&str]) {
        self.show(lines, self.message_ttl).await;
    }

    /// Write to the display; a busy display drops the write
    async fn show<S: AsRef<str>>(&mut self, lines: &[S], ttl: Duration) -> bool {
        match self.renderer.show(lines, ttl).await {
            Ok(()) => true,
            Err(e) => {
                log_display_error(e);
                false
            }
        }
    }

    async fn teardown(&mut self) {
        if let Err(e) = self.renderer.clear().await {
            log_display_error(e);
        }
    }
}

/// Whether a snapshot is worth a screen: nothing playing reads as an empty title
fn has_title(track: &TrackSnapshot) -> bool {
    !track.is_unknown() && !track.title.is_empty()
}

fn log_display_error(error: DisplayError) {
    match error {
        DisplayError::Busy => debug!("Display busy, write dropped"),
        DisplayError::Device(reason) => warn!("Display write failed: {}", reason),
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("ring", &self.ring)
            .field("volume_step_up", &self.volume_step_up)
            .field("volume_step_down", &self.volume_step_down)
            .field("last_track", &self.last_track)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_conversions() {
        let tag = PageTag::new(7);
        assert_eq!(ControllerEvent::from(tag), ControllerEvent::Tag(tag));
        assert_eq!(
            ControllerEvent::from(Rotation::Clockwise),
            ControllerEvent::Rotation(Rotation::Clockwise)
        );
        let press = ButtonEvent {
            button: ButtonId::Unit,
            press: Press::Long,
        };
        assert_eq!(ControllerEvent::from(press), ControllerEvent::Button(press));
    }
}
