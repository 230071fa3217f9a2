//! Zone controller
//!
//! Thin adapter over the active [`ZonePlayer`]. Every player call runs
//! under a fixed ceiling (5 s by default). Transient failures are logged
//! and swallowed here: callers get `None`/`false` back and the command is
//! never retried. Only `select_active` reports its error, because an
//! unknown zone is not transient.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use page_sets::{PlayPlan, ZoneCommand};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, ZoneError};
use crate::player::{ZoneDirectory, ZonePlayer};
use crate::track::TrackSnapshot;
use crate::transport::TransportState;

/// Default ceiling for a single player call
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Apply a volume change, saturating at 0 and 100
pub fn apply_volume_delta(current: u8, delta: i32) -> u8 {
    (current as i32).saturating_add(delta).clamp(0, 100) as u8
}

/// Public view of the active zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveZone {
    pub name: String,
    pub last_volume: Option<u8>,
}

struct Active {
    player: Arc<dyn ZonePlayer>,
    last_volume: Option<u8>,
}

/// Adapter over the active zone player
pub struct ZoneController {
    directory: Arc<dyn ZoneDirectory>,
    active: RwLock<Active>,
    operation_timeout: Duration,
}

impl ZoneController {
    /// Connect to the zone called `default_zone`
    pub async fn connect(
        directory: Arc<dyn ZoneDirectory>,
        default_zone: &str,
        operation_timeout: Duration,
    ) -> Result<Self> {
        let player = timed(
            "zone lookup",
            operation_timeout,
            directory.zone(default_zone),
        )
        .await?;
        let last_volume = timed("get volume", operation_timeout, player.volume())
            .await
            .ok();

        info!(
            "Zone controller connected to '{}' (volume {:?})",
            player.name(),
            last_volume
        );

        Ok(Self {
            directory,
            active: RwLock::new(Active {
                player,
                last_volume,
            }),
            operation_timeout,
        })
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Name and last known volume of the active zone
    pub fn active_zone(&self) -> ActiveZone {
        let active = self.active.read();
        ActiveZone {
            name: active.player.name().to_string(),
            last_volume: active.last_volume,
        }
    }

    /// Names of every zone the directory knows
    pub async fn zone_names(&self) -> Result<Vec<String>> {
        timed(
            "list zones",
            self.operation_timeout,
            self.directory.zone_names(),
        )
        .await
    }

    /// Switch the active zone
    pub async fn select_active(&self, name: &str) -> Result<ActiveZone> {
        let player = timed(
            "zone lookup",
            self.operation_timeout,
            self.directory.zone(name),
        )
        .await?;
        let last_volume = self.call("get volume", player.volume()).await;

        *self.active.write() = Active {
            player,
            last_volume,
        };

        let zone = self.active_zone();
        info!("Active zone is now '{}'", zone.name);
        Ok(zone)
    }

    /// Set the volume, clamped to 100; returns the volume set
    pub async fn set_volume(&self, volume: u8) -> Option<u8> {
        let volume = volume.min(100);
        let player = self.player();
        self.call("set volume", player.set_volume(volume)).await?;
        self.remember_volume(volume);
        Some(volume)
    }

    /// Change the volume by `delta`, saturating; returns the volume set
    pub async fn volume_delta(&self, delta: i32) -> Option<u8> {
        let player = self.player();
        let current = self.call("get volume", player.volume()).await?;
        let new_volume = apply_volume_delta(current, delta);
        if new_volume == current {
            self.remember_volume(current);
            return Some(current);
        }
        self.call("set volume", player.set_volume(new_volume)).await?;
        self.remember_volume(new_volume);
        debug!("Volume {} -> {}", current, new_volume);
        Some(new_volume)
    }

    /// Resume when paused or stopped, pause otherwise; returns the new state
    pub async fn pause_play_toggle(&self) -> Option<TransportState> {
        let player = self.player();
        let state = self
            .call("get transport info", player.transport_state())
            .await?;

        if state.should_resume() {
            self.call("play", player.play()).await?;
            Some(TransportState::Playing)
        } else {
            self.call("pause", player.pause()).await?;
            Some(TransportState::PausedPlayback)
        }
    }

    /// Skip to the next track when the source supports it
    pub async fn skip_next(&self) -> bool {
        let player = self.player();
        let track = self.track_info().await;
        if !track.source_kind.supports_skip() {
            info!(
                "Not skipping on '{}': {:?} source has no next track",
                player.name(),
                track.source_kind
            );
            return false;
        }
        self.call("next", player.next()).await.is_some()
    }

    /// Execute a play plan, stopping at the first failed command
    pub async fn enqueue_and_play(&self, plan: &PlayPlan) -> bool {
        let player = self.player();
        let commands = plan.commands();
        if commands.is_empty() {
            debug!("Empty play plan, nothing to do");
            return true;
        }

        for command in &commands {
            let done = match command {
                ZoneCommand::ClearQueue => self.call("clear queue", player.clear_queue()).await,
                ZoneCommand::AddToQueue(descriptor) => self
                    .call("add to queue", player.add_to_queue(descriptor))
                    .await
                    .map(|_| ()),
                ZoneCommand::SetPlayMode(mode) => {
                    self.call("set play mode", player.set_play_mode(*mode)).await
                }
                ZoneCommand::PlayFromQueue(position) => {
                    self.call("play from queue", player.play_from_queue(*position))
                        .await
                }
                ZoneCommand::Play => self.call("play", player.play()).await,
            };
            if done.is_none() {
                warn!(
                    "Play plan on '{}' abandoned at {:?}",
                    player.name(),
                    command
                );
                return false;
            }
        }

        info!("Play plan executed on '{}'", player.name());
        true
    }

    /// Current track, or [`TrackSnapshot::unknown`] when it cannot be read
    pub async fn track_info(&self) -> TrackSnapshot {
        let player = self.player();
        match self.call("get track info", player.current_track()).await {
            Some(raw) => TrackSnapshot::from_raw(&raw),
            None => TrackSnapshot::unknown(),
        }
    }

    fn player(&self) -> Arc<dyn ZonePlayer> {
        self.active.read().player.clone()
    }

    fn remember_volume(&self, volume: u8) {
        self.active.write().last_volume = Some(volume);
    }

    /// Run one player call under the ceiling, logging and swallowing failure
    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Option<T> {
        match timed(operation, self.operation_timeout, fut).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Zone operation failed: {}", e);
                None
            }
        }
    }
}

impl std::fmt::Debug for ZoneController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneController")
            .field("active", &self.active_zone())
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

async fn timed<T>(
    operation: &'static str,
    timeout: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ZoneError::Timeout { operation, timeout }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDirectory, MemoryZone, PlayerCall};
    use crate::track::{RawTrackInfo, SourceKind};
    use page_sets::{PlayDescriptor, PlayMode};
    use rstest::rstest;

    #[rstest]
    #[case(50, 4, 54)]
    #[case(50, -5, 45)]
    #[case(98, 4, 100)]
    #[case(3, -5, 0)]
    #[case(0, i32::MIN, 0)]
    #[case(100, i32::MAX, 100)]
    fn test_apply_volume_delta(#[case] current: u8, #[case] delta: i32, #[case] expected: u8) {
        assert_eq!(apply_volume_delta(current, delta), expected);
    }

    async fn controller(zone: MemoryZone) -> (ZoneController, Arc<MemoryZone>) {
        let name = zone.name().to_string();
        let directory = Arc::new(
            MemoryDirectory::new()
                .with_zone(zone)
                .with_zone(MemoryZone::new("Den").with_volume(10)),
        );
        let handle = directory.get(&name).unwrap();
        let controller = ZoneController::connect(directory, &name, DEFAULT_OPERATION_TIMEOUT)
            .await
            .unwrap();
        (controller, handle)
    }

    #[tokio::test]
    async fn test_connect_reads_volume() {
        let (controller, _) = controller(MemoryZone::new("Kitchen").with_volume(33)).await;
        assert_eq!(
            controller.active_zone(),
            ActiveZone {
                name: "Kitchen".to_string(),
                last_volume: Some(33),
            }
        );
    }

    #[tokio::test]
    async fn test_connect_to_unknown_zone_fails() {
        let directory = Arc::new(MemoryDirectory::with_names(["Kitchen"]));
        let result = ZoneController::connect(directory, "Attic", DEFAULT_OPERATION_TIMEOUT).await;
        assert!(matches!(result, Err(ZoneError::UnknownZone(_))));
    }

    #[tokio::test]
    async fn test_volume_delta_sets_new_volume() {
        let (controller, zone) = controller(MemoryZone::new("Kitchen").with_volume(50)).await;

        assert_eq!(controller.volume_delta(4).await, Some(54));
        assert_eq!(controller.volume_delta(-5).await, Some(49));
        assert_eq!(zone.current_volume(), 49);
        assert_eq!(controller.active_zone().last_volume, Some(49));
        assert_eq!(
            zone.calls(),
            vec![PlayerCall::SetVolume(54), PlayerCall::SetVolume(49)]
        );
    }

    #[tokio::test]
    async fn test_volume_at_limit_issues_no_command() {
        let (controller, zone) = controller(MemoryZone::new("Kitchen").with_volume(100)).await;
        assert_eq!(controller.volume_delta(4).await, Some(100));
        assert!(zone.calls().is_empty());
    }

    #[tokio::test]
    async fn test_set_volume_saturates() {
        let (controller, zone) = controller(MemoryZone::new("Kitchen")).await;
        assert_eq!(controller.set_volume(250).await, Some(100));
        assert_eq!(zone.current_volume(), 100);
    }

    #[rstest]
    #[case(TransportState::Stopped, PlayerCall::Play, TransportState::Playing)]
    #[case(TransportState::PausedPlayback, PlayerCall::Play, TransportState::Playing)]
    #[case(TransportState::Playing, PlayerCall::Pause, TransportState::PausedPlayback)]
    #[case(TransportState::Transitioning, PlayerCall::Pause, TransportState::PausedPlayback)]
    #[tokio::test]
    async fn test_pause_play_toggle(
        #[case] before: TransportState,
        #[case] call: PlayerCall,
        #[case] after: TransportState,
    ) {
        let (controller, zone) = controller(MemoryZone::new("Kitchen").with_transport(before)).await;
        assert_eq!(controller.pause_play_toggle().await, Some(after));
        assert_eq!(zone.calls(), vec![call]);
    }

    #[tokio::test]
    async fn test_skip_suppressed_for_radio() {
        let (controller, zone) = controller(MemoryZone::new("Kitchen")).await;
        zone.set_track(RawTrackInfo {
            title: Some("KEXP".to_string()),
            uri: Some("x-rincon-mp3radio://kexp.org/stream".to_string()),
            ..Default::default()
        });

        assert!(!controller.skip_next().await);
        assert!(zone.calls().is_empty());
    }

    #[tokio::test]
    async fn test_skip_on_queue() {
        let (controller, zone) = controller(MemoryZone::new("Kitchen")).await;
        let plan = PlayPlan::Playlist {
            descriptor: PlayDescriptor::new("x-file-cifs://nas/list"),
            play_mode: PlayMode::Normal,
        };
        assert!(controller.enqueue_and_play(&plan).await);
        zone.clear_calls();

        assert_eq!(controller.track_info().await.source_kind, SourceKind::Queue);
        assert!(controller.skip_next().await);
        assert_eq!(zone.calls(), vec![PlayerCall::Next]);
    }

    #[tokio::test]
    async fn test_failed_command_abandons_plan() {
        let (controller, zone) = controller(MemoryZone::new("Kitchen")).await;
        zone.set_offline(true);

        let plan = PlayPlan::Track(PlayDescriptor::new("uri:t"));
        assert!(!controller.enqueue_and_play(&plan).await);
        assert!(zone.calls().is_empty());
    }

    #[tokio::test]
    async fn test_track_info_unknown_when_unreachable() {
        let (controller, zone) = controller(MemoryZone::new("Kitchen")).await;
        zone.set_offline(true);
        assert!(controller.track_info().await.is_unknown());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_player_times_out() {
        let (controller, zone) = controller(MemoryZone::new("Kitchen")).await;
        zone.set_delay(Some(Duration::from_secs(6)));

        let started = tokio::time::Instant::now();
        assert_eq!(controller.set_volume(10).await, None);
        assert!(started.elapsed() >= DEFAULT_OPERATION_TIMEOUT);
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_select_active() {
        let (controller, _) = controller(MemoryZone::new("Kitchen")).await;

        let zone = controller.select_active("Den").await.unwrap();
        assert_eq!(zone.name, "Den");
        assert_eq!(zone.last_volume, Some(10));

        assert!(controller.select_active("Attic").await.is_err());
        assert_eq!(controller.active_zone().name, "Den");
    }
}
