//! In-memory zone players
//!
//! [`MemoryZone`] keeps a queue, a volume and a transport state, and records
//! every command it receives. The bench runner drives the controller against
//! it, and tests assert on [`MemoryZone::calls`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use page_sets::{PlayDescriptor, PlayMode};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Result, ZoneError};
use crate::player::{ZoneDirectory, ZonePlayer};
use crate::track::RawTrackInfo;
use crate::transport::TransportState;

/// A command as observed by a [`MemoryZone`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCall {
    SetVolume(u8),
    Play,
    Pause,
    Next,
    ClearQueue,
    AddToQueue(PlayDescriptor),
    SetPlayMode(PlayMode),
    PlayFromQueue(u32),
}

#[derive(Debug, Default)]
struct ZoneState {
    volume: u8,
    transport: TransportState,
    play_mode: PlayMode,
    queue: Vec<PlayDescriptor>,
    position: Option<usize>,
    track_override: Option<RawTrackInfo>,
    calls: Vec<PlayerCall>,
    offline: bool,
    delay: Option<Duration>,
}

/// Zone player held entirely in memory
#[derive(Debug)]
pub struct MemoryZone {
    name: String,
    state: Mutex<ZoneState>,
}

impl MemoryZone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(ZoneState {
                volume: 20,
                ..Default::default()
            }),
        }
    }

    pub fn with_volume(self, volume: u8) -> Self {
        self.state.lock().volume = volume.min(100);
        self
    }

    pub fn with_transport(self, transport: TransportState) -> Self {
        self.state.lock().transport = transport;
        self
    }

    /// Report `track` from `current_track` regardless of the queue
    pub fn set_track(&self, track: RawTrackInfo) {
        self.state.lock().track_override = Some(track);
    }

    /// Make every call fail as unreachable
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Delay every call, to exercise the operation ceiling
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().delay = delay;
    }

    /// Commands received so far, oldest first
    pub fn calls(&self) -> Vec<PlayerCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn current_volume(&self) -> u8 {
        self.state.lock().volume
    }

    pub fn current_transport(&self) -> TransportState {
        self.state.lock().transport
    }

    pub fn current_play_mode(&self) -> PlayMode {
        self.state.lock().play_mode
    }

    pub fn queue(&self) -> Vec<PlayDescriptor> {
        self.state.lock().queue.clone()
    }

    /// Common prologue: honour delay and offline, then run `f` on the state
    async fn with_state<T>(
        &self,
        call: Option<PlayerCall>,
        f: impl FnOnce(&mut ZoneState) -> T,
    ) -> Result<T> {
        let delay = self.state.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.offline {
            return Err(ZoneError::Unreachable(self.name.clone()));
        }
        if let Some(call) = call {
            debug!("{}: {:?}", self.name, call);
            state.calls.push(call);
        }
        Ok(f(&mut state))
    }
}

#[async_trait]
impl ZonePlayer for MemoryZone {
    fn name(&self) -> &str {
        &self.name
    }

    async fn volume(&self) -> Result<u8> {
        self.with_state(None, |s| s.volume).await
    }

    async fn set_volume(&self, volume: u8) -> Result<()> {
        let volume = volume.min(100);
        self.with_state(Some(PlayerCall::SetVolume(volume)), |s| s.volume = volume)
            .await
    }

    async fn transport_state(&self) -> Result<TransportState> {
        self.with_state(None, |s| s.transport).await
    }

    async fn play(&self) -> Result<()> {
        self.with_state(Some(PlayerCall::Play), |s| {
            if s.position.is_none() && !s.queue.is_empty() {
                s.position = Some(0);
            }
            s.transport = TransportState::Playing;
        })
        .await
    }

    async fn pause(&self) -> Result<()> {
        self.with_state(Some(PlayerCall::Pause), |s| {
            s.transport = TransportState::PausedPlayback
        })
        .await
    }

    async fn next(&self) -> Result<()> {
        self.with_state(Some(PlayerCall::Next), |s| {
            s.track_override = None;
            s.position = match s.position {
                Some(p) if p + 1 < s.queue.len() => Some(p + 1),
                _ => {
                    s.transport = TransportState::Stopped;
                    None
                }
            };
        })
        .await
    }

    async fn clear_queue(&self) -> Result<()> {
        self.with_state(Some(PlayerCall::ClearQueue), |s| {
            s.queue.clear();
            s.position = None;
            s.track_override = None;
            s.transport = TransportState::Stopped;
        })
        .await
    }

    async fn add_to_queue(&self, descriptor: &PlayDescriptor) -> Result<u32> {
        let descriptor = descriptor.clone();
        self.with_state(Some(PlayerCall::AddToQueue(descriptor.clone())), |s| {
            s.queue.push(descriptor);
            s.queue.len() as u32
        })
        .await
    }

    async fn set_play_mode(&self, mode: PlayMode) -> Result<()> {
        self.with_state(Some(PlayerCall::SetPlayMode(mode)), |s| s.play_mode = mode)
            .await
    }

    async fn play_from_queue(&self, position: u32) -> Result<()> {
        let name = self.name.clone();
        self.with_state(Some(PlayerCall::PlayFromQueue(position)), |s| {
            if (position as usize) < s.queue.len() {
                s.position = Some(position as usize);
                s.transport = TransportState::Playing;
                Ok(())
            } else {
                Err(ZoneError::Rejected {
                    operation: "play_from_queue",
                    reason: format!("{} has no queue position {}", name, position),
                })
            }
        })
        .await?
    }

    async fn current_track(&self) -> Result<RawTrackInfo> {
        self.with_state(None, |s| {
            if let Some(track) = &s.track_override {
                return track.clone();
            }
            match s.position.and_then(|p| s.queue.get(p)) {
                Some(descriptor) => RawTrackInfo {
                    title: Some(title_from_metadata(descriptor)),
                    uri: Some(descriptor.uri.clone()),
                    metadata: descriptor.metadata.clone(),
                    ..Default::default()
                },
                None => RawTrackInfo::default(),
            }
        })
        .await
    }
}

/// `dc:title` from DIDL metadata, else the URI
fn title_from_metadata(descriptor: &PlayDescriptor) -> String {
    let title = descriptor.metadata.as_deref().and_then(|xml| {
        let start = xml.find("<dc:title>")? + "<dc:title>".len();
        let end = xml[start..].find("</dc:title>")?;
        Some(xml[start..start + end].to_string())
    });
    title.unwrap_or_else(|| descriptor.uri.clone())
}

/// Directory of [`MemoryZone`]s, listed in insertion order
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    zones: Vec<Arc<MemoryZone>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// One fresh zone per name
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .fold(Self::new(), |dir, name| dir.with_zone(MemoryZone::new(name)))
    }

    pub fn with_zone(mut self, zone: MemoryZone) -> Self {
        self.zones.push(Arc::new(zone));
        self
    }

    /// Concrete zone handle, for inspecting recorded calls
    pub fn get(&self, name: &str) -> Option<Arc<MemoryZone>> {
        self.zones.iter().find(|z| z.name == name).cloned()
    }
}

#[async_trait]
impl ZoneDirectory for MemoryDirectory {
    async fn zone_names(&self) -> Result<Vec<String>> {
        Ok(self.zones.iter().map(|z| z.name.clone()).collect())
    }

    async fn zone(&self, name: &str) -> Result<Arc<dyn ZonePlayer>> {
        self.get(name)
            .map(|zone| zone as Arc<dyn ZonePlayer>)
            .ok_or_else(|| ZoneError::UnknownZone(name.to_string()))
    }
}
