//! Zone-player collaborator traits
//!
//! These describe the command surface the controller needs from a zone
//! player. The network protocol behind them lives elsewhere; an in-memory
//! implementation is in [`crate::memory`].

use std::sync::Arc;

use async_trait::async_trait;
use page_sets::{PlayDescriptor, PlayMode};

use crate::error::Result;
use crate::track::RawTrackInfo;
use crate::transport::TransportState;

/// Command surface of a single zone player
#[async_trait]
pub trait ZonePlayer: Send + Sync {
    /// Zone name, as shown to the user
    fn name(&self) -> &str;

    async fn volume(&self) -> Result<u8>;

    async fn set_volume(&self, volume: u8) -> Result<()>;

    async fn transport_state(&self) -> Result<TransportState>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn next(&self) -> Result<()>;

    async fn clear_queue(&self) -> Result<()>;

    /// Append to the queue, returning the new item's queue position
    async fn add_to_queue(&self, descriptor: &PlayDescriptor) -> Result<u32>;

    async fn set_play_mode(&self, mode: PlayMode) -> Result<()>;

    async fn play_from_queue(&self, position: u32) -> Result<()>;

    async fn current_track(&self) -> Result<RawTrackInfo>;
}

/// Lookup of zone players by name
#[async_trait]
pub trait ZoneDirectory: Send + Sync {
    /// Names of every known zone
    async fn zone_names(&self) -> Result<Vec<String>>;

    /// Player for the zone called `name`
    async fn zone(&self, name: &str) -> Result<Arc<dyn ZonePlayer>>;
}
