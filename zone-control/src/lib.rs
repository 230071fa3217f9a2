//! Zone-player control for the wallbox controller
//!
//! [`ZoneController`] wraps the active zone player behind the handful of
//! operations a wallbox needs: run a play plan, nudge the volume, toggle
//! play/pause, skip, and read what is playing. The player itself is a
//! collaborator behind the [`ZonePlayer`] and [`ZoneDirectory`] traits.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use page_sets::{PlayDescriptor, PlayPlan};
//! use zone_control::memory::{MemoryDirectory, PlayerCall};
//! use zone_control::{ZoneController, DEFAULT_OPERATION_TIMEOUT};
//!
//! # #[tokio::main]
//! # async fn main() -> zone_control::Result<()> {
//! let directory = Arc::new(MemoryDirectory::with_names(["Living Room"]));
//! let zone = directory.get("Living Room").unwrap();
//! let controller = ZoneController::connect(directory, "Living Room", DEFAULT_OPERATION_TIMEOUT).await?;
//!
//! controller
//!     .enqueue_and_play(&PlayPlan::Favorite(PlayDescriptor::new("x-rincon-mp3radio://kexp")))
//!     .await;
//! assert_eq!(zone.calls()[0], PlayerCall::ClearQueue);
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod error;
pub mod memory;
pub mod player;
pub mod track;
pub mod transport;

pub use controller::{apply_volume_delta, ActiveZone, ZoneController, DEFAULT_OPERATION_TIMEOUT};
pub use error::{Result, ZoneError};
pub use player::{ZoneDirectory, ZonePlayer};
pub use track::{
    parse_satellite_metadata, unescape_html, RawTrackInfo, SourceKind, TrackSnapshot, NO_ARTIST,
    NO_TITLE, UNKNOWN_TITLE,
};
pub use transport::TransportState;
