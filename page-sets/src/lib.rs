//! Page sets for the wallbox controller
//!
//! A page set assigns each of the wallbox's 200 slots (`A1` through `V0`)
//! to something playable: a favorite, a saved playlist, or a single track.
//! Page sets are declared in a JSON document keyed by RFID tag payload,
//! materialized against the zone player's music library, and swapped in
//! when a tag is read.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use page_sets::{resolve, LibraryItem, PageSetDocument, PageSetStore, StaticLibrary};
//!
//! # async fn example() -> page_sets::Result<()> {
//! let document = PageSetDocument::from_path("page_sets.json")?;
//! let library = StaticLibrary::new().with_favorite(LibraryItem::new("KEXP", "x-rincon-mp3radio://kexp"));
//! let store = PageSetStore::open(document, Arc::new(library), None).await?;
//!
//! if let Some(resolution) = resolve(0, &store.active()) {
//!     println!("{} -> {:?}", resolution.entry.label, resolution.plan.commands());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod label;
pub mod library;
pub mod page_set;
pub mod resolver;
pub mod store;

pub use config::{
    PageSetDefinition, PageSetDocument, PlayMode, SectionDefinition, MAX_PLAYLIST_TRACKS,
};
pub use error::{LibraryError, PageSetError, Result};
pub use label::{label_for, slot_for_label, LETTERS, SLOTS};
pub use library::{LibraryItem, MusicLibrary, PlayDescriptor, StaticLibrary, StaticPlaylist};
pub use page_set::{clean_title, EntryAction, PageEntry, PageSet};
pub use resolver::{resolve, PlayPlan, Resolution, ZoneCommand};
pub use store::{PageSetStore, PageSetSummary};
