//! Materialized page sets
//!
//! A [`PageSet`] always holds exactly [`SLOTS`] entries. Sections fill
//! consecutive slots from their start slot; a later section overwrites an
//! earlier one on collision, and untouched slots stay [`EntryAction::Empty`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{PageSetDefinition, PlayMode, SectionDefinition, MAX_PLAYLIST_TRACKS};
use crate::error::{LibraryError, PageSetError, Result};
use crate::label::{label_for, SLOTS};
use crate::library::{LibraryItem, MusicLibrary, PlayDescriptor};

/// What selecting an entry does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryAction {
    Favorite { descriptor: PlayDescriptor },
    Playlist {
        descriptor: PlayDescriptor,
        play_mode: PlayMode,
    },
    PlaylistTrack { descriptor: PlayDescriptor },
    /// Nothing configured for this slot
    Empty,
}

impl EntryAction {
    pub fn kind(&self) -> &'static str {
        match self {
            EntryAction::Favorite { .. } => "favorite",
            EntryAction::Playlist { .. } => "playlist",
            EntryAction::PlaylistTrack { .. } => "playlist_track",
            EntryAction::Empty => "empty",
        }
    }

    pub fn descriptor(&self) -> Option<&PlayDescriptor> {
        match self {
            EntryAction::Favorite { descriptor }
            | EntryAction::Playlist { descriptor, .. }
            | EntryAction::PlaylistTrack { descriptor } => Some(descriptor),
            EntryAction::Empty => None,
        }
    }
}

/// One of the 200 wallbox slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    pub slot: u16,
    pub label: String,
    pub title: String,
    pub artist: String,
    pub source: String,
    pub action: EntryAction,
}

impl PageEntry {
    /// Sentinel for an unconfigured slot
    pub fn empty(slot: u16) -> Self {
        Self {
            slot,
            label: label_for(slot).unwrap_or_default(),
            title: String::new(),
            artist: String::new(),
            source: String::new(),
            action: EntryAction::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.action == EntryAction::Empty
    }
}

/// A complete assignment of wallbox slots to playable actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSet {
    id: String,
    name: String,
    entries: Vec<PageEntry>,
    playlists: Vec<LibraryItem>,
}

impl PageSet {
    /// A page set with every slot empty
    pub fn blank(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entries: (0..SLOTS).map(PageEntry::empty).collect(),
            playlists: Vec::new(),
        }
    }

    /// RFID tag payload this page set is keyed by
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[PageEntry] {
        &self.entries
    }

    pub fn entry(&self, slot: u16) -> Option<&PageEntry> {
        self.entries.get(slot as usize)
    }

    /// Playlist listing fetched while materializing, if any section needed it
    pub fn playlists(&self) -> &[LibraryItem] {
        &self.playlists
    }

    /// Number of slots holding something playable
    pub fn filled(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_empty()).count()
    }

    fn put(&mut self, slot: u16, entry: PageEntry) -> bool {
        if slot >= SLOTS {
            return false;
        }
        self.entries[slot as usize] = entry;
        true
    }

    /// Build a page set from its definition, querying `library` for content
    ///
    /// Library outages fail the whole page set. A missing playlist only
    /// leaves its section empty.
    pub async fn materialize(
        tag: &str,
        definition: &PageSetDefinition,
        library: &dyn MusicLibrary,
    ) -> Result<Self> {
        let mut page_set = PageSet::blank(tag, definition.page_set_name.clone());
        let mut favorites: Option<Vec<LibraryItem>> = None;
        let mut playlists: Option<Vec<LibraryItem>> = None;

        let library_error = |source: LibraryError| PageSetError::Library {
            tag: tag.to_string(),
            source,
        };

        for section in &definition.sections {
            let start = section.start_slot();
            let fill: Vec<PageEntry> = match section {
                SectionDefinition::Favorites {
                    start_list,
                    end_list,
                    ..
                } => {
                    if favorites.is_none() {
                        favorites = Some(library.favorites().await.map_err(library_error)?);
                    }
                    let items = favorites.as_deref().unwrap_or_default();
                    list_range(items, *start_list, *end_list, tag, section)
                        .iter()
                        .map(favorite_entry)
                        .collect()
                }

                SectionDefinition::Playlists {
                    start_list,
                    end_list,
                    play_mode,
                    ..
                } => {
                    if playlists.is_none() {
                        playlists = Some(library.playlists().await.map_err(library_error)?);
                    }
                    let items = playlists.as_deref().unwrap_or_default();
                    list_range(items, *start_list, *end_list, tag, section)
                        .iter()
                        .map(|item| playlist_entry(item, *play_mode))
                        .collect()
                }

                SectionDefinition::PlaylistTracks {
                    playlist_name,
                    start_list,
                    ..
                } => match library
                    .playlist_tracks(playlist_name, MAX_PLAYLIST_TRACKS)
                    .await
                {
                    Ok(tracks) => tracks
                        .iter()
                        .skip(*start_list)
                        .map(track_entry)
                        .collect(),
                    Err(LibraryError::PlaylistNotFound(name)) => {
                        warn!(
                            "Page set '{}': playlist '{}' not found, leaving section empty",
                            tag, name
                        );
                        Vec::new()
                    }
                    Err(e) => return Err(library_error(e)),
                },
            };

            let mut dropped = 0usize;
            for (offset, mut entry) in fill.into_iter().enumerate() {
                let slot = start as usize + offset;
                let Ok(slot) = u16::try_from(slot) else {
                    dropped += 1;
                    continue;
                };
                entry.slot = slot;
                entry.label = label_for(slot).unwrap_or_default();
                if !page_set.put(slot, entry) {
                    dropped += 1;
                }
            }
            if dropped > 0 {
                warn!(
                    "Page set '{}': {} section at slot {} overflowed, dropped {} entries",
                    tag,
                    section.type_name(),
                    start,
                    dropped
                );
            }
        }

        page_set.playlists = playlists.unwrap_or_default();
        debug!(
            "Materialized page set '{}' ({}): {} of {} slots filled",
            tag,
            page_set.name,
            page_set.filled(),
            SLOTS
        );
        Ok(page_set)
    }
}

/// Items `start..=end`, clamped to what the library returned
fn list_range<'a>(
    items: &'a [LibraryItem],
    start: usize,
    end: usize,
    tag: &str,
    section: &SectionDefinition,
) -> &'a [LibraryItem] {
    if end >= items.len() {
        warn!(
            "Page set '{}': {} section asks for items {}..={} but the library has {}",
            tag,
            section.type_name(),
            start,
            end,
            items.len()
        );
    }
    let from = start.min(items.len());
    let to = end.saturating_add(1).min(items.len());
    &items[from..to]
}

fn favorite_entry(item: &LibraryItem) -> PageEntry {
    PageEntry {
        slot: 0,
        label: String::new(),
        title: item.title.clone(),
        artist: item.creator.clone().unwrap_or_default(),
        source: item.title.clone(),
        action: EntryAction::Favorite {
            descriptor: item.descriptor.clone(),
        },
    }
}

fn playlist_entry(item: &LibraryItem, play_mode: PlayMode) -> PageEntry {
    PageEntry {
        slot: 0,
        label: String::new(),
        title: item.title.clone(),
        artist: item.creator.clone().unwrap_or_default(),
        source: "Playlist".to_string(),
        action: EntryAction::Playlist {
            descriptor: item.descriptor.clone(),
            play_mode,
        },
    }
}

fn track_entry(item: &LibraryItem) -> PageEntry {
    PageEntry {
        slot: 0,
        label: String::new(),
        title: clean_title(&item.title),
        artist: item.creator.clone().unwrap_or_default(),
        source: item.album.clone().unwrap_or_default(),
        action: EntryAction::PlaylistTrack {
            descriptor: item.descriptor.clone(),
        },
    }
}

/// Strip ` - ...` and trailing `(...)` decorations from a track title
///
/// `"Hound Dog - 2002 Remaster"` becomes `"Hound Dog"` and
/// `"Jailhouse Rock (Live)"` becomes `"Jailhouse Rock"`. A title that would
/// clean down to nothing is returned unchanged.
pub fn clean_title(title: &str) -> String {
    let mut cleaned = match title.find(" - ") {
        Some(at) => &title[..at],
        None => title,
    }
    .trim_end();

    if cleaned.ends_with(')') {
        if let Some(open) = cleaned.rfind('(') {
            cleaned = cleaned[..open].trim_end();
        }
    }

    if cleaned.trim().is_empty() {
        title.trim().to_string()
    } else {
        cleaned.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::StaticLibrary;
    use rstest::rstest;

    #[rstest]
    #[case("Hound Dog", "Hound Dog")]
    #[case("Hound Dog - 2002 Remaster", "Hound Dog")]
    #[case("Jailhouse Rock (Live)", "Jailhouse Rock")]
    #[case("Blue Suede Shoes (Mono) - Remastered", "Blue Suede Shoes")]
    #[case("(I Can't Get No) Satisfaction", "(I Can't Get No) Satisfaction")]
    #[case("(Untitled)", "(Untitled)")]
    #[case(" - ", "-")]
    fn test_clean_title(#[case] raw: &str, #[case] cleaned: &str) {
        assert_eq!(clean_title(raw), cleaned);
    }

    #[test]
    fn test_blank_has_every_slot() {
        let page_set = PageSet::blank("tag", "Blank");
        assert_eq!(page_set.entries().len(), SLOTS as usize);
        assert_eq!(page_set.filled(), 0);
        assert_eq!(page_set.entry(199).unwrap().label, "V0");
        assert!(page_set.entry(200).is_none());
    }

    fn favorites(n: usize) -> StaticLibrary {
        (0..n).fold(StaticLibrary::new(), |lib, i| {
            lib.with_favorite(LibraryItem::new(format!("Fav {}", i), format!("uri:fav{}", i)))
        })
    }

    #[tokio::test]
    async fn test_favorites_fill_from_start_slot() {
        let definition = PageSetDefinition {
            page_set_name: "Radio".to_string(),
            sections: vec![SectionDefinition::Favorites {
                start_label: 20,
                start_list: 1,
                end_list: 3,
            }],
        };

        let page_set = PageSet::materialize("t", &definition, &favorites(5))
            .await
            .unwrap();

        assert_eq!(page_set.filled(), 3);
        let entry = page_set.entry(20).unwrap();
        assert_eq!(entry.label, "A2");
        assert_eq!(entry.title, "Fav 1");
        assert_eq!(entry.source, "Fav 1");
        assert_eq!(entry.action.kind(), "favorite");
        assert_eq!(page_set.entry(22).unwrap().title, "Fav 3");
        assert!(page_set.entry(23).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_list_is_clamped() {
        let definition = PageSetDefinition {
            page_set_name: "Radio".to_string(),
            sections: vec![SectionDefinition::Favorites {
                start_label: 0,
                start_list: 0,
                end_list: 49,
            }],
        };

        let page_set = PageSet::materialize("t", &definition, &favorites(4))
            .await
            .unwrap();
        assert_eq!(page_set.filled(), 4);
    }

    #[tokio::test]
    async fn test_overflow_past_last_slot_is_dropped() {
        let definition = PageSetDefinition {
            page_set_name: "Radio".to_string(),
            sections: vec![SectionDefinition::Favorites {
                start_label: 198,
                start_list: 0,
                end_list: 4,
            }],
        };

        let page_set = PageSet::materialize("t", &definition, &favorites(5))
            .await
            .unwrap();
        assert_eq!(page_set.entries().len(), SLOTS as usize);
        assert_eq!(page_set.filled(), 2);
        assert_eq!(page_set.entry(199).unwrap().title, "Fav 1");
    }

    #[tokio::test]
    async fn test_later_section_overwrites() {
        let library = favorites(3).with_playlist(
            LibraryItem::new("Jukebox", "uri:jukebox"),
            vec![LibraryItem::new("Tutti Frutti (Mono)", "uri:t1")
                .with_creator("Little Richard")
                .with_album("Here's Little Richard")],
        );
        let definition = PageSetDefinition {
            page_set_name: "Mixed".to_string(),
            sections: vec![
                SectionDefinition::Favorites {
                    start_label: 0,
                    start_list: 0,
                    end_list: 2,
                },
                SectionDefinition::PlaylistTracks {
                    start_label: 1,
                    playlist_name: "Jukebox".to_string(),
                    start_list: 0,
                },
            ],
        };

        let page_set = PageSet::materialize("t", &definition, &library)
            .await
            .unwrap();

        assert_eq!(page_set.entry(0).unwrap().title, "Fav 0");
        let track = page_set.entry(1).unwrap();
        assert_eq!(track.title, "Tutti Frutti");
        assert_eq!(track.artist, "Little Richard");
        assert_eq!(track.source, "Here's Little Richard");
        assert_eq!(track.action.kind(), "playlist_track");
        assert_eq!(page_set.entry(2).unwrap().title, "Fav 2");
    }

    #[tokio::test]
    async fn test_missing_playlist_leaves_section_empty() {
        let definition = PageSetDefinition {
            page_set_name: "Tracks".to_string(),
            sections: vec![SectionDefinition::PlaylistTracks {
                start_label: 0,
                playlist_name: "Gone".to_string(),
                start_list: 0,
            }],
        };

        let page_set = PageSet::materialize("t", &definition, &StaticLibrary::new())
            .await
            .unwrap();
        assert_eq!(page_set.filled(), 0);
        assert_eq!(page_set.name(), "Tracks");
    }

    #[tokio::test]
    async fn test_playlists_carry_play_mode() {
        let library = StaticLibrary::new()
            .with_playlist(LibraryItem::new("Jukebox", "uri:jukebox"), vec![])
            .with_playlist(LibraryItem::new("Doo Wop", "uri:doowop"), vec![]);
        let definition = PageSetDefinition {
            page_set_name: "Lists".to_string(),
            sections: vec![SectionDefinition::Playlists {
                start_label: 5,
                start_list: 0,
                end_list: 1,
                play_mode: PlayMode::Shuffle,
            }],
        };

        let page_set = PageSet::materialize("t", &definition, &library)
            .await
            .unwrap();
        let entry = page_set.entry(6).unwrap();
        assert_eq!(entry.title, "Doo Wop");
        assert_eq!(entry.source, "Playlist");
        assert_eq!(
            entry.action,
            EntryAction::Playlist {
                descriptor: PlayDescriptor::new("uri:doowop"),
                play_mode: PlayMode::Shuffle,
            }
        );
        assert_eq!(page_set.playlists().len(), 2);
    }
}
