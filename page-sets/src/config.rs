//! Declarative page-set configuration
//!
//! The document is a JSON object keyed by RFID tag payload:
//!
//! ```json
//! {
//!   "0004215738": {
//!     "page_set_name": "Rock",
//!     "sections": [
//!       { "type": "sonos_favorites", "start_label": 0, "start_list": 0, "end_list": 19 },
//!       { "type": "sonos_playlists", "start_label": 20, "start_list": 0, "end_list": 9,
//!         "play_mode": "shuffle" },
//!       { "type": "sonos_playlist_tracks", "start_label": 40, "playlist_name": "Jukebox" }
//!     ]
//!   }
//! }
//! ```
//!
//! `start_label` is the slot (0..200) the section starts filling at.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PageSetError, Result};
use crate::label::SLOTS;

/// Maximum number of tracks pulled from a playlist section
pub const MAX_PLAYLIST_TRACKS: usize = 300;

/// How a playlist plays once queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    #[default]
    Normal,
    Shuffle,
    Repeat,
}

/// One section of a page set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SectionDefinition {
    /// Consecutive entries from the zone player's favorites list
    #[serde(rename = "sonos_favorites")]
    Favorites {
        start_label: u16,
        start_list: usize,
        end_list: usize,
    },

    /// Consecutive saved playlists, each queued as a whole
    #[serde(rename = "sonos_playlists")]
    Playlists {
        start_label: u16,
        start_list: usize,
        end_list: usize,
        #[serde(default)]
        play_mode: PlayMode,
    },

    /// The individual tracks of one named playlist
    #[serde(rename = "sonos_playlist_tracks")]
    PlaylistTracks {
        start_label: u16,
        playlist_name: String,
        #[serde(default)]
        start_list: usize,
    },
}

impl SectionDefinition {
    /// Slot the section starts filling at
    pub fn start_slot(&self) -> u16 {
        match self {
            SectionDefinition::Favorites { start_label, .. }
            | SectionDefinition::Playlists { start_label, .. }
            | SectionDefinition::PlaylistTracks { start_label, .. } => *start_label,
        }
    }

    /// Configuration type name, as written in the document
    pub fn type_name(&self) -> &'static str {
        match self {
            SectionDefinition::Favorites { .. } => "sonos_favorites",
            SectionDefinition::Playlists { .. } => "sonos_playlists",
            SectionDefinition::PlaylistTracks { .. } => "sonos_playlist_tracks",
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.start_slot() >= SLOTS {
            return Err(format!(
                "{} section starts at slot {}, past the last slot",
                self.type_name(),
                self.start_slot()
            ));
        }

        match self {
            SectionDefinition::Favorites {
                start_list,
                end_list,
                ..
            }
            | SectionDefinition::Playlists {
                start_list,
                end_list,
                ..
            } if end_list < start_list => Err(format!(
                "{} section has end_list {} before start_list {}",
                self.type_name(),
                end_list,
                start_list
            )),
            SectionDefinition::PlaylistTracks { playlist_name, .. }
                if playlist_name.trim().is_empty() =>
            {
                Err("sonos_playlist_tracks section needs a playlist_name".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// A named page set as configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSetDefinition {
    pub page_set_name: String,
    #[serde(default)]
    pub sections: Vec<SectionDefinition>,
}

/// The whole configuration document, keyed by tag payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageSetDocument {
    page_sets: BTreeMap<String, PageSetDefinition>,
}

impl PageSetDocument {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Self = serde_json::from_str(json)?;
        document.validate()?;
        Ok(document)
    }

    /// Read, parse and validate a JSON document from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| PageSetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Build a document from definitions already in memory
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = (String, PageSetDefinition)>,
    ) -> Result<Self> {
        let document = Self {
            page_sets: definitions.into_iter().collect(),
        };
        document.validate()?;
        Ok(document)
    }

    /// Check every page set and section for consistency
    pub fn validate(&self) -> Result<()> {
        if self.page_sets.is_empty() {
            return Err(PageSetError::Empty);
        }

        for (tag, definition) in &self.page_sets {
            if definition.page_set_name.trim().is_empty() {
                return Err(PageSetError::Invalid {
                    tag: tag.clone(),
                    reason: "page_set_name is empty".to_string(),
                });
            }
            for section in &definition.sections {
                section.validate().map_err(|reason| PageSetError::Invalid {
                    tag: tag.clone(),
                    reason,
                })?;
            }
        }

        Ok(())
    }

    /// Definition for a tag payload
    pub fn get(&self, tag: &str) -> Option<&PageSetDefinition> {
        self.page_sets.get(tag)
    }

    /// All configured tags, in sorted order
    pub fn tags(&self) -> Vec<String> {
        self.page_sets.keys().cloned().collect()
    }

    /// The first tag in sorted order, used when no default is configured
    pub fn first_tag(&self) -> Option<&str> {
        self.page_sets.keys().next().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.page_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.page_sets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PageSetDefinition)> {
        self.page_sets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "0004215738": {
            "page_set_name": "Rock",
            "sections": [
                { "type": "sonos_favorites", "start_label": 0, "start_list": 0, "end_list": 19 },
                { "type": "sonos_playlists", "start_label": 20, "start_list": 2, "end_list": 5,
                  "play_mode": "shuffle" },
                { "type": "sonos_playlist_tracks", "start_label": 40, "playlist_name": "Jukebox" }
            ]
        },
        "0001111111": { "page_set_name": "Empty", "sections": [] }
    }"#;

    #[test]
    fn test_parse_sample() {
        let document = PageSetDocument::from_json(SAMPLE).unwrap();
        assert_eq!(document.len(), 2);
        assert_eq!(document.first_tag(), Some("0001111111"));

        let rock = document.get("0004215738").unwrap();
        assert_eq!(rock.page_set_name, "Rock");
        assert_eq!(rock.sections.len(), 3);
        assert_eq!(
            rock.sections[1],
            SectionDefinition::Playlists {
                start_label: 20,
                start_list: 2,
                end_list: 5,
                play_mode: PlayMode::Shuffle,
            }
        );
        assert_eq!(
            rock.sections[2],
            SectionDefinition::PlaylistTracks {
                start_label: 40,
                playlist_name: "Jukebox".to_string(),
                start_list: 0,
            }
        );
    }

    #[test]
    fn test_play_mode_defaults_to_normal() {
        let json = r#"{ "t": { "page_set_name": "P", "sections": [
            { "type": "sonos_playlists", "start_label": 0, "start_list": 0, "end_list": 1 }
        ] } }"#;
        let document = PageSetDocument::from_json(json).unwrap();
        let SectionDefinition::Playlists { play_mode, .. } = &document.get("t").unwrap().sections[0]
        else {
            panic!("expected playlists section");
        };
        assert_eq!(*play_mode, PlayMode::Normal);
    }

    #[test]
    fn test_unknown_section_type_rejected() {
        let json = r#"{ "t": { "page_set_name": "P", "sections": [
            { "type": "spotify_albums", "start_label": 0 }
        ] } }"#;
        assert!(matches!(
            PageSetDocument::from_json(json),
            Err(PageSetError::Parse(_))
        ));
    }

    #[test]
    fn test_tracks_section_requires_playlist_name() {
        let json = r#"{ "t": { "page_set_name": "P", "sections": [
            { "type": "sonos_playlist_tracks", "start_label": 0 }
        ] } }"#;
        assert!(PageSetDocument::from_json(json).is_err());

        let blank = r#"{ "t": { "page_set_name": "P", "sections": [
            { "type": "sonos_playlist_tracks", "start_label": 0, "playlist_name": " " }
        ] } }"#;
        assert!(matches!(
            PageSetDocument::from_json(blank),
            Err(PageSetError::Invalid { .. })
        ));
    }

    #[test]
    fn test_inverted_list_range_rejected() {
        let json = r#"{ "t": { "page_set_name": "P", "sections": [
            { "type": "sonos_favorites", "start_label": 0, "start_list": 5, "end_list": 2 }
        ] } }"#;
        assert!(matches!(
            PageSetDocument::from_json(json),
            Err(PageSetError::Invalid { .. })
        ));
    }

    #[test]
    fn test_start_past_last_slot_rejected() {
        let json = r#"{ "t": { "page_set_name": "P", "sections": [
            { "type": "sonos_favorites", "start_label": 200, "start_list": 0, "end_list": 2 }
        ] } }"#;
        assert!(PageSetDocument::from_json(json).is_err());
    }

    #[test]
    fn test_empty_document_rejected() {
        assert!(matches!(
            PageSetDocument::from_json("{}"),
            Err(PageSetError::Empty)
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = PageSetDocument::from_path("/nonexistent/wallbox/page_sets.json");
        assert!(matches!(result, Err(PageSetError::Io { .. })));
    }
}
