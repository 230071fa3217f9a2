//! Music library collaborator
//!
//! Page sets are materialized from what the zone player's music library
//! reports: its favorites, its saved playlists, and the tracks of a named
//! playlist. The controller talks to the real player through
//! [`MusicLibrary`]; [`StaticLibrary`] serves a fixed snapshot for offline
//! checks and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LibraryError;

/// Opaque handle the zone player needs to enqueue an item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayDescriptor {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl PlayDescriptor {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}

/// A favorite, playlist or track as listed by the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryItem {
    pub title: String,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    pub descriptor: PlayDescriptor,
}

impl LibraryItem {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            creator: None,
            album: None,
            descriptor: PlayDescriptor::new(uri),
        }
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }
}

/// Read access to a zone player's music library
#[async_trait]
pub trait MusicLibrary: Send + Sync {
    /// Favorites, in the order the player lists them
    async fn favorites(&self) -> Result<Vec<LibraryItem>, LibraryError>;

    /// Saved playlists, in the order the player lists them
    async fn playlists(&self) -> Result<Vec<LibraryItem>, LibraryError>;

    /// Up to `max_items` tracks of the playlist titled `name`
    async fn playlist_tracks(
        &self,
        name: &str,
        max_items: usize,
    ) -> Result<Vec<LibraryItem>, LibraryError>;
}

/// A playlist and its tracks inside a [`StaticLibrary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticPlaylist {
    #[serde(flatten)]
    pub item: LibraryItem,
    #[serde(default)]
    pub tracks: Vec<LibraryItem>,
}

/// Fixed library snapshot, loadable from JSON
///
/// ```json
/// {
///   "favorites": [ { "title": "KEXP", "descriptor": { "uri": "x-rincon-mp3radio://kexp" } } ],
///   "playlists": [ { "title": "Jukebox", "descriptor": { "uri": "file:///jukebox" },
///                    "tracks": [ { "title": "Tutti Frutti", "creator": "Little Richard",
///                                  "descriptor": { "uri": "file:///tutti" } } ] } ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticLibrary {
    #[serde(default)]
    pub favorites: Vec<LibraryItem>,
    #[serde(default)]
    pub playlists: Vec<StaticPlaylist>,
}

impl StaticLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_favorite(mut self, item: LibraryItem) -> Self {
        self.favorites.push(item);
        self
    }

    pub fn with_playlist(mut self, item: LibraryItem, tracks: Vec<LibraryItem>) -> Self {
        self.playlists.push(StaticPlaylist { item, tracks });
        self
    }
}

#[async_trait]
impl MusicLibrary for StaticLibrary {
    async fn favorites(&self) -> Result<Vec<LibraryItem>, LibraryError> {
        Ok(self.favorites.clone())
    }

    async fn playlists(&self) -> Result<Vec<LibraryItem>, LibraryError> {
        Ok(self.playlists.iter().map(|p| p.item.clone()).collect())
    }

    async fn playlist_tracks(
        &self,
        name: &str,
        max_items: usize,
    ) -> Result<Vec<LibraryItem>, LibraryError> {
        let playlist = self
            .playlists
            .iter()
            .find(|p| p.item.title == name)
            .ok_or_else(|| LibraryError::PlaylistNotFound(name.to_string()))?;

        Ok(playlist.tracks.iter().take(max_items).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> StaticLibrary {
        StaticLibrary::new()
            .with_favorite(LibraryItem::new("KEXP", "x-rincon-mp3radio://kexp"))
            .with_playlist(
                LibraryItem::new("Jukebox", "file:///jukebox"),
                vec![
                    LibraryItem::new("One", "file:///1"),
                    LibraryItem::new("Two", "file:///2"),
                    LibraryItem::new("Three", "file:///3"),
                ],
            )
    }

    #[tokio::test]
    async fn test_playlist_tracks_respects_max_items() {
        let tracks = library().playlist_tracks("Jukebox", 2).await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].title, "Two");
    }

    #[tokio::test]
    async fn test_missing_playlist() {
        let result = library().playlist_tracks("Nope", 10).await;
        assert_eq!(
            result,
            Err(LibraryError::PlaylistNotFound("Nope".to_string()))
        );
    }

    #[tokio::test]
    async fn test_snapshot_from_json() {
        let json = r#"{
            "favorites": [ { "title": "KEXP", "descriptor": { "uri": "x-rincon-mp3radio://kexp" } } ],
            "playlists": [ { "title": "Jukebox", "descriptor": { "uri": "file:///jukebox" },
                             "tracks": [ { "title": "Tutti Frutti", "creator": "Little Richard",
                                           "descriptor": { "uri": "file:///tutti" } } ] } ]
        }"#;
        let library = StaticLibrary::from_json(json).unwrap();

        let playlists = library.playlists().await.unwrap();
        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].title, "Jukebox");

        let tracks = library.playlist_tracks("Jukebox", 300).await.unwrap();
        assert_eq!(tracks[0].creator.as_deref(), Some("Little Richard"));
        assert_eq!(tracks[0].descriptor.metadata, None);
    }
}
