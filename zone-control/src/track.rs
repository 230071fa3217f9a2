//! Track snapshots and metadata parsing

use serde::{Deserialize, Serialize};

/// Title shown when track info could not be read
pub const UNKNOWN_TITLE: &str = "Unknown";
/// Substitutes for unusable satellite-radio metadata
pub const NO_TITLE: &str = "No Title";
pub const NO_ARTIST: &str = "No Artist";

/// Satellite titles longer than this are treated as unusable
const MAX_SATELLITE_TITLE: usize = 30;

/// Kind of source a zone is playing, derived from the track URI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Queue,
    Radio,
    Satellite,
    LineIn,
    Tv,
    #[default]
    Unknown,
}

impl SourceKind {
    pub fn from_uri(uri: &str) -> Self {
        let uri = uri.trim();
        if uri.is_empty() {
            SourceKind::Unknown
        } else if uri.starts_with("x-sonos-htastream:") {
            SourceKind::Tv
        } else if uri.starts_with("x-rincon-stream:") {
            SourceKind::LineIn
        } else if uri.starts_with("x-sonosapi-hls:") || uri.starts_with("x-sonosapi-hls-static:") {
            SourceKind::Satellite
        } else if uri.starts_with("x-sonosapi-stream:")
            || uri.starts_with("x-sonosapi-radio:")
            || uri.starts_with("x-rincon-mp3radio:")
            || uri.starts_with("aac:")
        {
            SourceKind::Radio
        } else {
            SourceKind::Queue
        }
    }

    /// Whether "next track" means anything for this source
    pub fn supports_skip(&self) -> bool {
        matches!(self, SourceKind::Queue | SourceKind::Unknown)
    }
}

/// Track info exactly as the zone player reports it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTrackInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub uri: Option<String>,
    /// Stream metadata blob, when the source provides one
    pub metadata: Option<String>,
}

/// What the display shows about the current track
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub title: String,
    pub artist: String,
    pub source_kind: SourceKind,
    pub raw_metadata: String,
}

impl TrackSnapshot {
    /// Sentinel returned when track info is unavailable
    pub fn unknown() -> Self {
        Self {
            title: UNKNOWN_TITLE.to_string(),
            ..Default::default()
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.title == UNKNOWN_TITLE && self.artist.is_empty()
    }

    /// Build a snapshot from raw player info
    ///
    /// Satellite-radio players report an `x-sonos...` URI as the title; the
    /// real title and artist then live in the metadata blob.
    pub fn from_raw(raw: &RawTrackInfo) -> Self {
        let uri = raw.uri.as_deref().unwrap_or_default();
        let title = raw.title.as_deref().unwrap_or_default().trim();
        let metadata = raw.metadata.clone().unwrap_or_default();

        let mut source_kind = SourceKind::from_uri(uri);
        if title.starts_with("x-sonos") {
            if source_kind == SourceKind::Unknown {
                source_kind = SourceKind::Satellite;
            }
            let (title, artist) = parse_satellite_metadata(&metadata);
            return Self {
                title,
                artist,
                source_kind,
                raw_metadata: metadata,
            };
        }

        Self {
            title: title.to_string(),
            artist: raw.artist.as_deref().unwrap_or_default().trim().to_string(),
            source_kind,
            raw_metadata: metadata,
        }
    }
}

/// Extract title and artist from a `TYPE=SNG|TITLE ...|ARTIST ...|ALBUM ...` blob
///
/// A missing title, one starting with `device.asp`, or one longer than 30
/// characters yields `("No Title", "No Artist")`.
pub fn parse_satellite_metadata(metadata: &str) -> (String, String) {
    let title = marker_value(metadata, "TITLE ");
    let artist = marker_value(metadata, "ARTIST ");

    match title {
        Some(title)
            if !title.is_empty()
                && !title.starts_with("device.asp")
                && title.chars().count() <= MAX_SATELLITE_TITLE =>
        {
            (title, artist.unwrap_or_default())
        }
        _ => (NO_TITLE.to_string(), NO_ARTIST.to_string()),
    }
}

fn marker_value(metadata: &str, marker: &str) -> Option<String> {
    let start = metadata.find(marker)? + marker.len();
    let rest = &metadata[start..];
    let end = rest.find('|').unwrap_or(rest.len());
    Some(unescape_html(rest[..end].trim()))
}

/// Replace the HTML entities players put into metadata
pub fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("x-sonos-htastream:RINCON_1:spdif", SourceKind::Tv)]
    #[case("x-rincon-stream:RINCON_1", SourceKind::LineIn)]
    #[case("x-sonosapi-hls:channel-linear:howardstern?sid=37", SourceKind::Satellite)]
    #[case("x-sonosapi-stream:s12345?sid=254", SourceKind::Radio)]
    #[case("x-rincon-mp3radio://kexp.org/stream", SourceKind::Radio)]
    #[case("x-file-cifs://nas/music/song.mp3", SourceKind::Queue)]
    #[case("x-sonos-spotify:spotify%3atrack%3a123", SourceKind::Queue)]
    #[case("", SourceKind::Unknown)]
    fn test_source_kind_from_uri(#[case] uri: &str, #[case] kind: SourceKind) {
        assert_eq!(SourceKind::from_uri(uri), kind);
    }

    #[test]
    fn test_skip_support() {
        assert!(SourceKind::Queue.supports_skip());
        assert!(!SourceKind::Radio.supports_skip());
        assert!(!SourceKind::Satellite.supports_skip());
        assert!(!SourceKind::LineIn.supports_skip());
        assert!(!SourceKind::Tv.supports_skip());
    }

    #[test]
    fn test_satellite_metadata() {
        let blob = "TYPE=SNG|TITLE Rock &amp; Roll|ARTIST Led Zeppelin|ALBUM IV";
        assert_eq!(
            parse_satellite_metadata(blob),
            ("Rock & Roll".to_string(), "Led Zeppelin".to_string())
        );
    }

    #[rstest]
    #[case("TYPE=SNG|TITLE device.asp?id=12|ARTIST Someone")]
    #[case("TYPE=SNG|TITLE This Title Is Far Too Long To Be A Real Song|ARTIST X")]
    #[case("TYPE=SNG|ARTIST Nobody")]
    fn test_unusable_satellite_title(#[case] blob: &str) {
        assert_eq!(
            parse_satellite_metadata(blob),
            (NO_TITLE.to_string(), NO_ARTIST.to_string())
        );
    }

    #[test]
    fn test_snapshot_for_satellite_title() {
        let raw = RawTrackInfo {
            title: Some("x-sonosapi-hls:channel-linear:classicvinyl".to_string()),
            uri: Some("x-sonosapi-hls:channel-linear:classicvinyl?sid=37".to_string()),
            metadata: Some("TYPE=SNG|TITLE Hey Jude|ARTIST The Beatles|ALBUM Hey Jude".to_string()),
            ..Default::default()
        };
        let snapshot = TrackSnapshot::from_raw(&raw);
        assert_eq!(snapshot.title, "Hey Jude");
        assert_eq!(snapshot.artist, "The Beatles");
        assert_eq!(snapshot.source_kind, SourceKind::Satellite);
    }

    #[test]
    fn test_snapshot_for_queue_track() {
        let raw = RawTrackInfo {
            title: Some("Hound Dog".to_string()),
            artist: Some("Elvis Presley".to_string()),
            uri: Some("x-file-cifs://nas/hound_dog.mp3".to_string()),
            ..Default::default()
        };
        let snapshot = TrackSnapshot::from_raw(&raw);
        assert_eq!(snapshot.title, "Hound Dog");
        assert_eq!(snapshot.artist, "Elvis Presley");
        assert_eq!(snapshot.source_kind, SourceKind::Queue);
        assert!(!snapshot.is_unknown());
    }

    #[test]
    fn test_unescape_does_not_double_decode() {
        assert_eq!(unescape_html("&amp;lt;"), "&lt;");
        assert_eq!(unescape_html("Simon &amp; Garfunkel"), "Simon & Garfunkel");
    }

    #[test]
    fn test_unknown_sentinel() {
        assert!(TrackSnapshot::unknown().is_unknown());
    }
}
