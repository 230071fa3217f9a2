//! Transport state

use serde::{Deserialize, Serialize};

/// Transport state of a zone player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    Playing,
    PausedPlayback,
    #[default]
    Stopped,
    Transitioning,
}

impl TransportState {
    /// Parse a transport state string as reported by the player
    ///
    /// Unknown values are treated as stopped.
    pub fn from_transport_state(state: &str) -> Self {
        match state.trim().to_uppercase().as_str() {
            "PLAYING" => TransportState::Playing,
            "PAUSED_PLAYBACK" | "PAUSED" => TransportState::PausedPlayback,
            "TRANSITIONING" => TransportState::Transitioning,
            _ => TransportState::Stopped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportState::Playing => "PLAYING",
            TransportState::PausedPlayback => "PAUSED_PLAYBACK",
            TransportState::Stopped => "STOPPED",
            TransportState::Transitioning => "TRANSITIONING",
        }
    }

    /// Whether a play/pause toggle should resume playback
    pub fn should_resume(&self) -> bool {
        matches!(self, TransportState::PausedPlayback | TransportState::Stopped)
    }
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
