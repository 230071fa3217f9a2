//! Selection resolver
//!
//! Maps a slot of the active page set to its entry and to the play plan
//! the zone controller executes. Resolution is pure: the same slot and page
//! set always give the same plan, and nothing here talks to a player.

use serde::Serialize;

use crate::config::PlayMode;
use crate::library::PlayDescriptor;
use crate::page_set::{EntryAction, PageEntry, PageSet};

/// A single zone-player command within a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ZoneCommand {
    ClearQueue,
    AddToQueue(PlayDescriptor),
    SetPlayMode(PlayMode),
    PlayFromQueue(u32),
    Play,
}

/// How to realize a page-set entry on a zone player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PlayPlan {
    /// Clear, enqueue the favorite, play from queue position 0
    Favorite(PlayDescriptor),
    /// Clear, enqueue the playlist, apply the play mode, play
    Playlist {
        descriptor: PlayDescriptor,
        play_mode: PlayMode,
    },
    /// Clear, enqueue one track, play
    Track(PlayDescriptor),
    /// Empty slot: no zone action
    Nothing,
}

impl PlayPlan {
    /// Plan for an entry's action
    pub fn for_action(action: &EntryAction) -> Self {
        match action {
            EntryAction::Favorite { descriptor } => PlayPlan::Favorite(descriptor.clone()),
            EntryAction::Playlist {
                descriptor,
                play_mode,
            } => PlayPlan::Playlist {
                descriptor: descriptor.clone(),
                play_mode: *play_mode,
            },
            EntryAction::PlaylistTrack { descriptor } => PlayPlan::Track(descriptor.clone()),
            EntryAction::Empty => PlayPlan::Nothing,
        }
    }

    /// The ordered commands this plan issues
    pub fn commands(&self) -> Vec<ZoneCommand> {
        match self {
            PlayPlan::Favorite(descriptor) => vec![
                ZoneCommand::ClearQueue,
                ZoneCommand::AddToQueue(descriptor.clone()),
                ZoneCommand::PlayFromQueue(0),
            ],
            PlayPlan::Playlist {
                descriptor,
                play_mode,
            } => vec![
                ZoneCommand::ClearQueue,
                ZoneCommand::AddToQueue(descriptor.clone()),
                ZoneCommand::SetPlayMode(*play_mode),
                ZoneCommand::Play,
            ],
            PlayPlan::Track(descriptor) => vec![
                ZoneCommand::ClearQueue,
                ZoneCommand::AddToQueue(descriptor.clone()),
                ZoneCommand::Play,
            ],
            PlayPlan::Nothing => Vec::new(),
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, PlayPlan::Nothing)
    }
}

/// A resolved selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub entry: PageEntry,
    pub plan: PlayPlan,
}

/// Resolve `slot` against `page_set`; `None` past the last slot
pub fn resolve(slot: u16, page_set: &PageSet) -> Option<Resolution> {
    let entry = page_set.entry(slot)?.clone();
    let plan = PlayPlan::for_action(&entry.action);
    Some(Resolution { entry, plan })
}
