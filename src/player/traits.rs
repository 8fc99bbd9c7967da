use crate::error::{ControlError, PollError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
    #[default]
    Unknown,
}

impl PlaybackState {
    /// Maps the state words used by MPD and the moOde command API.
    pub fn from_word(word: &str) -> Self {
        match word.trim().to_ascii_lowercase().as_str() {
            "play" | "playing" => Self::Playing,
            "pause" | "paused" => Self::Paused,
            "stop" | "stopped" => Self::Stopped,
            _ => Self::Unknown,
        }
    }
}

/// A point-in-time read of the player. Built once per poll, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub playback_state: PlaybackState,
    pub track_title: String,
    pub artist: String,
    pub album: String,
    pub elapsed_seconds: Option<u32>,
    pub duration_seconds: Option<u32>,
    /// Current Volume (0-100), `None` when the player does not report one
    pub volume_percent: Option<u8>,
    pub source_name: String, // "Library", station name, ...
    pub timestamp: Instant,
}

impl StatusSnapshot {
    pub fn empty(timestamp: Instant) -> Self {
        Self {
            playback_state: PlaybackState::Unknown,
            track_title: String::new(),
            artist: String::new(),
            album: String::new(),
            elapsed_seconds: None,
            duration_seconds: None,
            volume_percent: None,
            source_name: String::new(),
            timestamp,
        }
    }

    /// Copy of the last good read with the playback state blanked out.
    /// Used while poll failures are still being tolerated.
    pub fn unknown_from(previous: Option<&StatusSnapshot>, timestamp: Instant) -> Self {
        match previous {
            Some(prev) => Self {
                playback_state: PlaybackState::Unknown,
                timestamp,
                ..prev.clone()
            },
            None => Self::empty(timestamp),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback_state == PlaybackState::Playing
    }

    pub fn has_metadata(&self) -> bool {
        !self.track_title.trim().is_empty() || !self.artist.trim().is_empty()
    }

    /// Same track as `other`, ignoring position/volume/state.
    pub fn same_track(&self, other: &StatusSnapshot) -> bool {
        self.track_title == other.track_title && self.artist == other.artist
    }
}

/// The unified interface for any player backend 🎵
///
/// Status is the poller's side; the rest is what the button and the encoder
/// drive.
pub trait Player: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn status(&self) -> impl Future<Output = Result<StatusSnapshot, PollError>> + Send;

    fn toggle_play_pause(&self) -> impl Future<Output = Result<(), ControlError>> + Send;

    fn set_volume(&self, percent: u8) -> impl Future<Output = Result<(), ControlError>> + Send;

    fn mute(&self) -> impl Future<Output = Result<(), ControlError>> + Send;
}

/// Splits ICY-style "Artist - Title" stream titles.
///
/// Some stations use `_-_` as the separator, so that one wins.
pub fn split_artist_title(title: &str) -> (String, String) {
    for separator in ["_-_", " - "] {
        if let Some((artist, song)) = title.split_once(separator) {
            return (artist.trim().to_string(), song.trim().to_string());
        }
    }
    (title.trim().to_string(), String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_words() {
        assert_eq!(PlaybackState::from_word("play"), PlaybackState::Playing);
        assert_eq!(PlaybackState::from_word(" Paused "), PlaybackState::Paused);
        assert_eq!(PlaybackState::from_word("stop"), PlaybackState::Stopped);
        assert_eq!(PlaybackState::from_word("buffering"), PlaybackState::Unknown);
    }

    #[test]
    fn test_split_artist_title() {
        assert_eq!(
            split_artist_title("Queen - Bohemian Rhapsody"),
            ("Queen".to_string(), "Bohemian Rhapsody".to_string())
        );
        // `_-_` takes precedence over a hyphen inside the artist name
        assert_eq!(
            split_artist_title("Jean-Michel Jarre_-_Oxygene 4"),
            ("Jean-Michel Jarre".to_string(), "Oxygene 4".to_string())
        );
        assert_eq!(
            split_artist_title("Radio Most Kaposvár"),
            ("Radio Most Kaposvár".to_string(), String::new())
        );
    }

    #[test]
    fn test_unknown_from_keeps_metadata() {
        let t0 = Instant::now();
        let mut good = StatusSnapshot::empty(t0);
        good.playback_state = PlaybackState::Playing;
        good.track_title = "Song A".to_string();
        good.volume_percent = Some(40);

        let later = t0 + std::time::Duration::from_secs(1);
        let degraded = StatusSnapshot::unknown_from(Some(&good), later);
        assert_eq!(degraded.playback_state, PlaybackState::Unknown);
        assert_eq!(degraded.track_title, "Song A");
        assert_eq!(degraded.volume_percent, Some(40));
        assert_eq!(degraded.timestamp, later);

        let blank = StatusSnapshot::unknown_from(None, later);
        assert!(!blank.has_metadata());
    }
}
