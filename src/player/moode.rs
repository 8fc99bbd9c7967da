//! moOde command API client.
//!
//! moOde exposes `GET /command/?cmd=...` on its web server. Status comes from
//! `get_currentsong`, a flat JSON object where most numbers arrive as strings.

use super::traits::{split_artist_title, PlaybackState, Player, StatusSnapshot};
use crate::app::config::PlayerConfig;
use crate::error::{ControlError, InitError, PollError};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Artist moOde reports for radio streams; the real artist is in the title.
const RADIO_ARTIST: &str = "Radio station";

#[derive(Debug, Default, Deserialize)]
struct CurrentSong {
    #[serde(default, alias = "status")]
    state: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    album: Option<String>,
    #[serde(default)]
    file: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    elapsed: Option<f64>,
    #[serde(default, alias = "time", deserialize_with = "lenient_number")]
    duration: Option<f64>,
}

/// Accepts `42`, `42.5` and `"42"`; anything else is treated as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn whole_seconds(value: Option<f64>) -> Option<u32> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round().min(u32::MAX as f64) as u32)
}

fn percent(value: Option<f64>) -> Option<u8> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round().min(100.0) as u8)
}

fn is_stream(file: &str) -> bool {
    let file = file.trim_start();
    file.starts_with("http://") || file.starts_with("https://")
}

/// Turns a `get_currentsong` body into a snapshot.
pub fn parse_current_song(body: &[u8], timestamp: Instant) -> Result<StatusSnapshot, PollError> {
    let song: CurrentSong =
        serde_json::from_slice(body).map_err(|e| PollError::Parse(e.to_string()))?;

    let file = song.file.unwrap_or_default();
    let album = song.album.unwrap_or_default().trim().to_string();
    let mut title = song.title.unwrap_or_default().trim().to_string();
    let mut artist = song.artist.unwrap_or_default().trim().to_string();

    let radio = is_stream(&file) || artist == RADIO_ARTIST;
    if radio && (artist.is_empty() || artist == RADIO_ARTIST) {
        let (stream_artist, stream_title) = split_artist_title(&title);
        if stream_title.is_empty() {
            // Station announcement without a separator: keep it as the title
            artist.clear();
        } else {
            artist = stream_artist;
            title = stream_title;
        }
    }

    let source_name = if radio {
        if album.is_empty() {
            "Radio".to_string()
        } else {
            album.clone()
        }
    } else if file.is_empty() {
        String::new()
    } else {
        "Library".to_string()
    };

    Ok(StatusSnapshot {
        playback_state: song
            .state
            .as_deref()
            .map(PlaybackState::from_word)
            .unwrap_or_default(),
        track_title: title,
        artist,
        album,
        elapsed_seconds: whole_seconds(song.elapsed),
        duration_seconds: whole_seconds(song.duration),
        volume_percent: percent(song.volume),
        source_name,
        timestamp,
    })
}

fn classify(err: &reqwest::Error, timeout: Duration) -> PollError {
    if err.is_timeout() {
        PollError::Timeout(timeout.as_millis() as u64)
    } else if err.is_decode() {
        PollError::Parse(err.to_string())
    } else if let Some(status) = err.status() {
        PollError::ConnectionRefused(format!("HTTP {}", status))
    } else {
        PollError::ConnectionRefused(err.to_string())
    }
}

/// moOde Player implementation
pub struct MoodePlayer {
    client: reqwest::Client,
    base_url: String,
    status_path: String,
    timeout: Duration,
}

impl MoodePlayer {
    pub fn new(config: &PlayerConfig) -> Result<Self, InitError> {
        let base_url = format!("http://{}:{}", config.host, config.effective_port());
        Self::with_base_url(base_url, &config.status_path, config.timeout())
    }

    /// `base_url` is scheme + authority, e.g. `http://127.0.0.1:8080`.
    pub fn with_base_url(
        base_url: impl Into<String>,
        status_path: &str,
        timeout: Duration,
    ) -> Result<Self, InitError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("moode-oled/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| InitError::MissingDependency(format!("HTTP client: {}", e)))?;

        let status_path = if status_path.starts_with('/') {
            status_path.to_string()
        } else {
            format!("/{}", status_path)
        };

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            status_path,
            timeout,
        })
    }

    async fn command(&self, cmd: &str) -> Result<(), ControlError> {
        let url = format!("{}/command/", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("cmd", cmd)])
            .send()
            .await
            .map_err(|e| ControlError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ControlError::Rejected {
                command: cmd.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        tracing::debug!(cmd, "moOde command sent");
        Ok(())
    }
}

impl Player for MoodePlayer {
    fn name(&self) -> &'static str {
        "moode"
    }

    async fn status(&self) -> Result<StatusSnapshot, PollError> {
        let url = format!("{}{}", self.base_url, self.status_path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| classify(&e, self.timeout))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| classify(&e, self.timeout))?;

        parse_current_song(&body, Instant::now())
    }

    async fn toggle_play_pause(&self) -> Result<(), ControlError> {
        self.command("toggle_play_pause").await
    }

    async fn set_volume(&self, percent: u8) -> Result<(), ControlError> {
        self.command(&format!("set_volume {}", percent.min(100))).await
    }

    async fn mute(&self) -> Result<(), ControlError> {
        self.command("set_volume -mute").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_library_track() {
        let body = br#"{
            "file": "NAS/Music/Queen/02 - Bohemian Rhapsody.flac",
            "artist": "Queen",
            "album": "A Night at the Opera",
            "title": "Bohemian Rhapsody",
            "state": "play",
            "volume": "35",
            "elapsed": "12.6",
            "time": "355"
        }"#;
        let snap = parse_current_song(body, Instant::now()).unwrap();

        assert_eq!(snap.playback_state, PlaybackState::Playing);
        assert_eq!(snap.artist, "Queen");
        assert_eq!(snap.track_title, "Bohemian Rhapsody");
        assert_eq!(snap.volume_percent, Some(35));
        assert_eq!(snap.elapsed_seconds, Some(13));
        assert_eq!(snap.duration_seconds, Some(355));
        assert_eq!(snap.source_name, "Library");
    }

    #[test]
    fn test_parse_radio_stream_splits_title() {
        let body = br#"{
            "file": "http://stream.radiomost.hu:8200/live.mp3",
            "artist": "Radio station",
            "album": "Radio Most",
            "title": "Depeche Mode - Enjoy the Silence",
            "state": "play",
            "volume": 60
        }"#;
        let snap = parse_current_song(body, Instant::now()).unwrap();

        assert_eq!(snap.artist, "Depeche Mode");
        assert_eq!(snap.track_title, "Enjoy the Silence");
        assert_eq!(snap.source_name, "Radio Most");
        assert_eq!(snap.volume_percent, Some(60));
    }

    #[test]
    fn test_parse_radio_without_separator() {
        let body = br#"{"file": "https://example.org/live", "artist": "Radio station",
                        "title": "News at noon", "state": "play"}"#;
        let snap = parse_current_song(body, Instant::now()).unwrap();
        assert_eq!(snap.artist, "");
        assert_eq!(snap.track_title, "News at noon");
        assert_eq!(snap.source_name, "Radio");
    }

    #[test]
    fn test_missing_fields_degrade() {
        let snap = parse_current_song(b"{}", Instant::now()).unwrap();
        assert_eq!(snap.playback_state, PlaybackState::Unknown);
        assert!(!snap.has_metadata());
        assert_eq!(snap.volume_percent, None);
        assert_eq!(snap.source_name, "");
    }

    #[test]
    fn test_out_of_range_numbers() {
        let body = br#"{"state": "stop", "volume": "-1", "elapsed": "abc", "time": 7200.4}"#;
        let snap = parse_current_song(body, Instant::now()).unwrap();
        assert_eq!(snap.playback_state, PlaybackState::Stopped);
        assert_eq!(snap.volume_percent, None);
        assert_eq!(snap.elapsed_seconds, None);
        assert_eq!(snap.duration_seconds, Some(7200));

        let loud = parse_current_song(br#"{"volume": 250}"#, Instant::now()).unwrap();
        assert_eq!(loud.volume_percent, Some(100));
    }

    #[test]
    fn test_non_json_is_parse_error() {
        let err = parse_current_song(b"<html>502 Bad Gateway</html>", Instant::now()).unwrap_err();
        assert!(matches!(err, PollError::Parse(_)));
    }
}
