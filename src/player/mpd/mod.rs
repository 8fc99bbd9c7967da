use super::traits::{split_artist_title, PlaybackState, Player, StatusSnapshot};
use crate::app::config::PlayerConfig;
use crate::error::{ControlError, PollError};
use anyhow::{Context, Result};
use mpd::{Client, Song, State};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::{Duration, Instant};

/// Another call still holds the connection.
#[derive(Debug, thiserror::Error)]
#[error("MPD connection is busy")]
struct Busy;

struct Connection {
    host: String,
    port: u16,
    /// Bounds connect, every read and every write.
    timeout: Duration,
    client: Mutex<Option<Client>>,
}

impl Connection {
    fn connect(&self) -> Result<Client> {
        let addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .with_context(|| format!("cannot resolve {}:{}", self.host, self.port))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.timeout))?;
                    stream.set_write_timeout(Some(self.timeout))?;
                    let client = Client::new(stream)
                        .with_context(|| format!("no MPD greeting from {}", addr))?;
                    tracing::debug!(%addr, "connected to MPD");
                    return Ok(client);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(match last_err {
            Some(e) => anyhow::Error::new(e)
                .context(format!("Failed to connect to MPD at {}:{}", self.host, self.port)),
            None => anyhow::anyhow!("{}:{} resolved to nothing", self.host, self.port),
        })
    }

    /// Runs `f` on the cached client, reconnecting first if it went stale.
    /// Never queues behind a call that is still stuck on the socket.
    fn with_client<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut mpd::Client) -> Result<T>,
    {
        // 1. Lock the connection, or give up right away
        let mut client_guard = match self.client.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(Busy.into()),
            Err(TryLockError::Poisoned(_)) => {
                return Err(anyhow::anyhow!("MPD client mutex poisoned"))
            }
        };

        // 2. Ping
        let needs_connect = match client_guard.as_mut() {
            Some(client) => client.status().is_err(),
            None => true,
        };

        // 3. Reconnect if needed
        if needs_connect {
            *client_guard = None;
            *client_guard = Some(self.connect()?);
        }

        // 4. Run
        match client_guard.as_mut() {
            Some(client) => f(client),
            None => Err(anyhow::anyhow!("No MPD connection")),
        }
    }
}

/// Volume to set for one press of "mute", and what to remember for the next.
///
/// Muting remembers the current level; pressing again while still silent
/// restores it, like moOde's own mute toggle.
fn mute_step(current: i8, saved: Option<u8>) -> (u8, Option<u8>) {
    match saved {
        Some(previous) if current <= 0 => (previous, None),
        _ if current <= 0 => (0, None),
        _ => (0, Some(current.min(100) as u8)),
    }
}

/// Tags are matched case-insensitively.
fn find_tag(tags: &[(String, String)], key: &str) -> Option<String> {
    tags.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.clone())
}

/// Copies track metadata onto `snapshot`, splitting ICY titles for streams.
fn describe_song(snapshot: &mut StatusSnapshot, song: &Song) {
    let stream = song.file.starts_with("http://") || song.file.starts_with("https://");
    let title = song.title.clone().unwrap_or_default();
    let artist = song
        .artist
        .clone()
        .or_else(|| find_tag(&song.tags, "Artist"))
        .unwrap_or_default();

    if stream && artist.is_empty() {
        let (a, t) = split_artist_title(&title);
        if t.is_empty() {
            snapshot.track_title = a;
        } else {
            snapshot.artist = a;
            snapshot.track_title = t;
        }
        snapshot.source_name = song.name.clone().unwrap_or_else(|| "Radio".to_string());
    } else {
        snapshot.track_title = title;
        snapshot.artist = artist;
        snapshot.source_name = "MPD".to_string();
    }
    snapshot.album = find_tag(&song.tags, "Album").unwrap_or_default();
    snapshot.duration_seconds = song.duration.map(|d| d.as_secs() as u32);
}

/// MPD Player implementation
///
/// The `mpd` crate is synchronous, so every call runs on the blocking pool.
pub struct MpdPlayer {
    conn: Arc<Connection>,
    /// Level to restore on the next mute press.
    muted_from: Arc<Mutex<Option<u8>>>,
}

impl MpdPlayer {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            conn: Arc::new(Connection {
                host: config.host.clone(),
                port: config.effective_port(),
                timeout: config.timeout(),
                client: Mutex::new(None),
            }),
            muted_from: Arc::new(Mutex::new(None)),
        }
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut mpd::Client) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || conn.with_client(f))
            .await
            .context("MPD worker panicked")?
    }

    fn read_status(client: &mut mpd::Client) -> Result<StatusSnapshot> {
        let status = client.status()?;
        let song = client.currentsong().ok().flatten();

        let mut snapshot = StatusSnapshot::empty(Instant::now());
        snapshot.playback_state = match status.state {
            State::Play => PlaybackState::Playing,
            State::Pause => PlaybackState::Paused,
            State::Stop => PlaybackState::Stopped,
        };
        snapshot.elapsed_seconds = status.elapsed.map(|t| t.as_secs() as u32);
        // MPD reports -1 when no mixer is configured
        snapshot.volume_percent = (status.volume >= 0).then(|| status.volume.min(100) as u8);

        if let Some(song) = song {
            describe_song(&mut snapshot, &song);
        }

        Ok(snapshot)
    }
}

impl Player for MpdPlayer {
    fn name(&self) -> &'static str {
        "mpd"
    }

    async fn status(&self) -> Result<StatusSnapshot, PollError> {
        self.blocking(Self::read_status).await.map_err(|e| {
            if e.is::<Busy>() {
                PollError::Timeout(self.conn.timeout.as_millis() as u64)
            } else {
                PollError::ConnectionRefused(format!("{:#}", e))
            }
        })
    }

    async fn toggle_play_pause(&self) -> Result<(), ControlError> {
        self.blocking(|client| {
            let status = client.status()?;
            match status.state {
                State::Play => client.pause(true)?,
                State::Pause | State::Stop => client.play()?,
            };
            Ok(())
        })
        .await
        .map_err(|e| ControlError::Unreachable(format!("{:#}", e)))
    }

    async fn set_volume(&self, percent: u8) -> Result<(), ControlError> {
        self.blocking(move |client| {
            client
                .volume(percent.min(100) as i8)
                .context("Failed to set volume")
        })
        .await
        .map_err(|e| ControlError::Rejected {
            command: format!("volume {}", percent),
            reason: format!("{:#}", e),
        })
    }

    async fn mute(&self) -> Result<(), ControlError> {
        let muted_from = Arc::clone(&self.muted_from);
        self.blocking(move |client| {
            let current = client.status()?.volume;
            let mut saved = muted_from
                .lock()
                .map_err(|_| anyhow::anyhow!("mute state poisoned"))?;
            let (target, keep) = mute_step(current, *saved);
            client.volume(target as i8).context("Failed to set volume")?;
            *saved = keep;
            Ok(())
        })
        .await
        .map_err(|e| ControlError::Rejected {
            command: "mute".to_string(),
            reason: format!("{:#}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::PlayerBackend;
    use std::net::TcpListener;

    #[test]
    fn test_mute_toggles_back_to_previous_level() {
        let (target, saved) = mute_step(40, None);
        assert_eq!((target, saved), (0, Some(40)));

        let (target, saved) = mute_step(0, saved);
        assert_eq!((target, saved), (40, None));

        // no mixer, or already silent with nothing remembered
        assert_eq!(mute_step(-1, None), (0, None));
        // turned up again after muting: mute the new level
        assert_eq!(mute_step(25, Some(40)), (0, Some(25)));
    }

    #[test]
    fn test_album_comes_from_tags() {
        let tags = vec![
            ("album".to_string(), "Oxygene".to_string()),
            ("Artist".to_string(), "Jean-Michel Jarre".to_string()),
        ];
        assert_eq!(find_tag(&tags, "Album").as_deref(), Some("Oxygene"));
        assert_eq!(find_tag(&tags, "ARTIST").as_deref(), Some("Jean-Michel Jarre"));
        assert_eq!(find_tag(&tags, "Genre"), None);
    }

    #[tokio::test]
    async fn test_silent_server_fails_within_timeout() {
        // the kernel completes the handshake; nobody ever sends the greeting
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let config = PlayerConfig {
            backend: PlayerBackend::Mpd,
            host: "127.0.0.1".to_string(),
            port: Some(listener.local_addr().unwrap().port()),
            timeout_ms: 200,
            ..PlayerConfig::default()
        };
        let player = Arc::new(MpdPlayer::new(&config));
        let started = Instant::now();

        let first = tokio::spawn({
            let player = Arc::clone(&player);
            async move { player.status().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // a second poll does not queue behind the stuck one
        assert_eq!(player.status().await, Err(PollError::Timeout(200)));

        let first = first.await.unwrap();
        assert!(matches!(first, Err(PollError::ConnectionRefused(_))), "{:?}", first);
        assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
        drop(listener);
    }
}
