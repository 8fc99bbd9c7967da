pub mod moode;
#[cfg(feature = "mpd")]
pub mod mpd;
pub mod poller;
pub mod traits;

pub use moode::MoodePlayer;
#[cfg(feature = "mpd")]
pub use self::mpd::MpdPlayer;
pub use poller::{PollReport, StatusPoller};
pub use traits::{split_artist_title, PlaybackState, Player, StatusSnapshot};

use crate::app::config::{PlayerBackend, PlayerConfig};
use crate::error::{ControlError, InitError, PollError};

/// The backend picked at startup from `[player] backend`.
pub enum AnyPlayer {
    Moode(MoodePlayer),
    #[cfg(feature = "mpd")]
    Mpd(MpdPlayer),
}

impl AnyPlayer {
    pub fn from_config(config: &PlayerConfig) -> Result<Self, InitError> {
        match config.backend {
            PlayerBackend::Moode => Ok(Self::Moode(MoodePlayer::new(config)?)),
            #[cfg(feature = "mpd")]
            PlayerBackend::Mpd => Ok(Self::Mpd(MpdPlayer::new(config))),
            #[cfg(not(feature = "mpd"))]
            PlayerBackend::Mpd => Err(InitError::MissingDependency(
                "MPD backend requested but this build lacks the `mpd` feature".to_string(),
            )),
        }
    }
}

impl Player for AnyPlayer {
    fn name(&self) -> &'static str {
        match self {
            Self::Moode(p) => p.name(),
            #[cfg(feature = "mpd")]
            Self::Mpd(p) => p.name(),
        }
    }

    async fn status(&self) -> Result<StatusSnapshot, PollError> {
        match self {
            Self::Moode(p) => p.status().await,
            #[cfg(feature = "mpd")]
            Self::Mpd(p) => p.status().await,
        }
    }

    async fn toggle_play_pause(&self) -> Result<(), ControlError> {
        match self {
            Self::Moode(p) => p.toggle_play_pause().await,
            #[cfg(feature = "mpd")]
            Self::Mpd(p) => p.toggle_play_pause().await,
        }
    }

    async fn set_volume(&self, percent: u8) -> Result<(), ControlError> {
        match self {
            Self::Moode(p) => p.set_volume(percent).await,
            #[cfg(feature = "mpd")]
            Self::Mpd(p) => p.set_volume(percent).await,
        }
    }

    async fn mute(&self) -> Result<(), ControlError> {
        match self {
            Self::Moode(p) => p.mute().await,
            #[cfg(feature = "mpd")]
            Self::Mpd(p) => p.mute().await,
        }
    }
}
