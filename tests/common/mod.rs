#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use moode_oled::app::config::AppConfig;
use moode_oled::app::Controller;
use moode_oled::display::{DisplayPeripheral, DisplayRenderer, Frame};
use moode_oled::error::{ControlError, PollError, RenderError};
use moode_oled::player::{PlaybackState, Player, StatusSnapshot};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Player that replays a script and records every command it gets.
#[derive(Default)]
pub struct FakePlayer {
    replies: Mutex<VecDeque<Result<StatusSnapshot, PollError>>>,
    commands: Mutex<Vec<String>>,
}

impl FakePlayer {
    pub fn scripted(replies: Vec<Result<StatusSnapshot, PollError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Commands go out on a worker task; give it a moment.
    pub async fn wait_for_commands(&self, count: usize) -> Vec<String> {
        for _ in 0..200 {
            if self.commands.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.commands()
    }

    fn record(&self, command: String) -> Result<(), ControlError> {
        self.commands.lock().unwrap().push(command);
        Ok(())
    }
}

impl Player for FakePlayer {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn status(&self) -> Result<StatusSnapshot, PollError> {
        let reply = self.replies.lock().unwrap().pop_front();
        // stamped on arrival, like a real response
        reply
            .unwrap_or_else(|| Err(PollError::ConnectionRefused("script exhausted".into())))
            .map(|mut s| {
                s.timestamp = Instant::now();
                s
            })
    }

    async fn toggle_play_pause(&self) -> Result<(), ControlError> {
        self.record("toggle".to_string())
    }

    async fn set_volume(&self, percent: u8) -> Result<(), ControlError> {
        self.record(format!("volume {}", percent))
    }

    async fn mute(&self) -> Result<(), ControlError> {
        self.record("mute".to_string())
    }
}

#[derive(Default)]
pub struct PanelState {
    pub frames: Vec<Frame>,
    pub contrasts: Vec<u8>,
    pub clears: usize,
    pub failing: bool,
    pub clear_delay: Duration,
}

/// Display that keeps every frame. Clones share state.
#[derive(Clone, Default)]
pub struct Panel(pub Arc<Mutex<PanelState>>);

impl Panel {
    pub fn state(&self) -> std::sync::MutexGuard<'_, PanelState> {
        self.0.lock().unwrap()
    }
}

impl DisplayPeripheral for Panel {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn write(&mut self, frame: &Frame) -> Result<(), RenderError> {
        let mut state = self.state();
        if state.failing {
            return Err(RenderError::NotResponding);
        }
        state.frames.push(frame.clone());
        Ok(())
    }

    fn set_contrast(&mut self, level: u8) -> Result<(), RenderError> {
        let mut state = self.state();
        if state.failing {
            return Err(RenderError::NotResponding);
        }
        state.contrasts.push(level);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        let delay = self.state().clear_delay;
        std::thread::sleep(delay);
        self.state().clears += 1;
        Ok(())
    }
}

pub fn wall() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 17)
        .and_then(|d| d.and_hms_opt(21, 30, 0))
        .unwrap()
}

pub fn snapshot(state: PlaybackState, title: &str, volume: u8) -> StatusSnapshot {
    let mut s = StatusSnapshot::empty(Instant::now());
    s.playback_state = state;
    s.artist = "Test Artist".to_string();
    s.track_title = title.to_string();
    s.volume_percent = Some(volume);
    s.source_name = "Library".to_string();
    s
}

pub fn controller(
    config: &AppConfig,
    player: Arc<FakePlayer>,
    panel: &Panel,
    now: Instant,
) -> (Controller, Arc<Notify>) {
    let wake = Arc::new(Notify::new());
    let renderer = DisplayRenderer::new(Box::new(panel.clone()), config.display.render_retries);
    let controller = Controller::new(config, player, renderer, Arc::clone(&wake), now);
    (controller, wake)
}
