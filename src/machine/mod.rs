//! Device state machine.
//!
//! Every input, poll report and timer tick goes through here and comes out
//! as a (possibly unchanged) [`DeviceMode`] plus a list of [`Effect`]s.
//! Nothing in this module performs I/O; the controller executes the effects.

pub mod menu;

use crate::app::config::AppConfig;
use crate::display::ViewModel;
use crate::error::{PollError, RenderError};
use crate::input::{InputEvent, InputKind};
use crate::player::{PlaybackState, PollReport, StatusSnapshot};
use chrono::NaiveDateTime;
use menu::MenuItem;
use std::time::{Duration, Instant};

/// Volume shown when the player does not report one.
pub const FALLBACK_VOLUME: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    /// Waiting for the first good poll
    Booting,
    /// Nothing playing, clock screen
    Idle,
    NowPlaying,
    /// Encoder overlay
    VolumeAdjust,
    /// Long-press overlay
    Menu,
    ErrorDisplay,
}

impl DeviceMode {
    pub fn is_overlay(self) -> bool {
        matches!(self, DeviceMode::VolumeAdjust | DeviceMode::Menu)
    }
}

/// Work the controller has to do on the machine's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    TogglePlayPause,
    SetVolume(u8),
    Mute,
    /// Poll now instead of waiting for the next interval.
    RequestPoll,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCause {
    Poll(PollError),
    Render(RenderError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MachineSettings {
    pub idle_debounce: Duration,
    pub volume_timeout: Duration,
    pub menu_timeout: Duration,
    pub volume_step: u8,
    pub contrast_idle: u8,
    pub contrast_playing: u8,
    pub burn_in_shift: Duration,
    pub scroll_step: Duration,
}

impl MachineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let b = &config.behavior;
        Self {
            idle_debounce: Duration::from_millis(b.idle_debounce_ms),
            volume_timeout: Duration::from_millis(b.volume_timeout_ms),
            menu_timeout: Duration::from_millis(b.menu_timeout_ms),
            volume_step: b.volume_step,
            contrast_idle: config.display.contrast_idle,
            contrast_playing: config.display.contrast_playing,
            burn_in_shift: Duration::from_secs(b.burn_in_shift_secs.max(1)),
            scroll_step: Duration::from_millis(b.scroll_step_ms.max(1)),
        }
    }
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

pub struct StateMachine {
    mode: DeviceMode,
    /// Stable mode (Idle or NowPlaying) an overlay falls back to.
    resume: DeviceMode,
    error_prior: Option<DeviceMode>,
    error_cause: Option<ErrorCause>,
    snapshot: Option<StatusSnapshot>,
    not_playing_since: Option<Instant>,
    /// Last input seen by the active overlay, for its timeout.
    overlay_touched: Instant,
    pending_volume: Option<u8>,
    menu: menu::Menu,
    track_changed_at: Instant,
    started_at: Instant,
    shutting_down: bool,
    settings: MachineSettings,
}

impl StateMachine {
    pub fn new(settings: MachineSettings, now: Instant) -> Self {
        Self {
            mode: DeviceMode::Booting,
            resume: DeviceMode::Idle,
            error_prior: None,
            error_cause: None,
            snapshot: None,
            not_playing_since: None,
            overlay_touched: now,
            pending_volume: None,
            menu: menu::Menu::default(),
            track_changed_at: now,
            started_at: now,
            shutting_down: false,
            settings,
        }
    }

    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    /// Where an overlay will return to; the mode itself otherwise.
    pub fn stable_mode(&self) -> DeviceMode {
        if self.mode.is_overlay() {
            self.resume
        } else {
            self.mode
        }
    }

    pub fn error_prior(&self) -> Option<DeviceMode> {
        self.error_prior
    }

    pub fn error_cause(&self) -> Option<&ErrorCause> {
        self.error_cause.as_ref()
    }

    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// Volume the overlay starts from: what we last asked for, else what the
    /// player reports, else 50.
    pub fn volume(&self) -> u8 {
        self.pending_volume
            .or_else(|| self.snapshot.as_ref().and_then(|s| s.volume_percent))
            .unwrap_or(FALLBACK_VOLUME)
    }

    pub fn handle_input(&mut self, event: &InputEvent) -> Vec<Effect> {
        use DeviceMode::*;
        use InputKind::*;

        let mut effects = Vec::new();
        if event.kind == Shutdown {
            if !self.shutting_down {
                tracing::info!(mode = ?self.mode, "shutdown requested");
                self.shutting_down = true;
            }
            effects.push(Effect::Shutdown);
            return effects;
        }
        if self.shutting_down {
            return effects;
        }

        let now = event.timestamp;
        match (self.mode, event.kind) {
            (Idle | NowPlaying, ButtonPress) => {
                effects.push(Effect::TogglePlayPause);
                effects.push(Effect::RequestPoll);
            }

            (Idle | NowPlaying | VolumeAdjust, EncoderTurn(delta)) => {
                let step = i32::from(self.settings.volume_step);
                let target = i32::from(self.volume())
                    .saturating_add(delta.saturating_mul(step))
                    .clamp(0, 100) as u8;
                self.pending_volume = Some(target);
                self.overlay_touched = now;
                if self.mode != VolumeAdjust {
                    self.resume = self.mode;
                    self.set_mode(VolumeAdjust, &mut effects);
                }
                effects.push(Effect::SetVolume(target));
            }
            (VolumeAdjust, ButtonPress) => self.close_overlay(&mut effects),

            (Idle | NowPlaying | VolumeAdjust, ButtonLongPress) => {
                if self.mode != VolumeAdjust {
                    self.resume = self.mode;
                }
                self.pending_volume = None;
                self.menu.reset();
                self.overlay_touched = now;
                self.set_mode(Menu, &mut effects);
            }
            (Menu, EncoderTurn(delta)) => {
                self.menu.scroll(delta);
                self.overlay_touched = now;
            }
            (Menu, ButtonPress) => {
                match self.menu.current() {
                    MenuItem::Back => {}
                    MenuItem::PlayPause => effects.push(Effect::TogglePlayPause),
                    MenuItem::Mute => effects.push(Effect::Mute),
                }
                self.close_overlay(&mut effects);
            }
            (Menu, ButtonLongPress) => self.close_overlay(&mut effects),

            (ErrorDisplay, ButtonPress) => effects.push(Effect::RequestPoll),

            (mode, kind) => tracing::trace!(?mode, ?kind, "input ignored"),
        }
        effects
    }

    pub fn apply_report(&mut self, report: PollReport, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.shutting_down {
            return effects;
        }

        match report {
            PollReport::Fresh(snapshot) => {
                if !self.accept(snapshot) {
                    return effects;
                }
                match self.mode {
                    DeviceMode::Booting => self.set_mode(DeviceMode::Idle, &mut effects),
                    DeviceMode::ErrorDisplay => {
                        tracing::info!(cause = ?self.error_cause, "recovered");
                        self.error_cause = None;
                        self.error_prior = None;
                        self.set_mode(DeviceMode::Idle, &mut effects);
                    }
                    _ => {}
                }
                self.reconcile(now, &mut effects);
            }
            PollReport::Degraded { snapshot, .. } => {
                // shown as "unknown", never moves the mode
                self.accept(snapshot);
            }
            PollReport::Failed(error) => self.enter_error(ErrorCause::Poll(error), &mut effects),
        }
        effects
    }

    pub fn on_render_failure(&mut self, error: RenderError) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.enter_error(ErrorCause::Render(error), &mut effects);
        effects
    }

    /// Timers: overlay timeouts and the NowPlaying -> Idle debounce.
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.shutting_down {
            return effects;
        }

        let since_touch = now.saturating_duration_since(self.overlay_touched);
        match self.mode {
            DeviceMode::VolumeAdjust if since_touch >= self.settings.volume_timeout => {
                self.close_overlay(&mut effects)
            }
            DeviceMode::Menu if since_touch >= self.settings.menu_timeout => {
                tracing::debug!("menu timed out");
                self.close_overlay(&mut effects)
            }
            _ => {}
        }

        self.settle_debounce(now, &mut effects);
        effects
    }

    /// Projection of the current state onto the panel.
    pub fn view(&self, now: Instant, wall: NaiveDateTime) -> ViewModel {
        let running = now.saturating_duration_since(self.started_at);
        let shift = (running.as_secs() / self.settings.burn_in_shift.as_secs().max(1) % 4) as u8;
        let (idle, playing) = (self.settings.contrast_idle, self.settings.contrast_playing);

        let view = match self.mode {
            DeviceMode::Booting => ViewModel::boot().with_contrast(idle),
            DeviceMode::Idle => {
                ViewModel::clock(wall, running.as_secs() % 2 == 0).with_contrast(idle)
            }
            DeviceMode::NowPlaying => {
                let scrolled = now.saturating_duration_since(self.track_changed_at);
                let steps = (scrolled.as_millis() / self.settings.scroll_step.as_millis()) as u64;
                let view = match &self.snapshot {
                    Some(s) => ViewModel::now_playing(s, self.volume(), wall, steps),
                    None => ViewModel::no_data(self.volume(), wall),
                };
                view.with_contrast(playing)
            }
            DeviceMode::VolumeAdjust => ViewModel::volume(self.volume()).with_contrast(playing),
            DeviceMode::Menu => {
                ViewModel::menu(&menu::Menu::labels(), self.menu.selected()).with_contrast(playing)
            }
            DeviceMode::ErrorDisplay => {
                let detail = match &self.error_cause {
                    Some(ErrorCause::Poll(PollError::Timeout(_))) => "no answer".to_string(),
                    Some(ErrorCause::Poll(PollError::ConnectionRefused(_))) => {
                        "connection refused".to_string()
                    }
                    Some(ErrorCause::Poll(PollError::Parse(_))) => "bad status".to_string(),
                    Some(ErrorCause::Render(e)) => e.to_string(),
                    None => String::new(),
                };
                ViewModel::error(&detail).with_contrast(idle)
            }
        };
        view.with_shift(shift)
    }

    /// Stores a snapshot unless it is older than the one we have.
    fn accept(&mut self, snapshot: StatusSnapshot) -> bool {
        if let Some(current) = &self.snapshot {
            if snapshot.timestamp < current.timestamp {
                tracing::debug!("dropping stale snapshot");
                return false;
            }
            if !snapshot.same_track(current) {
                self.track_changed_at = snapshot.timestamp;
            }
        } else {
            self.track_changed_at = snapshot.timestamp;
        }
        self.snapshot = Some(snapshot);
        true
    }

    /// Moves the stable mode towards what the latest snapshot says.
    fn reconcile(&mut self, now: Instant, effects: &mut Vec<Effect>) {
        let state = match &self.snapshot {
            Some(s) => s.playback_state,
            None => return,
        };

        match state {
            PlaybackState::Playing => {
                self.not_playing_since = None;
                if self.stable_mode() == DeviceMode::Idle {
                    self.set_stable(DeviceMode::NowPlaying, effects);
                }
            }
            PlaybackState::Paused | PlaybackState::Stopped => {
                if self.stable_mode() == DeviceMode::NowPlaying {
                    self.not_playing_since.get_or_insert(now);
                }
                self.settle_debounce(now, effects);
            }
            PlaybackState::Unknown => {}
        }
    }

    fn settle_debounce(&mut self, now: Instant, effects: &mut Vec<Effect>) {
        let Some(since) = self.not_playing_since else {
            return;
        };
        if self.stable_mode() != DeviceMode::NowPlaying {
            self.not_playing_since = None;
            return;
        }
        if now.saturating_duration_since(since) >= self.settings.idle_debounce {
            self.not_playing_since = None;
            self.set_stable(DeviceMode::Idle, effects);
        }
    }

    /// Sets the stable mode, directly or through the active overlay.
    fn set_stable(&mut self, mode: DeviceMode, effects: &mut Vec<Effect>) {
        match self.mode {
            DeviceMode::VolumeAdjust | DeviceMode::Menu => {
                tracing::debug!(from = ?self.resume, to = ?mode, "overlay will return elsewhere");
                self.resume = mode;
            }
            DeviceMode::Idle | DeviceMode::NowPlaying => self.set_mode(mode, effects),
            DeviceMode::Booting | DeviceMode::ErrorDisplay => {}
        }
    }

    fn close_overlay(&mut self, effects: &mut Vec<Effect>) {
        self.pending_volume = None;
        let resume = self.resume;
        self.set_mode(resume, effects);
    }

    fn enter_error(&mut self, cause: ErrorCause, effects: &mut Vec<Effect>) {
        if self.mode != DeviceMode::ErrorDisplay {
            tracing::warn!(?cause, "entering error display");
            self.error_prior = Some(self.mode);
            self.pending_volume = None;
            self.not_playing_since = None;
            self.set_mode(DeviceMode::ErrorDisplay, effects);
        }
        self.error_cause = Some(cause);
    }

    fn set_mode(&mut self, mode: DeviceMode, effects: &mut Vec<Effect>) {
        if mode == self.mode {
            return;
        }
        tracing::info!(from = ?self.mode, to = ?mode, "mode change");
        self.mode = mode;
        if !effects.contains(&Effect::RequestPoll) {
            effects.push(Effect::RequestPoll);
        }
    }
}
