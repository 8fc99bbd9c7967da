//! The control loop and process wiring.
//!
//! One task owns the state machine and the display. Inputs, poll reports and
//! the housekeeping tick all arrive over channels; each cycle applies inputs
//! first, then poll reports, then timers, executes the resulting effects and
//! renders at most once.

pub mod cli;
pub mod config;
pub mod events;
pub mod lock;
pub mod logging;

use crate::display::{DisplayRenderer, ViewModel};
use crate::error::InitError;
use crate::input::{self, InputEvent};
use crate::machine::{Effect, MachineSettings, StateMachine};
use crate::player::{AnyPlayer, Player, PollReport, StatusPoller};
use chrono::NaiveDateTime;
use config::AppConfig;
use events::AppEvent;
use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};
use tokio::time::MissedTickBehavior;

/// How long runtime teardown may wait for blocking tasks still running
/// (a display clear or an MPD call stuck on the bus or socket).
pub const TEARDOWN: Duration = Duration::from_millis(50);

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Signal or quit key.
    Shutdown,
    /// The panel failed for too many cycles in a row.
    DisplayLost,
}

impl Exit {
    pub fn code(self) -> u8 {
        match self {
            Exit::Shutdown => 0,
            Exit::DisplayLost => 2,
        }
    }
}

/// Play/volume commands leave the loop through here, one at a time and in order.
fn spawn_command_worker<P: Player>(player: Arc<P>, wake: Arc<Notify>) -> mpsc::Sender<Effect> {
    let (tx, mut rx) = mpsc::channel::<Effect>(32);
    tokio::spawn(async move {
        while let Some(effect) = rx.recv().await {
            let result = match effect {
                Effect::TogglePlayPause => player.toggle_play_pause().await,
                Effect::SetVolume(percent) => player.set_volume(percent).await,
                Effect::Mute => player.mute().await,
                Effect::RequestPoll | Effect::Shutdown => continue,
            };
            match result {
                Ok(()) => tracing::debug!(?effect, "command done"),
                Err(error) => tracing::warn!(?effect, %error, "command failed"),
            }
            // let the screen catch up with what the player did
            wake.notify_one();
        }
    });
    tx
}

pub struct Controller {
    machine: StateMachine,
    renderer: Option<DisplayRenderer>,
    commands: mpsc::Sender<Effect>,
    poll_wake: Arc<Notify>,
    last_view: Option<ViewModel>,
    render_failures: u32,
    max_render_failures: u32,
    shutdown_grace: Duration,
}

impl Controller {
    pub fn new<P: Player>(
        config: &AppConfig,
        player: Arc<P>,
        renderer: DisplayRenderer,
        poll_wake: Arc<Notify>,
        now: Instant,
    ) -> Self {
        Self {
            machine: StateMachine::new(MachineSettings::from_config(config), now),
            renderer: Some(renderer),
            commands: spawn_command_worker(player, poll_wake.clone()),
            poll_wake,
            last_view: None,
            render_failures: 0,
            max_render_failures: config.display.max_render_failures.max(1),
            // teardown gets the rest of the grace
            shutdown_grace: Duration::from_millis(config.behavior.shutdown_grace_ms)
                .saturating_sub(TEARDOWN),
        }
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn render_failures(&self) -> u32 {
        self.render_failures
    }

    /// One pass of the loop with everything that arrived since the last one.
    pub async fn run_cycle(
        &mut self,
        inputs: Vec<InputEvent>,
        reports: Vec<PollReport>,
        now: Instant,
        wall: NaiveDateTime,
    ) -> Option<Exit> {
        let mut effects = Vec::new();
        for event in &inputs {
            effects.extend(self.machine.handle_input(event));
        }
        for report in reports {
            effects.extend(self.machine.apply_report(report, now));
        }
        effects.extend(self.machine.tick(now));

        if self.execute(effects) {
            self.shutdown().await;
            return Some(Exit::Shutdown);
        }

        self.render(now, wall)
    }

    /// Runs until a shutdown input or until the display is gone.
    pub async fn run(
        mut self,
        mut inputs: mpsc::Receiver<InputEvent>,
        mut reports: mpsc::Receiver<PollReport>,
        tick: Duration,
    ) -> Exit {
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let event = tokio::select! {
                biased;
                Some(input) = inputs.recv() => AppEvent::Input(input),
                Some(report) = reports.recv() => AppEvent::Poll(report),
                _ = ticker.tick() => AppEvent::Tick,
            };

            let mut batch_inputs = Vec::new();
            let mut batch_reports = Vec::new();
            match event {
                AppEvent::Input(input) => batch_inputs.push(input),
                AppEvent::Poll(report) => batch_reports.push(report),
                AppEvent::Tick => {}
            }
            while let Ok(input) = inputs.try_recv() {
                batch_inputs.push(input);
            }
            while let Ok(report) = reports.try_recv() {
                batch_reports.push(report);
            }

            let wall = chrono::Local::now().naive_local();
            if let Some(exit) = self
                .run_cycle(batch_inputs, batch_reports, Instant::now(), wall)
                .await
            {
                return exit;
            }
        }
    }

    /// Returns true once shutdown was requested.
    fn execute(&mut self, effects: Vec<Effect>) -> bool {
        let mut shutdown = false;
        for effect in effects {
            match effect {
                Effect::RequestPoll => self.poll_wake.notify_one(),
                Effect::Shutdown => shutdown = true,
                command => {
                    if let Err(e) = self.commands.try_send(command) {
                        tracing::warn!(?command, error = %e, "dropping player command");
                    }
                }
            }
        }
        shutdown
    }

    fn render(&mut self, now: Instant, wall: NaiveDateTime) -> Option<Exit> {
        let view = self.machine.view(now, wall);
        if self.last_view.as_ref() == Some(&view) {
            return None;
        }
        let renderer = self.renderer.as_mut()?;

        match renderer.render(&view) {
            Ok(()) => {
                if self.render_failures > 0 {
                    tracing::info!(failures = self.render_failures, "display is back");
                }
                self.render_failures = 0;
                self.last_view = Some(view);
                None
            }
            Err(error) => {
                self.render_failures += 1;
                self.last_view = None;
                tracing::warn!(%error, failures = self.render_failures, "render failed");

                let effects = self.machine.on_render_failure(error);
                self.execute(effects);

                if self.render_failures >= self.max_render_failures {
                    tracing::error!(failures = self.render_failures, "display lost, giving up");
                    return Some(Exit::DisplayLost);
                }
                None
            }
        }
    }

    /// Blanks the panel, never taking longer than the shutdown grace.
    async fn shutdown(&mut self) {
        let Some(mut renderer) = self.renderer.take() else {
            return;
        };

        let clear = tokio::task::spawn_blocking(move || renderer.clear());
        match tokio::time::timeout(self.shutdown_grace, clear).await {
            Ok(Ok(Ok(()))) => tracing::info!("display cleared"),
            Ok(Ok(Err(error))) => tracing::warn!(%error, "could not clear display"),
            Ok(Err(error)) => tracing::warn!(%error, "display clear task failed"),
            Err(_) => tracing::warn!(
                grace_ms = self.shutdown_grace.as_millis() as u64,
                "display clear timed out"
            ),
        }
    }
}

/// Runs `future` to completion on a fresh multi-thread runtime.
///
/// Dropping a runtime waits for every blocking task, so teardown is capped
/// at [`TEARDOWN`] instead; whatever is still stuck is abandoned.
pub fn block_on_bounded<F: Future>(future: F) -> io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(TEARDOWN);
    Ok(output)
}

/// Brings everything up and runs until exit.
pub async fn launch(config: AppConfig, lock_path: &Path) -> Result<Exit, InitError> {
    if config.behavior.startup_delay_ms > 0 {
        tracing::info!(ms = config.behavior.startup_delay_ms, "waiting before startup");
        tokio::time::sleep(Duration::from_millis(config.behavior.startup_delay_ms)).await;
    }

    let _lock = lock::InstanceLock::acquire(lock_path)?;

    let player = Arc::new(AnyPlayer::from_config(&config.player)?);
    let renderer = DisplayRenderer::open(&config.display)?;
    tracing::info!(
        player = player.name(),
        display = renderer.name(),
        input = ?config.input.backend,
        "starting up"
    );

    let (input_tx, input_rx) = mpsc::channel(64);
    let _input_guard = input::spawn(&config.input, input_tx.clone())?;
    input::signals::spawn(input_tx)?;

    let poll_wake = Arc::new(Notify::new());
    let (report_tx, report_rx) = mpsc::channel(8);
    let poller = StatusPoller::new(Arc::clone(&player), &config.player).spawn(
        config.player.poll_interval(),
        Arc::clone(&poll_wake),
        report_tx,
    );

    let controller = Controller::new(&config, player, renderer, poll_wake, Instant::now());
    let tick = Duration::from_millis(config.behavior.tick_ms.max(10));
    let exit = controller.run(input_rx, report_rx, tick).await;

    poller.abort();
    tracing::info!(?exit, "stopped");
    Ok(exit)
}
