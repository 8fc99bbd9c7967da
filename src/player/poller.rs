//! Timeout-bounded status polling with failure accounting.

use super::traits::{Player, StatusSnapshot};
use crate::app::config::PlayerConfig;
use crate::error::PollError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// What one poll means for the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum PollReport {
    /// The player answered.
    Fresh(StatusSnapshot),
    /// A tolerated failure: the last good read, marked `Unknown`.
    Degraded {
        snapshot: StatusSnapshot,
        error: PollError,
    },
    /// Too many failures in a row.
    Failed(PollError),
}

pub struct StatusPoller<P: Player> {
    player: Arc<P>,
    timeout: Duration,
    max_silent_failures: u32,
    consecutive_failures: u32,
    last_good: Option<StatusSnapshot>,
}

impl<P: Player> StatusPoller<P> {
    pub fn new(player: Arc<P>, config: &PlayerConfig) -> Self {
        Self {
            player,
            timeout: config.timeout(),
            max_silent_failures: config.max_silent_failures,
            consecutive_failures: 0,
            last_good: None,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// One status query, never longer than the configured timeout.
    pub async fn poll(&self) -> Result<StatusSnapshot, PollError> {
        match tokio::time::timeout(self.timeout, self.player.status()).await {
            Ok(result) => result,
            Err(_) => Err(PollError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    /// `poll()` plus the silent-failure budget.
    pub async fn next_report(&mut self) -> PollReport {
        let result = self.poll().await;
        self.account(result, Instant::now())
    }

    fn account(&mut self, result: Result<StatusSnapshot, PollError>, now: Instant) -> PollReport {
        match result {
            Ok(snapshot) => {
                if self.consecutive_failures > 0 {
                    tracing::info!(
                        failures = self.consecutive_failures,
                        "player reachable again"
                    );
                }
                self.consecutive_failures = 0;
                self.last_good = Some(snapshot.clone());
                PollReport::Fresh(snapshot)
            }
            Err(error) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures > self.max_silent_failures {
                    tracing::warn!(
                        failures = self.consecutive_failures,
                        %error,
                        "status polling keeps failing"
                    );
                    PollReport::Failed(error)
                } else {
                    tracing::debug!(
                        failures = self.consecutive_failures,
                        %error,
                        "status poll failed, tolerating"
                    );
                    PollReport::Degraded {
                        snapshot: StatusSnapshot::unknown_from(self.last_good.as_ref(), now),
                        error,
                    }
                }
            }
        }
    }

    /// Runs the poll loop: every `interval`, or right away when `wake` fires.
    /// Stops once the receiver is gone.
    pub fn spawn(
        mut self,
        interval: Duration,
        wake: Arc<Notify>,
        tx: mpsc::Sender<PollReport>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = wake.notified() => ticker.reset(),
                }

                let report = self.next_report().await;
                if tx.send(report).await.is_err() {
                    tracing::debug!("poll receiver closed, stopping poller");
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControlError;
    use crate::player::PlaybackState;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<VecDeque<Result<StatusSnapshot, PollError>>>,
        delay: Duration,
    }

    impl Player for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn status(&self) -> Result<StatusSnapshot, PollError> {
            tokio::time::sleep(self.delay).await;
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(PollError::ConnectionRefused("script empty".into())))
        }

        async fn toggle_play_pause(&self) -> Result<(), ControlError> {
            Ok(())
        }

        async fn set_volume(&self, _percent: u8) -> Result<(), ControlError> {
            Ok(())
        }

        async fn mute(&self) -> Result<(), ControlError> {
            Ok(())
        }
    }

    fn playing(title: &str) -> StatusSnapshot {
        let mut s = StatusSnapshot::empty(Instant::now());
        s.playback_state = PlaybackState::Playing;
        s.track_title = title.to_string();
        s
    }

    fn poller(replies: Vec<Result<StatusSnapshot, PollError>>, delay: Duration) -> StatusPoller<Scripted> {
        let config = PlayerConfig {
            timeout_ms: 100,
            max_silent_failures: 2,
            ..PlayerConfig::default()
        };
        let player = Scripted {
            replies: Mutex::new(replies.into()),
            delay,
        };
        StatusPoller::new(Arc::new(player), &config)
    }

    #[tokio::test]
    async fn test_failures_escalate_after_budget() {
        let refused = || Err(PollError::ConnectionRefused("refused".into()));
        let mut p = poller(
            vec![Ok(playing("Song A")), refused(), refused(), refused(), Ok(playing("Song B"))],
            Duration::ZERO,
        );

        assert!(matches!(p.next_report().await, PollReport::Fresh(_)));

        for _ in 0..2 {
            match p.next_report().await {
                PollReport::Degraded { snapshot, .. } => {
                    assert_eq!(snapshot.playback_state, PlaybackState::Unknown);
                    assert_eq!(snapshot.track_title, "Song A");
                }
                other => panic!("expected degraded, got {:?}", other),
            }
        }

        assert!(matches!(p.next_report().await, PollReport::Failed(_)));
        assert_eq!(p.consecutive_failures(), 3);

        assert!(matches!(p.next_report().await, PollReport::Fresh(_)));
        assert_eq!(p.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_player_times_out() {
        let p = poller(vec![Ok(playing("late"))], Duration::from_secs(5));
        assert_eq!(p.poll().await, Err(PollError::Timeout(100)));
    }
}
