//! Push button + KY-040 style rotary encoder on the GPIO character device.
//!
//! Lines are sampled from a dedicated thread every `sample_interval_ms`;
//! edge debouncing and long-press detection happen here, so the state
//! machine only ever sees clean events.

use super::{InputEvent, InputKind};
use crate::app::config::InputConfig;
use crate::error::InitError;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Quadrature decoder with transition-table noise rejection.
///
/// Invalid transitions (both lines flipping at once) contribute nothing.
#[derive(Debug, Clone)]
pub struct QuadratureDecoder {
    last: u8,
    accum: i32,
    steps_per_detent: i32,
}

impl QuadratureDecoder {
    // index = (previous AB << 2) | current AB
    const TABLE: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

    pub fn new(a: bool, b: bool, steps_per_detent: u8) -> Self {
        Self {
            last: Self::bits(a, b),
            accum: 0,
            steps_per_detent: i32::from(steps_per_detent.max(1)),
        }
    }

    fn bits(a: bool, b: bool) -> u8 {
        (u8::from(a) << 1) | u8::from(b)
    }

    /// Feed one sample. Returns +1/-1 when a full detent completes.
    pub fn update(&mut self, a: bool, b: bool) -> Option<i32> {
        let current = Self::bits(a, b);
        if current == self.last {
            return None;
        }

        let index = usize::from((self.last << 2) | current);
        self.last = current;
        self.accum += i32::from(Self::TABLE[index]);

        if self.accum >= self.steps_per_detent {
            self.accum = 0;
            Some(1)
        } else if self.accum <= -self.steps_per_detent {
            self.accum = 0;
            Some(-1)
        } else {
            None
        }
    }
}

/// Debounced button with long-press detection.
///
/// A long press fires once while the button is still held; the release
/// that follows it produces nothing.
#[derive(Debug, Clone)]
pub struct ButtonTracker {
    debounce: Duration,
    long_press: Duration,
    raw: bool,
    raw_since: Instant,
    pressed: bool,
    pressed_at: Option<Instant>,
    long_fired: bool,
}

impl ButtonTracker {
    pub fn new(debounce: Duration, long_press: Duration, now: Instant) -> Self {
        Self {
            debounce,
            long_press,
            raw: false,
            raw_since: now,
            pressed: false,
            pressed_at: None,
            long_fired: false,
        }
    }

    pub fn update(&mut self, raw_pressed: bool, now: Instant) -> Option<InputKind> {
        if raw_pressed != self.raw {
            self.raw = raw_pressed;
            self.raw_since = now;
        }

        let settled = now.saturating_duration_since(self.raw_since) >= self.debounce;
        if settled && self.raw != self.pressed {
            self.pressed = self.raw;
            if self.pressed {
                self.pressed_at = Some(now);
                self.long_fired = false;
            } else {
                self.pressed_at = None;
                if !self.long_fired {
                    return Some(InputKind::ButtonPress);
                }
            }
        }

        if let Some(since) = self.pressed_at {
            if !self.long_fired && now.saturating_duration_since(since) >= self.long_press {
                self.long_fired = true;
                return Some(InputKind::ButtonLongPress);
            }
        }

        None
    }
}

#[cfg(feature = "hardware")]
pub fn spawn(config: &InputConfig, tx: mpsc::Sender<InputEvent>) -> Result<(), InitError> {
    use gpio_cdev::{Chip, LineRequestFlags};

    let mut chip = Chip::new(&config.gpio_chip)
        .map_err(|e| InitError::PeripheralNotFound(format!("{}: {}", config.gpio_chip, e)))?;

    let mut request = |line: u32, consumer: &str| {
        chip.get_line(line)
            .and_then(|l| l.request(LineRequestFlags::INPUT, 0, consumer))
            .map_err(|e| {
                InitError::PeripheralNotFound(format!("{} line {}: {}", config.gpio_chip, line, e))
            })
    };

    let button = request(config.button_line, "moode-oled-key")?;
    let enc_a = request(config.encoder_a_line, "moode-oled-s1")?;
    let enc_b = request(config.encoder_b_line, "moode-oled-s2")?;

    let active_low = config.active_low;
    let level = move |value: u8| if active_low { value == 0 } else { value != 0 };
    let sample = Duration::from_millis(config.sample_interval_ms.max(1));
    let debounce = Duration::from_millis(config.debounce_ms);
    let long_press = Duration::from_millis(config.long_press_ms);
    let steps = config.steps_per_detent;

    tracing::info!(
        chip = %config.gpio_chip,
        button = config.button_line,
        a = config.encoder_a_line,
        b = config.encoder_b_line,
        "GPIO input ready"
    );

    std::thread::Builder::new()
        .name("gpio-input".to_string())
        .spawn(move || {
            let read = |handle: &gpio_cdev::LineHandle| handle.get_value().map(level);

            let (a0, b0) = (read(&enc_a).unwrap_or(false), read(&enc_b).unwrap_or(false));
            let mut decoder = QuadratureDecoder::new(a0, b0, steps);
            let mut tracker = ButtonTracker::new(debounce, long_press, Instant::now());
            let mut read_error_logged = false;

            loop {
                let now = Instant::now();
                let mut events = Vec::with_capacity(2);

                match (read(&enc_a), read(&enc_b), read(&button)) {
                    (Ok(a), Ok(b), Ok(pressed)) => {
                        read_error_logged = false;
                        if let Some(delta) = decoder.update(a, b) {
                            events.push(InputKind::EncoderTurn(delta));
                        }
                        if let Some(kind) = tracker.update(pressed, now) {
                            events.push(kind);
                        }
                    }
                    (a, b, k) => {
                        if !read_error_logged {
                            let err = a.err().or(b.err()).or(k.err());
                            tracing::warn!(error = ?err, "GPIO read failed");
                            read_error_logged = true;
                        }
                    }
                }

                for kind in events {
                    if tx.blocking_send(InputEvent::new(kind, now)).is_err() {
                        tracing::debug!("input receiver closed, stopping GPIO thread");
                        return;
                    }
                }

                std::thread::sleep(sample);
            }
        })
        .map_err(|e| InitError::MissingDependency(format!("GPIO thread: {}", e)))?;

    Ok(())
}

#[cfg(not(feature = "hardware"))]
pub fn spawn(_config: &InputConfig, _tx: mpsc::Sender<InputEvent>) -> Result<(), InitError> {
    Err(InitError::MissingDependency(
        "GPIO input requested but this build lacks the `hardware` feature".to_string(),
    ))
}
