use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlayerBackend {
    /// moOde HTTP command API
    #[default]
    Moode,
    /// MPD protocol (needs the `mpd` feature)
    Mpd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DisplayBackend {
    /// SH1106 OLED on I2C (needs the `hardware` feature)
    #[default]
    Sh1106,
    /// Half-block preview in the current terminal
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputBackend {
    /// Button + rotary encoder on the GPIO character device
    #[default]
    Gpio,
    /// Arrow keys / Enter / m / q in the terminal
    Keyboard,
    /// Signals only
    None,
}

/// `[player]` — where the status comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub backend: PlayerBackend,
    pub host: String,
    /// Defaults to 80 for moOde and 6600 for MPD.
    pub port: Option<u16>,
    pub status_path: String,
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
    /// Consecutive failures shown as "unknown" before the error screen.
    pub max_silent_failures: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            backend: PlayerBackend::Moode,
            host: "localhost".to_string(),
            port: None,
            status_path: "/command/?cmd=get_currentsong".to_string(),
            poll_interval_ms: 1000,
            timeout_ms: 800,
            max_silent_failures: 4,
        }
    }
}

impl PlayerConfig {
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(match self.backend {
            PlayerBackend::Moode => 80,
            PlayerBackend::Mpd => 6600,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(50))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

/// `[display]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub backend: DisplayBackend,
    pub i2c_bus: String,
    pub address: u8,
    pub contrast_idle: u8,
    pub contrast_playing: u8,
    /// Extra attempts per frame before the failure is reported.
    pub render_retries: u8,
    /// Consecutive failed cycles after which the panel is considered gone.
    pub max_render_failures: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            backend: DisplayBackend::Sh1106,
            i2c_bus: "/dev/i2c-1".to_string(),
            address: 0x3C,
            contrast_idle: 40,
            contrast_playing: 180,
            render_retries: 2,
            max_render_failures: 30,
        }
    }
}

/// `[input]` — pins follow the KY-040 wiring: S1=17, S2=27, KEY=22.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub backend: InputBackend,
    pub gpio_chip: String,
    pub button_line: u32,
    pub encoder_a_line: u32,
    pub encoder_b_line: u32,
    /// Lines read 0 when pressed (pull-up wiring).
    pub active_low: bool,
    pub debounce_ms: u64,
    pub long_press_ms: u64,
    /// Quadrature transitions per reported detent.
    pub steps_per_detent: u8,
    pub sample_interval_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            backend: InputBackend::Gpio,
            gpio_chip: "/dev/gpiochip0".to_string(),
            button_line: 22,
            encoder_a_line: 17,
            encoder_b_line: 27,
            active_low: true,
            debounce_ms: 50,
            long_press_ms: 1000,
            steps_per_detent: 4,
            sample_interval_ms: 2,
        }
    }
}

/// `[behavior]` — state machine timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub idle_debounce_ms: u64,
    pub volume_timeout_ms: u64,
    pub menu_timeout_ms: u64,
    pub volume_step: u8,
    pub tick_ms: u64,
    pub shutdown_grace_ms: u64,
    /// Sleep before touching any peripheral, lets moOde finish booting.
    pub startup_delay_ms: u64,
    pub burn_in_shift_secs: u64,
    pub scroll_step_ms: u64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            idle_debounce_ms: 3000,
            volume_timeout_ms: 2000,
            menu_timeout_ms: 10_000,
            volume_step: 5,
            tick_ms: 200,
            shutdown_grace_ms: 1500,
            startup_delay_ms: 0,
            burn_in_shift_secs: 60,
            scroll_step_ms: 200,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub level: String,
    /// Write a daily-rolling file next to stderr output.
    pub file: bool,
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
            directory: None,
        }
    }
}
