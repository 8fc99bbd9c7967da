use super::config::{AppConfig, DisplayBackend, InputBackend, PlayerBackend};
use clap::Parser;
use std::path::PathBuf;

/// moode-oled - now-playing screen and knob for a moOde player 🎵
#[derive(Parser, Debug)]
#[command(name = "moode-oled", version, about)]
pub struct Args {
    /// Config file (default: ~/.config/moode-oled/config.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Generate default config.toml to stdout
    #[arg(long)]
    pub print_config: bool,

    /// Debug logging (RUST_LOG still wins)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Status source
    #[arg(long, value_enum)]
    pub player: Option<PlayerBackend>,

    /// Where frames go
    #[arg(long, value_enum)]
    pub display: Option<DisplayBackend>,

    /// Where button/encoder events come from
    #[arg(long, value_enum)]
    pub input: Option<InputBackend>,

    /// Player host (default: localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// Player port (default: 80 for moOde, 6600 for MPD)
    #[arg(long)]
    pub port: Option<u16>,

    /// Wait this long before touching any hardware
    #[arg(long, value_name = "MS")]
    pub startup_delay: Option<u64>,

    /// PID lock file
    #[arg(long, default_value = super::lock::LOCK_FILE_PATH)]
    pub lock_file: PathBuf,
}

impl Args {
    /// Command-line flags win over the file.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(backend) = self.player {
            config.player.backend = backend;
        }
        if let Some(backend) = self.display {
            config.display.backend = backend;
        }
        if let Some(backend) = self.input {
            config.input.backend = backend;
        }
        if let Some(host) = &self.host {
            config.player.host = host.clone();
        }
        if let Some(port) = self.port {
            config.player.port = Some(port);
        }
        if let Some(delay) = self.startup_delay {
            config.behavior.startup_delay_ms = delay;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "moode-oled",
            "--display",
            "terminal",
            "--input",
            "keyboard",
            "--player",
            "mpd",
            "--host",
            "moode.local",
        ]);
        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.display.backend, DisplayBackend::Terminal);
        assert_eq!(config.input.backend, InputBackend::Keyboard);
        assert_eq!(config.player.backend, PlayerBackend::Mpd);
        assert_eq!(config.player.host, "moode.local");
        assert_eq!(config.player.effective_port(), 6600);
        assert_eq!(args.lock_file, PathBuf::from("/tmp/moode-oled.lock"));
    }
}
