//! Physical and virtual input sources.
//!
//! Every source only sends [`InputEvent`]s into the controller's channel;
//! none of them touch the state machine directly.

pub mod gpio;
pub mod keyboard;
pub mod signals;

use crate::app::config::{InputBackend, InputConfig};
use crate::error::InitError;
use std::time::Instant;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    ButtonPress,
    ButtonLongPress,
    /// Detents turned, clockwise positive.
    EncoderTurn(i32),
    Shutdown,
}

/// A discrete input, consumed exactly once by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: InputKind,
    pub timestamp: Instant,
}

impl InputEvent {
    pub fn new(kind: InputKind, timestamp: Instant) -> Self {
        Self { kind, timestamp }
    }

    pub fn now(kind: InputKind) -> Self {
        Self::new(kind, Instant::now())
    }
}

/// Keeps whatever the running backend needs alive (terminal raw mode).
#[derive(Default)]
pub struct InputGuard {
    _raw_mode: Option<keyboard::RawModeGuard>,
}

/// Starts the configured input backend, feeding `tx`.
pub fn spawn(config: &InputConfig, tx: mpsc::Sender<InputEvent>) -> Result<InputGuard, InitError> {
    match config.backend {
        InputBackend::Gpio => gpio::spawn(config, tx).map(|()| InputGuard::default()),
        InputBackend::Keyboard => keyboard::spawn(tx).map(|guard| InputGuard {
            _raw_mode: Some(guard),
        }),
        InputBackend::None => {
            tracing::info!("no input backend configured, signals only");
            Ok(InputGuard::default())
        }
    }
}
