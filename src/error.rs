//! Error types shared across the poller, renderer and startup path.
//!
//! Poll and render errors are recovered by the state machine. `InitError`
//! is fatal: the binary logs it and exits non-zero so the boot-time service
//! can restart us.

use thiserror::Error;

/// Why a status query failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollError {
    /// No answer within the configured timeout.
    #[error("status request timed out after {0} ms")]
    Timeout(u64),

    /// The player could not be reached (refused, reset, non-success status).
    #[error("player unreachable: {0}")]
    ConnectionRefused(String),

    /// The player answered but the payload made no sense.
    #[error("malformed status payload: {0}")]
    Parse(String),
}

/// Why a frame could not be pushed to the display.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    /// Someone else holds the bus, or arbitration was lost mid-transfer.
    #[error("display bus is busy")]
    BusBusy,

    /// The panel did not acknowledge.
    #[error("display is not responding")]
    NotResponding,
}

/// Unrecoverable startup failures.
#[derive(Debug, Error)]
pub enum InitError {
    /// A backend was requested that this build or host cannot provide.
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    /// The display bus or GPIO chip is not there.
    #[error("peripheral not found: {0}")]
    PeripheralNotFound(String),

    /// The configuration file exists but could not be used.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Another process already drives the panel.
    #[error("another instance is already running (pid {0})")]
    AlreadyRunning(i32),
}

/// A play/pause or volume command the player rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("player unreachable: {0}")]
    Unreachable(String),

    #[error("player rejected command `{command}`: {reason}")]
    Rejected { command: String, reason: String },
}
