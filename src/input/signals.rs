use super::{InputEvent, InputKind};
use crate::error::InitError;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

/// Turns SIGINT / SIGTERM into a `Shutdown` input.
pub fn spawn(tx: mpsc::Sender<InputEvent>) -> Result<(), InitError> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| InitError::MissingDependency(format!("SIGTERM handler: {}", e)))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| InitError::MissingDependency(format!("SIGINT handler: {}", e)))?;

    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        tracing::info!(signal = name, "termination requested");
        let _ = tx.send(InputEvent::now(InputKind::Shutdown)).await;
    });

    Ok(())
}
