//! Keyboard stand-in for the knob, for running on a desktop.
//!
//! | key                | event               |
//! |--------------------|---------------------|
//! | Up, Right, `+`     | encoder +1          |
//! | Down, Left, `-`    | encoder -1          |
//! | Enter, Space       | button press        |
//! | `m`, Tab           | button long press   |
//! | `q`, Esc, Ctrl-C   | shutdown            |

use super::{InputEvent, InputKind};
use crate::error::InitError;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use futures::StreamExt;
use tokio::sync::mpsc;

/// Leaves raw mode when dropped.
pub struct RawModeGuard(());

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

pub fn map_key(key: KeyEvent) -> Option<InputKind> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(InputKind::Shutdown);
    }

    match key.code {
        KeyCode::Up | KeyCode::Right | KeyCode::Char('+') => Some(InputKind::EncoderTurn(1)),
        KeyCode::Down | KeyCode::Left | KeyCode::Char('-') => Some(InputKind::EncoderTurn(-1)),
        KeyCode::Enter | KeyCode::Char(' ') => Some(InputKind::ButtonPress),
        KeyCode::Char('m') | KeyCode::Tab => Some(InputKind::ButtonLongPress),
        KeyCode::Char('q') | KeyCode::Esc => Some(InputKind::Shutdown),
        _ => None,
    }
}

/// Raw mode stays on for as long as the returned guard lives.
pub fn spawn(tx: mpsc::Sender<InputEvent>) -> Result<RawModeGuard, InitError> {
    enable_raw_mode()
        .map_err(|e| InitError::PeripheralNotFound(format!("terminal: {}", e)))?;
    let guard = RawModeGuard(());

    tokio::spawn(async move {
        let mut reader = EventStream::new();
        while let Some(Ok(event)) = reader.next().await {
            let Event::Key(key) = event else { continue };
            if let Some(kind) = map_key(key) {
                if tx.send(InputEvent::now(kind)).await.is_err() {
                    break;
                }
            }
        }
        tracing::debug!("keyboard input stream ended");
    });

    tracing::info!("keyboard input ready (arrows turn, enter presses, m long-presses, q quits)");
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(map_key(key(KeyCode::Up)), Some(InputKind::EncoderTurn(1)));
        assert_eq!(map_key(key(KeyCode::Char('-'))), Some(InputKind::EncoderTurn(-1)));
        assert_eq!(map_key(key(KeyCode::Enter)), Some(InputKind::ButtonPress));
        assert_eq!(map_key(key(KeyCode::Tab)), Some(InputKind::ButtonLongPress));
        assert_eq!(map_key(key(KeyCode::Char('q'))), Some(InputKind::Shutdown));
        assert_eq!(map_key(key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(ctrl_c), Some(InputKind::Shutdown));
        let ctrl_m = KeyEvent::new(KeyCode::Char('m'), KeyModifiers::CONTROL);
        assert_eq!(map_key(ctrl_m), None);
    }
}
