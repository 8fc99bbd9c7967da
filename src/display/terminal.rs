//! Terminal preview of the panel, two pixel rows per character cell.

use super::frame::Frame;
use super::view::{HEIGHT, WIDTH};
use super::DisplayPeripheral;
use crate::error::{InitError, RenderError};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::Print,
    terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Stdout, Write};

pub struct TerminalDisplay {
    out: Stdout,
    contrast: u8,
}

impl TerminalDisplay {
    pub fn open() -> Result<Self, InitError> {
        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, Hide, Clear(ClearType::All))
            .map_err(|e| InitError::PeripheralNotFound(format!("terminal: {}", e)))?;
        tracing::info!("terminal preview ready");
        Ok(Self { out, contrast: 0xCF })
    }

    /// Half-block art for a frame, one `String` per terminal row.
    pub fn rows(frame: &Frame) -> Vec<String> {
        (0..HEIGHT)
            .step_by(2)
            .map(|y| {
                (0..WIDTH)
                    .map(|x| match (frame.pixel(x, y), frame.pixel(x, y + 1)) {
                        (true, true) => '█',
                        (true, false) => '▀',
                        (false, true) => '▄',
                        (false, false) => ' ',
                    })
                    .collect()
            })
            .collect()
    }

    fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        // raw mode may be on, so every row is positioned explicitly
        let border = "─".repeat(WIDTH as usize);
        queue!(self.out, MoveTo(0, 0), Print(format!("┌{}┐", border)))?;
        for (i, row) in Self::rows(frame).iter().enumerate() {
            queue!(self.out, MoveTo(0, i as u16 + 1), Print(format!("│{}│", row)))?;
        }
        let bottom = HEIGHT as u16 / 2 + 1;
        queue!(
            self.out,
            MoveTo(0, bottom),
            Print(format!("└{}┘", border)),
            MoveTo(0, bottom + 1),
            Print(format!("contrast {:>3}", self.contrast))
        )?;
        self.out.flush()
    }
}

impl DisplayPeripheral for TerminalDisplay {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn write(&mut self, frame: &Frame) -> Result<(), RenderError> {
        self.draw(frame).map_err(|_| RenderError::NotResponding)
    }

    fn set_contrast(&mut self, level: u8) -> Result<(), RenderError> {
        self.contrast = level;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        self.draw(&Frame::blank()).map_err(|_| RenderError::NotResponding)
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        let _ = execute!(self.out, Show, LeaveAlternateScreen);
    }
}
