//! SH1106 OLED Display Driver
//!
//! 128x64 panel over I2C. The controller has 132 columns of RAM; the
//! visible window starts at column 2.

use super::frame::{Frame, PAGES};
use super::DisplayPeripheral;
use crate::error::RenderError;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

/// SH1106 commands
#[allow(dead_code)]
mod cmd {
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const SET_CONTRAST: u8 = 0x81;
    pub const SET_NORMAL: u8 = 0xA6;
    pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
    pub const SET_COM_PINS: u8 = 0xDA;
    pub const SET_VCOM_DETECT: u8 = 0xDB;
    pub const SET_CLOCK_DIV: u8 = 0xD5;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_MUX_RATIO: u8 = 0xA8;
    pub const SET_LOW_COLUMN: u8 = 0x00;
    pub const SET_HIGH_COLUMN: u8 = 0x10;
    pub const SET_PAGE_ADDR: u8 = 0xB0;
    pub const SET_START_LINE: u8 = 0x40;
    pub const SET_SEG_REMAP: u8 = 0xA1;
    pub const SET_COM_SCAN_DEC: u8 = 0xC8;
    pub const SET_CHARGE_PUMP: u8 = 0x8D;
}

/// Control bytes
const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;

const COLUMN_OFFSET: u8 = 2;

const INIT_SEQUENCE: &[u8] = &[
    cmd::DISPLAY_OFF,
    cmd::SET_CLOCK_DIV,
    0x80,
    cmd::SET_MUX_RATIO,
    0x3F, // 64 lines
    cmd::SET_DISPLAY_OFFSET,
    0x00,
    cmd::SET_START_LINE,
    cmd::SET_CHARGE_PUMP,
    0x14,
    cmd::SET_SEG_REMAP,
    cmd::SET_COM_SCAN_DEC,
    cmd::SET_COM_PINS,
    0x12,
    cmd::SET_CONTRAST,
    0xCF,
    cmd::SET_PRECHARGE,
    0xF1,
    cmd::SET_VCOM_DETECT,
    0x40,
    cmd::SET_NORMAL,
    cmd::DISPLAY_ON,
];

pub struct Sh1106<I2C> {
    i2c: I2C,
    address: u8,
    /// Cleared after a failed transfer so the next write re-runs init;
    /// a brown-out leaves the controller in its reset state.
    initialized: bool,
}

impl<I2C: I2c> Sh1106<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            initialized: false,
        }
    }

    pub fn init(&mut self) -> Result<(), RenderError> {
        self.commands(INIT_SEQUENCE)?;
        self.initialized = true;
        Ok(())
    }

    fn commands(&mut self, cmds: &[u8]) -> Result<(), RenderError> {
        let mut buf = Vec::with_capacity(cmds.len() + 1);
        buf.push(CONTROL_COMMAND);
        buf.extend_from_slice(cmds);
        self.transfer(&buf)
    }

    fn transfer(&mut self, bytes: &[u8]) -> Result<(), RenderError> {
        self.i2c.write(self.address, bytes).map_err(|e| {
            self.initialized = false;
            classify(e.kind())
        })
    }

    fn ensure_initialized(&mut self) -> Result<(), RenderError> {
        if !self.initialized {
            tracing::debug!(address = self.address, "initializing SH1106");
            self.init()?;
        }
        Ok(())
    }

    fn write_pages(&mut self, pages: &[[u8; 128]; PAGES]) -> Result<(), RenderError> {
        let mut data = [0u8; 129];
        data[0] = CONTROL_DATA;

        for (page, columns) in pages.iter().enumerate() {
            self.commands(&[
                cmd::SET_PAGE_ADDR | page as u8,
                cmd::SET_LOW_COLUMN | COLUMN_OFFSET,
                cmd::SET_HIGH_COLUMN,
            ])?;
            data[1..].copy_from_slice(columns);
            self.transfer(&data)?;
        }
        Ok(())
    }
}

fn classify(kind: ErrorKind) -> RenderError {
    match kind {
        ErrorKind::ArbitrationLoss | ErrorKind::Bus => RenderError::BusBusy,
        _ => RenderError::NotResponding,
    }
}

impl<I2C: I2c + Send> DisplayPeripheral for Sh1106<I2C> {
    fn name(&self) -> &'static str {
        "sh1106"
    }

    fn write(&mut self, frame: &Frame) -> Result<(), RenderError> {
        self.ensure_initialized()?;
        self.write_pages(frame.pages())
    }

    fn set_contrast(&mut self, level: u8) -> Result<(), RenderError> {
        self.ensure_initialized()?;
        self.commands(&[cmd::SET_CONTRAST, level])
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        self.ensure_initialized()?;
        self.write_pages(Frame::blank().pages())?;
        self.commands(&[cmd::DISPLAY_OFF])
    }
}

/// Opens the panel on a Linux I2C bus and runs the init sequence.
#[cfg(feature = "hardware")]
pub fn open(
    bus: &str,
    address: u8,
) -> Result<Sh1106<linux_embedded_hal::I2cdev>, crate::error::InitError> {
    use crate::error::InitError;

    let i2c = linux_embedded_hal::I2cdev::new(bus)
        .map_err(|e| InitError::PeripheralNotFound(format!("{}: {}", bus, e)))?;
    let mut panel = Sh1106::new(i2c, address);
    panel.init().map_err(|e| {
        InitError::PeripheralNotFound(format!("no SH1106 at {:#04x} on {}: {}", address, bus, e))
    })?;

    tracing::info!(%bus, address = %format!("{:#04x}", address), "SH1106 ready");
    Ok(panel)
}
