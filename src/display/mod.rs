//! Rendering a [`ViewModel`] onto whatever panel is attached 🖥️

pub mod frame;
pub mod sh1106;
pub mod terminal;
pub mod view;

pub use frame::Frame;
pub use view::{Screen, ViewModel};

use crate::app::config::{DisplayBackend, DisplayConfig};
use crate::error::{InitError, RenderError};
use std::ops::{Deref, DerefMut};

/// A panel that takes whole frames.
pub trait DisplayPeripheral: Send {
    fn name(&self) -> &'static str;

    /// Claims the bus for one render. Shared buses override this.
    fn acquire(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    fn release(&mut self) {}

    fn write(&mut self, frame: &Frame) -> Result<(), RenderError>;

    fn set_contrast(&mut self, level: u8) -> Result<(), RenderError>;

    /// Blank the panel.
    fn clear(&mut self) -> Result<(), RenderError>;
}

/// Holds the bus for the duration of one render and gives it back on drop,
/// including when a write fails halfway.
pub struct BusGuard<'a> {
    peripheral: &'a mut dyn DisplayPeripheral,
}

impl<'a> BusGuard<'a> {
    pub fn acquire(peripheral: &'a mut dyn DisplayPeripheral) -> Result<Self, RenderError> {
        peripheral.acquire()?;
        Ok(Self { peripheral })
    }
}

impl<'a> Deref for BusGuard<'a> {
    type Target = dyn DisplayPeripheral + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.peripheral
    }
}

impl<'a> DerefMut for BusGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.peripheral
    }
}

impl Drop for BusGuard<'_> {
    fn drop(&mut self) {
        self.peripheral.release();
    }
}

pub struct DisplayRenderer {
    peripheral: Box<dyn DisplayPeripheral>,
    retries: u8,
    /// Last contrast the panel accepted.
    contrast: Option<u8>,
}

impl DisplayRenderer {
    pub fn new(peripheral: Box<dyn DisplayPeripheral>, retries: u8) -> Self {
        Self {
            peripheral,
            retries,
            contrast: None,
        }
    }

    /// Opens the configured backend.
    pub fn open(config: &DisplayConfig) -> Result<Self, InitError> {
        let peripheral: Box<dyn DisplayPeripheral> = match config.backend {
            #[cfg(feature = "hardware")]
            DisplayBackend::Sh1106 => Box::new(sh1106::open(&config.i2c_bus, config.address)?),
            #[cfg(not(feature = "hardware"))]
            DisplayBackend::Sh1106 => {
                return Err(InitError::MissingDependency(
                    "SH1106 display requested but this build lacks the `hardware` feature"
                        .to_string(),
                ))
            }
            DisplayBackend::Terminal => Box::new(terminal::TerminalDisplay::open()?),
        };
        Ok(Self::new(peripheral, config.render_retries))
    }

    pub fn name(&self) -> &'static str {
        self.peripheral.name()
    }

    /// Rasterizes and writes `view`, retrying up to `retries` extra times.
    pub fn render(&mut self, view: &ViewModel) -> Result<(), RenderError> {
        let frame = Frame::render(view);
        let mut attempt = 0;

        loop {
            match self.push(&frame, view.contrast) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    tracing::debug!(error = %e, attempt, "render failed, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn push(&mut self, frame: &Frame, contrast: u8) -> Result<(), RenderError> {
        let mut bus = BusGuard::acquire(self.peripheral.as_mut())?;
        if self.contrast != Some(contrast) {
            // forget it until the panel confirms, a failed write may leave it anywhere
            self.contrast = None;
            bus.set_contrast(contrast)?;
            self.contrast = Some(contrast);
        }
        bus.write(frame)
    }

    pub fn clear(&mut self) -> Result<(), RenderError> {
        let mut bus = BusGuard::acquire(self.peripheral.as_mut())?;
        bus.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Log {
        events: Vec<&'static str>,
        failures_left: u32,
        busy: bool,
    }

    struct Flaky(Arc<Mutex<Log>>);

    impl DisplayPeripheral for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn acquire(&mut self) -> Result<(), RenderError> {
            let mut log = self.0.lock().unwrap();
            if log.busy {
                return Err(RenderError::BusBusy);
            }
            log.events.push("acquire");
            Ok(())
        }

        fn release(&mut self) {
            self.0.lock().unwrap().events.push("release");
        }

        fn write(&mut self, _frame: &Frame) -> Result<(), RenderError> {
            let mut log = self.0.lock().unwrap();
            if log.failures_left > 0 {
                log.failures_left -= 1;
                log.events.push("write-failed");
                return Err(RenderError::NotResponding);
            }
            log.events.push("write");
            Ok(())
        }

        fn set_contrast(&mut self, _level: u8) -> Result<(), RenderError> {
            self.0.lock().unwrap().events.push("contrast");
            Ok(())
        }

        fn clear(&mut self) -> Result<(), RenderError> {
            self.0.lock().unwrap().events.push("clear");
            Ok(())
        }
    }

    fn renderer(failures: u32) -> (DisplayRenderer, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log {
            failures_left: failures,
            ..Log::default()
        }));
        (DisplayRenderer::new(Box::new(Flaky(log.clone())), 2), log)
    }

    #[test]
    fn test_guard_releases_after_failed_write() {
        let (mut r, log) = renderer(1);
        r.render(&ViewModel::boot()).unwrap();

        assert_eq!(
            log.lock().unwrap().events,
            vec!["acquire", "contrast", "write-failed", "release", "acquire", "write", "release"]
        );
    }

    #[test]
    fn test_gives_up_after_retries() {
        let (mut r, log) = renderer(10);
        assert_eq!(r.render(&ViewModel::boot()), Err(RenderError::NotResponding));

        let log = log.lock().unwrap();
        assert_eq!(log.events.iter().filter(|e| **e == "write-failed").count(), 3);
        assert_eq!(
            log.events.iter().filter(|e| **e == "acquire").count(),
            log.events.iter().filter(|e| **e == "release").count()
        );
    }

    #[test]
    fn test_guard_derefs_to_the_panel() {
        let log = Arc::new(Mutex::new(Log::default()));
        let mut panel = Flaky(log.clone());
        {
            let mut bus = BusGuard::acquire(&mut panel).unwrap();
            assert_eq!(bus.name(), "flaky");
            bus.clear().unwrap();
        }
        assert_eq!(log.lock().unwrap().events, vec!["acquire", "clear", "release"]);
    }

    #[test]
    fn test_busy_bus_is_reported() {
        let (mut r, log) = renderer(0);
        log.lock().unwrap().busy = true;
        assert_eq!(r.render(&ViewModel::boot()), Err(RenderError::BusBusy));
        assert!(log.lock().unwrap().events.is_empty());
    }

    #[test]
    fn test_contrast_sent_only_on_change() {
        let (mut r, log) = renderer(0);
        r.render(&ViewModel::boot().with_contrast(40)).unwrap();
        r.render(&ViewModel::boot().with_contrast(40)).unwrap();
        r.render(&ViewModel::boot().with_contrast(180)).unwrap();

        let contrast_writes = log
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| **e == "contrast")
            .count();
        assert_eq!(contrast_writes, 2);
    }
}
