//! What goes on the panel, independent of how it gets there.
//!
//! A `ViewModel` is rebuilt every cycle and compared structurally with the
//! previous one; only a changed view is rasterized and written out.

use crate::player::StatusSnapshot;
use chrono::NaiveDateTime;

pub const WIDTH: u32 = 128;
pub const HEIGHT: u32 = 64;

/// Space between the end of a scrolling line and its repeat.
pub const MARQUEE_GAP: u32 = 20;
/// Pixels a marquee advances per scroll step.
pub const MARQUEE_STEP: u32 = 1;

const BAR_X: i32 = 30;
const BAR_WIDTH: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Boot,
    Clock,
    NowPlaying,
    Volume,
    Menu,
    Error,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    /// 6x10, status lines
    Small,
    /// 7x14, artist and title
    Medium,
    /// 10x20, clock and volume
    Large,
}

impl Font {
    pub fn char_width(self) -> u32 {
        match self {
            Font::Small => 6,
            Font::Medium => 7,
            Font::Large => 10,
        }
    }

    pub fn height(self) -> u32 {
        match self {
            Font::Small => 10,
            Font::Medium => 14,
            Font::Large => 20,
        }
    }

    pub fn text_width(self, text: &str) -> u32 {
        text.chars().count() as u32 * self.char_width()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub text: String,
    /// Top edge in pixels.
    pub y: i32,
    pub font: Font,
    pub align: Align,
    /// Marquee offset in pixels; `None` for text that fits.
    pub scroll: Option<u32>,
    /// Drawn dark on a lit row (menu selection).
    pub inverted: bool,
}

impl TextLine {
    pub fn new(text: impl Into<String>, y: i32, font: Font) -> Self {
        Self {
            text: text.into(),
            y,
            font,
            align: Align::Left,
            scroll: None,
            inverted: false,
        }
    }

    pub fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }

    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    /// Turns on the marquee if the text is wider than the panel.
    pub fn marquee(mut self, steps: u64) -> Self {
        let width = self.font.text_width(&self.text);
        if width > WIDTH {
            let period = u64::from(width + MARQUEE_GAP);
            self.scroll = Some(((steps * u64::from(MARQUEE_STEP)) % period) as u32);
        }
        self
    }
}

/// Horizontal level bar. Only the filled part is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub percent: u8,
    pub outline: bool,
}

impl Bar {
    pub fn filled_width(&self) -> u32 {
        self.width * u32::from(self.percent.min(100)) / 100
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub screen: Screen,
    pub lines: Vec<TextLine>,
    pub bar: Option<Bar>,
    pub contrast: u8,
    /// Burn-in offset applied to both axes, 0..4.
    pub shift: u8,
}

impl ViewModel {
    fn new(screen: Screen, lines: Vec<TextLine>) -> Self {
        Self {
            screen,
            lines,
            bar: None,
            contrast: 0xCF,
            shift: 0,
        }
    }

    pub fn with_contrast(mut self, contrast: u8) -> Self {
        self.contrast = contrast;
        self
    }

    pub fn with_shift(mut self, shift: u8) -> Self {
        self.shift = shift % 4;
        self
    }

    pub fn boot() -> Self {
        Self::new(
            Screen::Boot,
            vec![
                TextLine::new("moOde", 14, Font::Large).centered(),
                TextLine::new("starting...", 44, Font::Small).centered(),
            ],
        )
    }

    /// Big `HH:MM` with a blinking colon, date underneath.
    pub fn clock(wall: NaiveDateTime, colon_on: bool) -> Self {
        let separator = if colon_on { ":" } else { " " };
        let time = format!("{}{}{}", wall.format("%H"), separator, wall.format("%M"));
        Self::new(
            Screen::Clock,
            vec![
                TextLine::new(time, 12, Font::Large).centered(),
                TextLine::new(wall.format("%Y-%m-%d").to_string(), 50, Font::Small).centered(),
            ],
        )
    }

    /// Artist, title, volume bar and date/time. Long lines scroll.
    pub fn now_playing(
        snapshot: &StatusSnapshot,
        volume: u8,
        wall: NaiveDateTime,
        scroll_steps: u64,
    ) -> Self {
        if !snapshot.has_metadata() {
            return Self::no_data(volume, wall);
        }

        let mut lines = Vec::with_capacity(4);
        if !snapshot.artist.is_empty() {
            lines.push(TextLine::new(snapshot.artist.clone(), 0, Font::Medium).marquee(scroll_steps));
        }
        if !snapshot.track_title.is_empty() {
            lines.push(
                TextLine::new(snapshot.track_title.clone(), 18, Font::Medium).marquee(scroll_steps),
            );
        }
        lines.push(TextLine::new("VOL", 36, Font::Small));
        lines.push(TextLine::new(wall.format("%Y-%m-%d %H:%M").to_string(), 50, Font::Small));

        let mut view = Self::new(Screen::NowPlaying, lines);
        view.bar = Some(Self::volume_strip(volume));
        view
    }

    /// Playing, but nothing usable to show about the track.
    pub fn no_data(volume: u8, wall: NaiveDateTime) -> Self {
        let mut view = Self::new(
            Screen::NoData,
            vec![
                TextLine::new("no data", 8, Font::Medium).centered(),
                TextLine::new("VOL", 36, Font::Small),
                TextLine::new(wall.format("%Y-%m-%d %H:%M").to_string(), 50, Font::Small),
            ],
        );
        view.bar = Some(Self::volume_strip(volume));
        view
    }

    pub fn volume(percent: u8) -> Self {
        let mut view = Self::new(
            Screen::Volume,
            vec![
                TextLine::new("Volume", 0, Font::Small).centered(),
                TextLine::new(format!("{}%", percent), 14, Font::Large).centered(),
            ],
        );
        view.bar = Some(Bar {
            x: 4,
            y: 44,
            width: WIDTH - 8,
            height: 10,
            percent,
            outline: true,
        });
        view
    }

    pub fn menu(items: &[&str], selected: usize) -> Self {
        let mut lines = vec![TextLine::new("Menu", 0, Font::Small).centered()];
        for (i, item) in items.iter().take(3).enumerate() {
            let line = TextLine::new(format!(" {}", item), 16 + 14 * i as i32, Font::Small);
            lines.push(if i == selected { line.inverted() } else { line });
        }
        Self::new(Screen::Menu, lines)
    }

    pub fn error(detail: &str) -> Self {
        let detail: String = detail.chars().take((WIDTH / Font::Small.char_width()) as usize).collect();
        Self::new(
            Screen::Error,
            vec![
                TextLine::new("Player offline", 6, Font::Medium).centered(),
                TextLine::new(detail, 30, Font::Small).centered(),
                TextLine::new("press to retry", 50, Font::Small).centered(),
            ],
        )
    }

    fn volume_strip(percent: u8) -> Bar {
        Bar {
            x: BAR_X,
            y: 40,
            width: BAR_WIDTH,
            height: 4,
            percent,
            outline: false,
        }
    }
}
