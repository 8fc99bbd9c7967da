//! 1-bpp frame buffer laid out the way the SH1106 wants it: eight pages of
//! 128 columns, one byte per column holding eight vertical pixels (LSB on top).

use super::view::{Align, Bar, Font, TextLine, ViewModel, HEIGHT, MARQUEE_GAP, WIDTH};
use embedded_graphics::mono_font::iso_8859_2::{FONT_10X20, FONT_6X10, FONT_7X14};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use std::convert::Infallible;

pub const PAGES: usize = (HEIGHT / 8) as usize;
const COLUMNS: usize = WIDTH as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pages: [[u8; COLUMNS]; PAGES],
}

impl Default for Frame {
    fn default() -> Self {
        Self::blank()
    }
}

impl Frame {
    pub fn blank() -> Self {
        Self {
            pages: [[0; COLUMNS]; PAGES],
        }
    }

    /// Rasterizes a view. Same view in, same bytes out.
    pub fn render(view: &ViewModel) -> Self {
        let mut frame = Self::blank();
        let offset = Point::new(i32::from(view.shift), i32::from(view.shift));
        let mut target = frame.translated(offset);

        for line in &view.lines {
            draw_line(&mut target, line);
        }
        if let Some(bar) = &view.bar {
            draw_bar(&mut target, bar);
        }

        frame
    }

    pub fn pages(&self) -> &[[u8; COLUMNS]; PAGES] {
        &self.pages
    }

    pub fn pixel(&self, x: u32, y: u32) -> bool {
        if x >= WIDTH || y >= HEIGHT {
            return false;
        }
        self.pages[(y / 8) as usize][x as usize] & (1 << (y % 8)) != 0
    }

    pub fn lit_pixels(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|page| page.iter())
            .map(|byte| byte.count_ones() as usize)
            .sum()
    }

    fn set_pixel(&mut self, x: i32, y: i32, on: bool) {
        if x < 0 || y < 0 || x >= WIDTH as i32 || y >= HEIGHT as i32 {
            return;
        }
        let bit = 1u8 << (y % 8);
        let byte = &mut self.pages[(y / 8) as usize][x as usize];
        if on {
            *byte |= bit;
        } else {
            *byte &= !bit;
        }
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl DrawTarget for Frame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, color.is_on());
        }
        Ok(())
    }
}

fn mono_font(font: Font) -> &'static MonoFont<'static> {
    match font {
        Font::Small => &FONT_6X10,
        Font::Medium => &FONT_7X14,
        Font::Large => &FONT_10X20,
    }
}

fn text_style(font: Font, color: BinaryColor) -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(mono_font(font))
        .text_color(color)
        .build()
}

fn draw_line<D>(target: &mut D, line: &TextLine)
where
    D: DrawTarget<Color = BinaryColor, Error = Infallible>,
{
    let mut color = BinaryColor::On;
    if line.inverted {
        let _ = Rectangle::new(Point::new(0, line.y), Size::new(WIDTH, line.font.height()))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(target);
        color = BinaryColor::Off;
    }

    let style = text_style(line.font, color);
    let width = line.font.text_width(&line.text);

    match line.scroll {
        Some(offset) => {
            let x = -(offset as i32);
            let period = (width + MARQUEE_GAP) as i32;
            let _ = Text::with_baseline(&line.text, Point::new(x, line.y), style, Baseline::Top)
                .draw(target);
            let _ = Text::with_baseline(
                &line.text,
                Point::new(x + period, line.y),
                style,
                Baseline::Top,
            )
            .draw(target);
        }
        None => {
            let x = match line.align {
                Align::Left => 0,
                Align::Center => (WIDTH.saturating_sub(width) / 2) as i32,
            };
            let _ = Text::with_baseline(&line.text, Point::new(x, line.y), style, Baseline::Top)
                .draw(target);
        }
    }
}

fn draw_bar<D>(target: &mut D, bar: &Bar)
where
    D: DrawTarget<Color = BinaryColor, Error = Infallible>,
{
    if bar.outline {
        let _ = Rectangle::new(Point::new(bar.x, bar.y), Size::new(bar.width, bar.height))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(target);
    }

    let filled = bar.filled_width();
    if filled > 0 {
        let _ = Rectangle::new(Point::new(bar.x, bar.y), Size::new(filled, bar.height))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(target);
    }
}
