// src/ui/font.rs
//! Font collaborator contract and text styling.
//!
//! Text elements never touch glyph data directly. They go through the
//! two-operation [`Font`] trait (measure a string, draw a string), which keeps
//! font storage and parsing outside the layout engine. [`MonoFontFace`] adapts
//! any `embedded-graphics` mono font to that contract.

use std::fmt;
use std::sync::Arc;

use embedded_graphics::Drawable as EgDrawable;
use embedded_graphics::geometry::Dimensions;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle, ascii};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::Point;
use embedded_graphics::text::{Baseline, Text as EgText};

use crate::canvas::ClippedCanvas;
use crate::ui::geometry::Size;

/// Measure-and-draw capability a text element depends on.
pub trait Font: Send + Sync {
    /// Size of the box `text` occupies when drawn.
    fn measure(&self, text: &str) -> Size;

    /// Draw `text` with its top-left corner at `origin`.
    fn draw(&self, text: &str, origin: Point, color: BinaryColor, target: &mut ClippedCanvas<'_>);
}

/// Text size presets backed by the built-in ASCII mono fonts.
///
/// - `Small`: 5x8 font
/// - `Medium`: 6x10 font (default)
/// - `Large`: 10x20 font
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl TextSize {
    pub fn font(&self) -> &'static MonoFont<'static> {
        match self {
            TextSize::Small => &ascii::FONT_5X8,
            TextSize::Medium => &ascii::FONT_6X10,
            TextSize::Large => &ascii::FONT_10X20,
        }
    }

    pub fn face(&self) -> Arc<dyn Font> {
        Arc::new(MonoFontFace::new(self.font()))
    }
}

/// [`Font`] implementation over an `embedded-graphics` mono font.
#[derive(Clone, Copy)]
pub struct MonoFontFace {
    font: &'static MonoFont<'static>,
}

impl MonoFontFace {
    pub fn new(font: &'static MonoFont<'static>) -> Self {
        Self { font }
    }

    fn layout<'t>(&self, text: &'t str, origin: Point, color: BinaryColor) -> EgText<'t, MonoTextStyle<'static, BinaryColor>> {
        EgText::with_baseline(text, origin, MonoTextStyle::new(self.font, color), Baseline::Top)
    }
}

impl Font for MonoFontFace {
    fn measure(&self, text: &str) -> Size {
        if text.is_empty() {
            return Size::ZERO;
        }
        self.layout(text, Point::zero(), BinaryColor::On)
            .bounding_box()
            .size
            .into()
    }

    fn draw(&self, text: &str, origin: Point, color: BinaryColor, target: &mut ClippedCanvas<'_>) {
        // ClippedCanvas is infallible
        let _ = self.layout(text, origin, color).draw(target);
    }
}

/// How a text element marks itself as selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Highlight {
    #[default]
    None,
    /// Invert a one-pixel ring around every lit glyph pixel.
    Halo,
    /// Invert the whole text box plus a one-pixel margin.
    Block,
}

/// Font plus drawing options for a text element.
#[derive(Clone)]
pub struct FontStyle {
    pub face: Arc<dyn Font>,
    pub draw_white: bool,
    pub highlight: Highlight,
}

impl FontStyle {
    pub fn new(face: Arc<dyn Font>) -> Self {
        Self {
            face,
            draw_white: true,
            highlight: Highlight::None,
        }
    }

    pub fn sized(size: TextSize) -> Self {
        Self::new(size.face())
    }

    pub fn with_highlight(mut self, highlight: Highlight) -> Self {
        self.highlight = highlight;
        self
    }

    /// Draw dark glyphs instead of lit ones.
    pub fn with_draw_white(mut self, draw_white: bool) -> Self {
        self.draw_white = draw_white;
        self
    }

    pub fn color(&self) -> BinaryColor {
        if self.draw_white {
            BinaryColor::On
        } else {
            BinaryColor::Off
        }
    }
}

impl Default for FontStyle {
    fn default() -> Self {
        Self::sized(TextSize::default())
    }
}

impl fmt::Debug for FontStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontStyle")
            .field("draw_white", &self.draw_white)
            .field("highlight", &self.highlight)
            .finish_non_exhaustive()
    }
}

/// Deterministic fixed-cell font for layout tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Every character is a solid `cell_w x cell_h` block.
    pub(crate) struct BlockFont {
        pub cell_w: u32,
        pub cell_h: u32,
    }

    impl Font for BlockFont {
        fn measure(&self, text: &str) -> Size {
            let chars = text.chars().count() as u32;
            if chars == 0 {
                return Size::ZERO;
            }
            Size::new(chars * self.cell_w, self.cell_h)
        }

        fn draw(&self, text: &str, origin: Point, color: BinaryColor, target: &mut ClippedCanvas<'_>) {
            use embedded_graphics::Pixel;
            use embedded_graphics::draw_target::DrawTarget;
            let size = self.measure(text);
            let pixels = (0..size.height as i32).flat_map(move |dy| {
                (0..size.width as i32)
                    .map(move |dx| Pixel(Point::new(origin.x + dx, origin.y + dy), color))
            });
            let _ = target.draw_iter(pixels);
        }
    }

    pub(crate) fn block_style(cell_w: u32, cell_h: u32) -> FontStyle {
        FontStyle::new(Arc::new(BlockFont { cell_w, cell_h }))
    }
}
