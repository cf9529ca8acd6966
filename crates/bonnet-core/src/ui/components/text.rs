// src/ui/components/text.rs
//! Text element: a localized string drawn with a font style.

use embedded_graphics::prelude::Point;

use super::Leaf;
use crate::canvas::{Canvas, ClippedCanvas};
use crate::ui::font::{FontStyle, Highlight};
use crate::ui::geometry::Size;
use crate::ui::i18n::LocalizedStr;

/// Single run of text.
///
/// The string is resolved against the process-wide language at measure and
/// render time, so a language switch only needs a repaint.
#[derive(Debug, Clone)]
pub struct Text {
    style: FontStyle,
    text: LocalizedStr,
}

impl Text {
    pub fn new(style: FontStyle, text: impl Into<LocalizedStr>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }

    pub fn text(&self) -> &LocalizedStr {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<LocalizedStr>) {
        self.text = text.into();
    }

    pub fn style(&self) -> &FontStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: FontStyle) {
        self.style = style;
    }

    pub fn highlight(&self) -> Highlight {
        self.style.highlight
    }

    pub fn set_highlight(&mut self, highlight: Highlight) {
        self.style.highlight = highlight;
    }
}

impl Leaf for Text {
    fn measure(&self, max_w: u32, max_h: u32) -> Size {
        self.style
            .face
            .measure(self.text.current())
            .min(Size::new(max_w, max_h))
    }

    fn render(&self, x: i32, y: i32, w: u32, h: u32, canvas: &mut Canvas) {
        {
            let mut window = ClippedCanvas::new(canvas, x, y, w, h)
                .with_halo(self.style.highlight == Highlight::Halo);
            self.style.face.draw(
                self.text.current(),
                Point::new(x, y),
                self.style.color(),
                &mut window,
            );
        }
        if self.style.highlight == Highlight::Block {
            canvas.invert_block(x, y, w, h);
        }
    }
}
