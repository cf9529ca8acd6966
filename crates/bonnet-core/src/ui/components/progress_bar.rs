// src/ui/components/progress_bar.rs
//! Horizontal progress bar.

use super::Leaf;
use crate::canvas::Canvas;
use crate::ui::geometry::Size;

/// Bar filled to `numerator / denominator` of its width.
///
/// Bars wider than 5 and taller than 2 pixels get a one-pixel outline with the
/// fill inside it; smaller bars are drawn as a solid strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressBar {
    expected: Size,
    numerator: u32,
    denominator: u32,
}

impl ProgressBar {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            expected: Size::new(width, height),
            numerator: 0,
            denominator: 1,
        }
    }

    /// Set progress. The denominator is raised to at least 1 and the
    /// numerator clamped to `0..=denominator`.
    pub fn set_progress(&mut self, numerator: u32, denominator: u32) {
        self.denominator = denominator.max(1);
        self.numerator = numerator.min(self.denominator);
    }

    pub fn progress(&self) -> (u32, u32) {
        (self.numerator, self.denominator)
    }

    pub fn is_complete(&self) -> bool {
        self.numerator == self.denominator
    }

    fn filled(&self, span: u32) -> u32 {
        (u64::from(self.numerator) * u64::from(span) / u64::from(self.denominator)) as u32
    }
}

impl Leaf for ProgressBar {
    fn measure(&self, max_w: u32, max_h: u32) -> Size {
        self.expected.min(Size::new(max_w, max_h))
    }

    fn render(&self, x: i32, y: i32, w: u32, h: u32, canvas: &mut Canvas) {
        if w > 5 && h > 2 {
            canvas.fill_rect(x, y, w, h, true);
            let inner = w - 2;
            let filled = self.filled(inner);
            canvas.fill_rect(x + 1 + filled as i32, y + 1, inner - filled, h - 2, false);
        } else {
            canvas.fill_rect(x, y, self.filled(w), h, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_progress_clamps() {
        let mut bar = ProgressBar::new(20, 5);
        bar.set_progress(7, 0);
        assert_eq!(bar.progress(), (1, 1));
        assert!(bar.is_complete());
        bar.set_progress(3, 10);
        assert_eq!(bar.progress(), (3, 10));
        assert!(!bar.is_complete());
    }

    #[test]
    fn test_outlined_bar_fill() {
        let mut bar = ProgressBar::new(12, 4);
        bar.set_progress(1, 2);
        let mut canvas = Canvas::new(16, 8);
        bar.render(0, 0, 12, 4, &mut canvas);
        // outline
        assert!(canvas.is_lit(0, 0));
        assert!(canvas.is_lit(11, 3));
        // inner span is 10, half filled
        assert!(canvas.is_lit(5, 1));
        assert!(!canvas.is_lit(6, 1));
        assert!(!canvas.is_lit(10, 2));
        assert!(canvas.is_lit(11, 1));
    }

    #[test]
    fn test_small_bar_is_solid() {
        let mut bar = ProgressBar::new(4, 2);
        bar.set_progress(1, 2);
        let mut canvas = Canvas::new(8, 8);
        bar.render(0, 0, 4, 2, &mut canvas);
        assert!(canvas.is_lit(1, 1));
        assert!(!canvas.is_lit(2, 0));
    }
}
