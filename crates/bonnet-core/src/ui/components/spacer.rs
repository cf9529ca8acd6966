// src/ui/components/spacer.rs
//! Fixed reserved space.

use super::Leaf;
use crate::canvas::Canvas;
use crate::ui::geometry::Size;

/// Reserves `space` pixels and draws nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spacer {
    space: Size,
}

impl Spacer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            space: Size::new(width, height),
        }
    }

    pub fn space(&self) -> Size {
        self.space
    }
}

impl Leaf for Spacer {
    fn measure(&self, max_w: u32, max_h: u32) -> Size {
        self.space.min(Size::new(max_w, max_h))
    }

    fn render(&self, _x: i32, _y: i32, _w: u32, _h: u32, _canvas: &mut Canvas) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spacer_clamps_to_max() {
        let spacer = Spacer::new(10, 4);
        assert_eq!(spacer.measure(6, 20), Size::new(6, 4));
        assert_eq!(spacer.measure(100, 100), Size::new(10, 4));
    }
}
