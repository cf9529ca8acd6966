// src/ui/components/mod.rs
//! Leaf elements and the menu.
//!
//! Leaves implement [`Leaf`]; the element arena dispatches to it for the
//! `Text`, `Spacer` and `ProgressBar` variants. The menu is a composite that
//! owns a linear layout node, so it is driven through
//! [`MenuMut`](menu::MenuMut) instead.

pub mod menu;
pub mod progress_bar;
pub mod spacer;
pub mod text;

pub use menu::{Menu, MenuMut};
pub use progress_bar::ProgressBar;
pub use spacer::Spacer;
pub use text::Text;

use crate::canvas::Canvas;
use crate::ui::geometry::Size;

/// Measure/render contract for elements without children.
pub trait Leaf {
    /// Natural size, clamped to `max_w x max_h`.
    fn measure(&self, max_w: u32, max_h: u32) -> Size;

    /// Draw inside the `w x h` window anchored at `(x, y)`.
    fn render(&self, x: i32, y: i32, w: u32, h: u32, canvas: &mut Canvas);
}
