// src/ui/mod.rs
//! Element tree, layout, text and input types.

pub mod components;
pub mod core;
pub mod elements;
pub mod font;
pub mod geometry;
pub mod i18n;
pub mod layouts;

pub use components::{Leaf, Menu, MenuMut, ProgressBar, Spacer, Text};
pub use self::core::{Button, ButtonEvent};
pub use elements::{ElementError, ElementId, ElementKind, ElementResult, UiTree};
pub use font::{Font, FontStyle, Highlight, MonoFontFace, TextSize};
pub use geometry::{BoundingBox, Size};
pub use i18n::LocalizedStr;
pub use layouts::{Align, Gravity, LinearLayout, Orientation, Placement, TableLayout};

/// Width of the reference OLED panel in pixels.
pub const DISPLAY_WIDTH_PX: u32 = 128;
/// Height of the reference OLED panel in pixels.
pub const DISPLAY_HEIGHT_PX: u32 = 64;
