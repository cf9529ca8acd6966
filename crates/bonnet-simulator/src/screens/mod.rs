//! Demo screen hierarchy: a root menu leading to two endings.

mod blue_pill;
mod red_pill;
mod root;
mod strings;

pub use blue_pill::BluePillScreen;
pub use red_pill::RedPillScreen;
pub use root::RootScreen;
