// src/screens/mod.rs
//! Screen lifecycle, navigation and the render loop.

mod manager;
mod repaint;
mod screen;

pub use manager::{RuntimeError, ScreenManager};
pub use screen::{Screen, ScreenContext, ScreenHandle};
