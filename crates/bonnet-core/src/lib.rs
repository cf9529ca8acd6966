//! Hardware-independent core of the bonnet UI runtime.
//!
//! This crate drives a small monochrome OLED panel from a handful of buttons:
//! a retained element tree measured and rendered into a [`Canvas`], screens
//! with their own background executors, and a render loop that coalesces
//! repaint requests and hands packed frames to a [`DisplayTransport`].
//!
//! The panel, the button source and the font data stay behind traits so the
//! same code runs on a board and in the desktop simulator.

pub mod canvas;
pub mod config;
pub mod display;
pub mod screens;
pub mod tasks;
pub mod ui;

pub use canvas::{Canvas, CanvasPool, ClippedCanvas};
pub use config::{ButtonConfig, ConfigError, DisplayConfig, RuntimeConfig};
pub use display::{DisplayTransport, FrameSink, MemoryTransport};
pub use screens::{RuntimeError, Screen, ScreenContext, ScreenHandle, ScreenManager};
pub use tasks::{BoxError, CancelToken, ExecutorRegistry, Interrupted, TaskError, TaskExecutor, TaskResult};
