// src/config.rs
//! Runtime configuration.
//!
//! Every field has a default, so an empty TOML document (or no document at
//! all) yields the 128x64 bonnet layout with A as back and C as the language
//! switch.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ui::{Button, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("display size {width}x{height} has no pixels")]
    EmptyDisplay { width: u32, height: u32 },
    #[error("display height {0} is not a multiple of 8")]
    UnalignedHeight(u32),
    #[error("at least one language is required")]
    NoLanguages,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: DISPLAY_WIDTH_PX,
            height: DISPLAY_HEIGHT_PX,
        }
    }
}

impl DisplayConfig {
    /// Bytes in one packed frame (one bit per pixel, 8-row pages).
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height.div_ceil(8) as usize
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ButtonConfig {
    /// Navigates to the parent screen unless the screen accepts back itself.
    pub back: Button,
    /// Cycles the UI language; never reaches the screen.
    pub language: Option<Button>,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            back: Button::A,
            language: Some(Button::C),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub display: DisplayConfig,
    pub buttons: ButtonConfig,
    pub language_count: usize,
    /// Skip transmitting a frame identical to the previous one.
    pub skip_unchanged_frames: bool,
    pub shutdown_grace_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            buttons: ButtonConfig::default(),
            language_count: 2,
            skip_unchanged_frames: false,
            shutdown_grace_ms: 1000,
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let DisplayConfig { width, height } = self.display;
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyDisplay { width, height });
        }
        if height % 8 != 0 {
            return Err(ConfigError::UnalignedHeight(height));
        }
        if self.language_count == 0 {
            return Err(ConfigError::NoLanguages);
        }
        Ok(())
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
