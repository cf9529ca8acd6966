// src/ui/core.rs
//! Input vocabulary shared by the screen machinery and button sources.

use serde::{Deserialize, Serialize};

/// Physical buttons on the display bonnet.
///
/// `A`, `B` and `C` are the face buttons; the rest form the joystick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    A,
    B,
    C,
    Up,
    Down,
    Left,
    Right,
}

impl Button {
    pub const ALL: [Button; 7] = [
        Button::A,
        Button::B,
        Button::C,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
    ];

    /// Single-letter key used by text-driven button sources.
    pub fn from_key(key: char) -> Option<Button> {
        match key.to_ascii_lowercase() {
            'a' => Some(Button::A),
            'b' => Some(Button::B),
            'c' => Some(Button::C),
            'u' => Some(Button::Up),
            'd' => Some(Button::Down),
            'l' => Some(Button::Left),
            'r' => Some(Button::Right),
            _ => None,
        }
    }
}

/// Edge-triggered press or release of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: Button,
    pub pressed: bool,
}

impl ButtonEvent {
    pub fn press(button: Button) -> Self {
        Self {
            button,
            pressed: true,
        }
    }

    pub fn release(button: Button) -> Self {
        Self {
            button,
            pressed: false,
        }
    }
}
