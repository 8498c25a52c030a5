//! Player input record and edge detection

use serde::{Deserialize, Serialize};

/// Latest button state reported by a client. Replaced wholesale on every
/// `input` message; missing buttons read as released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub attack: bool,
    pub jump: bool,
}

/// Button transitions between two consecutive ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputEdges {
    pub jump_pressed: bool,
    pub attack_pressed: bool,
    pub attack_released: bool,
}

impl InputEdges {
    pub fn detect(previous: InputState, current: InputState) -> Self {
        Self {
            jump_pressed: current.jump && !previous.jump,
            attack_pressed: current.attack && !previous.attack,
            attack_released: !current.attack && previous.attack,
        }
    }
}
