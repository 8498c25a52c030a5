//! Authoritative player entity

use std::time::Duration;

use uuid::Uuid;

use super::arena::{Rect, SpawnPoint};
use super::input::InputState;
use super::physics::PlayerConfig;

/// Opaque player id, assigned when the connection opens
pub type PlayerId = Uuid;

/// Lives at the start of every round
pub const STARTING_LIVES: u8 = 3;

/// Colours handed out by join order
pub const PALETTE: [&str; 8] = [
    "#FF6B6B", "#4ECDC4", "#FFE66D", "#95E1D3", "#F38181", "#AA96DA", "#FCBAD3", "#A8D8EA",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

/// Player state in the arena (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: &'static str,

    // Kinematics
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub knockback_x: f32,
    pub knockback_y: f32,
    pub facing: Facing,
    pub grounded: bool,
    pub jump_count: u8,

    // Combat
    pub damage: f32,
    pub lives: u8,
    pub kills: u32,
    pub is_charging: bool,
    pub charge_start: Duration,
    pub is_attacking: bool,
    pub attack_timer: Duration,
    pub last_attack_time: Option<Duration>,
    pub last_hit_by: Option<PlayerId>,

    // Input tracking
    pub input: InputState,
    pub last_input: InputState,
}

impl Player {
    pub fn new(id: PlayerId, name: String, color: &'static str, spawn: SpawnPoint) -> Self {
        Self {
            id,
            name,
            color,
            x: spawn.x,
            y: spawn.y,
            vx: 0.0,
            vy: 0.0,
            knockback_x: 0.0,
            knockback_y: 0.0,
            facing: Facing::Right,
            grounded: false,
            jump_count: 0,
            damage: 0.0,
            lives: STARTING_LIVES,
            kills: 0,
            is_charging: false,
            charge_start: Duration::ZERO,
            is_attacking: false,
            attack_timer: Duration::ZERO,
            last_attack_time: None,
            last_hit_by: None,
            input: InputState::default(),
            last_input: InputState::default(),
        }
    }

    /// Still has lives left this round
    pub fn is_alive(&self) -> bool {
        self.lives > 0
    }

    pub fn bounds(&self, config: &PlayerConfig) -> Rect {
        Rect::new(self.x, self.y, config.width, config.height)
    }

    /// Back to the state of a freshly joined player, keeping identity
    pub fn reset(&mut self, spawn: SpawnPoint) {
        *self = Self::new(self.id, std::mem::take(&mut self.name), self.color, spawn);
    }

    /// Return to the arena after losing a life. Lives, kills and input
    /// survive; damage does not.
    pub fn respawn(&mut self, spawn: SpawnPoint) {
        self.x = spawn.x;
        self.y = spawn.y;
        self.vx = 0.0;
        self.vy = 0.0;
        self.knockback_x = 0.0;
        self.knockback_y = 0.0;
        self.grounded = false;
        self.jump_count = 0;
        self.damage = 0.0;
        self.is_attacking = false;
        self.attack_timer = Duration::ZERO;
        self.is_charging = false;
    }

    /// Out of lives: stop every motion and swing so the frozen snapshot
    /// shows a resting player.
    pub fn eliminate(&mut self) {
        self.vx = 0.0;
        self.vy = 0.0;
        self.knockback_x = 0.0;
        self.knockback_y = 0.0;
        self.is_attacking = false;
        self.attack_timer = Duration::ZERO;
        self.is_charging = false;
    }
}
