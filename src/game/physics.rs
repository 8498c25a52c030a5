//! Player physics and movement constraints

use std::time::Duration;

use serde::Serialize;

use super::arena::Arena;
use super::input::InputEdges;
use super::player::{Facing, Player};

/// Horizontal speeds below this snap to zero
pub const SPEED_EPSILON: f32 = 0.01;
/// Knockback components below this snap to zero
pub const KNOCKBACK_EPSILON: f32 = 0.1;
/// How far below a platform top a falling player may be and still land
pub const LANDING_TOLERANCE: f32 = 20.0;

/// Tunable player constants, shared with clients in the `init` message.
/// Velocities are in units per tick, durations in milliseconds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
    pub width: f32,
    pub height: f32,
    /// Maximum horizontal speed
    pub speed: f32,
    /// Vertical impulse applied on jump (negative is up)
    pub jump_force: f32,
    pub gravity: f32,
    /// Horizontal velocity decay while grounded
    pub friction: f32,
    /// Horizontal velocity decay while airborne
    pub air_friction: f32,
    pub max_fall_speed: f32,
    pub knockback_decay: f32,
    pub attack_cooldown: u64,
    pub attack_range: f32,
    pub attack_knockback: f32,
    pub attack_damage: f32,
    pub charge_attack_multiplier: f32,
    pub max_charge: u64,
    pub max_jumps: u8,
    /// How long `isAttacking` stays set after a swing
    pub attack_duration: u64,
    /// Fraction of `speed` added per tick while a direction is held
    pub acceleration_factor: f32,
    /// Extra gravity fraction while fast-falling
    pub fast_fall_factor: f32,
    /// Scale applied to the vertical knockback component
    pub knockback_lift: f32,
}

impl PlayerConfig {
    pub fn attack_cooldown(&self) -> Duration {
        Duration::from_millis(self.attack_cooldown)
    }

    pub fn max_charge(&self) -> Duration {
        Duration::from_millis(self.max_charge)
    }

    pub fn attack_duration(&self) -> Duration {
        Duration::from_millis(self.attack_duration)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            width: 50.0,
            height: 70.0,
            speed: 8.0,
            jump_force: -18.0,
            gravity: 0.8,
            friction: 0.85,
            air_friction: 0.95,
            max_fall_speed: 20.0,
            knockback_decay: 0.92,
            attack_cooldown: 400,
            attack_range: 80.0,
            attack_knockback: 15.0,
            attack_damage: 10.0,
            charge_attack_multiplier: 2.5,
            max_charge: 1000,
            max_jumps: 2,
            attack_duration: 200,
            acceleration_factor: 0.15,
            fast_fall_factor: 0.5,
            knockback_lift: 0.8,
        }
    }
}

/// A charge attack released this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackRelease {
    /// How long the attack button was held
    pub charge: Duration,
}

/// Physics system for advancing players one tick
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Apply this tick's input: run, jump, fast-fall and charge handling.
    /// Returns the release when a held charge attack was let go.
    pub fn apply_controls(
        player: &mut Player,
        edges: InputEdges,
        config: &PlayerConfig,
        now: Duration,
    ) -> Option<AttackRelease> {
        let input = player.input;
        let acceleration = config.speed * config.acceleration_factor;

        if input.left {
            player.vx -= acceleration;
            player.facing = Facing::Left;
        }
        if input.right {
            player.vx += acceleration;
            player.facing = Facing::Right;
        }

        if edges.jump_pressed && (player.grounded || player.jump_count < config.max_jumps) {
            player.vy = config.jump_force;
            player.jump_count = (player.jump_count + 1).min(config.max_jumps);
            player.grounded = false;
        }

        if input.down && !player.grounded {
            player.vy += config.gravity * config.fast_fall_factor;
        }

        if edges.attack_pressed && !player.is_charging && !player.is_attacking {
            player.is_charging = true;
            player.charge_start = now;
        }

        if edges.attack_released && player.is_charging {
            player.is_charging = false;
            return Some(AttackRelease {
                charge: now.saturating_sub(player.charge_start),
            });
        }

        None
    }

    /// Gravity, friction, knockback and velocity integration
    pub fn integrate(player: &mut Player, config: &PlayerConfig) {
        player.vy = (player.vy + config.gravity).min(config.max_fall_speed);

        let friction = if player.grounded {
            config.friction
        } else {
            config.air_friction
        };
        player.vx *= friction;

        // Knockback moves the player directly, outside normal velocity
        player.x += player.knockback_x;
        player.y += player.knockback_y;
        player.knockback_x *= config.knockback_decay;
        player.knockback_y *= config.knockback_decay;
        if player.knockback_x.abs() < KNOCKBACK_EPSILON {
            player.knockback_x = 0.0;
        }
        if player.knockback_y.abs() < KNOCKBACK_EPSILON {
            player.knockback_y = 0.0;
        }

        player.vx = player.vx.clamp(-config.speed, config.speed);
        if player.vx.abs() < SPEED_EPSILON {
            player.vx = 0.0;
        }

        player.x += player.vx;
        player.y += player.vy;
    }

    /// Recompute `grounded` from scratch against every platform.
    /// Platforms are one-way: landing only from above, and holding down
    /// drops through.
    pub fn resolve_platforms(player: &mut Player, config: &PlayerConfig, arena: &Arena) {
        player.grounded = false;

        for platform in &arena.platforms {
            let surface = platform.rect();
            let bounds = player.bounds(config);

            if !bounds.overlaps(&surface) || player.vy <= 0.0 {
                continue;
            }

            let feet = bounds.bottom();
            let in_landing_band = feet >= surface.y && feet <= surface.y + LANDING_TOLERANCE;

            if in_landing_band && bounds.overlaps_horizontally(&surface) && !player.input.down {
                player.y = surface.y - config.height;
                player.vy = 0.0;
                player.grounded = true;
                player.jump_count = 0;
            }
        }
    }

    /// Count down the swing animation
    pub fn advance_attack_timer(player: &mut Player, dt: Duration) {
        if player.is_attacking {
            player.attack_timer = player.attack_timer.saturating_sub(dt);
            if player.attack_timer.is_zero() {
                player.is_attacking = false;
            }
        }
    }
}
