//! Snapshot building for network transmission

use std::time::Duration;

use crate::util::time::unix_millis;
use crate::ws::protocol::{PlayerSnapshot, ServerMsg};

use super::physics::PlayerConfig;
use super::player::Player;

/// Round half toward positive infinity, matching what browser clients expect
pub fn round_half_up(value: f32) -> f32 {
    (value + 0.5).floor()
}

/// Builds the public view of players
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    /// Public snapshot of one player at simulation time `now`
    pub fn player(player: &Player, config: &PlayerConfig, now: Duration) -> PlayerSnapshot {
        PlayerSnapshot {
            id: player.id,
            name: player.name.clone(),
            color: player.color.to_string(),
            x: round_half_up(player.x),
            y: round_half_up(player.y),
            vx: player.vx,
            vy: player.vy,
            facing: player.facing.sign() as i8,
            grounded: player.grounded,
            damage: round_half_up(player.damage),
            lives: player.lives,
            kills: player.kills,
            is_attacking: player.is_attacking,
            is_charging: player.is_charging,
            charge_progress: Self::charge_progress(player, config, now),
        }
    }

    /// Fraction of a full charge held so far, 0 when not charging
    pub fn charge_progress(player: &Player, config: &PlayerConfig, now: Duration) -> f32 {
        if !player.is_charging {
            return 0.0;
        }
        let max_charge = config.max_charge();
        if max_charge.is_zero() {
            return 1.0;
        }
        let held = now.saturating_sub(player.charge_start);
        (held.as_secs_f32() / max_charge.as_secs_f32()).min(1.0)
    }

    /// Full `gameState` message. Eliminated players are included; clients
    /// filter on `lives`.
    pub fn game_state(players: &[Player], config: &PlayerConfig, now: Duration) -> ServerMsg {
        ServerMsg::GameState {
            players: players
                .iter()
                .map(|p| Self::player(p, config, now))
                .collect(),
            timestamp: unix_millis(),
        }
    }
}
