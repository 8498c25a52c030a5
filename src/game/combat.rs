//! Combat system - charge attacks, hit detection, knockback

use std::time::Duration;

use tracing::debug;

use super::arena::Rect;
use super::physics::{AttackRelease, PlayerConfig};
use super::player::{Facing, Player, PlayerId};

/// Hitbox height as a fraction of player height
const HITBOX_HEIGHT_RATIO: f32 = 0.6;
/// Hitbox offset from the attacker's top as a fraction of player height
const HITBOX_OFFSET_RATIO: f32 = 0.2;
/// Upward component of the launch direction
const LAUNCH_RISE: f32 = -0.5;

/// A resolved swing, captured before any victim is touched
#[derive(Debug, Clone, Copy)]
pub struct Swing {
    pub attacker_id: PlayerId,
    pub attacker_x: f32,
    pub facing: Facing,
    pub multiplier: f32,
    pub hitbox: Rect,
}

impl Swing {
    /// Launch vector for a victim, scaled by the victim's accumulated damage
    pub fn knockback(&self, victim_x: f32, victim_damage: f32, config: &PlayerConfig) -> (f32, f32) {
        let dx = victim_x - self.attacker_x;
        let direction = if dx > 0.0 {
            1.0
        } else if dx < 0.0 {
            -1.0
        } else {
            self.facing.sign()
        };
        let angle = LAUNCH_RISE.atan2(direction);
        let magnitude =
            config.attack_knockback * self.multiplier * (1.0 + victim_damage / 100.0);

        (
            angle.cos() * magnitude,
            angle.sin() * magnitude * config.knockback_lift,
        )
    }
}

/// Hit result from combat resolution
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub attacker_id: PlayerId,
    pub target_id: PlayerId,
    pub damage: f32,
    pub knockback_x: f32,
    pub knockback_y: f32,
}

/// Combat system for resolving melee attacks
pub struct CombatSystem;

impl CombatSystem {
    /// Linear from 1.0 at no charge to `charge_attack_multiplier` at `max_charge`
    pub fn charge_multiplier(charge: Duration, config: &PlayerConfig) -> f32 {
        let max_charge = config.max_charge();
        if max_charge.is_zero() {
            return config.charge_attack_multiplier;
        }
        let ratio = charge.min(max_charge).as_secs_f32() / max_charge.as_secs_f32();
        1.0 + ratio * (config.charge_attack_multiplier - 1.0)
    }

    /// Attack rectangle in front of the attacker
    pub fn hitbox(attacker: &Player, config: &PlayerConfig) -> Rect {
        let x = match attacker.facing {
            Facing::Right => attacker.x + config.width,
            Facing::Left => attacker.x - config.attack_range,
        };
        Rect::new(
            x,
            attacker.y + config.height * HITBOX_OFFSET_RATIO,
            config.attack_range,
            config.height * HITBOX_HEIGHT_RATIO,
        )
    }

    /// Whether the cooldown since the attacker's last swing has elapsed
    pub fn can_attack(attacker: &Player, now: Duration, config: &PlayerConfig) -> bool {
        attacker
            .last_attack_time
            .map_or(true, |last| now.saturating_sub(last) >= config.attack_cooldown())
    }

    /// Resolve a released charge attack from `players[attacker_idx]`.
    ///
    /// Every other player still in the round whose box overlaps the hitbox is
    /// hit; there is no hit limit. Victims are visited in slice order. A
    /// release inside the cooldown window is dropped without effect.
    pub fn perform_attack(
        players: &mut [Player],
        attacker_idx: usize,
        release: AttackRelease,
        now: Duration,
        config: &PlayerConfig,
    ) -> Vec<HitResult> {
        let attacker = &mut players[attacker_idx];
        if !Self::can_attack(attacker, now, config) {
            debug!(player_id = %attacker.id, "Attack released during cooldown");
            return Vec::new();
        }

        attacker.is_attacking = true;
        attacker.attack_timer = config.attack_duration();
        attacker.last_attack_time = Some(now);

        let swing = Swing {
            attacker_id: attacker.id,
            attacker_x: attacker.x,
            facing: attacker.facing,
            multiplier: Self::charge_multiplier(release.charge, config),
            hitbox: Self::hitbox(attacker, config),
        };

        let mut hits = Vec::new();
        for (idx, victim) in players.iter_mut().enumerate() {
            if idx == attacker_idx
                || !victim.is_alive()
                || !swing.hitbox.overlaps(&victim.bounds(config))
            {
                continue;
            }

            let damage = config.attack_damage * swing.multiplier;
            victim.damage += damage;

            let (knockback_x, knockback_y) = swing.knockback(victim.x, victim.damage, config);
            victim.knockback_x = knockback_x;
            victim.knockback_y = knockback_y;
            victim.last_hit_by = Some(swing.attacker_id);

            hits.push(HitResult {
                attacker_id: swing.attacker_id,
                target_id: victim.id,
                damage,
                knockback_x,
                knockback_y,
            });
        }

        debug!(
            player_id = %swing.attacker_id,
            multiplier = swing.multiplier,
            hits = hits.len(),
            "Attack resolved"
        );

        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::arena::SpawnPoint;
    use crate::game::player::PALETTE;
    use uuid::Uuid;

    fn player_at(x: f32, y: f32) -> Player {
        Player::new(Uuid::new_v4(), "Test".to_string(), PALETTE[0], SpawnPoint { x, y })
    }

    fn release(ms: u64) -> AttackRelease {
        AttackRelease {
            charge: Duration::from_millis(ms),
        }
    }

    #[test]
    fn test_charge_multiplier_bounds() {
        let config = PlayerConfig::default();
        assert_eq!(CombatSystem::charge_multiplier(Duration::ZERO, &config), 1.0);
        assert_eq!(
            CombatSystem::charge_multiplier(Duration::from_millis(1000), &config),
            config.charge_attack_multiplier
        );
        assert_eq!(
            CombatSystem::charge_multiplier(Duration::from_secs(5), &config),
            config.charge_attack_multiplier
        );
        let half = CombatSystem::charge_multiplier(Duration::from_millis(500), &config);
        assert!((half - 1.75).abs() < 1e-5);
    }

    #[test]
    fn test_charge_multiplier_is_monotonic() {
        let config = PlayerConfig::default();
        let mut previous = 0.0;
        for ms in (0..=1200).step_by(10) {
            let multiplier = CombatSystem::charge_multiplier(Duration::from_millis(ms), &config);
            assert!(multiplier >= previous);
            previous = multiplier;
        }
    }

    #[test]
    fn test_hitbox_follows_facing() {
        let config = PlayerConfig::default();
        let mut attacker = player_at(300.0, 480.0);

        let right = CombatSystem::hitbox(&attacker, &config);
        assert_eq!(right.x, 350.0);
        assert_eq!(right.width, config.attack_range);
        assert!((right.y - 494.0).abs() < 1e-4);
        assert!((right.height - 42.0).abs() < 1e-4);

        attacker.facing = Facing::Left;
        let left = CombatSystem::hitbox(&attacker, &config);
        assert_eq!(left.x, 220.0);
    }

    #[test]
    fn test_full_charge_hit() {
        let config = PlayerConfig::default();
        let mut players = vec![player_at(300.0, 480.0), player_at(360.0, 480.0)];
        let now = Duration::from_secs(10);

        let hits = CombatSystem::perform_attack(&mut players, 0, release(1200), now, &config);

        assert_eq!(hits.len(), 1);
        let expected = config.attack_damage * config.charge_attack_multiplier;
        assert!((players[1].damage - expected).abs() < 1e-4);
        assert_eq!(players[1].last_hit_by, Some(players[0].id));
        assert!(players[0].is_attacking);
        assert_eq!(players[0].last_attack_time, Some(now));
    }

    #[test]
    fn test_knockback_scales_with_damage() {
        let config = PlayerConfig::default();
        let mut players = vec![player_at(300.0, 480.0), player_at(360.0, 480.0)];

        CombatSystem::perform_attack(&mut players, 0, release(1000), Duration::ZERO, &config);

        // 15 * 2.5 * (1 + 25 / 100)
        let magnitude = 46.875_f32;
        let angle = (-0.5_f32).atan2(1.0);
        assert!((players[1].knockback_x - angle.cos() * magnitude).abs() < 1e-3);
        assert!((players[1].knockback_y - angle.sin() * magnitude * 0.8).abs() < 1e-3);
        assert!(players[1].knockback_x > 0.0);
        assert!(players[1].knockback_y < 0.0);
    }

    #[test]
    fn test_aligned_victim_uses_attacker_facing() {
        let config = PlayerConfig::default();
        let attacker = player_at(300.0, 480.0);
        let swing = Swing {
            attacker_id: attacker.id,
            attacker_x: attacker.x,
            facing: Facing::Left,
            multiplier: 1.0,
            hitbox: CombatSystem::hitbox(&attacker, &config),
        };

        let (kx, ky) = swing.knockback(300.0, 0.0, &config);
        assert!(kx < 0.0);
        assert!(ky < 0.0);

        // Horizontal offset wins over facing
        let (kx, _) = swing.knockback(320.0, 0.0, &config);
        assert!(kx > 0.0);
    }

    #[test]
    fn test_release_during_cooldown_is_discarded() {
        let config = PlayerConfig::default();
        let mut players = vec![player_at(300.0, 480.0), player_at(360.0, 480.0)];
        let first = Duration::from_secs(2);
        players[0].last_attack_time = Some(first);

        let hits = CombatSystem::perform_attack(
            &mut players,
            0,
            release(1000),
            first + Duration::from_millis(399),
            &config,
        );

        assert!(hits.is_empty());
        assert_eq!(players[1].damage, 0.0);
        assert!(players[1].last_hit_by.is_none());
        assert!(!players[0].is_attacking);
        assert_eq!(players[0].last_attack_time, Some(first));
    }

    #[test]
    fn test_cooldown_boundary_allows_attack() {
        let config = PlayerConfig::default();
        let mut players = vec![player_at(300.0, 480.0), player_at(360.0, 480.0)];
        let first = Duration::from_secs(2);
        players[0].last_attack_time = Some(first);

        let hits = CombatSystem::perform_attack(
            &mut players,
            0,
            release(0),
            first + config.attack_cooldown(),
            &config,
        );

        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_hits_every_overlapping_victim() {
        let config = PlayerConfig::default();
        let mut players = vec![
            player_at(300.0, 480.0),
            player_at(355.0, 480.0),
            player_at(380.0, 470.0),
            player_at(600.0, 480.0),
        ];

        let hits = CombatSystem::perform_attack(&mut players, 0, release(0), Duration::ZERO, &config);

        assert_eq!(hits.len(), 2);
        assert_eq!(players[1].damage, config.attack_damage);
        assert_eq!(players[2].damage, config.attack_damage);
        assert_eq!(players[3].damage, 0.0);
    }

    #[test]
    fn test_eliminated_players_are_not_hit() {
        let config = PlayerConfig::default();
        let mut players = vec![player_at(300.0, 480.0), player_at(360.0, 480.0)];
        players[1].lives = 0;

        let hits = CombatSystem::perform_attack(&mut players, 0, release(0), Duration::ZERO, &config);

        assert!(hits.is_empty());
        assert_eq!(players[1].damage, 0.0);
    }
}
