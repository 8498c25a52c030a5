//! Authoritative world state and the per-tick update

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::util::time::SimClock;
use crate::ws::protocol::{PlayerSnapshot, ServerMsg};

use super::arena::Arena;
use super::combat::CombatSystem;
use super::input::{InputEdges, InputState};
use super::lifecycle::{RoundLifecycle, RoundOutcome, RoundPhase};
use super::physics::{PhysicsSystem, PlayerConfig};
use super::player::{Player, PlayerId, PALETTE};
use super::snapshot::SnapshotBuilder;

/// Result of a single scheduler tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Round is over; nothing moved
    Frozen,
    /// World advanced, round continues
    Advanced,
    /// World advanced and this tick ended the round
    RoundOver(RoundOutcome),
}

/// Everything the simulation owns. Players are kept in join order, which is
/// also the update order within a tick: when two players hit each other on
/// the same tick, the earlier joiner's attack lands first.
pub struct World {
    arena: Arc<Arena>,
    config: Arc<PlayerConfig>,
    players: Vec<Player>,
    lifecycle: RoundLifecycle,
    clock: SimClock,
    tick_interval: Duration,
    tick: u64,
    rng: ChaCha8Rng,
}

impl World {
    pub fn new(
        arena: Arc<Arena>,
        config: Arc<PlayerConfig>,
        tick_interval: Duration,
        seed: u64,
    ) -> Self {
        Self {
            arena,
            config,
            players: Vec::new(),
            lifecycle: RoundLifecycle::new(),
            clock: SimClock::new(),
            tick_interval,
            tick: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    #[cfg(test)]
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn phase(&self) -> RoundPhase {
        self.lifecycle.phase()
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulation time; frozen while the round is over
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    fn index_of(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    /// Add a player, or re-create an existing one in place. A re-join keeps
    /// the id, join slot and colour but starts over with a fresh state.
    /// During an active round lives and kills carry over, so re-joining
    /// cannot revive an eliminated player.
    pub fn join(&mut self, id: PlayerId, name: String) -> &Player {
        if let Some(idx) = self.index_of(id) {
            let spawn = self.arena.spawn_point(idx);
            let mid_round = self.lifecycle.phase() == RoundPhase::Active;
            let player = &mut self.players[idx];
            let (lives, kills) = (player.lives, player.kills);
            player.name = name;
            player.reset(spawn);
            if mid_round {
                player.lives = lives;
                player.kills = kills;
            }
            info!(player_id = %id, name = %player.name, lives = player.lives, "Player re-joined");
            return &self.players[idx];
        }

        let slot = self.players.len();
        let player = Player::new(
            id,
            name,
            PALETTE[slot % PALETTE.len()],
            self.arena.spawn_point(slot),
        );
        info!(player_id = %id, name = %player.name, slot, "Player joined");
        self.players.push(player);
        &self.players[slot]
    }

    /// Remove a player. Takes effect before the next update.
    pub fn leave(&mut self, id: PlayerId) -> Option<Player> {
        let idx = self.index_of(id)?;
        let player = self.players.remove(idx);
        info!(player_id = %id, name = %player.name, "Player removed");
        Some(player)
    }

    /// Replace a player's pending input. Returns false for unknown ids.
    pub fn set_input(&mut self, id: PlayerId, input: InputState) -> bool {
        match self.players.iter_mut().find(|p| p.id == id) {
            Some(player) => {
                player.input = input;
                true
            }
            None => false,
        }
    }

    /// Advance the world by one fixed step
    pub fn tick(&mut self) -> TickOutcome {
        if self.lifecycle.is_frozen() {
            return TickOutcome::Frozen;
        }

        self.tick += 1;
        self.clock.advance(self.tick_interval);

        for idx in 0..self.players.len() {
            if self.players[idx].is_alive() {
                self.update_player(idx);
            }
        }

        match self.lifecycle.evaluate(&self.players) {
            Some(outcome) => TickOutcome::RoundOver(outcome),
            None => TickOutcome::Advanced,
        }
    }

    fn update_player(&mut self, idx: usize) {
        let now = self.clock.now();
        let config = Arc::clone(&self.config);

        let player = &mut self.players[idx];
        let edges = InputEdges::detect(player.last_input, player.input);
        if let Some(release) = PhysicsSystem::apply_controls(player, edges, &config, now) {
            let hits = CombatSystem::perform_attack(&mut self.players, idx, release, now, &config);
            for hit in &hits {
                debug!(
                    tick = self.tick,
                    attacker = %hit.attacker_id,
                    target = %hit.target_id,
                    damage = hit.damage,
                    knockback_x = hit.knockback_x,
                    knockback_y = hit.knockback_y,
                    "Hit landed"
                );
            }
        }

        let player = &mut self.players[idx];
        PhysicsSystem::integrate(player, &config);
        PhysicsSystem::resolve_platforms(player, &config, &self.arena);

        if !self.arena.death_zone.contains(player.x, player.y) {
            self.lose_life(idx);
        }

        let player = &mut self.players[idx];
        PhysicsSystem::advance_attack_timer(player, self.tick_interval);
        player.last_input = player.input;
    }

    /// Fell out of the arena: one life lost, kill credit to the last attacker
    /// if they are still connected, then respawn or stay eliminated.
    fn lose_life(&mut self, idx: usize) {
        let player = &mut self.players[idx];
        player.lives = player.lives.saturating_sub(1);
        let victim_id = player.id;
        let lives = player.lives;
        let killer_id = player.last_hit_by.take();

        if let Some(killer_id) = killer_id {
            if let Some(killer) = self.players.iter_mut().find(|p| p.id == killer_id) {
                killer.kills += 1;
            }
        }

        if lives > 0 {
            let spawn = self.arena.respawn_point(&mut self.rng);
            self.players[idx].respawn(spawn);
            debug!(player_id = %victim_id, lives, "Player lost a life");
        } else {
            self.players[idx].eliminate();
            info!(player_id = %victim_id, killer = ?killer_id, "Player eliminated");
        }
    }

    /// Start a new round: everyone back to full lives on their join-order
    /// spawn point.
    pub fn reset_round(&mut self) {
        for (idx, player) in self.players.iter_mut().enumerate() {
            player.reset(self.arena.spawn_point(idx));
        }
        self.lifecycle.finish_reset();
        info!(
            players = self.players.len(),
            round = self.lifecycle.rounds_completed() + 1,
            "Round reset"
        );
    }

    pub fn snapshot_of(&self, id: PlayerId) -> Option<PlayerSnapshot> {
        self.player(id)
            .map(|p| SnapshotBuilder::player(p, &self.config, self.clock.now()))
    }

    pub fn game_state(&self) -> ServerMsg {
        SnapshotBuilder::game_state(&self.players, &self.config, self.clock.now())
    }
}
