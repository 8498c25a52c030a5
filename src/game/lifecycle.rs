//! Round lifecycle - win detection and the round-over latch

use tracing::info;

use super::player::{Player, PlayerId};

/// Round phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Players are fighting; ticks advance the world
    Active,
    /// A winner (or tie) was declared; ticks are frozen until reset
    RoundOver,
}

impl RoundPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::RoundOver => "round_over",
        }
    }
}

/// How a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    /// Sole survivor, or `None` when the last players fell on the same tick
    pub winner: Option<PlayerId>,
}

/// Tracks the round phase. The phase doubles as the latch: the end-of-round
/// transition fires once and stays closed until `finish_reset`.
#[derive(Debug)]
pub struct RoundLifecycle {
    phase: RoundPhase,
    rounds_completed: u64,
}

impl RoundLifecycle {
    pub fn new() -> Self {
        Self {
            phase: RoundPhase::Active,
            rounds_completed: 0,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn is_frozen(&self) -> bool {
        self.phase == RoundPhase::RoundOver
    }

    pub fn rounds_completed(&self) -> u64 {
        self.rounds_completed
    }

    /// Check the win condition after every player has updated. Returns the
    /// outcome only on the tick the round ends.
    pub fn evaluate(&mut self, players: &[Player]) -> Option<RoundOutcome> {
        if self.phase != RoundPhase::Active || players.len() <= 1 {
            return None;
        }

        let mut alive = players.iter().filter(|p| p.is_alive());
        let winner = alive.next().map(|p| p.id);
        if alive.next().is_some() {
            return None;
        }

        self.phase = RoundPhase::RoundOver;
        self.rounds_completed += 1;
        info!(
            winner = ?winner,
            round = self.rounds_completed,
            "Round over"
        );

        Some(RoundOutcome { winner })
    }

    /// Reopen the latch once every player has been reset
    pub fn finish_reset(&mut self) {
        self.phase = RoundPhase::Active;
    }
}

impl Default for RoundLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
