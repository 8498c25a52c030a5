//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::arena::Arena;
use crate::game::physics::PlayerConfig;
use crate::game::world::World;
use crate::game::{GameMatch, MatchHandle};
use crate::util::time::tick_interval;
use crate::ws::hub::Hub;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub arena: Arc<Arena>,
    pub player_config: Arc<PlayerConfig>,
    pub hub: Arc<Hub>,
    pub game: MatchHandle,
}

impl AppState {
    /// Build the state and the match it talks to. The caller spawns
    /// [`GameMatch::run`].
    pub fn new(config: Config) -> (Self, GameMatch) {
        let config = Arc::new(config);
        let arena = Arc::new(Arena::default());
        let player_config = Arc::new(PlayerConfig::default());
        let hub = Arc::new(Hub::new());

        let world = World::new(
            arena.clone(),
            player_config.clone(),
            tick_interval(config.tick_rate),
            config.match_seed.unwrap_or_else(rand::random),
        );
        let (game_match, game) = GameMatch::new(world, hub.clone(), config.round_reset_delay);

        let state = Self {
            config,
            arena,
            player_config,
            hub,
            game,
        };

        (state, game_match)
    }
}
