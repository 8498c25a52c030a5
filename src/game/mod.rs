//! Game simulation modules

pub mod arena;
pub mod combat;
pub mod input;
pub mod lifecycle;
pub mod r#match;
pub mod physics;
pub mod player;
pub mod snapshot;
pub mod world;

pub use r#match::{GameMatch, MatchHandle};

use crate::ws::protocol::ClientMsg;

use player::PlayerId;

/// Work queued for the match task by a connection
#[derive(Debug, Clone)]
pub enum MatchCommand {
    /// A parsed client message
    Client { player_id: PlayerId, msg: ClientMsg },

    /// The connection closed
    Disconnect { player_id: PlayerId },
}
