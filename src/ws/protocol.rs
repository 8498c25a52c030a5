//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::arena::Arena;
use crate::game::input::InputState;
use crate::game::physics::PlayerConfig;
use crate::game::player::PlayerId;

/// Longest display name kept after trimming
pub const MAX_NAME_CHARS: usize = 20;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Enter the arena as a player
    Join {
        /// Display name; blank or missing gets a generated one
        #[serde(default)]
        name: Option<String>,
    },

    /// Full replacement of the player's held buttons
    Input { input: InputState },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Sent once, right after the connection opens
    #[serde(rename_all = "camelCase")]
    Init {
        player_id: PlayerId,
        arena: Arena,
        player_config: PlayerConfig,
    },

    /// Confirmation of join, to the joining client only
    Joined { player: PlayerSnapshot },

    /// World snapshot, every active tick
    GameState {
        players: Vec<PlayerSnapshot>,
        /// Server time in Unix milliseconds
        timestamp: u64,
    },

    /// Another player joined
    PlayerJoined { player: PlayerSnapshot },

    /// A player disconnected
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        player_id: PlayerId,
        player_name: String,
    },

    /// Round ended; `null` winner means a tie
    GameOver { winner: Option<PlayerSnapshot> },

    /// New round started
    GameReset,
}

/// Player state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    /// Rounded to whole units
    pub x: f32,
    /// Rounded to whole units
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// -1 = left, 1 = right
    pub facing: i8,
    pub grounded: bool,
    /// Rounded to whole percent
    pub damage: f32,
    pub lives: u8,
    pub kills: u32,
    pub is_attacking: bool,
    pub is_charging: bool,
    /// 0.0 ..= 1.0
    pub charge_progress: f32,
}

/// Clean up a requested display name, generating one when it is blank
pub fn display_name(requested: Option<&str>, fallback_suffix: u16) -> String {
    let trimmed = requested.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return format!("Player{}", fallback_suffix);
    }
    trimmed.chars().take(MAX_NAME_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_parse_join() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"join","name":"Ada"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Join { name: Some(ref n) } if n == "Ada"));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"join"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Join { name: None }));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"join","name":null}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Join { name: None }));
    }

    #[test]
    fn test_parse_input() {
        let msg: ClientMsg = serde_json::from_str(
            r#"{"type":"input","input":{"left":true,"right":false,"up":false,"down":false,"attack":true,"jump":false}}"#,
        )
        .unwrap();
        match msg {
            ClientMsg::Input { input } => {
                assert!(input.left && input.attack);
                assert!(!input.jump);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_messages_are_rejected() {
        assert!(serde_json::from_str::<ClientMsg>("not json").is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"dance"}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"input"}"#).is_err());
    }

    #[test]
    fn test_server_message_tags() {
        let reset = serde_json::to_value(ServerMsg::GameReset).unwrap();
        assert_eq!(reset, serde_json::json!({"type": "gameReset"}));

        let tie = serde_json::to_value(ServerMsg::GameOver { winner: None }).unwrap();
        assert_eq!(tie, serde_json::json!({"type": "gameOver", "winner": null}));

        let id = Uuid::new_v4();
        let left = serde_json::to_value(ServerMsg::PlayerLeft {
            player_id: id,
            player_name: "Ada".to_string(),
        })
        .unwrap();
        assert_eq!(left["type"], "playerLeft");
        assert_eq!(left["playerId"], id.to_string());
        assert_eq!(left["playerName"], "Ada");
    }

    #[test]
    fn test_init_carries_arena_and_config() {
        let init = serde_json::to_value(ServerMsg::Init {
            player_id: Uuid::new_v4(),
            arena: Arena::default(),
            player_config: PlayerConfig::default(),
        })
        .unwrap();
        assert_eq!(init["type"], "init");
        assert_eq!(init["arena"]["platforms"].as_array().unwrap().len(), 4);
        assert_eq!(init["playerConfig"]["jumpForce"], -18.0);
        assert_eq!(init["playerConfig"]["maxCharge"], 1000);
    }

    #[test]
    fn test_snapshot_field_names() {
        let snapshot = PlayerSnapshot {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            color: "#FF6B6B".to_string(),
            x: 300.0,
            y: 480.0,
            vx: 0.0,
            vy: 0.0,
            facing: 1,
            grounded: true,
            damage: 0.0,
            lives: 3,
            kills: 0,
            is_attacking: false,
            is_charging: true,
            charge_progress: 0.5,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["isCharging"], true);
        assert_eq!(json["chargeProgress"], 0.5);
        assert_eq!(json["isAttacking"], false);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Some("  Ada "), 7), "Ada");
        assert_eq!(display_name(Some("   "), 7), "Player7");
        assert_eq!(display_name(None, 123), "Player123");
        let long = "x".repeat(50);
        assert_eq!(display_name(Some(&long), 0).chars().count(), MAX_NAME_CHARS);
    }
}
