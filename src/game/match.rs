//! Match task and authoritative tick loop

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::ws::hub::Hub;
use crate::ws::protocol::{display_name, ClientMsg, ServerMsg};

use super::input::InputState;
use super::lifecycle::RoundPhase;
use super::player::PlayerId;
use super::world::{TickOutcome, World};
use super::MatchCommand;

/// Commands buffered between connections and the match task
pub const COMMAND_BUFFER: usize = 1024;

/// Counters readable outside the match task
#[derive(Debug, Default)]
pub struct MatchStatus {
    players: AtomicUsize,
    round_over: AtomicBool,
}

/// Handle to the running match
#[derive(Clone)]
pub struct MatchHandle {
    commands_tx: mpsc::Sender<MatchCommand>,
    status: Arc<MatchStatus>,
}

impl MatchHandle {
    /// Queue a command for the next tick
    pub async fn submit(
        &self,
        command: MatchCommand,
    ) -> Result<(), mpsc::error::SendError<MatchCommand>> {
        self.commands_tx.send(command).await
    }

    pub fn player_count(&self) -> usize {
        self.status.players.load(Ordering::Relaxed)
    }

    pub fn phase(&self) -> RoundPhase {
        if self.status.round_over.load(Ordering::Relaxed) {
            RoundPhase::RoundOver
        } else {
            RoundPhase::Active
        }
    }
}

/// The authoritative game match. Owns the world outright; connections reach
/// it only through the command channel, and the delayed round reset runs on
/// the same task as the tick so the two never overlap.
pub struct GameMatch {
    world: World,
    commands_rx: mpsc::Receiver<MatchCommand>,
    hub: Arc<Hub>,
    status: Arc<MatchStatus>,
    reset_delay: Duration,
    reset_at: Option<Instant>,
}

impl GameMatch {
    pub fn new(world: World, hub: Arc<Hub>, reset_delay: Duration) -> (Self, MatchHandle) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let status = Arc::new(MatchStatus::default());

        let handle = MatchHandle {
            commands_tx,
            status: status.clone(),
        };

        let game_match = Self {
            world,
            commands_rx,
            hub,
            status,
            reset_delay,
            reset_at: None,
        };

        (game_match, handle)
    }

    /// Run the authoritative tick loop until every handle is dropped
    pub async fn run(mut self) {
        let tick_interval = self.world.tick_interval();
        info!(tick_interval = ?tick_interval, "Match loop started");

        let mut ticker = interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let reset_at = self.reset_at;
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.process_commands() {
                        info!("Command channel closed, stopping match loop");
                        break;
                    }
                    self.run_tick();
                }
                _ = sleep_until(reset_at.unwrap_or_else(Instant::now)), if reset_at.is_some() => {
                    self.complete_reset();
                }
            }
        }
    }

    /// Apply everything queued since the last tick. Several inputs from one
    /// player collapse to the last. Returns false once no handle remains.
    fn process_commands(&mut self) -> bool {
        loop {
            match self.commands_rx.try_recv() {
                Ok(command) => self.handle_command(command),
                Err(mpsc::error::TryRecvError::Empty) => return true,
                Err(mpsc::error::TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn handle_command(&mut self, command: MatchCommand) {
        match command {
            MatchCommand::Client {
                player_id,
                msg: ClientMsg::Join { name },
            } => self.handle_join(player_id, name),
            MatchCommand::Client {
                player_id,
                msg: ClientMsg::Input { input },
            } => self.handle_input(player_id, input),
            MatchCommand::Disconnect { player_id } => self.handle_disconnect(player_id),
        }
    }

    /// Handle player join request
    fn handle_join(&mut self, player_id: PlayerId, name: Option<String>) {
        // Closed while the join was queued; its Disconnect follows
        if !self.hub.is_connected(player_id) {
            debug!(player_id = %player_id, "Join from closed connection");
            return;
        }

        let name = display_name(name.as_deref(), rand::thread_rng().gen_range(0..1000));
        self.world.join(player_id, name);

        let Some(snapshot) = self.world.snapshot_of(player_id) else {
            return;
        };

        if let Err(e) = self.hub.send_to(
            player_id,
            &ServerMsg::Joined {
                player: snapshot.clone(),
            },
        ) {
            debug!(player_id = %player_id, error = %e, "Joined confirmation not delivered");
        }
        self.hub
            .broadcast_except(player_id, &ServerMsg::PlayerJoined { player: snapshot });

        self.publish_status();
    }

    /// Input before join is dropped silently
    fn handle_input(&mut self, player_id: PlayerId, input: InputState) {
        if !self.world.set_input(player_id, input) {
            debug!(player_id = %player_id, "Input from connection without a player");
        }
    }

    fn handle_disconnect(&mut self, player_id: PlayerId) {
        if let Some(player) = self.world.leave(player_id) {
            self.hub.broadcast(&ServerMsg::PlayerLeft {
                player_id,
                player_name: player.name,
            });
            self.publish_status();
        }
    }

    /// Run a single simulation tick and broadcast its result
    fn run_tick(&mut self) {
        match self.world.tick() {
            TickOutcome::Frozen => {}
            TickOutcome::Advanced => {
                self.hub.broadcast(&self.world.game_state());
            }
            TickOutcome::RoundOver(outcome) => {
                debug!(
                    tick = self.world.tick_count(),
                    sim_time = ?self.world.now(),
                    reset_in = ?self.reset_delay,
                    "Scheduling round reset"
                );
                let winner = outcome.winner.and_then(|id| self.world.snapshot_of(id));
                self.hub.broadcast(&ServerMsg::GameOver { winner });
                self.reset_at = Some(Instant::now() + self.reset_delay);
                self.publish_status();

                self.hub.broadcast(&self.world.game_state());
            }
        }
    }

    /// Delayed end-of-round reset
    fn complete_reset(&mut self) {
        self.reset_at = None;
        self.world.reset_round();
        self.hub.broadcast(&ServerMsg::GameReset);
        self.publish_status();
    }

    fn publish_status(&self) {
        self.status
            .players
            .store(self.world.players().len(), Ordering::Relaxed);
        self.status.round_over.store(
            self.world.phase() == RoundPhase::RoundOver,
            Ordering::Relaxed,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::arena::Arena;
    use crate::game::physics::PlayerConfig;
    use crate::util::time::{tick_interval, DEFAULT_TICK_RATE};
    use serde_json::Value;
    use uuid::Uuid;

    fn setup() -> (GameMatch, MatchHandle, Arc<Hub>) {
        let hub = Arc::new(Hub::new());
        let world = World::new(
            Arc::new(Arena::default()),
            Arc::new(PlayerConfig::default()),
            tick_interval(DEFAULT_TICK_RATE),
            1,
        );
        let (game, handle) = GameMatch::new(world, hub.clone(), Duration::from_secs(5));
        (game, handle, hub)
    }

    fn submit(handle: &MatchHandle, player_id: PlayerId, msg: ClientMsg) {
        tokio_test::assert_ok!(tokio_test::block_on(
            handle.submit(MatchCommand::Client { player_id, msg })
        ));
    }

    fn join(game: &mut GameMatch, handle: &MatchHandle, player_id: PlayerId, name: &str) {
        submit(
            handle,
            player_id,
            ClientMsg::Join {
                name: Some(name.to_string()),
            },
        );
        assert!(game.process_commands());
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<Value> {
        let mut messages = Vec::new();
        while let Ok(text) = rx.try_recv() {
            messages.push(serde_json::from_str(&text).unwrap());
        }
        messages
    }

    fn count(messages: &[Value], kind: &str) -> usize {
        messages.iter().filter(|m| m["type"] == kind).count()
    }

    #[test]
    fn test_join_notifies_joiner_and_others() {
        let (mut game, handle, hub) = setup();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut a_rx = hub.register(a);
        let mut b_rx = hub.register(b);

        join(&mut game, &handle, a, "Ada");

        let to_a = drain(&mut a_rx);
        assert_eq!(to_a.len(), 1);
        assert_eq!(to_a[0]["type"], "joined");
        assert_eq!(to_a[0]["player"]["name"], "Ada");
        assert_eq!(to_a[0]["player"]["id"], a.to_string());

        let to_b = drain(&mut b_rx);
        assert_eq!(to_b.len(), 1);
        assert_eq!(to_b[0]["type"], "playerJoined");
        assert_eq!(handle.player_count(), 1);
    }

    #[test]
    fn test_blank_name_gets_placeholder() {
        let (mut game, handle, hub) = setup();
        let a = Uuid::new_v4();
        let mut a_rx = hub.register(a);

        join(&mut game, &handle, a, "   ");

        let joined = drain(&mut a_rx);
        let name = joined[0]["player"]["name"].as_str().unwrap();
        assert!(name.starts_with("Player"));
    }

    #[test]
    fn test_join_from_closed_connection_is_skipped() {
        let (mut game, handle, hub) = setup();
        let (gone, watcher) = (Uuid::new_v4(), Uuid::new_v4());
        let mut watcher_rx = hub.register(watcher);

        join(&mut game, &handle, gone, "Ghost");

        assert!(game.world.players().is_empty());
        assert!(drain(&mut watcher_rx).is_empty());
    }

    #[test]
    fn test_input_before_join_is_ignored() {
        let (mut game, handle, hub) = setup();
        let a = Uuid::new_v4();
        let mut a_rx = hub.register(a);

        submit(
            &handle,
            a,
            ClientMsg::Input {
                input: InputState {
                    right: true,
                    ..InputState::default()
                },
            },
        );
        assert!(game.process_commands());

        assert!(game.world.players().is_empty());
        assert!(drain(&mut a_rx).is_empty());
    }

    #[test]
    fn test_inputs_between_ticks_coalesce() {
        let (mut game, handle, hub) = setup();
        let a = Uuid::new_v4();
        let _a_rx = hub.register(a);
        join(&mut game, &handle, a, "Ada");

        for input in [
            InputState {
                left: true,
                ..InputState::default()
            },
            InputState {
                jump: true,
                ..InputState::default()
            },
            InputState {
                right: true,
                ..InputState::default()
            },
        ] {
            submit(&handle, a, ClientMsg::Input { input });
        }
        assert!(game.process_commands());

        let input = game.world.player(a).unwrap().input;
        assert_eq!(
            input,
            InputState {
                right: true,
                ..InputState::default()
            }
        );
    }

    #[test]
    fn test_active_tick_broadcasts_state() {
        let (mut game, handle, hub) = setup();
        let a = Uuid::new_v4();
        let watcher = Uuid::new_v4();
        let _a_rx = hub.register(a);
        let mut watcher_rx = hub.register(watcher);
        join(&mut game, &handle, a, "Ada");
        drain(&mut watcher_rx);

        game.run_tick();

        let messages = drain(&mut watcher_rx);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["type"], "gameState");
        assert_eq!(messages[0]["players"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_game_over_broadcast_once() {
        let (mut game, handle, hub) = setup();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut a_rx = hub.register(a);
        let _b_rx = hub.register(b);
        join(&mut game, &handle, a, "Ada");
        join(&mut game, &handle, b, "Bob");
        drain(&mut a_rx);

        {
            let loser = game.world.player_mut(b).unwrap();
            loser.lives = 1;
            loser.y = 950.0;
        }

        for _ in 0..30 {
            game.run_tick();
        }

        let messages = drain(&mut a_rx);
        assert_eq!(count(&messages, "gameOver"), 1);
        // Only the tick that ended the round produced a snapshot
        assert_eq!(count(&messages, "gameState"), 1);
        assert_eq!(messages[0]["type"], "gameOver");
        assert_eq!(messages[0]["winner"]["id"], a.to_string());
        assert!(game.reset_at.is_some());
        assert_eq!(handle.phase(), RoundPhase::RoundOver);
    }

    #[test]
    fn test_tie_broadcasts_null_winner() {
        let (mut game, handle, hub) = setup();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut a_rx = hub.register(a);
        let _b_rx = hub.register(b);
        join(&mut game, &handle, a, "Ada");
        join(&mut game, &handle, b, "Bob");
        drain(&mut a_rx);

        for id in [a, b] {
            let player = game.world.player_mut(id).unwrap();
            player.lives = 1;
            player.x = -500.0;
        }
        game.run_tick();

        let messages = drain(&mut a_rx);
        assert_eq!(messages[0]["type"], "gameOver");
        assert!(messages[0]["winner"].is_null());
    }

    #[test]
    fn test_reset_reopens_round() {
        let (mut game, handle, hub) = setup();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut a_rx = hub.register(a);
        let _b_rx = hub.register(b);
        join(&mut game, &handle, a, "Ada");
        join(&mut game, &handle, b, "Bob");
        {
            let loser = game.world.player_mut(b).unwrap();
            loser.lives = 1;
            loser.y = 950.0;
        }
        game.run_tick();
        drain(&mut a_rx);

        game.complete_reset();

        let messages = drain(&mut a_rx);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["type"], "gameReset");
        assert!(game.reset_at.is_none());
        assert_eq!(handle.phase(), RoundPhase::Active);
        for player in game.world.players() {
            assert_eq!(player.lives, 3);
            assert_eq!(player.kills, 0);
            assert_eq!(player.damage, 0.0);
        }

        game.run_tick();
        assert_eq!(count(&drain(&mut a_rx), "gameState"), 1);
    }

    #[test]
    fn test_disconnect_removes_player_and_notifies() {
        let (mut game, handle, hub) = setup();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut a_rx = hub.register(a);
        let _b_rx = hub.register(b);
        join(&mut game, &handle, a, "Ada");
        join(&mut game, &handle, b, "Bob");
        drain(&mut a_rx);

        hub.unregister(b);
        tokio_test::assert_ok!(tokio_test::block_on(
            handle.submit(MatchCommand::Disconnect { player_id: b })
        ));
        assert!(game.process_commands());

        let messages = drain(&mut a_rx);
        assert_eq!(messages[0]["type"], "playerLeft");
        assert_eq!(messages[0]["playerName"], "Bob");
        assert!(game.world.player(b).is_none());
        assert_eq!(handle.player_count(), 1);

        game.run_tick();
        let snapshot = drain(&mut a_rx);
        assert_eq!(snapshot[0]["players"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_stops_when_handles_dropped() {
        let (mut game, handle, _hub) = setup();
        drop(handle);
        assert!(!game.process_commands());
    }
}
