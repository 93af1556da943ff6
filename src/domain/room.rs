// A single game room: the world plus the tick pipeline, session lifecycle and
// day/night toggle. Owned by exactly one task; nothing here is shared.

use crate::domain::commands::{self, Command};
use crate::domain::diff::{self, StatePatch, WorldSnapshot};
use crate::domain::events::{GameResult, Outbound, RoomMessage};
use crate::domain::state::{SessionId, World};
use crate::domain::systems::{abilities, ai, combat, lifecycle, spawning, territory};
use crate::domain::tuning::clan::Clan;
use crate::domain::tuning::room::{PlayerTuning, RoomConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum JoinError {
    #[error("room is full ({max_clients} players)")]
    RoomFull { max_clients: usize },
    #[error("session `{0}` already joined")]
    AlreadyJoined(SessionId),
    #[error("the game in this room is over")]
    GameOver,
}

pub struct Room {
    config: RoomConfig,
    world: World,
    rng: StdRng,
    tick: u64,
    last_snapshot: Arc<WorldSnapshot>,
    game_over: bool,
    /// Simulation time (ms) spent with at least one living player.
    survived_ms: f64,
    player_tuning: PlayerTuning,
}

impl Room {
    pub fn new(config: RoomConfig) -> Self {
        let world = World::new(&config);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let last_snapshot = Arc::new(WorldSnapshot::capture(&world, 0));
        Self {
            config,
            world,
            rng,
            tick: 0,
            last_snapshot,
            game_over: false,
            survived_ms: 0.0,
            player_tuning: PlayerTuning::default(),
        }
    }

    /// Starts a fresh match with the same config. Only valid once the room
    /// is empty; returns whether the room was reset.
    pub fn reset(&mut self) -> bool {
        if !self.world.players.is_empty() {
            return false;
        }
        let tick = self.tick;
        *self = Room::new(self.config.clone());
        // Keep patch ticks monotonic for clients that stay subscribed.
        self.tick = tick;
        info!(tick, "room reset for a new match");
        true
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn player_count(&self) -> usize {
        self.world.players.len()
    }

    /// Latest published snapshot (what clients have been told so far).
    pub fn snapshot(&self) -> Arc<WorldSnapshot> {
        Arc::clone(&self.last_snapshot)
    }

    /// Adds a player and returns the targeted `gameInit`.
    pub fn on_join(
        &mut self,
        session_id: &str,
        username: &str,
        clan: Clan,
    ) -> Result<Vec<Outbound>, JoinError> {
        if self.game_over {
            return Err(JoinError::GameOver);
        }
        if self.world.players.contains_key(session_id) {
            return Err(JoinError::AlreadyJoined(session_id.to_string()));
        }
        if self.world.players.len() >= self.config.max_clients {
            return Err(JoinError::RoomFull {
                max_clients: self.config.max_clients,
            });
        }

        lifecycle::spawn_player(&mut self.world, &mut self.rng, session_id, username, clan);

        Ok(vec![Outbound::to_session(
            session_id,
            RoomMessage::GameInit {
                map_width: self.world.map_width,
                map_height: self.world.map_height,
                current_time: self.world.current_time,
                player_id: session_id.to_string(),
            },
        )])
    }

    /// Removes a player and everything tied to them. Returns whether the
    /// session was in the room.
    pub fn on_leave(&mut self, session_id: &str) -> bool {
        lifecycle::remove_player(&mut self.world, session_id).is_some()
    }

    /// End-of-room teardown.
    pub fn on_dispose(&mut self) {
        info!(
            ticks = self.tick,
            players = self.world.players.len(),
            enemies = self.world.enemies.len(),
            game_over = self.game_over,
            "room disposed"
        );
        let session_ids: Vec<SessionId> = self.world.players.keys().cloned().collect();
        for session_id in session_ids {
            lifecycle::remove_player(&mut self.world, &session_id);
        }
    }

    /// Applies a client command; ignored commands are logged and produce no
    /// output.
    pub fn handle_command(&mut self, session_id: &str, command: Command) -> Vec<Outbound> {
        if self.game_over {
            return Vec::new();
        }
        let name = command.name();
        match commands::handle(&mut self.world, session_id, command) {
            Ok(out) => out,
            Err(err) => {
                debug!(session_id, command = name, error = %err, "command ignored");
                Vec::new()
            }
        }
    }

    /// Runs one simulation step of `dt_ms` milliseconds.
    pub fn tick(&mut self, dt_ms: f32) -> Vec<Outbound> {
        let mut out = Vec::new();
        if self.game_over {
            return out;
        }
        self.tick += 1;
        let world = &mut self.world;
        world.elapsed_ms += f64::from(dt_ms);

        if world.alive_players().next().is_some() {
            self.survived_ms += f64::from(dt_ms);
        }

        abilities::tick_cooldowns(world, dt_ms, self.player_tuning.energy_regen);
        ai::update(world, dt_ms);
        combat::resolve(world, dt_ms, &mut out);
        abilities::tick_effects(world, dt_ms);
        territory::update(world, &mut self.rng, dt_ms);
        spawning::maybe_spawn_wave(world, &mut self.rng, self.config.enemy_spawn_chance);
        spawning::cull_out_of_bounds(world);

        if let Some(result) = self.check_outcome() {
            self.game_over = true;
            info!(result = result.as_str(), tick = self.tick, "game over");
            out.push(Outbound::to_all(RoomMessage::GameOver { result }));
        }
        out
    }

    fn check_outcome(&self) -> Option<GameResult> {
        let players = &self.world.players;
        if players.is_empty() {
            return None;
        }
        if players.values().all(|p| p.dead) {
            return Some(GameResult::Defeat);
        }
        let limit = self.config.victory_time_limit;
        if !limit.is_zero() && self.survived_ms >= limit.as_secs_f64() * 1000.0 {
            return Some(GameResult::Victory);
        }
        None
    }

    /// Flips day/night, rewrites every player's multipliers and announces it.
    pub fn toggle_day_night(&mut self) -> Vec<Outbound> {
        if self.game_over || !self.world.day_night_cycle {
            return Vec::new();
        }
        let time = self.world.current_time.toggled();
        let modifiers = time.modifiers();
        self.world.current_time = time;
        for player in self.world.players.values_mut() {
            player.damage_multiplier = modifiers.damage_multiplier;
            player.speed_multiplier = modifiers.speed_multiplier;
        }
        info!(time = time.as_str(), "time of day changed");
        vec![Outbound::to_all(RoomMessage::TimeChange { time })]
    }

    /// Captures the current world, diffs it against the last published
    /// snapshot and makes it the new baseline.
    pub fn publish(&mut self) -> (StatePatch, Arc<WorldSnapshot>) {
        let next = Arc::new(WorldSnapshot::capture(&self.world, self.tick));
        let patch = diff::diff(&self.last_snapshot, &next);
        self.last_snapshot = Arc::clone(&next);
        (patch, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::TimeOfDay;
    use crate::domain::tuning::room::{DAY_MODIFIERS, NIGHT_MODIFIERS};
    use std::time::Duration;

    fn quiet_config() -> RoomConfig {
        RoomConfig {
            seed: Some(42),
            enemy_spawn_chance: 0.0,
            ..RoomConfig::default()
        }
    }

    fn count_game_over(out: &[Outbound], wanted: GameResult) -> usize {
        out.iter()
            .filter(|o| matches!(o.message, RoomMessage::GameOver { result } if result == wanted))
            .count()
    }

    #[test]
    fn when_player_joins_then_game_init_is_sent_only_to_them() {
        let mut room = Room::new(quiet_config());

        let out = room.on_join("s1", "vlad", Clan::Ventrue).expect("join accepted");

        assert_eq!(out.len(), 1);
        assert!(out[0].recipients.includes("s1"));
        assert!(!out[0].recipients.includes("s2"));
        assert_eq!(
            out[0].message,
            RoomMessage::GameInit {
                map_width: 7000.0,
                map_height: 7000.0,
                current_time: TimeOfDay::Day,
                player_id: "s1".to_string(),
            }
        );
        assert_eq!(room.player_count(), 1);
    }

    #[test]
    fn when_room_is_full_then_join_is_rejected() {
        let mut room = Room::new(RoomConfig {
            max_clients: 1,
            ..quiet_config()
        });
        room.on_join("s1", "a", Clan::Ventrue).expect("join accepted");

        assert_eq!(
            room.on_join("s2", "b", Clan::Tremere),
            Err(JoinError::RoomFull { max_clients: 1 })
        );
        assert_eq!(
            room.on_join("s1", "a", Clan::Ventrue),
            Err(JoinError::AlreadyJoined("s1".to_string()))
        );
    }

    #[test]
    fn when_day_night_toggles_then_multipliers_update_and_one_time_change_is_sent() {
        let mut room = Room::new(quiet_config());
        room.on_join("s1", "a", Clan::Ventrue).expect("join accepted");
        room.on_join("s2", "b", Clan::Toreador).expect("join accepted");

        let out = room.toggle_day_night();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message, RoomMessage::TimeChange { time: TimeOfDay::Night });
        for p in room.world().players.values() {
            assert_eq!(p.damage_multiplier, NIGHT_MODIFIERS.damage_multiplier);
            assert_eq!(p.speed_multiplier, NIGHT_MODIFIERS.speed_multiplier);
        }

        room.toggle_day_night();
        assert_eq!(room.world().current_time, TimeOfDay::Day);
        for p in room.world().players.values() {
            assert_eq!(p.damage_multiplier, DAY_MODIFIERS.damage_multiplier);
        }
    }

    #[test]
    fn when_every_player_is_dead_then_defeat_fires_once_and_never_victory() {
        let mut room = Room::new(quiet_config());
        room.on_join("s1", "a", Clan::Ventrue).expect("join accepted");
        room.on_join("s2", "b", Clan::Tremere).expect("join accepted");
        for p in room.world.players.values_mut() {
            p.health = 0.0;
            p.dead = true;
        }

        let mut out = Vec::new();
        for _ in 0..5 {
            out.extend(room.tick(50.0));
        }

        assert_eq!(count_game_over(&out, GameResult::Defeat), 1);
        assert_eq!(count_game_over(&out, GameResult::Victory), 0);
        assert!(room.is_game_over());
        assert_eq!(room.tick_count(), 1);
        assert!(room.handle_command("s1", Command::Move { x: 1.0, y: 1.0 }).is_empty());
    }

    #[test]
    fn when_room_is_empty_then_no_game_over_is_reported() {
        let mut room = Room::new(quiet_config());

        let out = room.tick(50.0);

        assert!(out.is_empty());
        assert!(!room.is_game_over());
    }

    #[test]
    fn when_victory_limit_is_survived_then_victory_fires_once() {
        let mut room = Room::new(RoomConfig {
            victory_time_limit: Duration::from_millis(100),
            ..quiet_config()
        });
        room.on_join("s1", "a", Clan::Ventrue).expect("join accepted");

        let mut out = Vec::new();
        for _ in 0..4 {
            out.extend(room.tick(50.0));
        }

        assert_eq!(count_game_over(&out, GameResult::Victory), 1);
        assert_eq!(count_game_over(&out, GameResult::Defeat), 0);
    }

    #[test]
    fn when_room_idles_empty_past_the_limit_then_victory_still_needs_survival_time() {
        let mut room = Room::new(RoomConfig {
            victory_time_limit: Duration::from_secs(60),
            ..quiet_config()
        });
        for _ in 0..1220 {
            room.tick(50.0);
        }
        room.on_join("s1", "a", Clan::Ventrue).expect("join accepted");

        let out = room.tick(50.0);
        assert_eq!(count_game_over(&out, GameResult::Victory), 0);
        assert!(!room.is_game_over());

        let mut out = Vec::new();
        for _ in 0..1199 {
            out.extend(room.tick(50.0));
        }
        assert_eq!(count_game_over(&out, GameResult::Victory), 1);
    }

    #[test]
    fn when_ended_room_empties_then_reset_accepts_new_players() {
        let mut room = Room::new(quiet_config());
        room.on_join("s2", "b", Clan::Tremere).expect("join accepted");
        for p in room.world.players.values_mut() {
            p.health = 0.0;
            p.dead = true;
        }
        room.tick(50.0);
        assert!(room.is_game_over());

        assert!(!room.reset());
        room.on_leave("s2");
        assert!(matches!(
            room.on_join("s3", "c", Clan::Nosferatu),
            Err(JoinError::GameOver)
        ));
        let ticks = room.tick_count();

        assert!(room.reset());
        assert!(!room.is_game_over());
        assert_eq!(room.tick_count(), ticks);
        assert!(room.on_join("s3", "c", Clan::Nosferatu).is_ok());
    }

    #[test]
    fn when_ability_is_used_then_cast_resolves_on_the_next_tick() {
        let mut room = Room::new(quiet_config());
        room.on_join("s1", "a", Clan::Ventrue).expect("join accepted");

        let out = room.handle_command(
            "s1",
            Command::UseAbility {
                ability_id: "batSwarm".to_string(),
                target_x: 0.0,
                target_y: 0.0,
            },
        );
        assert_eq!(out.len(), 1);
        assert!(room.world().projectiles.is_empty());

        room.tick(50.0);

        assert_eq!(room.world().projectiles.len(), 5);
        assert!(room.world().pending_casts.is_empty());
    }

    #[test]
    fn when_player_leaves_then_their_state_is_cleaned_up() {
        let mut room = Room::new(quiet_config());
        room.on_join("s1", "a", Clan::Ventrue).expect("join accepted");
        room.on_join("s2", "b", Clan::Tremere).expect("join accepted");
        let territory = room.world().territories[0].position;
        room.handle_command(
            "s1",
            Command::ClaimTerritory {
                territory_id: None,
                x: territory.x,
                y: territory.y,
            },
        );
        room.handle_command(
            "s1",
            Command::FormBloodPact {
                target_player_id: "s2".to_string(),
            },
        );

        assert!(room.on_leave("s1"));
        assert!(!room.on_leave("s1"));

        let world = room.world();
        assert!(world.territories.iter().all(|t| t.owner.is_none()));
        assert!(world.blood_pacts.is_empty());
        assert!(world.players["s2"].blood_pacts.is_empty());
    }

    #[test]
    fn when_publishing_then_patches_carry_only_new_changes() {
        let mut room = Room::new(quiet_config());
        room.on_join("s1", "a", Clan::Ventrue).expect("join accepted");

        let (first, snapshot) = room.publish();
        assert_eq!(first.players.added.len(), 1);
        assert!(snapshot.players.contains_key("s1"));

        let (second, _) = room.publish();
        assert!(second.is_empty());
    }
}
