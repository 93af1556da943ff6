// Per-room gameplay configuration. Runtime plumbing (ports, channel sizes)
// lives in `frameworks::config` instead.
use std::time::Duration;

/// Settings a room is created with.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Maximum concurrent players; also scales the map.
    pub max_clients: usize,
    /// Whether the day/night timer toggles the time of day.
    pub day_night_cycle: bool,
    /// Period of the day/night toggle.
    pub day_night_duration: Duration,
    /// Survival time that wins the match (zero disables victory).
    pub victory_time_limit: Duration,
    /// Per-tick probability of an enemy spawn wave.
    pub enemy_spawn_chance: f64,
    /// Seed for the room RNG; `None` seeds from entropy.
    pub seed: Option<u64>,
    pub caps: EntityCaps,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_clients: 10,
            day_night_cycle: true,
            day_night_duration: Duration::from_secs(300),
            victory_time_limit: Duration::ZERO,
            enemy_spawn_chance: 0.05,
            seed: None,
            caps: EntityCaps::default(),
        }
    }
}

impl RoomConfig {
    /// Square map side length derived from player capacity.
    pub fn map_size(&self) -> f32 {
        2000.0 + self.max_clients as f32 * 500.0
    }
}

/// Upper bounds on live entities; spawns past a cap are dropped.
#[derive(Debug, Clone, Copy)]
pub struct EntityCaps {
    pub enemies: usize,
    pub projectiles: usize,
    pub minions: usize,
    pub blood_pools: usize,
}

impl Default for EntityCaps {
    fn default() -> Self {
        Self {
            enemies: 300,
            projectiles: 600,
            minions: 150,
            blood_pools: 200,
        }
    }
}

/// Baseline stats for every player before clan deltas.
#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    pub max_health: f32,
    pub max_energy: f32,
    /// Units per second.
    pub speed: f32,
    /// World-space collision radius.
    pub radius: f32,
    /// Energy regained per second.
    pub energy_regen: f32,
    /// Max offset from the map center when spawning.
    pub spawn_jitter: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            max_energy: 100.0,
            speed: 200.0,
            radius: 20.0,
            energy_regen: 5.0,
            spawn_jitter: 200.0,
        }
    }
}

/// Combat multipliers applied to every player for a time of day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeOfDayModifiers {
    pub damage_multiplier: f32,
    pub speed_multiplier: f32,
}

pub const DAY_MODIFIERS: TimeOfDayModifiers = TimeOfDayModifiers {
    damage_multiplier: 0.7,
    speed_multiplier: 0.8,
};

pub const NIGHT_MODIFIERS: TimeOfDayModifiers = TimeOfDayModifiers {
    damage_multiplier: 1.2,
    speed_multiplier: 1.1,
};

/// Territory layout and spawn timing.
pub const TERRITORY_RADIUS: f32 = 100.0;
pub const TERRITORY_CELL_SIZE: f32 = 2000.0;
pub const MINION_SPAWN_RATE_MS: f32 = 15000.0;
/// Healing multiplier gained per claimed territory.
pub const TERRITORY_HEALING_BONUS: f32 = 0.1;

/// Blood pools left behind by deaths.
pub const BLOOD_POOL_RADIUS: f32 = 20.0;
pub const BLOOD_POOL_LIFETIME_MS: f32 = 30000.0;
pub const BLOOD_POOL_HEAL: f32 = 15.0;

/// Bonuses granted by a blood pact to both members.
pub const PACT_COOLDOWN_REDUCTION: f32 = 0.1;
pub const PACT_DAMAGE_BOOST: f32 = 0.1;

/// Enemy waves spawn this far from a random player.
pub const ENEMY_SPAWN_MIN_DISTANCE: f32 = 500.0;
pub const ENEMY_SPAWN_MAX_DISTANCE: f32 = 800.0;
/// Enemies beyond this margin outside the map are culled.
pub const ENEMY_CULL_MARGIN: f32 = 1000.0;

/// Experience needed per level (multiplied by the current level).
pub const EXPERIENCE_PER_LEVEL: u32 = 100;
pub const MAX_HEALTH_PER_LEVEL: f32 = 10.0;
