// Domain-level world state: every entity record the room owns.
//
// Plain data plus a few lookups. Invariants are enforced by the systems that
// mutate these records, not here.

use crate::domain::tuning::abilities::{self, AbilityId, AbilityParams};
use crate::domain::tuning::clan::Clan;
use crate::domain::tuning::enemy::EnemyKind;
use crate::domain::tuning::room::{
    DAY_MODIFIERS, EntityCaps, MINION_SPAWN_RATE_MS, NIGHT_MODIFIERS, RoomConfig,
    TERRITORY_CELL_SIZE, TERRITORY_RADIUS, TimeOfDayModifiers,
};
use std::collections::BTreeMap;
use std::ops::{Add, Mul, Sub};

/// Transport-assigned identifier of a connected player.
pub type SessionId = String;
/// Room-assigned identifier of a non-player entity.
pub type EntityId = String;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    /// Unit vector, or `None` for a zero-length vector.
    pub fn normalized(self) -> Option<Vec2> {
        let len = self.length();
        (len > f32::EPSILON).then(|| Vec2::new(self.x / len, self.y / len))
    }

    pub fn from_angle(angle: f32) -> Vec2 {
        Vec2::new(angle.cos(), angle.sin())
    }

    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Circle overlap test used by every collision check.
pub fn overlaps(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> bool {
    a.distance(b) < a_radius + b_radius
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Day,
    Night,
}

impl TimeOfDay {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeOfDay::Day => "day",
            TimeOfDay::Night => "night",
        }
    }

    pub fn toggled(self) -> TimeOfDay {
        match self {
            TimeOfDay::Day => TimeOfDay::Night,
            TimeOfDay::Night => TimeOfDay::Day,
        }
    }

    pub fn modifiers(self) -> TimeOfDayModifiers {
        match self {
            TimeOfDay::Day => DAY_MODIFIERS,
            TimeOfDay::Night => NIGHT_MODIFIERS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ability {
    pub id: AbilityId,
    pub level: u32,
    /// Base cooldown in ms.
    pub cooldown: f32,
    /// Counts down to zero; the ability is ready at zero.
    pub cooldown_remaining: f32,
    pub energy_cost: f32,
    pub params: AbilityParams,
}

impl Ability {
    /// Level-1 record built from the tuning table.
    pub fn new(id: AbilityId) -> Self {
        let tuning = abilities::tuning(id);
        Self {
            id,
            level: 1,
            cooldown: tuning.cooldown,
            cooldown_remaining: 0.0,
            energy_cost: tuning.energy_cost,
            params: tuning.params,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: SessionId,
    pub username: String,
    pub position: Vec2,
    pub health: f32,
    pub max_health: f32,
    pub energy: f32,
    pub max_energy: f32,
    pub speed: f32,
    pub level: u32,
    pub experience: u32,
    pub clan: Clan,
    pub kills: u32,
    pub dead: bool,
    pub invulnerable: bool,
    /// Damage absorbed before health.
    pub shield: f32,
    pub damage_multiplier: f32,
    pub speed_multiplier: f32,
    pub ability_range_multiplier: f32,
    pub cooldown_reduction_multiplier: f32,
    pub healing_multiplier: f32,
    pub territory_count: u32,
    pub radius: f32,
    /// Simulation time (ms) of the last damage taken.
    pub last_damaged_time: f64,
    pub blood_pacts: Vec<EntityId>,
    pub abilities: Vec<Ability>,
}

impl Player {
    pub fn ability(&self, id: AbilityId) -> Option<&Ability> {
        self.abilities.iter().find(|a| a.id == id)
    }

    pub fn ability_mut(&mut self, id: AbilityId) -> Option<&mut Ability> {
        self.abilities.iter_mut().find(|a| a.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub id: EntityId,
    pub position: Vec2,
    pub kind: EnemyKind,
    pub health: f32,
    pub damage: f32,
    pub speed: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: EntityId,
    pub owner_id: SessionId,
    pub kind: AbilityId,
    pub position: Vec2,
    /// Units per second.
    pub velocity: Vec2,
    pub damage: f32,
    /// Hits left after the next one.
    pub pierce_count: u32,
    /// Remaining lifetime in ms.
    pub life_time: f32,
    pub radius: f32,
    /// Enemies already struck; a projectile hits each enemy once.
    pub hits: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Territory {
    pub id: EntityId,
    pub position: Vec2,
    pub radius: f32,
    pub owner: Option<SessionId>,
    pub clan_id: Option<Clan>,
    /// Countdown (ms) to the next minion spawn while owned.
    pub minion_timer: f32,
    pub minion_spawn_rate: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BloodPool {
    pub id: EntityId,
    pub position: Vec2,
    pub radius: f32,
    /// Remaining lifetime in ms.
    pub life_time: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minion {
    pub id: EntityId,
    pub position: Vec2,
    pub health: f32,
    pub damage: f32,
    pub speed: f32,
    pub owner_id: SessionId,
    pub clan_id: Clan,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BloodPact {
    pub id: EntityId,
    pub members: [SessionId; 2],
    pub cooldown_reduction: f32,
    pub damage_boost: f32,
}

impl BloodPact {
    pub fn involves(&self, session_id: &str) -> bool {
        self.members.iter().any(|m| m == session_id)
    }
}

/// Ability activation waiting for the next tick's combat pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCast {
    pub caster: SessionId,
    pub ability: AbilityId,
    pub level: u32,
    pub target: Vec2,
    pub params: AbilityParams,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EffectTarget {
    Player(SessionId),
    Enemy(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectKind {
    Invulnerable,
    Shield,
    /// Damage per second, attributed to the effect source.
    DamageOverTime { damage_per_second: f32 },
    Stun,
    /// Movement speed factor while slowed.
    Slow { factor: f32 },
}

/// Timed effect with its own countdown, independent of ability cooldowns.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveEffect {
    pub source: SessionId,
    pub ability: AbilityId,
    pub target: EffectTarget,
    pub kind: EffectKind,
    pub remaining_ms: f32,
}

/// The canonical room state.
#[derive(Debug, Clone)]
pub struct World {
    pub map_width: f32,
    pub map_height: f32,
    pub day_night_cycle: bool,
    pub current_time: TimeOfDay,
    /// Seconds between day/night toggles.
    pub day_night_duration: f32,

    pub players: BTreeMap<SessionId, Player>,
    pub enemies: BTreeMap<EntityId, Enemy>,
    pub projectiles: BTreeMap<EntityId, Projectile>,
    pub minions: BTreeMap<EntityId, Minion>,
    pub blood_pacts: BTreeMap<EntityId, BloodPact>,
    pub territories: Vec<Territory>,
    pub blood_pools: Vec<BloodPool>,

    // Simulation-only state (never replicated).
    pub pending_casts: Vec<PendingCast>,
    pub effects: Vec<ActiveEffect>,
    /// Monotonic simulation clock in ms.
    pub elapsed_ms: f64,
    pub caps: EntityCaps,
    next_id: u64,
}

impl World {
    pub fn new(config: &RoomConfig) -> Self {
        let size = config.map_size();
        let mut world = Self {
            map_width: size,
            map_height: size,
            day_night_cycle: config.day_night_cycle,
            current_time: TimeOfDay::Day,
            day_night_duration: config.day_night_duration.as_secs_f32(),
            players: BTreeMap::new(),
            enemies: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            minions: BTreeMap::new(),
            blood_pacts: BTreeMap::new(),
            territories: Vec::new(),
            blood_pools: Vec::new(),
            pending_casts: Vec::new(),
            effects: Vec::new(),
            elapsed_ms: 0.0,
            caps: config.caps,
            next_id: 1,
        };
        world.territories = world.territory_grid();
        world
    }

    fn territory_grid(&mut self) -> Vec<Territory> {
        let per_axis = ((self.map_width / TERRITORY_CELL_SIZE).floor() as usize + 1).max(2);
        let cell_w = self.map_width / per_axis as f32;
        let cell_h = self.map_height / per_axis as f32;
        let mut territories = Vec::with_capacity(per_axis * per_axis);
        for row in 0..per_axis {
            for col in 0..per_axis {
                territories.push(Territory {
                    id: self.next_id("territory"),
                    position: Vec2::new(
                        (col as f32 + 0.5) * cell_w,
                        (row as f32 + 0.5) * cell_h,
                    ),
                    radius: TERRITORY_RADIUS,
                    owner: None,
                    clan_id: None,
                    minion_timer: MINION_SPAWN_RATE_MS,
                    minion_spawn_rate: MINION_SPAWN_RATE_MS,
                });
            }
        }
        territories
    }

    /// Allocates a room-unique id such as `enemy-42`.
    pub fn next_id(&mut self, prefix: &str) -> EntityId {
        let id = format!("{prefix}-{}", self.next_id);
        self.next_id += 1;
        id
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| !p.dead)
    }

    pub fn territory_by_id(&self, id: &str) -> Option<&Territory> {
        self.territories.iter().find(|t| t.id == id)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.map_width / 2.0, self.map_height / 2.0)
    }

    pub fn clamp_to_map(&self, position: Vec2) -> Vec2 {
        Vec2::new(
            position.x.clamp(0.0, self.map_width),
            position.y.clamp(0.0, self.map_height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_world_is_created_then_map_scales_with_capacity_and_territories_start_neutral() {
        let world = World::new(&RoomConfig::default());

        assert_eq!(world.map_width, 7000.0);
        assert_eq!(world.map_height, 7000.0);
        // floor(7000 / 2000) + 1 = 4 territories per axis.
        assert_eq!(world.territories.len(), 16);
        assert!(
            world
                .territories
                .iter()
                .all(|t| t.owner.is_none() && t.clan_id.is_none())
        );
        assert_eq!(world.territories[0].position, Vec2::new(875.0, 875.0));
    }

    #[test]
    fn when_ids_are_allocated_then_they_never_repeat() {
        let mut world = World::new(&RoomConfig::default());
        let a = world.next_id("enemy");
        let b = world.next_id("enemy");
        assert_ne!(a, b);
    }

    #[test]
    fn when_vector_is_zero_then_normalized_is_none() {
        assert_eq!(Vec2::default().normalized(), None);
        assert_eq!(Vec2::new(3.0, 4.0).normalized(), Some(Vec2::new(0.6, 0.8)));
    }
}
