// Replicated view of the world and the per-tick patch between two views.
//
// Snapshots are immutable once captured; the room keeps the previous one and
// diffs the next against it, so patches only carry what changed.

use crate::domain::state::{
    BloodPact, BloodPool, Enemy, EntityId, Minion, Player, Projectile, Territory, TimeOfDay,
    World,
};
use std::collections::BTreeMap;

/// Anything stored in a replicated collection.
pub trait Keyed {
    fn key(&self) -> &str;
}

macro_rules! keyed {
    ($($ty:ty),* $(,)?) => {
        $(impl Keyed for $ty {
            fn key(&self) -> &str {
                &self.id
            }
        })*
    };
}

keyed!(Player, Enemy, Projectile, Minion, Territory, BloodPool, BloodPact);

/// World-level fields that are not part of any collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldMeta {
    pub map_width: f32,
    pub map_height: f32,
    pub day_night_cycle: bool,
    pub current_time: TimeOfDay,
    pub day_night_duration: f32,
}

/// Immutable copy of everything clients replicate.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub meta: WorldMeta,
    pub players: BTreeMap<EntityId, Player>,
    pub enemies: BTreeMap<EntityId, Enemy>,
    pub projectiles: BTreeMap<EntityId, Projectile>,
    pub minions: BTreeMap<EntityId, Minion>,
    pub territories: BTreeMap<EntityId, Territory>,
    pub blood_pools: BTreeMap<EntityId, BloodPool>,
    pub blood_pacts: BTreeMap<EntityId, BloodPact>,
}

fn by_key<T: Keyed + Clone>(items: &[T]) -> BTreeMap<EntityId, T> {
    items
        .iter()
        .map(|item| (item.key().to_string(), item.clone()))
        .collect()
}

impl WorldSnapshot {
    pub fn capture(world: &World, tick: u64) -> Self {
        Self {
            tick,
            meta: WorldMeta {
                map_width: world.map_width,
                map_height: world.map_height,
                day_night_cycle: world.day_night_cycle,
                current_time: world.current_time,
                day_night_duration: world.day_night_duration,
            },
            players: world.players.clone(),
            enemies: world.enemies.clone(),
            projectiles: world.projectiles.clone(),
            minions: world.minions.clone(),
            territories: by_key(&world.territories),
            blood_pools: by_key(&world.blood_pools),
            blood_pacts: world.blood_pacts.clone(),
        }
    }

    /// A snapshot with no entities, used as the base of the first patch.
    pub fn empty(meta: WorldMeta) -> Self {
        Self {
            tick: 0,
            meta,
            players: BTreeMap::new(),
            enemies: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            minions: BTreeMap::new(),
            territories: BTreeMap::new(),
            blood_pools: BTreeMap::new(),
            blood_pacts: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionDiff<T> {
    pub added: Vec<T>,
    pub changed: Vec<T>,
    pub removed: Vec<EntityId>,
}

impl<T> Default for CollectionDiff<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            changed: Vec::new(),
            removed: Vec::new(),
        }
    }
}

impl<T> CollectionDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

fn diff_collection<T: Clone + PartialEq>(
    prev: &BTreeMap<EntityId, T>,
    next: &BTreeMap<EntityId, T>,
) -> CollectionDiff<T> {
    let mut diff = CollectionDiff::default();
    for (id, item) in next {
        match prev.get(id) {
            None => diff.added.push(item.clone()),
            Some(old) if old != item => diff.changed.push(item.clone()),
            Some(_) => {}
        }
    }
    diff.removed = prev
        .keys()
        .filter(|id| !next.contains_key(*id))
        .cloned()
        .collect();
    diff
}

/// Everything that changed between two snapshots.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatePatch {
    pub tick: u64,
    /// Present only when a world-level field changed.
    pub meta: Option<WorldMeta>,
    pub players: CollectionDiff<Player>,
    pub enemies: CollectionDiff<Enemy>,
    pub projectiles: CollectionDiff<Projectile>,
    pub minions: CollectionDiff<Minion>,
    pub territories: CollectionDiff<Territory>,
    pub blood_pools: CollectionDiff<BloodPool>,
    pub blood_pacts: CollectionDiff<BloodPact>,
}

impl StatePatch {
    pub fn is_empty(&self) -> bool {
        self.meta.is_none()
            && self.players.is_empty()
            && self.enemies.is_empty()
            && self.projectiles.is_empty()
            && self.minions.is_empty()
            && self.territories.is_empty()
            && self.blood_pools.is_empty()
            && self.blood_pacts.is_empty()
    }
}

pub fn diff(prev: &WorldSnapshot, next: &WorldSnapshot) -> StatePatch {
    StatePatch {
        tick: next.tick,
        meta: (prev.meta != next.meta).then_some(next.meta),
        players: diff_collection(&prev.players, &next.players),
        enemies: diff_collection(&prev.enemies, &next.enemies),
        projectiles: diff_collection(&prev.projectiles, &next.projectiles),
        minions: diff_collection(&prev.minions, &next.minions),
        territories: diff_collection(&prev.territories, &next.territories),
        blood_pools: diff_collection(&prev.blood_pools, &next.blood_pools),
        blood_pacts: diff_collection(&prev.blood_pacts, &next.blood_pacts),
    }
}
