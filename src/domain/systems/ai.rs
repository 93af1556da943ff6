// Chase movement for enemies and minions.
//
// Targets are re-evaluated from scratch every tick; there is no persistent
// targeting, so a chaser may alternate between equally distant targets.

use crate::domain::state::{EntityId, Vec2, World};
use crate::domain::systems::abilities;
use crate::domain::tuning::enemy::CHASE_STOP_DISTANCE;

/// Moves every enemy toward the nearest living player and every minion
/// toward the nearest enemy.
pub fn update(world: &mut World, dt_ms: f32) {
    move_enemies(world, dt_ms);
    move_minions(world, dt_ms);
}

/// One step from `from` toward `to`, or `None` when already close enough.
pub fn chase_step(from: Vec2, to: Vec2, speed: f32, dt_ms: f32) -> Option<Vec2> {
    let offset = to - from;
    if offset.length() <= CHASE_STOP_DISTANCE {
        return None;
    }
    let direction = offset.normalized()?;
    Some(from + direction * (speed * dt_ms / 1000.0))
}

fn nearest(from: Vec2, candidates: impl Iterator<Item = Vec2>) -> Option<Vec2> {
    candidates.min_by(|a, b| from.distance(*a).total_cmp(&from.distance(*b)))
}

fn move_enemies(world: &mut World, dt_ms: f32) {
    let targets: Vec<Vec2> = world.alive_players().map(|p| p.position).collect();
    if targets.is_empty() {
        return;
    }

    let ids: Vec<EntityId> = world.enemies.keys().cloned().collect();
    for id in ids {
        let factor = abilities::enemy_movement_factor(world, &id);
        if factor <= 0.0 {
            continue;
        }
        let Some(enemy) = world.enemies.get_mut(&id) else {
            continue;
        };
        let Some(target) = nearest(enemy.position, targets.iter().copied()) else {
            continue;
        };
        if let Some(next) = chase_step(enemy.position, target, enemy.speed * factor, dt_ms) {
            enemy.position = next;
        }
    }
}

fn move_minions(world: &mut World, dt_ms: f32) {
    if world.enemies.is_empty() {
        return;
    }
    let targets: Vec<Vec2> = world.enemies.values().map(|e| e.position).collect();

    for minion in world.minions.values_mut() {
        let Some(target) = nearest(minion.position, targets.iter().copied()) else {
            continue;
        };
        if let Some(next) = chase_step(minion.position, target, minion.speed, dt_ms) {
            minion.position = next;
        }
    }
}
