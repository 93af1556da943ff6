// Enemy spawn policy and out-of-bounds culling.

use crate::domain::state::{Enemy, EntityId, Vec2, World};
use crate::domain::tuning::enemy::EnemyKind;
use crate::domain::tuning::room::{
    ENEMY_CULL_MARGIN, ENEMY_SPAWN_MAX_DISTANCE, ENEMY_SPAWN_MIN_DISTANCE,
};
use rand::Rng;
use rand::seq::SliceRandom;
use std::f32::consts::TAU;
use tracing::{debug, warn};

pub fn build_enemy(id: EntityId, kind: EnemyKind, position: Vec2) -> Enemy {
    let tuning = kind.tuning();
    Enemy {
        id,
        position,
        kind,
        health: tuning.health,
        damage: tuning.damage,
        speed: tuning.speed,
        radius: tuning.radius,
    }
}

/// Enemies per wave for the current player count.
pub fn wave_size(player_count: usize) -> usize {
    (player_count / 2).max(1)
}

/// Rolls the per-tick spawn chance and places a wave around random living
/// players. Returns how many enemies were added.
pub fn maybe_spawn_wave(world: &mut World, rng: &mut impl Rng, chance: f64) -> usize {
    if world.players.is_empty() || !rng.gen_bool(chance.clamp(0.0, 1.0)) {
        return 0;
    }
    spawn_wave(world, rng)
}

pub fn spawn_wave(world: &mut World, rng: &mut impl Rng) -> usize {
    let anchors: Vec<Vec2> = world.alive_players().map(|p| p.position).collect();
    if anchors.is_empty() {
        return 0;
    }

    let count = wave_size(world.players.len());
    let mut spawned = 0;
    for _ in 0..count {
        if world.enemies.len() >= world.caps.enemies {
            warn!(cap = world.caps.enemies, "enemy cap reached; dropping spawn");
            break;
        }
        let Some(anchor) = anchors.choose(rng).copied() else {
            break;
        };
        let angle = rng.gen_range(0.0..TAU);
        let distance = rng.gen_range(ENEMY_SPAWN_MIN_DISTANCE..=ENEMY_SPAWN_MAX_DISTANCE);
        let position = anchor + Vec2::from_angle(angle) * distance;
        let Some(kind) = EnemyKind::ALL.choose(rng).copied() else {
            break;
        };

        let id = world.next_id("enemy");
        world.enemies.insert(id.clone(), build_enemy(id, kind, position));
        spawned += 1;
    }
    debug!(spawned, "enemy wave spawned");
    spawned
}

/// Removes enemies that wandered too far outside the map.
pub fn cull_out_of_bounds(world: &mut World) -> usize {
    let (width, height) = (world.map_width, world.map_height);
    let before = world.enemies.len();
    world.enemies.retain(|_, e| {
        let p = e.position;
        p.x >= -ENEMY_CULL_MARGIN
            && p.y >= -ENEMY_CULL_MARGIN
            && p.x <= width + ENEMY_CULL_MARGIN
            && p.y <= height + ENEMY_CULL_MARGIN
    });
    let culled = before - world.enemies.len();
    if culled > 0 {
        debug!(culled, "culled out-of-bounds enemies");
    }
    culled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::systems::test_support::{add_player, world};
    use crate::domain::tuning::clan::Clan;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn when_player_count_varies_then_wave_size_is_half_with_a_floor_of_one() {
        assert_eq!(wave_size(1), 1);
        assert_eq!(wave_size(2), 1);
        assert_eq!(wave_size(5), 2);
        assert_eq!(wave_size(10), 5);
    }

    #[test]
    fn when_wave_spawns_then_enemies_land_within_the_spawn_ring() {
        let mut w = world();
        let mut rng = StdRng::seed_from_u64(11);
        for id in ["p1", "p2", "p3", "p4"] {
            add_player(&mut w, id, Clan::Ventrue);
        }
        let anchor = w.center();

        let spawned = spawn_wave(&mut w, &mut rng);

        assert_eq!(spawned, 2);
        assert_eq!(w.enemies.len(), 2);
        for e in w.enemies.values() {
            let d = e.position.distance(anchor);
            assert!((499.0..=801.0).contains(&d), "distance {d}");
            assert_eq!(e.health, e.kind.tuning().health);
        }
    }

    #[test]
    fn when_chance_is_zero_or_room_is_empty_then_nothing_spawns() {
        let mut w = world();
        let mut rng = StdRng::seed_from_u64(11);
        assert_eq!(maybe_spawn_wave(&mut w, &mut rng, 1.0), 0);

        add_player(&mut w, "p1", Clan::Ventrue);
        assert_eq!(maybe_spawn_wave(&mut w, &mut rng, 0.0), 0);
        assert_eq!(maybe_spawn_wave(&mut w, &mut rng, 1.0), 1);
    }

    #[test]
    fn when_enemy_cap_is_reached_then_wave_is_dropped() {
        let mut w = world();
        w.caps.enemies = 0;
        let mut rng = StdRng::seed_from_u64(11);
        add_player(&mut w, "p1", Clan::Ventrue);

        assert_eq!(spawn_wave(&mut w, &mut rng), 0);
        assert!(w.enemies.is_empty());
    }

    #[test]
    fn when_enemy_is_far_outside_the_map_then_it_is_culled() {
        let mut w = world();
        let inside = build_enemy("enemy-a".to_string(), EnemyKind::Basic, Vec2::new(-900.0, 10.0));
        let outside = build_enemy("enemy-b".to_string(), EnemyKind::Basic, Vec2::new(-1500.0, 10.0));
        w.enemies.insert(inside.id.clone(), inside);
        w.enemies.insert(outside.id.clone(), outside);

        assert_eq!(cull_out_of_bounds(&mut w), 1);
        assert!(w.enemies.contains_key("enemy-a"));
    }
}
