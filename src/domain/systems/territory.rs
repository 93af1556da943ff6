// Environment updates: minion spawning from owned territories and blood pool
// decay and absorption.

use crate::domain::state::{Minion, Vec2, World, overlaps};
use crate::domain::systems::combat;
use crate::domain::tuning::enemy::MinionTuning;
use crate::domain::tuning::room::BLOOD_POOL_HEAL;
use rand::Rng;
use tracing::{debug, warn};

pub fn update(world: &mut World, rng: &mut impl Rng, dt_ms: f32) {
    spawn_minions(world, rng, dt_ms);
    decay_blood_pools(world, dt_ms);
    absorb_blood_pools(world);
}

/// Counts down every owned territory and spawns a minion when it elapses.
pub fn spawn_minions(world: &mut World, rng: &mut impl Rng, dt_ms: f32) {
    let tuning = MinionTuning::default();
    let mut due = Vec::new();

    for territory in &mut world.territories {
        let (Some(owner), Some(clan)) = (&territory.owner, territory.clan_id) else {
            continue;
        };
        territory.minion_timer -= dt_ms;
        if territory.minion_timer <= 0.0 {
            territory.minion_timer = territory.minion_spawn_rate;
            due.push((territory.position, owner.clone(), clan));
        }
    }

    for (center, owner_id, clan_id) in due {
        if world.minions.len() >= world.caps.minions {
            warn!(cap = world.caps.minions, "minion cap reached; dropping spawn");
            continue;
        }
        let jitter = tuning.spawn_jitter;
        let position = center
            + Vec2::new(
                rng.gen_range(-jitter..=jitter),
                rng.gen_range(-jitter..=jitter),
            );
        let id = world.next_id("minion");
        debug!(minion_id = %id, owner_id = %owner_id, "minion spawned");
        world.minions.insert(
            id.clone(),
            Minion {
                id,
                position,
                health: tuning.health,
                damage: tuning.damage,
                speed: tuning.speed,
                owner_id,
                clan_id,
                radius: tuning.radius,
            },
        );
    }
}

pub fn decay_blood_pools(world: &mut World, dt_ms: f32) {
    for pool in &mut world.blood_pools {
        pool.life_time -= dt_ms;
    }
    world.blood_pools.retain(|pool| pool.life_time > 0.0);
}

/// A living player touching a pool drinks it.
pub fn absorb_blood_pools(world: &mut World) {
    let pools = std::mem::take(&mut world.blood_pools);
    let mut remaining = Vec::with_capacity(pools.len());

    for pool in pools {
        let drinker = world
            .players
            .values_mut()
            .find(|p| !p.dead && overlaps(p.position, p.radius, pool.position, pool.radius));
        match drinker {
            Some(player) => {
                let amount = BLOOD_POOL_HEAL * player.healing_multiplier;
                let healed = combat::heal_player(player, amount);
                debug!(player_id = %player.id, pool_id = %pool.id, healed, "blood pool absorbed");
            }
            None => remaining.push(pool),
        }
    }
    world.blood_pools = remaining;
}
