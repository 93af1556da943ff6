// Per-tick collision detection and damage application.

use crate::domain::events::{Outbound, RoomMessage};
use crate::domain::state::{BloodPool, Enemy, EntityId, Player, Vec2, World, overlaps};
use crate::domain::systems::{abilities, progression};
use crate::domain::tuning::room::{BLOOD_POOL_LIFETIME_MS, BLOOD_POOL_RADIUS};
use tracing::{debug, info, warn};

/// Result of damaging a single enemy.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyHit {
    /// Damage applied (the full hit, before the health floor).
    pub dealt: f32,
    /// The removed enemy when the hit was lethal.
    pub killed: Option<Enemy>,
}

/// Runs the combat stage of a tick in its fixed order.
pub fn resolve(world: &mut World, dt_ms: f32, out: &mut Vec<Outbound>) {
    tick_projectiles(world, dt_ms);
    enemy_contact(world, out);
    minion_contact(world);
    abilities::resolve_casts(world, out);
}

/// Applies damage to a player, respecting invulnerability and shields.
///
/// Returns `true` only for the hit that kills the player.
pub fn damage_player(player: &mut Player, amount: f32, now_ms: f64) -> bool {
    if player.dead || player.invulnerable || amount <= 0.0 {
        return false;
    }

    let absorbed = amount.min(player.shield);
    player.shield -= absorbed;
    let rest = amount - absorbed;

    player.last_damaged_time = now_ms;
    player.health = (player.health - rest).max(0.0);
    if player.health <= 0.0 {
        player.health = 0.0;
        player.dead = true;
        return true;
    }
    false
}

/// Heals a living player up to max health; returns the amount restored.
pub fn heal_player(player: &mut Player, amount: f32) -> f32 {
    if player.dead || amount <= 0.0 {
        return 0.0;
    }
    let before = player.health;
    player.health = (player.health + amount).min(player.max_health);
    player.health - before
}

/// Damages an enemy and handles its death: removal, kill credit and an
/// optional blood pool.
pub fn damage_enemy(
    world: &mut World,
    enemy_id: &str,
    amount: f32,
    attacker: Option<&str>,
    leave_blood_pool: bool,
) -> Option<EnemyHit> {
    let enemy = world.enemies.get_mut(enemy_id)?;
    enemy.health -= amount;
    if enemy.health > 0.0 {
        return Some(EnemyHit {
            dealt: amount,
            killed: None,
        });
    }

    let enemy = world.enemies.remove(enemy_id)?;
    if let Some(player) = attacker.and_then(|id| world.players.get_mut(id)) {
        progression::award_kill(player, enemy.kind);
    }
    if leave_blood_pool {
        deposit_blood_pool(world, enemy.position);
    }
    debug!(
        enemy_id = %enemy.id,
        kind = enemy.kind.as_str(),
        killer = attacker.unwrap_or("none"),
        "enemy killed"
    );

    Some(EnemyHit {
        dealt: amount,
        killed: Some(enemy),
    })
}

pub fn deposit_blood_pool(world: &mut World, position: Vec2) {
    if world.blood_pools.len() >= world.caps.blood_pools {
        warn!(cap = world.caps.blood_pools, "blood pool cap reached; dropping pool");
        return;
    }
    let id = world.next_id("pool");
    world.blood_pools.push(BloodPool {
        id,
        position,
        radius: BLOOD_POOL_RADIUS,
        life_time: BLOOD_POOL_LIFETIME_MS,
    });
}

/// Moves projectiles, expires them and resolves hits against enemies.
pub fn tick_projectiles(world: &mut World, dt_ms: f32) {
    let dt = dt_ms / 1000.0;
    let ids: Vec<EntityId> = world.projectiles.keys().cloned().collect();

    for id in ids {
        let Some(projectile) = world.projectiles.get_mut(&id) else {
            continue;
        };
        projectile.position = projectile.position + projectile.velocity * dt;
        projectile.life_time -= dt_ms;
        if projectile.life_time <= 0.0 {
            world.projectiles.remove(&id);
            continue;
        }

        let projectile = projectile.clone();
        let struck: Vec<EntityId> = world
            .enemies
            .values()
            .filter(|e| !projectile.hits.contains(&e.id))
            .filter(|e| overlaps(e.position, e.radius, projectile.position, projectile.radius))
            .map(|e| e.id.clone())
            .collect();

        let mut spent = false;
        for enemy_id in struck {
            damage_enemy(
                world,
                &enemy_id,
                projectile.damage,
                Some(&projectile.owner_id),
                false,
            );
            let Some(live) = world.projectiles.get_mut(&id) else {
                break;
            };
            live.hits.push(enemy_id);
            if live.pierce_count == 0 {
                spent = true;
                break;
            }
            live.pierce_count -= 1;
        }

        if spent {
            world.projectiles.remove(&id);
        }
    }
}

/// Enemies deal their contact damage to every player they overlap.
pub fn enemy_contact(world: &mut World, out: &mut Vec<Outbound>) {
    let now = world.elapsed_ms;
    let mut fallen: Vec<Vec2> = Vec::new();

    for player in world.players.values_mut() {
        if player.dead {
            continue;
        }
        for enemy in world.enemies.values() {
            if !overlaps(player.position, player.radius, enemy.position, enemy.radius) {
                continue;
            }
            if damage_player(player, enemy.damage, now) {
                info!(player_id = %player.id, enemy_id = %enemy.id, "player died");
                out.push(Outbound::to_all(RoomMessage::PlayerDied {
                    player_id: player.id.clone(),
                }));
                fallen.push(player.position);
                break;
            }
        }
    }

    for position in fallen {
        deposit_blood_pool(world, position);
    }
}

/// Minions and enemies that overlap trade contact damage.
pub fn minion_contact(world: &mut World) {
    let minion_ids: Vec<EntityId> = world.minions.keys().cloned().collect();

    for minion_id in minion_ids {
        let Some(minion) = world.minions.get(&minion_id).cloned() else {
            continue;
        };
        let opponents: Vec<(EntityId, f32)> = world
            .enemies
            .values()
            .filter(|e| overlaps(e.position, e.radius, minion.position, minion.radius))
            .map(|e| (e.id.clone(), e.damage))
            .collect();
        if opponents.is_empty() {
            continue;
        }

        let mut incoming = 0.0;
        for (enemy_id, enemy_damage) in opponents {
            incoming += enemy_damage;
            damage_enemy(world, &enemy_id, minion.damage, Some(&minion.owner_id), false);
        }

        if let Some(live) = world.minions.get_mut(&minion_id) {
            live.health -= incoming;
            if live.health <= 0.0 {
                world.minions.remove(&minion_id);
                debug!(minion_id = %minion_id, "minion destroyed");
            }
        }
    }
}
