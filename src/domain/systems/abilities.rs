// Ability effect engine: cooldown bookkeeping, queued cast resolution and
// timed effects (shields, invulnerability, damage over time, crowd control).
//
// Each ability is a strategy behind `AbilityEffect`; `effect_for` is the
// lookup table keyed by the closed `AbilityId` set.

use crate::domain::events::Outbound;
use crate::domain::state::{
    ActiveEffect, EffectKind, EffectTarget, EntityId, PendingCast, Player, Projectile, SessionId,
    Vec2, World,
};
use crate::domain::systems::combat;
use crate::domain::tuning::abilities::{
    ABILITY_PROJECTILE_RADIUS, AbilityId, BAT_SWARM_SPREAD, BLOOD_DRAIN_HEAL_RATIO,
    DAMAGE_PER_LEVEL, MIN_COOLDOWN_FACTOR,
};
use tracing::{debug, warn};

/// What a single cast did, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EffectOutcome {
    pub damage_dealt: f32,
    /// Healing owed to the caster before the max-health clamp.
    pub healing_requested: f32,
    /// Healing actually applied.
    pub healing_applied: f32,
    pub kills: u32,
    pub projectiles_spawned: u32,
}

pub trait AbilityEffect {
    fn apply(&self, world: &mut World, cast: &PendingCast) -> EffectOutcome;
}

struct BloodDrain;
struct BatSwarm;
struct ShadowDash;
struct BloodLance;
struct NightShield;
struct PoisonTouch;
struct BloodRitual;
struct Dominate;
struct Mesmerize;

pub fn effect_for(id: AbilityId) -> &'static dyn AbilityEffect {
    match id {
        AbilityId::BloodDrain => &BloodDrain,
        AbilityId::BatSwarm => &BatSwarm,
        AbilityId::ShadowDash => &ShadowDash,
        AbilityId::BloodLance => &BloodLance,
        AbilityId::NightShield => &NightShield,
        AbilityId::PoisonTouch => &PoisonTouch,
        AbilityId::BloodRitual => &BloodRitual,
        AbilityId::Dominate => &Dominate,
        AbilityId::Mesmerize => &Mesmerize,
    }
}

/// Sum of (cooldown reduction, damage boost) from every pact the player is in.
pub fn pact_bonuses(world: &World, player_id: &str) -> (f32, f32) {
    world
        .blood_pacts
        .values()
        .filter(|pact| pact.involves(player_id))
        .fold((0.0, 0.0), |(cd, dmg), pact| {
            (cd + pact.cooldown_reduction, dmg + pact.damage_boost)
        })
}

/// Cooldown to start after a successful activation, never above the base.
pub fn effective_cooldown(player: &Player, base_cooldown: f32, pact_reduction: f32) -> f32 {
    let factor = (player.cooldown_reduction_multiplier * (1.0 - pact_reduction))
        .clamp(MIN_COOLDOWN_FACTOR, 1.0);
    base_cooldown * factor
}

/// Counts cooldowns down and regenerates energy.
pub fn tick_cooldowns(world: &mut World, dt_ms: f32, energy_regen_per_sec: f32) {
    for player in world.players.values_mut() {
        for ability in &mut player.abilities {
            ability.cooldown_remaining = (ability.cooldown_remaining - dt_ms).max(0.0);
        }
        if !player.dead {
            player.energy =
                (player.energy + energy_regen_per_sec * dt_ms / 1000.0).min(player.max_energy);
        }
    }
}

/// Applies every cast queued since the previous tick.
pub fn resolve_casts(world: &mut World, _out: &mut Vec<Outbound>) {
    let casts = std::mem::take(&mut world.pending_casts);
    for cast in casts {
        let caster_alive = world.player(&cast.caster).is_some_and(|p| !p.dead);
        if !caster_alive {
            debug!(caster = %cast.caster, ability = %cast.ability, "cast dropped; caster gone");
            continue;
        }
        let outcome = effect_for(cast.ability).apply(world, &cast);
        debug!(
            caster = %cast.caster,
            ability = %cast.ability,
            damage = outcome.damage_dealt,
            healing = outcome.healing_applied,
            kills = outcome.kills,
            "ability resolved"
        );
    }
}

/// Advances timed effects: damage over time, expiry and flag cleanup.
pub fn tick_effects(world: &mut World, dt_ms: f32) {
    let mut dot_hits: Vec<(EntityId, f32, SessionId)> = Vec::new();
    for effect in &mut world.effects {
        let active_ms = effect.remaining_ms.min(dt_ms).max(0.0);
        effect.remaining_ms -= dt_ms;
        if let (EffectKind::DamageOverTime { damage_per_second }, EffectTarget::Enemy(id)) =
            (effect.kind, &effect.target)
        {
            dot_hits.push((
                id.clone(),
                damage_per_second * active_ms / 1000.0,
                effect.source.clone(),
            ));
        }
    }

    for (enemy_id, amount, source) in dot_hits {
        combat::damage_enemy(world, &enemy_id, amount, Some(&source), false);
    }

    let effects = std::mem::take(&mut world.effects);
    let (kept, ended): (Vec<_>, Vec<_>) = effects.into_iter().partition(|e| {
        let target_exists = match &e.target {
            EffectTarget::Player(id) => world.players.contains_key(id),
            EffectTarget::Enemy(id) => world.enemies.contains_key(id),
        };
        e.remaining_ms > 0.0 && target_exists
    });
    world.effects = kept;

    for effect in ended {
        if let EffectTarget::Player(id) = effect.target {
            refresh_player_flags(world, &id);
        }
    }
}

/// Movement factor for an enemy under crowd control (0 when stunned).
pub fn enemy_movement_factor(world: &World, enemy_id: &str) -> f32 {
    world
        .effects
        .iter()
        .filter(|e| matches!(&e.target, EffectTarget::Enemy(id) if id == enemy_id))
        .fold(1.0_f32, |factor, e| match e.kind {
            EffectKind::Stun => 0.0,
            EffectKind::Slow { factor: slow } => factor.min(slow),
            _ => factor,
        })
}

/// Drops queued casts and effects tied to a departing player.
pub fn cancel_for_player(world: &mut World, session_id: &str) {
    world.pending_casts.retain(|c| c.caster != session_id);
    world.effects.retain(|e| {
        e.source != session_id && !matches!(&e.target, EffectTarget::Player(id) if id == session_id)
    });
}

fn refresh_player_flags(world: &mut World, player_id: &str) {
    let targets_player = |e: &&ActiveEffect| matches!(&e.target, EffectTarget::Player(id) if id == player_id);
    let invulnerable = world
        .effects
        .iter()
        .filter(targets_player)
        .any(|e| e.kind == EffectKind::Invulnerable);
    let shielded = world
        .effects
        .iter()
        .filter(targets_player)
        .any(|e| e.kind == EffectKind::Shield);

    if let Some(player) = world.players.get_mut(player_id) {
        player.invulnerable = invulnerable;
        if !shielded {
            player.shield = 0.0;
        }
    }
}

/// Caster-derived scaling captured at resolution time.
struct CasterStats {
    position: Vec2,
    damage_scale: f32,
    range_scale: f32,
}

fn caster_stats(world: &World, cast: &PendingCast) -> Option<CasterStats> {
    let player = world.player(&cast.caster)?;
    let (_, pact_damage) = pact_bonuses(world, &cast.caster);
    let level_bonus = 1.0 + DAMAGE_PER_LEVEL * cast.level.saturating_sub(1) as f32;
    Some(CasterStats {
        position: player.position,
        damage_scale: player.damage_multiplier * (1.0 + pact_damage) * level_bonus,
        range_scale: player.ability_range_multiplier,
    })
}

fn enemies_within(world: &World, center: Vec2, radius: f32) -> Vec<EntityId> {
    world
        .enemies
        .values()
        .filter(|e| e.position.distance(center) <= radius)
        .map(|e| e.id.clone())
        .collect()
}

fn aim(from: Vec2, to: Vec2) -> Vec2 {
    (to - from).normalized().unwrap_or(Vec2::new(1.0, 0.0))
}

/// Pulls `to` back along the aim line so it is at most `reach` from `from`.
fn within_reach(from: Vec2, to: Vec2, reach: f32) -> Vec2 {
    if from.distance(to) <= reach {
        to
    } else {
        from + aim(from, to) * reach
    }
}

fn targeted_center(cast: &PendingCast, stats: &CasterStats) -> Vec2 {
    match cast.params.cast_range {
        Some(range) => within_reach(stats.position, cast.target, range * stats.range_scale),
        None => cast.target,
    }
}

/// Damages every enemy in the circle; returns the outcome and the survivors.
fn strike_area(
    world: &mut World,
    caster: &str,
    center: Vec2,
    radius: f32,
    damage: f32,
    leave_blood_pools: bool,
) -> (EffectOutcome, Vec<EntityId>) {
    let mut outcome = EffectOutcome::default();
    let mut survivors = Vec::new();
    for enemy_id in enemies_within(world, center, radius) {
        let Some(hit) = combat::damage_enemy(world, &enemy_id, damage, Some(caster), leave_blood_pools)
        else {
            continue;
        };
        outcome.damage_dealt += hit.dealt;
        if hit.killed.is_some() {
            outcome.kills += 1;
        } else {
            survivors.push(enemy_id);
        }
    }
    (outcome, survivors)
}

fn attach_to_enemies(
    world: &mut World,
    cast: &PendingCast,
    enemies: Vec<EntityId>,
    kind: EffectKind,
    duration_ms: f32,
) {
    for enemy_id in enemies {
        world.effects.push(ActiveEffect {
            source: cast.caster.clone(),
            ability: cast.ability,
            target: EffectTarget::Enemy(enemy_id),
            kind,
            remaining_ms: duration_ms,
        });
    }
}

fn spawn_projectiles(
    world: &mut World,
    cast: &PendingCast,
    stats: &CasterStats,
    directions: &[Vec2],
) -> u32 {
    let params = cast.params;
    let speed = params.speed.unwrap_or(0.0);
    let damage = params.damage.unwrap_or(0.0) * stats.damage_scale;
    let mut spawned = 0;
    for direction in directions {
        if world.projectiles.len() >= world.caps.projectiles {
            warn!(cap = world.caps.projectiles, "projectile cap reached; dropping projectile");
            break;
        }
        let id = world.next_id("proj");
        world.projectiles.insert(
            id.clone(),
            Projectile {
                id,
                owner_id: cast.caster.clone(),
                kind: cast.ability,
                position: stats.position,
                velocity: *direction * speed,
                damage,
                pierce_count: params.pierce.unwrap_or(0),
                life_time: params.life_time.unwrap_or(0.0),
                radius: ABILITY_PROJECTILE_RADIUS,
                hits: Vec::new(),
            },
        );
        spawned += 1;
    }
    spawned
}

impl AbilityEffect for BloodDrain {
    fn apply(&self, world: &mut World, cast: &PendingCast) -> EffectOutcome {
        let Some(stats) = caster_stats(world, cast) else {
            return EffectOutcome::default();
        };
        let range = cast.params.range.unwrap_or(0.0) * stats.range_scale;
        let damage = cast.params.damage.unwrap_or(0.0) * stats.damage_scale;

        let (mut outcome, _) = strike_area(world, &cast.caster, stats.position, range, damage, true);

        // Healing is applied once, after every enemy in range was processed.
        outcome.healing_requested = outcome.damage_dealt * BLOOD_DRAIN_HEAL_RATIO;
        if let Some(caster) = world.players.get_mut(&cast.caster) {
            outcome.healing_applied = combat::heal_player(caster, outcome.healing_requested);
        }
        outcome
    }
}

impl AbilityEffect for BatSwarm {
    fn apply(&self, world: &mut World, cast: &PendingCast) -> EffectOutcome {
        let Some(stats) = caster_stats(world, cast) else {
            return EffectOutcome::default();
        };
        let count = cast.params.count.unwrap_or(1.0).max(1.0) as usize;
        let base = aim(stats.position, cast.target).angle();
        let middle = (count - 1) as f32 / 2.0;
        let directions: Vec<Vec2> = (0..count)
            .map(|i| Vec2::from_angle(base + (i as f32 - middle) * BAT_SWARM_SPREAD))
            .collect();

        EffectOutcome {
            projectiles_spawned: spawn_projectiles(world, cast, &stats, &directions),
            ..Default::default()
        }
    }
}

impl AbilityEffect for BloodLance {
    fn apply(&self, world: &mut World, cast: &PendingCast) -> EffectOutcome {
        let Some(stats) = caster_stats(world, cast) else {
            return EffectOutcome::default();
        };
        let direction = aim(stats.position, cast.target);

        EffectOutcome {
            projectiles_spawned: spawn_projectiles(world, cast, &stats, &[direction]),
            ..Default::default()
        }
    }
}

impl AbilityEffect for ShadowDash {
    fn apply(&self, world: &mut World, cast: &PendingCast) -> EffectOutcome {
        let Some(stats) = caster_stats(world, cast) else {
            return EffectOutcome::default();
        };
        let distance = cast.params.distance.unwrap_or(0.0);
        let destination = world.clamp_to_map(stats.position + aim(stats.position, cast.target) * distance);

        if let Some(player) = world.players.get_mut(&cast.caster) {
            player.position = destination;
            player.invulnerable = true;
        }
        world.effects.push(ActiveEffect {
            source: cast.caster.clone(),
            ability: cast.ability,
            target: EffectTarget::Player(cast.caster.clone()),
            kind: EffectKind::Invulnerable,
            remaining_ms: cast.params.invulnerability_time.unwrap_or(0.0),
        });
        EffectOutcome::default()
    }
}

impl AbilityEffect for NightShield {
    fn apply(&self, world: &mut World, cast: &PendingCast) -> EffectOutcome {
        let caster = cast.caster.clone();
        // Recasting refreshes the shield instead of stacking it.
        world.effects.retain(|e| {
            !(e.kind == EffectKind::Shield && matches!(&e.target, EffectTarget::Player(id) if *id == caster))
        });
        if let Some(player) = world.players.get_mut(&caster) {
            player.shield = cast.params.shield.unwrap_or(0.0);
        }
        world.effects.push(ActiveEffect {
            source: caster.clone(),
            ability: cast.ability,
            target: EffectTarget::Player(caster),
            kind: EffectKind::Shield,
            remaining_ms: cast.params.duration.unwrap_or(0.0),
        });
        EffectOutcome::default()
    }
}

impl AbilityEffect for PoisonTouch {
    fn apply(&self, world: &mut World, cast: &PendingCast) -> EffectOutcome {
        let Some(stats) = caster_stats(world, cast) else {
            return EffectOutcome::default();
        };
        let range = cast.params.range.unwrap_or(0.0) * stats.range_scale;
        let damage = cast.params.damage.unwrap_or(0.0) * stats.damage_scale;
        let (outcome, survivors) =
            strike_area(world, &cast.caster, stats.position, range, damage, false);

        let dps = cast.params.tick_damage.unwrap_or(0.0) * stats.damage_scale;
        let duration = cast.params.duration.unwrap_or(0.0);
        attach_to_enemies(
            world,
            cast,
            survivors,
            EffectKind::DamageOverTime {
                damage_per_second: dps,
            },
            duration,
        );
        outcome
    }
}

impl AbilityEffect for BloodRitual {
    fn apply(&self, world: &mut World, cast: &PendingCast) -> EffectOutcome {
        let Some(stats) = caster_stats(world, cast) else {
            return EffectOutcome::default();
        };
        let radius = cast.params.radius.unwrap_or(0.0) * stats.range_scale;
        let damage = cast.params.damage.unwrap_or(0.0) * stats.damage_scale;
        let center = targeted_center(cast, &stats);
        let (outcome, survivors) = strike_area(world, &cast.caster, center, radius, damage, false);

        let dps = cast.params.tick_damage.unwrap_or(0.0) * stats.damage_scale;
        let duration = cast.params.duration.unwrap_or(0.0);
        attach_to_enemies(
            world,
            cast,
            survivors,
            EffectKind::DamageOverTime {
                damage_per_second: dps,
            },
            duration,
        );
        outcome
    }
}

impl AbilityEffect for Dominate {
    fn apply(&self, world: &mut World, cast: &PendingCast) -> EffectOutcome {
        let Some(stats) = caster_stats(world, cast) else {
            return EffectOutcome::default();
        };
        let radius = cast.params.radius.unwrap_or(0.0) * stats.range_scale;
        let damage = cast.params.damage.unwrap_or(0.0) * stats.damage_scale;
        let center = targeted_center(cast, &stats);
        let (outcome, survivors) = strike_area(world, &cast.caster, center, radius, damage, false);

        let duration = cast.params.duration.unwrap_or(0.0);
        attach_to_enemies(world, cast, survivors, EffectKind::Stun, duration);
        outcome
    }
}

impl AbilityEffect for Mesmerize {
    fn apply(&self, world: &mut World, cast: &PendingCast) -> EffectOutcome {
        let Some(stats) = caster_stats(world, cast) else {
            return EffectOutcome::default();
        };
        let range = cast.params.range.unwrap_or(0.0) * stats.range_scale;
        let damage = cast.params.damage.unwrap_or(0.0) * stats.damage_scale;
        let (outcome, survivors) =
            strike_area(world, &cast.caster, stats.position, range, damage, false);

        let factor = cast.params.slow_factor.unwrap_or(1.0);
        let duration = cast.params.duration.unwrap_or(0.0);
        attach_to_enemies(world, cast, survivors, EffectKind::Slow { factor }, duration);
        outcome
    }
}
