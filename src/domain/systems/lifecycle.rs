// Player creation and removal.

use crate::domain::state::{Ability, Player, SessionId, TimeOfDay, Vec2, World};
use crate::domain::systems::abilities;
use crate::domain::tuning::clan::{Clan, STARTER_ABILITIES};
use crate::domain::tuning::room::PlayerTuning;
use rand::Rng;
use tracing::info;

/// Builds a level-1 player with clan deltas and the current time-of-day
/// multipliers applied.
pub fn new_player(
    id: &str,
    username: &str,
    clan: Clan,
    position: Vec2,
    time: TimeOfDay,
) -> Player {
    let base = PlayerTuning::default();
    let deltas = clan.modifiers();
    let time_mods = time.modifiers();
    let max_health = base.max_health + deltas.max_health;
    let max_energy = base.max_energy + deltas.max_energy;

    let abilities = STARTER_ABILITIES
        .into_iter()
        .chain(std::iter::once(clan.unique_ability()))
        .map(Ability::new)
        .collect();

    Player {
        id: id.to_string(),
        username: username.to_string(),
        position,
        health: max_health,
        max_health,
        energy: max_energy,
        max_energy,
        speed: base.speed + deltas.speed,
        level: 1,
        experience: 0,
        clan,
        kills: 0,
        dead: false,
        invulnerable: false,
        shield: 0.0,
        damage_multiplier: time_mods.damage_multiplier,
        speed_multiplier: time_mods.speed_multiplier,
        ability_range_multiplier: deltas.ability_range_multiplier,
        cooldown_reduction_multiplier: deltas.cooldown_reduction_multiplier,
        healing_multiplier: deltas.healing_multiplier,
        territory_count: 0,
        radius: base.radius,
        last_damaged_time: 0.0,
        blood_pacts: Vec::new(),
        abilities,
    }
}

/// Places a new player near the map center.
pub fn spawn_player(
    world: &mut World,
    rng: &mut impl Rng,
    session_id: &str,
    username: &str,
    clan: Clan,
) {
    let jitter = PlayerTuning::default().spawn_jitter;
    let center = world.center();
    let position = world.clamp_to_map(Vec2::new(
        center.x + rng.gen_range(-jitter..=jitter),
        center.y + rng.gen_range(-jitter..=jitter),
    ));
    let player = new_player(session_id, username, clan, position, world.current_time);
    world.players.insert(session_id.to_string(), player);
    info!(session_id, clan = clan.as_str(), "player spawned");
}

/// Removes a player and everything that only exists because of them.
///
/// Owned territories return to neutral, pacts dissolve on both sides, and
/// the player's minions, projectiles, casts and effects are dropped.
pub fn remove_player(world: &mut World, session_id: &str) -> Option<Player> {
    let player = world.players.remove(session_id)?;

    for territory in &mut world.territories {
        if territory.owner.as_deref() == Some(session_id) {
            territory.owner = None;
            territory.clan_id = None;
            territory.minion_timer = territory.minion_spawn_rate;
        }
    }

    let dissolved: Vec<(String, SessionId)> = world
        .blood_pacts
        .values()
        .filter(|pact| pact.involves(session_id))
        .filter_map(|pact| {
            pact.members
                .iter()
                .find(|m| m.as_str() != session_id)
                .map(|partner| (pact.id.clone(), partner.clone()))
        })
        .collect();
    for (pact_id, partner) in dissolved {
        world.blood_pacts.remove(&pact_id);
        if let Some(partner) = world.players.get_mut(&partner) {
            partner.blood_pacts.retain(|id| *id != pact_id);
        }
    }

    world.minions.retain(|_, m| m.owner_id != session_id);
    world.projectiles.retain(|_, p| p.owner_id != session_id);
    abilities::cancel_for_player(world, session_id);

    info!(session_id, "player removed");
    Some(player)
}
