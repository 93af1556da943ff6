// Client command handlers. Each one validates against the current world and
// either mutates it or reports why the command was ignored.

use crate::domain::events::{Outbound, RoomMessage};
use crate::domain::state::{BloodPact, PendingCast, Vec2, World, overlaps};
use crate::domain::systems::abilities;
use crate::domain::tuning::abilities::AbilityId;
use crate::domain::tuning::room::{
    PACT_COOLDOWN_REDUCTION, PACT_DAMAGE_BOOST, TERRITORY_HEALING_BONUS,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Move {
        x: f32,
        y: f32,
    },
    UseAbility {
        ability_id: String,
        target_x: f32,
        target_y: f32,
    },
    ClaimTerritory {
        territory_id: Option<String>,
        x: f32,
        y: f32,
    },
    FormBloodPact {
        target_player_id: String,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Move { .. } => "move",
            Command::UseAbility { .. } => "useAbility",
            Command::ClaimTerritory { .. } => "claimTerritory",
            Command::FormBloodPact { .. } => "formBloodPact",
        }
    }
}

/// Why a command was ignored. Never sent to clients.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("player `{0}` is not in the room")]
    UnknownPlayer(String),
    #[error("player `{0}` is dead")]
    PlayerDead(String),
    #[error("unknown ability `{0}`")]
    UnknownAbility(String),
    #[error("player does not have ability `{0}`")]
    AbilityMissing(AbilityId),
    #[error("ability `{ability}` is on cooldown for {remaining_ms} ms")]
    OnCooldown { ability: AbilityId, remaining_ms: f32 },
    #[error("not enough energy: need {needed}, have {available}")]
    NotEnoughEnergy { needed: f32, available: f32 },
    #[error("no territory at the requested location")]
    TerritoryNotFound,
    #[error("territory `{0}` is already owned")]
    TerritoryOwned(String),
    #[error("a player cannot form a pact with themselves")]
    SelfPact,
    #[error("pact `{0}` already exists")]
    PactExists(String),
}

pub type CommandResult = Result<Vec<Outbound>, CommandError>;

pub fn handle(world: &mut World, session_id: &str, command: Command) -> CommandResult {
    match command {
        Command::Move { x, y } => move_player(world, session_id, x, y),
        Command::UseAbility {
            ability_id,
            target_x,
            target_y,
        } => use_ability(world, session_id, &ability_id, target_x, target_y),
        Command::ClaimTerritory { territory_id, x, y } => {
            claim_territory(world, session_id, territory_id.as_deref(), x, y)
        }
        Command::FormBloodPact { target_player_id } => {
            form_blood_pact(world, session_id, &target_player_id)
        }
    }
}

pub fn move_player(world: &mut World, session_id: &str, x: f32, y: f32) -> CommandResult {
    let position = world.clamp_to_map(Vec2::new(x, y));
    let player = world
        .players
        .get_mut(session_id)
        .ok_or_else(|| CommandError::UnknownPlayer(session_id.to_string()))?;
    if player.dead {
        return Err(CommandError::PlayerDead(session_id.to_string()));
    }
    player.position = position;
    Ok(Vec::new())
}

pub fn use_ability(
    world: &mut World,
    session_id: &str,
    ability_id: &str,
    target_x: f32,
    target_y: f32,
) -> CommandResult {
    let id: AbilityId = ability_id
        .parse()
        .map_err(|_| CommandError::UnknownAbility(ability_id.to_string()))?;
    let (pact_reduction, _) = abilities::pact_bonuses(world, session_id);

    let player = world
        .players
        .get_mut(session_id)
        .ok_or_else(|| CommandError::UnknownPlayer(session_id.to_string()))?;
    if player.dead {
        return Err(CommandError::PlayerDead(session_id.to_string()));
    }
    let ability = player
        .ability(id)
        .cloned()
        .ok_or(CommandError::AbilityMissing(id))?;
    if ability.cooldown_remaining > 0.0 {
        return Err(CommandError::OnCooldown {
            ability: id,
            remaining_ms: ability.cooldown_remaining,
        });
    }
    if player.energy < ability.energy_cost {
        return Err(CommandError::NotEnoughEnergy {
            needed: ability.energy_cost,
            available: player.energy,
        });
    }

    let cooldown = abilities::effective_cooldown(player, ability.cooldown, pact_reduction);
    player.energy -= ability.energy_cost;
    if let Some(record) = player.ability_mut(id) {
        record.cooldown_remaining = cooldown;
    }

    world.pending_casts.push(PendingCast {
        caster: session_id.to_string(),
        ability: id,
        level: ability.level,
        target: Vec2::new(target_x, target_y),
        params: ability.params,
    });

    Ok(vec![Outbound::to_all(RoomMessage::AbilityUsed {
        player_id: session_id.to_string(),
        ability_id: id,
        target_x,
        target_y,
    })])
}

pub fn claim_territory(
    world: &mut World,
    session_id: &str,
    territory_id: Option<&str>,
    x: f32,
    y: f32,
) -> CommandResult {
    let clan = world
        .player(session_id)
        .map(|p| p.clan)
        .ok_or_else(|| CommandError::UnknownPlayer(session_id.to_string()))?;

    let point = Vec2::new(x, y);
    let territory = world
        .territories
        .iter_mut()
        .find(|t| match territory_id {
            Some(id) => t.id == id,
            None => overlaps(t.position, t.radius, point, 0.0) || t.position == point,
        })
        .ok_or(CommandError::TerritoryNotFound)?;
    if territory.owner.is_some() {
        return Err(CommandError::TerritoryOwned(territory.id.clone()));
    }
    territory.owner = Some(session_id.to_string());
    territory.clan_id = Some(clan);
    territory.minion_timer = territory.minion_spawn_rate;
    let territory_id = territory.id.clone();

    if let Some(player) = world.players.get_mut(session_id) {
        player.territory_count += 1;
        player.healing_multiplier += TERRITORY_HEALING_BONUS;
    }

    Ok(vec![Outbound::to_all(RoomMessage::TerritoryClaimed {
        territory_id,
        player_id: session_id.to_string(),
        clan_id: clan,
    })])
}

/// Deterministic pact id for an unordered pair of players.
pub fn pact_id(a: &str, b: &str) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("pact-{low}-{high}")
}

pub fn form_blood_pact(
    world: &mut World,
    session_id: &str,
    target_player_id: &str,
) -> CommandResult {
    if session_id == target_player_id {
        return Err(CommandError::SelfPact);
    }
    for id in [session_id, target_player_id] {
        if !world.players.contains_key(id) {
            return Err(CommandError::UnknownPlayer(id.to_string()));
        }
    }
    let id = pact_id(session_id, target_player_id);
    if world.blood_pacts.contains_key(&id) {
        return Err(CommandError::PactExists(id));
    }

    world.blood_pacts.insert(
        id.clone(),
        BloodPact {
            id: id.clone(),
            members: [session_id.to_string(), target_player_id.to_string()],
            cooldown_reduction: PACT_COOLDOWN_REDUCTION,
            damage_boost: PACT_DAMAGE_BOOST,
        },
    );
    for member in [session_id, target_player_id] {
        if let Some(player) = world.players.get_mut(member) {
            player.blood_pacts.push(id.clone());
        }
    }

    Ok(vec![Outbound::to_all(RoomMessage::BloodPactFormed {
        pact_id: id,
        player1: session_id.to_string(),
        player2: target_player_id.to_string(),
    })])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::Recipients;
    use crate::domain::systems::test_support::{add_player, world};
    use crate::domain::tuning::clan::Clan;

    #[test]
    fn when_player_moves_then_position_is_clamped_to_the_map() {
        let mut w = world();
        add_player(&mut w, "p1", Clan::Ventrue);

        move_player(&mut w, "p1", 100.0, 200.0).expect("move accepted");
        assert_eq!(w.player("p1").expect("player exists").position, Vec2::new(100.0, 200.0));

        move_player(&mut w, "p1", -50.0, 99_999.0).expect("move accepted");
        assert_eq!(w.player("p1").expect("player exists").position, Vec2::new(0.0, 7000.0));
    }

    #[test]
    fn when_dead_or_unknown_player_moves_then_it_is_ignored() {
        let mut w = world();
        add_player(&mut w, "p1", Clan::Ventrue);
        w.player_mut("p1").expect("player exists").dead = true;

        assert_eq!(
            move_player(&mut w, "p1", 1.0, 1.0),
            Err(CommandError::PlayerDead("p1".to_string()))
        );
        assert_eq!(
            move_player(&mut w, "ghost", 1.0, 1.0),
            Err(CommandError::UnknownPlayer("ghost".to_string()))
        );
    }

    #[test]
    fn when_ability_is_used_twice_in_a_row_then_second_call_is_a_silent_no_op() {
        let mut w = world();
        add_player(&mut w, "p1", Clan::Toreador);

        let first = use_ability(&mut w, "p1", "batSwarm", 10.0, 20.0).expect("first cast");
        assert_eq!(first.len(), 1);
        assert!(matches!(
            first[0].message,
            RoomMessage::AbilityUsed { ability_id: AbilityId::BatSwarm, .. }
        ));
        let after_first = w.player("p1").expect("player exists").clone();

        let second = use_ability(&mut w, "p1", "batSwarm", 10.0, 20.0);

        assert!(matches!(second, Err(CommandError::OnCooldown { .. })));
        assert_eq!(w.player("p1").expect("player exists"), &after_first);
        assert_eq!(w.pending_casts.len(), 1);
        let bat = after_first.ability(AbilityId::BatSwarm).expect("starter ability");
        assert_eq!(bat.cooldown_remaining, 8000.0);
        assert_eq!(after_first.energy, 70.0);
    }

    #[test]
    fn when_energy_is_short_then_ability_is_ignored() {
        let mut w = world();
        add_player(&mut w, "p1", Clan::Ventrue);
        w.player_mut("p1").expect("player exists").energy = 5.0;

        let result = use_ability(&mut w, "p1", "bloodDrain", 0.0, 0.0);

        assert!(matches!(result, Err(CommandError::NotEnoughEnergy { .. })));
        assert!(w.pending_casts.is_empty());
    }

    #[test]
    fn when_ability_is_unknown_or_not_owned_then_it_is_ignored() {
        let mut w = world();
        add_player(&mut w, "p1", Clan::Ventrue);

        assert_eq!(
            use_ability(&mut w, "p1", "fireball", 0.0, 0.0),
            Err(CommandError::UnknownAbility("fireball".to_string()))
        );
        assert_eq!(
            use_ability(&mut w, "p1", "bloodLance", 0.0, 0.0),
            Err(CommandError::AbilityMissing(AbilityId::BloodLance))
        );
    }

    #[test]
    fn when_ventrue_casts_then_cooldown_is_reduced_but_within_bounds() {
        let mut w = world();
        add_player(&mut w, "p1", Clan::Ventrue);

        use_ability(&mut w, "p1", "bloodDrain", 0.0, 0.0).expect("cast accepted");

        let drain = w
            .player("p1")
            .and_then(|p| p.ability(AbilityId::BloodDrain))
            .expect("starter ability");
        assert_eq!(drain.cooldown_remaining, 4500.0);
        assert!(drain.cooldown_remaining <= drain.cooldown);
    }

    #[test]
    fn when_territory_is_claimed_twice_then_only_the_first_claim_takes_effect() {
        let mut w = world();
        add_player(&mut w, "p1", Clan::Tremere);
        add_player(&mut w, "p2", Clan::Ventrue);
        let target = w.territories[0].position;

        let first = claim_territory(&mut w, "p1", None, target.x, target.y).expect("claimed");
        assert_eq!(first.len(), 1);
        let second = claim_territory(&mut w, "p1", None, target.x, target.y);
        let third = claim_territory(&mut w, "p2", None, target.x, target.y);

        assert!(matches!(second, Err(CommandError::TerritoryOwned(_))));
        assert!(matches!(third, Err(CommandError::TerritoryOwned(_))));
        let territory = &w.territories[0];
        assert_eq!(territory.owner.as_deref(), Some("p1"));
        assert_eq!(territory.clan_id, Some(Clan::Tremere));
        let p1 = w.player("p1").expect("player exists");
        assert_eq!(p1.territory_count, 1);
        assert!((p1.healing_multiplier - 1.1).abs() < 1e-6);
    }

    #[test]
    fn when_claim_names_a_territory_id_then_it_wins_over_the_point() {
        let mut w = world();
        add_player(&mut w, "p1", Clan::Tremere);
        let id = w.territories[3].id.clone();

        claim_territory(&mut w, "p1", Some(&id), 0.0, 0.0).expect("claimed");

        assert_eq!(w.territories[3].owner.as_deref(), Some("p1"));
        assert!(w.territories.iter().filter(|t| t.owner.is_some()).count() == 1);
    }

    #[test]
    fn when_claim_point_misses_every_territory_then_nothing_changes() {
        let mut w = world();
        add_player(&mut w, "p1", Clan::Tremere);

        assert_eq!(
            claim_territory(&mut w, "p1", None, 1.0, 1.0),
            Err(CommandError::TerritoryNotFound)
        );
        assert!(w.territories.iter().all(|t| t.owner.is_none() && t.clan_id.is_none()));
    }

    #[test]
    fn when_pact_is_formed_then_both_players_reference_it_and_everyone_is_told() {
        let mut w = world();
        add_player(&mut w, "b", Clan::Tremere);
        add_player(&mut w, "a", Clan::Ventrue);

        let out = form_blood_pact(&mut w, "b", "a").expect("pact formed");

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].recipients, Recipients::All);
        assert!(w.blood_pacts.contains_key("pact-a-b"));
        for id in ["a", "b"] {
            assert_eq!(
                w.player(id).expect("player exists").blood_pacts,
                vec!["pact-a-b".to_string()]
            );
        }
        assert_eq!(
            form_blood_pact(&mut w, "a", "b"),
            Err(CommandError::PactExists("pact-a-b".to_string()))
        );
    }

    #[test]
    fn when_pact_target_is_missing_or_self_then_it_is_rejected() {
        let mut w = world();
        add_player(&mut w, "a", Clan::Ventrue);

        assert_eq!(form_blood_pact(&mut w, "a", "a"), Err(CommandError::SelfPact));
        assert_eq!(
            form_blood_pact(&mut w, "a", "ghost"),
            Err(CommandError::UnknownPlayer("ghost".to_string()))
        );
        assert!(w.blood_pacts.is_empty());
    }
}
