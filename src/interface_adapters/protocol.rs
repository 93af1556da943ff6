// Wire protocol DTOs and conversions for room messages.
// Frames are `{"type": <name>, "data": {...}}` with camelCase names.

use crate::domain::diff::{CollectionDiff, WorldMeta};
use crate::domain::state::{
    Ability, BloodPact, BloodPool, Enemy, Minion, Player, Projectile, Territory,
};
use crate::domain::{Command, RoomMessage, StatePatch, WorldSnapshot};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    // Sent once to the joining client.
    GameInit {
        map_width: f32,
        map_height: f32,
        current_time: String,
        player_id: String,
    },
    TimeChange {
        time: String,
    },
    // Visual-only notification; gameplay effects arrive through patches.
    AbilityUsed {
        player_id: String,
        ability_id: String,
        target_x: f32,
        target_y: f32,
    },
    TerritoryClaimed {
        territory_id: String,
        player_id: String,
        clan_id: String,
    },
    BloodPactFormed {
        pact_id: String,
        player1: String,
        player2: String,
    },
    PlayerDied {
        player_id: String,
    },
    GameOver {
        result: String,
    },
    JoinRejected {
        reason: String,
    },
    // Per-tick changes.
    StatePatch(StatePatchDto),
    // Full state after join or lag.
    StateSync(StateSyncDto),
}

impl From<&RoomMessage> for ServerMessage {
    fn from(message: &RoomMessage) -> Self {
        match message {
            RoomMessage::GameInit {
                map_width,
                map_height,
                current_time,
                player_id,
            } => ServerMessage::GameInit {
                map_width: *map_width,
                map_height: *map_height,
                current_time: current_time.as_str().to_string(),
                player_id: player_id.clone(),
            },
            RoomMessage::TimeChange { time } => ServerMessage::TimeChange {
                time: time.as_str().to_string(),
            },
            RoomMessage::AbilityUsed {
                player_id,
                ability_id,
                target_x,
                target_y,
            } => ServerMessage::AbilityUsed {
                player_id: player_id.clone(),
                ability_id: ability_id.as_str().to_string(),
                target_x: *target_x,
                target_y: *target_y,
            },
            RoomMessage::TerritoryClaimed {
                territory_id,
                player_id,
                clan_id,
            } => ServerMessage::TerritoryClaimed {
                territory_id: territory_id.clone(),
                player_id: player_id.clone(),
                clan_id: clan_id.as_str().to_string(),
            },
            RoomMessage::BloodPactFormed {
                pact_id,
                player1,
                player2,
            } => ServerMessage::BloodPactFormed {
                pact_id: pact_id.clone(),
                player1: player1.clone(),
                player2: player2.clone(),
            },
            RoomMessage::PlayerDied { player_id } => ServerMessage::PlayerDied {
                player_id: player_id.clone(),
            },
            RoomMessage::GameOver { result } => ServerMessage::GameOver {
                result: result.as_str().to_string(),
            },
            RoomMessage::JoinRejected { reason } => ServerMessage::JoinRejected {
                reason: reason.clone(),
            },
        }
    }
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    // Initial handshake; must be the first frame.
    Join {
        username: String,
        clan: String,
    },
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
        territory_x: f32,
        territory_y: f32,
        #[serde(default)]
        territory_id: Option<String>,
    },
    FormBloodPact {
        target_player_id: String,
    },
}

impl ClientMessage {
    /// Gameplay command carried by this frame; `None` for the handshake.
    pub fn into_command(self) -> Option<Command> {
        match self {
            ClientMessage::Join { .. } => None,
            ClientMessage::Move { x, y } => Some(Command::Move { x, y }),
            ClientMessage::UseAbility {
                ability_id,
                target_x,
                target_y,
            } => Some(Command::UseAbility {
                ability_id,
                target_x,
                target_y,
            }),
            ClientMessage::ClaimTerritory {
                territory_x,
                territory_y,
                territory_id,
            } => Some(Command::ClaimTerritory {
                territory_id,
                x: territory_x,
                y: territory_y,
            }),
            ClientMessage::FormBloodPact { target_player_id } => {
                Some(Command::FormBloodPact { target_player_id })
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityDto {
    pub id: String,
    pub level: u32,
    pub cooldown: f32,
    pub cooldown_remaining: f32,
    pub energy_cost: f32,
}

impl From<&Ability> for AbilityDto {
    fn from(ability: &Ability) -> Self {
        Self {
            id: ability.id.as_str().to_string(),
            level: ability.level,
            cooldown: ability.cooldown,
            cooldown_remaining: ability.cooldown_remaining,
            energy_cost: ability.energy_cost,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub id: String,
    pub username: String,
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub max_health: f32,
    pub energy: f32,
    pub max_energy: f32,
    pub speed: f32,
    pub level: u32,
    pub experience: u32,
    pub clan: String,
    pub kills: u32,
    pub dead: bool,
    pub invulnerable: bool,
    pub shield: f32,
    pub damage_multiplier: f32,
    pub speed_multiplier: f32,
    pub ability_range_multiplier: f32,
    pub cooldown_reduction_multiplier: f32,
    pub healing_multiplier: f32,
    pub territory_count: u32,
    pub radius: f32,
    pub last_damaged_time: f64,
    pub blood_pacts: Vec<String>,
    pub abilities: Vec<AbilityDto>,
}

impl From<&Player> for PlayerDto {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id.clone(),
            username: p.username.clone(),
            x: p.position.x,
            y: p.position.y,
            health: p.health,
            max_health: p.max_health,
            energy: p.energy,
            max_energy: p.max_energy,
            speed: p.speed,
            level: p.level,
            experience: p.experience,
            clan: p.clan.as_str().to_string(),
            kills: p.kills,
            dead: p.dead,
            invulnerable: p.invulnerable,
            shield: p.shield,
            damage_multiplier: p.damage_multiplier,
            speed_multiplier: p.speed_multiplier,
            ability_range_multiplier: p.ability_range_multiplier,
            cooldown_reduction_multiplier: p.cooldown_reduction_multiplier,
            healing_multiplier: p.healing_multiplier,
            territory_count: p.territory_count,
            radius: p.radius,
            last_damaged_time: p.last_damaged_time,
            blood_pacts: p.blood_pacts.clone(),
            abilities: p.abilities.iter().map(AbilityDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyDto {
    pub id: String,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "type")]
    pub kind: String,
    pub health: f32,
    pub damage: f32,
    pub speed: f32,
    pub radius: f32,
}

impl From<&Enemy> for EnemyDto {
    fn from(e: &Enemy) -> Self {
        Self {
            id: e.id.clone(),
            x: e.position.x,
            y: e.position.y,
            kind: e.kind.as_str().to_string(),
            health: e.health,
            damage: e.damage,
            speed: e.speed,
            radius: e.radius,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileDto {
    pub id: String,
    pub owner_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub damage: f32,
    pub pierce_count: u32,
    pub life_time: f32,
    pub radius: f32,
}

impl From<&Projectile> for ProjectileDto {
    fn from(p: &Projectile) -> Self {
        Self {
            id: p.id.clone(),
            owner_id: p.owner_id.clone(),
            kind: p.kind.as_str().to_string(),
            x: p.position.x,
            y: p.position.y,
            vx: p.velocity.x,
            vy: p.velocity.y,
            damage: p.damage,
            pierce_count: p.pierce_count,
            life_time: p.life_time,
            radius: p.radius,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryDto {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub owner: Option<String>,
    pub clan_id: Option<String>,
    pub minion_timer: f32,
    pub minion_spawn_rate: f32,
}

impl From<&Territory> for TerritoryDto {
    fn from(t: &Territory) -> Self {
        Self {
            id: t.id.clone(),
            x: t.position.x,
            y: t.position.y,
            radius: t.radius,
            owner: t.owner.clone(),
            clan_id: t.clan_id.map(|c| c.as_str().to_string()),
            minion_timer: t.minion_timer,
            minion_spawn_rate: t.minion_spawn_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodPoolDto {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub life_time: f32,
}

impl From<&BloodPool> for BloodPoolDto {
    fn from(b: &BloodPool) -> Self {
        Self {
            id: b.id.clone(),
            x: b.position.x,
            y: b.position.y,
            radius: b.radius,
            life_time: b.life_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinionDto {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub damage: f32,
    pub speed: f32,
    pub owner_id: String,
    pub clan_id: String,
    pub radius: f32,
}

impl From<&Minion> for MinionDto {
    fn from(m: &Minion) -> Self {
        Self {
            id: m.id.clone(),
            x: m.position.x,
            y: m.position.y,
            health: m.health,
            damage: m.damage,
            speed: m.speed,
            owner_id: m.owner_id.clone(),
            clan_id: m.clan_id.as_str().to_string(),
            radius: m.radius,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodPactDto {
    pub id: String,
    pub player1: String,
    pub player2: String,
    pub cooldown_reduction: f32,
    pub damage_boost: f32,
}

impl From<&BloodPact> for BloodPactDto {
    fn from(p: &BloodPact) -> Self {
        let [player1, player2] = p.members.clone();
        Self {
            id: p.id.clone(),
            player1,
            player2,
            cooldown_reduction: p.cooldown_reduction,
            damage_boost: p.damage_boost,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldMetaDto {
    pub map_width: f32,
    pub map_height: f32,
    pub day_night_cycle: bool,
    pub current_time: String,
    pub day_night_duration: f32,
}

impl From<&WorldMeta> for WorldMetaDto {
    fn from(meta: &WorldMeta) -> Self {
        Self {
            map_width: meta.map_width,
            map_height: meta.map_height,
            day_night_cycle: meta.day_night_cycle,
            current_time: meta.current_time.as_str().to_string(),
            day_night_duration: meta.day_night_duration,
        }
    }
}

/// Added/changed/removed records of one collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionDiffDto<T> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed: Vec<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>,
}

impl<T> CollectionDiffDto<T> {
    fn from_diff<S>(diff: &CollectionDiff<S>) -> Self
    where
        for<'a> T: From<&'a S>,
    {
        Self {
            added: diff.added.iter().map(T::from).collect(),
            changed: diff.changed.iter().map(T::from).collect(),
            removed: diff.removed.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePatchDto {
    pub tick: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<WorldMetaDto>,
    pub players: CollectionDiffDto<PlayerDto>,
    pub enemies: CollectionDiffDto<EnemyDto>,
    pub projectiles: CollectionDiffDto<ProjectileDto>,
    pub minions: CollectionDiffDto<MinionDto>,
    pub territories: CollectionDiffDto<TerritoryDto>,
    pub blood_pools: CollectionDiffDto<BloodPoolDto>,
    pub blood_pacts: CollectionDiffDto<BloodPactDto>,
}

impl From<&StatePatch> for StatePatchDto {
    fn from(patch: &StatePatch) -> Self {
        Self {
            tick: patch.tick,
            meta: patch.meta.as_ref().map(WorldMetaDto::from),
            players: CollectionDiffDto::from_diff(&patch.players),
            enemies: CollectionDiffDto::from_diff(&patch.enemies),
            projectiles: CollectionDiffDto::from_diff(&patch.projectiles),
            minions: CollectionDiffDto::from_diff(&patch.minions),
            territories: CollectionDiffDto::from_diff(&patch.territories),
            blood_pools: CollectionDiffDto::from_diff(&patch.blood_pools),
            blood_pacts: CollectionDiffDto::from_diff(&patch.blood_pacts),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSyncDto {
    pub tick: u64,
    pub meta: WorldMetaDto,
    pub players: Vec<PlayerDto>,
    pub enemies: Vec<EnemyDto>,
    pub projectiles: Vec<ProjectileDto>,
    pub minions: Vec<MinionDto>,
    pub territories: Vec<TerritoryDto>,
    pub blood_pools: Vec<BloodPoolDto>,
    pub blood_pacts: Vec<BloodPactDto>,
}

impl From<&WorldSnapshot> for StateSyncDto {
    fn from(s: &WorldSnapshot) -> Self {
        Self {
            tick: s.tick,
            meta: WorldMetaDto::from(&s.meta),
            players: s.players.values().map(PlayerDto::from).collect(),
            enemies: s.enemies.values().map(EnemyDto::from).collect(),
            projectiles: s.projectiles.values().map(ProjectileDto::from).collect(),
            minions: s.minions.values().map(MinionDto::from).collect(),
            territories: s.territories.values().map(TerritoryDto::from).collect(),
            blood_pools: s.blood_pools.values().map(BloodPoolDto::from).collect(),
            blood_pacts: s.blood_pacts.values().map(BloodPactDto::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::GameResult;
    use crate::domain::state::TimeOfDay;
    use serde_json::json;

    #[test]
    fn when_game_init_is_serialized_then_shape_is_type_and_camel_case_data() {
        let message = ServerMessage::from(&RoomMessage::GameInit {
            map_width: 7000.0,
            map_height: 7000.0,
            current_time: TimeOfDay::Day,
            player_id: "s1".to_string(),
        });

        let value = serde_json::to_value(&message).expect("serializes");

        assert_eq!(
            value,
            json!({
                "type": "gameInit",
                "data": {
                    "mapWidth": 7000.0,
                    "mapHeight": 7000.0,
                    "currentTime": "day",
                    "playerId": "s1"
                }
            })
        );
    }

    #[test]
    fn when_game_over_is_serialized_then_result_is_lowercase() {
        let message = ServerMessage::from(&RoomMessage::GameOver {
            result: GameResult::Defeat,
        });

        let value = serde_json::to_value(&message).expect("serializes");

        assert_eq!(value, json!({"type": "gameOver", "data": {"result": "defeat"}}));
    }

    #[test]
    fn when_client_sends_use_ability_then_it_parses() {
        let text = r#"{"type":"useAbility","data":{"abilityId":"bloodDrain","targetX":1.5,"targetY":-2}}"#;

        let parsed: ClientMessage = serde_json::from_str(text).expect("parses");

        assert!(matches!(
            parsed,
            ClientMessage::UseAbility { ref ability_id, target_x, target_y }
                if ability_id == "bloodDrain" && target_x == 1.5 && target_y == -2.0
        ));
    }

    #[test]
    fn when_claim_omits_territory_id_then_it_defaults_to_none() {
        let text = r#"{"type":"claimTerritory","data":{"territoryX":875,"territoryY":875}}"#;

        let parsed: ClientMessage = serde_json::from_str(text).expect("parses");

        assert!(matches!(
            parsed,
            ClientMessage::ClaimTerritory { territory_id: None, .. }
        ));
    }

    #[test]
    fn when_claim_is_converted_then_coordinates_map_to_command() {
        let message = ClientMessage::ClaimTerritory {
            territory_x: 10.0,
            territory_y: 20.0,
            territory_id: Some("territory-3".to_string()),
        };

        assert_eq!(
            message.into_command(),
            Some(Command::ClaimTerritory {
                territory_id: Some("territory-3".to_string()),
                x: 10.0,
                y: 20.0,
            })
        );
    }

    #[test]
    fn when_join_is_converted_then_there_is_no_command() {
        let message = ClientMessage::Join {
            username: "vlad".to_string(),
            clan: "ventrue".to_string(),
        };

        assert_eq!(message.into_command(), None);
    }

    #[test]
    fn when_patch_is_empty_then_collections_serialize_as_empty_objects() {
        let dto = StatePatchDto::from(&StatePatch::default());

        let value = serde_json::to_value(&dto).expect("serializes");

        assert_eq!(value["players"], json!({}));
        assert!(value.get("meta").is_none());
        assert_eq!(value["bloodPools"], json!({}));
    }
}
