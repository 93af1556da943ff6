// Gameplay tuning for player abilities.
//
// Durations and cooldowns are in milliseconds, distances in world units.
use std::fmt;
use std::str::FromStr;

/// Closed set of abilities a player can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AbilityId {
    BloodDrain,
    BatSwarm,
    ShadowDash,
    BloodLance,
    NightShield,
    PoisonTouch,
    BloodRitual,
    Dominate,
    Mesmerize,
}

impl AbilityId {
    pub const ALL: [AbilityId; 9] = [
        AbilityId::BloodDrain,
        AbilityId::BatSwarm,
        AbilityId::ShadowDash,
        AbilityId::BloodLance,
        AbilityId::NightShield,
        AbilityId::PoisonTouch,
        AbilityId::BloodRitual,
        AbilityId::Dominate,
        AbilityId::Mesmerize,
    ];

    /// Wire name used by clients.
    pub fn as_str(self) -> &'static str {
        match self {
            AbilityId::BloodDrain => "bloodDrain",
            AbilityId::BatSwarm => "batSwarm",
            AbilityId::ShadowDash => "shadowDash",
            AbilityId::BloodLance => "bloodLance",
            AbilityId::NightShield => "nightShield",
            AbilityId::PoisonTouch => "poisonTouch",
            AbilityId::BloodRitual => "bloodRitual",
            AbilityId::Dominate => "dominate",
            AbilityId::Mesmerize => "mesmerize",
        }
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAbility(pub String);

impl FromStr for AbilityId {
    type Err = UnknownAbility;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AbilityId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownAbility(s.to_string()))
    }
}

/// Ability-specific numbers; only the subset an ability uses is populated.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AbilityParams {
    pub damage: Option<f32>,
    pub range: Option<f32>,
    pub duration: Option<f32>,
    pub count: Option<f32>,
    pub speed: Option<f32>,
    pub distance: Option<f32>,
    pub invulnerability_time: Option<f32>,
    pub radius: Option<f32>,
    /// Projectile lifetime in ms.
    pub life_time: Option<f32>,
    /// Extra hits a projectile may land after the first.
    pub pierce: Option<u32>,
    /// Damage per second for lingering effects.
    pub tick_damage: Option<f32>,
    /// Shield points absorbed before health.
    pub shield: Option<f32>,
    /// Movement speed multiplier while slowed.
    pub slow_factor: Option<f32>,
    /// Furthest a targeted area may be placed from the caster.
    pub cast_range: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilityTuning {
    pub cooldown: f32,
    pub energy_cost: f32,
    pub params: AbilityParams,
}

/// Share of Blood Drain damage returned to the caster as healing.
pub const BLOOD_DRAIN_HEAL_RATIO: f32 = 0.5;
/// Projectile collision radius for ability projectiles.
pub const ABILITY_PROJECTILE_RADIUS: f32 = 8.0;
/// Angular spacing between bats in a swarm (radians).
pub const BAT_SWARM_SPREAD: f32 = 0.2;
/// Damage bonus per ability level above 1.
pub const DAMAGE_PER_LEVEL: f32 = 0.1;
/// Effective cooldown never drops below this share of the base cooldown.
pub const MIN_COOLDOWN_FACTOR: f32 = 0.5;

pub fn tuning(id: AbilityId) -> AbilityTuning {
    match id {
        AbilityId::BloodDrain => AbilityTuning {
            cooldown: 5000.0,
            energy_cost: 20.0,
            params: AbilityParams {
                damage: Some(10.0),
                range: Some(150.0),
                ..Default::default()
            },
        },
        AbilityId::BatSwarm => AbilityTuning {
            cooldown: 8000.0,
            energy_cost: 30.0,
            params: AbilityParams {
                damage: Some(8.0),
                count: Some(5.0),
                speed: Some(300.0),
                life_time: Some(2000.0),
                pierce: Some(0),
                ..Default::default()
            },
        },
        AbilityId::ShadowDash => AbilityTuning {
            cooldown: 6000.0,
            energy_cost: 15.0,
            params: AbilityParams {
                distance: Some(200.0),
                invulnerability_time: Some(500.0),
                ..Default::default()
            },
        },
        AbilityId::BloodLance => AbilityTuning {
            cooldown: 7000.0,
            energy_cost: 25.0,
            params: AbilityParams {
                damage: Some(40.0),
                speed: Some(600.0),
                life_time: Some(1500.0),
                pierce: Some(3),
                ..Default::default()
            },
        },
        AbilityId::NightShield => AbilityTuning {
            cooldown: 15000.0,
            energy_cost: 35.0,
            params: AbilityParams {
                duration: Some(5000.0),
                shield: Some(50.0),
                ..Default::default()
            },
        },
        AbilityId::PoisonTouch => AbilityTuning {
            cooldown: 6000.0,
            energy_cost: 20.0,
            params: AbilityParams {
                damage: Some(15.0),
                range: Some(100.0),
                duration: Some(5000.0),
                tick_damage: Some(5.0),
                ..Default::default()
            },
        },
        AbilityId::BloodRitual => AbilityTuning {
            cooldown: 10000.0,
            energy_cost: 40.0,
            params: AbilityParams {
                damage: Some(30.0),
                radius: Some(120.0),
                cast_range: Some(400.0),
                duration: Some(3000.0),
                tick_damage: Some(4.0),
                ..Default::default()
            },
        },
        AbilityId::Dominate => AbilityTuning {
            cooldown: 12000.0,
            energy_cost: 35.0,
            params: AbilityParams {
                damage: Some(15.0),
                radius: Some(150.0),
                cast_range: Some(400.0),
                duration: Some(3000.0),
                ..Default::default()
            },
        },
        AbilityId::Mesmerize => AbilityTuning {
            cooldown: 9000.0,
            energy_cost: 25.0,
            params: AbilityParams {
                damage: Some(5.0),
                range: Some(200.0),
                duration: Some(4000.0),
                slow_factor: Some(0.5),
                ..Default::default()
            },
        },
    }
}
