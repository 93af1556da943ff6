// Clan archetypes and the stat deltas they apply to a freshly created player.
use super::abilities::AbilityId;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clan {
    Nosferatu,
    Tremere,
    Ventrue,
    Toreador,
}

impl Clan {
    pub fn as_str(self) -> &'static str {
        match self {
            Clan::Nosferatu => "nosferatu",
            Clan::Tremere => "tremere",
            Clan::Ventrue => "ventrue",
            Clan::Toreador => "toreador",
        }
    }

    /// The ability only this clan starts with.
    pub fn unique_ability(self) -> AbilityId {
        match self {
            Clan::Nosferatu => AbilityId::PoisonTouch,
            Clan::Tremere => AbilityId::BloodRitual,
            Clan::Ventrue => AbilityId::Dominate,
            Clan::Toreador => AbilityId::Mesmerize,
        }
    }

    pub fn modifiers(self) -> ClanModifiers {
        match self {
            Clan::Nosferatu => ClanModifiers {
                max_health: 30.0,
                speed: -20.0,
                ..ClanModifiers::NONE
            },
            Clan::Tremere => ClanModifiers {
                max_energy: 30.0,
                ability_range_multiplier: 1.2,
                ..ClanModifiers::NONE
            },
            Clan::Ventrue => ClanModifiers {
                max_health: 10.0,
                cooldown_reduction_multiplier: 0.9,
                ..ClanModifiers::NONE
            },
            Clan::Toreador => ClanModifiers {
                speed: 30.0,
                healing_multiplier: 1.2,
                ..ClanModifiers::NONE
            },
        }
    }
}

impl fmt::Display for Clan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Clan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nosferatu" => Ok(Clan::Nosferatu),
            "tremere" => Ok(Clan::Tremere),
            "ventrue" => Ok(Clan::Ventrue),
            "toreador" => Ok(Clan::Toreador),
            other => Err(format!("unknown clan `{other}`")),
        }
    }
}

/// Additive deltas for flat stats, absolute values for multipliers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClanModifiers {
    pub max_health: f32,
    pub max_energy: f32,
    pub speed: f32,
    pub ability_range_multiplier: f32,
    pub cooldown_reduction_multiplier: f32,
    pub healing_multiplier: f32,
}

impl ClanModifiers {
    pub const NONE: ClanModifiers = ClanModifiers {
        max_health: 0.0,
        max_energy: 0.0,
        speed: 0.0,
        ability_range_multiplier: 1.0,
        cooldown_reduction_multiplier: 1.0,
        healing_multiplier: 1.0,
    };
}

/// Abilities every clan starts with, before the clan-unique one.
pub const STARTER_ABILITIES: [AbilityId; 3] = [
    AbilityId::BloodDrain,
    AbilityId::BatSwarm,
    AbilityId::ShadowDash,
];

/// Abilities unlocked by reaching a level.
pub const LEVEL_UNLOCKS: [(u32, AbilityId); 2] =
    [(2, AbilityId::BloodLance), (3, AbilityId::NightShield)];
