// Gameplay tuning for hostile NPCs and territory minions.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyKind {
    Basic,
    Hunter,
    Swarm,
    Brute,
}

impl EnemyKind {
    pub const ALL: [EnemyKind; 4] = [
        EnemyKind::Basic,
        EnemyKind::Hunter,
        EnemyKind::Swarm,
        EnemyKind::Brute,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EnemyKind::Basic => "basic",
            EnemyKind::Hunter => "hunter",
            EnemyKind::Swarm => "swarm",
            EnemyKind::Brute => "brute",
        }
    }

    pub fn tuning(self) -> EnemyTuning {
        match self {
            EnemyKind::Basic => EnemyTuning {
                health: 50.0,
                damage: 10.0,
                speed: 100.0,
                radius: 15.0,
                experience: 10,
            },
            EnemyKind::Hunter => EnemyTuning {
                health: 40.0,
                damage: 15.0,
                speed: 150.0,
                radius: 12.0,
                experience: 15,
            },
            EnemyKind::Swarm => EnemyTuning {
                health: 20.0,
                damage: 5.0,
                speed: 180.0,
                radius: 8.0,
                experience: 5,
            },
            EnemyKind::Brute => EnemyTuning {
                health: 150.0,
                damage: 25.0,
                speed: 60.0,
                radius: 25.0,
                experience: 30,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyTuning {
    pub health: f32,
    /// Contact damage applied each tick an enemy overlaps a target.
    pub damage: f32,
    /// Units per second.
    pub speed: f32,
    pub radius: f32,
    /// Experience granted to the killer.
    pub experience: u32,
}

/// Fixed stats for minions spawned by owned territories.
#[derive(Debug, Clone, Copy)]
pub struct MinionTuning {
    pub health: f32,
    pub damage: f32,
    pub speed: f32,
    pub radius: f32,
    /// Max offset from the territory center on each axis.
    pub spawn_jitter: f32,
}

impl Default for MinionTuning {
    fn default() -> Self {
        Self {
            health: 50.0,
            damage: 10.0,
            speed: 80.0,
            radius: 15.0,
            spawn_jitter: 50.0,
        }
    }
}

/// Chasers stop closing in once they are this close to their target.
pub const CHASE_STOP_DISTANCE: f32 = 10.0;
