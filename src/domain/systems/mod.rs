pub mod abilities;
pub mod ai;
pub mod combat;
pub mod lifecycle;
pub mod progression;
pub mod spawning;
pub mod territory;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::state::{Enemy, Player, Vec2, World};
    use crate::domain::tuning::clan::Clan;
    use crate::domain::tuning::enemy::EnemyKind;
    use crate::domain::tuning::room::RoomConfig;

    pub fn world() -> World {
        World::new(&RoomConfig {
            seed: Some(7),
            ..RoomConfig::default()
        })
    }

    pub fn player(id: &str, clan: Clan) -> Player {
        super::lifecycle::new_player(
            id,
            "tester",
            clan,
            Vec2::new(500.0, 500.0),
            crate::domain::state::TimeOfDay::Day,
        )
    }

    pub fn add_player(world: &mut World, id: &str, clan: Clan) {
        let player = super::lifecycle::new_player(
            id,
            "tester",
            clan,
            world.center(),
            world.current_time,
        );
        world.players.insert(id.to_string(), player);
    }

    /// An enemy with a fresh id, not yet inserted into the world.
    pub fn enemy(world: &mut World, kind: EnemyKind, position: Vec2) -> Enemy {
        super::spawning::build_enemy(world.next_id("enemy"), kind, position)
    }
}
