// Kill rewards and level-ups.

use crate::domain::state::{Ability, Player};
use crate::domain::tuning::clan::LEVEL_UNLOCKS;
use crate::domain::tuning::enemy::EnemyKind;
use crate::domain::tuning::room::{EXPERIENCE_PER_LEVEL, MAX_HEALTH_PER_LEVEL};
use tracing::info;

/// Credits a kill and applies any level-ups it earns.
pub fn award_kill(player: &mut Player, kind: EnemyKind) {
    player.kills += 1;
    player.experience += kind.tuning().experience;

    while player.experience >= player.level * EXPERIENCE_PER_LEVEL {
        player.experience -= player.level * EXPERIENCE_PER_LEVEL;
        level_up(player);
    }
}

fn level_up(player: &mut Player) {
    player.level += 1;
    player.max_health += MAX_HEALTH_PER_LEVEL;
    if !player.dead {
        player.health = (player.health + MAX_HEALTH_PER_LEVEL).min(player.max_health);
    }
    for ability in &mut player.abilities {
        ability.level += 1;
    }

    for (level, ability_id) in LEVEL_UNLOCKS {
        if player.level >= level && player.ability(ability_id).is_none() {
            player.abilities.push(Ability::new(ability_id));
        }
    }

    info!(player_id = %player.id, level = player.level, "player leveled up");
}
