// Discrete room events pushed to clients alongside state patches.

use crate::domain::state::{SessionId, TimeOfDay};
use crate::domain::tuning::abilities::AbilityId;
use crate::domain::tuning::clan::Clan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    Victory,
    Defeat,
}

impl GameResult {
    pub fn as_str(self) -> &'static str {
        match self {
            GameResult::Victory => "victory",
            GameResult::Defeat => "defeat",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoomMessage {
    GameInit {
        map_width: f32,
        map_height: f32,
        current_time: TimeOfDay,
        player_id: SessionId,
    },
    TimeChange {
        time: TimeOfDay,
    },
    AbilityUsed {
        player_id: SessionId,
        ability_id: AbilityId,
        target_x: f32,
        target_y: f32,
    },
    TerritoryClaimed {
        territory_id: String,
        player_id: SessionId,
        clan_id: Clan,
    },
    BloodPactFormed {
        pact_id: String,
        player1: SessionId,
        player2: SessionId,
    },
    PlayerDied {
        player_id: SessionId,
    },
    GameOver {
        result: GameResult,
    },
    JoinRejected {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recipients {
    All,
    Only(SessionId),
}

impl Recipients {
    pub fn includes(&self, session_id: &str) -> bool {
        match self {
            Recipients::All => true,
            Recipients::Only(id) => id == session_id,
        }
    }
}

/// A message together with who should receive it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub recipients: Recipients,
    pub message: RoomMessage,
}

impl Outbound {
    pub fn to_all(message: RoomMessage) -> Self {
        Self {
            recipients: Recipients::All,
            message,
        }
    }

    pub fn to_session(session_id: impl Into<SessionId>, message: RoomMessage) -> Self {
        Self {
            recipients: Recipients::Only(session_id.into()),
            message,
        }
    }
}
