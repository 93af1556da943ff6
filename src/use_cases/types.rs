// Use-case level inputs/outputs for the room task.

use crate::domain::{Clan, Command, Outbound, Recipients, SessionId, StatePatch, WorldSnapshot};
use axum::extract::ws::Utf8Bytes;
use std::sync::Arc;

/// Inputs from connections into a room task.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    Join {
        session_id: SessionId,
        username: String,
        clan: Clan,
    },
    Leave {
        session_id: SessionId,
    },
    Command {
        session_id: SessionId,
        command: Command,
    },
}

/// Outputs of a room task, before serialization.
#[derive(Debug, Clone)]
pub enum RoomUpdate {
    /// A discrete event for everyone or one session.
    Message(Outbound),
    /// Per-tick changes since the previous patch.
    Patch(Arc<StatePatch>),
    /// Full state for one session (after join).
    Sync {
        session_id: SessionId,
        snapshot: Arc<WorldSnapshot>,
    },
}

/// A serialized update shared by every connection of a room.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    pub recipients: Recipients,
    pub text: Utf8Bytes,
    /// Close reason when the receiving session must be closed after this frame.
    pub close_reason: Option<&'static str>,
}
