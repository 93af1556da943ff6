use crate::use_cases::RoomRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Active rooms and their connection counts.
    pub room_registry: Arc<RoomRegistry>,
    // Room used when a client omits `room_id`.
    pub default_room_id: Arc<str>,
}
