use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::net::client::spawn_room_serializer;
use crate::interface_adapters::state::AppState;
use crate::use_cases::RoomError;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

#[derive(Debug, serde::Deserialize)]
pub struct RoomInitRequest {
    // Room id clients will pass as `?room_id=`.
    room_id: String,
    // Overrides the configured player cap.
    #[serde(default)]
    max_clients: Option<usize>,
}

#[derive(Debug, serde::Serialize)]
struct RoomInitResponse {
    // The room id that was created.
    room_id: String,
}

pub async fn create_room_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RoomInitRequest>,
) -> impl IntoResponse {
    let room_id = payload.room_id.trim().to_string();
    if room_id.is_empty() {
        return ErrorResponse::reply(StatusCode::BAD_REQUEST, "room_id is required");
    }

    // Created rooms are not pinned and will be removed on last disconnect.
    match state
        .room_registry
        .create_room(room_id.clone(), payload.max_clients, false)
        .await
    {
        Ok(room) => {
            // Create the serializer so clients can subscribe immediately.
            spawn_room_serializer(&room);
            (StatusCode::CREATED, Json(RoomInitResponse { room_id })).into_response()
        }
        Err(RoomError::AlreadyExists) => {
            ErrorResponse::reply(StatusCode::CONFLICT, "room already exists")
        }
        Err(RoomError::InvalidCapacity) => {
            ErrorResponse::reply(StatusCode::BAD_REQUEST, "max_clients must be at least 1")
        }
    }
}
