// Room orchestration: spawning room tasks and tracking who is connected.

use crate::domain::{Room, RoomConfig, WorldSnapshot};
use crate::use_cases::game::room_task;
use crate::use_cases::{OutboundFrame, RoomEvent, RoomUpdate};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock, broadcast, mpsc, watch};
use tracing::info;

/// Shared configuration for spawning rooms.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// Capacity for inbound room events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast room updates and serialized frames.
    pub update_broadcast_capacity: usize,
    /// Fixed tick interval for the simulation loop.
    pub tick_interval: Duration,
    /// Gameplay settings new rooms start from.
    pub room_defaults: RoomConfig,
}

/// Errors returned by room registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    /// Room already exists and cannot be re-created.
    AlreadyExists,
    /// Requested capacity is zero.
    InvalidCapacity,
}

/// Per-room channels.
#[derive(Clone)]
pub struct RoomHandle {
    /// Identifier clients use to target this room.
    pub room_id: Arc<str>,
    /// Sender for events into the room task.
    pub input_tx: mpsc::Sender<RoomEvent>,
    /// Broadcast sender for raw room updates.
    pub update_tx: broadcast::Sender<RoomUpdate>,
    /// Broadcast sender for serialized frames.
    pub frames_tx: broadcast::Sender<OutboundFrame>,
    /// Watch sender holding the latest full snapshot for lag recovery.
    pub latest_tx: watch::Sender<Arc<WorldSnapshot>>,
    /// Stops the room task.
    shutdown: Arc<Notify>,
}

struct RoomEntry {
    handle: RoomHandle,
    connections: usize,
    /// Pinned rooms survive their last disconnect.
    pinned: bool,
}

/// Thread-safe registry for active rooms.
pub struct RoomRegistry {
    settings: RoomSettings,
    rooms: RwLock<HashMap<String, RoomEntry>>,
}

impl RoomRegistry {
    pub fn new(settings: RoomSettings) -> Self {
        Self {
            settings,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a new room and spawns its task.
    pub async fn create_room(
        &self,
        room_id: String,
        max_clients: Option<usize>,
        pinned: bool,
    ) -> Result<RoomHandle, RoomError> {
        if max_clients == Some(0) {
            return Err(RoomError::InvalidCapacity);
        }

        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room_id) {
            return Err(RoomError::AlreadyExists);
        }

        let mut config = self.settings.room_defaults.clone();
        if let Some(max_clients) = max_clients {
            config.max_clients = max_clients;
        }
        let room = Room::new(config);

        // Channel wiring for the room loop.
        let (input_tx, input_rx) = mpsc::channel::<RoomEvent>(self.settings.input_channel_capacity);
        let (update_tx, _update_rx) =
            broadcast::channel::<RoomUpdate>(self.settings.update_broadcast_capacity);
        let (frames_tx, _frames_rx) =
            broadcast::channel::<OutboundFrame>(self.settings.update_broadcast_capacity);
        let (latest_tx, _latest_rx) = watch::channel(room.snapshot());
        let shutdown = Arc::new(Notify::new());

        info!(
            room_id = %room_id,
            max_clients = room.config().max_clients,
            map_size = room.config().map_size(),
            pinned,
            "room created"
        );

        // Spawn the authoritative loop for this room.
        tokio::spawn(room_task(
            room,
            input_rx,
            update_tx.clone(),
            latest_tx.clone(),
            self.settings.tick_interval,
            Arc::clone(&shutdown),
        ));

        let handle = RoomHandle {
            room_id: Arc::from(room_id.as_str()),
            input_tx,
            update_tx,
            frames_tx,
            latest_tx,
            shutdown,
        };
        rooms.insert(
            room_id,
            RoomEntry {
                handle: handle.clone(),
                connections: 0,
                pinned,
            },
        );
        Ok(handle)
    }

    /// Returns a room handle for the provided id, if it exists.
    pub async fn get_room(&self, room_id: &str) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).map(|entry| entry.handle.clone())
    }

    /// Counts a new connection; `None` if the room no longer exists.
    pub async fn register_connection(&self, room_id: &str) -> Option<usize> {
        let mut rooms = self.rooms.write().await;
        let entry = rooms.get_mut(room_id)?;
        entry.connections += 1;
        Some(entry.connections)
    }

    /// Counts a disconnect and shuts unpinned rooms down once empty.
    pub async fn register_disconnect(&self, room_id: &str) {
        let mut rooms = self.rooms.write().await;
        let Some(entry) = rooms.get_mut(room_id) else {
            return;
        };
        entry.connections = entry.connections.saturating_sub(1);
        if entry.connections > 0 || entry.pinned {
            return;
        }
        if let Some(entry) = rooms.remove(room_id) {
            // Stored permit: the task stops even if it is mid-tick.
            entry.handle.shutdown.notify_one();
            info!(room_id, "room removed after last disconnect");
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RoomRegistry {
        RoomRegistry::new(RoomSettings {
            input_channel_capacity: 16,
            update_broadcast_capacity: 16,
            tick_interval: Duration::from_millis(50),
            room_defaults: RoomConfig {
                seed: Some(1),
                ..RoomConfig::default()
            },
        })
    }

    #[tokio::test]
    async fn when_room_id_is_taken_then_create_fails() {
        let registry = registry();
        registry
            .create_room("a".to_string(), None, false)
            .await
            .expect("first create");

        let again = registry.create_room("a".to_string(), None, false).await;

        assert_eq!(again.err(), Some(RoomError::AlreadyExists));
        assert_eq!(registry.room_count().await, 1);
    }

    #[tokio::test]
    async fn when_capacity_is_zero_then_create_fails() {
        let registry = registry();

        let result = registry.create_room("a".to_string(), Some(0), false).await;

        assert_eq!(result.err(), Some(RoomError::InvalidCapacity));
    }

    #[tokio::test]
    async fn when_last_connection_leaves_then_unpinned_room_is_removed() {
        let registry = registry();
        registry
            .create_room("a".to_string(), None, false)
            .await
            .expect("create");
        registry
            .create_room("pinned".to_string(), None, true)
            .await
            .expect("create");

        for id in ["a", "pinned"] {
            assert_eq!(registry.register_connection(id).await, Some(1));
            registry.register_disconnect(id).await;
        }

        assert!(registry.get_room("a").await.is_none());
        assert!(registry.get_room("pinned").await.is_some());
        assert_eq!(registry.register_connection("a").await, None);
    }
}
