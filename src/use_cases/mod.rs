// Use cases layer: room workflows on top of the domain.

pub mod game;
pub mod rooms;
pub mod types;

pub use rooms::{RoomError, RoomHandle, RoomRegistry, RoomSettings};
pub use types::{OutboundFrame, RoomEvent, RoomUpdate};
