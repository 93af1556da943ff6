// Domain layer: world state, simulation rules and the room that drives them.

pub mod commands;
pub mod diff;
pub mod events;
pub mod room;
pub mod state;
pub mod systems;
pub mod tuning;

pub use commands::{Command, CommandError};
pub use diff::{StatePatch, WorldSnapshot};
pub use events::{GameResult, Outbound, Recipients, RoomMessage};
pub use room::{JoinError, Room};
pub use state::{SessionId, TimeOfDay, World};
pub use tuning::clan::Clan;
pub use tuning::room::RoomConfig;
