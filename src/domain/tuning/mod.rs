// Gameplay tuning tables, kept apart from runtime/server configuration.

pub mod abilities;
pub mod clan;
pub mod enemy;
pub mod room;
