//! Wire types received from the game server and events exposed to consumers.

pub mod event;
pub mod game;
