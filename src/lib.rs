//! Client-side synchronization engine for MindClash quiz rooms.
//!
//! The server only offers a request/response API, so this crate rebuilds a
//! push-like experience on top of periodic snapshot polling: consecutive
//! snapshots are diffed into discrete, exactly-once events (game started,
//! question advanced, all answered, game ended) while a locally predicted
//! countdown tracks the server-declared per-question deadline and auto-submits
//! a timeout answer exactly once per round.

pub mod api;
pub mod config;
pub mod dto;
pub mod error;
pub mod session;
pub mod sync;
