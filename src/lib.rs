//! Arena - browser RPG battle server
//!
//! Combat simulation and matchmaking core: build derivation, rarity loot,
//! experience progression, turn-based battle sessions (PvE and PvP), and
//! the websocket front end that serves them.

pub mod battle;
pub mod build_info;
pub mod builds;
pub mod catalog;
pub mod core;
pub mod engine;
pub mod events;
pub mod loot;
pub mod matchmaking;
pub mod progression;
pub mod registry;
pub mod store;
pub mod web;

pub use crate::core::constants;
pub use crate::core::errors::{GameError, StoreError};
pub use crate::core::ids::{ConnectionId, SessionId, UserId};
pub use crate::engine::{EngineConfig, GameEngine};
