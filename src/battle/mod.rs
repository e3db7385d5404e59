//! Turn-based battle sessions: state, actions, and resolution logic for
//! both scripted (PvE) and player-versus-player fights.

pub mod logic;
pub mod types;

pub use logic::*;
pub use types::*;
