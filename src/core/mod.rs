//! Core constants, identifiers, and the error taxonomy.

pub mod constants;
pub mod errors;
pub mod ids;

pub use constants::*;
pub use errors::*;
pub use ids::*;
