//! Static content tables: collectible characters, weapons, and the scripted
//! opponent roster. Templates are fixed data; owned items reference them by
//! name.

pub mod characters;
pub mod opponents;
pub mod weapons;

pub use characters::{find_character, Ability, Buff, CharacterTemplate, CHARACTERS};
pub use opponents::{random_opponent, OpponentTemplate, OPPONENTS};
pub use weapons::{find_weapon, WeaponTemplate, WEAPONS};

use crate::core::constants::*;
use serde::{Deserialize, Serialize};

/// Rarity ladder in declared draw order. `Exalted` is reserved for special
/// grants and never rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Legendary,
    Mythic,
    UltraRare,
    Exalted,
}

impl Rarity {
    /// Declared draw order for the weighted walk.
    pub const ALL: [Rarity; 6] = [
        Rarity::Common,
        Rarity::Rare,
        Rarity::Legendary,
        Rarity::Mythic,
        Rarity::UltraRare,
        Rarity::Exalted,
    ];

    /// Probability mass this tier contributes to a draw.
    pub fn drop_mass(self) -> f64 {
        match self {
            Rarity::Common => DROP_MASS_COMMON,
            Rarity::Rare => DROP_MASS_RARE,
            Rarity::Legendary => DROP_MASS_LEGENDARY,
            Rarity::Mythic => DROP_MASS_MYTHIC,
            Rarity::UltraRare => DROP_MASS_ULTRA_RARE,
            Rarity::Exalted => 0.0,
        }
    }

    /// Ordering used to pick the ability-gate collectible.
    pub fn rank(self) -> u32 {
        self as u32
    }

    pub fn is_rollable(self) -> bool {
        self.drop_mass() > 0.0
    }
}
