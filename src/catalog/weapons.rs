use super::Rarity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeaponTemplate {
    pub name: &'static str,
    pub rarity: Rarity,
    pub attack_bonus: u32,
}

// No Mythic weapons exist: the draw walk must skip that tier without
// consuming its probability mass.
pub const WEAPONS: &[WeaponTemplate] = &[
    // Common
    WeaponTemplate {
        name: "Rusty Shortsword",
        rarity: Rarity::Common,
        attack_bonus: 3,
    },
    WeaponTemplate {
        name: "Oak Cudgel",
        rarity: Rarity::Common,
        attack_bonus: 4,
    },
    WeaponTemplate {
        name: "Hunting Knife",
        rarity: Rarity::Common,
        attack_bonus: 5,
    },
    // Rare
    WeaponTemplate {
        name: "Steel Longsword",
        rarity: Rarity::Rare,
        attack_bonus: 12,
    },
    WeaponTemplate {
        name: "Twinfang Daggers",
        rarity: Rarity::Rare,
        attack_bonus: 14,
    },
    // Legendary
    WeaponTemplate {
        name: "Stormbrand",
        rarity: Rarity::Legendary,
        attack_bonus: 28,
    },
    WeaponTemplate {
        name: "Night Reaver",
        rarity: Rarity::Legendary,
        attack_bonus: 32,
    },
    // Ultra-rare
    WeaponTemplate {
        name: "Worldsplitter",
        rarity: Rarity::UltraRare,
        attack_bonus: 60,
    },
];

pub fn find_weapon(name: &str) -> Option<&'static WeaponTemplate> {
    WEAPONS.iter().find(|w| w.name == name)
}
