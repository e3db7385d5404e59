//! Combat stat derivation: attribute points plus owned collectibles and the
//! best owned weapon. Recomputed fresh at every battle start, never cached.

use crate::catalog::{Buff, CharacterTemplate, WeaponTemplate};
use crate::core::constants::*;

#[derive(Debug, Clone, Copy)]
pub struct PlayerBuild {
    pub base_power: u32,
    pub base_health: u32,
    pub flat_attack_bonus: u32,
    pub flat_health_bonus: u32,
    pub attack_percent_bonus: f64,
    pub defense_percent_bonus: f64,
    pub weapon_bonus: u32,
    pub total_power: u32,
    pub total_health: u32,
    /// Collectible whose ability the owner may invoke in battle: the owned
    /// collectible with the highest rarity rank. This is a different
    /// selection from the flat-bonus anchor, which goes by intrinsic health.
    pub ability_source: Option<&'static CharacterTemplate>,
}

/// Pure derivation of combat stats. Safe to call repeatedly and concurrently
/// for different players.
pub fn compute_build(
    strength: u32,
    vitality: u32,
    collectibles: &[&'static CharacterTemplate],
    weapons: &[&'static WeaponTemplate],
) -> PlayerBuild {
    let base_power = BASE_POWER + POWER_PER_STRENGTH * strength;
    let base_health = BASE_HEALTH + HEALTH_PER_VITALITY * vitality;

    let mut flat_attack_bonus = 0u32;
    let mut flat_health_bonus = 0u32;
    let mut attack_percent_bonus = 0.0f64;
    let mut defense_percent_bonus = 0.0f64;

    // Flat-bonus anchor: highest intrinsic health, first owned wins ties.
    if let Some(anchor) = collectibles
        .iter()
        .copied()
        .reduce(|best, c| if c.health > best.health { c } else { best })
    {
        flat_attack_bonus += anchor.attack;
        flat_health_bonus += anchor.health;
    }

    for collectible in collectibles {
        match collectible.buff {
            Buff::AttackPercent(p) => attack_percent_bonus += p,
            Buff::DefensePercent(p) => defense_percent_bonus += p,
            Buff::HealthFlat(h) => flat_health_bonus += h,
            Buff::AttackFlat(a) => flat_attack_bonus += a,
            Buff::AllPercent(p) => {
                attack_percent_bonus += p;
                defense_percent_bonus += p;
            }
            Buff::Mixed {
                attack_percent,
                health_flat,
            } => {
                attack_percent_bonus += attack_percent;
                flat_health_bonus += health_flat;
            }
        }
    }

    let weapon_bonus = weapons.iter().map(|w| w.attack_bonus).max().unwrap_or(0);

    // Floor applied once, at the end.
    let total_power = ((base_power + flat_attack_bonus) as f64 * (1.0 + attack_percent_bonus)
        + weapon_bonus as f64)
        .floor() as u32;
    let total_health = base_health + flat_health_bonus;

    // Ability gate: highest rarity rank, first owned wins ties.
    let ability_source = collectibles.iter().copied().reduce(|best, c| {
        if c.rarity.rank() > best.rarity.rank() {
            c
        } else {
            best
        }
    });

    PlayerBuild {
        base_power,
        base_health,
        flat_attack_bonus,
        flat_health_bonus,
        attack_percent_bonus,
        defense_percent_bonus,
        weapon_bonus,
        total_power,
        total_health,
        ability_source,
    }
}
