//! Weighted rarity draws over the character and weapon catalogs.

use crate::catalog::{CharacterTemplate, Rarity, WeaponTemplate, CHARACTERS, WEAPONS};
use rand::Rng;

/// Walks the rarity ladder in declared order, accumulating drop mass, and
/// returns the first tier whose cumulative mass exceeds the draw.
///
/// Tiers with an empty pool for the requested table contribute nothing to
/// the accumulator, so their mass is not consumed by the walk. If the draw
/// lands past everything that is stocked, the last stocked tier wins.
fn roll_tier(rng: &mut impl Rng, pool_stocked: impl Fn(Rarity) -> bool) -> Rarity {
    let draw = rng.gen::<f64>();
    let mut cumulative = 0.0;
    let mut last_stocked = Rarity::Common;

    for rarity in Rarity::ALL {
        if !rarity.is_rollable() || !pool_stocked(rarity) {
            continue;
        }
        cumulative += rarity.drop_mass();
        last_stocked = rarity;
        if draw < cumulative {
            return rarity;
        }
    }

    last_stocked
}

fn pick_uniform<'a, T>(rng: &mut impl Rng, pool: &[&'a T]) -> &'a T {
    pool[rng.gen_range(0..pool.len())]
}

/// Draws one character template, rarity-weighted.
pub fn roll_character(rng: &mut impl Rng) -> &'static CharacterTemplate {
    let tier = roll_tier(rng, |rarity| {
        CHARACTERS.iter().any(|c| c.rarity == rarity)
    });
    let pool: Vec<&'static CharacterTemplate> =
        CHARACTERS.iter().filter(|c| c.rarity == tier).collect();
    pick_uniform(rng, &pool)
}

/// Draws one weapon template, rarity-weighted. Tiers with no weapons defined
/// are skipped without soaking their probability mass.
pub fn roll_weapon(rng: &mut impl Rng) -> &'static WeaponTemplate {
    let tier = roll_tier(rng, |rarity| WEAPONS.iter().any(|w| w.rarity == rarity));
    let pool: Vec<&'static WeaponTemplate> =
        WEAPONS.iter().filter(|w| w.rarity == tier).collect();
    pick_uniform(rng, &pool)
}
