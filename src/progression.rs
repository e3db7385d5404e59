//! Experience accrual and level-up resolution.

use crate::core::constants::*;
use crate::core::errors::GameError;
use crate::store::PlayerRecord;
use serde::{Deserialize, Serialize};

/// Calculates the XP required to finish the given level.
pub fn xp_for_next_level(level: u32) -> u64 {
    (XP_CURVE_BASE * f64::powf(level as f64, XP_CURVE_EXPONENT)) as u64
}

/// One notification per level gained; a double level-up emits two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    pub new_level: u32,
    pub stat_points_awarded: u32,
}

/// Adds XP and resolves any level-ups, rolling overflow XP into repeated
/// level-ups within the same call. The caller persists the record once
/// afterwards, not per iteration.
pub fn gain_xp(record: &mut PlayerRecord, amount: u64) -> Vec<LevelUp> {
    record.xp += amount;

    let mut level_ups = Vec::new();
    while record.xp >= record.xp_to_next_level {
        record.xp -= record.xp_to_next_level;
        record.level += 1;
        record.stat_points += LEVEL_UP_STAT_POINTS;
        record.xp_to_next_level = xp_for_next_level(record.level);
        level_ups.push(LevelUp {
            new_level: record.level,
            stat_points_awarded: LEVEL_UP_STAT_POINTS,
        });
    }

    level_ups
}

/// Attribute a banked stat point can be spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Strength,
    Vitality,
}

/// Spends one banked stat point on the chosen attribute.
pub fn spend_stat_point(record: &mut PlayerRecord, stat: StatKind) -> Result<(), GameError> {
    if record.stat_points == 0 {
        return Err(GameError::InvalidAction);
    }
    record.stat_points -= 1;
    match stat {
        StatKind::Strength => record.strength += 1,
        StatKind::Vitality => record.vitality += 1,
    }
    Ok(())
}
