use super::Rarity;
use serde::{Deserialize, Serialize};

/// Passive buff a collectible grants its owner. Every kind is handled
/// exhaustively; adding one is a compile-time decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Buff {
    AttackPercent(f64),
    DefensePercent(f64),
    HealthFlat(u32),
    AttackFlat(u32),
    /// Adds to both attack and defense percent totals.
    AllPercent(f64),
    Mixed { attack_percent: f64, health_flat: u32 },
}

/// Active ability carried by a subset of collectibles. Cast once per battle;
/// the damage lands as a deferred follow-up strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ability {
    pub name: &'static str,
    pub damage: u32,
    /// Narrative shown to the opposing player during the cutscene.
    pub cutscene_lines: &'static [&'static str],
    pub audio_theme: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterTemplate {
    pub name: &'static str,
    pub rarity: Rarity,
    /// Intrinsic attack, granted as a flat bonus when this is the owner's
    /// highest-health collectible.
    pub attack: u32,
    /// Intrinsic health; also the tiebreak-free dominance criterion.
    pub health: u32,
    pub buff: Buff,
    pub ability: Option<Ability>,
}

pub const CHARACTERS: &[CharacterTemplate] = &[
    // Common
    CharacterTemplate {
        name: "Town Recruit",
        rarity: Rarity::Common,
        attack: 4,
        health: 30,
        buff: Buff::AttackFlat(2),
        ability: None,
    },
    CharacterTemplate {
        name: "Field Scout",
        rarity: Rarity::Common,
        attack: 6,
        health: 24,
        buff: Buff::AttackPercent(0.03),
        ability: None,
    },
    CharacterTemplate {
        name: "Lantern Acolyte",
        rarity: Rarity::Common,
        attack: 3,
        health: 36,
        buff: Buff::HealthFlat(15),
        ability: None,
    },
    CharacterTemplate {
        name: "Stray Swordhand",
        rarity: Rarity::Common,
        attack: 7,
        health: 28,
        buff: Buff::DefensePercent(0.03),
        ability: None,
    },
    // Rare
    CharacterTemplate {
        name: "Ember Duelist",
        rarity: Rarity::Rare,
        attack: 14,
        health: 55,
        buff: Buff::AttackPercent(0.08),
        ability: None,
    },
    CharacterTemplate {
        name: "Granite Warden",
        rarity: Rarity::Rare,
        attack: 9,
        // Outlives several Legendaries; dominance by health and gating by
        // rarity intentionally diverge on rosters like this.
        health: 120,
        buff: Buff::Mixed {
            attack_percent: 0.04,
            health_flat: 30,
        },
        ability: None,
    },
    CharacterTemplate {
        name: "Mistwood Archer",
        rarity: Rarity::Rare,
        attack: 16,
        health: 48,
        buff: Buff::AttackFlat(8),
        ability: None,
    },
    // Legendary
    CharacterTemplate {
        name: "Valkyrie of the Breach",
        rarity: Rarity::Legendary,
        attack: 28,
        health: 90,
        buff: Buff::AllPercent(0.10),
        ability: Some(Ability {
            name: "Spearfall",
            damage: 140,
            cutscene_lines: &[
                "The clouds split above the arena.",
                "A thousand spears answer her call.",
            ],
            audio_theme: "valkyrie_breach",
        }),
    },
    CharacterTemplate {
        name: "Tidecaller Morvan",
        rarity: Rarity::Legendary,
        attack: 24,
        health: 105,
        buff: Buff::DefensePercent(0.12),
        ability: None,
    },
    CharacterTemplate {
        name: "Ashen Blademaster",
        rarity: Rarity::Legendary,
        attack: 32,
        health: 80,
        buff: Buff::AttackPercent(0.15),
        ability: Some(Ability {
            name: "Cindering Arc",
            damage: 120,
            cutscene_lines: &[
                "He sheathes the blade. The air keeps burning.",
            ],
            audio_theme: "ashen_arc",
        }),
    },
    // Mythic
    CharacterTemplate {
        name: "Seraph of the Last Gate",
        rarity: Rarity::Mythic,
        attack: 45,
        health: 150,
        buff: Buff::AllPercent(0.18),
        ability: Some(Ability {
            name: "Gatebreaker Radiance",
            damage: 220,
            cutscene_lines: &[
                "Six wings unfold, each a verdict.",
                "The last gate opens inward.",
            ],
            audio_theme: "seraph_gate",
        }),
    },
    CharacterTemplate {
        name: "Hollow King Dravec",
        rarity: Rarity::Mythic,
        attack: 52,
        health: 130,
        buff: Buff::Mixed {
            attack_percent: 0.12,
            health_flat: 60,
        },
        ability: Some(Ability {
            name: "Crown of Silence",
            damage: 200,
            cutscene_lines: &[
                "The crown rises from his brow.",
                "Sound itself kneels.",
            ],
            audio_theme: "hollow_crown",
        }),
    },
    // Ultra-rare
    CharacterTemplate {
        name: "Aeon Weaver Ilyss",
        rarity: Rarity::UltraRare,
        attack: 70,
        health: 210,
        buff: Buff::AllPercent(0.25),
        ability: Some(Ability {
            name: "Unravel",
            damage: 400,
            cutscene_lines: &[
                "She finds the thread your fate hangs on.",
                "And pulls.",
            ],
            audio_theme: "aeon_unravel",
        }),
    },
    // Exalted: grant-only, never rolled
    CharacterTemplate {
        name: "The First Champion",
        rarity: Rarity::Exalted,
        attack: 95,
        health: 300,
        buff: Buff::AllPercent(0.35),
        ability: Some(Ability {
            name: "Opening Move",
            damage: 600,
            cutscene_lines: &[
                "Before there were rules, there was one fight.",
                "This is how it ended.",
            ],
            audio_theme: "first_champion",
        }),
    },
];

pub fn find_character(name: &str) -> Option<&'static CharacterTemplate> {
    CHARACTERS.iter().find(|c| c.name == name)
}
