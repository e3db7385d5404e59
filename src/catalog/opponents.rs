use rand::Rng;

/// A scripted PvE opponent. The roster order is fixed; selection per battle
/// is uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpponentTemplate {
    pub name: &'static str,
    pub power: u32,
    pub health: u32,
}

pub const OPPONENTS: &[OpponentTemplate] = &[
    OpponentTemplate {
        name: "Pit Ruffian",
        power: 60,
        health: 180,
    },
    OpponentTemplate {
        name: "Caged Ogre",
        power: 85,
        health: 260,
    },
    OpponentTemplate {
        name: "Sandpit Duelist",
        power: 110,
        health: 220,
    },
    OpponentTemplate {
        name: "Iron Colossus",
        power: 120,
        health: 150,
    },
    OpponentTemplate {
        name: "Veiled Assassin",
        power: 150,
        health: 200,
    },
    OpponentTemplate {
        name: "Arena Revenant",
        power: 180,
        health: 320,
    },
];

pub fn random_opponent(rng: &mut impl Rng) -> &'static OpponentTemplate {
    &OPPONENTS[rng.gen_range(0..OPPONENTS.len())]
}
