// Build formulas
pub const BASE_POWER: u32 = 10;
pub const POWER_PER_STRENGTH: u32 = 2;
pub const BASE_HEALTH: u32 = 50;
pub const HEALTH_PER_VITALITY: u32 = 10;

// New-account defaults
pub const STARTING_COINS: u64 = 200;
pub const STARTING_STRENGTH: u32 = 5;
pub const STARTING_VITALITY: u32 = 5;
pub const STARTER_CHARACTER: &str = "Town Recruit";
pub const STARTER_WEAPON: &str = "Rusty Shortsword";

// XP and leveling
pub const XP_CURVE_BASE: f64 = 100.0;
pub const XP_CURVE_EXPONENT: f64 = 1.5;
pub const LEVEL_UP_STAT_POINTS: u32 = 5;

// Attack actions
pub const FAST_ATTACK_POWER_SCALE: f64 = 0.5;
pub const FAST_ATTACK_VARIANCE: f64 = 0.10;
pub const STRONG_ATTACK_POWER_SCALE: f64 = 1.0;
pub const STRONG_ATTACK_VARIANCE: f64 = 0.20;
pub const STRONG_ATTACK_CONNECT_CHANCE: f64 = 0.70;

// Critical hits
pub const PLAYER_CRIT_CHANCE: f64 = 0.10;
pub const OPPONENT_CRIT_CHANCE: f64 = 0.05;
pub const CRIT_MULTIPLIER: f64 = 1.5;

// Scripted opponent retaliation
pub const OPPONENT_POWER_SCALE: f64 = 0.8;
pub const OPPONENT_VARIANCE: f64 = 0.20;

// Defending reduces inbound damage to this share of the rolled value
pub const DEFEND_DAMAGE_SCALE: f64 = 0.30;

// Awakening lasts this many resolved enemy turns
pub const AWAKENING_DURATION_TURNS: u32 = 3;

// Scheduled delays (non-blocking timers)
pub const OPPONENT_TURN_DELAY_MS: u64 = 1200;
pub const CUTSCENE_DELAY_MS: u64 = 2500;

// Battle settlement
pub const PVE_WIN_COINS: u64 = 50;
pub const PVE_WIN_XP: u64 = 50;
pub const PVE_LOSS_COIN_PENALTY: u64 = 25;
pub const PVP_WIN_COINS: u64 = 100;
pub const PVP_WIN_XP: u64 = 100;

// Loot shop
pub const CHARACTER_ROLL_COST: u64 = 100;
pub const WEAPON_ROLL_COST: u64 = 60;

// Rarity drop mass, in declared draw order. Exalted never rolls.
pub const DROP_MASS_COMMON: f64 = 0.60;
pub const DROP_MASS_RARE: f64 = 0.25;
pub const DROP_MASS_LEGENDARY: f64 = 0.10;
pub const DROP_MASS_MYTHIC: f64 = 0.045;
pub const DROP_MASS_ULTRA_RARE: f64 = 0.005;

// Battle log retention
pub const BATTLE_LOG_CAPACITY: usize = 50;

// Snapshot store
pub const SNAPSHOT_VERSION_MAGIC: u64 = 0x4152454E41563100; // "ARENAV1\0"

// Websocket server
pub const DEFAULT_PORT: u16 = 3000;
