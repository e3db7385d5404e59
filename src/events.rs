//! Outbound event payloads and the sink abstraction the engine emits
//! through. The transport (websocket, test recorder) is opaque here; the
//! only requirement is ordered delivery per connection.

use crate::battle::{BattleEvent, BattleSession};
use crate::catalog::Rarity;
use crate::core::constants::*;
use crate::core::ids::{ConnectionId, SessionId, UserId};
use serde::Serialize;

pub trait EventSink: Send + Sync {
    fn send(&self, connection: ConnectionId, event: ServerEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct AwakenedView {
    pub active: bool,
    pub ability_name: Option<String>,
    pub turns_left: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CombatantView {
    pub name: String,
    pub health: u32,
    pub max_health: u32,
    pub power: u32,
    pub is_defending: bool,
    pub ability_ready: bool,
    pub awakened: AwakenedView,
}

/// One side's perspective of a battle: self as "you", the other side as
/// "opponent".
#[derive(Debug, Clone, Serialize)]
pub struct BattleView {
    pub session_id: SessionId,
    pub you: CombatantView,
    pub opponent: CombatantView,
    pub your_turn: bool,
    pub locked: bool,
    pub log: Vec<String>,
}

fn combatant_view(session: &BattleSession, side: usize) -> CombatantView {
    let combatant = &session.combatants[side];
    CombatantView {
        name: combatant.name.clone(),
        health: combatant.health,
        max_health: combatant.max_health,
        power: combatant.power,
        is_defending: combatant.is_defending,
        ability_ready: combatant.ability.is_some() && !combatant.ability_used,
        awakened: AwakenedView {
            active: combatant.awakened.active,
            ability_name: combatant.awakened.ability_name.map(str::to_string),
            turns_left: combatant.awakened.turns_left,
        },
    }
}

pub fn battle_view(session: &BattleSession, side: usize) -> BattleView {
    let log_start = session.log.len().saturating_sub(BATTLE_LOG_CAPACITY);
    BattleView {
        session_id: session.id,
        you: combatant_view(session, side),
        opponent: combatant_view(session, 1 - side),
        your_turn: session.turn == side && !session.locked && !session.is_over(),
        locked: session.locked,
        log: session.log[log_start..].to_vec(),
    }
}

/// A battle event mapped into one side's perspective.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BattleEventView {
    Hit { mine: bool, damage: u32, crit: bool },
    Missed { mine: bool },
    Defending { mine: bool },
    AbilityCast { mine: bool, ability: String },
    AwakenedStrike { mine: bool, damage: u32 },
    AwakeningEnded { mine: bool },
    Finished { won: bool },
}

pub fn event_view(event: &BattleEvent, side: usize) -> BattleEventView {
    match event {
        BattleEvent::Hit {
            attacker,
            damage,
            crit,
        } => BattleEventView::Hit {
            mine: *attacker == side,
            damage: *damage,
            crit: *crit,
        },
        BattleEvent::Missed { attacker } => BattleEventView::Missed {
            mine: *attacker == side,
        },
        BattleEvent::Defending { side: defender } => BattleEventView::Defending {
            mine: *defender == side,
        },
        BattleEvent::AbilityCast { caster, ability } => BattleEventView::AbilityCast {
            mine: *caster == side,
            ability: ability.name.to_string(),
        },
        BattleEvent::AwakenedStrike { caster, damage } => BattleEventView::AwakenedStrike {
            mine: *caster == side,
            damage: *damage,
        },
        BattleEvent::AwakeningEnded { side: owner } => BattleEventView::AwakeningEnded {
            mine: *owner == side,
        },
        BattleEvent::Finished { winner } => BattleEventView::Finished {
            won: *winner == side,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LootKind {
    Character,
    Weapon,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub name: String,
    pub coins: u64,
    pub level: u32,
    pub xp: u64,
    pub xp_to_next_level: u64,
    pub stat_points: u32,
    pub strength: u32,
    pub vitality: u32,
    pub power: u32,
    pub max_health: u32,
    pub collectibles: Vec<String>,
    pub weapons: Vec<String>,
}

/// Everything the server pushes to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Welcome {
        user_id: UserId,
        profile: ProfileView,
    },
    Profile {
        profile: ProfileView,
    },
    Queued,
    BattleStarted {
        snapshot: BattleView,
    },
    BattleUpdate {
        snapshot: BattleView,
        events: Vec<BattleEventView>,
    },
    /// Spectator-facing awakening cutscene, sent to the caster's opponent.
    Cutscene {
        caster: String,
        ability: String,
        lines: Vec<String>,
        audio_theme: String,
    },
    BattleEnded {
        won: bool,
        forfeit: bool,
        coins_awarded: u64,
        xp_awarded: u64,
        coins_lost: u64,
    },
    LevelUp {
        new_level: u32,
        stat_points_awarded: u32,
    },
    LootGranted {
        kind: LootKind,
        name: String,
        rarity: Rarity,
        balance: u64,
    },
    Error {
        code: String,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::CombatantState;
    use crate::builds::compute_build;
    use crate::catalog::OPPONENTS;

    fn session() -> BattleSession {
        let build = compute_build(10, 5, &[], &[]);
        let player = CombatantState::from_build(
            "Hero".to_string(),
            UserId::new(),
            ConnectionId::new(),
            &build,
        );
        BattleSession::new_pve(player, &OPPONENTS[0])
    }

    #[test]
    fn test_view_swaps_perspective() {
        let session = session();
        let mine = battle_view(&session, 0);
        assert_eq!(mine.you.name, "Hero");
        assert_eq!(mine.opponent.name, "Pit Ruffian");
        assert!(mine.your_turn);

        let theirs = battle_view(&session, 1);
        assert_eq!(theirs.you.name, "Pit Ruffian");
        assert_eq!(theirs.opponent.name, "Hero");
        assert!(!theirs.your_turn);
    }

    #[test]
    fn test_event_view_maps_actor() {
        let event = BattleEvent::Hit {
            attacker: 0,
            damage: 12,
            crit: false,
        };
        assert!(matches!(
            event_view(&event, 0),
            BattleEventView::Hit { mine: true, .. }
        ));
        assert!(matches!(
            event_view(&event, 1),
            BattleEventView::Hit { mine: false, .. }
        ));
    }

    #[test]
    fn test_server_event_serializes_with_type_tag() {
        let json = serde_json::to_string(&ServerEvent::Queued).unwrap();
        assert_eq!(json, r#"{"type":"queued"}"#);
    }
}
