use crate::builds::PlayerBuild;
use crate::catalog::{Ability, OpponentTemplate};
use crate::core::ids::{ConnectionId, SessionId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleMode {
    Pve,
    Pvp,
}

/// Player-submitted battle actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleAction {
    FastAttack,
    StrongAttack,
    Defend,
    UseAbility,
    AwakenedAbility,
}

/// Temporary empowered state entered by an ability cast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AwakenedState {
    pub active: bool,
    pub ability_name: Option<&'static str>,
    pub turns_left: u32,
}

/// One side of a battle. Owned exclusively by its session for the session's
/// lifetime.
#[derive(Debug, Clone)]
pub struct CombatantState {
    pub name: String,
    /// `None` for scripted opponents.
    pub user_id: Option<UserId>,
    pub connection: Option<ConnectionId>,
    pub power: u32,
    pub health: u32,
    pub max_health: u32,
    /// Cleared at the start of this combatant's own next action, or when
    /// reduced inbound damage is applied, whichever comes first.
    pub is_defending: bool,
    /// One-shot gate: set the first time the ability fires, never reset
    /// within a session.
    pub ability_used: bool,
    pub ability: Option<&'static Ability>,
    pub awakened: AwakenedState,
}

impl CombatantState {
    /// A live player side, stats taken from a freshly computed build.
    pub fn from_build(
        name: String,
        user_id: UserId,
        connection: ConnectionId,
        build: &PlayerBuild,
    ) -> Self {
        Self {
            name,
            user_id: Some(user_id),
            connection: Some(connection),
            power: build.total_power,
            health: build.total_health,
            max_health: build.total_health,
            is_defending: false,
            ability_used: false,
            ability: build.ability_source.and_then(|c| c.ability.as_ref()),
            awakened: AwakenedState::default(),
        }
    }

    /// A scripted opponent side.
    pub fn from_opponent(template: &OpponentTemplate) -> Self {
        Self {
            name: template.name.to_string(),
            user_id: None,
            connection: None,
            power: template.power,
            health: template.health,
            max_health: template.health,
            is_defending: false,
            ability_used: false,
            ability: None,
            awakened: AwakenedState::default(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn take_damage(&mut self, amount: u32) {
        self.health = self.health.saturating_sub(amount);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    /// A combatant's health reached zero.
    Victory { winner: usize },
    /// The other side disconnected mid-battle (PvP only).
    Forfeit { winner: usize },
}

impl BattleOutcome {
    pub fn winner(&self) -> usize {
        match *self {
            BattleOutcome::Victory { winner } | BattleOutcome::Forfeit { winner } => winner,
        }
    }
}

/// What happened while resolving one action. Sides are combatant indexes.
#[derive(Debug, Clone, PartialEq)]
pub enum BattleEvent {
    Hit {
        attacker: usize,
        damage: u32,
        crit: bool,
    },
    Missed {
        attacker: usize,
    },
    Defending {
        side: usize,
    },
    AbilityCast {
        caster: usize,
        ability: &'static Ability,
    },
    AwakenedStrike {
        caster: usize,
        damage: u32,
    },
    AwakeningEnded {
        side: usize,
    },
    Finished {
        winner: usize,
    },
}

/// Deferred work the engine schedules on a non-blocking timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// Scripted retaliation after the player's action (PvE).
    OpponentTurn,
    /// The deferred damage of an ability cast, after the cutscene delay.
    AwakenedStrike { side: usize },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolution {
    pub events: Vec<BattleEvent>,
    pub follow_up: Option<FollowUp>,
}

/// Live state of one battle. Exactly one session exists per active battle;
/// mutation is serialized by the owning engine.
#[derive(Debug, Clone)]
pub struct BattleSession {
    pub id: SessionId,
    pub mode: BattleMode,
    /// Side 0 is the requesting player (PvE) or the first-queued player
    /// (PvP); side 1 the scripted opponent or second-queued player.
    pub combatants: [CombatantState; 2],
    /// Whose action is expected next. Stays 0 for PvE.
    pub turn: usize,
    /// A scheduled delay is outstanding; actions are rejected until it
    /// resolves.
    pub locked: bool,
    /// Append-only battle log.
    pub log: Vec<String>,
    pub outcome: Option<BattleOutcome>,
}

impl BattleSession {
    pub fn new_pve(player: CombatantState, opponent: &OpponentTemplate) -> Self {
        Self {
            id: SessionId::new(),
            mode: BattleMode::Pve,
            combatants: [player, CombatantState::from_opponent(opponent)],
            turn: 0,
            locked: false,
            log: Vec::new(),
            outcome: None,
        }
    }

    pub fn new_pvp(first: CombatantState, second: CombatantState) -> Self {
        Self {
            id: SessionId::new(),
            mode: BattleMode::Pvp,
            combatants: [first, second],
            turn: 0,
            locked: false,
            log: Vec::new(),
            outcome: None,
        }
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn side_of_connection(&self, connection: ConnectionId) -> Option<usize> {
        self.combatants
            .iter()
            .position(|c| c.connection == Some(connection))
    }

    pub fn side_of_user(&self, user: UserId) -> Option<usize> {
        self.combatants
            .iter()
            .position(|c| c.user_id == Some(user))
    }

    pub fn push_log(&mut self, line: String) {
        self.log.push(line);
    }

    /// Human-readable line for one event, appended to the session log.
    pub fn log_event(&mut self, event: &BattleEvent) {
        let line = match event {
            BattleEvent::Hit {
                attacker,
                damage,
                crit,
            } => {
                let suffix = if *crit { " (critical)" } else { "" };
                format!(
                    "{} hits {} for {}{}",
                    self.combatants[*attacker].name,
                    self.combatants[1 - *attacker].name,
                    damage,
                    suffix
                )
            }
            BattleEvent::Missed { attacker } => {
                format!("{} misses", self.combatants[*attacker].name)
            }
            BattleEvent::Defending { side } => {
                format!("{} braces to defend", self.combatants[*side].name)
            }
            BattleEvent::AbilityCast { caster, ability } => {
                format!(
                    "{} awakens: {}",
                    self.combatants[*caster].name, ability.name
                )
            }
            BattleEvent::AwakenedStrike { caster, damage } => {
                format!(
                    "{} unleashes the awakened strike for {}",
                    self.combatants[*caster].name, damage
                )
            }
            BattleEvent::AwakeningEnded { side } => {
                format!("{}'s awakening fades", self.combatants[*side].name)
            }
            BattleEvent::Finished { winner } => {
                format!("{} wins the battle", self.combatants[*winner].name)
            }
        };
        self.push_log(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builds::compute_build;
    use crate::catalog::OPPONENTS;

    #[test]
    fn test_combatant_from_build() {
        let build = compute_build(10, 10, &[], &[]);
        let combatant = CombatantState::from_build(
            "Hero".to_string(),
            UserId::new(),
            ConnectionId::new(),
            &build,
        );
        assert_eq!(combatant.power, 30);
        assert_eq!(combatant.health, 150);
        assert_eq!(combatant.max_health, 150);
        assert!(combatant.ability.is_none());
        assert!(!combatant.ability_used);
    }

    #[test]
    fn test_take_damage_saturates() {
        let mut opponent = CombatantState::from_opponent(&OPPONENTS[0]);
        opponent.take_damage(opponent.max_health + 500);
        assert_eq!(opponent.health, 0);
        assert!(!opponent.is_alive());
    }

    #[test]
    fn test_new_pve_session_starts_open() {
        let build = compute_build(5, 5, &[], &[]);
        let player = CombatantState::from_build(
            "Hero".to_string(),
            UserId::new(),
            ConnectionId::new(),
            &build,
        );
        let session = BattleSession::new_pve(player, &OPPONENTS[3]);
        assert_eq!(session.turn, 0);
        assert!(!session.locked);
        assert!(!session.is_over());
        assert_eq!(session.combatants[1].name, "Iron Colossus");
    }

    #[test]
    fn test_side_lookup_by_connection() {
        let conn = ConnectionId::new();
        let build = compute_build(5, 5, &[], &[]);
        let player =
            CombatantState::from_build("Hero".to_string(), UserId::new(), conn, &build);
        let session = BattleSession::new_pve(player, &OPPONENTS[0]);
        assert_eq!(session.side_of_connection(conn), Some(0));
        assert_eq!(session.side_of_connection(ConnectionId::new()), None);
    }
}
