use crate::battle::types::*;
use crate::core::constants::*;
use crate::core::errors::GameError;
use rand::Rng;

/// Randomness of one attack, separated from its application so outcomes can
/// be reproduced with fixed rolls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackRoll {
    pub variance: f64,
    pub crit: bool,
    pub connected: bool,
}

impl AttackRoll {
    /// Variance 1.0, no crit, connects. The neutral roll.
    pub fn flat() -> Self {
        Self {
            variance: 1.0,
            crit: false,
            connected: true,
        }
    }
}

fn roll_variance(rng: &mut impl Rng, spread: f64) -> f64 {
    rng.gen_range(1.0 - spread..1.0 + spread)
}

pub fn roll_fast_attack(rng: &mut impl Rng) -> AttackRoll {
    AttackRoll {
        variance: roll_variance(rng, FAST_ATTACK_VARIANCE),
        crit: rng.gen::<f64>() < PLAYER_CRIT_CHANCE,
        connected: true,
    }
}

pub fn roll_strong_attack(rng: &mut impl Rng) -> AttackRoll {
    AttackRoll {
        variance: roll_variance(rng, STRONG_ATTACK_VARIANCE),
        crit: rng.gen::<f64>() < PLAYER_CRIT_CHANCE,
        connected: rng.gen::<f64>() < STRONG_ATTACK_CONNECT_CHANCE,
    }
}

pub fn roll_opponent_attack(rng: &mut impl Rng) -> AttackRoll {
    AttackRoll {
        variance: roll_variance(rng, OPPONENT_VARIANCE),
        crit: rng.gen::<f64>() < OPPONENT_CRIT_CHANCE,
        connected: true,
    }
}

/// Damage of a connected attack: power, action scale, variance, then the
/// crit multiplier, floored once at the end.
pub fn attack_damage(power: u32, scale: f64, roll: &AttackRoll) -> u32 {
    let base = power as f64 * scale * roll.variance;
    let total = if roll.crit {
        base * CRIT_MULTIPLIER
    } else {
        base
    };
    total.floor() as u32
}

/// One enemy turn elapsed for `side`: decrement its awakening and clear it
/// on reaching zero. The end signal must precede any damage applied by the
/// same turn, so this runs before the attacker's damage is computed.
fn tick_awakening(session: &mut BattleSession, side: usize, events: &mut Vec<BattleEvent>) {
    let awakened = &mut session.combatants[side].awakened;
    if !awakened.active {
        return;
    }
    awakened.turns_left = awakened.turns_left.saturating_sub(1);
    if awakened.turns_left == 0 {
        awakened.active = false;
        awakened.ability_name = None;
        events.push(BattleEvent::AwakeningEnded { side });
    }
}

/// Applies rolled damage to a target, honoring an active defend: the inbound
/// value is reduced to its defend share before the flag clears.
fn apply_damage(session: &mut BattleSession, target: usize, rolled: u32) -> u32 {
    let target_state = &mut session.combatants[target];
    let damage = if target_state.is_defending {
        target_state.is_defending = false;
        (rolled as f64 * DEFEND_DAMAGE_SCALE) as u32
    } else {
        rolled
    };
    target_state.take_damage(damage);
    damage
}

fn finish(session: &mut BattleSession, winner: usize, events: &mut Vec<BattleEvent>) {
    session.outcome = Some(BattleOutcome::Victory { winner });
    session.locked = false;
    events.push(BattleEvent::Finished { winner });
}

fn log_all(session: &mut BattleSession, events: &[BattleEvent]) {
    for event in events {
        session.log_event(event);
    }
}

/// Validates and resolves one submitted action with freshly rolled
/// randomness.
pub fn submit_action(
    session: &mut BattleSession,
    side: usize,
    action: BattleAction,
    rng: &mut impl Rng,
) -> Result<Resolution, GameError> {
    let roll = match action {
        BattleAction::FastAttack => roll_fast_attack(rng),
        BattleAction::StrongAttack => roll_strong_attack(rng),
        _ => AttackRoll::flat(),
    };
    submit_action_rolled(session, side, action, roll)
}

/// Action resolution with the randomness supplied by the caller.
///
/// Rejections (`InvalidAction`, `NotEligible`) leave the session untouched;
/// the engine answers them by re-emitting the unchanged state.
pub fn submit_action_rolled(
    session: &mut BattleSession,
    side: usize,
    action: BattleAction,
    roll: AttackRoll,
) -> Result<Resolution, GameError> {
    if session.is_over() || session.locked || session.turn != side {
        return Err(GameError::InvalidAction);
    }
    match action {
        BattleAction::UseAbility => {
            let combatant = &session.combatants[side];
            if combatant.ability.is_none() || combatant.ability_used {
                return Err(GameError::NotEligible);
            }
        }
        BattleAction::AwakenedAbility => {
            if !session.combatants[side].awakened.active {
                return Err(GameError::NotEligible);
            }
        }
        _ => {}
    }

    let mut events = Vec::new();
    let foe = 1 - side;

    // Own defend lapses the moment this combatant acts again.
    session.combatants[side].is_defending = false;
    // This action is an elapsed enemy turn for the other side's awakening.
    tick_awakening(session, foe, &mut events);

    let mut follow_up = None;
    match action {
        BattleAction::FastAttack => {
            let rolled = attack_damage(session.combatants[side].power, FAST_ATTACK_POWER_SCALE, &roll);
            let damage = apply_damage(session, foe, rolled);
            events.push(BattleEvent::Hit {
                attacker: side,
                damage,
                crit: roll.crit,
            });
        }
        BattleAction::StrongAttack => {
            if roll.connected {
                let rolled =
                    attack_damage(session.combatants[side].power, STRONG_ATTACK_POWER_SCALE, &roll);
                let damage = apply_damage(session, foe, rolled);
                events.push(BattleEvent::Hit {
                    attacker: side,
                    damage,
                    crit: roll.crit,
                });
            } else {
                events.push(BattleEvent::Missed { attacker: side });
            }
        }
        BattleAction::Defend => {
            session.combatants[side].is_defending = true;
            events.push(BattleEvent::Defending { side });
        }
        BattleAction::UseAbility => {
            let combatant = &mut session.combatants[side];
            let Some(ability) = combatant.ability else {
                return Err(GameError::NotEligible);
            };
            combatant.ability_used = true;
            combatant.awakened = AwakenedState {
                active: true,
                ability_name: Some(ability.name),
                turns_left: AWAKENING_DURATION_TURNS,
            };
            events.push(BattleEvent::AbilityCast {
                caster: side,
                ability,
            });
            // Damage is deferred to the follow-up strike; control does not
            // pass to the other side until it resolves.
            session.locked = true;
            follow_up = Some(FollowUp::AwakenedStrike { side });
            log_all(session, &events);
            return Ok(Resolution { events, follow_up });
        }
        BattleAction::AwakenedAbility => {
            // Manual re-strike while awakened: fixed damage, consumes a turn
            // of the awakening.
            let Some(ability) = session.combatants[side].ability else {
                return Err(GameError::NotEligible);
            };
            let damage = apply_damage(session, foe, ability.damage);
            events.push(BattleEvent::AwakenedStrike {
                caster: side,
                damage,
            });
            tick_awakening(session, side, &mut events);
        }
    }

    if !session.combatants[foe].is_alive() {
        finish(session, side, &mut events);
    } else {
        match session.mode {
            BattleMode::Pve => {
                session.locked = true;
                follow_up = Some(FollowUp::OpponentTurn);
            }
            BattleMode::Pvp => {
                session.turn = foe;
            }
        }
    }

    log_all(session, &events);
    Ok(Resolution { events, follow_up })
}

/// The deferred damage of an ability cast, resolved after the cutscene
/// delay. Part of the cast turn: it does not consume an awakening turn.
pub fn resolve_awakened_strike(session: &mut BattleSession, side: usize) -> Resolution {
    if session.is_over() {
        return Resolution::default();
    }

    let mut events = Vec::new();
    let foe = 1 - side;
    let damage = match session.combatants[side].ability {
        Some(ability) => apply_damage(session, foe, ability.damage),
        None => 0,
    };
    events.push(BattleEvent::AwakenedStrike {
        caster: side,
        damage,
    });

    let mut follow_up = None;
    if !session.combatants[foe].is_alive() {
        finish(session, side, &mut events);
    } else {
        match session.mode {
            BattleMode::Pve => {
                // Stays locked through the scripted retaliation.
                follow_up = Some(FollowUp::OpponentTurn);
            }
            BattleMode::Pvp => {
                session.locked = false;
                session.turn = foe;
            }
        }
    }

    log_all(session, &events);
    Resolution { events, follow_up }
}

/// Scripted retaliation (PvE): fires after the scheduled delay and reopens
/// the session for the player's next action.
pub fn resolve_opponent_turn(session: &mut BattleSession, rng: &mut impl Rng) -> Resolution {
    resolve_opponent_turn_rolled(session, roll_opponent_attack(rng))
}

pub fn resolve_opponent_turn_rolled(session: &mut BattleSession, roll: AttackRoll) -> Resolution {
    if session.is_over() {
        return Resolution::default();
    }

    let mut events = Vec::new();
    // The retaliation is an elapsed enemy turn for the player's awakening;
    // the end signal lands before this turn's damage.
    tick_awakening(session, 0, &mut events);

    let rolled = attack_damage(session.combatants[1].power, OPPONENT_POWER_SCALE, &roll);
    let damage = apply_damage(session, 0, rolled);
    events.push(BattleEvent::Hit {
        attacker: 1,
        damage,
        crit: roll.crit,
    });

    if !session.combatants[0].is_alive() {
        finish(session, 1, &mut events);
    } else {
        session.locked = false;
    }

    log_all(session, &events);
    Resolution {
        events,
        follow_up: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Ability, OpponentTemplate};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    static TEST_ABILITY: Ability = Ability {
        name: "Test Ruin",
        damage: 400,
        cutscene_lines: &["The sky darkens."],
        audio_theme: "test_ruin",
    };

    const TEST_OPPONENT: OpponentTemplate = OpponentTemplate {
        name: "Training Dummy",
        power: 120,
        health: 150,
    };

    fn player(power: u32, health: u32, ability: Option<&'static Ability>) -> CombatantState {
        CombatantState {
            name: "Hero".to_string(),
            user_id: Some(crate::core::ids::UserId::new()),
            connection: Some(crate::core::ids::ConnectionId::new()),
            power,
            health,
            max_health: health,
            is_defending: false,
            ability_used: false,
            ability,
            awakened: AwakenedState::default(),
        }
    }

    fn pve_session(power: u32, health: u32, ability: Option<&'static Ability>) -> BattleSession {
        BattleSession::new_pve(player(power, health, ability), &TEST_OPPONENT)
    }

    #[test]
    fn test_fast_attack_flat_roll_exact_damage() {
        // Power 100 against {power: 120, health: 150}: a neutral fast attack
        // deals exactly 50 and leaves the opponent at 100.
        let mut session = pve_session(100, 200, None);
        let resolution =
            submit_action_rolled(&mut session, 0, BattleAction::FastAttack, AttackRoll::flat())
                .unwrap();

        assert_eq!(
            resolution.events[0],
            BattleEvent::Hit {
                attacker: 0,
                damage: 50,
                crit: false
            }
        );
        assert_eq!(session.combatants[1].health, 100);
        assert_eq!(resolution.follow_up, Some(FollowUp::OpponentTurn));
        assert!(session.locked);
    }

    #[test]
    fn test_strong_attack_miss_deals_nothing() {
        let mut session = pve_session(100, 200, None);
        let roll = AttackRoll {
            variance: 1.0,
            crit: false,
            connected: false,
        };
        let resolution =
            submit_action_rolled(&mut session, 0, BattleAction::StrongAttack, roll).unwrap();

        assert_eq!(resolution.events[0], BattleEvent::Missed { attacker: 0 });
        assert_eq!(session.combatants[1].health, 150);
        // A miss still hands the turn to the opponent.
        assert_eq!(resolution.follow_up, Some(FollowUp::OpponentTurn));
    }

    #[test]
    fn test_crit_multiplies_after_variance() {
        let roll = AttackRoll {
            variance: 1.1,
            crit: true,
            connected: true,
        };
        // floor(100 * 1.0 * 1.1 * 1.5) = floor(165.0) = 165, floored once
        assert_eq!(attack_damage(100, 1.0, &roll), 165);

        let odd = AttackRoll {
            variance: 0.97,
            crit: true,
            connected: true,
        };
        // floor(73 * 0.5 * 0.97 * 1.5) = floor(53.1075) = 53
        assert_eq!(attack_damage(73, 0.5, &odd), 53);
    }

    #[test]
    fn test_defend_reduces_retaliation_and_clears() {
        let mut session = pve_session(100, 200, None);
        submit_action_rolled(&mut session, 0, BattleAction::Defend, AttackRoll::flat()).unwrap();
        assert!(session.combatants[0].is_defending);

        // Neutral retaliation: floor(120 * 0.8) = 96 rolled, reduced to
        // floor(96 * 0.3) = 28.
        let resolution = resolve_opponent_turn_rolled(&mut session, AttackRoll::flat());
        assert_eq!(
            resolution.events[0],
            BattleEvent::Hit {
                attacker: 1,
                damage: 28,
                crit: false
            }
        );
        assert_eq!(session.combatants[0].health, 200 - 28);
        assert!(!session.combatants[0].is_defending);
        assert!(!session.locked);
    }

    #[test]
    fn test_defend_lapses_on_own_next_action() {
        let mut session = BattleSession::new_pvp(
            player(50, 200, None),
            player(50, 200, None),
        );
        submit_action_rolled(&mut session, 0, BattleAction::Defend, AttackRoll::flat()).unwrap();
        submit_action_rolled(&mut session, 1, BattleAction::Defend, AttackRoll::flat()).unwrap();
        // Side 0 acts again: its defend clears before the attack lands.
        submit_action_rolled(&mut session, 0, BattleAction::FastAttack, AttackRoll::flat())
            .unwrap();
        assert!(!session.combatants[0].is_defending);
    }

    #[test]
    fn test_actions_rejected_while_locked() {
        let mut session = pve_session(100, 200, None);
        submit_action_rolled(&mut session, 0, BattleAction::FastAttack, AttackRoll::flat())
            .unwrap();
        assert!(session.locked);

        let health_before = session.combatants[1].health;
        let err = submit_action_rolled(&mut session, 0, BattleAction::FastAttack, AttackRoll::flat())
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidAction));
        assert_eq!(session.combatants[1].health, health_before);
    }

    #[test]
    fn test_ability_requires_eligibility() {
        let mut session = pve_session(100, 200, None);
        let err = submit_action_rolled(&mut session, 0, BattleAction::UseAbility, AttackRoll::flat())
            .unwrap_err();
        assert!(matches!(err, GameError::NotEligible));
        assert!(!session.combatants[0].ability_used);
    }

    #[test]
    fn test_ability_is_one_shot() {
        let mut session = pve_session(100, 2000, Some(&TEST_ABILITY));
        session.combatants[1].health = 10_000;
        session.combatants[1].max_health = 10_000;

        let cast =
            submit_action_rolled(&mut session, 0, BattleAction::UseAbility, AttackRoll::flat())
                .unwrap();
        assert!(session.combatants[0].ability_used);
        assert!(session.combatants[0].awakened.active);
        assert_eq!(session.combatants[0].awakened.turns_left, 3);
        assert_eq!(cast.follow_up, Some(FollowUp::AwakenedStrike { side: 0 }));
        // The cast itself deals no damage.
        assert_eq!(session.combatants[1].health, 10_000);

        // Play the cast out, then try to cast again: rejected, and the
        // one-shot gate never resets.
        resolve_awakened_strike(&mut session, 0);
        for _ in 0..5 {
            if session.is_over() {
                break;
            }
            resolve_opponent_turn_rolled(&mut session, AttackRoll::flat());
            if session.is_over() {
                break;
            }
            let err = submit_action_rolled(
                &mut session,
                0,
                BattleAction::UseAbility,
                AttackRoll::flat(),
            )
            .unwrap_err();
            assert!(matches!(err, GameError::NotEligible));
            assert!(session.combatants[0].ability_used);
            submit_action_rolled(&mut session, 0, BattleAction::Defend, AttackRoll::flat())
                .unwrap();
        }
    }

    #[test]
    fn test_awakened_strike_applies_deferred_damage() {
        let mut session = pve_session(100, 2000, Some(&TEST_ABILITY));
        submit_action_rolled(&mut session, 0, BattleAction::UseAbility, AttackRoll::flat())
            .unwrap();

        let strike = resolve_awakened_strike(&mut session, 0);
        assert_eq!(
            strike.events[0],
            BattleEvent::AwakenedStrike {
                caster: 0,
                damage: 400
            }
        );
        // 400 >= 150: lethal, battle over, no retaliation scheduled.
        assert!(session.is_over());
        assert_eq!(session.outcome, Some(BattleOutcome::Victory { winner: 0 }));
        assert_eq!(strike.events[1], BattleEvent::Finished { winner: 0 });
        assert!(strike.follow_up.is_none());
    }

    #[test]
    fn test_awakening_lasts_exactly_three_enemy_turns() {
        static WEAK_ABILITY: Ability = Ability {
            name: "Spark",
            damage: 10,
            cutscene_lines: &["A spark."],
            audio_theme: "spark",
        };
        let mut session = pve_session(100, 100_000, Some(&WEAK_ABILITY));
        session.combatants[1].health = 1_000_000;
        session.combatants[1].max_health = 1_000_000;
        session.combatants[1].power = 0;

        submit_action_rolled(&mut session, 0, BattleAction::UseAbility, AttackRoll::flat())
            .unwrap();
        resolve_awakened_strike(&mut session, 0);

        // Enemy turns one and two: still awakened.
        for expected_left in [2, 1] {
            let resolution = resolve_opponent_turn_rolled(&mut session, AttackRoll::flat());
            assert!(session.combatants[0].awakened.active);
            assert_eq!(session.combatants[0].awakened.turns_left, expected_left);
            assert!(resolution
                .events
                .iter()
                .all(|e| !matches!(e, BattleEvent::AwakeningEnded { .. })));
            submit_action_rolled(&mut session, 0, BattleAction::FastAttack, AttackRoll::flat())
                .unwrap();
        }

        // Third enemy turn: the end signal precedes the damage event.
        let resolution = resolve_opponent_turn_rolled(&mut session, AttackRoll::flat());
        assert!(!session.combatants[0].awakened.active);
        assert_eq!(resolution.events[0], BattleEvent::AwakeningEnded { side: 0 });
        assert!(matches!(resolution.events[1], BattleEvent::Hit { .. }));
    }

    #[test]
    fn test_manual_awakened_strike_consumes_a_turn() {
        let mut session = pve_session(100, 100_000, Some(&TEST_ABILITY));
        session.combatants[1].health = 10_000;
        session.combatants[1].max_health = 10_000;

        submit_action_rolled(&mut session, 0, BattleAction::UseAbility, AttackRoll::flat())
            .unwrap();
        resolve_awakened_strike(&mut session, 0);
        resolve_opponent_turn_rolled(&mut session, AttackRoll::flat());
        assert_eq!(session.combatants[0].awakened.turns_left, 2);

        submit_action_rolled(
            &mut session,
            0,
            BattleAction::AwakenedAbility,
            AttackRoll::flat(),
        )
        .unwrap();
        assert_eq!(session.combatants[0].awakened.turns_left, 1);
    }

    #[test]
    fn test_win_grants_once_despite_overkill() {
        let mut session = pve_session(10_000, 200, None);
        let resolution =
            submit_action_rolled(&mut session, 0, BattleAction::FastAttack, AttackRoll::flat())
                .unwrap();

        let finished: Vec<_> = resolution
            .events
            .iter()
            .filter(|e| matches!(e, BattleEvent::Finished { .. }))
            .collect();
        assert_eq!(finished.len(), 1);
        assert!(session.is_over());
        assert!(resolution.follow_up.is_none());

        // The terminated session refuses further actions.
        let err = submit_action_rolled(&mut session, 0, BattleAction::FastAttack, AttackRoll::flat())
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidAction));
    }

    #[test]
    fn test_pvp_turns_alternate_strictly() {
        let mut session = BattleSession::new_pvp(
            player(40, 500, None),
            player(40, 500, None),
        );

        assert_eq!(session.turn, 0);
        submit_action_rolled(&mut session, 0, BattleAction::FastAttack, AttackRoll::flat())
            .unwrap();
        assert_eq!(session.turn, 1);

        // Acting out of turn is a rejected no-op.
        let err = submit_action_rolled(&mut session, 0, BattleAction::FastAttack, AttackRoll::flat())
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidAction));

        submit_action_rolled(&mut session, 1, BattleAction::Defend, AttackRoll::flat()).unwrap();
        assert_eq!(session.turn, 0);
        assert!(!session.locked);
    }

    #[test]
    fn test_pvp_cast_flips_turn_only_after_follow_up() {
        let mut session = BattleSession::new_pvp(
            player(40, 500, Some(&TEST_ABILITY)),
            player(40, 2000, None),
        );

        submit_action_rolled(&mut session, 0, BattleAction::UseAbility, AttackRoll::flat())
            .unwrap();
        // Control has not passed yet; the opponent must wait out the
        // cutscene.
        assert_eq!(session.turn, 0);
        assert!(session.locked);
        let err = submit_action_rolled(&mut session, 1, BattleAction::FastAttack, AttackRoll::flat())
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidAction));

        resolve_awakened_strike(&mut session, 0);
        assert_eq!(session.turn, 1);
        assert!(!session.locked);
    }

    #[test]
    fn test_log_grows_monotonically() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut session = pve_session(50, 5000, None);
        let mut last_len = 0;
        for _ in 0..6 {
            if session.is_over() {
                break;
            }
            submit_action(&mut session, 0, BattleAction::FastAttack, &mut rng).unwrap();
            assert!(session.log.len() > last_len);
            last_len = session.log.len();
            if session.is_over() {
                break;
            }
            resolve_opponent_turn(&mut session, &mut rng);
            assert!(session.log.len() > last_len);
            last_len = session.log.len();
        }
    }
}
