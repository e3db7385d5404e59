//! The game engine: ties the store, session registry, matchmaking queue,
//! and event sink together, and owns the scheduled timers that drive
//! delayed battle resolution.

use crate::battle::{
    self, BattleAction, BattleEvent, BattleMode, BattleOutcome, BattleSession, CombatantState,
    FollowUp, Resolution,
};
use crate::builds::{compute_build, PlayerBuild};
use crate::catalog::{self, CharacterTemplate, WeaponTemplate};
use crate::core::constants::*;
use crate::core::errors::GameError;
use crate::core::ids::{ConnectionId, SessionId, UserId};
use crate::events::{battle_view, event_view, EventSink, LootKind, ProfileView, ServerEvent};
use crate::loot;
use crate::matchmaking::{MatchQueue, MatchmakingEntry};
use crate::progression::{self, StatKind};
use crate::registry::{SessionRegistry, SharedSession};
use crate::store::{Inventory, PlayerStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunable delays and rewards. Tests shrink the timers to keep scheduled
/// resolution observable without waiting out real cutscenes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EngineConfig {
    pub opponent_turn_delay_ms: u64,
    pub cutscene_delay_ms: u64,
    pub pve_win_coins: u64,
    pub pve_win_xp: u64,
    pub pve_loss_coin_penalty: u64,
    pub pvp_win_coins: u64,
    pub pvp_win_xp: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            opponent_turn_delay_ms: OPPONENT_TURN_DELAY_MS,
            cutscene_delay_ms: CUTSCENE_DELAY_MS,
            pve_win_coins: PVE_WIN_COINS,
            pve_win_xp: PVE_WIN_XP,
            pve_loss_coin_penalty: PVE_LOSS_COIN_PENALTY,
            pvp_win_coins: PVP_WIN_COINS,
            pvp_win_xp: PVP_WIN_XP,
        }
    }
}

struct EngineInner {
    store: Arc<dyn PlayerStore>,
    sink: Arc<dyn EventSink>,
    sessions: SessionRegistry,
    queue: MatchQueue,
    online: Mutex<HashMap<ConnectionId, UserId>>,
    config: EngineConfig,
}

/// Cheap-to-clone handle; every clone drives the same engine state. Timer
/// tasks hold a clone so scheduled resolutions survive the calling scope.
#[derive(Clone)]
pub struct GameEngine {
    inner: Arc<EngineInner>,
}

impl GameEngine {
    pub fn new(
        store: Arc<dyn PlayerStore>,
        sink: Arc<dyn EventSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                sink,
                sessions: SessionRegistry::new(),
                queue: MatchQueue::new(),
                online: Mutex::new(HashMap::new()),
                config,
            }),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    pub fn queue(&self) -> &MatchQueue {
        &self.inner.queue
    }

    fn store(&self) -> &dyn PlayerStore {
        self.inner.store.as_ref()
    }

    fn emit(&self, connection: ConnectionId, event: ServerEvent) {
        self.inner.sink.send(connection, event);
    }

    fn online_lock(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, UserId>> {
        match self.inner.online.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn connection_user(&self, connection: ConnectionId) -> Result<UserId, GameError> {
        self.online_lock()
            .get(&connection)
            .copied()
            .ok_or(GameError::NotRegistered)
    }

    /// Binds a connection to a player account, creating a starter account on
    /// first sight of the name, and sends the welcome snapshot.
    pub async fn register_connection(
        &self,
        connection: ConnectionId,
        name: &str,
    ) -> Result<UserId, GameError> {
        let record = self.store().load_or_create(name).await?;
        self.online_lock().insert(connection, record.id);
        info!(player = %record.name, "connection registered");

        let profile = self.profile_view(record.id).await?;
        self.emit(
            connection,
            ServerEvent::Welcome {
                user_id: record.id,
                profile,
            },
        );
        Ok(record.id)
    }

    /// Resolves owned template names against the catalog, dropping entries
    /// that no longer exist there.
    fn resolve_inventory(
        inventory: &Inventory,
    ) -> (
        Vec<&'static CharacterTemplate>,
        Vec<&'static WeaponTemplate>,
    ) {
        let collectibles = inventory
            .collectibles
            .iter()
            .filter_map(|name| catalog::find_character(name))
            .collect();
        let weapons = inventory
            .weapons
            .iter()
            .filter_map(|name| catalog::find_weapon(name))
            .collect();
        (collectibles, weapons)
    }

    /// Computes a fresh build from the persisted record and inventory.
    /// Builds are never cached across battles.
    async fn build_for(&self, user: UserId) -> Result<(PlayerBuild, String), GameError> {
        let record = self.store().load(user).await?;
        let inventory = self.store().inventory(user).await?;
        let (collectibles, weapons) = Self::resolve_inventory(&inventory);
        let build = compute_build(record.strength, record.vitality, &collectibles, &weapons);
        Ok((build, record.name))
    }

    async fn profile_view(&self, user: UserId) -> Result<ProfileView, GameError> {
        let record = self.store().load(user).await?;
        let inventory = self.store().inventory(user).await?;
        let (collectibles, weapons) = Self::resolve_inventory(&inventory);
        let build = compute_build(record.strength, record.vitality, &collectibles, &weapons);
        Ok(ProfileView {
            name: record.name,
            coins: record.coins,
            level: record.level,
            xp: record.xp,
            xp_to_next_level: record.xp_to_next_level,
            stat_points: record.stat_points,
            strength: record.strength,
            vitality: record.vitality,
            power: build.total_power,
            max_health: build.total_health,
            collectibles: inventory.collectibles,
            weapons: inventory.weapons,
        })
    }

    pub async fn send_profile(&self, connection: ConnectionId) -> Result<(), GameError> {
        let user = self.connection_user(connection)?;
        let profile = self.profile_view(user).await?;
        self.emit(connection, ServerEvent::Profile { profile });
        Ok(())
    }

    fn ensure_idle(&self, user: UserId) -> Result<(), GameError> {
        if self.inner.sessions.user_in_battle(user) {
            return Err(GameError::AlreadyInBattle);
        }
        if self.inner.queue.contains_user(user) {
            return Err(GameError::AlreadyQueued);
        }
        Ok(())
    }

    /// Starts a single-player battle against a uniformly drawn scripted
    /// opponent.
    pub async fn start_pve_battle(
        &self,
        connection: ConnectionId,
    ) -> Result<SessionId, GameError> {
        let user = self.connection_user(connection)?;
        self.ensure_idle(user)?;

        let (build, name) = self.build_for(user).await?;
        let player = CombatantState::from_build(name, user, connection, &build);
        let opponent = catalog::random_opponent(&mut rand::thread_rng());
        let session = BattleSession::new_pve(player, opponent);
        let id = session.id;
        info!(%id, opponent = opponent.name, "pve battle started");

        let shared = self.inner.sessions.insert(session);
        let guard = shared.lock().await;
        self.emit(
            connection,
            ServerEvent::BattleStarted {
                snapshot: battle_view(&guard, 0),
            },
        );
        Ok(id)
    }

    /// Queues a player for multiplayer and runs one pairing cycle.
    pub async fn enqueue_for_match(&self, connection: ConnectionId) -> Result<(), GameError> {
        let user = self.connection_user(connection)?;
        self.ensure_idle(user)?;

        let (build, name) = self.build_for(user).await?;
        self.inner.queue.enqueue(MatchmakingEntry {
            user_id: user,
            connection,
            name,
            power: build.total_power,
            max_health: build.total_health,
            ability: build.ability_source.and_then(|c| c.ability.as_ref()),
            enqueued_at: Utc::now().timestamp(),
        });
        self.emit(connection, ServerEvent::Queued);

        let alive: HashSet<ConnectionId> = self.online_lock().keys().copied().collect();
        if let Some((first, second)) = self.inner.queue.try_pair(|conn| alive.contains(&conn)) {
            self.start_pvp_battle(first, second).await;
        }
        Ok(())
    }

    async fn start_pvp_battle(&self, first: MatchmakingEntry, second: MatchmakingEntry) {
        let session = BattleSession::new_pvp(
            combatant_from_entry(&first),
            combatant_from_entry(&second),
        );
        info!(id = %session.id, a = %first.name, b = %second.name, "pvp battle paired");

        let shared = self.inner.sessions.insert(session);
        let guard = shared.lock().await;
        self.emit(
            first.connection,
            ServerEvent::BattleStarted {
                snapshot: battle_view(&guard, 0),
            },
        );
        self.emit(
            second.connection,
            ServerEvent::BattleStarted {
                snapshot: battle_view(&guard, 1),
            },
        );
    }

    /// Submits one battle action for the combatant bound to `connection`.
    ///
    /// Illegal actions are no-ops: the unchanged state is re-emitted so the
    /// client can resynchronize, and no error escapes.
    pub async fn submit_action(
        &self,
        connection: ConnectionId,
        session_id: SessionId,
        action: BattleAction,
    ) -> Result<(), GameError> {
        let shared = self
            .inner
            .sessions
            .get(session_id)
            .ok_or(GameError::StaleSession(session_id))?;
        let mut session = shared.lock().await;
        let side = session
            .side_of_connection(connection)
            .ok_or(GameError::InvalidAction)?;

        let outcome = battle::submit_action(&mut session, side, action, &mut rand::thread_rng());
        match outcome {
            Ok(resolution) => {
                self.emit_resolution(&session, &resolution);
                if session.is_over() {
                    self.settle(&mut session).await;
                } else if let Some(follow_up) = resolution.follow_up {
                    self.schedule_follow_up(Arc::clone(&shared), follow_up);
                }
                Ok(())
            }
            Err(GameError::InvalidAction) | Err(GameError::NotEligible) => {
                debug!(id = %session.id, ?action, "rejected action, resyncing client");
                self.emit(
                    connection,
                    ServerEvent::BattleUpdate {
                        snapshot: battle_view(&session, side),
                        events: Vec::new(),
                    },
                );
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    /// Sends each live participant its perspective of the resolution, plus
    /// the spectator cutscene on a PvP awakening cast.
    fn emit_resolution(&self, session: &BattleSession, resolution: &Resolution) {
        for side in 0..2 {
            if let Some(conn) = session.combatants[side].connection {
                let events = resolution
                    .events
                    .iter()
                    .map(|e| event_view(e, side))
                    .collect();
                self.emit(
                    conn,
                    ServerEvent::BattleUpdate {
                        snapshot: battle_view(session, side),
                        events,
                    },
                );
            }
        }

        if session.mode == BattleMode::Pvp {
            for event in &resolution.events {
                if let BattleEvent::AbilityCast { caster, ability } = event {
                    if let Some(conn) = session.combatants[1 - *caster].connection {
                        self.emit(
                            conn,
                            ServerEvent::Cutscene {
                                caster: session.combatants[*caster].name.clone(),
                                ability: ability.name.to_string(),
                                lines: ability
                                    .cutscene_lines
                                    .iter()
                                    .map(|l| l.to_string())
                                    .collect(),
                                audio_theme: ability.audio_theme.to_string(),
                            },
                        );
                    }
                }
            }
        }
    }

    fn schedule_follow_up(&self, shared: SharedSession, follow_up: FollowUp) {
        let engine = self.clone();
        match follow_up {
            FollowUp::OpponentTurn => {
                let delay = Duration::from_millis(self.inner.config.opponent_turn_delay_ms);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    engine.run_opponent_turn(shared).await;
                });
            }
            FollowUp::AwakenedStrike { side } => {
                let delay = Duration::from_millis(self.inner.config.cutscene_delay_ms);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    engine.run_awakened_strike(shared, side).await;
                });
            }
        }
    }

    async fn run_opponent_turn(&self, shared: SharedSession) {
        let mut session = shared.lock().await;
        if session.is_over() {
            return;
        }
        let resolution = battle::resolve_opponent_turn(&mut session, &mut rand::thread_rng());
        self.emit_resolution(&session, &resolution);
        if session.is_over() {
            self.settle(&mut session).await;
        }
    }

    async fn run_awakened_strike(&self, shared: SharedSession, side: usize) {
        let mut session = shared.lock().await;
        if session.is_over() {
            return;
        }
        let resolution = battle::resolve_awakened_strike(&mut session, side);
        self.emit_resolution(&session, &resolution);
        if session.is_over() {
            self.settle(&mut session).await;
        } else if let Some(follow_up) = resolution.follow_up {
            self.schedule_follow_up(Arc::clone(&shared), follow_up);
        }
    }

    /// Disconnect handling: leave the queue, and end any active battle.
    /// A PvE battle is silently discarded; a PvP battle ends immediately as
    /// a forfeit in favor of the remaining side.
    pub async fn on_disconnect(&self, connection: ConnectionId) {
        self.online_lock().remove(&connection);
        if self.inner.queue.remove_connection(connection).is_some() {
            debug!(%connection, "removed from matchmaking queue");
        }

        let Some(shared) = self.inner.sessions.session_for_connection(connection) else {
            return;
        };
        let mut session = shared.lock().await;
        if session.is_over() {
            return;
        }

        match session.mode {
            BattleMode::Pve => {
                let id = session.id;
                info!(%id, "pve battle abandoned");
                self.inner.sessions.remove(id);
            }
            BattleMode::Pvp => {
                let Some(leaver) = session.side_of_connection(connection) else {
                    return;
                };
                let winner = 1 - leaver;
                info!(id = %session.id, "pvp forfeit");
                session.outcome = Some(BattleOutcome::Forfeit { winner });
                session.locked = false;
                let line = format!(
                    "{} disconnected; {} wins by forfeit",
                    session.combatants[leaver].name, session.combatants[winner].name
                );
                session.push_log(line);
                self.settle(&mut session).await;
            }
        }
    }

    /// Settles a terminated battle: persists rewards first, then notifies.
    /// The session leaves the registry either way.
    async fn settle(&self, session: &mut BattleSession) {
        let Some(outcome) = session.outcome else {
            return;
        };
        self.inner.sessions.remove(session.id);

        let winner = outcome.winner();
        let forfeit = matches!(outcome, BattleOutcome::Forfeit { .. });
        let (win_coins, win_xp) = match session.mode {
            BattleMode::Pve => (self.inner.config.pve_win_coins, self.inner.config.pve_win_xp),
            BattleMode::Pvp => (self.inner.config.pvp_win_coins, self.inner.config.pvp_win_xp),
        };

        // Winner rewards (skipped when the scripted opponent won).
        if let Some(user) = session.combatants[winner].user_id {
            match self.grant_battle_rewards(user, win_coins, win_xp).await {
                Ok(level_ups) => {
                    if let Some(conn) = session.combatants[winner].connection {
                        self.emit(
                            conn,
                            ServerEvent::BattleEnded {
                                won: true,
                                forfeit,
                                coins_awarded: win_coins,
                                xp_awarded: win_xp,
                                coins_lost: 0,
                            },
                        );
                        for level_up in level_ups {
                            self.emit(
                                conn,
                                ServerEvent::LevelUp {
                                    new_level: level_up.new_level,
                                    stat_points_awarded: level_up.stat_points_awarded,
                                },
                            );
                        }
                    }
                }
                Err(err) => {
                    warn!(%err, "failed to persist battle rewards");
                    if let Some(conn) = session.combatants[winner].connection {
                        self.send_error(conn, &err);
                    }
                }
            }
        }

        // Loser side: PvE defeats cost a clamped coin penalty, PvP defeats
        // cost nothing.
        let loser = 1 - winner;
        if let Some(user) = session.combatants[loser].user_id {
            let penalty = if session.mode == BattleMode::Pve && !forfeit {
                match self
                    .deduct_clamped(user, self.inner.config.pve_loss_coin_penalty)
                    .await
                {
                    Ok(deducted) => deducted,
                    Err(err) => {
                        warn!(%err, "failed to persist loss penalty");
                        0
                    }
                }
            } else {
                0
            };
            if let Some(conn) = session.combatants[loser].connection {
                self.emit(
                    conn,
                    ServerEvent::BattleEnded {
                        won: false,
                        forfeit,
                        coins_awarded: 0,
                        xp_awarded: 0,
                        coins_lost: penalty,
                    },
                );
            }
        }
    }

    async fn grant_battle_rewards(
        &self,
        user: UserId,
        coins: u64,
        xp: u64,
    ) -> Result<Vec<progression::LevelUp>, GameError> {
        self.store().credit_coins(user, coins).await?;
        let mut record = self.store().load(user).await?;
        let level_ups = progression::gain_xp(&mut record, xp);
        // One persisted write per accrual, regardless of level-ups.
        self.store().update_progression(&record).await?;
        Ok(level_ups)
    }

    /// Deducts up to `penalty` coins, clamped at a zero balance.
    async fn deduct_clamped(&self, user: UserId, penalty: u64) -> Result<u64, GameError> {
        let record = self.store().load(user).await?;
        let amount = record.coins.min(penalty);
        if amount == 0 {
            return Ok(0);
        }
        match self.store().try_debit_coins(user, amount).await? {
            Some(_) => Ok(amount),
            // Balance moved concurrently; the penalty stays clamped.
            None => Ok(0),
        }
    }

    /// Rolls a character from the loot table, charging first. The charge and
    /// the grant land together or not at all.
    pub async fn buy_character_roll(&self, connection: ConnectionId) -> Result<(), GameError> {
        let user = self.connection_user(connection)?;
        let balance = self.charge(user, CHARACTER_ROLL_COST).await?;
        let template = loot::roll_character(&mut rand::thread_rng());

        if let Err(err) = self.store().grant_collectible(user, template.name).await {
            self.refund(user, CHARACTER_ROLL_COST).await;
            return Err(err.into());
        }
        self.emit(
            connection,
            ServerEvent::LootGranted {
                kind: LootKind::Character,
                name: template.name.to_string(),
                rarity: template.rarity,
                balance,
            },
        );
        Ok(())
    }

    /// Rolls a weapon from the loot table; same atomicity as characters.
    pub async fn buy_weapon_roll(&self, connection: ConnectionId) -> Result<(), GameError> {
        let user = self.connection_user(connection)?;
        let balance = self.charge(user, WEAPON_ROLL_COST).await?;
        let template = loot::roll_weapon(&mut rand::thread_rng());

        if let Err(err) = self.store().grant_weapon(user, template.name).await {
            self.refund(user, WEAPON_ROLL_COST).await;
            return Err(err.into());
        }
        self.emit(
            connection,
            ServerEvent::LootGranted {
                kind: LootKind::Weapon,
                name: template.name.to_string(),
                rarity: template.rarity,
                balance,
            },
        );
        Ok(())
    }

    async fn charge(&self, user: UserId, cost: u64) -> Result<u64, GameError> {
        match self.store().try_debit_coins(user, cost).await? {
            Some(balance) => Ok(balance),
            None => {
                let record = self.store().load(user).await?;
                Err(GameError::InsufficientFunds {
                    have: record.coins,
                    need: cost,
                })
            }
        }
    }

    async fn refund(&self, user: UserId, amount: u64) {
        if let Err(err) = self.store().credit_coins(user, amount).await {
            warn!(%err, %user, amount, "compensating refund failed");
        }
    }

    pub async fn spend_stat_point(
        &self,
        connection: ConnectionId,
        stat: StatKind,
    ) -> Result<(), GameError> {
        let user = self.connection_user(connection)?;
        let mut record = self.store().load(user).await?;
        progression::spend_stat_point(&mut record, stat)?;
        self.store().update_progression(&record).await?;
        self.send_profile(connection).await
    }

    pub fn send_error(&self, connection: ConnectionId, err: &GameError) {
        self.emit(
            connection,
            ServerEvent::Error {
                code: err.code().to_string(),
                message: err.to_string(),
            },
        );
    }
}

fn combatant_from_entry(entry: &MatchmakingEntry) -> CombatantState {
    CombatantState {
        name: entry.name.clone(),
        user_id: Some(entry.user_id),
        connection: Some(entry.connection),
        power: entry.power,
        health: entry.max_health,
        max_health: entry.max_health,
        is_defending: false,
        ability_used: false,
        ability: entry.ability,
        awakened: Default::default(),
    }
}
