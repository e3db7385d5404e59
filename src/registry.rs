//! Registry of live battle sessions. Explicitly owned and injectable so
//! tests can run isolated instances side by side.

use crate::battle::BattleSession;
use crate::core::ids::{ConnectionId, SessionId, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as SessionMutex;

pub type SharedSession = Arc<SessionMutex<BattleSession>>;

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, SharedSession>,
    by_connection: HashMap<ConnectionId, SessionId>,
    by_user: HashMap<UserId, SessionId>,
}

/// Maps session ids, connections, and users to live battles. Lookup is
/// lock-cheap; session state itself is guarded per session so unrelated
/// battles never serialize against each other.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes a freshly created session and returns its shared handle.
    pub fn insert(&self, session: BattleSession) -> SharedSession {
        let id = session.id;
        let mut inner = self.lock();
        for combatant in &session.combatants {
            if let Some(conn) = combatant.connection {
                inner.by_connection.insert(conn, id);
            }
            if let Some(user) = combatant.user_id {
                inner.by_user.insert(user, id);
            }
        }
        let shared = Arc::new(SessionMutex::new(session));
        inner.sessions.insert(id, Arc::clone(&shared));
        shared
    }

    pub fn get(&self, id: SessionId) -> Option<SharedSession> {
        self.lock().sessions.get(&id).cloned()
    }

    pub fn session_for_connection(&self, connection: ConnectionId) -> Option<SharedSession> {
        let inner = self.lock();
        let id = inner.by_connection.get(&connection)?;
        inner.sessions.get(id).cloned()
    }

    /// One battle per player at a time.
    pub fn user_in_battle(&self, user: UserId) -> bool {
        self.lock().by_user.contains_key(&user)
    }

    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops a terminated session and all its index entries.
    pub fn remove(&self, id: SessionId) -> Option<SharedSession> {
        let mut inner = self.lock();
        let shared = inner.sessions.remove(&id)?;
        inner.by_connection.retain(|_, v| *v != id);
        inner.by_user.retain(|_, v| *v != id);
        Some(shared)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::CombatantState;
    use crate::builds::compute_build;
    use crate::catalog::OPPONENTS;

    fn session_for(conn: ConnectionId, user: UserId) -> BattleSession {
        let build = compute_build(5, 5, &[], &[]);
        let player = CombatantState::from_build("Hero".to_string(), user, conn, &build);
        BattleSession::new_pve(player, &OPPONENTS[0])
    }

    #[test]
    fn test_insert_indexes_connection_and_user() {
        let registry = SessionRegistry::new();
        let conn = ConnectionId::new();
        let user = UserId::new();
        let shared = registry.insert(session_for(conn, user));
        let id = { shared.try_lock().unwrap().id };

        assert!(registry.user_in_battle(user));
        assert!(registry.session_for_connection(conn).is_some());
        assert!(registry.get(id).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_clears_every_index() {
        let registry = SessionRegistry::new();
        let conn = ConnectionId::new();
        let user = UserId::new();
        let shared = registry.insert(session_for(conn, user));
        let id = { shared.try_lock().unwrap().id };

        registry.remove(id).unwrap();
        assert!(registry.is_empty());
        assert!(!registry.user_in_battle(user));
        assert!(registry.session_for_connection(conn).is_none());
        assert!(registry.remove(id).is_none());
    }

    #[test]
    fn test_independent_instances_do_not_share_state() {
        let a = SessionRegistry::new();
        let b = SessionRegistry::new();
        a.insert(session_for(ConnectionId::new(), UserId::new()));
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }
}
