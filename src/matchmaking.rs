//! FIFO pairing queue for multiplayer battles.

use crate::catalog::Ability;
use crate::core::ids::{ConnectionId, UserId};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A waiting player with their battle stats precomputed at enqueue time.
#[derive(Debug, Clone)]
pub struct MatchmakingEntry {
    pub user_id: UserId,
    pub connection: ConnectionId,
    pub name: String,
    pub power: u32,
    pub max_health: u32,
    pub ability: Option<&'static Ability>,
    pub enqueued_at: i64,
}

/// Process-wide pairing queue. All operations take the inner lock, so an
/// entry can never be paired and removed concurrently.
#[derive(Debug, Default)]
pub struct MatchQueue {
    entries: Mutex<VecDeque<MatchmakingEntry>>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_user(&self, user: UserId) -> bool {
        self.lock().iter().any(|e| e.user_id == user)
    }

    pub fn enqueue(&self, entry: MatchmakingEntry) {
        self.lock().push_back(entry);
    }

    /// Removes a waiting entry by connection identity. Order of the
    /// remaining entries is untouched.
    pub fn remove_connection(&self, connection: ConnectionId) -> Option<MatchmakingEntry> {
        let mut entries = self.lock();
        let index = entries.iter().position(|e| e.connection == connection)?;
        entries.remove(index)
    }

    /// Atomically dequeues the two oldest entries if at least two are
    /// waiting. If one of them turns out stale, the remaining valid entry
    /// goes back to the *front* and pairing is aborted for this cycle.
    pub fn try_pair(
        &self,
        connection_alive: impl Fn(ConnectionId) -> bool,
    ) -> Option<(MatchmakingEntry, MatchmakingEntry)> {
        let mut entries = self.lock();
        if entries.len() < 2 {
            return None;
        }

        let first = entries.pop_front()?;
        let second = entries.pop_front()?;

        match (
            connection_alive(first.connection),
            connection_alive(second.connection),
        ) {
            (true, true) => Some((first, second)),
            (true, false) => {
                entries.push_front(first);
                None
            }
            (false, true) => {
                entries.push_front(second);
                None
            }
            (false, false) => None,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<MatchmakingEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            // A panic while holding the queue lock cannot leave partial
            // state: every mutation completes under one lock acquisition.
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
