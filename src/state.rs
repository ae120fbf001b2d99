use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::storage::store::MatchStore;

pub type SharedStore = Arc<Mutex<MatchStore>>;

/// Everything the handlers share: the durable store plus the lock table that
/// serializes multi-step read-check-write sequences on it.
#[derive(Clone)]
pub struct GameState {
    pub store: SharedStore,
    pub locks: Arc<MatchLocks>,
}

impl GameState {
    pub fn new(store: MatchStore) -> GameState {
        GameState {
            store: Arc::new(Mutex::new(store)),
            locks: Arc::new(MatchLocks::new()),
        }
    }
}

/// In-process exclusive locks over match aggregates.
///
/// `pairing` serializes every connect call, so the already-in-match check and
/// the join of a pending match form one atomic unit. `lock_for` hands out the
/// per-match lock that submit and the timeout sweeper both take before
/// load-mutate-save, so a late answer and a timeout can never interleave on
/// the same match. All guards are released before any await point.
pub struct MatchLocks {
    pairing: Mutex<()>,
    per_match: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MatchLocks {
    pub fn new() -> MatchLocks {
        MatchLocks {
            pairing: Mutex::new(()),
            per_match: Mutex::new(HashMap::new()),
        }
    }

    pub fn pairing_guard(&self) -> MutexGuard<'_, ()> {
        self.pairing.lock().unwrap()
    }

    pub fn lock_for(&self, match_id: &str) -> Arc<Mutex<()>> {
        let mut table = self.per_match.lock().unwrap();
        table
            .entry(match_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Finished matches never get touched again; their lock entry can go.
    pub fn discard(&self, match_id: &str) {
        self.per_match.lock().unwrap().remove(match_id);
    }
}

impl Default for MatchLocks {
    fn default() -> Self {
        MatchLocks::new()
    }
}
