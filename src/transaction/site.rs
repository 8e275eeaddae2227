// A site bundles a `DataManager` and `LockManager` with up/down state
// and the MVCC snapshot store, per spec.md §4.3.

use std::collections::HashMap;

use crate::common::{SiteId, Tick, VariableId, NUM_VARIABLES};
use crate::transaction::data_manager::DataManager;
use crate::transaction::lock_manager::LockManager;

#[derive(Debug, Clone)]
pub struct Site {
    pub site_id: SiteId,
    pub up: bool,
    pub data_manager: DataManager,
    pub lock_manager: LockManager,
    snapshots: HashMap<Tick, HashMap<VariableId, i64>>,
}

impl Site {
    pub fn new(site_id: SiteId) -> Self {
        Self {
            site_id,
            up: true,
            data_manager: DataManager::new(site_id),
            lock_manager: LockManager::new(),
            snapshots: HashMap::new(),
        }
    }

    /// `up <- false`; clears uncommitted writes, the lock table, and
    /// disables replicated accessibility. Snapshots already taken are
    /// untouched — a site takes snapshots even while down (see
    /// `snapshot`).
    pub fn fail(&mut self) {
        self.up = false;
        self.data_manager.clear_uncommitted();
        self.lock_manager.clear();
        self.data_manager.disable_replicated_accessibility();
    }

    /// `up <- true`. Replicated accessibility stays disabled until
    /// re-enabled per-variable by a committed write (`DataManager::set`).
    pub fn recover(&mut self) {
        self.up = true;
    }

    /// Records `{var -> committed value}` for every variable with a
    /// value that's currently accessible. Taken unconditionally,
    /// whether the site is up or down: while down, accessibility has
    /// already been disabled for replicated variables, so the
    /// resulting snapshot is empty or odd-variable-only.
    pub fn snapshot(&mut self, tick: Tick) {
        let mut available = HashMap::new();
        for var in 1..=NUM_VARIABLES {
            if self.data_manager.holds(var) && self.data_manager.check_accessible(var) {
                available.insert(var, self.data_manager.get(var));
            }
        }
        self.snapshots.insert(tick, available);
    }

    pub fn snapshot_read(&self, tick: Tick, var: VariableId) -> Option<i64> {
        self.snapshots.get(&tick).and_then(|snap| snap.get(&var)).copied()
    }

    pub fn snapshot_contains(&self, tick: Tick, var: VariableId) -> bool {
        self.snapshots.get(&tick).map(|snap| snap.contains_key(&var)).unwrap_or(false)
    }

    pub fn has_snapshot(&self, tick: Tick) -> bool {
        self.snapshots.contains_key(&tick)
    }

    /// Dropped at commit time to bound memory, per spec.md §9.
    pub fn drop_snapshot(&mut self, tick: Tick) {
        self.snapshots.remove(&tick);
    }
}
