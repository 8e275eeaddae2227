// Per-site data manager: committed values, accessibility flags, and
// the uncommitted-write log that makes read-your-own-writes possible.
//
// Mirrors spec.md §4.1. One `DataManager` lives inside each `Site`.

use std::collections::HashMap;

use crate::common::{initial_value, is_replicated, owning_site, SiteId, TransactionId, VariableId, NUM_VARIABLES};

/// Returns whether `site_id` holds a copy of `var` at all: every site
/// holds every even (replicated) variable; an odd variable is held
/// only by its single owning site.
pub fn site_holds(site_id: SiteId, var: VariableId) -> bool {
    is_replicated(var) || owning_site(var) == site_id
}

#[derive(Debug, Clone)]
pub struct DataManager {
    site_id: SiteId,
    /// Committed value per variable this site holds; `None` for
    /// variables the site doesn't hold.
    data: [Option<i64>; NUM_VARIABLES],
    /// Whether each held variable is currently safe to read here.
    accessible: [bool; NUM_VARIABLES],
    /// Per-transaction staged writes, keyed by variable.
    uncommitted_log: HashMap<TransactionId, HashMap<VariableId, i64>>,
}

impl DataManager {
    pub fn new(site_id: SiteId) -> Self {
        let mut data = [None; NUM_VARIABLES];
        let accessible = [true; NUM_VARIABLES];
        for var in 1..=NUM_VARIABLES {
            if site_holds(site_id, var) {
                data[var - 1] = Some(initial_value(var));
            }
        }
        Self {
            site_id,
            data,
            accessible,
            uncommitted_log: HashMap::new(),
        }
    }

    pub fn holds(&self, var: VariableId) -> bool {
        site_holds(self.site_id, var)
    }

    /// Committed value of `var`. Panics if this site doesn't hold it —
    /// callers must check `holds` (or rely on the routing operations
    /// already do, which never address a site for a variable it
    /// doesn't hold).
    pub fn get(&self, var: VariableId) -> i64 {
        self.data[var - 1].expect("get() on a variable this site does not hold")
    }

    /// Overwrites the committed value and re-enables accessibility —
    /// used by commit to re-enable reads of a replicated variable
    /// after its first post-recovery write.
    pub fn set(&mut self, var: VariableId, value: i64) {
        self.data[var - 1] = Some(value);
        self.accessible[var - 1] = true;
    }

    pub fn check_accessible(&self, var: VariableId) -> bool {
        self.accessible[var - 1]
    }

    /// Called on recovery: disables accessibility of every even
    /// (replicated) variable this site holds. Odd, non-replicated
    /// variables remain accessible — the site never had a stale copy
    /// of its own exclusively-owned variable.
    pub fn disable_replicated_accessibility(&mut self) {
        for var in 1..=NUM_VARIABLES {
            if self.holds(var) && is_replicated(var) {
                self.accessible[var - 1] = false;
            }
        }
    }

    /// Called on failure: drops all pending write logs.
    pub fn clear_uncommitted(&mut self) {
        self.uncommitted_log.clear();
    }

    /// Called on abort: drops this transaction's pending writes only.
    pub fn revert(&mut self, trans_id: &str) {
        self.uncommitted_log.remove(trans_id);
    }

    pub fn stage_write(&mut self, trans_id: &str, var: VariableId, value: i64) {
        self.uncommitted_log
            .entry(trans_id.to_string())
            .or_default()
            .insert(var, value);
    }

    /// The staged value for `trans_id`'s pending write to `var`, if any.
    pub fn staged_value(&self, trans_id: &str, var: VariableId) -> Option<i64> {
        self.uncommitted_log.get(trans_id).and_then(|w| w.get(&var)).copied()
    }

    /// Read-your-own-writes: the staged value if `trans_id` has one
    /// pending for `var`, else the committed value.
    pub fn do_read(&self, trans_id: &str, var: VariableId) -> i64 {
        self.staged_value(trans_id, var).unwrap_or_else(|| self.get(var))
    }

    /// Pending writes for a transaction, to apply at commit time.
    pub fn take_pending_writes(&mut self, trans_id: &str) -> Option<HashMap<VariableId, i64>> {
        self.uncommitted_log.remove(trans_id)
    }

    pub fn has_pending_writes(&self, trans_id: &str) -> bool {
        self.uncommitted_log
            .get(trans_id)
            .map(|w| !w.is_empty())
            .unwrap_or(false)
    }

    /// Row for the `dump` table: one cell per variable index
    /// `1..=NUM_VARIABLES`, `None` where this site doesn't hold it.
    pub fn echo(&self) -> Vec<Option<i64>> {
        self.data.to_vec()
    }
}
