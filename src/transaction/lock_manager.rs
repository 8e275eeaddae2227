// Per-site lock manager: shared/exclusive locks over variables.
//
// Implements the grant/deny/promote table of spec.md §4.2. Unlike the
// teacher crate's `LockManager` (locks over arbitrary string
// "resources", with a timeout-and-condvar wait queue, because that
// lock manager serves real concurrent threads) this one has a single
// caller per tick and never blocks internally: a denied request comes
// back as `false` and the *operation* decides whether to retry later,
// per spec.md §5 ("blocked" is a logical condition recorded in the
// Transaction Manager, not OS-level blocking).

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::common::{TransactionId, VariableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Shared,
    Exclusive,
}

#[derive(Debug, Clone, Default)]
struct LockEntry {
    shared: HashSet<TransactionId>,
    exclusive: Option<TransactionId>,
}

impl LockEntry {
    fn is_empty(&self) -> bool {
        self.shared.is_empty() && self.exclusive.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LockManager {
    table: HashMap<VariableId, LockEntry>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to grant `kind` on `var` to `trans_id`. See spec.md
    /// §4.2 for the full grant/deny/promote table this implements.
    pub fn try_lock(&mut self, trans_id: &str, var: VariableId, kind: LockKind) -> bool {
        let entry = self.table.entry(var).or_default();

        match kind {
            LockKind::Shared => match &entry.exclusive {
                Some(holder) if holder == trans_id => true,
                Some(_) => false,
                None => {
                    entry.shared.insert(trans_id.to_string());
                    true
                }
            },
            LockKind::Exclusive => {
                if let Some(holder) = &entry.exclusive {
                    return holder == trans_id;
                }
                if entry.shared.is_empty() {
                    entry.exclusive = Some(trans_id.to_string());
                    true
                } else if entry.shared.len() == 1 && entry.shared.contains(trans_id) {
                    entry.shared.clear();
                    entry.exclusive = Some(trans_id.to_string());
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Releases `trans_id`'s hold on `var` alone, leaving its locks on
    /// other variables untouched. Used by the all-or-nothing replicated
    /// write path to unwind a partial lock acquisition.
    pub fn release(&mut self, trans_id: &str, var: VariableId) {
        let Some(entry) = self.table.get_mut(&var) else {
            return;
        };
        entry.shared.remove(trans_id);
        if entry.exclusive.as_deref() == Some(trans_id) {
            entry.exclusive = None;
        }
        if entry.is_empty() {
            self.table.remove(&var);
        }
    }

    /// Removes `trans_id` from every shared set and clears any
    /// exclusive lock it holds; drops now-empty table entries.
    pub fn release_transaction_locks(&mut self, trans_id: &str) {
        self.table.retain(|_, entry| {
            entry.shared.remove(trans_id);
            if entry.exclusive.as_deref() == Some(trans_id) {
                entry.exclusive = None;
            }
            !entry.is_empty()
        });
    }

    /// Wipes the entire table — called on site failure.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// The union of every current lock holder in this site's table.
    pub fn involved_transactions(&self) -> HashSet<TransactionId> {
        let mut result = HashSet::new();
        for entry in self.table.values() {
            result.extend(entry.shared.iter().cloned());
            if let Some(holder) = &entry.exclusive {
                result.insert(holder.clone());
            }
        }
        result
    }
}

impl fmt::Display for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LockManager({} locked variables)", self.table.len())
    }
}
