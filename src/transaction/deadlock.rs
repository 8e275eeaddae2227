// Wait-for graph: variable-access recorder, edge derivation, cycle
// search, and trace extraction, per spec.md §4.5.
//
// Grounded on the teacher crate's `DeadlockDetector` (recursive DFS
// over a `HashMap<TransactionId, HashSet<TransactionId>>`, picked
// apart here because this graph additionally needs to *derive* edges
// from recorded R/W operations per variable, not just record edges a
// caller already computed) and on the straightforward recursive
// single-seed-per-node DFS in the original Python prototype's
// `algorithms/DeadLockDetector.py::WaitFor`, which this reimplements
// faithfully rather than generalizing to Tarjan's algorithm (spec.md
// §9: "do not over-engineer... at N=10/20").

use std::collections::{HashMap, HashSet};

use crate::common::{TransactionId, VariableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

#[derive(Debug, Default)]
pub struct WaitForGraph {
    /// Recorded R/W operations per variable, by non-read-only
    /// transactions, in submission order.
    var_to_ops: HashMap<VariableId, Vec<(TransactionId, AccessKind)>>,
    /// Directed edges `from -> to`, meaning "from is blocked on to".
    wait_for: HashMap<TransactionId, HashSet<TransactionId>>,
    /// Nodes of the most recently detected cycle.
    trace: Vec<TransactionId>,
}

impl WaitForGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an R/W operation and derives new wait-for edges from
    /// it. Read-only transactions are never recorded (callers should
    /// not call this for them; doing so would be harmless since a
    /// read-only transaction's id would simply never appear as the
    /// target of an edge derived here, but it'd still pollute
    /// `var_to_ops`).
    pub fn add_operation(&mut self, trans_id: &str, var: VariableId, kind: AccessKind) {
        let existing = self.var_to_ops.get(&var).cloned().unwrap_or_default();

        let short_circuit = match kind {
            AccessKind::Read => existing.iter().any(|(t, _)| t == trans_id),
            AccessKind::Write => existing
                .iter()
                .any(|(t, k)| t == trans_id && *k == AccessKind::Write),
        };

        if !short_circuit {
            for (other, other_kind) in &existing {
                if other == trans_id {
                    continue;
                }
                let derives_edge = match kind {
                    AccessKind::Read => *other_kind == AccessKind::Write,
                    AccessKind::Write => true,
                };
                if derives_edge {
                    self.add_edge(trans_id, other);
                }
            }
        }

        self.var_to_ops
            .entry(var)
            .or_default()
            .push((trans_id.to_string(), kind));
    }

    fn add_edge(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        self.wait_for.entry(from.to_string()).or_default().insert(to.to_string());
    }

    /// Depth-first search from every node currently in the graph,
    /// looking for a path back to the start. Stops at the first cycle
    /// found and stashes its nodes in `trace`.
    pub fn check_deadlock(&mut self) -> bool {
        let nodes: Vec<TransactionId> = self.wait_for.keys().cloned().collect();

        for target in &nodes {
            let mut visited = HashSet::new();
            let mut trace = Vec::new();
            if self.dfs(target, target, &mut visited, &mut trace) {
                self.trace = trace;
                return true;
            }
        }
        false
    }

    fn dfs(
        &self,
        cur: &str,
        target: &str,
        visited: &mut HashSet<TransactionId>,
        trace: &mut Vec<TransactionId>,
    ) -> bool {
        visited.insert(cur.to_string());
        let Some(neighbors) = self.wait_for.get(cur) else {
            return false;
        };
        trace.push(cur.to_string());

        for neighbor in neighbors {
            if neighbor == target {
                return true;
            }
            if !visited.contains(neighbor) && self.dfs(neighbor, target, visited, trace) {
                return true;
            }
        }

        trace.pop();
        false
    }

    /// The nodes of the most recently detected cycle. Only meaningful
    /// right after `check_deadlock` returned `true`.
    pub fn get_trace(&self) -> &[TransactionId] {
        &self.trace
    }

    /// Drops `trans_id` from every `var_to_ops` entry and deletes its
    /// outgoing wait-for edges. Edges pointing *at* `trans_id` from
    /// other transactions are left in place — they go dead (the DFS
    /// simply can't step past a node with no outgoing entry) and are
    /// cleaned up lazily the next time their owning transaction is
    /// itself removed.
    pub fn remove_transaction(&mut self, trans_id: &str) {
        for ops in self.var_to_ops.values_mut() {
            ops.retain(|(t, _)| t != trans_id);
        }
        self.wait_for.remove(trans_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_after_write_derives_edge() {
        let mut g = WaitForGraph::new();
        g.add_operation("T1", 1, AccessKind::Write);
        g.add_operation("T2", 1, AccessKind::Read);
        assert!(g.wait_for.get("T2").unwrap().contains("T1"));
    }

    #[test]
    fn write_after_read_derives_edge() {
        let mut g = WaitForGraph::new();
        g.add_operation("T1", 1, AccessKind::Read);
        g.add_operation("T2", 1, AccessKind::Write);
        assert!(g.wait_for.get("T2").unwrap().contains("T1"));
    }

    #[test]
    fn write_after_write_derives_edge() {
        let mut g = WaitForGraph::new();
        g.add_operation("T1", 1, AccessKind::Write);
        g.add_operation("T2", 1, AccessKind::Write);
        assert!(g.wait_for.get("T2").unwrap().contains("T1"));
    }

    #[test]
    fn own_transaction_access_does_not_self_edge() {
        let mut g = WaitForGraph::new();
        g.add_operation("T1", 1, AccessKind::Write);
        g.add_operation("T1", 1, AccessKind::Read);
        assert!(!g.wait_for.contains_key("T1"));
    }

    #[test]
    fn simple_two_cycle_detected() {
        let mut g = WaitForGraph::new();
        // T1 writes x2, T2 writes x4, T1 writes x4 (waits on T2), T2 writes x2 (waits on T1).
        g.add_operation("T1", 2, AccessKind::Write);
        g.add_operation("T2", 4, AccessKind::Write);
        g.add_operation("T1", 4, AccessKind::Write);
        g.add_operation("T2", 2, AccessKind::Write);
        assert!(g.check_deadlock());
        let trace = g.get_trace();
        assert!(trace.contains(&"T1".to_string()));
        assert!(trace.contains(&"T2".to_string()));
    }

    #[test]
    fn no_cycle_when_chain_does_not_close() {
        let mut g = WaitForGraph::new();
        g.add_operation("T1", 2, AccessKind::Write);
        g.add_operation("T2", 2, AccessKind::Write);
        assert!(!g.check_deadlock());
    }

    #[test]
    fn remove_transaction_clears_outgoing_edges_and_ops() {
        let mut g = WaitForGraph::new();
        g.add_operation("T1", 2, AccessKind::Write);
        g.add_operation("T2", 2, AccessKind::Write);
        g.remove_transaction("T2");
        assert!(!g.wait_for.contains_key("T2"));
        assert!(!g.var_to_ops.get(&2).unwrap().iter().any(|(t, _)| t == "T2"));
    }
}
