// Operation variants, per spec.md §4.4.
//
// Grounded on the teacher crate's pattern of a tagged enum with a
// dispatch method (seen across its `occ.rs`/`two_phase_commit.rs`
// variant types) rather than a trait object per opcode — there is no
// need for open extensibility here, and the original Python prototype
// itself dispatches on a class hierarchy only because Python lacks a
// cheap sum type; a closed enum is the direct Rust translation.

use std::fmt;

use crate::common::{SiteId, Tick, TransactionId, VariableId};
use crate::error::Result;
use crate::transaction::deadlock::AccessKind;
use crate::transaction::manager::TransactionManager;
use crate::transaction::types::TransactionKind;

#[derive(Debug, Clone)]
pub enum Operation {
    Begin { trans_id: TransactionId },
    BeginReadOnly { trans_id: TransactionId },
    Read { trans_id: TransactionId, var: VariableId },
    Write { trans_id: TransactionId, var: VariableId, value: i64 },
    End { trans_id: TransactionId },
    Fail { site: SiteId },
    Recover { site: SiteId },
    Dump,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Begin { trans_id } => write!(f, "begin({trans_id})"),
            Operation::BeginReadOnly { trans_id } => write!(f, "beginRO({trans_id})"),
            Operation::Read { trans_id, var } => write!(f, "R({trans_id},x{var})"),
            Operation::Write { trans_id, var, value } => write!(f, "W({trans_id},x{var},{value})"),
            Operation::End { trans_id } => write!(f, "end({trans_id})"),
            Operation::Fail { site } => write!(f, "fail({site})"),
            Operation::Recover { site } => write!(f, "recover({site})"),
            Operation::Dump => write!(f, "dump()"),
        }
    }
}

impl Operation {
    /// Which transaction (if any) this op belongs to, for blocked-queue
    /// bookkeeping in the Transaction Manager.
    pub fn trans_id(&self) -> Option<&str> {
        match self {
            Operation::Begin { trans_id }
            | Operation::BeginReadOnly { trans_id }
            | Operation::Read { trans_id, .. }
            | Operation::Write { trans_id, .. }
            | Operation::End { trans_id } => Some(trans_id),
            Operation::Fail { .. } | Operation::Recover { .. } | Operation::Dump => None,
        }
    }

    /// `true` = completed (possibly with a side-effecting abort);
    /// `false` = must be re-queued on the blocked list.
    ///
    /// `retry` distinguishes a first execution (history/wait-for graph
    /// get a new entry) from a re-attempt of an already-recorded op.
    pub fn execute(&self, tick: Tick, tm: &mut TransactionManager, retry: bool) -> Result<bool> {
        match self {
            Operation::Begin { trans_id } => {
                tm.begin(trans_id.clone(), tick, TransactionKind::ReadWrite)?;
                Ok(true)
            }
            Operation::BeginReadOnly { trans_id } => {
                tm.begin(trans_id.clone(), tick, TransactionKind::ReadOnly)?;
                tm.snapshot_all_sites(tick);
                Ok(true)
            }
            Operation::Read { trans_id, var } => self.execute_read(trans_id, *var, tick, tm, retry),
            Operation::Write { trans_id, var, value } => {
                self.execute_write(trans_id, *var, *value, tick, tm, retry)
            }
            Operation::End { trans_id } => self.execute_end(trans_id, tick, tm, retry),
            Operation::Fail { site } => {
                tm.fail_site(*site)?;
                Ok(true)
            }
            Operation::Recover { site } => {
                tm.recover_site(*site)?;
                Ok(true)
            }
            Operation::Dump => {
                tm.dump()?;
                Ok(true)
            }
        }
    }

    fn execute_read(
        &self,
        trans_id: &str,
        var: VariableId,
        tick: Tick,
        tm: &mut TransactionManager,
        retry: bool,
    ) -> Result<bool> {
        let read_only = tm.is_read_only(trans_id)?;
        if !retry {
            tm.record_history(trans_id, tick, format!("R({trans_id},x{var})"))?;
            // Wait-for bookkeeping is for R/W transactions only: a
            // read-only transaction never takes a lock, so it can
            // neither wait on anyone nor be waited on (spec.md §3, §4.5).
            if !read_only {
                tm.wait_for_add(trans_id, var, AccessKind::Read);
            }
        }

        if read_only {
            tm.read_only_read(trans_id, var)
        } else {
            Ok(tm.read_write_read(trans_id, var)?)
        }
    }

    fn execute_write(
        &self,
        trans_id: &str,
        var: VariableId,
        value: i64,
        tick: Tick,
        tm: &mut TransactionManager,
        retry: bool,
    ) -> Result<bool> {
        if !retry {
            tm.record_history(trans_id, tick, format!("W({trans_id},x{var},{value})"))?;
            tm.wait_for_add(trans_id, var, AccessKind::Write);
        }
        Ok(tm.write(trans_id, var, value)?)
    }

    fn execute_end(&self, trans_id: &str, tick: Tick, tm: &mut TransactionManager, retry: bool) -> Result<bool> {
        if !retry {
            tm.record_history(trans_id, tick, format!("end({trans_id})"))?;
        }
        tm.end(trans_id)
    }
}
