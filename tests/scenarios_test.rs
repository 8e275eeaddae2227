// End-to-end scenario tests driving `TransactionManager` the way
// `examples/original_source/utils/driver.py::run` drives one test
// case: a flat list of operation lines through a single tick sequence.
//
// Mirrors spec.md §8's S1-S6 scenarios and a couple of the numbered
// universal invariants that are easiest to check end-to-end rather
// than unit-by-unit.

use std::io::Write;
use std::sync::{Arc, Mutex};

use repcrec::driver::run_case;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

fn run(lines: &[&str]) -> (bool, String) {
    let buf = SharedBuffer::default();
    let out = buf.clone();
    let lines: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
    let had_error = run_case(&lines, Box::new(out)).expect("case runs without a hard I/O error");
    let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
    (had_error, text)
}

#[test]
fn s1_basic_write_read_through_commit() {
    let (had_error, out) = run(&["begin(T1)", "W(T1,x1,101)", "R(T1,x1)", "end(T1)", "dump()"]);
    assert!(!had_error);
    // read-your-own-writes: the uncommitted value, not the prior 10.
    assert!(out.contains("101"));
    assert!(out.contains("T1 commits"));
}

#[test]
fn s2_replicated_write_lands_on_every_site() {
    let (had_error, out) = run(&["begin(T1)", "W(T1,x8,88)", "end(T1)", "dump()"]);
    assert!(!had_error);
    assert!(out.contains("T1 commits"));
    let dump_table = out.split("T1 commits").nth(1).unwrap();
    // x8 is replicated: every one of the 10 site rows should show 88.
    assert_eq!(dump_table.matches("88").count(), 10);
}

#[test]
fn s3_deadlock_aborts_the_younger_transaction() {
    let (_, out) = run(&[
        "begin(T1)",
        "begin(T2)",
        "W(T1,x2,22)",
        "W(T2,x4,44)",
        "W(T1,x4,444)",
        "W(T2,x2,222)",
    ]);
    assert!(out.contains("T2 aborts: deadlock"));
    assert!(!out.contains("T1 aborts"));
}

#[test]
fn s4_recovered_site_blocks_replicated_read_until_rewrite() {
    // Every other site holding x2 stays up, so the read should succeed
    // from one of them without ever touching the stale copy at site 2.
    let (had_error, out) = run(&["begin(T1)", "fail(2)", "recover(2)", "R(T1,x2)", "end(T1)"]);
    assert!(!had_error);
    assert!(out.contains("T1 commits"));
}

#[test]
fn s4_read_blocks_when_only_the_recovered_site_remains() {
    // Site 2 goes through a fail/recover cycle first, so its copy of
    // x2 (replicated) is accessible=false until rewritten. Every other
    // site then fails too, leaving site 2 the lone up site, but one
    // whose copy cannot be read.
    let mut lines = vec!["begin(T1)".to_string(), "fail(2)".to_string(), "recover(2)".to_string()];
    for site in 1..=10u32 {
        if site != 2 {
            lines.push(format!("fail({site})"));
        }
    }
    lines.push("R(T1,x2)".to_string());
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let (_, out) = run(&refs);
    // x2's only remaining up site is the just-recovered, still
    // inaccessible site 2: the read can neither succeed nor abort, it
    // blocks, and the drain loop reports no progress.
    assert!(out.contains("no progress"));
}

#[test]
fn s5_read_only_snapshot_isolation_across_fail_recover() {
    let (had_error, out) = run(&[
        "begin(T1)",
        "W(T1,x6,66)",
        "end(T1)",
        "beginRO(T2)",
        "fail(3)",
        "R(T2,x6)",
        "recover(3)",
    ]);
    assert!(!had_error);
    assert!(out.contains("66"));
}

#[test]
fn s6_odd_variable_blocks_rather_than_aborts_while_its_sole_site_is_down() {
    // spec.md §4.4.2's per-case algorithm for an odd (non-replicated)
    // variable is explicit: "if down, return false (block, retry
    // later)" — unconditionally, with no carve-out for "every site has
    // failed". The owning site's tick-1 snapshot was already captured
    // while it was still up and survives the failure untouched
    // (spec.md §4.3), so once it recovers the read can still succeed;
    // blocking (not aborting) is therefore the literal and correct
    // behavior here, even though every site is currently down. See
    // DESIGN.md's Open Question resolution for the S6 scenario.
    let mut lines = vec!["beginRO(T1)".to_string()];
    for site in 1..=10u32 {
        lines.push(format!("fail({site})"));
    }
    lines.push("R(T1,x7)".to_string());
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let (_, out) = run(&refs);
    assert!(out.contains("no progress"));
    assert!(!out.contains("T1 aborts"));
}

#[test]
fn read_only_aborts_when_no_site_ever_captured_the_variable() {
    // Every site is already down *before* beginRO, so not one of the
    // (still-taken, per spec.md §4.3) snapshots records x2 — a
    // replicated variable's accessibility is disabled on every down
    // site. No site, up or down, can ever answer this read: abort.
    let mut lines = Vec::new();
    for site in 1..=10u32 {
        lines.push(format!("fail({site})"));
    }
    lines.push("beginRO(T1)".to_string());
    lines.push("R(T1,x2)".to_string());
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let (_, out) = run(&refs);
    assert!(out.contains("T1 aborts: read-only, no version available"));
}

#[test]
fn duplicate_transaction_id_is_a_line_level_error_not_fatal() {
    let (had_error, out) = run(&["begin(T1)", "begin(T1)", "W(T1,x2,5)", "end(T1)"]);
    assert!(had_error);
    // the case still ran to completion past the bad line.
    assert!(out.contains("T1 commits"));
}

#[test]
fn unknown_transaction_reference_is_a_line_level_error() {
    let (had_error, out) = run(&["R(T9,x2)", "begin(T1)", "end(T1)"]);
    assert!(had_error);
    assert!(out.contains("T1 commits"));
}

#[test]
fn fifo_retry_respects_submission_order() {
    // T2 holds the exclusive lock on x2. T1 queues for it first, then
    // T3 queues behind T1. Once T2 releases, the single retry pass
    // must grant the lock to T1 (submitted first) and leave T3 still
    // waiting, not the other way around.
    let (had_error, out) = run(&[
        "begin(T1)",
        "begin(T2)",
        "begin(T3)",
        "W(T2,x2,2)",
        "W(T1,x2,11)",
        "W(T3,x2,33)",
        "end(T2)",
        "end(T1)",
    ]);
    assert!(!had_error);
    assert!(out.contains("T2 commits"));
    assert!(out.contains("T1 commits"));
    assert!(!out.contains("T3 commits"));
}

#[test]
fn committing_twice_is_rejected_as_unknown_transaction() {
    let (had_error, out) = run(&["begin(T1)", "end(T1)", "end(T1)"]);
    assert!(had_error);
    assert_eq!(out.matches("T1 commits").count(), 1);
}

#[test]
fn aborted_transaction_leaves_no_ghost_writes_visible_to_others() {
    // T1 stages a write to x2 but the site fails before it commits; T1
    // is forced to abort at `end`. A later transaction must see the
    // original committed value, not T1's staged one.
    let (_, out) = run(&[
        "begin(T1)",
        "W(T1,x2,999)",
        "fail(1)",
        "end(T1)",
        "begin(T2)",
        "R(T2,x2)",
        "end(T2)",
    ]);
    assert!(out.contains("T1 aborts: site failure"));
    assert!(!out.contains("999"));
    assert!(out.contains("20")); // x2's untouched initial value
}

#[test]
fn read_only_reads_never_enter_the_wait_for_graph() {
    // T2 is read-only: its reads must never be recorded as wait-for
    // nodes/edges, since it holds no locks and cannot be waited on or
    // wait on anyone (spec.md §3, §4.5). Before the fix, T2's RO read
    // of x2 (after T1's uncommitted write) recorded an edge T2->T1,
    // and T1's later write of x4 (after T2's RO read of x4) recorded
    // T1->T2, closing a bogus cycle and aborting T2 with "deadlock" —
    // something spec.md reserves exclusively for "read-only, no
    // version available".
    let (had_error, out) = run(&[
        "begin(T1)",
        "beginRO(T2)",
        "W(T1,x2,100)",
        "R(T2,x4)",
        "R(T2,x2)",
        "W(T1,x4,50)",
        "end(T1)",
    ]);
    assert!(!had_error);
    assert!(!out.contains("T2 aborts"));
    assert!(out.contains("T1 commits"));
}
