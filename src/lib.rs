//! RepCRec — a single-process simulator of a replicated database:
//! available-copies strict two-phase locking, MVCC snapshot reads for
//! read-only transactions, wait-for-graph deadlock detection with
//! youngest-victim abort, and site failure/recovery semantics.

pub mod common;
pub mod config;
pub mod driver;
pub mod error;
pub mod format;
pub mod parser;
pub mod transaction;

pub use error::{RepcrecError, Result};
