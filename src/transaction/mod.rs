//! The transactional core: available-copies strict two-phase locking,
//! MVCC snapshot reads, wait-for-graph deadlock detection, and site
//! failure/recovery.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`types`] | `Transaction`, `TransactionKind`, `AbortReason` |
//! | [`error`] | Input-error taxonomy (`TransactionError`) |
//! | [`data_manager`] | Per-site committed values and uncommitted-write log |
//! | [`lock_manager`] | Per-site shared/exclusive lock table |
//! | [`site`] | Bundles the above with up/down state and MVCC snapshots |
//! | [`deadlock`] | Wait-for graph: edge derivation and cycle search |
//! | [`operation`] | Opcode variants and their `execute` contract |
//! | [`manager`] | Registry, dispatch, blocked queue, abort/commit orchestration |

pub mod data_manager;
pub mod deadlock;
pub mod error;
pub mod lock_manager;
pub mod manager;
pub mod operation;
pub mod site;
pub mod types;

pub use deadlock::{AccessKind, WaitForGraph};
pub use error::{TransactionError, TransactionResult};
pub use lock_manager::{LockKind, LockManager};
pub use manager::TransactionManager;
pub use operation::Operation;
pub use site::Site;
pub use types::{AbortReason, Transaction, TransactionKind};
