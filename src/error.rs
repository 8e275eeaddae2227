//! Crate-level error type.
//!
//! Wraps the transaction subsystem's errors together with I/O failures
//! from batch/directory mode so that `main` can map them to the exit
//! codes spec.md §6 requires: 0 on success, nonzero on unparseable
//! input or a duplicate transaction id.

use thiserror::Error;

use crate::transaction::TransactionError;

pub type Result<T> = std::result::Result<T, RepcrecError>;

#[derive(Error, Debug)]
pub enum RepcrecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}
