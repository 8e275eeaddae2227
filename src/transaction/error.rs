//! Transaction-subsystem error types.
//!
//! Only the *input errors* of spec.md §7 are modeled as `Result`
//! failures: unknown opcode, unparsable line, duplicate transaction
//! id, and an operation referencing an unknown transaction. Everything
//! else the spec calls an "error" (lock conflicts, site-down reads,
//! deadlock, site-failure aborts) is a normal, recoverable state
//! transition handled inside `TransactionManager` and is not an `Err`.

use thiserror::Error;

use crate::common::{SiteId, TransactionId, VariableId};

pub type TransactionResult<T> = std::result::Result<T, TransactionError>;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("unknown opcode '{0}'")]
    UnknownOpcode(String),

    #[error("could not parse operation line: '{0}'")]
    ParseError(String),

    #[error("duplicate transaction id '{0}'")]
    DuplicateTransaction(TransactionId),

    #[error("transaction '{0}' does not exist")]
    UnknownTransaction(TransactionId),

    #[error("site id {0} out of range (1..=10)")]
    InvalidSite(usize),

    #[error("variable id {0} out of range (1..=20)")]
    InvalidVariable(usize),
}

impl TransactionError {
    pub fn unknown_opcode(opcode: impl Into<String>) -> Self {
        TransactionError::UnknownOpcode(opcode.into())
    }

    pub fn parse_error(line: impl Into<String>) -> Self {
        TransactionError::ParseError(line.into())
    }

    pub fn duplicate_transaction(id: impl Into<TransactionId>) -> Self {
        TransactionError::DuplicateTransaction(id.into())
    }

    pub fn unknown_transaction(id: impl Into<TransactionId>) -> Self {
        TransactionError::UnknownTransaction(id.into())
    }

    pub fn invalid_site(site: SiteId) -> Self {
        TransactionError::InvalidSite(site)
    }

    pub fn invalid_variable(var: VariableId) -> Self {
        TransactionError::InvalidVariable(var)
    }
}
