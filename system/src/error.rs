use crate::CallError;
use alloy_primitives::{Address, B256, U256};
use thiserror::Error;

/// Errors that can occur when interacting with the system contracts.
///
/// None of these are transient: each one must abort processing of the block that
/// produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("encoding failed: {0}")]
    Encoding(dpos_abi::Error),
    #[error("decoding failed: {0}")]
    Decoding(dpos_abi::Error),
    #[error("call failed: {0}")]
    Call(#[from] CallError),
    #[error("protocol violation: {0}")]
    Protocol(#[from] Protocol),
    #[error("execution failed: {0}")]
    Execution(#[from] Execution),
}

/// A contract returned data that is well-formed but cannot be trusted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Protocol {
    #[error("cursor did not advance: current={current}, next={next}")]
    StalledCursor { current: U256, next: U256 },
    #[error("validator enumeration exceeded {0} pages")]
    PageLimit(usize),
    #[error("page columns differ in length: owners={owners}, operators={operators}, stakes={stakes}, candidates={candidates}")]
    PageShape {
        owners: usize,
        operators: usize,
        stakes: usize,
        candidates: usize,
    },
}

/// A system transaction could not be produced or applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    #[error("call to {to} reverted: {reason}")]
    Reverted { to: Address, reason: String },
    #[error("transaction rejected: {0}")]
    Rejected(String),
    #[error("nonce of {account} moved from {before} to {after}")]
    NonceNotAdvanced {
        account: Address,
        before: u64,
        after: u64,
    },
    #[error("missing {0} event")]
    MissingEvent(&'static str),
    #[error("system transaction used no gas")]
    NoGasUsed,
    #[error("system transaction emitted {0} logs, expected exactly one")]
    LogCount(usize),
    #[error("block carries no system transaction for {0}")]
    MissingTransaction(&'static str),
    #[error("unexpected system transaction: expected={expected}, found={found}")]
    UnexpectedTransaction { expected: B256, found: B256 },
    #[error("invalid signature: {0}")]
    InvalidSignature(dpos_cryptography::Error),
    #[error("invalid sender: expected={expected}, found={found}")]
    InvalidSender { expected: Address, found: Address },
    #[error("signer {found} cannot sign for {expected}")]
    UnauthorizedSigner { expected: Address, found: Address },
    #[error("signing failed: {0}")]
    Signing(dpos_cryptography::Error),
    #[error("gas overflow")]
    GasOverflow,
}
