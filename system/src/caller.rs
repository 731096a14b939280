//! Read-only contract calls.

use alloy_primitives::{Address, B256, U256};
use bytes::Bytes;
use std::{collections::BTreeMap, fmt};
use thiserror::Error;

/// The state a read-only call executes against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockRef {
    Hash(B256),
    Number(u64),
    Pending,
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockRef::Hash(hash) => write!(f, "{hash}"),
            BlockRef::Number(number) => write!(f, "#{number}"),
            BlockRef::Pending => write!(f, "pending"),
        }
    }
}

/// Arguments of a read-only call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
}

impl CallRequest {
    pub fn new(to: Address, data: Bytes) -> Self {
        Self {
            from: None,
            to,
            data,
        }
    }
}

/// Replacement values for a single account, applied before a call executes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountOverride {
    pub balance: Option<U256>,
    pub nonce: Option<u64>,
    pub code: Option<Bytes>,
    pub storage: BTreeMap<B256, B256>,
}

/// Per-account overrides, ordered by address.
pub type StateOverride = BTreeMap<Address, AccountOverride>;

/// Failure reported by a [ContractCaller].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("call reverted")]
    Reverted(Bytes),
    #[error("state unavailable at {0}")]
    Unavailable(BlockRef),
    #[error("call failed: {0}")]
    Other(String),
}

/// Performs read-only contract calls against historical or pending state.
///
/// This is the only path through which fetchers observe chain state.
pub trait ContractCaller {
    fn call(
        &mut self,
        request: &CallRequest,
        block: BlockRef,
        overrides: Option<&StateOverride>,
    ) -> Result<Bytes, CallError>;
}

impl<C: ContractCaller + ?Sized> ContractCaller for &mut C {
    fn call(
        &mut self,
        request: &CallRequest,
        block: BlockRef,
        overrides: Option<&StateOverride>,
    ) -> Result<Bytes, CallError> {
        (**self).call(request, block, overrides)
    }
}
