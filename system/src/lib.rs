//! Read validator, reward and parameter state from system contracts and inject system transactions.
//!
//! A delegated-proof-of-stake chain keeps its validator set, rewards and tunable parameters in
//! a pair of on-chain contracts: the environment contract (chain parameters) and the stake
//! manager (validators, stakes and slashing). This crate mediates between the consensus engine
//! and those contracts:
//!
//! * [Fetcher] reads the next epoch's validators, the rewards of the last epoch and the next
//!   environment value through a [ContractCaller].
//! * [Injector] builds the system transactions that initialize both contracts at bootstrap and
//!   that slash validators which missed their turns, finalizes them with a [finalizer::Finalizer]
//!   (signing when producing a block, matching when validating one) and executes them against
//!   the block's [State].
//!
//! Every failure is fatal to the block being processed: nothing is retried.
//!
//! # Status
//!
//! `dpos-system` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

pub mod caller;
mod config;
pub mod contracts;
mod error;
pub mod execution;
mod fetcher;
pub mod finalizer;
mod injector;
mod metrics;
pub mod transaction;
mod types;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use caller::{BlockRef, CallError, CallRequest, ContractCaller, StateOverride};
pub use config::{Config, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
pub use error::{Error, Execution, Protocol};
pub use execution::{Assembly, ChainContext, Header, Log, Outcome, Receipt, State};
pub use fetcher::Fetcher;
pub use injector::Injector;
pub use transaction::{Transaction, UnsignedTransaction};
pub use types::{EnvironmentValue, NextValidators, ValidatorCandidate};
