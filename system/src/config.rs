use crate::{
    contracts::{ALLOWLIST, ENVIRONMENT, STAKE_MANAGER},
    transaction::MAX_CHAIN_ID,
    types::EnvironmentValue,
};
use alloy_primitives::{Address, U256};
use prometheus_client::registry::Registry;
use std::sync::{Arc, Mutex};

/// Default number of validators requested per page.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Default bound on pages requested during one enumeration.
pub const DEFAULT_MAX_PAGES: usize = 10_000;

/// Configuration for reading from and transacting with the system contracts.
#[derive(Clone)]
pub struct Config {
    /// Chain identifier committed to by system transaction signatures.
    pub chain_id: u64,

    /// Address of the environment contract.
    pub environment: Address,

    /// Address of the stake manager contract.
    pub stake_manager: Address,

    /// Address of the allowlist contract, passed to the stake manager on initialization.
    pub allowlist: Address,

    /// Number of entries requested per page when enumerating validators.
    pub page_size: u64,

    /// Maximum number of pages requested during one enumeration, including
    /// the terminating empty page.
    pub max_pages: usize,

    /// Gas limit attached to each system transaction.
    pub gas_limit: u64,

    /// Parameters passed to the environment contract on initialization.
    pub initial_environment: EnvironmentValue,

    /// Registry for metrics.
    pub registry: Arc<Mutex<Registry>>,
}

impl Config {
    /// Configuration using the well-known contract addresses.
    pub fn new(
        chain_id: u64,
        initial_environment: EnvironmentValue,
        registry: Arc<Mutex<Registry>>,
    ) -> Self {
        Self {
            chain_id,
            environment: ENVIRONMENT,
            stake_manager: STAKE_MANAGER,
            allowlist: ALLOWLIST,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            gas_limit: u64::MAX / 2,
            initial_environment,
            registry,
        }
    }

    /// Assert enforces that all configuration values are valid.
    pub fn assert(&self) {
        assert!(self.chain_id <= MAX_CHAIN_ID, "chain id out of range");
        assert!(self.page_size > 0, "page size must be greater than zero");
        assert!(self.max_pages > 0, "max pages must be greater than zero");
        assert!(self.gas_limit > 0, "gas limit must be greater than zero");
        assert!(
            self.environment != self.stake_manager,
            "environment and stake manager must be distinct"
        );
        assert!(
            self.initial_environment.block_period > U256::ZERO,
            "block period must be greater than zero"
        );
        assert!(
            self.initial_environment.epoch_period > U256::ZERO,
            "epoch period must be greater than zero"
        );
    }
}
