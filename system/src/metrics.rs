use dpos_abi::Method;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};
use std::sync::{Arc, Mutex, PoisonError};

/// Label for per-method metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct MethodLabel {
    pub method: String,
}

impl From<&Method> for MethodLabel {
    fn from(method: &Method) -> Self {
        Self {
            method: method.name().to_string(),
        }
    }
}

/// Metrics for the [crate::Fetcher].
#[derive(Clone, Debug, Default)]
pub struct Fetcher {
    /// Read-only calls issued, by method
    pub contract_calls: Family<MethodLabel, Counter>,
    /// Pages consumed while enumerating validators
    pub validator_pages: Counter,
}

impl Fetcher {
    /// Create and return a new set of metrics, registered with the given registry.
    pub fn init(registry: &Arc<Mutex<Registry>>) -> Self {
        let metrics = Self::default();
        let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.register(
            "contract_calls",
            "Number of read-only system contract calls by method",
            metrics.contract_calls.clone(),
        );
        registry.register(
            "validator_pages",
            "Number of validator pages fetched",
            metrics.validator_pages.clone(),
        );
        metrics
    }
}

/// Metrics for the [crate::Injector].
#[derive(Clone, Debug, Default)]
pub struct Injector {
    /// System transactions executed, by method
    pub system_transactions: Family<MethodLabel, Counter>,
    /// Gas consumed by system transactions
    pub system_gas: Counter,
}

impl Injector {
    /// Create and return a new set of metrics, registered with the given registry.
    pub fn init(registry: &Arc<Mutex<Registry>>) -> Self {
        let metrics = Self::default();
        let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.register(
            "system_transactions",
            "Number of system transactions executed by method",
            metrics.system_transactions.clone(),
        );
        registry.register(
            "system_gas",
            "Gas consumed by system transactions",
            metrics.system_gas.clone(),
        );
        metrics
    }
}
