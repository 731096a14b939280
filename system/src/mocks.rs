//! In-memory stand-ins for the collaborators of this crate.

use crate::{
    caller::{BlockRef, CallError, CallRequest, ContractCaller, StateOverride},
    contracts::{environment, stake_manager},
    execution::{ChainContext, Header, Log, Outcome, State},
    transaction::Transaction,
    Execution,
};
use alloy_primitives::{Address, U256};
use bytes::Bytes;
use dpos_abi::{Event, SELECTOR_LEN};
use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{Arc, Mutex},
};

/// Gas charged for every transaction.
const TX_GAS: u64 = 21_000;
/// Gas charged per zero byte of calldata.
const ZERO_BYTE_GAS: u64 = 4;
/// Gas charged per non-zero byte of calldata.
const NON_ZERO_BYTE_GAS: u64 = 16;
/// Gas charged for setting a storage slot from zero.
const STORE_GAS: u64 = 20_000;
/// Gas charged for emitting a log with one topic.
const LOG_GAS: u64 = 750;

/// Slot holding the `initialized` flag of both contracts.
pub const INITIALIZED_SLOT: u64 = 0;
/// Slot holding the `slashed` flag of the stake manager.
pub const SLASHED_SLOT: u64 = 1;
/// Value stored in [SLASHED_SLOT] by `slash`.
pub const SLASHED: u64 = 2;

/// A [ContractCaller] that replays queued responses in order and records every request.
///
/// Clones share their queue and history.
#[derive(Clone, Default)]
pub struct Calls {
    responses: Arc<Mutex<VecDeque<Result<Bytes, CallError>>>>,
    requests: Arc<Mutex<Vec<(CallRequest, BlockRef)>>>,
}

impl Calls {
    /// Queues a successful response.
    pub fn push(&self, output: Bytes) {
        self.responses.lock().unwrap().push_back(Ok(output));
    }

    /// Queues a failure.
    pub fn fail(&self, err: CallError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<(CallRequest, BlockRef)> {
        self.requests.lock().unwrap().clone()
    }
}

impl ContractCaller for Calls {
    fn call(
        &mut self,
        request: &CallRequest,
        block: BlockRef,
        _overrides: Option<&StateOverride>,
    ) -> Result<Bytes, CallError> {
        self.requests.lock().unwrap().push((request.clone(), block));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CallError::Other("no response queued".into())))
    }
}

/// Account state emulating the environment and stake manager contracts.
///
/// Both contracts store `initialized = 1` in slot 0 and emit `Initialized()` when
/// initialized (reverting if already initialized). `slash` stores `2` in slot 1 of the stake
/// manager and emits `Slashed()`. Any other call reverts. A transaction that fails leaves
/// storage and nonces untouched.
pub struct Ledger {
    environment: Address,
    stake_manager: Address,
    nonces: HashMap<Address, u64>,
    storage: BTreeMap<(Address, u64), U256>,
    frozen: bool,
}

impl Ledger {
    pub fn new(environment: Address, stake_manager: Address) -> Self {
        Self {
            environment,
            stake_manager,
            nonces: HashMap::new(),
            storage: BTreeMap::new(),
            frozen: false,
        }
    }

    /// Value of storage `slot` of `account`.
    pub fn storage(&self, account: &Address, slot: u64) -> U256 {
        self.storage
            .get(&(*account, slot))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_nonce(&mut self, account: Address, nonce: u64) {
        self.nonces.insert(account, nonce);
    }

    /// Stops executed transactions from incrementing nonces.
    pub fn freeze_nonces(&mut self) {
        self.frozen = true;
    }

    fn revert(to: Address, reason: &str) -> Execution {
        Execution::Reverted {
            to,
            reason: reason.to_string(),
        }
    }

    fn initialize(&self, to: Address, event: &Event) -> Result<Effect, Execution> {
        if !self.storage(&to, INITIALIZED_SLOT).is_zero() {
            return Err(Self::revert(to, "already initialized"));
        }
        Ok(Effect::store(to, INITIALIZED_SLOT, U256::from(1), event))
    }

    /// Computes the effect of calling `to` with `data` without applying it.
    fn dispatch(&self, to: Address, data: &[u8]) -> Result<Effect, Execution> {
        let selector = data
            .get(..SELECTOR_LEN)
            .ok_or_else(|| Self::revert(to, "missing selector"))?;
        let invalid = |_| Self::revert(to, "invalid arguments");
        if to == self.environment && selector == environment::INITIALIZE.selector() {
            environment::INITIALIZE.decode_input(data).map_err(invalid)?;
            self.initialize(to, &environment::INITIALIZED)
        } else if to == self.stake_manager && selector == stake_manager::INITIALIZE.selector() {
            stake_manager::INITIALIZE.decode_input(data).map_err(invalid)?;
            self.initialize(to, &stake_manager::INITIALIZED)
        } else if to == self.stake_manager && selector == stake_manager::SLASH.selector() {
            stake_manager::SLASH.decode_input(data).map_err(invalid)?;
            Ok(Effect::store(
                to,
                SLASHED_SLOT,
                U256::from(SLASHED),
                &stake_manager::SLASHED,
            ))
        } else {
            Err(Self::revert(to, "unknown method"))
        }
    }
}

/// A storage write and the log announcing it, staged until the transaction succeeds.
struct Effect {
    slot: (Address, u64),
    value: U256,
    log: Log,
}

impl Effect {
    fn store(address: Address, slot: u64, value: U256, event: &Event) -> Self {
        Self {
            slot: (address, slot),
            value,
            log: Log {
                address,
                topics: vec![event.topic()],
                data: Default::default(),
            },
        }
    }
}

impl State for Ledger {
    fn nonce(&self, account: &Address) -> u64 {
        self.nonces.get(account).copied().unwrap_or_default()
    }

    fn execute(
        &mut self,
        tx: &Transaction,
        sender: Address,
        _header: &Header,
        _chain: &dyn ChainContext,
    ) -> Result<Outcome, Execution> {
        let expected = self.nonce(&sender);
        if tx.tx.nonce != expected {
            return Err(Execution::Rejected(format!(
                "nonce mismatch: expected={expected}, found={}",
                tx.tx.nonce
            )));
        }
        let intrinsic = tx.tx.data.iter().fold(TX_GAS, |gas, byte| {
            gas + if *byte == 0 {
                ZERO_BYTE_GAS
            } else {
                NON_ZERO_BYTE_GAS
            }
        });
        if tx.tx.gas < intrinsic {
            return Err(Execution::Rejected(format!(
                "intrinsic gas too low: have={}, want={intrinsic}",
                tx.tx.gas
            )));
        }
        let effect = self.dispatch(tx.tx.to, &tx.tx.data)?;
        let gas_used = intrinsic + STORE_GAS + LOG_GAS;
        if gas_used > tx.tx.gas {
            return Err(Self::revert(tx.tx.to, "out of gas"));
        }

        // Commit
        self.storage.insert(effect.slot, effect.value);
        if !self.frozen {
            self.nonces.insert(sender, expected + 1);
        }
        Ok(Outcome {
            gas_used,
            logs: vec![effect.log],
        })
    }
}

/// A [ChainContext] over a fixed set of headers.
#[derive(Clone, Debug, Default)]
pub struct Chain {
    headers: HashMap<u64, Header>,
}

impl Chain {
    pub fn insert(&mut self, header: Header) {
        self.headers.insert(header.number, header);
    }
}

impl ChainContext for Chain {
    fn header(&self, number: u64) -> Option<Header> {
        self.headers.get(&number).cloned()
    }
}

/// Installs a global subscriber that writes to the test output (once per process).
#[cfg(test)]
pub fn trace() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::UnsignedTransaction;
    use dpos_cryptography::{PrivateKey, Signer};

    const CHAIN_ID: u64 = 1;

    fn signed(key: &PrivateKey, nonce: u64, to: Address, data: Bytes) -> Transaction {
        let unsigned = UnsignedTransaction {
            nonce,
            gas_price: 0,
            gas: 1_000_000,
            to,
            value: U256::ZERO,
            data,
        };
        let signature = key.sign(&unsigned.signing_hash(CHAIN_ID)).unwrap();
        Transaction::new(unsigned, signature, CHAIN_ID)
    }

    #[test]
    fn test_calls() {
        let calls = Calls::default();
        calls.push(Bytes::from_static(b"first"));
        calls.fail(CallError::Unavailable(BlockRef::Pending));

        let mut caller = calls.clone();
        let request = CallRequest::new(Address::with_last_byte(1), Bytes::new());
        assert_eq!(
            caller.call(&request, BlockRef::Number(1), None),
            Ok(Bytes::from_static(b"first"))
        );
        assert_eq!(
            caller.call(&request, BlockRef::Pending, None),
            Err(CallError::Unavailable(BlockRef::Pending))
        );
        assert!(matches!(
            caller.call(&request, BlockRef::Pending, None),
            Err(CallError::Other(_))
        ));
        assert_eq!(calls.requests().len(), 3);
        assert_eq!(calls.requests()[0].1, BlockRef::Number(1));
    }

    #[test]
    fn test_ledger_rejects_nonce() {
        let key = PrivateKey::from_seed(0);
        let sender = key.address();
        let environment = Address::with_last_byte(1);
        let mut ledger = Ledger::new(environment, Address::with_last_byte(2));
        ledger.set_nonce(sender, 3);

        let data = environment::INITIALIZE
            .encode_call(&[dpos_abi::Value::Tuple(vec![dpos_abi::Value::from(U256::ZERO); 9])])
            .unwrap();
        let tx = signed(&key, 2, environment, data.clone());
        assert!(matches!(
            ledger.execute(&tx, sender, &Header::default(), &Chain::default()),
            Err(Execution::Rejected(_))
        ));
        assert_eq!(ledger.nonce(&sender), 3);

        let tx = signed(&key, 3, environment, data);
        let outcome = ledger
            .execute(&tx, sender, &Header::default(), &Chain::default())
            .unwrap();
        assert_eq!(outcome.logs.len(), 1);
        assert_eq!(ledger.nonce(&sender), 4);
        assert_eq!(ledger.storage(&environment, INITIALIZED_SLOT), U256::from(1));
    }

    #[test]
    fn test_ledger_reverts_unknown_method() {
        let key = PrivateKey::from_seed(0);
        let sender = key.address();
        let stake_manager = Address::with_last_byte(2);
        let mut ledger = Ledger::new(Address::with_last_byte(1), stake_manager);

        let tx = signed(&key, 0, stake_manager, Bytes::from_static(&[1, 2, 3, 4]));
        assert!(matches!(
            ledger.execute(&tx, sender, &Header::default(), &Chain::default()),
            Err(Execution::Reverted { .. })
        ));
    }

    #[test]
    fn test_ledger_out_of_gas_is_atomic() {
        let key = PrivateKey::from_seed(0);
        let sender = key.address();
        let stake_manager = Address::with_last_byte(2);
        let mut ledger = Ledger::new(Address::with_last_byte(1), stake_manager);

        let data = stake_manager::SLASH
            .encode_call(&[
                dpos_abi::Value::from(Address::with_last_byte(7)),
                dpos_abi::Value::from(U256::from(1)),
            ])
            .unwrap();
        let unsigned = UnsignedTransaction {
            nonce: 0,
            gas_price: 0,
            gas: 30_000,
            to: stake_manager,
            value: U256::ZERO,
            data: data.clone(),
        };
        let signature = key.sign(&unsigned.signing_hash(CHAIN_ID)).unwrap();
        let tx = Transaction::new(unsigned, signature, CHAIN_ID);
        assert_eq!(
            ledger.execute(&tx, sender, &Header::default(), &Chain::default()),
            Err(Execution::Reverted {
                to: stake_manager,
                reason: "out of gas".to_string(),
            })
        );
        assert_eq!(ledger.nonce(&sender), 0);
        assert_eq!(ledger.storage(&stake_manager, SLASHED_SLOT), U256::ZERO);

        // The same call with enough gas applies both
        let tx = signed(&key, 0, stake_manager, data);
        ledger
            .execute(&tx, sender, &Header::default(), &Chain::default())
            .unwrap();
        assert_eq!(ledger.nonce(&sender), 1);
        assert_eq!(
            ledger.storage(&stake_manager, SLASHED_SLOT),
            U256::from(SLASHED)
        );
    }

    #[test]
    fn test_ledger_revert_is_atomic() {
        let key = PrivateKey::from_seed(0);
        let sender = key.address();
        let environment = Address::with_last_byte(1);
        let mut ledger = Ledger::new(environment, Address::with_last_byte(2));

        let data = environment::INITIALIZE
            .encode_call(&[dpos_abi::Value::Tuple(vec![dpos_abi::Value::from(U256::ZERO); 9])])
            .unwrap();
        ledger
            .execute(
                &signed(&key, 0, environment, data.clone()),
                sender,
                &Header::default(),
                &Chain::default(),
            )
            .unwrap();
        assert!(matches!(
            ledger.execute(
                &signed(&key, 1, environment, data),
                sender,
                &Header::default(),
                &Chain::default()
            ),
            Err(Execution::Reverted { .. })
        ));
        assert_eq!(ledger.nonce(&sender), 1);
    }

    #[test]
    fn test_chain() {
        let mut chain = Chain::default();
        let header = Header {
            number: 7,
            ..Default::default()
        };
        chain.insert(header.clone());
        assert_eq!(chain.header(7), Some(header));
        assert_eq!(chain.header(8), None);
    }
}
