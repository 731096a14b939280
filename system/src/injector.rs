//! Execute system transactions during block assembly and validation.
//!
//! Each system transaction is built the same way on every node. A proposer (`mining`) signs
//! it with the operating key; every other node takes the next system transaction out of the
//! received block and checks that it is the one it would have built. The transaction is then
//! executed against the block's state and its receipt appended to the block.

use crate::{
    config::Config,
    contracts::{environment, stake_manager},
    execution::{Assembly, ChainContext, Header, State},
    finalizer::{Finalizer, Match, Sign},
    metrics::{self, MethodLabel},
    transaction::{Transaction, UnsignedTransaction},
    Error, Execution,
};
use alloy_primitives::{Address, U256};
use dpos_abi::{Event, Method, Value};
use dpos_cryptography::Signer;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};
use tracing::{debug, info, warn};

/// A system contract call to be wrapped in a transaction.
struct Call {
    to: Address,
    method: &'static Method,
    args: Vec<Value>,
    event: &'static Event,
}

/// Builds, finalizes and executes system transactions.
pub struct Injector<S: Signer> {
    cfg: Config,
    signer: Arc<Mutex<S>>,
    metrics: metrics::Injector,
}

impl<S: Signer> Injector<S> {
    pub fn new(cfg: Config, signer: Arc<Mutex<S>>) -> Self {
        cfg.assert();
        let metrics = metrics::Injector::init(&cfg.registry);
        Self {
            cfg,
            signer,
            metrics,
        }
    }

    /// Initializes the environment and stake manager contracts, in that order.
    ///
    /// Must run exactly once, at the bootstrap block. On success two transactions and two
    /// receipts are appended to `assembly` and the coinbase nonce has advanced by two.
    #[allow(clippy::too_many_arguments)]
    pub fn initialize_system_contracts(
        &self,
        state: &mut dyn State,
        header: &Header,
        chain: &dyn ChainContext,
        assembly: &mut Assembly,
        received: &mut VecDeque<Transaction>,
        mining: bool,
    ) -> Result<(), Error> {
        let calls = [
            Call {
                to: self.cfg.environment,
                method: &environment::INITIALIZE,
                args: vec![Value::from(&self.cfg.initial_environment)],
                event: &environment::INITIALIZED,
            },
            Call {
                to: self.cfg.stake_manager,
                method: &stake_manager::INITIALIZE,
                args: vec![
                    Value::from(self.cfg.environment),
                    Value::from(self.cfg.allowlist),
                ],
                event: &stake_manager::INITIALIZED,
            },
        ];
        for call in calls {
            self.apply(call, state, header, chain, assembly, received, mining)?;
        }
        info!(number = header.number, mining, "initialized system contracts");
        Ok(())
    }

    /// Slashes `validator` for the blocks it was scheduled to produce in `schedule`
    /// (a map from block number to expected producer).
    #[allow(clippy::too_many_arguments)]
    pub fn slash<'a>(
        &self,
        validator: Address,
        schedule: impl IntoIterator<Item = (&'a u64, &'a Address)>,
        state: &mut dyn State,
        header: &Header,
        chain: &dyn ChainContext,
        assembly: &mut Assembly,
        received: &mut VecDeque<Transaction>,
        mining: bool,
    ) -> Result<(), Error> {
        let blocks = schedule
            .into_iter()
            .filter(|(_, producer)| **producer == validator)
            .count();
        let call = Call {
            to: self.cfg.stake_manager,
            method: &stake_manager::SLASH,
            args: vec![Value::from(validator), Value::from(U256::from(blocks))],
            event: &stake_manager::SLASHED,
        };
        self.apply(call, state, header, chain, assembly, received, mining)?;
        info!(number = header.number, %validator, blocks, mining, "slashed validator");
        Ok(())
    }

    /// Returns true if `tx` is a system transaction of the block with `header`: a call to a
    /// system contract, free of charge, sent by the block's producer.
    pub fn is_system_transaction(&self, tx: &Transaction, header: &Header) -> bool {
        if tx.tx.to != self.cfg.environment && tx.tx.to != self.cfg.stake_manager {
            return false;
        }
        if tx.tx.gas_price != 0 || tx.tx.value != U256::ZERO {
            return false;
        }
        tx.sender(self.cfg.chain_id)
            .is_ok_and(|sender| sender == header.coinbase)
    }

    /// Separates the system transactions of a received block from its other transactions,
    /// preserving the order of each.
    pub fn split_transactions(
        &self,
        txs: Vec<Transaction>,
        header: &Header,
    ) -> (Vec<Transaction>, VecDeque<Transaction>) {
        let mut regular = Vec::with_capacity(txs.len());
        let mut system = VecDeque::new();
        for tx in txs {
            if self.is_system_transaction(&tx, header) {
                system.push_back(tx);
            } else {
                regular.push(tx);
            }
        }
        (regular, system)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply(
        &self,
        call: Call,
        state: &mut dyn State,
        header: &Header,
        chain: &dyn ChainContext,
        assembly: &mut Assembly,
        received: &mut VecDeque<Transaction>,
        mining: bool,
    ) -> Result<(), Error> {
        if mining {
            // Hold the key until the nonce it signed for has been consumed
            let signer = self.signer.lock().unwrap_or_else(PoisonError::into_inner);
            let mut finalizer = Sign::new(&*signer, self.cfg.chain_id);
            self.execute(&mut finalizer, call, state, header, chain, assembly)
        } else {
            let mut finalizer = Match::new(received, self.cfg.chain_id);
            finalizer.expecting(call.method.name());
            self.execute(&mut finalizer, call, state, header, chain, assembly)
        }
    }

    fn execute<F: Finalizer>(
        &self,
        finalizer: &mut F,
        call: Call,
        state: &mut dyn State,
        header: &Header,
        chain: &dyn ChainContext,
        assembly: &mut Assembly,
    ) -> Result<(), Error> {
        let sender = header.coinbase;
        let data = call.method.encode_call(&call.args).map_err(Error::Encoding)?;
        let nonce = state.nonce(&sender);
        let unsigned = UnsignedTransaction {
            nonce,
            gas_price: 0,
            gas: self.cfg.gas_limit,
            to: call.to,
            value: U256::ZERO,
            data,
        };
        let tx = finalizer.finalize(sender, unsigned)?;
        let outcome = state.execute(&tx, sender, header, chain).inspect_err(|err| {
            warn!(?err, method = call.method.name(), number = header.number, "system transaction failed");
        })?;

        let after = state.nonce(&sender);
        if nonce.checked_add(1) != Some(after) {
            return Err(Execution::NonceNotAdvanced {
                account: sender,
                before: nonce,
                after,
            }
            .into());
        }
        if outcome.gas_used == 0 {
            return Err(Execution::NoGasUsed.into());
        }
        let [log] = outcome.logs.as_slice() else {
            return Err(Execution::LogCount(outcome.logs.len()).into());
        };
        let topic = call.event.topic();
        if log.address != call.to || log.topics.first() != Some(&topic) {
            return Err(Execution::MissingEvent(call.event.name()).into());
        }

        let gas_used = outcome.gas_used;
        let receipt = assembly.push(tx, outcome, header)?;
        self.metrics
            .system_transactions
            .get_or_create(&MethodLabel::from(call.method))
            .inc();
        self.metrics.system_gas.inc_by(gas_used);
        debug!(
            method = call.method.name(),
            to = %call.to,
            nonce,
            gas_used,
            hash = %receipt.transaction_hash,
            "executed system transaction"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        execution::{Log, Outcome},
        mocks::{self, Chain, Ledger},
        types::EnvironmentValue,
    };
    use alloy_primitives::{Bloom, Bytes, B256};
    use dpos_cryptography::PrivateKey;
    use prometheus_client::{encoding::text::encode as encode_metrics, registry::Registry};
    use std::collections::BTreeMap;

    const CHAIN_ID: u64 = 248;

    fn injector(key: PrivateKey) -> Injector<PrivateKey> {
        let cfg = Config::new(
            CHAIN_ID,
            EnvironmentValue::genesis(15, 5_760),
            Arc::new(Mutex::new(Registry::default())),
        );
        Injector::new(cfg, Arc::new(Mutex::new(key)))
    }

    fn header(coinbase: Address) -> Header {
        Header {
            number: 50,
            coinbase,
            gas_limit: 30_000_000,
            ..Default::default()
        }
    }

    fn ledger(injector: &Injector<PrivateKey>) -> Ledger {
        Ledger::new(injector.cfg.environment, injector.cfg.stake_manager)
    }

    #[test]
    fn test_initialize_system_contracts() {
        mocks::trace();
        let key = PrivateKey::from_seed(0);
        let signer = key.address();
        let injector = injector(key);
        let mut state = ledger(&injector);
        let header = header(signer);
        let mut assembly = Assembly::default();

        injector
            .initialize_system_contracts(
                &mut state,
                &header,
                &Chain::default(),
                &mut assembly,
                &mut VecDeque::new(),
                true,
            )
            .unwrap();

        assert_eq!(state.storage(&injector.cfg.environment, 0), U256::from(1));
        assert_eq!(state.storage(&injector.cfg.stake_manager, 0), U256::from(1));
        assert_eq!(state.nonce(&signer), 2);

        assert_eq!(assembly.transactions.len(), 2);
        assert_eq!(assembly.receipts.len(), 2);
        assert_ne!(assembly.gas_used, 0);
        let mut cumulative = 0;
        for (i, (tx, receipt)) in assembly
            .transactions
            .iter()
            .zip(&assembly.receipts)
            .enumerate()
        {
            assert_eq!(tx.tx.nonce, i as u64);
            assert_eq!(tx.sender(CHAIN_ID).unwrap(), signer);
            assert!(receipt.status);
            assert_eq!(receipt.transaction_hash, tx.hash());
            assert_eq!(receipt.transaction_index, i);
            assert_ne!(receipt.gas_used, 0);
            assert_eq!(receipt.logs.len(), 1);
            assert_ne!(receipt.bloom, Bloom::ZERO);
            assert_eq!(receipt.block_number, 50);
            assert_eq!(receipt.block_hash, header.hash());
            cumulative += receipt.gas_used;
            assert_eq!(receipt.cumulative_gas_used, cumulative);
        }
        assert_eq!(assembly.gas_used, cumulative);

        // Environment first, then stake manager
        assert_eq!(assembly.transactions[0].tx.to, injector.cfg.environment);
        assert_eq!(assembly.transactions[1].tx.to, injector.cfg.stake_manager);
        assert_eq!(
            stake_manager::INITIALIZE
                .decode_input(&assembly.transactions[1].tx.data)
                .unwrap(),
            vec![
                Value::from(injector.cfg.environment),
                Value::from(injector.cfg.allowlist)
            ]
        );

        // Metrics
        let mut buffer = String::new();
        encode_metrics(&mut buffer, &injector.cfg.registry.lock().unwrap()).unwrap();
        assert!(buffer.contains("system_transactions_total{method=\"initialize\"} 2"));
        assert!(buffer.contains(&format!("system_gas_total {}", assembly.gas_used)));
    }

    #[test]
    fn test_initialize_twice() {
        let key = PrivateKey::from_seed(0);
        let signer = key.address();
        let injector = injector(key);
        let mut state = ledger(&injector);
        let header = header(signer);
        let chain = Chain::default();
        let mut assembly = Assembly::default();
        injector
            .initialize_system_contracts(
                &mut state,
                &header,
                &chain,
                &mut assembly,
                &mut VecDeque::new(),
                true,
            )
            .unwrap();

        let mut again = Assembly::default();
        let result = injector.initialize_system_contracts(
            &mut state,
            &header,
            &chain,
            &mut again,
            &mut VecDeque::new(),
            true,
        );
        assert!(matches!(
            result,
            Err(Error::Execution(Execution::Reverted { .. }))
        ));
        assert!(again.receipts.is_empty());
    }

    #[test]
    fn test_initialize_validating() {
        let key = PrivateKey::from_seed(0);
        let producer = key.address();

        // The producer assembles the block
        let proposer = injector(key);
        let mut proposed_state = ledger(&proposer);
        let header = header(producer);
        let chain = Chain::default();
        let mut proposed = Assembly::default();
        proposer
            .initialize_system_contracts(
                &mut proposed_state,
                &header,
                &chain,
                &mut proposed,
                &mut VecDeque::new(),
                true,
            )
            .unwrap();

        // Another node, with a different key, replays it
        let validator = injector(PrivateKey::from_seed(1));
        let (regular, mut received) =
            validator.split_transactions(proposed.transactions.clone(), &header);
        assert!(regular.is_empty());
        assert_eq!(received.len(), 2);
        let mut state = ledger(&validator);
        let mut validated = Assembly::default();
        validator
            .initialize_system_contracts(
                &mut state,
                &header,
                &chain,
                &mut validated,
                &mut received,
                false,
            )
            .unwrap();

        assert!(received.is_empty());
        assert_eq!(validated, proposed);
        assert_eq!(state.nonce(&producer), 2);
    }

    #[test]
    fn test_initialize_validating_missing() {
        let key = PrivateKey::from_seed(0);
        let producer = key.address();
        let proposer = injector(key);
        let header = header(producer);
        let chain = Chain::default();
        let mut proposed = Assembly::default();
        proposer
            .initialize_system_contracts(
                &mut ledger(&proposer),
                &header,
                &chain,
                &mut proposed,
                &mut VecDeque::new(),
                true,
            )
            .unwrap();

        // Drop the stake manager initialization
        let mut received: VecDeque<_> = proposed.transactions.into_iter().take(1).collect();
        let validator = injector(PrivateKey::from_seed(1));
        let mut state = ledger(&validator);
        let result = validator.initialize_system_contracts(
            &mut state,
            &header,
            &chain,
            &mut Assembly::default(),
            &mut received,
            false,
        );
        assert_eq!(
            result,
            Err(Error::Execution(Execution::MissingTransaction("initialize")))
        );
    }

    #[test]
    fn test_initialize_validating_forged() {
        let key = PrivateKey::from_seed(0);
        let producer = key.address();
        let header = header(producer);
        let validator = injector(PrivateKey::from_seed(1));
        let state = ledger(&validator);

        // A transaction with the expected contents signed by someone other than the producer
        let forger = PrivateKey::from_seed(2);
        let data = environment::INITIALIZE
            .encode_call(&[Value::from(&validator.cfg.initial_environment)])
            .unwrap();
        let unsigned = UnsignedTransaction {
            nonce: state.nonce(&producer),
            gas_price: 0,
            gas: validator.cfg.gas_limit,
            to: validator.cfg.environment,
            value: U256::ZERO,
            data,
        };
        let signature = forger.sign(&unsigned.signing_hash(CHAIN_ID)).unwrap();
        let forged = Transaction::new(unsigned, signature, CHAIN_ID);
        assert!(!validator.is_system_transaction(&forged, &header));

        let mut state = state;
        let result = validator.initialize_system_contracts(
            &mut state,
            &header,
            &Chain::default(),
            &mut Assembly::default(),
            &mut VecDeque::from([forged]),
            false,
        );
        assert_eq!(
            result,
            Err(Error::Execution(Execution::InvalidSender {
                expected: producer,
                found: forger.address(),
            }))
        );
        assert_eq!(state.nonce(&producer), 0);
    }

    #[test]
    fn test_initialize_unauthorized() {
        let key = PrivateKey::from_seed(0);
        let injector = injector(key.clone());
        let mut state = ledger(&injector);
        let coinbase = Address::with_last_byte(9);

        let result = injector.initialize_system_contracts(
            &mut state,
            &header(coinbase),
            &Chain::default(),
            &mut Assembly::default(),
            &mut VecDeque::new(),
            true,
        );
        assert_eq!(
            result,
            Err(Error::Execution(Execution::UnauthorizedSigner {
                expected: coinbase,
                found: key.address(),
            }))
        );
        assert_eq!(state.nonce(&coinbase), 0);
    }

    #[test]
    fn test_slash() {
        mocks::trace();
        let key = PrivateKey::from_seed(0);
        let signer = key.address();
        let injector = injector(key);
        let mut state = ledger(&injector);
        let header = header(signer);
        let mut assembly = Assembly::default();

        injector
            .slash(
                signer,
                &BTreeMap::<u64, Address>::new(),
                &mut state,
                &header,
                &Chain::default(),
                &mut assembly,
                &mut VecDeque::new(),
                true,
            )
            .unwrap();

        assert_eq!(state.storage(&injector.cfg.stake_manager, 1), U256::from(2));
        assert_eq!(state.nonce(&signer), 1);
        assert_eq!(assembly.receipts.len(), 1);
        assert_ne!(assembly.gas_used, 0);

        let receipt = &assembly.receipts[0];
        assert_ne!(receipt.transaction_hash, B256::ZERO);
        assert_ne!(receipt.gas_used, 0);
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(receipt.logs[0].topics, vec![stake_manager::SLASHED.topic()]);
        assert_ne!(receipt.bloom, Bloom::ZERO);
        assert_eq!(receipt.block_number, 50);
    }

    #[test]
    fn test_slash_counts_missed_blocks() {
        let key = PrivateKey::from_seed(0);
        let signer = key.address();
        let injector = injector(key);
        let mut state = ledger(&injector);
        let header = header(signer);
        let mut assembly = Assembly::default();

        let offender = Address::with_last_byte(7);
        let schedule = BTreeMap::from([
            (45u64, offender),
            (46, signer),
            (47, offender),
            (48, Address::with_last_byte(8)),
            (49, offender),
        ]);
        injector
            .slash(
                offender,
                &schedule,
                &mut state,
                &header,
                &Chain::default(),
                &mut assembly,
                &mut VecDeque::new(),
                true,
            )
            .unwrap();

        assert_eq!(
            stake_manager::SLASH
                .decode_input(&assembly.transactions[0].tx.data)
                .unwrap(),
            vec![Value::from(offender), Value::from(U256::from(3))]
        );
    }

    #[test]
    fn test_nonce_not_advanced() {
        let key = PrivateKey::from_seed(0);
        let signer = key.address();
        let injector = injector(key);
        let mut state = ledger(&injector);
        state.freeze_nonces();

        let result = injector.slash(
            signer,
            &BTreeMap::<u64, Address>::new(),
            &mut state,
            &header(signer),
            &Chain::default(),
            &mut Assembly::default(),
            &mut VecDeque::new(),
            true,
        );
        assert_eq!(
            result,
            Err(Error::Execution(Execution::NonceNotAdvanced {
                account: signer,
                before: 0,
                after: 0,
            }))
        );
    }

    #[test]
    fn test_missing_event() {
        struct Silent(Ledger);

        impl State for Silent {
            fn nonce(&self, account: &Address) -> u64 {
                self.0.nonce(account)
            }

            fn execute(
                &mut self,
                tx: &Transaction,
                sender: Address,
                header: &Header,
                chain: &dyn ChainContext,
            ) -> Result<Outcome, Execution> {
                let mut outcome = self.0.execute(tx, sender, header, chain)?;
                outcome.logs = vec![Log {
                    address: tx.tx.to,
                    topics: vec![],
                    data: Bytes::new(),
                }];
                Ok(outcome)
            }
        }

        let key = PrivateKey::from_seed(0);
        let signer = key.address();
        let injector = injector(key);
        let mut state = Silent(ledger(&injector));
        let result = injector.slash(
            signer,
            &BTreeMap::<u64, Address>::new(),
            &mut state,
            &header(signer),
            &Chain::default(),
            &mut Assembly::default(),
            &mut VecDeque::new(),
            true,
        );
        assert_eq!(
            result,
            Err(Error::Execution(Execution::MissingEvent("Slashed")))
        );
    }

    /// A [State] that rewrites every [Outcome] produced by a [Ledger].
    struct Rewrite(Ledger, fn(&mut Outcome));

    impl State for Rewrite {
        fn nonce(&self, account: &Address) -> u64 {
            self.0.nonce(account)
        }

        fn execute(
            &mut self,
            tx: &Transaction,
            sender: Address,
            header: &Header,
            chain: &dyn ChainContext,
        ) -> Result<Outcome, Execution> {
            let mut outcome = self.0.execute(tx, sender, header, chain)?;
            (self.1)(&mut outcome);
            Ok(outcome)
        }
    }

    fn slash_with(rewrite: fn(&mut Outcome)) -> (Result<(), Error>, Assembly) {
        let key = PrivateKey::from_seed(0);
        let signer = key.address();
        let injector = injector(key);
        let mut state = Rewrite(ledger(&injector), rewrite);
        let mut assembly = Assembly::default();
        let result = injector.slash(
            signer,
            &BTreeMap::<u64, Address>::new(),
            &mut state,
            &header(signer),
            &Chain::default(),
            &mut assembly,
            &mut VecDeque::new(),
            true,
        );
        (result, assembly)
    }

    #[test]
    fn test_no_gas_used() {
        let (result, assembly) = slash_with(|outcome| outcome.gas_used = 0);
        assert_eq!(result, Err(Error::Execution(Execution::NoGasUsed)));
        assert!(assembly.receipts.is_empty());
        assert_eq!(assembly.gas_used, 0);
    }

    #[test]
    fn test_log_count() {
        let (result, assembly) = slash_with(|outcome| {
            let log = outcome.logs[0].clone();
            outcome.logs = vec![log.clone(), log.clone(), log];
        });
        assert_eq!(result, Err(Error::Execution(Execution::LogCount(3))));
        assert!(assembly.receipts.is_empty());

        let (result, assembly) = slash_with(|outcome| outcome.logs.clear());
        assert_eq!(result, Err(Error::Execution(Execution::LogCount(0))));
        assert!(assembly.transactions.is_empty());
    }

    #[test]
    fn test_is_system_transaction() {
        let key = PrivateKey::from_seed(0);
        let producer = key.address();
        let injector = injector(key.clone());
        let header = header(producer);

        let sign = |unsigned: UnsignedTransaction| {
            let signature = key.sign(&unsigned.signing_hash(CHAIN_ID)).unwrap();
            Transaction::new(unsigned, signature, CHAIN_ID)
        };
        let system = UnsignedTransaction {
            nonce: 0,
            gas_price: 0,
            gas: 100_000,
            to: injector.cfg.stake_manager,
            value: U256::ZERO,
            data: bytes::Bytes::new(),
        };
        assert!(injector.is_system_transaction(&sign(system.clone()), &header));

        let priced = UnsignedTransaction {
            gas_price: 1,
            ..system.clone()
        };
        assert!(!injector.is_system_transaction(&sign(priced), &header));

        let elsewhere = UnsignedTransaction {
            to: Address::with_last_byte(1),
            ..system.clone()
        };
        assert!(!injector.is_system_transaction(&sign(elsewhere), &header));

        let other = header_with_coinbase(&header, Address::with_last_byte(1));
        assert!(!injector.is_system_transaction(&sign(system), &other));
    }

    fn header_with_coinbase(header: &Header, coinbase: Address) -> Header {
        Header {
            coinbase,
            ..header.clone()
        }
    }
}
