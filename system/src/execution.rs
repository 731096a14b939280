//! Interface to the deterministic state machine that applies system transactions.

use crate::{transaction::Transaction, Execution};
use alloy_primitives::{keccak256, Address, Bloom, BloomInput, Bytes, B256};
use alloy_rlp::RlpEncodable;

/// A log emitted during execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// Result of applying a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    pub gas_used: u64,
    pub logs: Vec<Log>,
}

/// Fields of the block being assembled (or validated) that execution depends on.
#[derive(Clone, Debug, Default, PartialEq, Eq, RlpEncodable)]
pub struct Header {
    pub parent_hash: B256,
    pub coinbase: Address,
    pub number: u64,
    pub gas_limit: u64,
    pub timestamp: u64,
    pub extra: Bytes,
}

impl Header {
    pub fn hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }
}

/// Access to previously processed headers (e.g. for `BLOCKHASH`).
pub trait ChainContext {
    fn header(&self, number: u64) -> Option<Header>;
}

/// Mutable account state of the block being processed.
///
/// Implementations must be deterministic: every node applying the same transaction to the
/// same state must observe the same [Outcome].
pub trait State {
    /// Next nonce of `account`.
    fn nonce(&self, account: &Address) -> u64;

    /// Applies `tx`, sent by `sender`, incrementing the sender's nonce.
    ///
    /// A reverted call must be reported as an error.
    fn execute(
        &mut self,
        tx: &Transaction,
        sender: Address,
        header: &Header,
        chain: &dyn ChainContext,
    ) -> Result<Outcome, Execution>;
}

/// Receipt of an executed system transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub status: bool,
    pub cumulative_gas_used: u64,
    pub transaction_hash: B256,
    pub transaction_index: usize,
    pub gas_used: u64,
    pub logs: Vec<Log>,
    pub bloom: Bloom,
    pub block_hash: B256,
    pub block_number: u64,
}

/// Computes the bloom filter over every log's address and topics.
pub fn bloom(logs: &[Log]) -> Bloom {
    let mut bloom = Bloom::ZERO;
    for log in logs {
        bloom.accrue(BloomInput::Raw(log.address.as_slice()));
        for topic in &log.topics {
            bloom.accrue(BloomInput::Raw(topic.as_slice()));
        }
    }
    bloom
}

/// Transactions, receipts and gas of the block being assembled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assembly {
    pub transactions: Vec<Transaction>,
    pub receipts: Vec<Receipt>,
    pub gas_used: u64,
}

impl Assembly {
    /// Appends an executed transaction and its receipt.
    pub fn push(
        &mut self,
        tx: Transaction,
        outcome: Outcome,
        header: &Header,
    ) -> Result<&Receipt, Execution> {
        self.gas_used = self
            .gas_used
            .checked_add(outcome.gas_used)
            .ok_or(Execution::GasOverflow)?;
        let receipt = Receipt {
            status: true,
            cumulative_gas_used: self.gas_used,
            transaction_hash: tx.hash(),
            transaction_index: self.transactions.len(),
            gas_used: outcome.gas_used,
            bloom: bloom(&outcome.logs),
            logs: outcome.logs,
            block_hash: header.hash(),
            block_number: header.number,
        };
        self.transactions.push(tx);
        self.receipts.push(receipt);
        Ok(&self.receipts[self.receipts.len() - 1])
    }
}
