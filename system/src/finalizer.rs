//! Turn an [UnsignedTransaction] into the [Transaction] included in a block.
//!
//! A proposer signs each system transaction itself ([Sign]). Every other node rebuilds the
//! same unsigned transaction and checks it against the next system transaction carried by the
//! proposed block ([Match]). Both paths share everything but this step.

use crate::{
    transaction::{Transaction, UnsignedTransaction},
    Execution,
};
use alloy_primitives::Address;
use dpos_cryptography::Signer;
use std::collections::VecDeque;

/// Completes a system transaction on behalf of `sender`.
pub trait Finalizer {
    fn finalize(
        &mut self,
        sender: Address,
        unsigned: UnsignedTransaction,
    ) -> Result<Transaction, Execution>;
}

/// Signs system transactions with the operating key.
pub struct Sign<'a, S: Signer> {
    signer: &'a S,
    chain_id: u64,
}

impl<'a, S: Signer> Sign<'a, S> {
    pub fn new(signer: &'a S, chain_id: u64) -> Self {
        Self { signer, chain_id }
    }
}

impl<S: Signer> Finalizer for Sign<'_, S> {
    fn finalize(
        &mut self,
        sender: Address,
        unsigned: UnsignedTransaction,
    ) -> Result<Transaction, Execution> {
        let found = self.signer.address();
        if found != sender {
            return Err(Execution::UnauthorizedSigner {
                expected: sender,
                found,
            });
        }
        let signature = self
            .signer
            .sign(&unsigned.signing_hash(self.chain_id))
            .map_err(Execution::Signing)?;
        Ok(Transaction::new(unsigned, signature, self.chain_id))
    }
}

/// Consumes the system transactions of a received block, in order.
pub struct Match<'a> {
    received: &'a mut VecDeque<Transaction>,
    chain_id: u64,
    method: &'static str,
}

impl<'a> Match<'a> {
    pub fn new(received: &'a mut VecDeque<Transaction>, chain_id: u64) -> Self {
        Self {
            received,
            chain_id,
            method: "system transaction",
        }
    }

    /// Names the method being matched in errors.
    pub(crate) fn expecting(&mut self, method: &'static str) -> &mut Self {
        self.method = method;
        self
    }
}

impl Finalizer for Match<'_> {
    fn finalize(
        &mut self,
        sender: Address,
        unsigned: UnsignedTransaction,
    ) -> Result<Transaction, Execution> {
        let tx = self
            .received
            .pop_front()
            .ok_or(Execution::MissingTransaction(self.method))?;
        let expected = unsigned.signing_hash(self.chain_id);
        let found = tx.tx.signing_hash(self.chain_id);
        if expected != found {
            return Err(Execution::UnexpectedTransaction { expected, found });
        }
        let signer = tx
            .sender(self.chain_id)
            .map_err(Execution::InvalidSignature)?;
        if signer != sender {
            return Err(Execution::InvalidSender {
                expected: sender,
                found: signer,
            });
        }
        Ok(tx)
    }
}
