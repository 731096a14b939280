//! Legacy transactions with [EIP-155](https://eips.ethereum.org/EIPS/eip-155) replay protection.
//!
//! System transactions use the same wire format as user transactions so that they can be
//! hashed, gossiped and stored alongside them.

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_rlp::{length_of_length, Encodable, Header};
use bytes::Bytes;
use dpos_cryptography::{recover, Error, Signature};

/// Offset added to `2 * chain_id` in the `v` value of a replay-protected signature.
const EIP155_OFFSET: u64 = 35;

/// Largest chain id whose `v` values fit in a `u64`.
pub const MAX_CHAIN_ID: u64 = (u64::MAX - EIP155_OFFSET - 1) / 2;

/// `v` of a signature with even y-parity on `chain_id`.
fn base_v(chain_id: u64) -> Option<u64> {
    chain_id.checked_mul(2)?.checked_add(EIP155_OFFSET)
}

/// A transaction that has not been signed yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas: u64,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl UnsignedTransaction {
    /// Digest signed by the sender: the hash of
    /// `rlp([nonce, gas_price, gas, to, value, data, chain_id, 0, 0])`.
    pub fn signing_hash(&self, chain_id: u64) -> B256 {
        let data: &[u8] = &self.data;
        keccak256(list(&[
            &self.nonce,
            &self.gas_price,
            &self.gas,
            &self.to,
            &self.value,
            &data,
            &chain_id,
            &0u8,
            &0u8,
        ]))
    }
}

/// A signed transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub tx: UnsignedTransaction,
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

impl Transaction {
    /// Attaches a signature over [UnsignedTransaction::signing_hash].
    ///
    /// # Panics
    ///
    /// Panics if `chain_id` exceeds [MAX_CHAIN_ID].
    pub fn new(tx: UnsignedTransaction, signature: Signature, chain_id: u64) -> Self {
        assert!(chain_id <= MAX_CHAIN_ID, "chain id out of range");
        let v = chain_id * 2 + EIP155_OFFSET + u64::from(signature.odd_y_parity());
        Self {
            tx,
            v,
            r: signature.r(),
            s: signature.s(),
        }
    }

    /// Canonical encoding: `rlp([nonce, gas_price, gas, to, value, data, v, r, s])`.
    pub fn encode(&self) -> Vec<u8> {
        let data: &[u8] = &self.tx.data;
        list(&[
            &self.tx.nonce,
            &self.tx.gas_price,
            &self.tx.gas,
            &self.tx.to,
            &self.tx.value,
            &data,
            &self.v,
            &self.r,
            &self.s,
        ])
    }

    pub fn hash(&self) -> B256 {
        keccak256(self.encode())
    }

    /// Recovers the account that signed this transaction for `chain_id`.
    pub fn sender(&self, chain_id: u64) -> Result<Address, Error> {
        let parity = base_v(chain_id)
            .and_then(|base| self.v.checked_sub(base))
            .ok_or(Error::InvalidSignature)?;
        let odd_y_parity = match parity {
            0 => false,
            1 => true,
            _ => return Err(Error::InvalidSignature),
        };
        let signature = Signature::new(self.r, self.s, odd_y_parity);
        recover(&self.tx.signing_hash(chain_id), &signature)
    }
}

fn list(fields: &[&dyn Encodable]) -> Vec<u8> {
    let payload_length = fields.iter().map(|field| field.length()).sum();
    let mut out = Vec::with_capacity(length_of_length(payload_length) + payload_length);
    Header {
        list: true,
        payload_length,
    }
    .encode(&mut out);
    for field in fields {
        field.encode(&mut out);
    }
    out
}
