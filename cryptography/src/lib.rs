//! Sign system transactions with the operating key and recover their senders.
//!
//! # Status
//!
//! `dpos-cryptography` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

use alloy_primitives::{Address, B256};
use thiserror::Error;

pub mod secp256k1;
pub use secp256k1::{recover, PrivateKey, Signature};

/// Errors that can occur when signing or recovering.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("signing failed")]
    SigningFailed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("recovery failed")]
    RecoveryFailed,
}

/// Produces recoverable [Signature]s over digests on behalf of a single account.
///
/// The operating key is shared by every block-processing attempt of a node. Implementations
/// are not required to serialize access themselves: callers that allocate nonces for the
/// key are expected to hold an exclusive lock across allocation and signing.
pub trait Signer: Send + Sync + 'static {
    /// Returns the account address controlled by this [Signer].
    fn address(&self) -> Address;

    /// Sign a 32-byte digest.
    ///
    /// Unlike most signing interfaces, the payload must already be hashed (transactions are
    /// signed over the hash of their encoding).
    fn sign(&self, digest: &B256) -> Result<Signature, Error>;
}
