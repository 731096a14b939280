//! Secp256k1 signatures with public-key recovery.

mod scheme;

pub use scheme::{recover, PrivateKey, Signature};
