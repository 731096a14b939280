//! Secp256k1 implementation of the [Signer] trait.
//!
//! This implementation generates deterministic signatures as specified in
//! [RFC 6979](https://datatracker.ietf.org/doc/html/rfc6979), enforces that signatures are
//! normalized to low `s` ([EIP-2](https://eips.ethereum.org/EIPS/eip-2)), and records the parity
//! of the ephemeral point's `y` coordinate so the signer can be recovered from the signature
//! alone. Account addresses are the last 20 bytes of the Keccak-256 hash of the uncompressed
//! public key (without its SEC 1 tag).
//!
//! # Example
//! ```rust
//! use alloy_primitives::keccak256;
//! use dpos_cryptography::{recover, PrivateKey, Signer};
//!
//! // Derive an (insecure) key for testing
//! let key = PrivateKey::from_seed(0);
//!
//! // Sign a digest
//! let digest = keccak256(b"hello, world!");
//! let signature = key.sign(&digest).unwrap();
//!
//! // Recover the signer
//! assert_eq!(recover(&digest, &signature).unwrap(), key.address());
//! ```

use crate::{Error, Signer};
use alloy_primitives::{keccak256, Address, B256, U256};
use k256::{
    ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};
use rand::{rngs::StdRng, CryptoRng, RngCore, SeedableRng};
use std::fmt;

const PRIVATE_KEY_LENGTH: usize = 32;
const SCALAR_LENGTH: usize = 32;
const SIGNATURE_LENGTH: usize = 2 * SCALAR_LENGTH; // R || S

/// Secp256k1 private key.
#[derive(Clone)]
pub struct PrivateKey {
    key: SigningKey,
    address: Address,
}

impl PrivateKey {
    /// Create a fresh [PrivateKey] using the supplied RNG.
    pub fn from_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_key(SigningKey::random(rng))
    }

    /// Create a [PrivateKey] from a seed.
    ///
    /// # Warning
    ///
    /// This function is insecure and should only be used for examples
    /// and testing.
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::from_rng(&mut rng)
    }

    /// Parse a big-endian secret scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != PRIVATE_KEY_LENGTH {
            return Err(Error::InvalidPrivateKey);
        }
        let key = SigningKey::from_slice(bytes).map_err(|_| Error::InvalidPrivateKey)?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: SigningKey) -> Self {
        let address = address(key.verifying_key());
        Self { key, address }
    }
}

impl Signer for PrivateKey {
    fn address(&self) -> Address {
        self.address
    }

    fn sign(&self, digest: &B256) -> Result<Signature, Error> {
        let (signature, recovery) = self
            .key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|_| Error::SigningFailed)?;
        let bytes = signature.to_bytes();
        Ok(Signature {
            r: U256::from_be_slice(&bytes[..SCALAR_LENGTH]),
            s: U256::from_be_slice(&bytes[SCALAR_LENGTH..]),
            odd_y_parity: recovery.is_y_odd(),
        })
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the secret
        write!(f, "PrivateKey({})", self.address)
    }
}

/// A recoverable secp256k1 signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    r: U256,
    s: U256,
    odd_y_parity: bool,
}

impl Signature {
    pub fn new(r: U256, s: U256, odd_y_parity: bool) -> Self {
        Self { r, s, odd_y_parity }
    }

    pub fn r(&self) -> U256 {
        self.r
    }

    pub fn s(&self) -> U256 {
        self.s
    }

    pub fn odd_y_parity(&self) -> bool {
        self.odd_y_parity
    }
}

/// Recovers the address that produced `signature` over `digest`.
///
/// Signatures with a high `s` value are rejected.
pub fn recover(digest: &B256, signature: &Signature) -> Result<Address, Error> {
    let mut bytes = [0u8; SIGNATURE_LENGTH];
    bytes[..SCALAR_LENGTH].copy_from_slice(&signature.r.to_be_bytes::<SCALAR_LENGTH>());
    bytes[SCALAR_LENGTH..].copy_from_slice(&signature.s.to_be_bytes::<SCALAR_LENGTH>());
    let parsed = EcdsaSignature::from_slice(&bytes).map_err(|_| Error::InvalidSignature)?;
    if parsed.normalize_s().is_some() {
        return Err(Error::InvalidSignature);
    }
    let recovery = RecoveryId::new(signature.odd_y_parity, false);
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &parsed, recovery)
        .map_err(|_| Error::RecoveryFailed)?;
    Ok(address(&key))
}

fn address(key: &VerifyingKey) -> Address {
    let point = key.as_affine().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256, uint};

    /// Key, digest and signature of the example transaction in
    /// [EIP-155](https://eips.ethereum.org/EIPS/eip-155).
    fn vector() -> (PrivateKey, B256, Signature) {
        let key = PrivateKey::from_bytes(&[0x46; PRIVATE_KEY_LENGTH]).unwrap();
        let digest = b256!("daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53");
        let signature = Signature::new(
            uint!(18515461264373351373200002665853028612451056578545711640558177340181847433846_U256),
            uint!(46948507304638947509940763649030358759909902576025900602547168820602576006531_U256),
            false,
        );
        (key, digest, signature)
    }

    #[test]
    fn test_address() {
        let (key, _, _) = vector();
        assert_eq!(
            key.address(),
            address!("9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f")
        );
    }

    #[test]
    fn test_sign_deterministic() {
        let (key, digest, expected) = vector();
        let signature = key.sign(&digest).unwrap();
        assert_eq!(signature, expected);
        assert_eq!(key.sign(&digest).unwrap(), signature);
    }

    #[test]
    fn test_recover() {
        let (key, digest, signature) = vector();
        assert_eq!(recover(&digest, &signature).unwrap(), key.address());

        // A different digest recovers a different (or no) account
        let other = keccak256(digest);
        assert_ne!(recover(&other, &signature).ok(), Some(key.address()));

        // Flipping the parity recovers a different account
        let flipped = Signature::new(signature.r(), signature.s(), !signature.odd_y_parity());
        assert_ne!(recover(&digest, &flipped).ok(), Some(key.address()));
    }

    #[test]
    fn test_recover_rejects_high_s() {
        let (_, digest, signature) = vector();
        let order =
            uint!(0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141_U256);
        let malleable = Signature::new(
            signature.r(),
            order - signature.s(),
            !signature.odd_y_parity(),
        );
        assert_eq!(
            recover(&digest, &malleable),
            Err(Error::InvalidSignature)
        );
    }

    #[test]
    fn test_recover_rejects_zero() {
        let (_, digest, _) = vector();
        let zero = Signature::new(U256::ZERO, U256::ZERO, false);
        assert_eq!(recover(&digest, &zero), Err(Error::InvalidSignature));
    }

    #[test]
    fn test_invalid_private_key() {
        assert_eq!(
            PrivateKey::from_bytes(&[0; PRIVATE_KEY_LENGTH]).unwrap_err(),
            Error::InvalidPrivateKey
        );
        assert_eq!(
            PrivateKey::from_bytes(&[1; 31]).unwrap_err(),
            Error::InvalidPrivateKey
        );
    }

    #[test]
    fn test_from_seed() {
        assert_eq!(
            PrivateKey::from_seed(7).address(),
            PrivateKey::from_seed(7).address()
        );
        assert_ne!(
            PrivateKey::from_seed(7).address(),
            PrivateKey::from_seed(8).address()
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let (key, _, _) = vector();
        let debug = format!("{key:?}");
        assert_eq!(debug, format!("PrivateKey({})", key.address()));
        assert!(!debug.contains("4646"));
    }
}
