//! Error types for contract call encoding and decoding.

use crate::{Kind, Selector};
use thiserror::Error;

/// Error type for encoding and decoding.
///
/// Positions are byte offsets into the buffer being decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Encoding
    #[error("expected {expected} values, found {found}")]
    ValueCount { expected: usize, found: usize },
    #[error("value {index}: expected {expected}, found {found}")]
    KindMismatch {
        index: usize,
        expected: Kind,
        found: &'static str,
    },

    // Decoding
    #[error("empty buffer")]
    Empty,
    #[error("unexpected end of buffer at {0}")]
    EndOfBuffer(usize),
    #[error("invalid offset at {0}")]
    InvalidOffset(usize),
    #[error("invalid length at {0}")]
    InvalidLength(usize),
    #[error("invalid bool at {0}")]
    InvalidBool(usize),
    #[error("invalid address at {0}")]
    InvalidAddress(usize),
    #[error("invalid selector: expected {expected:02x?}, found {found:02x?}")]
    InvalidSelector { expected: Selector, found: Vec<u8> },

    // Conversion
    #[error("expected {expected}, found {found}")]
    UnexpectedValue {
        expected: &'static str,
        found: &'static str,
    },
    #[error("missing value")]
    MissingValue,
}
