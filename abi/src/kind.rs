//! Schema kinds understood by the encoder and decoder.

use std::fmt;

/// Size of a single encoded word.
pub const WORD: usize = 32;

/// The declared type of a contract argument or return value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `address`
    Address,
    /// `uint256`
    Uint,
    /// `bool`
    Bool,
    /// `address[]`
    AddressArray,
    /// `uint256[]`
    UintArray,
    /// `bool[]`
    BoolArray,
    /// A tuple of the given member kinds (a Solidity struct).
    Tuple(&'static [Kind]),
}

impl Kind {
    /// Returns true if values of this kind are written after the head and referenced by
    /// an offset.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Kind::Address | Kind::Uint | Kind::Bool => false,
            Kind::AddressArray | Kind::UintArray | Kind::BoolArray => true,
            Kind::Tuple(members) => members.iter().any(Kind::is_dynamic),
        }
    }

    /// Number of bytes a value of this kind occupies in the head of its enclosing sequence.
    pub fn head_size(&self) -> usize {
        match self {
            Kind::Tuple(members) if !self.is_dynamic() => head_size(members),
            _ => WORD,
        }
    }
}

/// Number of bytes occupied by the head of a sequence of `kinds`.
pub(crate) fn head_size(kinds: &[Kind]) -> usize {
    kinds.iter().map(Kind::head_size).sum()
}

/// Canonical, comma-separated names of `kinds` (as used in signatures).
pub(crate) fn join(kinds: &[Kind]) -> String {
    kinds
        .iter()
        .map(Kind::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Address => f.write_str("address"),
            Kind::Uint => f.write_str("uint256"),
            Kind::Bool => f.write_str("bool"),
            Kind::AddressArray => f.write_str("address[]"),
            Kind::UintArray => f.write_str("uint256[]"),
            Kind::BoolArray => f.write_str("bool[]"),
            Kind::Tuple(members) => write!(f, "({})", join(members)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINT: Kind = Kind::Tuple(&[Kind::Uint, Kind::Uint]);
    const PAGE: Kind = Kind::Tuple(&[Kind::AddressArray, Kind::Uint]);

    #[test]
    fn test_dynamic() {
        assert!(!Kind::Address.is_dynamic());
        assert!(!Kind::Uint.is_dynamic());
        assert!(!Kind::Bool.is_dynamic());
        assert!(Kind::AddressArray.is_dynamic());
        assert!(Kind::UintArray.is_dynamic());
        assert!(Kind::BoolArray.is_dynamic());
        assert!(!POINT.is_dynamic());
        assert!(PAGE.is_dynamic());
    }

    #[test]
    fn test_head_size() {
        assert_eq!(Kind::Address.head_size(), WORD);
        assert_eq!(Kind::BoolArray.head_size(), WORD);
        assert_eq!(POINT.head_size(), 2 * WORD);
        assert_eq!(PAGE.head_size(), WORD);
        assert_eq!(head_size(&[Kind::Uint, POINT, PAGE]), 4 * WORD);
    }

    #[test]
    fn test_display() {
        assert_eq!(Kind::Uint.to_string(), "uint256");
        assert_eq!(Kind::AddressArray.to_string(), "address[]");
        assert_eq!(POINT.to_string(), "(uint256,uint256)");
        assert_eq!(
            join(&[Kind::Address, PAGE, Kind::BoolArray]),
            "address,(address[],uint256),bool[]"
        );
        assert_eq!(join(&[]), "");
    }
}
