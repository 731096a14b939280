//! Tagged runtime values.

use crate::{Error, Kind};
use alloy_primitives::{Address, U256};

/// A decoded (or to-be-encoded) contract value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Address(Address),
    Uint(U256),
    Bool(bool),
    AddressArray(Vec<Address>),
    UintArray(Vec<U256>),
    BoolArray(Vec<bool>),
    Tuple(Vec<Value>),
}

impl Value {
    /// Name of the variant, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Value::Address(_) => "address",
            Value::Uint(_) => "uint256",
            Value::Bool(_) => "bool",
            Value::AddressArray(_) => "address[]",
            Value::UintArray(_) => "uint256[]",
            Value::BoolArray(_) => "bool[]",
            Value::Tuple(_) => "tuple",
        }
    }

    /// Returns true if the value (recursively) has the given kind.
    pub fn matches(&self, kind: &Kind) -> bool {
        match (kind, self) {
            (Kind::Address, Value::Address(_))
            | (Kind::Uint, Value::Uint(_))
            | (Kind::Bool, Value::Bool(_))
            | (Kind::AddressArray, Value::AddressArray(_))
            | (Kind::UintArray, Value::UintArray(_))
            | (Kind::BoolArray, Value::BoolArray(_)) => true,
            (Kind::Tuple(members), Value::Tuple(items)) => {
                members.len() == items.len()
                    && members.iter().zip(items).all(|(kind, item)| item.matches(kind))
            }
            _ => false,
        }
    }

    /// Consumes a tuple value, returning its members.
    pub fn into_tuple(self) -> Result<Vec<Value>, Error> {
        match self {
            Value::Tuple(items) => Ok(items),
            other => Err(Error::UnexpectedValue {
                expected: "tuple",
                found: other.name(),
            }),
        }
    }
}

macro_rules! impl_value {
    ($variant:ident, $type:ty, $name:expr) => {
        impl From<$type> for Value {
            fn from(value: $type) -> Self {
                Value::$variant(value)
            }
        }

        impl TryFrom<Value> for $type {
            type Error = Error;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    other => Err(Error::UnexpectedValue {
                        expected: $name,
                        found: other.name(),
                    }),
                }
            }
        }
    };
}

impl_value!(Address, Address, "address");
impl_value!(Uint, U256, "uint256");
impl_value!(Bool, bool, "bool");
impl_value!(AddressArray, Vec<Address>, "address[]");
impl_value!(UintArray, Vec<U256>, "uint256[]");
impl_value!(BoolArray, Vec<bool>, "bool[]");
