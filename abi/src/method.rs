//! Contract method and event descriptors.

use crate::{decode, encode_call, kind::join, Error, Kind, Value};
use alloy_primitives::{keccak256, B256};
use bytes::Bytes;

/// Length of a method selector.
pub const SELECTOR_LEN: usize = 4;

/// The first four bytes of the hash of a method's canonical signature.
pub type Selector = [u8; SELECTOR_LEN];

/// A contract method: its name and the schemas of its arguments and return values.
///
/// Methods are declared as constants and must match the deployed contract exactly; a
/// mismatch in any kind changes the selector (or the layout) and breaks the call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Method {
    name: &'static str,
    inputs: &'static [Kind],
    outputs: &'static [Kind],
}

impl Method {
    pub const fn new(
        name: &'static str,
        inputs: &'static [Kind],
        outputs: &'static [Kind],
    ) -> Self {
        Self {
            name,
            inputs,
            outputs,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn inputs(&self) -> &'static [Kind] {
        self.inputs
    }

    pub fn outputs(&self) -> &'static [Kind] {
        self.outputs
    }

    /// Canonical signature, e.g. `slash(address,uint256)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, join(self.inputs))
    }

    pub fn selector(&self) -> Selector {
        let hash = keccak256(self.signature());
        let mut selector = [0u8; SELECTOR_LEN];
        selector.copy_from_slice(&hash[..SELECTOR_LEN]);
        selector
    }

    /// Encodes a call of this method with `args`.
    pub fn encode_call(&self, args: &[Value]) -> Result<Bytes, Error> {
        encode_call(self.selector(), self.inputs, args)
    }

    /// Decodes the arguments of a call of this method, verifying the selector.
    pub fn decode_input(&self, data: &[u8]) -> Result<Vec<Value>, Error> {
        let expected = self.selector();
        match data.get(..SELECTOR_LEN) {
            Some(found) if found == expected => decode(self.inputs, &data[SELECTOR_LEN..]),
            _ => Err(Error::InvalidSelector {
                expected,
                found: data[..data.len().min(SELECTOR_LEN)].to_vec(),
            }),
        }
    }

    /// Decodes the return values of this method.
    pub fn decode_output(&self, data: &[u8]) -> Result<Returns, Error> {
        decode(self.outputs, data).map(Returns::new)
    }
}

/// A contract event, identified in logs by the hash of its signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    name: &'static str,
    inputs: &'static [Kind],
}

impl Event {
    pub const fn new(name: &'static str, inputs: &'static [Kind]) -> Self {
        Self { name, inputs }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn signature(&self) -> String {
        format!("{}({})", self.name, join(self.inputs))
    }

    /// The first topic of every log emitted for this event.
    pub fn topic(&self) -> B256 {
        keccak256(self.signature())
    }
}

/// Decoded return values, consumed in declaration order.
#[derive(Debug)]
pub struct Returns(std::vec::IntoIter<Value>);

impl Returns {
    fn new(values: Vec<Value>) -> Self {
        Self(values.into_iter())
    }

    /// Takes the next value, converting it to `T`.
    pub fn take<T: TryFrom<Value, Error = Error>>(&mut self) -> Result<T, Error> {
        self.0.next().ok_or(Error::MissingValue)?.try_into()
    }

    /// Number of values not yet taken.
    pub fn remaining(&self) -> usize {
        self.0.len()
    }
}
