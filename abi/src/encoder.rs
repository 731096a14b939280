//! Head/tail encoding of typed values.

use crate::{
    kind::head_size,
    word::{write_address, write_bool, write_uint, write_usize},
    Error, Kind, Selector, Value,
};
use bytes::{BufMut, Bytes, BytesMut};

/// Encodes `values` according to `schema`.
///
/// Fails if the number of values differs from the schema or any value does not have its
/// declared kind.
pub fn encode(schema: &[Kind], values: &[Value]) -> Result<Bytes, Error> {
    let mut buf = BytesMut::with_capacity(head_size(schema));
    write_sequence(&mut buf, schema, values)?;
    Ok(buf.freeze())
}

/// Encodes `values` according to `schema`, prefixed by the method `selector`.
pub fn encode_call(selector: Selector, schema: &[Kind], values: &[Value]) -> Result<Bytes, Error> {
    let body = encode(schema, values)?;
    let mut buf = BytesMut::with_capacity(selector.len() + body.len());
    buf.put_slice(&selector);
    buf.put_slice(&body);
    Ok(buf.freeze())
}

fn write_sequence(buf: &mut BytesMut, kinds: &[Kind], values: &[Value]) -> Result<(), Error> {
    if kinds.len() != values.len() {
        return Err(Error::ValueCount {
            expected: kinds.len(),
            found: values.len(),
        });
    }

    // Offsets are relative to the start of this sequence
    let head = head_size(kinds);
    let mut tail = BytesMut::new();
    for (index, (kind, value)) in kinds.iter().zip(values).enumerate() {
        if kind.is_dynamic() {
            write_usize(buf, head + tail.len());
            write_value(&mut tail, index, kind, value)?;
        } else {
            write_value(buf, index, kind, value)?;
        }
    }
    buf.put_slice(&tail);
    Ok(())
}

fn write_value(buf: &mut BytesMut, index: usize, kind: &Kind, value: &Value) -> Result<(), Error> {
    match (kind, value) {
        (Kind::Address, Value::Address(address)) => write_address(buf, address),
        (Kind::Uint, Value::Uint(value)) => write_uint(buf, value),
        (Kind::Bool, Value::Bool(value)) => write_bool(buf, *value),
        (Kind::AddressArray, Value::AddressArray(items)) => {
            write_usize(buf, items.len());
            for item in items {
                write_address(buf, item);
            }
        }
        (Kind::UintArray, Value::UintArray(items)) => {
            write_usize(buf, items.len());
            for item in items {
                write_uint(buf, item);
            }
        }
        (Kind::BoolArray, Value::BoolArray(items)) => {
            write_usize(buf, items.len());
            for item in items {
                write_bool(buf, *item);
            }
        }
        (Kind::Tuple(members), Value::Tuple(items)) => {
            if !value.matches(kind) {
                return Err(Error::KindMismatch {
                    index,
                    expected: *kind,
                    found: value.name(),
                });
            }
            write_sequence(buf, members, items)?;
        }
        _ => {
            return Err(Error::KindMismatch {
                index,
                expected: *kind,
                found: value.name(),
            })
        }
    }
    Ok(())
}
