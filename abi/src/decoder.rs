//! Bounds-checked decoding of typed values.

use crate::{
    word::{read_address, read_bool, read_uint, read_usize},
    Error, Kind, Value, WORD,
};

/// Decodes `data` according to `schema`.
///
/// Every offset and length is checked against the buffer before it is followed, so a
/// malformed response can never trigger an oversized allocation. Bytes past the end of the
/// last value are ignored.
pub fn decode(schema: &[Kind], data: &[u8]) -> Result<Vec<Value>, Error> {
    if data.is_empty() && !schema.is_empty() {
        return Err(Error::Empty);
    }
    read_sequence(schema, data, 0)
}

fn read_sequence(kinds: &[Kind], data: &[u8], base: usize) -> Result<Vec<Value>, Error> {
    let mut values = Vec::with_capacity(kinds.len());
    let mut at = base;
    for kind in kinds {
        let value = if kind.is_dynamic() {
            let offset = read_usize(data, at, Error::InvalidOffset)?;
            let start = base
                .checked_add(offset)
                .ok_or(Error::InvalidOffset(at))?;
            read_value(kind, data, start)?
        } else {
            read_value(kind, data, at)?
        };
        values.push(value);
        at += kind.head_size();
    }
    Ok(values)
}

fn read_value(kind: &Kind, data: &[u8], at: usize) -> Result<Value, Error> {
    Ok(match kind {
        Kind::Address => Value::Address(read_address(data, at)?),
        Kind::Uint => Value::Uint(read_uint(data, at)?),
        Kind::Bool => Value::Bool(read_bool(data, at)?),
        Kind::AddressArray => Value::AddressArray(read_array(data, at, read_address)?),
        Kind::UintArray => Value::UintArray(read_array(data, at, read_uint)?),
        Kind::BoolArray => Value::BoolArray(read_array(data, at, read_bool)?),
        Kind::Tuple(members) => Value::Tuple(read_sequence(members, data, at)?),
    })
}

fn read_array<T>(
    data: &[u8],
    at: usize,
    read: fn(&[u8], usize) -> Result<T, Error>,
) -> Result<Vec<T>, Error> {
    let len = read_usize(data, at, Error::InvalidLength)?;

    // The length word was read, so `start` is within the buffer
    let start = at + WORD;
    if len > (data.len() - start) / WORD {
        return Err(Error::InvalidLength(at));
    }
    (0..len).map(|i| read(data, start + i * WORD)).collect()
}
