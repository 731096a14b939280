//! Reading and writing single 32-byte words.

use crate::{Error, WORD};
use alloy_primitives::{Address, U256};
use bytes::BufMut;

/// Number of leading zero bytes padding an address to a full word.
const ADDRESS_PADDING: usize = WORD - 20;

/// Number of leading zero bytes padding a `u64` to a full word.
const U64_PADDING: usize = WORD - std::mem::size_of::<u64>();

/// Returns the word starting at `at`.
fn read(data: &[u8], at: usize) -> Result<&[u8], Error> {
    at.checked_add(WORD)
        .and_then(|end| data.get(at..end))
        .ok_or(Error::EndOfBuffer(at))
}

pub(crate) fn read_uint(data: &[u8], at: usize) -> Result<U256, Error> {
    Ok(U256::from_be_slice(read(data, at)?))
}

pub(crate) fn read_address(data: &[u8], at: usize) -> Result<Address, Error> {
    let word = read(data, at)?;
    if word[..ADDRESS_PADDING].iter().any(|b| *b != 0) {
        return Err(Error::InvalidAddress(at));
    }
    Ok(Address::from_slice(&word[ADDRESS_PADDING..]))
}

pub(crate) fn read_bool(data: &[u8], at: usize) -> Result<bool, Error> {
    let word = read(data, at)?;
    if word[..WORD - 1].iter().any(|b| *b != 0) {
        return Err(Error::InvalidBool(at));
    }
    match word[WORD - 1] {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(Error::InvalidBool(at)),
    }
}

/// Reads an offset or length, failing with `invalid(at)` if it does not fit in a `usize`.
pub(crate) fn read_usize(
    data: &[u8],
    at: usize,
    invalid: fn(usize) -> Error,
) -> Result<usize, Error> {
    let word = read(data, at)?;
    if word[..U64_PADDING].iter().any(|b| *b != 0) {
        return Err(invalid(at));
    }
    let mut value = [0u8; 8];
    value.copy_from_slice(&word[U64_PADDING..]);
    usize::try_from(u64::from_be_bytes(value)).map_err(|_| invalid(at))
}

pub(crate) fn write_uint(buf: &mut impl BufMut, value: &U256) {
    buf.put_slice(&value.to_be_bytes::<WORD>());
}

pub(crate) fn write_address(buf: &mut impl BufMut, address: &Address) {
    buf.put_bytes(0, ADDRESS_PADDING);
    buf.put_slice(address.as_slice());
}

pub(crate) fn write_bool(buf: &mut impl BufMut, value: bool) {
    write_usize(buf, usize::from(value));
}

pub(crate) fn write_usize(buf: &mut impl BufMut, value: usize) {
    buf.put_bytes(0, U64_PADDING);
    buf.put_u64(value as u64);
}
