//! Encode contract calls and decode their results.
//!
//! # Overview
//!
//! Contracts exchange arguments and return values as a sequence of 32-byte words. Static values
//! (`address`, `uint256`, `bool` and tuples made only of static values) are written in place.
//! Dynamic values (arrays and tuples containing arrays) are written after the head of their
//! enclosing sequence and referenced from the head by a byte offset.
//!
//! Only the kinds exchanged with the system contracts are supported: `address`, `uint256`,
//! `bool`, arrays of those, and tuples. The encoding must match the deployed contracts
//! bit-for-bit, so decoding is strict: truncated buffers, out-of-range offsets or lengths,
//! non-canonical booleans and dirty address padding are all rejected. Trailing bytes beyond
//! the schema are tolerated.
//!
//! # Example
//!
//! ```
//! use alloy_primitives::{Address, U256};
//! use dpos_abi::{Kind, Method, Value};
//!
//! const SLASH: Method = Method::new("slash", &[Kind::Address, Kind::Uint], &[]);
//!
//! let operator = Address::with_last_byte(7);
//! let data = SLASH
//!     .encode_call(&[operator.into(), U256::from(3).into()])
//!     .unwrap();
//! assert_eq!(&data[..4], &[0x02, 0xfb, 0x4d, 0x85]);
//! assert_eq!(data.len(), 4 + 2 * 32);
//!
//! let args = SLASH.decode_input(&data).unwrap();
//! assert_eq!(args, vec![Value::from(operator), Value::from(U256::from(3))]);
//! ```

mod decoder;
mod encoder;
pub mod error;
mod kind;
mod method;
mod value;
mod word;

pub use decoder::decode;
pub use encoder::{encode, encode_call};
pub use error::Error;
pub use kind::{Kind, WORD};
pub use method::{Event, Method, Returns, Selector, SELECTOR_LEN};
pub use value::Value;
