//! Addresses and interfaces of the system contracts.
//!
//! Selectors are derived from these declarations, so every kind must match the deployed
//! bytecode exactly.

use alloy_primitives::{address, Address};
use dpos_abi::{Event, Kind, Method};

/// Default address of the environment (chain parameter) contract.
pub const ENVIRONMENT: Address = address!("0000000000000000000000000000000000001000");

/// Default address of the stake manager contract.
pub const STAKE_MANAGER: Address = address!("0000000000000000000000000000000000001001");

/// Default address of the allowlist contract.
pub const ALLOWLIST: Address = address!("0000000000000000000000000000000000001002");

/// Layout of `EnvironmentValue`: nine `uint256` fields.
pub const ENVIRONMENT_VALUE: Kind = Kind::Tuple(&[Kind::Uint; 9]);

pub mod environment {
    use super::*;

    /// `initialize(EnvironmentValue initialValue)`
    pub const INITIALIZE: Method = Method::new("initialize", &[ENVIRONMENT_VALUE], &[]);

    /// `nextValue() returns (EnvironmentValue)`
    pub const NEXT_VALUE: Method = Method::new("nextValue", &[], &[ENVIRONMENT_VALUE]);

    pub const INITIALIZED: Event = Event::new("Initialized", &[]);
}

pub mod stake_manager {
    use super::*;

    /// `initialize(address environment, address allowlist)`
    pub const INITIALIZE: Method =
        Method::new("initialize", &[Kind::Address, Kind::Address], &[]);

    /// `slash(address operator, uint256 blocks)`
    pub const SLASH: Method = Method::new("slash", &[Kind::Address, Kind::Uint], &[]);

    /// `getValidators(uint256 epoch, uint256 cursor, uint256 howMany)`
    /// `returns (address[] owners, address[] operators, uint256[] stakes, bool[] candidates, uint256 newCursor)`
    pub const GET_VALIDATORS: Method = Method::new(
        "getValidators",
        &[Kind::Uint, Kind::Uint, Kind::Uint],
        &[
            Kind::AddressArray,
            Kind::AddressArray,
            Kind::UintArray,
            Kind::BoolArray,
            Kind::Uint,
        ],
    );

    /// `getValidatorOwners(uint256 cursor, uint256 howMany)`
    /// `returns (address[] owners, uint256 newCursor)`
    pub const GET_VALIDATOR_OWNERS: Method = Method::new(
        "getValidatorOwners",
        &[Kind::Uint, Kind::Uint],
        &[Kind::AddressArray, Kind::Uint],
    );

    /// `getTotalRewards(address[] validators, uint256 epochs) returns (uint256)`
    pub const GET_TOTAL_REWARDS: Method = Method::new(
        "getTotalRewards",
        &[Kind::AddressArray, Kind::Uint],
        &[Kind::Uint],
    );

    pub const INITIALIZED: Event = Event::new("Initialized", &[]);

    pub const SLASHED: Event = Event::new("Slashed", &[]);
}
