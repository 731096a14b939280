//! Values read from the system contracts.

use alloy_primitives::{Address, U256};
use dpos_abi::{Error, Value};

/// Number of fields in an [EnvironmentValue].
const ENVIRONMENT_FIELDS: usize = 9;

/// Tunable chain parameters, effective from `start_block`.
///
/// Field order is part of the contract interface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EnvironmentValue {
    pub start_block: U256,
    pub start_epoch: U256,
    pub block_period: U256,
    pub epoch_period: U256,
    pub reward_rate: U256,
    pub commission_rate: U256,
    pub validator_threshold: U256,
    pub jail_threshold: U256,
    pub jail_period: U256,
}

impl EnvironmentValue {
    /// Parameters in force before the environment contract has been initialized.
    pub fn genesis(block_period: u64, epoch_period: u64) -> Self {
        Self {
            start_block: U256::ZERO,
            start_epoch: U256::from(1),
            block_period: U256::from(block_period),
            epoch_period: U256::from(epoch_period),
            reward_rate: U256::from(10),
            commission_rate: U256::from(10),
            validator_threshold: U256::from(10_000_000u64) * U256::from(10).pow(U256::from(18)),
            jail_threshold: U256::from(500),
            jail_period: U256::from(2),
        }
    }

    /// Epoch that contains block `number`, if `number` is covered by these parameters.
    pub fn epoch(&self, number: u64) -> Option<u64> {
        let elapsed = U256::from(number).checked_sub(self.start_block)?;
        let epochs = elapsed.checked_div(self.epoch_period)?;
        u64::try_from(self.start_epoch.checked_add(epochs)?).ok()
    }

    /// Whether block `number` is the first block of an epoch.
    pub fn is_epoch_start(&self, number: u64) -> bool {
        let Some(elapsed) = U256::from(number).checked_sub(self.start_block) else {
            return false;
        };
        elapsed
            .checked_rem(self.epoch_period)
            .is_some_and(|rem| rem.is_zero())
    }

    /// First block of `epoch`.
    pub fn epoch_start(&self, epoch: u64) -> Option<u64> {
        let epochs = U256::from(epoch).checked_sub(self.start_epoch)?;
        let offset = epochs.checked_mul(self.epoch_period)?;
        u64::try_from(self.start_block.checked_add(offset)?).ok()
    }

    fn fields(&self) -> [U256; ENVIRONMENT_FIELDS] {
        [
            self.start_block,
            self.start_epoch,
            self.block_period,
            self.epoch_period,
            self.reward_rate,
            self.commission_rate,
            self.validator_threshold,
            self.jail_threshold,
            self.jail_period,
        ]
    }
}

impl From<&EnvironmentValue> for Value {
    fn from(value: &EnvironmentValue) -> Self {
        Value::Tuple(value.fields().into_iter().map(Value::from).collect())
    }
}

impl TryFrom<Value> for EnvironmentValue {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let fields = value.into_tuple()?;
        if fields.len() != ENVIRONMENT_FIELDS {
            return Err(Error::ValueCount {
                expected: ENVIRONMENT_FIELDS,
                found: fields.len(),
            });
        }
        let mut fields = fields.into_iter().map(U256::try_from);
        let mut next = || fields.next().unwrap_or(Err(Error::MissingValue));
        Ok(Self {
            start_block: next()?,
            start_epoch: next()?,
            block_period: next()?,
            epoch_period: next()?,
            reward_rate: next()?,
            commission_rate: next()?,
            validator_threshold: next()?,
            jail_threshold: next()?,
            jail_period: next()?,
        })
    }
}

/// A validator registered with the stake manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValidatorCandidate {
    pub owner: Address,
    pub operator: Address,
    pub stake: U256,
    pub candidate: bool,
}

/// Candidates for the next epoch's validator set, in enumeration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NextValidators {
    pub owners: Vec<Address>,
    pub operators: Vec<Address>,
    pub stakes: Vec<U256>,
}

impl NextValidators {
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub(crate) fn push(&mut self, owner: Address, operator: Address, stake: U256) {
        self.owners.push(owner);
        self.operators.push(operator);
        self.stakes.push(stake);
    }

    pub fn iter(&self) -> impl Iterator<Item = ValidatorCandidate> + '_ {
        self.owners
            .iter()
            .zip(&self.operators)
            .zip(&self.stakes)
            .map(|((owner, operator), stake)| ValidatorCandidate {
                owner: *owner,
                operator: *operator,
                stake: *stake,
                candidate: true,
            })
    }
}
