//! Read validator, reward and parameter state from the system contracts.
//!
//! Every read is a single round of [ContractCaller::call] against a fixed block. Responses
//! that do not decode, or that would make enumeration run away, are fatal: a correctly
//! deployed contract never produces them.

use crate::{
    caller::{BlockRef, CallRequest, ContractCaller},
    config::Config,
    contracts::{environment, stake_manager},
    metrics::{self, MethodLabel},
    types::{EnvironmentValue, NextValidators},
    Error, Protocol,
};
use alloy_primitives::{Address, U256};
use dpos_abi::{Method, Returns, Value};
use tracing::{debug, warn};

/// Number of epochs whose rewards are summed by [Fetcher::rewards].
const REWARD_EPOCHS: u64 = 1;

/// Reads system contract state through a [ContractCaller].
pub struct Fetcher<C: ContractCaller> {
    caller: C,
    environment: Address,
    stake_manager: Address,
    page_size: u64,
    max_pages: usize,
    metrics: metrics::Fetcher,
}

impl<C: ContractCaller> Fetcher<C> {
    pub fn new(caller: C, cfg: &Config) -> Self {
        cfg.assert();
        Self {
            caller,
            environment: cfg.environment,
            stake_manager: cfg.stake_manager,
            page_size: cfg.page_size,
            max_pages: cfg.max_pages,
            metrics: metrics::Fetcher::init(&cfg.registry),
        }
    }

    /// Enumerates the candidates for `epoch`'s validator set.
    ///
    /// Pages are requested until one comes back empty. Each non-empty page must move the
    /// cursor forward and no more than `max_pages` pages are requested.
    pub fn next_validators(&mut self, block: BlockRef, epoch: u64) -> Result<NextValidators, Error> {
        let mut validators = NextValidators::default();
        let mut cursor = U256::ZERO;
        for page in 0..self.max_pages {
            let args = [
                Value::from(U256::from(epoch)),
                Value::from(cursor),
                Value::from(U256::from(self.page_size)),
            ];
            let mut returns =
                self.call(self.stake_manager, &stake_manager::GET_VALIDATORS, &args, block)?;
            let owners: Vec<Address> = take(&mut returns)?;
            let operators: Vec<Address> = take(&mut returns)?;
            let stakes: Vec<U256> = take(&mut returns)?;
            let candidates: Vec<bool> = take(&mut returns)?;
            let next: U256 = take(&mut returns)?;
            self.metrics.validator_pages.inc();

            if owners.is_empty() {
                debug!(%block, epoch, pages = page + 1, validators = validators.len(), "fetched validators");
                return Ok(validators);
            }
            if operators.len() != owners.len()
                || stakes.len() != owners.len()
                || candidates.len() != owners.len()
            {
                warn!(%block, epoch, page, "malformed validator page");
                return Err(Protocol::PageShape {
                    owners: owners.len(),
                    operators: operators.len(),
                    stakes: stakes.len(),
                    candidates: candidates.len(),
                }
                .into());
            }

            let before = validators.len();
            for (((owner, operator), stake), candidate) in
                owners.into_iter().zip(operators).zip(stakes).zip(candidates)
            {
                if candidate {
                    validators.push(owner, operator, stake);
                }
            }
            debug!(%block, epoch, page, %cursor, %next, candidates = validators.len() - before, "fetched validator page");

            if next <= cursor {
                warn!(%block, epoch, %cursor, %next, "validator cursor did not advance");
                return Err(Protocol::StalledCursor {
                    current: cursor,
                    next,
                }
                .into());
            }
            cursor = next;
        }
        warn!(%block, epoch, max_pages = self.max_pages, "validator enumeration did not terminate");
        Err(Protocol::PageLimit(self.max_pages).into())
    }

    /// Returns the total rewards of the current validators for the last epoch.
    ///
    /// Two calls are made against `block`, in order: the first page of validator owners is
    /// read and then passed to the reward query. Only the second result is returned.
    pub fn rewards(&mut self, block: BlockRef) -> Result<U256, Error> {
        let args = [
            Value::from(U256::ZERO),
            Value::from(U256::from(self.page_size)),
        ];
        let mut returns = self.call(
            self.stake_manager,
            &stake_manager::GET_VALIDATOR_OWNERS,
            &args,
            block,
        )?;
        let owners: Vec<Address> = take(&mut returns)?;
        let _: U256 = take(&mut returns)?;

        let owners_count = owners.len();
        let args = [Value::from(owners), Value::from(U256::from(REWARD_EPOCHS))];
        let mut returns = self.call(
            self.stake_manager,
            &stake_manager::GET_TOTAL_REWARDS,
            &args,
            block,
        )?;
        let rewards: U256 = take(&mut returns)?;
        debug!(%block, owners = owners_count, %rewards, "fetched rewards");
        Ok(rewards)
    }

    /// Returns the parameters scheduled to take effect at the next epoch.
    pub fn next_environment(&mut self, block: BlockRef) -> Result<EnvironmentValue, Error> {
        let mut returns = self.call(self.environment, &environment::NEXT_VALUE, &[], block)?;
        let value: EnvironmentValue = take(&mut returns)?;
        debug!(%block, start_block = %value.start_block, start_epoch = %value.start_epoch, "fetched environment");
        Ok(value)
    }

    fn call(
        &mut self,
        to: Address,
        method: &Method,
        args: &[Value],
        block: BlockRef,
    ) -> Result<Returns, Error> {
        let data = method.encode_call(args).map_err(Error::Encoding)?;
        self.metrics
            .contract_calls
            .get_or_create(&MethodLabel::from(method))
            .inc();
        let output = self.caller.call(&CallRequest::new(to, data), block, None)?;
        method.decode_output(&output).map_err(Error::Decoding)
    }
}

fn take<T: TryFrom<Value, Error = dpos_abi::Error>>(returns: &mut Returns) -> Result<T, Error> {
    returns.take().map_err(Error::Decoding)
}
