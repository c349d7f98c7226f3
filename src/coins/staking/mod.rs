//! The staking ledger.
//!
//! [Staking] owns every staking record (validators, delegations, staking
//! states, unbonding and redelegation entries, maturity queues, bans) inside
//! a single key/value store and is the only writer of that store.
//!
//! Every public operation runs against a write buffer. When the operation
//! returns `Ok` the buffered writes and events are committed; when it returns
//! `Err` they are dropped, so a failed call leaves the ledger unchanged.
use crate::coins::{Address, Amount, Coin, Decimal};
use crate::collections::{Map, Queue};
use crate::state_machine::BlockCtx;
use crate::store::{BufStore, Flush, Store};
use crate::{Error, Result};
use std::cmp::Reverse;

mod bank;
pub use bank::*;

mod delegate;

mod delegation;
pub use delegation::*;

mod events;
pub use events::*;

mod force_remove;

mod msg;
pub use msg::*;

mod params;
pub use params::*;

mod pool;
pub use pool::*;

mod redelegation;
pub use redelegation::*;

mod scheduler;

mod staking_state;
pub use staking_state::*;

mod unbonding;
pub use unbonding::*;

mod validator;
pub use validator::*;

pub struct Staking<S> {
    store: BufStore<S>,
    params: Params,
    validators: Map<Address, Validator>,
    validators_by_cons_addr: Map<[u8; 20], Address>,
    /// Unjailed validators by descending power, then ascending address.
    validators_by_power: Map<(Reverse<u64>, Address), ()>,
    last_indexed_power: Map<Address, u64>,
    /// Keyed by (delegator, validator).
    delegations: Map<(Address, Address), Delegation>,
    staking_states: Map<Address, ValidatorStakingState>,
    /// Keyed by (delegator, validator).
    unbonding_delegations: Map<(Address, Address), UnbondingDelegation>,
    /// Keyed by (validator, delegator).
    unbonding_by_validator: Map<(Address, Address), ()>,
    /// Keyed by (delegator, src, dst).
    redelegations: Map<(Address, Address, Address), Redelegation>,
    /// Keyed by (src, delegator, dst).
    redelegations_by_src: Map<(Address, Address, Address), ()>,
    unbonding_queue: Queue<DVPair>,
    redelegation_queue: Queue<DVVTriplet>,
    scheduled_unbond_queue: Queue<Address>,
    /// Height each banned account was banned at.
    banned_accounts: Map<Address, u64>,
    balances: Map<(Account, String), Amount>,
    pending_events: Vec<Event>,
    events: Vec<Event>,
}

impl<S: Store> Staking<S> {
    pub fn new(store: S, params: Params) -> Result<Self> {
        params.validate()?;
        Ok(Staking {
            store: BufStore::wrap(store),
            params,
            validators: Map::new(0x21),
            validators_by_cons_addr: Map::new(0x22),
            validators_by_power: Map::new(0x23),
            last_indexed_power: Map::new(0x24),
            delegations: Map::new(0x31),
            staking_states: Map::new(0x32),
            unbonding_delegations: Map::new(0x33),
            unbonding_by_validator: Map::new(0x34),
            redelegations: Map::new(0x35),
            redelegations_by_src: Map::new(0x36),
            unbonding_queue: Queue::new(0x41),
            redelegation_queue: Queue::new(0x42),
            scheduled_unbond_queue: Queue::new(0x43),
            banned_accounts: Map::new(0x51),
            balances: Map::new(0x61),
            pending_events: vec![],
            events: vec![],
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The committed backing store.
    pub fn store(&self) -> &S {
        self.store.inner()
    }

    pub fn into_store(self) -> S {
        self.store.into_inner()
    }

    /// Takes every event emitted by committed operations since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Runs `op` and commits its writes and events only if it succeeds.
    pub(crate) fn transact<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        match op(self) {
            Ok(value) => {
                self.store.flush()?;
                self.events.append(&mut self.pending_events);
                Ok(value)
            }
            Err(err) => {
                self.store.discard();
                self.pending_events.clear();
                Err(err)
            }
        }
    }

    pub(crate) fn emit(&mut self, event: Event) {
        log::debug!("{:?}", event);
        self.pending_events.push(event);
    }

    /// Registers a validator and bonds the operator's self delegation.
    pub fn create_validator(
        &mut self,
        ctx: &BlockCtx,
        declaration: Declaration,
        self_bond: Amount,
    ) -> Result<()> {
        self.transact(|staking| staking.create_validator_inner(ctx, declaration, self_bond))
    }

    /// Delegates `amount` from the delegator's account to a validator,
    /// returning the shares issued.
    pub fn delegate(
        &mut self,
        ctx: &BlockCtx,
        delegator: Address,
        validator: Address,
        op: OpType,
        amount: Amount,
    ) -> Result<Decimal> {
        assert_positive(amount)?;
        self.transact(|staking| {
            let validator = staking.validator_or_err(&validator)?;
            staking.delegate_inner(ctx, delegator, op, amount, Status::Unbonded, validator, true)
        })
    }

    /// Undelegates `shares` and returns the completion time of the created
    /// unbonding entry.
    pub fn undelegate(
        &mut self,
        ctx: &BlockCtx,
        delegator: Address,
        validator: Address,
        op: OpType,
        shares: Decimal,
        ignore_entry_cap: bool,
    ) -> Result<u64> {
        assert_positive_shares(shares)?;
        let reason = if ignore_entry_cap {
            UnbondReason::ForceRemove
        } else {
            UnbondReason::Request
        };
        self.transact(|staking| {
            staking
                .undelegate_inner(ctx, delegator, validator, op, shares, reason)
                .map(|(completion_time, _)| completion_time)
        })
    }

    /// Undelegates the shares worth `amount` tokens.
    pub fn undelegate_amount(
        &mut self,
        ctx: &BlockCtx,
        delegator: Address,
        validator: Address,
        op: OpType,
        amount: Amount,
    ) -> Result<u64> {
        assert_positive(amount)?;
        self.transact(|staking| {
            let shares = staking.validate_unbond_amount(delegator, validator, op, amount)?;
            staking
                .undelegate_inner(ctx, delegator, validator, op, shares, UnbondReason::Request)
                .map(|(completion_time, _)| completion_time)
        })
    }

    /// Moves `shares` from `src` to `dst` and returns the completion time of
    /// the redelegation.
    pub fn begin_redelegation(
        &mut self,
        ctx: &BlockCtx,
        delegator: Address,
        src: Address,
        dst: Address,
        op: OpType,
        shares: Decimal,
    ) -> Result<u64> {
        assert_positive_shares(shares)?;
        self.transact(|staking| staking.begin_redelegation_inner(ctx, delegator, src, dst, op, shares))
    }

    /// Redelegates the shares worth `amount` tokens at the source validator.
    pub fn redelegate_amount(
        &mut self,
        ctx: &BlockCtx,
        delegator: Address,
        src: Address,
        dst: Address,
        op: OpType,
        amount: Amount,
    ) -> Result<u64> {
        assert_positive(amount)?;
        self.transact(|staking| {
            let shares = staking.validate_unbond_amount(delegator, src, op, amount)?;
            staking.begin_redelegation_inner(ctx, delegator, src, dst, op, shares)
        })
    }

    /// Releases every matured unbonding entry of the pair to the delegator.
    pub fn complete_unbonding(
        &mut self,
        ctx: &BlockCtx,
        delegator: Address,
        validator: Address,
    ) -> Result<Vec<Coin>> {
        self.transact(|staking| staking.complete_unbonding_with_amount(ctx, delegator, validator))
    }

    /// Removes every matured redelegation entry of the triplet.
    pub fn complete_redelegation(
        &mut self,
        ctx: &BlockCtx,
        delegator: Address,
        src: Address,
        dst: Address,
    ) -> Result<Vec<Coin>> {
        self.transact(|staking| staking.complete_redelegation_inner(ctx, delegator, src, dst))
    }

    /// Completes matured unbondings and redelegations, then forcibly unbonds
    /// validators whose scheduled unbond has started.
    pub fn end_block(&mut self, ctx: &BlockCtx) -> Result<()> {
        self.transact(|staking| {
            staking.complete_matured_unbondings(ctx)?;
            staking.complete_matured_redelegations(ctx)?;
            staking.process_scheduled_unbonds(ctx)
        })
    }

    /// Immediately unwinds every delegation of the given type held by
    /// `delegator`, releasing funds without waiting for maturity.
    pub fn force_remove_typed_delegations(
        &mut self,
        ctx: &BlockCtx,
        delegator: Address,
        op: OpType,
    ) -> Result<()> {
        self.transact(|staking| staking.force_remove_typed_delegations_inner(ctx, delegator, op))
    }

    /// Bans `address` and forcibly removes all of its delegations.
    pub fn ban_account(&mut self, ctx: &BlockCtx, address: Address) -> Result<()> {
        self.transact(|staking| staking.ban_account_inner(ctx, address))
    }

    pub fn unban_account(&mut self, address: Address) -> Result<()> {
        self.transact(|staking| staking.banned_accounts.remove(&mut staking.store, &address))
    }

    pub fn bond_validator(&mut self, operator: Address) -> Result<()> {
        self.transact(|staking| staking.bond_validator_inner(operator))
    }

    pub fn begin_unbonding_validator(&mut self, ctx: &BlockCtx, operator: Address) -> Result<()> {
        self.transact(|staking| staking.begin_unbonding_validator_inner(ctx, operator))
    }

    pub fn complete_unbonding_validator(&mut self, operator: Address) -> Result<()> {
        self.transact(|staking| staking.complete_unbonding_validator_inner(operator))
    }

    pub fn jail(&mut self, operator: Address) -> Result<()> {
        self.transact(|staking| {
            let mut validator = staking.validator_or_err(&operator)?;
            staking.jail_validator(&mut validator)
        })
    }

    pub fn unjail(&mut self, operator: Address) -> Result<()> {
        self.transact(|staking| staking.unjail_inner(operator))
    }

    /// Replaces every parameter, running the change hooks of parameters which
    /// have them.
    pub fn set_params(&mut self, ctx: &BlockCtx, params: Params) -> Result<()> {
        params.validate()?;
        let previous = self.params.clone();
        let res = self.transact(|staking| {
            staking.validate_max_validators(params.max_validators)?;
            let ratio_changed = params.max_delegations_ratio != staking.params.max_delegations_ratio;
            staking.params = params;
            if ratio_changed {
                staking.rebalance_all_validators(ctx)?;
            }
            Ok(())
        });
        if res.is_err() {
            self.params = previous;
        }
        res
    }

    pub fn set_max_validators(&mut self, max_validators: u64) -> Result<()> {
        self.validate_max_validators(max_validators)?;
        self.params.max_validators = max_validators;
        Ok(())
    }

    /// Changes the delegation ratio and immediately reduces the delegations
    /// of every validator above the new limit.
    pub fn set_max_delegations_ratio(&mut self, ctx: &BlockCtx, ratio: Decimal) -> Result<()> {
        let mut params = self.params.clone();
        params.max_delegations_ratio = ratio;
        self.set_params(ctx, params)
    }

    fn validate_max_validators(&self, max_validators: u64) -> Result<()> {
        let count = self.validators.len(&self.store)?;
        if max_validators < count {
            return Err(Error::ParamChangeDenied(format!(
                "max_validators cannot be reduced below the current validator count ({})",
                count
            )));
        }
        Ok(())
    }

    pub fn is_banned(&self, address: &Address) -> Result<bool> {
        Ok(self.banned_at(address)?.is_some())
    }

    /// The height at which `address` was banned, if it is banned.
    pub fn banned_at(&self, address: &Address) -> Result<Option<u64>> {
        self.banned_accounts.get(&self.store, address)
    }
}

fn assert_positive(amount: Amount) -> Result<()> {
    if amount.is_zero() {
        Err(Error::InvalidAmount("Amount must be positive".into()))
    } else {
        Ok(())
    }
}

fn assert_positive_shares(shares: Decimal) -> Result<()> {
    if shares.is_positive() {
        Ok(())
    } else {
        Err(Error::InvalidAmount("Shares must be positive".into()))
    }
}
