use super::{Account, Delegation, Event, OpType, Staking, Status, Validator};
use crate::coins::{Address, Amount, Decimal};
use crate::state_machine::BlockCtx;
use crate::store::Store;
use crate::{Error, Result};

impl<S: Store> Staking<S> {
    /// Adds `amount` tokens of the given class to `validator` on behalf of
    /// `delegator` and returns the shares issued.
    ///
    /// `token_src` is where the tokens currently sit. With `subtract_account`
    /// the tokens are debited from the delegator's account; otherwise they
    /// are already held by a pool (e.g. a redelegation settling) and only
    /// moved between the bonded and not-bonded pools as needed.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn delegate_inner(
        &mut self,
        ctx: &BlockCtx,
        delegator: Address,
        op: OpType,
        amount: Amount,
        token_src: Status,
        mut validator: Validator,
        subtract_account: bool,
    ) -> Result<Decimal> {
        if validator.pool(op).has_invalid_ex_rate() {
            return Err(Error::InvalidExchangeRate);
        }

        let mut delegation = self
            .delegation(&delegator, &validator.operator)?
            .unwrap_or_else(|| Delegation::new(delegator, validator.operator));

        let denom = self.params.denom(op).to_string();
        if subtract_account {
            if token_src == Status::Bonded {
                return Err(Error::invariant(
                    "Delegation token source cannot be bonded when debiting an account",
                ));
            }
            let pool = match op {
                OpType::Bonding if validator.is_bonded() => Account::BondedPool,
                OpType::Bonding => Account::NotBondedPool,
                OpType::Liquidity => Account::LiquidityPool,
            };
            self.send(Account::User(delegator), pool, &denom, amount)?;
        } else if op == OpType::Bonding {
            let src_bonded = token_src == Status::Bonded;
            match (src_bonded, validator.is_bonded()) {
                (true, false) => self.move_bonding_tokens(amount, true)?,
                (false, true) => self.move_bonding_tokens(amount, false)?,
                _ => {}
            }
        }

        let issued_shares = validator.pool_mut(op).add_tokens_from_delegation(amount)?;
        self.set_validator(&validator)?;

        let shares = delegation.shares_mut(op);
        *shares = (*shares + issued_shares)?;
        self.set_delegation(&delegation)?;
        self.update_staking_state(&delegation)?;

        if self.exceeds_delegation_limit(&validator)? {
            return Err(Error::MaxDelegationsLimit);
        }
        if validator.scheduled_to_unbond {
            self.unschedule_unbond(&mut validator)?;
        }

        log::debug!(
            "Height {}: {} delegated {} {} to {} for {} shares",
            ctx.height,
            delegator,
            amount,
            denom,
            validator.operator,
            issued_shares
        );
        self.emit(Event::DelegationModified {
            delegator,
            validator: validator.operator,
        });

        Ok(issued_shares)
    }

    /// Converts a token amount into the shares to unbond.
    ///
    /// Fails if even the truncated conversion exceeds the shares held. The
    /// exact conversion is capped at the shares held so that a full exit
    /// succeeds despite rounding.
    pub fn validate_unbond_amount(
        &self,
        delegator: Address,
        validator: Address,
        op: OpType,
        amount: Amount,
    ) -> Result<Decimal> {
        let validator = self.validator_or_err(&validator)?;
        let delegation = self
            .delegation(&delegator, &validator.operator)?
            .ok_or(Error::NoDelegation)?;
        let held = delegation.shares(op);

        let pool = validator.pool(op);
        let shares = pool.shares_from_tokens(amount)?;
        let truncated_shares = pool.shares_from_tokens_truncated(amount)?;
        if truncated_shares > held {
            return Err(Error::BadSharesAmount);
        }

        Ok(shares.min(held))
    }

    /// Burns `shares` of the delegation and returns the tokens they were
    /// worth. The tokens stay in whichever pool held them.
    ///
    /// With `reschedule` the validator's forced unbond schedule is updated
    /// to match its new delegation totals.
    pub(super) fn unbond(
        &mut self,
        ctx: &BlockCtx,
        delegator: Address,
        validator: Address,
        op: OpType,
        shares: Decimal,
        reschedule: bool,
    ) -> Result<Amount> {
        let mut delegation = self
            .delegation(&delegator, &validator)?
            .ok_or(Error::NoDelegation)?;
        if delegation.shares(op) < shares {
            return Err(Error::NotEnoughDelegationShares);
        }
        let mut validator = self.validator_or_err(&validator)?;

        let held = delegation.shares_mut(op);
        *held = (*held - shares)?;

        if op == OpType::Bonding && delegator == validator.operator && !validator.jailed {
            let self_stake = validator
                .bonding
                .tokens_from_shares(delegation.bonding_shares)?
                .truncate_amount()?;
            if self_stake < validator.min_self_delegation {
                log::info!(
                    "Self delegation of {} fell below its minimum",
                    validator.operator
                );
                self.jail_validator(&mut validator)?;
            }
        }

        self.set_delegation(&delegation)?;
        self.update_staking_state(&delegation)?;

        let amount = validator.pool_mut(op).remove_delegator_shares(shares)?;
        self.set_validator(&validator)?;

        if !self.remove_validator_if_empty(&validator)? && reschedule {
            self.update_unbond_schedule(ctx, &mut validator)?;
        }

        self.emit(Event::DelegationModified {
            delegator,
            validator: validator.operator,
        });

        Ok(amount)
    }

    /// Schedules a forced unbond if the validator is over its delegation
    /// limit, or cancels a pending one if it no longer is.
    pub(super) fn update_unbond_schedule(
        &mut self,
        ctx: &BlockCtx,
        validator: &mut Validator,
    ) -> Result<()> {
        let exceeds = self.exceeds_delegation_limit(validator)?;
        match (exceeds, validator.scheduled_to_unbond) {
            (true, false) => self.schedule_unbond(ctx, validator),
            (false, true) => self.unschedule_unbond(validator),
            _ => Ok(()),
        }
    }
}
