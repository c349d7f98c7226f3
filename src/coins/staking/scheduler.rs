//! Forced unbonding of validators whose delegations outgrow their self stake.
//!
//! A validator above its delegation limit is scheduled for a forced unbond
//! `scheduled_unbond_delay` seconds later. Any operation bringing it back
//! under the limit cancels the schedule. When the schedule matures, its
//! non-operator delegations are reduced proportionally down to the limit.
use super::{Event, OpType, Staking, UnbondReason, Validator};
use crate::coins::{Address, Amount, Coin, Decimal};
use crate::state_machine::BlockCtx;
use crate::store::Store;
use crate::{Error, Result};

impl<S: Store> Staking<S> {
    pub fn scheduled_unbond_queue_timeslice(&self, time: u64) -> Result<Vec<Address>> {
        self.scheduled_unbond_queue.bucket(&self.store, time)
    }

    pub(super) fn schedule_unbond(
        &mut self,
        ctx: &BlockCtx,
        validator: &mut Validator,
    ) -> Result<()> {
        let start_time = ctx
            .time
            .checked_add(self.params.scheduled_unbond_delay)
            .ok_or(Error::Overflow)?;
        validator.scheduled_to_unbond = true;
        validator.scheduled_unbond_height = ctx.height;
        validator.scheduled_unbond_start_time = start_time;
        self.set_validator(validator)?;
        self.scheduled_unbond_queue
            .insert(&mut self.store, start_time, validator.operator)?;

        log::warn!(
            "Validator {} exceeds its delegation limit, forced unbond at {}",
            validator.operator,
            start_time
        );
        self.emit(Event::ValidatorScheduledToUnbond {
            validator: validator.operator,
            height: ctx.height,
            start_time,
        });
        Ok(())
    }

    pub(super) fn unschedule_unbond(&mut self, validator: &mut Validator) -> Result<()> {
        self.remove_from_scheduled_unbond_queue(validator)?;
        validator.scheduled_to_unbond = false;
        validator.scheduled_unbond_height = 0;
        validator.scheduled_unbond_start_time = 0;
        self.set_validator(validator)?;

        log::info!("Validator {} is back under its delegation limit", validator.operator);
        self.emit(Event::ValidatorUnscheduled {
            validator: validator.operator,
        });
        Ok(())
    }

    pub(super) fn remove_from_scheduled_unbond_queue(&mut self, validator: &Validator) -> Result<()> {
        self.scheduled_unbond_queue.remove(
            &mut self.store,
            validator.scheduled_unbond_start_time,
            &validator.operator,
        )
    }

    /// Forcibly unbonds every validator whose schedule has matured.
    pub(super) fn process_scheduled_unbonds(&mut self, ctx: &BlockCtx) -> Result<()> {
        let operators = self
            .scheduled_unbond_queue
            .dequeue_matured(&mut self.store, ctx.time)?;
        for operator in operators {
            let validator = match self.validator(&operator)? {
                Some(validator) => validator,
                None => {
                    log::debug!("Scheduled validator {} no longer exists", operator);
                    continue;
                }
            };
            if !validator.scheduled_to_unbond {
                return Err(Error::invariant(format!(
                    "Validator {} is queued for a forced unbond but not scheduled",
                    operator
                )));
            }

            self.reduce_to_delegation_limit(ctx, &operator)?;

            // reduction may have removed the validator or cleared the flag
            if let Some(mut validator) = self.validator(&operator)? {
                if validator.scheduled_to_unbond {
                    validator.scheduled_to_unbond = false;
                    validator.scheduled_unbond_height = 0;
                    validator.scheduled_unbond_start_time = 0;
                    self.set_validator(&validator)?;
                }
            }
        }
        Ok(())
    }

    /// Reduces the validator's non-operator delegations so its bonding
    /// tokens fit within the delegation limit.
    ///
    /// The reduction is split across delegators in proportion to their
    /// stake, in address order. The last delegator takes whatever remains
    /// after the others' rounded-down cuts, capped at its own stake. The
    /// forced unbond schedule is re-evaluated once, after every cut.
    pub(super) fn reduce_to_delegation_limit(
        &mut self,
        ctx: &BlockCtx,
        operator: &Address,
    ) -> Result<()> {
        let validator = self.validator_or_err(operator)?;
        let state = self.staking_state_or_err(&validator)?;
        let limit = self.delegation_limit(&validator, &state)?;
        let total = Decimal::from(validator.bonding.tokens);
        if total <= limit {
            return Ok(());
        }

        let mut stakes: Vec<(Address, Amount)> = vec![];
        for delegator in state.delegators.iter() {
            if delegator.bonding_shares.is_zero() {
                continue;
            }
            let tokens = validator
                .bonding
                .tokens_from_shares_truncated(delegator.bonding_shares)?
                .truncate_amount()?;
            if !tokens.is_zero() {
                stakes.push((delegator.address, tokens));
            }
        }
        let delegated = stakes
            .iter()
            .try_fold(Amount::zero(), |sum, (_, tokens)| sum + *tokens)?;
        let needed = (total - limit)?.ceil_amount()?.min(delegated);
        if needed.is_zero() {
            return Ok(());
        }

        log::warn!(
            "Reducing delegations to {} by {} to meet its delegation limit",
            operator,
            needed
        );

        let denom = self.params.bond_denom.clone();
        let mut distributed = Amount::zero();
        let last = stakes.len() - 1;
        for (i, (delegator, tokens)) in stakes.into_iter().enumerate() {
            let cut = if i == last {
                (needed - distributed)?.min(tokens)
            } else {
                (Decimal::from(needed) * tokens)?
                    .quo_truncate(Decimal::from(delegated))?
                    .truncate_amount()?
            };
            if cut.is_zero() {
                continue;
            }
            distributed = (distributed + cut)?;

            let validator = self.validator_or_err(operator)?;
            let held = self
                .delegation(&delegator, operator)?
                .map(|d| d.shares(OpType::Bonding))
                .unwrap_or_default();
            let shares = validator.bonding.shares_from_tokens(cut)?.min(held);
            if !shares.is_positive() {
                continue;
            }
            let (_, amount) = self.undelegate_inner(
                ctx,
                delegator,
                *operator,
                OpType::Bonding,
                shares,
                UnbondReason::DelegationLimit,
            )?;

            self.emit(Event::ForcedUnbond {
                validator: *operator,
                delegator,
                amount: Coin::new(denom.as_str(), amount),
            });
        }

        if let Some(mut validator) = self.validator(operator)? {
            self.update_unbond_schedule(ctx, &mut validator)?;
        }

        Ok(())
    }

    /// Reduces every validator above the delegation limit down to it.
    pub(super) fn rebalance_all_validators(&mut self, ctx: &BlockCtx) -> Result<()> {
        for validator in self.validators()? {
            if self.exceeds_delegation_limit(&validator)? {
                self.reduce_to_delegation_limit(ctx, &validator.operator)?;
            }
        }
        Ok(())
    }
}
