use super::{DVVTriplet, Event, OpType, Staking, UnbondReason};
use crate::coins::Address;
use crate::state_machine::BlockCtx;
use crate::store::Store;
use crate::Result;

impl<S: Store> Staking<S> {
    /// Unwinds every position of `delegator` in the given token class
    /// without waiting for maturity.
    ///
    /// Pending redelegations are completed first, then every delegation is
    /// undelegated, then every unbonding entry (including the ones just
    /// created) is released. One event is emitted per redelegation triplet
    /// and per unbonding validator.
    pub(super) fn force_remove_typed_delegations_inner(
        &mut self,
        ctx: &BlockCtx,
        delegator: Address,
        op: OpType,
    ) -> Result<()> {
        let triplets = self
            .redelegation_queue
            .items(&self.store, |t| t.delegator == delegator)?;
        for triplet in triplets {
            let DVVTriplet {
                src_validator,
                dst_validator,
                ..
            } = triplet;
            if self
                .redelegation(&delegator, &src_validator, &dst_validator)?
                .is_none()
            {
                continue;
            }
            let (amount, count) = self.remove_redelegation_entries(
                delegator,
                src_validator,
                dst_validator,
                |entry| entry.op_type == op,
            )?;
            if count > 0 {
                self.emit(Event::CompleteRedelegation {
                    delegator,
                    src_validator,
                    dst_validator,
                    amount,
                });
            }
        }

        for delegation in self.delegator_delegations(&delegator)? {
            let shares = delegation.shares(op);
            if shares.is_zero() {
                continue;
            }
            self.undelegate_inner(
                ctx,
                delegator,
                delegation.validator,
                op,
                shares,
                UnbondReason::ForceRemove,
            )?;
        }

        let pairs = self
            .unbonding_queue
            .items(&self.store, |p| p.delegator == delegator)?;
        for pair in pairs {
            let validator = pair.validator;
            if self.unbonding_delegation(&delegator, &validator)?.is_none() {
                continue;
            }
            let (amount, count) =
                self.remove_unbonding_entries(delegator, validator, |entry| entry.op_type == op)?;
            if count > 0 {
                self.emit(Event::CompleteUnbonding {
                    delegator,
                    validator,
                    amount,
                });
            }
        }

        log::info!("Removed all {:?} delegations of {}", op, delegator);
        Ok(())
    }

    pub(super) fn ban_account_inner(&mut self, ctx: &BlockCtx, address: Address) -> Result<()> {
        if !self.banned_accounts.contains_key(&self.store, &address)? {
            self.banned_accounts
                .insert(&mut self.store, &address, &ctx.height)?;
            log::info!("Banned account {} at height {}", address, ctx.height);
        }
        for op in OpType::ALL {
            self.force_remove_typed_delegations_inner(ctx, address, op)?;
        }
        Ok(())
    }
}
