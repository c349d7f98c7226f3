use super::{Account, Event, OpType, Staking, Status};
use crate::coins::{add_coin, Address, Amount, Coin, Decimal};
use crate::state_machine::BlockCtx;
use crate::store::Store;
use crate::{Error, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Clone, PartialEq,
)]
pub struct UnbondingDelegationEntry {
    pub creation_height: u64,
    pub completion_time: u64,
    pub op_type: OpType,
    pub initial_balance: Amount,
    pub balance: Amount,
}

impl UnbondingDelegationEntry {
    pub fn is_mature(&self, now: u64) -> bool {
        self.completion_time <= now
    }
}

#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Clone, PartialEq,
)]
pub struct UnbondingDelegation {
    pub delegator: Address,
    pub validator: Address,
    pub entries: Vec<UnbondingDelegationEntry>,
}

/// A (delegator, validator) pair in the unbonding queue.
#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct DVPair {
    pub delegator: Address,
    pub validator: Address,
}

/// What an undelegation was started by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnbondReason {
    /// The delegator asked for it. Subject to the entry cap.
    Request,
    /// The delegator's positions are being forcibly removed.
    ForceRemove,
    /// A cut towards the validator's delegation limit. The caller
    /// re-evaluates the forced unbond schedule once all cuts are made.
    DelegationLimit,
}

impl<S: Store> Staking<S> {
    pub fn unbonding_delegation(
        &self,
        delegator: &Address,
        validator: &Address,
    ) -> Result<Option<UnbondingDelegation>> {
        self.unbonding_delegations
            .get(&self.store, &(*delegator, *validator))
    }

    pub fn unbonding_delegations_from_validator(
        &self,
        validator: &Address,
    ) -> Result<Vec<UnbondingDelegation>> {
        let mut ubds = vec![];
        for entry in self.unbonding_by_validator.iter_prefix(&self.store, validator) {
            let ((_, delegator), ()) = entry?;
            if let Some(ubd) = self.unbonding_delegation(&delegator, validator)? {
                ubds.push(ubd);
            }
        }
        Ok(ubds)
    }

    /// The pairs whose entries mature at `time`, in insertion order.
    pub fn unbonding_queue_timeslice(&self, time: u64) -> Result<Vec<DVPair>> {
        self.unbonding_queue.bucket(&self.store, time)
    }

    fn set_unbonding_delegation(&mut self, ubd: &UnbondingDelegation) -> Result<()> {
        let key = (ubd.delegator, ubd.validator);
        let index_key = (ubd.validator, ubd.delegator);
        if ubd.entries.is_empty() {
            self.unbonding_delegations.remove(&mut self.store, &key)?;
            self.unbonding_by_validator.remove(&mut self.store, &index_key)
        } else {
            self.unbonding_delegations.insert(&mut self.store, &key, ubd)?;
            self.unbonding_by_validator
                .insert(&mut self.store, &index_key, &())
        }
    }

    fn has_max_unbonding_entries(&self, delegator: &Address, validator: &Address) -> Result<bool> {
        Ok(match self.unbonding_delegation(delegator, validator)? {
            Some(ubd) => ubd.entries.len() as u64 >= self.params.max_entries,
            None => false,
        })
    }

    pub(super) fn undelegate_inner(
        &mut self,
        ctx: &BlockCtx,
        delegator: Address,
        validator: Address,
        op: OpType,
        shares: Decimal,
        reason: UnbondReason,
    ) -> Result<(u64, Amount)> {
        let status = self.validator_or_err(&validator)?.status;
        if reason == UnbondReason::Request
            && self.has_max_unbonding_entries(&delegator, &validator)?
        {
            return Err(Error::MaxUnbondingDelegationEntries);
        }
        let completion_time = ctx
            .time
            .checked_add(self.params.unbonding_time)
            .ok_or(Error::Overflow)?;

        let reschedule = reason != UnbondReason::DelegationLimit;
        let amount = self.unbond(ctx, delegator, validator, op, shares, reschedule)?;
        if op == OpType::Bonding && status == Status::Bonded {
            self.move_bonding_tokens(amount, true)?;
        }

        let mut ubd = self
            .unbonding_delegation(&delegator, &validator)?
            .unwrap_or(UnbondingDelegation {
                delegator,
                validator,
                entries: vec![],
            });
        ubd.entries.push(UnbondingDelegationEntry {
            creation_height: ctx.height,
            completion_time,
            op_type: op,
            initial_balance: amount,
            balance: amount,
        });
        self.set_unbonding_delegation(&ubd)?;
        self.unbonding_queue.insert(
            &mut self.store,
            completion_time,
            DVPair {
                delegator,
                validator,
            },
        )?;

        log::debug!(
            "{} undelegated {} {} from {}, completes at {}",
            delegator,
            amount,
            self.params.denom(op),
            validator,
            completion_time
        );
        Ok((completion_time, amount))
    }

    /// Removes the entries selected by `should_remove`, releasing their
    /// balances to the delegator. Returns the released coins and the number
    /// of entries removed.
    pub(super) fn remove_unbonding_entries<F>(
        &mut self,
        delegator: Address,
        validator: Address,
        mut should_remove: F,
    ) -> Result<(Vec<Coin>, usize)>
    where
        F: FnMut(&UnbondingDelegationEntry) -> bool,
    {
        let mut ubd = self
            .unbonding_delegation(&delegator, &validator)?
            .ok_or(Error::NoUnbondingDelegation)?;

        let (removed, kept): (Vec<_>, Vec<_>) =
            ubd.entries.drain(..).partition(|entry| should_remove(entry));
        ubd.entries = kept;

        let mut released = vec![];
        for entry in removed.iter() {
            if entry.balance.is_zero() {
                continue;
            }
            let pool = match entry.op_type {
                OpType::Bonding => Account::NotBondedPool,
                OpType::Liquidity => Account::LiquidityPool,
            };
            let denom = self.params.denom(entry.op_type).to_string();
            self.send(pool, Account::User(delegator), &denom, entry.balance)?;
            add_coin(&mut released, &denom, entry.balance)?;
        }
        self.set_unbonding_delegation(&ubd)?;

        let pair = DVPair {
            delegator,
            validator,
        };
        for entry in removed.iter() {
            let time = entry.completion_time;
            if !ubd.entries.iter().any(|e| e.completion_time == time) {
                self.unbonding_queue.remove(&mut self.store, time, &pair)?;
            }
        }

        Ok((released, removed.len()))
    }

    /// Releases every matured entry of the pair and returns the released
    /// coins, one per denomination.
    pub(super) fn complete_unbonding_with_amount(
        &mut self,
        ctx: &BlockCtx,
        delegator: Address,
        validator: Address,
    ) -> Result<Vec<Coin>> {
        let now = ctx.time;
        let (released, count) =
            self.remove_unbonding_entries(delegator, validator, |entry| entry.is_mature(now))?;
        if count > 0 {
            self.emit(Event::CompleteUnbonding {
                delegator,
                validator,
                amount: released.clone(),
            });
        }

        Ok(released)
    }

    pub(super) fn complete_matured_unbondings(&mut self, ctx: &BlockCtx) -> Result<()> {
        let pairs = self
            .unbonding_queue
            .dequeue_matured(&mut self.store, ctx.time)?;
        for pair in pairs {
            if self
                .unbonding_delegation(&pair.delegator, &pair.validator)?
                .is_none()
            {
                log::debug!(
                    "Skipping completed unbonding of {} from {}",
                    pair.delegator,
                    pair.validator
                );
                continue;
            }
            self.complete_unbonding_with_amount(ctx, pair.delegator, pair.validator)?;
        }
        Ok(())
    }
}
