use super::{Event, OpType, Staking, Status, Validator};
use crate::coins::{add_coin, Address, Amount, Coin, Decimal};
use crate::state_machine::BlockCtx;
use crate::store::Store;
use crate::{Error, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Clone, PartialEq,
)]
pub struct RedelegationEntry {
    pub creation_height: u64,
    pub completion_time: u64,
    pub op_type: OpType,
    pub initial_balance: Amount,
    /// Shares issued by the destination validator.
    pub shares_dst: Decimal,
}

impl RedelegationEntry {
    pub fn is_mature(&self, now: u64) -> bool {
        self.completion_time <= now
    }
}

#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Clone, PartialEq,
)]
pub struct Redelegation {
    pub delegator: Address,
    pub src_validator: Address,
    pub dst_validator: Address,
    pub entries: Vec<RedelegationEntry>,
}

/// A (delegator, source, destination) triplet in the redelegation queue.
#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct DVVTriplet {
    pub delegator: Address,
    pub src_validator: Address,
    pub dst_validator: Address,
}

impl<S: Store> Staking<S> {
    pub fn redelegation(
        &self,
        delegator: &Address,
        src: &Address,
        dst: &Address,
    ) -> Result<Option<Redelegation>> {
        self.redelegations
            .get(&self.store, &(*delegator, *src, *dst))
    }

    pub fn redelegations_from_src_validator(&self, src: &Address) -> Result<Vec<Redelegation>> {
        let mut redelegations = vec![];
        for entry in self.redelegations_by_src.iter_prefix(&self.store, src) {
            let ((_, delegator, dst), ()) = entry?;
            if let Some(red) = self.redelegation(&delegator, src, &dst)? {
                redelegations.push(red);
            }
        }
        Ok(redelegations)
    }

    pub fn redelegation_queue_timeslice(&self, time: u64) -> Result<Vec<DVVTriplet>> {
        self.redelegation_queue.bucket(&self.store, time)
    }

    fn set_redelegation(&mut self, red: &Redelegation) -> Result<()> {
        let key = (red.delegator, red.src_validator, red.dst_validator);
        let index_key = (red.src_validator, red.delegator, red.dst_validator);
        if red.entries.is_empty() {
            self.redelegations.remove(&mut self.store, &key)?;
            self.redelegations_by_src.remove(&mut self.store, &index_key)
        } else {
            self.redelegations.insert(&mut self.store, &key, red)?;
            self.redelegations_by_src
                .insert(&mut self.store, &index_key, &())
        }
    }

    fn has_max_redelegation_entries(
        &self,
        delegator: &Address,
        src: &Address,
        dst: &Address,
    ) -> Result<bool> {
        Ok(match self.redelegation(delegator, src, dst)? {
            Some(red) => red.entries.len() as u64 >= self.params.max_entries,
            None => false,
        })
    }

    /// When a redelegation away from `src` matures, and the height it is
    /// recorded at. `None` means it matures immediately.
    fn redelegation_completion(
        &self,
        ctx: &BlockCtx,
        src: &Validator,
    ) -> Result<Option<(u64, u64)>> {
        Ok(match src.status {
            Status::Bonded => {
                let completion_time = ctx
                    .time
                    .checked_add(self.params.unbonding_time)
                    .ok_or(Error::Overflow)?;
                Some((completion_time, ctx.height))
            }
            Status::Unbonding => Some((src.unbonding_completion_time, src.unbonding_height)),
            Status::Unbonded => None,
        })
    }

    pub(super) fn begin_redelegation_inner(
        &mut self,
        ctx: &BlockCtx,
        delegator: Address,
        src: Address,
        dst: Address,
        op: OpType,
        shares: Decimal,
    ) -> Result<u64> {
        if src == dst {
            return Err(Error::SelfRedelegation);
        }
        self.validator_or_err(&dst)?;
        let src_validator = self.validator_or_err(&src)?;
        if self.has_max_redelegation_entries(&delegator, &src, &dst)? {
            return Err(Error::MaxRedelegationEntries);
        }

        let src_status = src_validator.status;
        let completion = self.redelegation_completion(ctx, &src_validator)?;

        let amount = self.unbond(ctx, delegator, src, op, shares, true)?;
        if amount.is_zero() {
            return Err(Error::TinyRedelegationAmount);
        }

        let dst_validator = self.validator_or_err(&dst)?;
        let shares_dst =
            self.delegate_inner(ctx, delegator, op, amount, src_status, dst_validator, false)?;

        let (completion_time, height) = match completion {
            Some(completion) => completion,
            None => return Ok(ctx.time),
        };

        let mut red = self
            .redelegation(&delegator, &src, &dst)?
            .unwrap_or(Redelegation {
                delegator,
                src_validator: src,
                dst_validator: dst,
                entries: vec![],
            });
        red.entries.push(RedelegationEntry {
            creation_height: height,
            completion_time,
            op_type: op,
            initial_balance: amount,
            shares_dst,
        });
        self.set_redelegation(&red)?;
        self.redelegation_queue.insert(
            &mut self.store,
            completion_time,
            DVVTriplet {
                delegator,
                src_validator: src,
                dst_validator: dst,
            },
        )?;

        log::debug!(
            "{} redelegated {} {} from {} to {}, completes at {}",
            delegator,
            amount,
            self.params.denom(op),
            src,
            dst,
            completion_time
        );
        Ok(completion_time)
    }

    /// Removes the entries selected by `should_remove` and returns the sum of
    /// their initial balances and the number of entries removed.
    pub(super) fn remove_redelegation_entries<F>(
        &mut self,
        delegator: Address,
        src: Address,
        dst: Address,
        mut should_remove: F,
    ) -> Result<(Vec<Coin>, usize)>
    where
        F: FnMut(&RedelegationEntry) -> bool,
    {
        let mut red = self
            .redelegation(&delegator, &src, &dst)?
            .ok_or(Error::NoRedelegation)?;

        let (removed, kept): (Vec<_>, Vec<_>) =
            red.entries.drain(..).partition(|entry| should_remove(entry));
        red.entries = kept;

        let mut balances = vec![];
        for entry in removed.iter() {
            add_coin(
                &mut balances,
                self.params.denom(entry.op_type),
                entry.initial_balance,
            )?;
        }
        self.set_redelegation(&red)?;

        let triplet = DVVTriplet {
            delegator,
            src_validator: src,
            dst_validator: dst,
        };
        for entry in removed.iter() {
            let time = entry.completion_time;
            if !red.entries.iter().any(|e| e.completion_time == time) {
                self.redelegation_queue
                    .remove(&mut self.store, time, &triplet)?;
            }
        }

        Ok((balances, removed.len()))
    }

    pub(super) fn complete_redelegation_inner(
        &mut self,
        ctx: &BlockCtx,
        delegator: Address,
        src: Address,
        dst: Address,
    ) -> Result<Vec<Coin>> {
        let now = ctx.time;
        let (balances, count) =
            self.remove_redelegation_entries(delegator, src, dst, |entry| entry.is_mature(now))?;
        if count > 0 {
            self.emit(Event::CompleteRedelegation {
                delegator,
                src_validator: src,
                dst_validator: dst,
                amount: balances.clone(),
            });
        }

        Ok(balances)
    }

    pub(super) fn complete_matured_redelegations(&mut self, ctx: &BlockCtx) -> Result<()> {
        let triplets = self
            .redelegation_queue
            .dequeue_matured(&mut self.store, ctx.time)?;
        for triplet in triplets {
            let DVVTriplet {
                delegator,
                src_validator,
                dst_validator,
            } = triplet;
            if self
                .redelegation(&delegator, &src_validator, &dst_validator)?
                .is_none()
            {
                log::debug!(
                    "Skipping completed redelegation of {} from {} to {}",
                    delegator,
                    src_validator,
                    dst_validator
                );
                continue;
            }
            self.complete_redelegation_inner(ctx, delegator, src_validator, dst_validator)?;
        }
        Ok(())
    }
}
