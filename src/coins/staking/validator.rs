use super::{Event, OpType, Staking, TokenPool, ValidatorStakingState};
use crate::coins::{Address, Amount, ConsensusKey, Decimal};
use crate::state_machine::BlockCtx;
use crate::store::Store;
use std::cmp::Reverse;
use crate::{Error, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Status {
    Unbonded,
    Unbonding,
    Bonded,
}

#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Default, Clone, PartialEq,
)]
pub struct Commission {
    pub rate: Decimal,
    pub max_rate: Decimal,
    pub max_change_rate: Decimal,
}

impl Commission {
    pub fn validate(&self) -> Result<()> {
        let one = Decimal::one();
        if self.rate.is_negative() || self.max_rate.is_negative() {
            return Err(Error::Commission("Commission must not be negative".into()));
        }
        if self.max_rate > one {
            return Err(Error::Commission("Max commission cannot exceed 1".into()));
        }
        if self.rate > self.max_rate {
            return Err(Error::Commission(
                "Commission rate cannot exceed max commission".into(),
            ));
        }
        if self.max_change_rate.is_negative() || self.max_change_rate > self.max_rate {
            return Err(Error::Commission(
                "Max change rate must be between zero and max commission".into(),
            ));
        }

        Ok(())
    }
}

/// The parameters an operator declares when registering a validator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Declaration {
    pub operator: Address,
    pub consensus_key: ConsensusKey,
    pub commission: Commission,
    pub min_self_delegation: Amount,
}

#[derive(BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Validator {
    pub operator: Address,
    pub consensus_key: ConsensusKey,
    pub jailed: bool,
    pub scheduled_to_unbond: bool,
    pub status: Status,
    pub bonding: TokenPool,
    pub liquidity: TokenPool,
    pub commission: Commission,
    pub min_self_delegation: Amount,
    pub unbonding_height: u64,
    pub unbonding_completion_time: u64,
    pub scheduled_unbond_height: u64,
    pub scheduled_unbond_start_time: u64,
}

impl Validator {
    pub fn new(declaration: Declaration) -> Self {
        Validator {
            operator: declaration.operator,
            consensus_key: declaration.consensus_key,
            jailed: false,
            scheduled_to_unbond: false,
            status: Status::Unbonded,
            bonding: TokenPool::default(),
            liquidity: TokenPool::default(),
            commission: declaration.commission,
            min_self_delegation: declaration.min_self_delegation,
            unbonding_height: 0,
            unbonding_completion_time: 0,
            scheduled_unbond_height: 0,
            scheduled_unbond_start_time: 0,
        }
    }

    pub fn pool(&self, op: OpType) -> &TokenPool {
        match op {
            OpType::Bonding => &self.bonding,
            OpType::Liquidity => &self.liquidity,
        }
    }

    pub fn pool_mut(&mut self, op: OpType) -> &mut TokenPool {
        match op {
            OpType::Bonding => &mut self.bonding,
            OpType::Liquidity => &mut self.liquidity,
        }
    }

    pub fn is_bonded(&self) -> bool {
        self.status == Status::Bonded
    }

    /// Consensus power derived from bonding tokens only.
    pub fn consensus_power(&self, power_reduction: u64) -> u64 {
        self.bonding.tokens.value() / power_reduction.max(1)
    }

    pub fn total_tokens(&self) -> Result<Amount> {
        self.bonding.tokens + self.liquidity.tokens
    }

    fn is_removable(&self) -> bool {
        self.status == Status::Unbonded
            && self.bonding.delegator_shares.is_zero()
            && self.liquidity.delegator_shares.is_zero()
    }
}

impl<S: Store> Staking<S> {
    pub fn validator(&self, operator: &Address) -> Result<Option<Validator>> {
        self.validators.get(&self.store, operator)
    }

    pub(crate) fn validator_or_err(&self, operator: &Address) -> Result<Validator> {
        self.validator(operator)?.ok_or(Error::NoValidatorFound)
    }

    /// All validators, ordered by operator address.
    pub fn validators(&self) -> Result<Vec<Validator>> {
        self.validators
            .iter(&self.store)
            .map(|entry| entry.map(|(_, validator)| validator))
            .collect()
    }

    pub fn bonded_validators(&self) -> Result<Vec<Validator>> {
        Ok(self
            .validators()?
            .into_iter()
            .filter(Validator::is_bonded)
            .collect())
    }

    /// Unjailed validators ordered by descending consensus power, ties broken
    /// by ascending operator address.
    pub fn validators_by_power(&self) -> Result<Vec<Validator>> {
        self.validators_by_power
            .iter(&self.store)
            .map(|entry| {
                let ((_, operator), ()) = entry?;
                self.validator(&operator)?.ok_or_else(|| {
                    Error::invariant(format!("Power index references missing validator {}", operator))
                })
            })
            .collect()
    }

    pub fn validator_by_consensus_key(&self, key: &ConsensusKey) -> Result<Option<Validator>> {
        let cons_addr = key.address();
        match self.validators_by_cons_addr.get(&self.store, &cons_addr)? {
            Some(operator) => self.validator(&operator),
            None => Ok(None),
        }
    }

    /// Persists a validator and moves its power index entry.
    pub(crate) fn set_validator(&mut self, validator: &Validator) -> Result<()> {
        let operator = validator.operator;
        self.remove_from_power_index(&operator)?;
        if !validator.jailed {
            let power = validator.consensus_power(self.params.power_reduction);
            self.validators_by_power
                .insert(&mut self.store, &(Reverse(power), operator), &())?;
            self.last_indexed_power
                .insert(&mut self.store, &operator, &power)?;
        }

        self.validators.insert(&mut self.store, &operator, validator)
    }

    fn remove_from_power_index(&mut self, operator: &Address) -> Result<()> {
        if let Some(power) = self.last_indexed_power.get(&self.store, operator)? {
            self.validators_by_power
                .remove(&mut self.store, &(Reverse(power), *operator))?;
            self.last_indexed_power.remove(&mut self.store, operator)?;
        }
        Ok(())
    }

    pub(crate) fn remove_validator(&mut self, validator: &Validator) -> Result<()> {
        if validator.status != Status::Unbonded {
            return Err(Error::invariant("Cannot remove a validator which is not unbonded"));
        }
        if !validator.total_tokens()?.is_zero() {
            return Err(Error::invariant("Cannot remove a validator which holds tokens"));
        }
        if !validator.bonding.delegator_shares.is_zero() {
            return Err(Error::invariant(
                "Cannot remove a validator with outstanding delegator shares",
            ));
        }

        let operator = validator.operator;
        self.remove_from_power_index(&operator)?;
        self.validators_by_cons_addr
            .remove(&mut self.store, &validator.consensus_key.address())?;
        self.staking_states.remove(&mut self.store, &operator)?;
        if validator.scheduled_to_unbond {
            self.remove_from_scheduled_unbond_queue(validator)?;
        }
        self.validators.remove(&mut self.store, &operator)?;

        log::info!("Removed validator {}", operator);
        self.emit(Event::ValidatorRemoved {
            validator: operator,
        });
        Ok(())
    }

    /// Removes `validator` if it is unbonded and has no delegations left.
    pub(crate) fn remove_validator_if_empty(&mut self, validator: &Validator) -> Result<bool> {
        if !validator.is_removable() {
            return Ok(false);
        }
        self.remove_validator(validator)?;
        Ok(true)
    }

    pub(crate) fn jail_validator(&mut self, validator: &mut Validator) -> Result<()> {
        if validator.jailed {
            return Ok(());
        }
        validator.jailed = true;
        self.set_validator(validator)?;

        log::info!("Jailed validator {}", validator.operator);
        self.emit(Event::ValidatorJailed {
            validator: validator.operator,
        });
        Ok(())
    }

    pub(super) fn unjail_inner(&mut self, operator: Address) -> Result<()> {
        let mut validator = self.validator_or_err(&operator)?;
        if !validator.jailed {
            return Err(Error::ValidatorNotJailed);
        }
        let state = self.staking_state_or_err(&validator)?;
        if self.self_stake(&validator, &state)? < validator.min_self_delegation {
            return Err(Error::SelfDelegationTooLow);
        }
        validator.jailed = false;
        self.set_validator(&validator)?;
        log::info!("Unjailed validator {}", operator);

        Ok(())
    }

    pub(super) fn create_validator_inner(
        &mut self,
        ctx: &BlockCtx,
        declaration: Declaration,
        self_bond: Amount,
    ) -> Result<()> {
        let operator = declaration.operator;
        if self.validator(&operator)?.is_some() {
            return Err(Error::ValidatorExists);
        }
        let cons_addr = declaration.consensus_key.address();
        if self.validators_by_cons_addr.contains_key(&self.store, &cons_addr)? {
            return Err(Error::ConsensusKeyExists);
        }
        let count = self.validators.len(&self.store)?;
        if count >= self.params.max_validators {
            return Err(Error::MaxValidators);
        }
        declaration.commission.validate()?;
        if declaration.min_self_delegation < self.params.min_self_delegation_lvl {
            return Err(Error::InvalidAmount(format!(
                "Minimum self delegation must be at least {}",
                self.params.min_self_delegation_lvl
            )));
        }
        if self_bond < declaration.min_self_delegation {
            return Err(Error::SelfDelegationTooLow);
        }

        let validator = Validator::new(declaration);
        self.validators_by_cons_addr
            .insert(&mut self.store, &cons_addr, &operator)?;
        self.set_validator(&validator)?;
        self.staking_states.insert(
            &mut self.store,
            &operator,
            &ValidatorStakingState::new(operator),
        )?;
        log::info!("Created validator {}", operator);

        self.delegate_inner(
            ctx,
            operator,
            OpType::Bonding,
            self_bond,
            Status::Unbonded,
            validator,
            true,
        )?;

        Ok(())
    }

    /// Moves a validator into the active set, transferring its bonding tokens
    /// into the bonded pool.
    pub(super) fn bond_validator_inner(&mut self, operator: Address) -> Result<()> {
        let mut validator = self.validator_or_err(&operator)?;
        if validator.jailed {
            return Err(Error::ValidatorJailed);
        }
        if validator.is_bonded() {
            return Err(Error::invariant(format!("Validator {} is already bonded", operator)));
        }
        self.move_bonding_tokens(validator.bonding.tokens, false)?;
        validator.status = Status::Bonded;
        validator.unbonding_height = 0;
        validator.unbonding_completion_time = 0;
        self.set_validator(&validator)?;
        log::info!("Bonded validator {}", operator);

        Ok(())
    }

    pub(super) fn begin_unbonding_validator_inner(
        &mut self,
        ctx: &BlockCtx,
        operator: Address,
    ) -> Result<()> {
        let mut validator = self.validator_or_err(&operator)?;
        if !validator.is_bonded() {
            return Err(Error::invariant(format!(
                "Validator {} cannot begin unbonding from status {:?}",
                operator, validator.status
            )));
        }
        self.move_bonding_tokens(validator.bonding.tokens, true)?;
        validator.status = Status::Unbonding;
        validator.unbonding_height = ctx.height;
        validator.unbonding_completion_time = ctx
            .time
            .checked_add(self.params.unbonding_time)
            .ok_or(Error::Overflow)?;
        self.set_validator(&validator)?;
        log::info!(
            "Validator {} unbonding until {}",
            operator,
            validator.unbonding_completion_time
        );

        Ok(())
    }

    pub(super) fn complete_unbonding_validator_inner(&mut self, operator: Address) -> Result<()> {
        let mut validator = self.validator_or_err(&operator)?;
        if validator.status != Status::Unbonding {
            return Err(Error::invariant(format!(
                "Validator {} cannot complete unbonding from status {:?}",
                operator, validator.status
            )));
        }
        validator.status = Status::Unbonded;
        if !self.remove_validator_if_empty(&validator)? {
            self.set_validator(&validator)?;
        }
        log::info!("Validator {} unbonded", operator);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn commission(rate: Decimal, max_rate: Decimal, max_change_rate: Decimal) -> Commission {
        Commission {
            rate,
            max_rate,
            max_change_rate,
        }
    }

    #[test]
    fn commission_bounds() -> Result<()> {
        let tenth = Decimal::from(dec!(0.1));
        let half = Decimal::from(dec!(0.5));
        commission(tenth, half, tenth).validate()?;
        commission(half, tenth, tenth)
            .validate()
            .expect_err("rate above max");
        commission(tenth, Decimal::from(dec!(1.5)), tenth)
            .validate()
            .expect_err("max above one");
        commission(tenth, tenth, half)
            .validate()
            .expect_err("change rate above max");
        commission(Decimal::from(dec!(-0.1)), half, tenth)
            .validate()
            .expect_err("negative rate");
        Ok(())
    }

    #[test]
    fn consensus_power_uses_bonding_tokens() {
        let mut validator = Validator::new(Declaration {
            operator: Address::from([1; 20]),
            consensus_key: ConsensusKey([1; 32]),
            commission: Commission::default(),
            min_self_delegation: Amount::new(1),
        });
        validator.bonding.tokens = Amount::new(2_500_000);
        validator.liquidity.tokens = Amount::new(9_000_000);
        assert_eq!(validator.consensus_power(1_000_000), 2);
        assert_eq!(validator.pool(OpType::Liquidity).tokens, Amount::new(9_000_000));
    }
}
