use super::{Delegation, OpType, Staking, Validator};
use crate::coins::{Address, Amount, Decimal};
use crate::store::Store;
use crate::{Error, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Clone, PartialEq,
)]
pub struct DelegatorShares {
    pub address: Address,
    pub bonding_shares: Decimal,
    pub lp_shares: Decimal,
}

impl DelegatorShares {
    pub fn new(address: Address) -> Self {
        DelegatorShares {
            address,
            bonding_shares: Decimal::zero(),
            lp_shares: Decimal::zero(),
        }
    }

    pub fn shares(&self, op: OpType) -> Decimal {
        match op {
            OpType::Bonding => self.bonding_shares,
            OpType::Liquidity => self.lp_shares,
        }
    }
}

/// Every delegator's shares of one validator, with the operator's own
/// delegation kept apart from the others.
///
/// This lets the delegation limit be checked, and over-limit delegations be
/// reduced, by reading one record per validator.
#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Clone, PartialEq,
)]
pub struct ValidatorStakingState {
    pub operator: DelegatorShares,
    /// Non-operator delegators, sorted by address.
    pub delegators: Vec<DelegatorShares>,
}

impl ValidatorStakingState {
    pub fn new(operator: Address) -> Self {
        ValidatorStakingState {
            operator: DelegatorShares::new(operator),
            delegators: vec![],
        }
    }

    pub fn get(&self, address: &Address) -> Option<&DelegatorShares> {
        if *address == self.operator.address {
            return Some(&self.operator);
        }
        self.delegators
            .binary_search_by_key(address, |d| d.address)
            .ok()
            .map(|i| &self.delegators[i])
    }

    /// Records a delegator's current shares. Delegators other than the
    /// operator are dropped once both balances are zero.
    pub fn set(&mut self, address: Address, bonding_shares: Decimal, lp_shares: Decimal) {
        if address == self.operator.address {
            self.operator.bonding_shares = bonding_shares;
            self.operator.lp_shares = lp_shares;
            return;
        }

        let empty = bonding_shares.is_zero() && lp_shares.is_zero();
        match self.delegators.binary_search_by_key(&address, |d| d.address) {
            Ok(i) if empty => {
                self.delegators.remove(i);
            }
            Ok(i) => {
                self.delegators[i].bonding_shares = bonding_shares;
                self.delegators[i].lp_shares = lp_shares;
            }
            Err(_) if empty => {}
            Err(i) => self.delegators.insert(
                i,
                DelegatorShares {
                    address,
                    bonding_shares,
                    lp_shares,
                },
            ),
        }
    }

    /// The operator followed by every other delegator.
    pub fn entries(&self) -> impl Iterator<Item = &DelegatorShares> {
        std::iter::once(&self.operator).chain(self.delegators.iter())
    }

    pub fn total_shares(&self, op: OpType) -> Result<Decimal> {
        self.entries()
            .try_fold(Decimal::zero(), |sum, entry| sum + entry.shares(op))
    }
}

impl<S: Store> Staking<S> {
    pub fn staking_state(&self, validator: &Address) -> Result<Option<ValidatorStakingState>> {
        self.staking_states.get(&self.store, validator)
    }

    pub(crate) fn staking_state_or_err(&self, validator: &Validator) -> Result<ValidatorStakingState> {
        self.staking_state(&validator.operator)?.ok_or_else(|| {
            Error::invariant(format!(
                "Missing staking state for validator {}",
                validator.operator
            ))
        })
    }

    pub(crate) fn update_staking_state(&mut self, delegation: &Delegation) -> Result<()> {
        let key = delegation.validator;
        let mut state = self.staking_states.get(&self.store, &key)?.ok_or_else(|| {
            Error::invariant(format!(
                "Missing staking state for validator {}",
                delegation.validator
            ))
        })?;
        state.set(
            delegation.delegator,
            delegation.bonding_shares,
            delegation.lp_shares,
        );
        self.staking_states.insert(&mut self.store, &key, &state)
    }

    /// Token value of the operator's own bonding shares.
    pub(crate) fn self_stake(
        &self,
        validator: &Validator,
        state: &ValidatorStakingState,
    ) -> Result<Amount> {
        validator
            .bonding
            .tokens_from_shares(state.operator.bonding_shares)?
            .truncate_amount()
    }

    /// The most bonding tokens the validator may hold given its self stake.
    pub(crate) fn delegation_limit(
        &self,
        validator: &Validator,
        state: &ValidatorStakingState,
    ) -> Result<Decimal> {
        Decimal::from(self.self_stake(validator, state)?) * self.params.max_delegations_ratio
    }

    pub(crate) fn exceeds_delegation_limit(&self, validator: &Validator) -> Result<bool> {
        let state = self.staking_state_or_err(validator)?;
        let limit = self.delegation_limit(validator, &state)?;
        Ok(Decimal::from(validator.bonding.tokens) > limit)
    }
}
