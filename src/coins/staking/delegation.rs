use super::Staking;
use crate::coins::{Address, Decimal};
use crate::store::Store;
use crate::Result;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// The token class an operation acts on.
#[derive(
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
)]
pub enum OpType {
    Bonding,
    Liquidity,
}

impl OpType {
    pub const ALL: [OpType; 2] = [OpType::Bonding, OpType::Liquidity];
}

/// A delegator's shares of one validator's two pools.
#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Clone, PartialEq,
)]
pub struct Delegation {
    pub delegator: Address,
    pub validator: Address,
    pub bonding_shares: Decimal,
    pub lp_shares: Decimal,
}

impl Delegation {
    pub fn new(delegator: Address, validator: Address) -> Self {
        Delegation {
            delegator,
            validator,
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

    pub fn shares_mut(&mut self, op: OpType) -> &mut Decimal {
        match op {
            OpType::Bonding => &mut self.bonding_shares,
            OpType::Liquidity => &mut self.lp_shares,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bonding_shares.is_zero() && self.lp_shares.is_zero()
    }
}

impl<S: Store> Staking<S> {
    pub fn delegation(&self, delegator: &Address, validator: &Address) -> Result<Option<Delegation>> {
        self.delegations.get(&self.store, &(*delegator, *validator))
    }

    /// Every delegation made by `delegator`, ordered by validator address.
    pub fn delegator_delegations(&self, delegator: &Address) -> Result<Vec<Delegation>> {
        self.delegations
            .iter_prefix(&self.store, delegator)
            .map(|entry| entry.map(|(_, delegation)| delegation))
            .collect()
    }

    /// Every delegation to `validator`, read through its staking state rather
    /// than a ledger scan.
    pub fn validator_delegations(&self, validator: &Address) -> Result<Vec<Delegation>> {
        let state = match self.staking_state(validator)? {
            Some(state) => state,
            None => return Ok(vec![]),
        };
        let mut delegations = vec![];
        for entry in state.entries() {
            if let Some(delegation) = self.delegation(&entry.address, validator)? {
                delegations.push(delegation);
            }
        }
        Ok(delegations)
    }

    pub(crate) fn set_delegation(&mut self, delegation: &Delegation) -> Result<()> {
        let key = (delegation.delegator, delegation.validator);
        if delegation.is_empty() {
            self.delegations.remove(&mut self.store, &key)
        } else {
            self.delegations.insert(&mut self.store, &key, delegation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_by_op_type() -> Result<()> {
        let mut delegation = Delegation::new(Address::from([1; 20]), Address::from([2; 20]));
        assert!(delegation.is_empty());

        *delegation.shares_mut(OpType::Liquidity) = Decimal::from(5u64);
        assert_eq!(delegation.shares(OpType::Liquidity), Decimal::from(5u64));
        assert_eq!(delegation.shares(OpType::Bonding), Decimal::zero());
        assert!(!delegation.is_empty());
        Ok(())
    }
}
