use super::Staking;
use crate::coins::{Address, Amount};
use crate::collections::Key;
use crate::store::Store;
use crate::{Error, Result};

/// An account holding balances. Pools hold the tokens backing delegations
/// and unbonding entries; user accounts hold liquid funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Account {
    User(Address),
    /// Bonding tokens of bonded validators.
    BondedPool,
    /// Bonding tokens of validators which are not bonded, plus every
    /// unbonding bonding-token entry.
    NotBondedPool,
    /// Every liquidity token, bonded or unbonding.
    LiquidityPool,
}

impl Key for Account {
    fn append_key(&self, out: &mut Vec<u8>) {
        match self {
            Account::User(address) => {
                out.push(0);
                address.append_key(out);
            }
            Account::BondedPool => out.push(1),
            Account::NotBondedPool => out.push(2),
            Account::LiquidityPool => out.push(3),
        }
    }

    fn read_key(bytes: &[u8]) -> Result<(Self, &[u8])> {
        match bytes.split_first() {
            Some((&0, rest)) => {
                let (address, rest) = Address::read_key(rest)?;
                Ok((Account::User(address), rest))
            }
            Some((&1, rest)) => Ok((Account::BondedPool, rest)),
            Some((&2, rest)) => Ok((Account::NotBondedPool, rest)),
            Some((&3, rest)) => Ok((Account::LiquidityPool, rest)),
            _ => Err(Error::Store("Invalid account key".into())),
        }
    }
}

impl<S: Store> Staking<S> {
    pub fn balance(&self, account: Account, denom: &str) -> Result<Amount> {
        let key = (account, denom.to_string());
        Ok(self.balances.get(&self.store, &key)?.unwrap_or_default())
    }

    /// Credits new funds to an account.
    pub fn mint(&mut self, account: Account, denom: &str, amount: Amount) -> Result<()> {
        self.transact(|staking| staking.add_balance(account, denom, amount))
    }

    fn add_balance(&mut self, account: Account, denom: &str, amount: Amount) -> Result<()> {
        let balance = (self.balance(account, denom)? + amount)?;
        let key = (account, denom.to_string());
        self.balances.insert(&mut self.store, &key, &balance)
    }

    fn sub_balance(&mut self, account: Account, denom: &str, amount: Amount) -> Result<()> {
        let balance = self.balance(account, denom)?;
        if balance < amount {
            return Err(Error::InsufficientFunds(format!(
                "{:?} holds {}{}, needs {}{}",
                account, balance, denom, amount, denom
            )));
        }
        let key = (account, denom.to_string());
        let remaining = (balance - amount)?;
        if remaining.is_zero() {
            self.balances.remove(&mut self.store, &key)
        } else {
            self.balances.insert(&mut self.store, &key, &remaining)
        }
    }

    pub(crate) fn send(
        &mut self,
        from: Account,
        to: Account,
        denom: &str,
        amount: Amount,
    ) -> Result<()> {
        if amount.is_zero() || from == to {
            return Ok(());
        }
        self.sub_balance(from, denom, amount)?;
        self.add_balance(to, denom, amount)
    }

    /// Moves bonding tokens between the bonded and not-bonded pools.
    pub(crate) fn move_bonding_tokens(&mut self, amount: Amount, to_not_bonded: bool) -> Result<()> {
        let denom = self.params.bond_denom.clone();
        if to_not_bonded {
            self.send(Account::BondedPool, Account::NotBondedPool, &denom, amount)
        } else {
            self.send(Account::NotBondedPool, Account::BondedPool, &denom, amount)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coins::staking::Params;
    use crate::store::MapStore;

    #[test]
    fn send_moves_funds() -> Result<()> {
        let mut staking = Staking::new(MapStore::new(), Params::default())?;
        let alice = Account::User(Address::from([1; 20]));
        staking.mint(alice, "stake", Amount::new(100))?;

        staking.transact(|s| s.send(alice, Account::BondedPool, "stake", Amount::new(40)))?;
        assert_eq!(staking.balance(alice, "stake")?, Amount::new(60));
        assert_eq!(staking.balance(Account::BondedPool, "stake")?, Amount::new(40));
        assert_eq!(staking.balance(Account::BondedPool, "lpstake")?, Amount::zero());
        Ok(())
    }

    #[test]
    fn send_insufficient_funds() -> Result<()> {
        let mut staking = Staking::new(MapStore::new(), Params::default())?;
        let alice = Account::User(Address::from([1; 20]));
        staking.mint(alice, "stake", Amount::new(10))?;

        let err = staking
            .transact(|s| s.send(alice, Account::NotBondedPool, "stake", Amount::new(11)))
            .expect_err("should not overdraw");
        assert!(matches!(err, Error::InsufficientFunds(_)));
        assert_eq!(staking.balance(alice, "stake")?, Amount::new(10));
        Ok(())
    }
}
