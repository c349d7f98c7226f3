use crate::coins::{Amount, Decimal};
use crate::{Error, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Exchange-rate accounting for one token class of one validator.
///
/// Delegators hold shares of the pool rather than tokens, so events which
/// change the pool's tokens (slashing, rounding dust left behind by exits)
/// reprice every delegator at once instead of touching each delegation.
#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Default, Clone, PartialEq,
)]
pub struct TokenPool {
    pub tokens: Amount,
    pub delegator_shares: Decimal,
}

impl TokenPool {
    /// Returns true if the pool has outstanding shares but no tokens backing
    /// them, in which case no share price exists and new delegations must be
    /// rejected.
    pub fn has_invalid_ex_rate(&self) -> bool {
        self.tokens.is_zero() && self.delegator_shares.is_positive()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_zero() && self.delegator_shares.is_zero()
    }

    pub fn shares_from_tokens(&self, amount: Amount) -> Result<Decimal> {
        if self.tokens.is_zero() {
            return Err(Error::InsufficientShares);
        }
        (self.delegator_shares * amount)?.quo(self.tokens.into())
    }

    pub fn shares_from_tokens_truncated(&self, amount: Amount) -> Result<Decimal> {
        if self.tokens.is_zero() {
            return Err(Error::InsufficientShares);
        }
        (self.delegator_shares * amount)?.quo_truncate(self.tokens.into())
    }

    pub fn tokens_from_shares(&self, shares: Decimal) -> Result<Decimal> {
        if self.delegator_shares.is_zero() {
            return Ok(Decimal::zero());
        }
        (shares * self.tokens)?.quo(self.delegator_shares)
    }

    pub fn tokens_from_shares_truncated(&self, shares: Decimal) -> Result<Decimal> {
        if self.delegator_shares.is_zero() {
            return Ok(Decimal::zero());
        }
        (shares * self.tokens)?.quo_truncate(self.delegator_shares)
    }

    pub fn tokens_from_shares_round_up(&self, shares: Decimal) -> Result<Decimal> {
        if self.delegator_shares.is_zero() {
            return Ok(Decimal::zero());
        }
        (shares * self.tokens)?.quo_round_up(self.delegator_shares)
    }

    /// Adds tokens from a delegation and returns the shares issued for them.
    ///
    /// An empty pool issues shares 1:1, resetting the exchange rate.
    pub fn add_tokens_from_delegation(&mut self, amount: Amount) -> Result<Decimal> {
        let issued_shares = if self.delegator_shares.is_zero() {
            Decimal::from(amount)
        } else {
            if self.has_invalid_ex_rate() {
                return Err(Error::InvalidExchangeRate);
            }
            self.shares_from_tokens(amount)?
        };

        self.tokens = (self.tokens + amount)?;
        self.delegator_shares = (self.delegator_shares + issued_shares)?;

        Ok(issued_shares)
    }

    pub fn add_tokens(&mut self, amount: Amount) -> Result<()> {
        self.tokens = (self.tokens + amount)?;
        Ok(())
    }

    pub fn remove_tokens(&mut self, amount: Amount) -> Result<()> {
        if amount > self.tokens {
            return Err(Error::invariant(format!(
                "Attempted to remove {} tokens from a pool holding {}",
                amount, self.tokens
            )));
        }
        self.tokens = (self.tokens - amount)?;
        Ok(())
    }

    /// Burns `shares` and returns the tokens they were worth.
    ///
    /// The holder of the last outstanding shares receives every remaining
    /// token. Otherwise the token amount is truncated and the dust stays in
    /// the pool, raising the exchange rate for the remaining holders.
    pub fn remove_delegator_shares(&mut self, shares: Decimal) -> Result<Amount> {
        if shares.is_negative() || shares > self.delegator_shares {
            return Err(Error::invariant(format!(
                "Attempted to remove {} shares from a pool holding {}",
                shares, self.delegator_shares
            )));
        }
        let remaining_shares = (self.delegator_shares - shares)?;

        let issued_tokens = if remaining_shares.is_zero() {
            self.tokens
        } else {
            self.tokens_from_shares(shares)?.truncate_amount()?
        };
        self.remove_tokens(issued_tokens)?;
        self.delegator_shares = remaining_shares;

        Ok(issued_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pool(tokens: u64, shares: Decimal) -> TokenPool {
        TokenPool {
            tokens: Amount::new(tokens),
            delegator_shares: shares,
        }
    }

    #[test]
    fn first_delegation_sets_rate() -> Result<()> {
        let mut pool = TokenPool::default();
        let shares = pool.add_tokens_from_delegation(Amount::new(100))?;
        assert_eq!(shares, Decimal::from(100u64));
        assert_eq!(pool.tokens, Amount::new(100));
        Ok(())
    }

    #[test]
    fn empty_pool_has_no_share_price() {
        let pool = TokenPool::default();
        assert_eq!(
            pool.shares_from_tokens(Amount::new(1)),
            Err(Error::InsufficientShares)
        );
        assert_eq!(
            pool.shares_from_tokens_truncated(Amount::new(1)),
            Err(Error::InsufficientShares)
        );
        assert_eq!(pool.tokens_from_shares(Decimal::one()), Ok(Decimal::zero()));
    }

    #[test]
    fn rejects_invalid_exchange_rate() {
        let mut pool = pool(0, Decimal::from(10u64));
        assert!(pool.has_invalid_ex_rate());
        assert_eq!(
            pool.add_tokens_from_delegation(Amount::new(5)),
            Err(Error::InvalidExchangeRate)
        );
        assert_eq!(pool.delegator_shares, Decimal::from(10u64));
    }

    #[test]
    fn share_token_roundtrip() -> Result<()> {
        // rate is 2 tokens per share
        let pool = pool(200, Decimal::from(100u64));
        let shares = pool.shares_from_tokens(Amount::new(50))?;
        assert_eq!(shares, Decimal::from(25u64));
        assert_eq!(pool.tokens_from_shares(shares)?, Decimal::from(50u64));

        // uneven rate stays within one truncation unit
        let pool = pool_with_rate();
        let shares = pool.shares_from_tokens(Amount::new(10))?;
        let tokens = pool.tokens_from_shares_truncated(shares)?.truncate_amount()?;
        assert!(tokens == Amount::new(10) || tokens == Amount::new(9));
        Ok(())
    }

    fn pool_with_rate() -> TokenPool {
        pool(3, Decimal::from(dec!(1.000000000000000001)))
    }

    #[test]
    fn rounding_modes() -> Result<()> {
        let pool = pool(10, Decimal::from(3u64));
        let shares = Decimal::one();
        assert_eq!(
            pool.tokens_from_shares(shares)?,
            Decimal::from(dec!(3.333333333333333333))
        );
        assert_eq!(
            pool.tokens_from_shares_truncated(shares)?,
            Decimal::from(dec!(3.333333333333333333))
        );
        assert_eq!(
            pool.tokens_from_shares_round_up(shares)?,
            Decimal::from(dec!(3.333333333333333334))
        );
        Ok(())
    }

    #[test]
    fn last_holder_gets_dust() -> Result<()> {
        let mut pool = pool(10, Decimal::from(3u64));
        let first = pool.remove_delegator_shares(Decimal::one())?;
        assert_eq!(first, Amount::new(3));
        assert_eq!(pool.tokens, Amount::new(7));

        let second = pool.remove_delegator_shares(Decimal::one())?;
        assert_eq!(second, Amount::new(3));

        let last = pool.remove_delegator_shares(Decimal::one())?;
        assert_eq!(last, Amount::new(4));
        assert!(pool.is_empty());
        Ok(())
    }

    #[test]
    fn remove_too_much_is_fatal() {
        let mut pool = pool(10, Decimal::from(10u64));
        let err = pool.remove_tokens(Amount::new(11)).unwrap_err();
        assert!(err.is_fatal());
        let err = pool
            .remove_delegator_shares(Decimal::from(11u64))
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
