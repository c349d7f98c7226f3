use crate::{Error, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A whole number of token units.
#[derive(
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[serde(transparent)]
pub struct Amount(pub(crate) u64);

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Amount {
    pub const fn new(value: u64) -> Self {
        Amount(value)
    }

    pub const fn zero() -> Self {
        Amount(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for u64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Add<Amount> for Amount {
    type Output = Result<Amount>;

    fn add(self, other: Amount) -> Result<Amount> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(Error::Overflow)
    }
}

impl Sub<Amount> for Amount {
    type Output = Result<Amount>;

    fn sub(self, other: Amount) -> Result<Amount> {
        self.0
            .checked_sub(other.0)
            .map(Amount)
            .ok_or(Error::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops() -> Result<()> {
        let v = Amount::new(2);
        let w = Amount::new(3);

        assert_eq!((v + w)?, Amount::new(5));
        assert_eq!((w - v)?, Amount::new(1));
        (v - w).expect_err("Should not underflow");
        (Amount::new(u64::MAX) + v).expect_err("Should not overflow");

        Ok(())
    }
}
