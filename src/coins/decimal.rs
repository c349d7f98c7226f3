use super::Amount;
use crate::{Error, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use rust_decimal::{prelude::ToPrimitive, Decimal as NumDecimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

/// Number of fractional digits kept by rounding operations.
pub const PRECISION: u32 = 18;

/// A fixed-point decimal used for shares, ratios and voting power.
///
/// Arithmetic through the operator traits is checked and returns a
/// [Result]. Division is available in three modes: [Decimal::quo] rounds
/// half-to-even at [PRECISION] digits, [Decimal::quo_truncate] rounds toward
/// zero and [Decimal::quo_round_up] rounds away from zero.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Decimal {
    pub(crate) value: NumDecimal,
}

impl std::fmt::Display for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value.normalize())
    }
}

impl BorshSerialize for Decimal {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.value.serialize())
    }
}

impl BorshDeserialize for Decimal {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut bytes = [0u8; 16];
        reader.read_exact(&mut bytes)?;
        Ok(Decimal {
            value: NumDecimal::deserialize(bytes),
        })
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl Decimal {
    pub fn zero() -> Self {
        Decimal {
            value: NumDecimal::ZERO,
        }
    }

    pub fn one() -> Self {
        Decimal {
            value: NumDecimal::ONE,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.value.is_zero() && self.value.is_sign_positive()
    }

    pub fn is_negative(&self) -> bool {
        !self.value.is_zero() && self.value.is_sign_negative()
    }

    fn round(self, strategy: RoundingStrategy) -> Self {
        Decimal {
            value: self.value.round_dp_with_strategy(PRECISION, strategy),
        }
    }

    fn checked_div(self, other: Decimal) -> Result<NumDecimal> {
        if other.is_zero() {
            return Err(Error::DivideByZero);
        }
        self.value.checked_div(other.value).ok_or(Error::Overflow)
    }

    /// Division rounding half-to-even at [PRECISION] digits.
    pub fn quo(self, other: Decimal) -> Result<Self> {
        Ok(Decimal::from(self.checked_div(other)?).round(RoundingStrategy::MidpointNearestEven))
    }

    /// Division rounding toward zero at [PRECISION] digits.
    pub fn quo_truncate(self, other: Decimal) -> Result<Self> {
        Ok(Decimal::from(self.checked_div(other)?).round(RoundingStrategy::ToZero))
    }

    /// Division rounding away from zero at [PRECISION] digits.
    pub fn quo_round_up(self, other: Decimal) -> Result<Self> {
        Ok(Decimal::from(self.checked_div(other)?).round(RoundingStrategy::AwayFromZero))
    }

    /// Rounds to the nearest whole amount.
    pub fn amount(&self) -> Result<Amount> {
        if self.is_negative() {
            return Err(Error::InvalidAmount("Amounts may not be negative".into()));
        }
        self.value
            .round()
            .to_u64()
            .map(Amount::new)
            .ok_or_else(|| Error::InvalidAmount("Amounts may not be greater than u64::MAX".into()))
    }

    /// Drops the fractional part and returns the whole amount.
    pub fn truncate_amount(&self) -> Result<Amount> {
        if self.is_negative() {
            return Err(Error::InvalidAmount("Amounts may not be negative".into()));
        }
        self.value
            .trunc()
            .to_u64()
            .map(Amount::new)
            .ok_or_else(|| Error::InvalidAmount("Amounts may not be greater than u64::MAX".into()))
    }

    /// Rounds up to the next whole amount.
    pub fn ceil_amount(&self) -> Result<Amount> {
        if self.is_negative() {
            return Err(Error::InvalidAmount("Amounts may not be negative".into()));
        }
        self.value
            .ceil()
            .to_u64()
            .map(Amount::new)
            .ok_or_else(|| Error::InvalidAmount("Amounts may not be greater than u64::MAX".into()))
    }
}

impl Add<Decimal> for Decimal {
    type Output = Result<Decimal>;

    fn add(self, other: Decimal) -> Result<Decimal> {
        self.value
            .checked_add(other.value)
            .map(Decimal::from)
            .ok_or(Error::Overflow)
    }
}

impl Sub<Decimal> for Decimal {
    type Output = Result<Decimal>;

    fn sub(self, other: Decimal) -> Result<Decimal> {
        self.value
            .checked_sub(other.value)
            .map(Decimal::from)
            .ok_or(Error::Overflow)
    }
}

/// Multiplication rounding half-to-even at [PRECISION] digits.
impl Mul<Decimal> for Decimal {
    type Output = Result<Decimal>;

    fn mul(self, other: Decimal) -> Result<Decimal> {
        let value = self.value.checked_mul(other.value).ok_or(Error::Overflow)?;
        Ok(Decimal::from(value).round(RoundingStrategy::MidpointNearestEven))
    }
}

impl Mul<Amount> for Decimal {
    type Output = Result<Decimal>;

    fn mul(self, other: Amount) -> Result<Decimal> {
        self * Decimal::from(other)
    }
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Decimal {
            value: value.into(),
        }
    }
}

impl From<NumDecimal> for Decimal {
    fn from(value: NumDecimal) -> Self {
        Decimal { value }
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        Decimal {
            value: amount.0.into(),
        }
    }
}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self {
            value: NumDecimal::from_str(s)?,
        })
    }
}
