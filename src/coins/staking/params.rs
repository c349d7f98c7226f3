use super::OpType;
use crate::coins::{Amount, Decimal};
use crate::{Error, Result};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

const DAY_SECONDS: u64 = 60 * 60 * 24;

/// Staking parameters.
///
/// Parameters are read by every operation. Changes go through
/// [super::Staking::set_params] (or the single-field setters) so the change
/// hooks can validate and rebalance.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Params {
    /// Size of the active validator set.
    pub max_validators: u64,
    /// Maximum concurrent unbonding or redelegation entries per key.
    pub max_entries: u64,
    /// Seconds between undelegating and the funds being released.
    pub unbonding_time: u64,
    pub bond_denom: String,
    pub lp_denom: String,
    /// Weight of liquidity tokens relative to bonding tokens in governance.
    pub lp_ratio: Decimal,
    /// Lowest `min_self_delegation` a validator may declare.
    pub min_self_delegation_lvl: Amount,
    /// Total stake may be at most this multiple of the operator's self stake.
    pub max_delegations_ratio: Decimal,
    /// Seconds between a validator breaching its delegation ratio and its
    /// delegations being forcibly reduced.
    pub scheduled_unbond_delay: u64,
    /// Bonding tokens per unit of consensus power.
    pub power_reduction: u64,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            max_validators: 100,
            max_entries: 7,
            unbonding_time: 21 * DAY_SECONDS,
            bond_denom: "stake".into(),
            lp_denom: "lpstake".into(),
            lp_ratio: dec!(0.5).into(),
            min_self_delegation_lvl: Amount::new(1),
            max_delegations_ratio: dec!(10).into(),
            scheduled_unbond_delay: 3 * DAY_SECONDS,
            power_reduction: 1_000_000,
        }
    }
}

impl Params {
    /// Parses parameters from a TOML document. Missing fields take their
    /// default values.
    pub fn from_toml(src: &str) -> Result<Self> {
        let params: Params =
            toml_edit::de::from_str(src).map_err(|e| Error::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml_edit::ser::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_validators == 0 {
            return Err(Error::Config("max_validators must be positive".into()));
        }
        if self.max_entries == 0 {
            return Err(Error::Config("max_entries must be positive".into()));
        }
        if self.bond_denom.is_empty() || self.lp_denom.is_empty() {
            return Err(Error::Config("denoms must not be empty".into()));
        }
        if self.bond_denom == self.lp_denom {
            return Err(Error::Config(
                "bond_denom and lp_denom must be different".into(),
            ));
        }
        if self.lp_ratio.is_negative() {
            return Err(Error::Config("lp_ratio must not be negative".into()));
        }
        if !self.max_delegations_ratio.is_positive() {
            return Err(Error::Config(
                "max_delegations_ratio must be positive".into(),
            ));
        }
        if self.power_reduction == 0 {
            return Err(Error::Config("power_reduction must be positive".into()));
        }

        Ok(())
    }

    pub fn denom(&self, op: OpType) -> &str {
        match op {
            OpType::Bonding => self.bond_denom.as_str(),
            OpType::Liquidity => self.lp_denom.as_str(),
        }
    }
}
