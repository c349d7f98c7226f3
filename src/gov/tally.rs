use crate::coins::staking::Delegation;
use crate::coins::{Address, Amount, Decimal};
use crate::{Error, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum VoteOption {
    Yes,
    Abstain,
    No,
    NoWithVeto,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TallyParams {
    /// Minimum share of the maximum voting power which must vote.
    pub quorum: Decimal,
    /// Share of non-abstaining votes which must be yes.
    pub threshold: Decimal,
    /// Share of votes which, if vetoed, rejects the proposal and burns the
    /// deposit.
    pub veto: Decimal,
}

impl Default for TallyParams {
    fn default() -> Self {
        TallyParams {
            quorum: dec!(0.334).into(),
            threshold: dec!(0.5).into(),
            veto: dec!(0.334).into(),
        }
    }
}

impl TallyParams {
    pub fn from_toml(src: &str) -> Result<Self> {
        let params: TallyParams =
            toml_edit::de::from_str(src).map_err(|e| Error::Config(e.to_string()))?;
        let one = Decimal::one();
        for value in [params.quorum, params.threshold, params.veto] {
            if value.is_negative() || value > one {
                return Err(Error::Config(
                    "tally parameters must be between 0 and 1".into(),
                ));
            }
        }
        Ok(params)
    }
}

#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct TallyResults {
    pub yes: Decimal,
    pub abstain: Decimal,
    pub no: Decimal,
    pub no_with_veto: Decimal,
}

impl TallyResults {
    fn add(&mut self, option: VoteOption, power: Decimal) -> Result<()> {
        let acc = match option {
            VoteOption::Yes => &mut self.yes,
            VoteOption::Abstain => &mut self.abstain,
            VoteOption::No => &mut self.no,
            VoteOption::NoWithVeto => &mut self.no_with_veto,
        };
        *acc = (*acc + power)?;
        Ok(())
    }

    pub fn total(&self) -> Result<Decimal> {
        ((self.yes + self.abstain)? + self.no)? + self.no_with_veto
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TallyOutcome {
    pub passes: bool,
    pub burn_deposit: bool,
    pub results: TallyResults,
}

impl std::fmt::Display for TallyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = if self.passes { "Passed" } else { "Rejected" };
        write!(
            f,
            "{} (yes: {}, no: {}, veto: {}, abstain: {})",
            verdict,
            self.results.yes,
            self.results.no,
            self.results.no_with_veto,
            self.results.abstain
        )
    }
}

/// The pools of one bonded validator at tally time.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorSnapshot {
    pub address: Address,
    pub bonded_tokens: Amount,
    pub lp_tokens: Amount,
    pub total_bonding_shares: Decimal,
    pub total_lp_shares: Decimal,
}

impl ValidatorSnapshot {
    /// Voting power of a share tuple against this validator's pools.
    pub fn voting_power(
        &self,
        bonding_shares: Decimal,
        lp_shares: Decimal,
        lp_ratio: Decimal,
    ) -> Result<Decimal> {
        let bonding_power = if bonding_shares.is_zero() {
            Decimal::zero()
        } else {
            (bonding_shares * self.bonded_tokens)?.quo(self.total_bonding_shares)?
        };
        let lp_power = if lp_shares.is_zero() {
            Decimal::zero()
        } else {
            (lp_ratio * (lp_shares * self.lp_tokens)?.quo(self.total_lp_shares)?)?
        };
        bonding_power + lp_power
    }
}

/// A vote together with the voter's delegations at tally time.
#[derive(Debug, Clone)]
pub struct CastVote {
    pub voter: Address,
    pub option: VoteOption,
    pub delegations: Vec<Delegation>,
}

struct ValidatorTally<'a> {
    snapshot: &'a ValidatorSnapshot,
    vote: Option<VoteOption>,
    bonding_shares_deducted: Decimal,
    lp_shares_deducted: Decimal,
}

/// Weighs votes by stake.
///
/// Delegators vote with the power of their own delegations. A bonded
/// validator which votes also votes on behalf of every share of its pools
/// whose delegator did not vote.
pub fn tally_votes(
    validators: &[ValidatorSnapshot],
    votes: &[CastVote],
    lp_ratio: Decimal,
    params: &TallyParams,
) -> Result<TallyOutcome> {
    let mut results = TallyResults::default();
    let mut tallies: Vec<ValidatorTally> = validators
        .iter()
        .map(|snapshot| ValidatorTally {
            snapshot,
            vote: None,
            bonding_shares_deducted: Decimal::zero(),
            lp_shares_deducted: Decimal::zero(),
        })
        .collect();
    let index: BTreeMap<Address, usize> = validators
        .iter()
        .enumerate()
        .map(|(i, v)| (v.address, i))
        .collect();

    for vote in votes {
        if let Some(&i) = index.get(&vote.voter) {
            tallies[i].vote = Some(vote.option);
        }

        for delegation in vote.delegations.iter() {
            let i = match index.get(&delegation.validator) {
                Some(&i) => i,
                None => continue,
            };
            let tally = &mut tallies[i];
            tally.bonding_shares_deducted =
                (tally.bonding_shares_deducted + delegation.bonding_shares)?;
            tally.lp_shares_deducted = (tally.lp_shares_deducted + delegation.lp_shares)?;

            let power = tally.snapshot.voting_power(
                delegation.bonding_shares,
                delegation.lp_shares,
                lp_ratio,
            )?;
            results.add(vote.option, power)?;
        }
    }

    for tally in tallies.iter() {
        let option = match tally.vote {
            Some(option) => option,
            None => continue,
        };
        let bonding_shares =
            (tally.snapshot.total_bonding_shares - tally.bonding_shares_deducted)?;
        let lp_shares = (tally.snapshot.total_lp_shares - tally.lp_shares_deducted)?;
        let power = tally
            .snapshot
            .voting_power(bonding_shares, lp_shares, lp_ratio)?;
        results.add(option, power)?;
    }

    let mut total_bonded = Amount::zero();
    let mut total_lp = Amount::zero();
    for snapshot in validators {
        total_bonded = (total_bonded + snapshot.bonded_tokens)?;
        total_lp = (total_lp + snapshot.lp_tokens)?;
    }
    let max_voting_power = (Decimal::from(total_bonded) + (lp_ratio * total_lp)?)?;

    decide(results, total_bonded, max_voting_power, params)
}

fn decide(
    results: TallyResults,
    total_bonded: Amount,
    max_voting_power: Decimal,
    params: &TallyParams,
) -> Result<TallyOutcome> {
    let outcome = |passes: bool, burn_deposit: bool, results: TallyResults| -> Result<_> {
        Ok(TallyOutcome {
            passes,
            burn_deposit,
            results,
        })
    };

    if total_bonded.is_zero() {
        return outcome(false, false, results);
    }

    let total_votes = results.total()?;
    if total_votes.quo(max_voting_power)? < params.quorum {
        return outcome(false, true, results);
    }

    let non_abstain = (total_votes - results.abstain)?;
    if non_abstain.is_zero() {
        return outcome(false, false, results);
    }

    if results.no_with_veto.quo(total_votes)? > params.veto {
        return outcome(false, true, results);
    }

    if results.yes.quo(non_abstain)? > params.threshold {
        return outcome(true, false, results);
    }

    outcome(false, false, results)
}
