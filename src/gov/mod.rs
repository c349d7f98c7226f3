//! Stake-weighted governance voting.
use crate::coins::staking::Staking;
use crate::coins::Address;
use crate::collections::Map;
use crate::store::{BufStore, Flush, Store};
use crate::Result;

mod tally;
pub use tally::*;

/// Votes cast on open proposals.
pub struct Governance<S> {
    store: BufStore<S>,
    params: TallyParams,
    /// Keyed by (proposal id, voter).
    votes: Map<(u64, Address), VoteOption>,
}

impl<S: Store> Governance<S> {
    pub fn new(store: S, params: TallyParams) -> Self {
        Governance {
            store: BufStore::wrap(store),
            params,
            votes: Map::new(0x71),
        }
    }

    pub fn params(&self) -> &TallyParams {
        &self.params
    }

    pub fn into_store(self) -> S {
        self.store.into_inner()
    }

    /// Records a vote, replacing any earlier vote by the same voter.
    pub fn add_vote(
        &mut self,
        proposal_id: u64,
        voter: Address,
        option: VoteOption,
    ) -> Result<()> {
        self.votes
            .insert(&mut self.store, &(proposal_id, voter), &option)?;
        self.store.flush()
    }

    /// Votes on a proposal, ordered by voter address.
    pub fn votes(&self, proposal_id: u64) -> Result<Vec<(Address, VoteOption)>> {
        self.votes
            .iter_prefix(&self.store, &proposal_id)
            .map(|entry| entry.map(|((_, voter), option)| (voter, option)))
            .collect()
    }

    /// Tallies a proposal against the current bonded validator set and
    /// consumes its votes.
    pub fn tally<T: Store>(
        &mut self,
        proposal_id: u64,
        staking: &Staking<T>,
    ) -> Result<TallyOutcome> {
        let res = self.tally_inner(proposal_id, staking);
        match res {
            Ok(_) => self.store.flush()?,
            Err(_) => self.store.discard(),
        }
        res
    }

    fn tally_inner<T: Store>(
        &mut self,
        proposal_id: u64,
        staking: &Staking<T>,
    ) -> Result<TallyOutcome> {
        let validators: Vec<ValidatorSnapshot> = staking
            .bonded_validators()?
            .into_iter()
            .map(|v| ValidatorSnapshot {
                address: v.operator,
                bonded_tokens: v.bonding.tokens,
                lp_tokens: v.liquidity.tokens,
                total_bonding_shares: v.bonding.delegator_shares,
                total_lp_shares: v.liquidity.delegator_shares,
            })
            .collect();

        let mut votes = vec![];
        for (voter, option) in self.votes(proposal_id)? {
            votes.push(CastVote {
                voter,
                option,
                delegations: staking.delegator_delegations(&voter)?,
            });
            self.votes.remove(&mut self.store, &(proposal_id, voter))?;
        }

        let outcome = tally_votes(&validators, &votes, staking.params().lp_ratio, &self.params)?;
        log::info!("Proposal {}: {}", proposal_id, outcome);

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MapStore;

    #[test]
    fn votes_are_replaced_and_listed() -> Result<()> {
        let mut gov = Governance::new(MapStore::new(), TallyParams::default());
        let alice = Address::from([1; 20]);
        let bob = Address::from([2; 20]);

        gov.add_vote(1, bob, VoteOption::No)?;
        gov.add_vote(1, alice, VoteOption::Yes)?;
        gov.add_vote(1, bob, VoteOption::Abstain)?;
        gov.add_vote(2, alice, VoteOption::NoWithVeto)?;

        assert_eq!(
            gov.votes(1)?,
            vec![(alice, VoteOption::Yes), (bob, VoteOption::Abstain)]
        );
        assert_eq!(gov.votes(2)?, vec![(alice, VoteOption::NoWithVeto)]);
        Ok(())
    }
}
