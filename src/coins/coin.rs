use super::Amount;
use crate::Result;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// An amount of a single denomination.
#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash,
)]
pub struct Coin {
    pub denom: String,
    pub amount: Amount,
}

impl Coin {
    pub fn new<D: Into<String>>(denom: D, amount: Amount) -> Self {
        Coin {
            denom: denom.into(),
            amount,
        }
    }
}

/// Adds `amount` of `denom` to `coins`, keeping one entry per denomination
/// in first-seen order.
pub fn add_coin(coins: &mut Vec<Coin>, denom: &str, amount: Amount) -> Result<()> {
    match coins.iter_mut().find(|coin| coin.denom == denom) {
        Some(coin) => coin.amount = (coin.amount + amount)?,
        None => coins.push(Coin::new(denom, amount)),
    }
    Ok(())
}
