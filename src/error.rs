use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Validator has no tokens; no share price exists")]
    InsufficientShares,
    #[error("Invalid shares amount")]
    BadSharesAmount,
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Commission Error: {0}")]
    Commission(String),
    #[error("Consensus key is already in use")]
    ConsensusKeyExists,
    #[error("Division by zero")]
    DivideByZero,
    #[error("Encoding Error: {0}")]
    Encoding(String),
    #[error("Invalid validator exchange rate: validator has no tokens but has shares")]
    InvalidExchangeRate,
    #[error("Invariant violated: {0}")]
    Invariant(String),
    #[error("Too many delegations: total stake exceeds self stake times the max delegations ratio")]
    MaxDelegationsLimit,
    #[error("Too many redelegation entries for (delegator, src-validator, dst-validator) tuple")]
    MaxRedelegationEntries,
    #[error("Too many unbonding delegation entries for (delegator, validator) tuple")]
    MaxUnbondingDelegationEntries,
    #[error("No delegation for (address, validator) tuple")]
    NoDelegation,
    #[error("No redelegation found")]
    NoRedelegation,
    #[error("No unbonding delegation found")]
    NoUnbondingDelegation,
    #[error("Validator does not exist")]
    NoValidatorFound,
    #[error("Not enough delegation shares")]
    NotEnoughDelegationShares,
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Parameter change denied: {0}")]
    ParamChangeDenied(String),
    #[error("Cannot redelegate to the same validator")]
    SelfRedelegation,
    #[error("Store Error: {0}")]
    Store(String),
    #[error("Validator is already declared")]
    ValidatorExists,
    #[error("Validator is jailed")]
    ValidatorJailed,
    #[error("Validator is not jailed")]
    ValidatorNotJailed,
    #[error("Maximum number of validators reached")]
    MaxValidators,
    #[error("Account is banned")]
    AccountBanned,
    #[error("Self delegation is below the validator's minimum self delegation")]
    SelfDelegationTooLow,
    #[error("Too few tokens to redelegate (truncates to zero tokens)")]
    TinyRedelegationAmount,
    #[error("Config Error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for errors which indicate ledger corruption or caller
    /// misuse rather than a rejected user request. Hosts should halt when
    /// one of these surfaces.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Invariant(_))
    }

    pub(crate) fn invariant<T: Into<String>>(msg: T) -> Self {
        let msg = msg.into();
        log::error!("invariant violated: {}", msg);
        Error::Invariant(msg)
    }
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::InvalidAmount(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Encoding(err.to_string())
    }
}

/// A result type bound to the ledger's error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invariants_are_fatal() {
        assert!(Error::invariant("pool holds fewer tokens than its entries").is_fatal());
        assert!(!Error::MaxDelegationsLimit.is_fatal());
        assert!(!Error::InsufficientFunds("1stake".into()).is_fatal());
        assert!(!Error::Overflow.is_fatal());
    }
}
