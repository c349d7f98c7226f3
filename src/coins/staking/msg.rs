use super::{Declaration, OpType, Staking};
use crate::coins::{Address, Amount, Decimal};
use crate::state_machine::{BlockCtx, StateMachine};
use crate::store::Store;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A signed staking transaction, as submitted by an account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Msg {
    CreateValidator {
        declaration: Declaration,
        self_bond: Amount,
    },
    Delegate {
        delegator: Address,
        validator: Address,
        op: OpType,
        amount: Amount,
    },
    Undelegate {
        delegator: Address,
        validator: Address,
        op: OpType,
        amount: Amount,
    },
    BeginRedelegate {
        delegator: Address,
        src_validator: Address,
        dst_validator: Address,
        op: OpType,
        amount: Amount,
    },
    Unjail {
        operator: Address,
    },
}

impl Msg {
    /// Decodes a message from its JSON wire form.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Encoding(e.to_string()))
    }

    /// The account which signed the message.
    pub fn signer(&self) -> Address {
        match self {
            Msg::CreateValidator { declaration, .. } => declaration.operator,
            Msg::Delegate { delegator, .. }
            | Msg::Undelegate { delegator, .. }
            | Msg::BeginRedelegate { delegator, .. } => *delegator,
            Msg::Unjail { operator } => *operator,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MsgResponse {
    Empty,
    Delegated { shares: Decimal },
    Undelegated { completion_time: u64 },
    Redelegated { completion_time: u64 },
}

impl<S: Store> StateMachine<Msg> for Staking<S> {
    type Output = MsgResponse;

    fn step(&mut self, ctx: &BlockCtx, msg: Msg) -> Result<MsgResponse> {
        let signer = msg.signer();
        if self.is_banned(&signer)? {
            log::debug!("Rejected message from banned account {}", signer);
            return Err(Error::AccountBanned);
        }

        Ok(match msg {
            Msg::CreateValidator {
                declaration,
                self_bond,
            } => {
                self.create_validator(ctx, declaration, self_bond)?;
                MsgResponse::Empty
            }
            Msg::Delegate {
                delegator,
                validator,
                op,
                amount,
            } => MsgResponse::Delegated {
                shares: self.delegate(ctx, delegator, validator, op, amount)?,
            },
            Msg::Undelegate {
                delegator,
                validator,
                op,
                amount,
            } => MsgResponse::Undelegated {
                completion_time: self.undelegate_amount(ctx, delegator, validator, op, amount)?,
            },
            Msg::BeginRedelegate {
                delegator,
                src_validator,
                dst_validator,
                op,
                amount,
            } => MsgResponse::Redelegated {
                completion_time: self.redelegate_amount(
                    ctx,
                    delegator,
                    src_validator,
                    dst_validator,
                    op,
                    amount,
                )?,
            },
            Msg::Unjail { operator } => {
                self.unjail(operator)?;
                MsgResponse::Empty
            }
        })
    }
}
