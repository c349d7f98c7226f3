use orga_staking::coins::staking::{
    Account, Commission, Declaration, Event, Msg, MsgResponse, OpType, Params, Staking,
};
use orga_staking::coins::{Address, Amount, ConsensusKey, Decimal};
use orga_staking::gov::{Governance, TallyParams, VoteOption};
use orga_staking::store::MapStore;
use orga_staking::{BlockCtx, Error, Result, StateMachine};
use serde_json::json;

fn alice() -> Address {
    Address::from([1; 20])
}

fn bob() -> Address {
    Address::from([2; 20])
}

fn setup() -> Result<Staking<MapStore>> {
    let _ = pretty_env_logger::try_init();
    let params = Params::from_toml(
        r#"
        unbonding_time = 10
        scheduled_unbond_delay = 5
        power_reduction = 1
        "#,
    )?;
    let mut staking = Staking::new(MapStore::new(), params)?;
    staking.mint(Account::User(alice()), "stake", Amount::new(100))?;
    staking.mint(Account::User(bob()), "stake", Amount::new(1000))?;
    staking.mint(Account::User(bob()), "lpstake", Amount::new(200))?;
    Ok(staking)
}

fn create_alice(staking: &mut Staking<MapStore>, ctx: &BlockCtx) -> Result<()> {
    let res = staking.step(
        ctx,
        Msg::CreateValidator {
            declaration: Declaration {
                operator: alice(),
                consensus_key: ConsensusKey([1; 32]),
                commission: Commission::default(),
                min_self_delegation: Amount::new(1),
            },
            self_bond: Amount::new(100),
        },
    )?;
    assert_eq!(res, MsgResponse::Empty);
    staking.bond_validator(alice())
}

#[test]
fn messages() -> Result<()> {
    let mut staking = setup()?;
    let ctx = BlockCtx::new(1, 50);
    create_alice(&mut staking, &ctx)?;

    let msg = json!({
        "type": "delegate",
        "delegator": bob(),
        "validator": alice(),
        "op": "Bonding",
        "amount": 300,
    });
    let msg = Msg::from_json(msg.to_string().as_bytes())?;
    assert_eq!(msg.signer(), bob());
    let res = staking.step(&ctx, msg)?;
    assert_eq!(
        res,
        MsgResponse::Delegated {
            shares: Decimal::from(300u64)
        }
    );

    let res = staking.step(
        &BlockCtx::new(2, 55),
        Msg::Undelegate {
            delegator: bob(),
            validator: alice(),
            op: OpType::Bonding,
            amount: Amount::new(100),
        },
    )?;
    assert_eq!(res, MsgResponse::Undelegated { completion_time: 65 });

    let err = Msg::from_json(b"{\"type\":\"withdraw\"}").expect_err("Unknown message type");
    assert!(matches!(err, Error::Encoding(_)));

    staking.end_block(&BlockCtx::new(3, 65))?;
    assert_eq!(
        staking.balance(Account::User(bob()), "stake")?,
        Amount::new(800)
    );

    let events = staking.take_events();
    let completed = events
        .iter()
        .find(|e| matches!(e, Event::CompleteUnbonding { .. }))
        .expect("unbonding completed");
    let value = serde_json::to_value(completed).expect("event serializes");
    assert_eq!(value["kind"], "complete_unbonding");

    Ok(())
}

#[test]
fn banned_accounts_are_rejected() -> Result<()> {
    let mut staking = setup()?;
    let ctx = BlockCtx::new(1, 0);
    create_alice(&mut staking, &ctx)?;
    staking.delegate(&ctx, bob(), alice(), OpType::Liquidity, Amount::new(200))?;

    staking.ban_account(&BlockCtx::new(2, 1), bob())?;
    assert_eq!(
        staking.balance(Account::User(bob()), "lpstake")?,
        Amount::new(200)
    );
    assert!(staking.delegation(&bob(), &alice())?.is_none());

    let err = staking
        .step(
            &BlockCtx::new(3, 2),
            Msg::Delegate {
                delegator: bob(),
                validator: alice(),
                op: OpType::Bonding,
                amount: Amount::new(10),
            },
        )
        .expect_err("Banned accounts cannot delegate");
    assert_eq!(err, Error::AccountBanned);
    assert_eq!(
        staking.balance(Account::User(bob()), "stake")?,
        Amount::new(1000)
    );

    staking.unban_account(bob())?;
    staking.step(
        &BlockCtx::new(4, 3),
        Msg::Delegate {
            delegator: bob(),
            validator: alice(),
            op: OpType::Bonding,
            amount: Amount::new(10),
        },
    )?;

    Ok(())
}

#[test]
fn governance_tally() -> Result<()> {
    let mut staking = setup()?;
    let ctx = BlockCtx::new(1, 0);
    create_alice(&mut staking, &ctx)?;
    staking.delegate(&ctx, bob(), alice(), OpType::Bonding, Amount::new(300))?;
    staking.delegate(&ctx, bob(), alice(), OpType::Liquidity, Amount::new(200))?;

    let mut gov = Governance::new(MapStore::new(), TallyParams::default());
    gov.add_vote(1, alice(), VoteOption::No)?;
    gov.add_vote(1, bob(), VoteOption::Yes)?;

    let outcome = gov.tally(1, &staking)?;
    assert!(outcome.passes);
    assert!(!outcome.burn_deposit);
    // bob: 300 bonding + 200 liquidity at half weight
    assert_eq!(outcome.results.yes, Decimal::from(400u64));
    // alice only keeps her own stake
    assert_eq!(outcome.results.no, Decimal::from(100u64));
    assert!(gov.votes(1)?.is_empty());

    Ok(())
}
