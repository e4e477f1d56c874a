//! End-to-end scenarios over the program's state machines, without a runtime.

use anchor_lang::prelude::*;
use anchor_spl::token::{self, spl_token};
use proptest::prelude::*;
use solana_program::program_pack::Pack;

use crate::{
    claim::{compute_claim, MerkleClaim, WeightedClaim},
    errors::MarketError,
    market, merkle,
    state::*,
    strategy::{PassThrough, VaultStrategy},
    test_utils::assert_market_error,
};

const ONE_SOL: u64 = 1_000_000_000;
const ONE_TOKEN: u64 = 1_000_000_000;

fn token_account_data(mint: &Pubkey, owner: &Pubkey) -> Vec<u8> {
    let mut data = vec![0u8; spl_token::state::Account::LEN];
    spl_token::state::Account {
        mint: *mint,
        owner: *owner,
        amount: 1,
        state: spl_token::state::AccountState::Initialized,
        ..Default::default()
    }
    .pack_into_slice(&mut data);
    data
}

fn deposit(vault: &mut Vault, position: &mut UserPosition, lamports: u64, now: i64) -> u64 {
    let shares = PassThrough.shares_for(lamports).unwrap();
    vault.credit(position, lamports, shares, now).unwrap();
    shares
}

fn position_of(vault_key: &Pubkey) -> UserPosition {
    UserPosition {
        vault: *vault_key,
        owner: Pubkey::new_unique(),
        ..Default::default()
    }
}

#[test]
fn one_sol_round_trip_through_empty_vault() {
    let mut vault = Vault::default();
    let mut position = position_of(&Pubkey::new_unique());

    let shares = deposit(&mut vault, &mut position, ONE_SOL, 0);
    assert_eq!(shares, ONE_SOL);
    assert_eq!(PassThrough.value_of(position.shares).unwrap(), ONE_SOL);
    assert_eq!(position.principal, ONE_SOL);

    let principal = vault.debit(&mut position, shares, 10).unwrap();
    assert_eq!(principal, ONE_SOL);
    assert_eq!(PassThrough.value_of(shares).unwrap(), ONE_SOL);
    assert_eq!(position.shares, 0);
    assert_eq!(position.principal, 0);
    assert!(vault.is_empty());
}

#[test]
fn withdrawal_invalidates_standing_bid() {
    let collection = Pubkey::new_unique();
    let mint = Pubkey::new_unique();
    let seller = Pubkey::new_unique();

    let mut marketplace = Marketplace::default();
    let mut vault = Vault::default();
    let mut position = position_of(&Pubkey::new_unique());
    deposit(&mut vault, &mut position, ONE_SOL, 0);

    let holder_key = Pubkey::new_unique();
    let mut lamports = 0u64;
    let mut data = token_account_data(&mint, &seller);
    let holder = AccountInfo::new(&holder_key, false, false, &mut lamports, &mut data, &token::ID, false, 0);

    let input = BidInput {
        collection,
        token_id: mint,
        amount: ONE_SOL,
    };
    let bid = market::enter_bid(
        &mut marketplace,
        &vault,
        &PassThrough,
        Some(&position),
        &holder,
        &position.owner,
        &input,
        255,
    )
    .unwrap();
    assert_eq!(bid.id, 0);
    assert_eq!(marketplace.next_bid_id, 1);

    vault.debit(&mut position, ONE_SOL / 2, 5).unwrap();

    assert_market_error(
        market::take_payment(&mut vault, &mut position, &PassThrough, bid.amount, 6, MarketError::BidNoLongerValid),
        MarketError::BidNoLongerValid,
    );
    assert_eq!(position.shares, ONE_SOL / 2);
}

#[test]
fn bid_on_unowned_token_is_rejected() {
    let mut marketplace = Marketplace::default();
    let mut vault = Vault::default();
    let mut position = position_of(&Pubkey::new_unique());
    deposit(&mut vault, &mut position, ONE_SOL, 0);

    let holder_key = Pubkey::new_unique();
    let mut lamports = 0u64;
    let mut data = token_account_data(&Pubkey::new_unique(), &Pubkey::new_unique());
    let holder = AccountInfo::new(&holder_key, false, false, &mut lamports, &mut data, &token::ID, false, 0);

    let input = BidInput {
        collection: Pubkey::new_unique(),
        token_id: Pubkey::new_unique(),
        amount: ONE_SOL,
    };
    assert_market_error(
        market::enter_bid(&mut marketplace, &vault, &PassThrough, Some(&position), &holder, &position.owner, &input, 255),
        MarketError::NftNotFound,
    );
    assert_eq!(marketplace.next_bid_id, 0);
}

#[test]
fn accepted_bid_debits_buyer_by_bid_amount() {
    let mut vault = Vault::default();
    let mut buyer = position_of(&Pubkey::new_unique());
    deposit(&mut vault, &mut buyer, 2 * ONE_SOL, 0);

    let mut bid = Bid {
        amount: ONE_SOL,
        bidder: buyer.owner,
        active: true,
        ..Default::default()
    };
    bid.ensure_exists().unwrap();

    let shares = market::take_payment(&mut vault, &mut buyer, &PassThrough, bid.amount, 1, MarketError::BidNoLongerValid)
        .unwrap();
    bid.active = false;

    assert_eq!(PassThrough.value_of(shares).unwrap(), ONE_SOL);
    assert_eq!(PassThrough.value_of(buyer.shares).unwrap(), ONE_SOL);
    assert_eq!(vault.total_shares, buyer.shares);
    assert_market_error(bid.ensure_exists(), MarketError::BidDoesNotExist);
}

#[test]
fn option_lifecycle_after_expiry() {
    let buyer = Pubkey::new_unique();
    let seller = Pubkey::new_unique();
    let mut option = OptionBid {
        strike: 3 * ONE_SOL,
        premium: ONE_SOL / 10,
        duration: OptionDuration::ThirtyDays,
        buyer,
        ..Default::default()
    };

    assert_market_error(option.exercise(&buyer, 0), MarketError::OptionNotExercisable);

    option.accept(&seller, 100).unwrap();
    let expiry = option.expiry;
    assert_eq!(expiry, 100 + OptionDuration::ThirtyDays.seconds());
    assert_market_error(option.accept(&seller, 101), MarketError::OptionAlreadyAccepted);
    assert_market_error(option.close_expired(&seller, expiry - 1), MarketError::OptionNotExpired);
    assert_market_error(option.close_expired(&buyer, expiry), MarketError::NotYourOption);

    option.close_expired(&seller, expiry).unwrap();
    assert_eq!(option.state, OptionState::Closed);
    assert_market_error(option.exercise(&buyer, expiry + 1), MarketError::OptionNotExercisable);
    assert_market_error(option.close_expired(&seller, expiry + 1), MarketError::OptionNotExercisable);
}

#[test]
fn exercise_rechecks_strike_against_live_balance() {
    let mut vault = Vault::default();
    let mut buyer = position_of(&Pubkey::new_unique());
    deposit(&mut vault, &mut buyer, ONE_SOL, 0);

    let mut option = OptionBid {
        strike: ONE_SOL,
        premium: ONE_SOL / 4,
        duration: OptionDuration::NinetyDays,
        buyer: buyer.owner,
        ..Default::default()
    };

    market::take_payment(&mut vault, &mut buyer, &PassThrough, option.premium, 1, MarketError::OptionNoLongerValid)
        .unwrap();
    option.accept(&Pubkey::new_unique(), 1).unwrap();

    option.check_exercise(&buyer.owner, 2).unwrap();
    assert_market_error(
        market::take_payment(&mut vault, &mut buyer, &PassThrough, option.strike, 2, MarketError::BidNoLongerValid),
        MarketError::BidNoLongerValid,
    );
    assert_eq!(option.state, OptionState::Accepted);
}

/// Two bidders, one collection allocation of 15 tokens with a 1 SOL floor.
fn bidding_epoch() -> (RewardsConfig, Epoch, Pubkey) {
    let collection = Pubkey::new_unique();
    let mut config = RewardsConfig::default();
    config.set_epoch_duration(1_000, 0).unwrap();
    config
        .set_collection_allocation(collection, 15 * ONE_TOKEN, ONE_SOL)
        .unwrap();
    let epoch = config.start_epoch(0, 254).unwrap();
    (config, epoch, collection)
}

fn activity_for(epoch: &Epoch, user: &Pubkey) -> UserEpochActivity {
    UserEpochActivity {
        epoch: epoch.index,
        user: *user,
        ..Default::default()
    }
}

#[test]
fn weighted_claims_split_by_bid_count() {
    let (config, mut epoch, collection) = bidding_epoch();
    let user1 = Pubkey::new_unique();
    let user2 = Pubkey::new_unique();
    let mut activity1 = activity_for(&epoch, &user1);
    let mut activity2 = activity_for(&epoch, &user2);

    epoch.record_bid(&mut activity1, &user1, &collection, 2 * ONE_SOL, 10).unwrap();
    epoch.record_bid(&mut activity2, &user2, &collection, 2 * ONE_SOL, 20).unwrap();
    epoch.record_bid(&mut activity2, &user2, &collection, 2 * ONE_SOL, 30).unwrap();
    assert_eq!(epoch.pools[0].total_weight, 3 * ONE_SOL);

    let end = epoch.end_time;
    assert_market_error(
        compute_claim(&config, 0, Some(&epoch), &WeightedClaim { activity: Some(&activity1) }, &user1, end - 1),
        MarketError::EpochNotEnded,
    );

    let owed1 = compute_claim(&config, 0, Some(&epoch), &WeightedClaim { activity: Some(&activity1) }, &user1, end).unwrap();
    let owed2 = compute_claim(&config, 0, Some(&epoch), &WeightedClaim { activity: Some(&activity2) }, &user2, end).unwrap();
    assert_eq!(owed1, 5 * ONE_TOKEN);
    assert_eq!(owed2, 10 * ONE_TOKEN);

    let mut receipt = ClaimReceipt::default();
    receipt.mark_claimed(owed1, end).unwrap();
    assert_market_error(receipt.mark_claimed(owed1, end + 1), MarketError::AlreadyClaimed);
    assert_eq!(receipt.amount, owed1);
}

#[test]
fn merkle_claims_pay_attested_amounts_once() {
    let (mut config, _, _) = bidding_epoch();
    config.claim_mode = ClaimMode::Merkle;
    let epoch_end = config.current_epoch_end;
    let mut epoch = config.start_epoch(epoch_end, 253).unwrap();
    assert_eq!(epoch.index, 1);
    assert_eq!(epoch.claim_mode, ClaimMode::Merkle);

    let user1 = Pubkey::new_unique();
    let user2 = Pubkey::new_unique();
    let leaf1 = merkle::leaf(&user1, 5 * ONE_TOKEN);
    let leaf2 = merkle::leaf(&user2, 10 * ONE_TOKEN);
    let root = merkle::hash_pair(&leaf1, &leaf2);

    let end = epoch.end_time;
    assert_market_error(epoch.set_rewards_distribution(root, 15 * ONE_TOKEN, end - 1), MarketError::EpochHasNotEnded);
    epoch.set_rewards_distribution(root, 15 * ONE_TOKEN, end).unwrap();
    assert_market_error(
        epoch.set_rewards_distribution([0u8; 32], 0, end),
        MarketError::EpochRewardsAlreadySet,
    );

    let proof1 = [leaf2];
    let claim = MerkleClaim {
        amount: 5 * ONE_TOKEN,
        proof: &proof1,
    };
    assert_eq!(compute_claim(&config, 1, Some(&epoch), &claim, &user1, end).unwrap(), 5 * ONE_TOKEN);
    assert_market_error(
        compute_claim(&config, 1, Some(&epoch), &claim, &user2, end),
        MarketError::InvalidMerkleProof,
    );
    assert_market_error(
        compute_claim(&config, 1, Some(&epoch), &WeightedClaim { activity: None }, &user1, end),
        MarketError::ClaimModeMismatch,
    );
}

#[test]
fn activity_outside_the_window_accrues_nothing() {
    let (_, mut epoch, collection) = bidding_epoch();
    let user = Pubkey::new_unique();
    let mut activity = activity_for(&epoch, &user);

    let weight = epoch
        .record_bid(&mut activity, &user, &collection, 2 * ONE_SOL, epoch.end_time)
        .unwrap();
    assert_eq!(weight, 0);
    epoch.record_deposit(&mut activity, &user, ONE_SOL, epoch.end_time + 1).unwrap();
    assert!(!activity.has_weight());
    assert_eq!(epoch.total_deposits, 0);
}

#[derive(Clone, Debug)]
enum VaultOp {
    Deposit { user: usize, lamports: u64 },
    Withdraw { user: usize, shares: u64 },
}

fn vault_op() -> impl Strategy<Value = VaultOp> {
    prop_oneof![
        (0usize..3, 1u64..10 * ONE_SOL).prop_map(|(user, lamports)| VaultOp::Deposit { user, lamports }),
        (0usize..3, 1u64..10 * ONE_SOL).prop_map(|(user, shares)| VaultOp::Withdraw { user, shares }),
    ]
}

proptest! {
    #[test]
    fn total_shares_track_positions(ops in proptest::collection::vec(vault_op(), 1..40)) {
        let vault_key = Pubkey::new_unique();
        let mut vault = Vault::default();
        let mut positions: Vec<UserPosition> = (0..3).map(|_| position_of(&vault_key)).collect();

        for (step, op) in ops.into_iter().enumerate() {
            let now = step as i64;
            match op {
                VaultOp::Deposit { user, lamports } => {
                    deposit(&mut vault, &mut positions[user], lamports, now);
                }
                VaultOp::Withdraw { user, shares } => {
                    let held = positions[user].shares;
                    let result = vault.debit(&mut positions[user], shares, now);
                    prop_assert_eq!(result.is_ok(), shares <= held);
                }
            }

            let shares: u64 = positions.iter().map(|p| p.shares).sum();
            let principal: u64 = positions.iter().map(|p| p.principal).sum();
            prop_assert_eq!(shares, vault.total_shares);
            prop_assert_eq!(principal, vault.total_principal);
        }
    }
}
