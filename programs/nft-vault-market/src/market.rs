use anchor_lang::prelude::*;

use crate::{
    errors::MarketError,
    nft,
    state::{validate_terms, Bid, BidInput, Marketplace, OptionBid, OptionBidInput, OptionState, UserPosition, Vault},
    strategy::VaultStrategy,
};

/// Lamport value of a position at the strategy's current rate. No position reads as zero.
pub fn live_value(strategy: &dyn VaultStrategy, position: Option<&UserPosition>) -> Result<u64> {
    match position {
        Some(position) => strategy.value_of(position.shares),
        None => Ok(0),
    }
}

pub fn require_covered(
    strategy: &dyn VaultStrategy,
    position: Option<&UserPosition>,
    lamports: u64,
    err: MarketError,
) -> Result<()> {
    if live_value(strategy, position)? < lamports {
        return Err(err.into());
    }
    Ok(())
}

/// Validates a new bid against live state and assigns it the next id.
pub fn enter_bid(
    marketplace: &mut Marketplace,
    vault: &Vault,
    strategy: &dyn VaultStrategy,
    position: Option<&UserPosition>,
    nft_holder: &AccountInfo,
    bidder: &Pubkey,
    input: &BidInput,
    bump: u8,
) -> Result<Bid> {
    require!(input.amount > 0, MarketError::InsufficientBidAmount);
    nft::owner_of(marketplace, &input.collection, &input.token_id, nft_holder)?;
    require_covered(strategy, position, input.amount, MarketError::InsufficientFunds)?;

    Ok(Bid {
        id: marketplace.take_bid_id()?,
        vault: vault.name,
        collection: input.collection,
        token_id: input.token_id,
        amount: input.amount,
        bidder: *bidder,
        active: true,
        bump,
    })
}

pub fn modify_bid(
    bid: &mut Bid,
    caller: &Pubkey,
    amount: u64,
    strategy: &dyn VaultStrategy,
    position: Option<&UserPosition>,
) -> Result<()> {
    let mut updated = bid.clone();
    updated.modify(caller, amount)?;
    require_covered(strategy, position, amount, MarketError::InsufficientFunds)?;
    *bid = updated;
    Ok(())
}

/// Validates a new option bid. The premium, paid at acceptance, must be covered now;
/// the strike is checked again at exercise.
pub fn enter_option_bid(
    marketplace: &mut Marketplace,
    vault: &Vault,
    strategy: &dyn VaultStrategy,
    position: Option<&UserPosition>,
    nft_holder: &AccountInfo,
    market_authority: &Pubkey,
    buyer: &Pubkey,
    input: &OptionBidInput,
    bump: u8,
) -> Result<OptionBid> {
    validate_terms(input.strike, input.premium)?;
    let owner = nft::owner_of(marketplace, &input.collection, &input.token_id, nft_holder)?;
    require_keys_neq!(owner, *market_authority, MarketError::AlreadyInOption);
    require_covered(strategy, position, input.premium, MarketError::InsufficientFunds)?;

    Ok(OptionBid {
        id: marketplace.take_option_id()?,
        vault: vault.name,
        collection: input.collection,
        token_id: input.token_id,
        strike: input.strike,
        premium: input.premium,
        duration: input.duration,
        state: OptionState::Pending,
        buyer: *buyer,
        seller: Pubkey::default(),
        expiry: 0,
        bump,
    })
}

/// Re-checks that `position` still covers `lamports` and burns the shares that pay it.
/// Returns the shares burnt; the caller releases them to the payee.
pub fn take_payment(
    vault: &mut Vault,
    position: &mut UserPosition,
    strategy: &dyn VaultStrategy,
    lamports: u64,
    now: i64,
    err: MarketError,
) -> Result<u64> {
    require_covered(strategy, Some(&*position), lamports, err)?;
    let shares = strategy.shares_for_payout(lamports)?;
    if shares > position.shares {
        return Err(err.into());
    }
    vault.debit(position, shares, now)?;
    Ok(shares)
}
