use anchor_lang::prelude::*;

use crate::{
    constants::*,
    errors::MarketError,
    events::{BidModified, BidWithdrawn},
    instructions::{batch, place_bid::bidder_position},
    market,
    state::{Bid, Vault},
    stored::{registered_vault, Stored},
    strategy::LoadedStrategy,
};

#[derive(Accounts)]
#[instruction(bid_id: u64)]
pub struct ModifyBid<'info> {
    /// CHECK: loaded as a `Bid` by the handler
    #[account(mut, seeds = [BID_SEED, bid_id.to_le_bytes().as_ref()], bump)]
    pub bid: UncheckedAccount<'info>,

    /// CHECK: loaded as the bid's registered `Vault` by the handler
    pub vault: UncheckedAccount<'info>,

    /// CHECK: read as a `UserPosition` when it exists
    pub position: Option<UncheckedAccount<'info>>,

    pub bidder: Signer<'info>,

    /// CHECK: matched against the vault strategy
    pub yield_source: Option<UncheckedAccount<'info>>,
}

pub fn modify_bid(ctx: Context<ModifyBid>, _bid_id: u64, amount: u64) -> Result<()> {
    let bidder = ctx.accounts.bidder.key();
    let mut bid = Stored::<Bid>::load(&ctx.accounts.bid, MarketError::BidDoesNotExist)?;
    let vault = vault_of(&ctx.accounts.vault, &bid.vault)?;
    let position = bidder_position(ctx.accounts.position.as_deref(), &vault.key(), &bidder)?;

    let yield_source = ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info());
    let strategy = LoadedStrategy::load(&vault.strategy, yield_source.as_ref())?;

    market::modify_bid(&mut bid, &bidder, amount, &strategy, position.as_deref())?;
    bid.persist()?;

    emit!(BidModified { id: bid.id, amount });

    Ok(())
}

/// The registered vault a bid or option was placed against.
pub(crate) fn vault_of<'a, 'info>(info: &'a AccountInfo<'info>, name: &[u8; 32]) -> Result<Stored<'a, 'info, Vault>> {
    let vault = registered_vault(info)?;
    require!(vault.name == *name, MarketError::VaultNotFound);
    Ok(vault)
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BidUpdate {
    pub bid_id: u64,
    pub amount: u64,
}

#[derive(Accounts)]
#[instruction(name: [u8; 32])]
pub struct ModifyMultipleBids<'info> {
    /// CHECK: loaded as a registered `Vault` by the handler
    #[account(seeds = [VAULT_SEED, name.as_ref()], bump)]
    pub vault: UncheckedAccount<'info>,

    /// CHECK: read as a `UserPosition` when it exists
    pub position: Option<UncheckedAccount<'info>>,

    pub bidder: Signer<'info>,

    /// CHECK: matched against the vault strategy
    pub yield_source: Option<UncheckedAccount<'info>>,
    // Remaining accounts: one writable bid account per update, in order
}

pub fn modify_multiple_bids<'info>(
    ctx: Context<'_, '_, '_, 'info, ModifyMultipleBids<'info>>,
    _name: [u8; 32],
    updates: Vec<BidUpdate>,
) -> Result<()> {
    batch::check_batch(updates.len(), ctx.remaining_accounts.len(), 1)?;

    let bidder = ctx.accounts.bidder.key();
    let vault = registered_vault(&ctx.accounts.vault)?;
    let position = bidder_position(ctx.accounts.position.as_deref(), &vault.key(), &bidder)?;
    let position = position.as_deref();

    let yield_source = ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info());
    let strategy = LoadedStrategy::load(&vault.strategy, yield_source.as_ref())?;

    for (update, info) in updates.iter().zip(ctx.remaining_accounts.iter()) {
        let mut bid = Stored::<Bid>::load(info, MarketError::BidDoesNotExist)?;
        require!(
            bid.id == update.bid_id && bid.vault == vault.name,
            MarketError::BatchAccountsMismatch
        );

        market::modify_bid(&mut bid, &bidder, update.amount, &strategy, position)?;
        bid.persist()?;

        emit!(BidModified {
            id: bid.id,
            amount: update.amount,
        });
    }

    Ok(())
}

#[derive(Accounts)]
#[instruction(bid_id: u64)]
pub struct WithdrawBid<'info> {
    /// CHECK: loaded as a `Bid` by the handler
    #[account(mut, seeds = [BID_SEED, bid_id.to_le_bytes().as_ref()], bump)]
    pub bid: UncheckedAccount<'info>,

    pub bidder: Signer<'info>,
}

pub fn withdraw_bid(ctx: Context<WithdrawBid>, _bid_id: u64) -> Result<()> {
    let bidder = ctx.accounts.bidder.key();
    let mut bid = Stored::<Bid>::load(&ctx.accounts.bid, MarketError::BidDoesNotExist)?;
    bid.withdraw(&bidder)?;
    bid.persist()?;

    emit!(BidWithdrawn { id: bid.id, bidder });

    Ok(())
}

#[derive(Accounts)]
pub struct WithdrawMultipleBids<'info> {
    pub bidder: Signer<'info>,
    // Remaining accounts: one writable bid account per id, in order
}

pub fn withdraw_multiple_bids<'info>(
    ctx: Context<'_, '_, '_, 'info, WithdrawMultipleBids<'info>>,
    bid_ids: Vec<u64>,
) -> Result<()> {
    batch::check_batch(bid_ids.len(), ctx.remaining_accounts.len(), 1)?;

    let bidder = ctx.accounts.bidder.key();
    for (bid_id, info) in bid_ids.iter().zip(ctx.remaining_accounts.iter()) {
        let mut bid = Stored::<Bid>::load(info, MarketError::BidDoesNotExist)?;
        require!(bid.id == *bid_id, MarketError::BatchAccountsMismatch);

        bid.withdraw(&bidder)?;
        bid.persist()?;

        emit!(BidWithdrawn { id: bid.id, bidder });
    }

    Ok(())
}
