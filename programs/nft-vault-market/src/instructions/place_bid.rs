use anchor_lang::prelude::*;

use crate::{
    constants::*,
    errors::MarketError,
    events::BidEntered,
    instructions::batch,
    market,
    state::{Bid, BidInput, Epoch, Marketplace, UserEpochActivity, UserPosition},
    stored::{registered_vault, Stored},
    strategy::LoadedStrategy,
};

#[derive(Accounts)]
#[instruction(name: [u8; 32])]
pub struct PlaceBid<'info> {
    #[account(mut, seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    /// CHECK: loaded as a registered `Vault` by the handler
    #[account(seeds = [VAULT_SEED, name.as_ref()], bump)]
    pub vault: UncheckedAccount<'info>,

    /// Bidder's position; absent or never created reads as an empty balance
    /// CHECK: read as a `UserPosition` when it exists
    pub position: Option<UncheckedAccount<'info>>,

    #[account(
        init,
        payer = bidder,
        space = Bid::LEN,
        seeds = [BID_SEED, marketplace.next_bid_id.to_le_bytes().as_ref()],
        bump
    )]
    pub bid: Box<Account<'info, Bid>>,

    /// Token account holding the NFT, or the punk record
    /// CHECK: resolved by the NFT ownership lookup
    pub nft_holder: UncheckedAccount<'info>,

    #[account(mut)]
    pub bidder: Signer<'info>,

    /// CHECK: matched against the vault strategy
    pub yield_source: Option<UncheckedAccount<'info>>,

    #[account(mut)]
    pub epoch: Option<Account<'info, Epoch>>,

    #[account(mut)]
    pub activity: Option<Account<'info, UserEpochActivity>>,

    pub system_program: Program<'info, System>,
}

pub(crate) fn bidder_position<'a, 'info>(
    info: Option<&'a AccountInfo<'info>>,
    vault: &Pubkey,
    bidder: &Pubkey,
) -> Result<Option<Stored<'a, 'info, UserPosition>>> {
    let position = Stored::<UserPosition>::load_if_created(info, MarketError::PositionMismatch)?;
    if let Some(position) = &position {
        require!(position.belongs_to(vault, bidder), MarketError::PositionMismatch);
    }
    Ok(position)
}

pub fn place_bid(ctx: Context<PlaceBid>, _name: [u8; 32], input: BidInput) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let bidder = ctx.accounts.bidder.key();
    let vault = registered_vault(&ctx.accounts.vault)?;
    let position = bidder_position(ctx.accounts.position.as_deref(), &vault.key(), &bidder)?;
    let position = position.as_deref();

    let yield_source = ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info());
    let strategy = LoadedStrategy::load(&vault.strategy, yield_source.as_ref())?;

    let bid = market::enter_bid(
        &mut ctx.accounts.marketplace,
        &vault,
        &strategy,
        position,
        &ctx.accounts.nft_holder.to_account_info(),
        &bidder,
        &input,
        ctx.bumps.bid,
    )?;

    if let (Some(epoch), Some(activity)) = (ctx.accounts.epoch.as_deref_mut(), ctx.accounts.activity.as_deref_mut()) {
        epoch.record_bid(activity, &bidder, &bid.collection, bid.amount, now)?;
    }

    emit!(BidEntered {
        id: bid.id,
        vault: bid.vault,
        collection: bid.collection,
        token_id: bid.token_id,
        amount: bid.amount,
        bidder,
    });

    ctx.accounts.bid.set_inner(bid);
    Ok(())
}

#[derive(Accounts)]
#[instruction(name: [u8; 32])]
pub struct PlaceMultipleBids<'info> {
    #[account(mut, seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    /// CHECK: loaded as a registered `Vault` by the handler
    #[account(seeds = [VAULT_SEED, name.as_ref()], bump)]
    pub vault: UncheckedAccount<'info>,

    /// CHECK: read as a `UserPosition` when it exists
    pub position: Option<UncheckedAccount<'info>>,

    #[account(mut)]
    pub bidder: Signer<'info>,

    /// CHECK: matched against the vault strategy
    pub yield_source: Option<UncheckedAccount<'info>>,

    #[account(mut)]
    pub epoch: Option<Account<'info, Epoch>>,

    #[account(mut)]
    pub activity: Option<Account<'info, UserEpochActivity>>,

    pub system_program: Program<'info, System>,
    // Remaining accounts, per bid in order: [bid_pda (writable, uninitialized), nft_holder]
}

/// Places every bid in order with the single-bid rules; the first failure aborts the batch.
pub fn place_multiple_bids<'info>(
    ctx: Context<'_, '_, '_, 'info, PlaceMultipleBids<'info>>,
    _name: [u8; 32],
    inputs: Vec<BidInput>,
) -> Result<()> {
    batch::check_batch(inputs.len(), ctx.remaining_accounts.len(), 2)?;

    let now = Clock::get()?.unix_timestamp;
    let bidder = ctx.accounts.bidder.key();
    let vault = registered_vault(&ctx.accounts.vault)?;
    let position = bidder_position(ctx.accounts.position.as_deref(), &vault.key(), &bidder)?;
    let position = position.as_deref();

    let yield_source = ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info());
    let strategy = LoadedStrategy::load(&vault.strategy, yield_source.as_ref())?;

    let payer = ctx.accounts.bidder.to_account_info();
    let system_program = ctx.accounts.system_program.to_account_info();

    for (input, accounts) in inputs.iter().zip(ctx.remaining_accounts.chunks(2)) {
        let (bid_info, nft_holder) = (&accounts[0], &accounts[1]);

        let id_bytes = ctx.accounts.marketplace.next_bid_id.to_le_bytes();
        let (expected, bump) = Pubkey::find_program_address(&[BID_SEED, id_bytes.as_ref()], &crate::ID);
        require_keys_eq!(bid_info.key(), expected, MarketError::BatchAccountsMismatch);

        let bid = market::enter_bid(
            &mut ctx.accounts.marketplace,
            &vault,
            &strategy,
            position,
            nft_holder,
            &bidder,
            input,
            bump,
        )?;

        batch::create_pda(
            &payer,
            bid_info,
            &system_program,
            Bid::LEN,
            &[BID_SEED, id_bytes.as_ref(), &[bump]],
        )?;
        batch::store(bid_info, &bid)?;

        if let (Some(epoch), Some(activity)) = (ctx.accounts.epoch.as_deref_mut(), ctx.accounts.activity.as_deref_mut()) {
            epoch.record_bid(activity, &bidder, &bid.collection, bid.amount, now)?;
        }

        emit!(BidEntered {
            id: bid.id,
            vault: bid.vault,
            collection: bid.collection,
            token_id: bid.token_id,
            amount: bid.amount,
            bidder,
        });
    }

    Ok(())
}
