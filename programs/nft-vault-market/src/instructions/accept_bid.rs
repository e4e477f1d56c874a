use anchor_lang::prelude::*;

use crate::{
    accrual::{self, SaleLedgers},
    constants::*,
    errors::MarketError,
    events::BidAccepted,
    instructions::manage_bid::vault_of,
    market,
    nft::{self, NftAccounts},
    state::{Bid, Marketplace, RewardsConfig, UserPosition},
    stored::Stored,
    strategy::{LoadedStrategy, VaultFunds},
};

#[derive(Accounts)]
#[instruction(bid_id: u64)]
pub struct AcceptBid<'info> {
    #[account(seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    /// CHECK: PDA signer for punk transfers
    #[account(seeds = [MARKET_AUTHORITY_SEED], bump = marketplace.authority_bump)]
    pub market_authority: AccountInfo<'info>,

    /// CHECK: loaded as a `Bid` by the handler
    #[account(mut, seeds = [BID_SEED, bid_id.to_le_bytes().as_ref()], bump)]
    pub bid: UncheckedAccount<'info>,

    /// CHECK: loaded as the bid's registered `Vault` by the handler
    #[account(mut)]
    pub vault: UncheckedAccount<'info>,

    /// CHECK: loaded as the bidder's `UserPosition` by the handler
    #[account(mut)]
    pub bidder_position: UncheckedAccount<'info>,

    #[account(mut)]
    pub seller: Signer<'info>,

    /// Seller's token account holding the NFT, or the punk record
    /// CHECK: ownership resolved against the bid's collection
    #[account(mut)]
    pub seller_nft: UncheckedAccount<'info>,

    /// Bidder's token account for SPL NFTs
    /// CHECK: mint and owner checked before transfer
    #[account(mut)]
    pub bidder_nft: Option<UncheckedAccount<'info>>,

    /// Token program or punk registry
    /// CHECK: matched against the bid's collection
    pub nft_program: UncheckedAccount<'info>,

    /// CHECK: matched against the vault strategy
    #[account(mut)]
    pub yield_source: Option<UncheckedAccount<'info>>,

    #[account(seeds = [REWARDS_SEED], bump = rewards_config.bump)]
    pub rewards_config: Box<Account<'info, RewardsConfig>>,

    /// Current epoch; required while an epoch is open
    /// CHECK: loaded as an `Epoch` by the sale accrual
    #[account(mut)]
    pub epoch: Option<UncheckedAccount<'info>>,

    /// Bidder's activity ledger address for the current epoch; required while an epoch is open
    /// CHECK: address derived and checked by the sale accrual
    #[account(mut)]
    pub bidder_activity: Option<UncheckedAccount<'info>>,

    /// CHECK: address derived and checked by the sale accrual
    #[account(mut)]
    pub seller_activity: Option<UncheckedAccount<'info>>,

    pub system_program: Program<'info, System>,
    // Remaining accounts: stake pool fund accounts of the bidder, see `STAKE_POOL_ACCOUNTS_LEN`
}

/// Sells the NFT into a standing bid, paying the seller out of the bidder's live vault balance.
pub fn accept_bid<'info>(ctx: Context<'_, '_, '_, 'info, AcceptBid<'info>>, _bid_id: u64) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let seller = ctx.accounts.seller.key();
    let mut bid = Stored::<Bid>::load(&ctx.accounts.bid, MarketError::BidDoesNotExist)?;
    bid.ensure_exists()?;
    let (bidder, amount) = (bid.bidder, bid.amount);

    nft::require_owner(
        &ctx.accounts.marketplace,
        &bid.collection,
        &bid.token_id,
        &ctx.accounts.seller_nft,
        &seller,
    )?;

    let mut vault = vault_of(&ctx.accounts.vault, &bid.vault)?;
    let mut position = Stored::<UserPosition>::load(&ctx.accounts.bidder_position, MarketError::BidNoLongerValid)?;
    require!(position.belongs_to(&vault.key(), &bidder), MarketError::BidNoLongerValid);

    let yield_source = ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info());
    let strategy = LoadedStrategy::load(&vault.strategy, yield_source.as_ref())?;
    let shares = market::take_payment(&mut vault, &mut position, &strategy, amount, now, MarketError::BidNoLongerValid)?;
    vault.persist()?;
    position.persist()?;

    let authority_seeds: &[&[u8]] = &[MARKET_AUTHORITY_SEED, &[ctx.accounts.marketplace.authority_bump]];
    nft::deliver_from_holder(
        &ctx.accounts.marketplace,
        &bid.collection,
        &bid.token_id,
        &NftAccounts {
            nft_program: ctx.accounts.nft_program.to_account_info(),
            source: ctx.accounts.seller_nft.to_account_info(),
            destination: ctx.accounts.bidder_nft.as_ref().map(|a| a.to_account_info()),
        },
        &ctx.accounts.seller.to_account_info(),
        &bidder,
        &ctx.accounts.market_authority,
        authority_seeds,
    )?;

    let funds = VaultFunds::new(
        &vault,
        ctx.accounts.system_program.to_account_info(),
        yield_source,
        ctx.remaining_accounts,
    );
    let paid = funds.release(&bidder, shares, &ctx.accounts.seller.to_account_info())?;

    bid.active = false;
    bid.persist()?;

    accrual::record_completed_sale(
        &ctx.accounts.rewards_config,
        SaleLedgers {
            epoch: ctx.accounts.epoch.as_deref(),
            buyer_activity: ctx.accounts.bidder_activity.as_deref(),
            seller_activity: ctx.accounts.seller_activity.as_deref(),
        },
        &bidder,
        &seller,
        amount,
        now,
    )?;

    emit!(BidAccepted {
        id: bid.id,
        bidder,
        seller,
        amount,
        shares,
        paid,
    });

    Ok(())
}
