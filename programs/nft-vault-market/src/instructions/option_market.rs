use anchor_lang::prelude::*;
use anchor_spl::{
    associated_token::{self, get_associated_token_address, AssociatedToken},
    token,
};

use crate::{
    accrual::{self, SaleLedgers},
    constants::*,
    errors::MarketError,
    events::{
        OptionBidAccepted, OptionBidEntered, OptionBidModified, OptionBidWithdrawn, OptionClosed,
        OptionExercised,
    },
    instructions::{manage_bid::vault_of, place_bid::bidder_position},
    market,
    nft::{self, NftAccounts},
    state::{
        Epoch, Marketplace, OptionBid, OptionBidInput, OptionDuration, OptionState, RewardsConfig, UserEpochActivity,
        UserPosition,
    },
    stored::{registered_vault, Stored},
    strategy::{LoadedStrategy, VaultFunds},
};

#[derive(Accounts)]
#[instruction(name: [u8; 32])]
pub struct PlaceOptionBid<'info> {
    #[account(mut, seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    /// CHECK: escrow holder, compared against the NFT's current owner
    #[account(seeds = [MARKET_AUTHORITY_SEED], bump = marketplace.authority_bump)]
    pub market_authority: AccountInfo<'info>,

    /// CHECK: loaded as a registered `Vault` by the handler
    #[account(seeds = [VAULT_SEED, name.as_ref()], bump)]
    pub vault: UncheckedAccount<'info>,

    /// Buyer's position; absent or never created reads as an empty balance
    /// CHECK: read as a `UserPosition` when it exists
    pub position: Option<UncheckedAccount<'info>>,

    #[account(
        init,
        payer = buyer,
        space = OptionBid::LEN,
        seeds = [OPTION_SEED, marketplace.next_option_id.to_le_bytes().as_ref()],
        bump
    )]
    pub option_bid: Box<Account<'info, OptionBid>>,

    /// Token account holding the NFT, or the punk record
    /// CHECK: resolved by the NFT ownership lookup
    pub nft_holder: UncheckedAccount<'info>,

    #[account(mut)]
    pub buyer: Signer<'info>,

    /// CHECK: matched against the vault strategy
    pub yield_source: Option<UncheckedAccount<'info>>,

    #[account(mut)]
    pub epoch: Option<Account<'info, Epoch>>,

    #[account(mut)]
    pub activity: Option<Account<'info, UserEpochActivity>>,

    pub system_program: Program<'info, System>,
}

pub fn place_option_bid(ctx: Context<PlaceOptionBid>, _name: [u8; 32], input: OptionBidInput) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let buyer = ctx.accounts.buyer.key();
    let vault = registered_vault(&ctx.accounts.vault)?;
    let position = bidder_position(ctx.accounts.position.as_deref(), &vault.key(), &buyer)?;

    let yield_source = ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info());
    let strategy = LoadedStrategy::load(&vault.strategy, yield_source.as_ref())?;

    let option = market::enter_option_bid(
        &mut ctx.accounts.marketplace,
        &vault,
        &strategy,
        position.as_deref(),
        &ctx.accounts.nft_holder.to_account_info(),
        &ctx.accounts.market_authority.key(),
        &buyer,
        &input,
        ctx.bumps.option_bid,
    )?;

    if let (Some(epoch), Some(activity)) = (ctx.accounts.epoch.as_deref_mut(), ctx.accounts.activity.as_deref_mut()) {
        epoch.record_bid(activity, &buyer, &option.collection, option.strike, now)?;
    }

    emit!(OptionBidEntered {
        id: option.id,
        vault: option.vault,
        collection: option.collection,
        token_id: option.token_id,
        strike: option.strike,
        premium: option.premium,
        duration: option.duration,
        buyer,
    });

    ctx.accounts.option_bid.set_inner(option);
    Ok(())
}

#[derive(Accounts)]
#[instruction(option_id: u64)]
pub struct ModifyOptionBid<'info> {
    /// CHECK: loaded as an `OptionBid` by the handler
    #[account(mut, seeds = [OPTION_SEED, option_id.to_le_bytes().as_ref()], bump)]
    pub option_bid: UncheckedAccount<'info>,

    /// CHECK: loaded as the option's registered `Vault` by the handler
    pub vault: UncheckedAccount<'info>,

    /// CHECK: read as a `UserPosition` when it exists
    pub position: Option<UncheckedAccount<'info>>,

    pub buyer: Signer<'info>,

    /// CHECK: matched against the vault strategy
    pub yield_source: Option<UncheckedAccount<'info>>,
}

pub fn modify_option_bid(
    ctx: Context<ModifyOptionBid>,
    _option_id: u64,
    strike: u64,
    premium: u64,
    duration: OptionDuration,
) -> Result<()> {
    let buyer = ctx.accounts.buyer.key();
    let mut option = Stored::<OptionBid>::load(&ctx.accounts.option_bid, MarketError::OptionDoesNotExist)?;
    let vault = vault_of(&ctx.accounts.vault, &option.vault)?;
    let position = bidder_position(ctx.accounts.position.as_deref(), &vault.key(), &buyer)?;

    let yield_source = ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info());
    let strategy = LoadedStrategy::load(&vault.strategy, yield_source.as_ref())?;

    let mut updated = (*option).clone();
    updated.modify(&buyer, strike, premium, duration)?;
    market::require_covered(&strategy, position.as_deref(), premium, MarketError::InsufficientFunds)?;

    emit!(OptionBidModified {
        id: updated.id,
        strike,
        premium,
        duration,
    });

    *option = updated;
    option.persist()
}

#[derive(Accounts)]
#[instruction(option_id: u64)]
pub struct WithdrawOptionBid<'info> {
    /// CHECK: loaded as an `OptionBid` by the handler
    #[account(mut, seeds = [OPTION_SEED, option_id.to_le_bytes().as_ref()], bump)]
    pub option_bid: UncheckedAccount<'info>,

    pub buyer: Signer<'info>,
}

pub fn withdraw_option_bid(ctx: Context<WithdrawOptionBid>, _option_id: u64) -> Result<()> {
    let buyer = ctx.accounts.buyer.key();
    let mut option = Stored::<OptionBid>::load(&ctx.accounts.option_bid, MarketError::OptionDoesNotExist)?;
    option.withdraw(&buyer)?;
    option.persist()?;

    emit!(OptionBidWithdrawn { id: option.id, buyer });
    Ok(())
}

#[derive(Accounts)]
#[instruction(option_id: u64)]
pub struct AcceptOptionBid<'info> {
    #[account(seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    /// CHECK: PDA that takes custody of the NFT
    #[account(seeds = [MARKET_AUTHORITY_SEED], bump = marketplace.authority_bump)]
    pub market_authority: AccountInfo<'info>,

    /// CHECK: loaded as an `OptionBid` by the handler
    #[account(mut, seeds = [OPTION_SEED, option_id.to_le_bytes().as_ref()], bump)]
    pub option_bid: UncheckedAccount<'info>,

    /// CHECK: loaded as the option's registered `Vault` by the handler
    #[account(mut)]
    pub vault: UncheckedAccount<'info>,

    /// CHECK: loaded as the buyer's `UserPosition` by the handler
    #[account(mut)]
    pub buyer_position: UncheckedAccount<'info>,

    #[account(mut)]
    pub seller: Signer<'info>,

    /// Seller's token account holding the NFT, or the punk record
    /// CHECK: ownership resolved against the option's collection
    #[account(mut)]
    pub seller_nft: UncheckedAccount<'info>,

    /// Market authority's token account for the NFT mint, created on demand
    /// CHECK: address derived from the authority and `nft_mint`
    #[account(mut)]
    pub escrow_nft: Option<UncheckedAccount<'info>>,

    /// CHECK: must equal the option's token id
    pub nft_mint: Option<UncheckedAccount<'info>>,

    /// Token program or punk registry
    /// CHECK: matched against the option's collection
    pub nft_program: UncheckedAccount<'info>,

    pub associated_token_program: Option<Program<'info, AssociatedToken>>,

    /// CHECK: matched against the vault strategy
    #[account(mut)]
    pub yield_source: Option<UncheckedAccount<'info>>,

    pub system_program: Program<'info, System>,
    // Remaining accounts: stake pool fund accounts of the buyer, see `STAKE_POOL_ACCOUNTS_LEN`
}

impl<'info> AcceptOptionBid<'info> {
    /// Escrow token account for SPL NFTs; punks are held by the registry record.
    fn escrow_destination(&self, option: &OptionBid) -> Result<Option<AccountInfo<'info>>> {
        if self.marketplace.is_punk_collection(&option.collection) {
            return Ok(None);
        }

        let escrow = self.escrow_nft.as_ref().ok_or(MarketError::RecipientMismatch)?;
        let mint = self.nft_mint.as_ref().ok_or(MarketError::RecipientMismatch)?;
        let ata_program = self
            .associated_token_program
            .as_ref()
            .ok_or(MarketError::RecipientMismatch)?;
        require_keys_eq!(mint.key(), option.token_id, MarketError::RecipientMismatch);
        require_keys_eq!(
            escrow.key(),
            get_associated_token_address(&self.market_authority.key(), &option.token_id),
            MarketError::RecipientMismatch
        );
        require_keys_eq!(self.nft_program.key(), token::ID, MarketError::RecipientMismatch);

        associated_token::create_idempotent(CpiContext::new(
            ata_program.to_account_info(),
            associated_token::Create {
                payer: self.seller.to_account_info(),
                associated_token: escrow.to_account_info(),
                authority: self.market_authority.clone(),
                mint: mint.to_account_info(),
                system_program: self.system_program.to_account_info(),
                token_program: self.nft_program.to_account_info(),
            },
        ))?;
        Ok(Some(escrow.to_account_info()))
    }
}

/// Seller takes the premium and hands the NFT to market escrow until exercise or close.
pub fn accept_option_bid<'info>(
    ctx: Context<'_, '_, '_, 'info, AcceptOptionBid<'info>>,
    _option_id: u64,
) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let seller = ctx.accounts.seller.key();
    let mut option = Stored::<OptionBid>::load(&ctx.accounts.option_bid, MarketError::OptionDoesNotExist)?;
    option.ensure_exists()?;
    require!(option.state == OptionState::Pending, MarketError::OptionAlreadyAccepted);
    let (buyer, premium) = (option.buyer, option.premium);
    let (collection, token_id) = (option.collection, option.token_id);

    nft::require_owner(
        &ctx.accounts.marketplace,
        &collection,
        &token_id,
        &ctx.accounts.seller_nft,
        &seller,
    )?;

    let mut vault = vault_of(&ctx.accounts.vault, &option.vault)?;
    let mut position = Stored::<UserPosition>::load(&ctx.accounts.buyer_position, MarketError::OptionNoLongerValid)?;
    require!(position.belongs_to(&vault.key(), &buyer), MarketError::OptionNoLongerValid);

    let yield_source = ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info());
    let strategy = LoadedStrategy::load(&vault.strategy, yield_source.as_ref())?;
    let shares = market::take_payment(&mut vault, &mut position, &strategy, premium, now, MarketError::OptionNoLongerValid)?;
    vault.persist()?;
    position.persist()?;

    let escrow = ctx.accounts.escrow_destination(&option)?;
    let authority_seeds: &[&[u8]] = &[MARKET_AUTHORITY_SEED, &[ctx.accounts.marketplace.authority_bump]];
    nft::deliver_from_holder(
        &ctx.accounts.marketplace,
        &collection,
        &token_id,
        &NftAccounts {
            nft_program: ctx.accounts.nft_program.to_account_info(),
            source: ctx.accounts.seller_nft.to_account_info(),
            destination: escrow,
        },
        &ctx.accounts.seller.to_account_info(),
        &ctx.accounts.market_authority.key(),
        &ctx.accounts.market_authority,
        authority_seeds,
    )?;

    let funds = VaultFunds::new(
        &vault,
        ctx.accounts.system_program.to_account_info(),
        yield_source,
        ctx.remaining_accounts,
    );
    funds.release(&buyer, shares, &ctx.accounts.seller.to_account_info())?;

    option.accept(&seller, now)?;
    option.persist()?;
    msg!("option {} escrowed until {}", option.id, option.expiry);

    emit!(OptionBidAccepted {
        id: option.id,
        buyer,
        seller,
        premium,
        expiry: option.expiry,
    });
    Ok(())
}

#[derive(Accounts)]
#[instruction(option_id: u64)]
pub struct ExerciseOption<'info> {
    #[account(seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    /// CHECK: escrow holder and transfer signer
    #[account(seeds = [MARKET_AUTHORITY_SEED], bump = marketplace.authority_bump)]
    pub market_authority: AccountInfo<'info>,

    /// CHECK: loaded as an `OptionBid` by the handler
    #[account(mut, seeds = [OPTION_SEED, option_id.to_le_bytes().as_ref()], bump)]
    pub option_bid: UncheckedAccount<'info>,

    /// CHECK: loaded as the option's registered `Vault` by the handler
    #[account(mut)]
    pub vault: UncheckedAccount<'info>,

    /// CHECK: loaded as the buyer's `UserPosition` by the handler
    #[account(mut)]
    pub buyer_position: UncheckedAccount<'info>,

    #[account(mut)]
    pub buyer: Signer<'info>,

    /// CHECK: receives the strike; checked against the option's seller
    #[account(mut)]
    pub seller: UncheckedAccount<'info>,

    /// Escrow token account, or the punk record
    /// CHECK: must be held by the market authority
    #[account(mut)]
    pub escrow_nft: UncheckedAccount<'info>,

    /// Buyer's token account for SPL NFTs
    /// CHECK: mint and owner checked before transfer
    #[account(mut)]
    pub buyer_nft: Option<UncheckedAccount<'info>>,

    /// Token program or punk registry
    /// CHECK: matched against the option's collection
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

    /// CHECK: address derived and checked by the sale accrual
    #[account(mut)]
    pub buyer_activity: Option<UncheckedAccount<'info>>,

    /// CHECK: address derived and checked by the sale accrual
    #[account(mut)]
    pub seller_activity: Option<UncheckedAccount<'info>>,

    pub system_program: Program<'info, System>,
    // Remaining accounts: stake pool fund accounts of the buyer, see `STAKE_POOL_ACCOUNTS_LEN`
}

/// Buyer pays the strike from their live vault balance and receives the escrowed NFT.
pub fn exercise_option<'info>(ctx: Context<'_, '_, '_, 'info, ExerciseOption<'info>>, _option_id: u64) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let buyer = ctx.accounts.buyer.key();
    let mut option = Stored::<OptionBid>::load(&ctx.accounts.option_bid, MarketError::OptionDoesNotExist)?;
    option.check_exercise(&buyer, now)?;
    let (seller, strike) = (option.seller, option.strike);
    let (collection, token_id) = (option.collection, option.token_id);
    require_keys_eq!(ctx.accounts.seller.key(), seller, MarketError::NotYourOption);

    let mut vault = vault_of(&ctx.accounts.vault, &option.vault)?;
    let mut position = Stored::<UserPosition>::load(&ctx.accounts.buyer_position, MarketError::BidNoLongerValid)?;
    require!(position.belongs_to(&vault.key(), &buyer), MarketError::BidNoLongerValid);

    let yield_source = ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info());
    let strategy = LoadedStrategy::load(&vault.strategy, yield_source.as_ref())?;
    let shares = market::take_payment(&mut vault, &mut position, &strategy, strike, now, MarketError::BidNoLongerValid)?;
    vault.persist()?;
    position.persist()?;

    let funds = VaultFunds::new(
        &vault,
        ctx.accounts.system_program.to_account_info(),
        yield_source,
        ctx.remaining_accounts,
    );
    funds.release(&buyer, shares, &ctx.accounts.seller.to_account_info())?;

    let authority_seeds: &[&[u8]] = &[MARKET_AUTHORITY_SEED, &[ctx.accounts.marketplace.authority_bump]];
    nft::release_from_escrow(
        &ctx.accounts.marketplace,
        &collection,
        &token_id,
        &NftAccounts {
            nft_program: ctx.accounts.nft_program.to_account_info(),
            source: ctx.accounts.escrow_nft.to_account_info(),
            destination: ctx.accounts.buyer_nft.as_ref().map(|a| a.to_account_info()),
        },
        &buyer,
        &ctx.accounts.market_authority,
        authority_seeds,
    )?;

    option.exercise(&buyer, now)?;
    option.persist()?;

    accrual::record_completed_sale(
        &ctx.accounts.rewards_config,
        SaleLedgers {
            epoch: ctx.accounts.epoch.as_deref(),
            buyer_activity: ctx.accounts.buyer_activity.as_deref(),
            seller_activity: ctx.accounts.seller_activity.as_deref(),
        },
        &buyer,
        &seller,
        strike,
        now,
    )?;

    emit!(OptionExercised {
        id: option.id,
        buyer,
        seller,
        strike,
    });
    Ok(())
}

#[derive(Accounts)]
#[instruction(option_id: u64)]
pub struct CloseOption<'info> {
    #[account(seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    /// CHECK: escrow holder and transfer signer
    #[account(seeds = [MARKET_AUTHORITY_SEED], bump = marketplace.authority_bump)]
    pub market_authority: AccountInfo<'info>,

    /// CHECK: loaded as an `OptionBid` by the handler
    #[account(mut, seeds = [OPTION_SEED, option_id.to_le_bytes().as_ref()], bump)]
    pub option_bid: UncheckedAccount<'info>,

    pub seller: Signer<'info>,

    /// Escrow token account, or the punk record
    /// CHECK: must be held by the market authority
    #[account(mut)]
    pub escrow_nft: UncheckedAccount<'info>,

    /// Seller's token account for SPL NFTs
    /// CHECK: mint and owner checked before transfer
    #[account(mut)]
    pub seller_nft: Option<UncheckedAccount<'info>>,

    /// Token program or punk registry
    /// CHECK: matched against the option's collection
    pub nft_program: UncheckedAccount<'info>,
}

/// Returns an expired, unexercised option's NFT to its seller.
pub fn close_option(ctx: Context<CloseOption>, _option_id: u64) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let seller = ctx.accounts.seller.key();
    let mut option = Stored::<OptionBid>::load(&ctx.accounts.option_bid, MarketError::OptionDoesNotExist)?;
    option.close_expired(&seller, now)?;
    option.persist()?;

    let authority_seeds: &[&[u8]] = &[MARKET_AUTHORITY_SEED, &[ctx.accounts.marketplace.authority_bump]];
    nft::release_from_escrow(
        &ctx.accounts.marketplace,
        &option.collection,
        &option.token_id,
        &NftAccounts {
            nft_program: ctx.accounts.nft_program.to_account_info(),
            source: ctx.accounts.escrow_nft.to_account_info(),
            destination: ctx.accounts.seller_nft.as_ref().map(|a| a.to_account_info()),
        },
        &seller,
        &ctx.accounts.market_authority,
        authority_seeds,
    )?;

    emit!(OptionClosed { id: option.id, seller });
    Ok(())
}
