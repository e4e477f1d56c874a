use anchor_lang::prelude::*;
use anchor_spl::associated_token::AssociatedToken;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::{
    constants::*,
    events::{MarketplaceInitialized, OwnershipTransferred},
    state::{Marketplace, RewardsConfig},
};

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(
        init,
        payer = owner,
        space = Marketplace::LEN,
        seeds = [MARKETPLACE_SEED],
        bump
    )]
    pub marketplace: Box<Account<'info, Marketplace>>,

    #[account(
        init,
        payer = owner,
        space = RewardsConfig::LEN,
        seeds = [REWARDS_SEED],
        bump
    )]
    pub rewards_config: Box<Account<'info, RewardsConfig>>,

    /// PDA that owns the reward treasury and escrowed NFTs
    /// CHECK: derived and used as authority only
    #[account(seeds = [MARKET_AUTHORITY_SEED], bump)]
    pub market_authority: AccountInfo<'info>,

    pub reward_mint: Box<Account<'info, Mint>>,

    /// Program-owned reward treasury ATA
    #[account(
        init,
        payer = owner,
        associated_token::mint = reward_mint,
        associated_token::authority = market_authority,
    )]
    pub reward_treasury: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
}

pub fn initialize(ctx: Context<Initialize>, punk_registry: Pubkey) -> Result<()> {
    let marketplace = &mut ctx.accounts.marketplace;
    marketplace.owner = ctx.accounts.owner.key();
    marketplace.reward_mint = ctx.accounts.reward_mint.key();
    marketplace.punk_registry = punk_registry;
    marketplace.next_bid_id = 0;
    marketplace.next_option_id = 0;
    marketplace.authority_bump = ctx.bumps.market_authority;
    marketplace.bump = ctx.bumps.marketplace;

    let rewards_config = &mut ctx.accounts.rewards_config;
    rewards_config.bump = ctx.bumps.rewards_config;

    emit!(MarketplaceInitialized {
        owner: marketplace.owner,
        reward_mint: marketplace.reward_mint,
        punk_registry,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}

#[derive(Accounts)]
pub struct TransferOwnership<'info> {
    #[account(mut, seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Account<'info, Marketplace>,

    pub owner: Signer<'info>,
}

pub fn transfer_ownership(ctx: Context<TransferOwnership>, new_owner: Pubkey) -> Result<()> {
    let marketplace = &mut ctx.accounts.marketplace;
    marketplace.authorize(&ctx.accounts.owner.key())?;

    let previous_owner = marketplace.owner;
    marketplace.owner = new_owner;

    emit!(OwnershipTransferred {
        previous_owner,
        new_owner,
    });

    Ok(())
}
