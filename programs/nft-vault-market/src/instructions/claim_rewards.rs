use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::{
    claim::{self, ClaimAttestation, ClaimStrategy, MerkleClaim, WeightedClaim},
    constants::*,
    errors::MarketError,
    events::RewardsClaimed,
    state::{ClaimReceipt, Epoch, Marketplace, RewardsConfig, UserEpochActivity},
};

#[derive(Accounts)]
pub struct OpenEpochActivity<'info> {
    #[account(seeds = [REWARDS_SEED], bump = rewards_config.bump)]
    pub rewards_config: Box<Account<'info, RewardsConfig>>,

    #[account(
        seeds = [EPOCH_SEED, epoch.index.to_le_bytes().as_ref()],
        bump = epoch.bump
    )]
    pub epoch: Box<Account<'info, Epoch>>,

    #[account(
        init,
        payer = user,
        space = UserEpochActivity::LEN,
        seeds = [ACTIVITY_SEED, epoch.index.to_le_bytes().as_ref(), user.key().as_ref()],
        bump
    )]
    pub activity: Box<Account<'info, UserEpochActivity>>,

    #[account(mut)]
    pub user: Signer<'info>,

    pub system_program: Program<'info, System>,
}

/// Creates the caller's activity ledger for the currently open epoch.
pub fn open_epoch_activity(ctx: Context<OpenEpochActivity>) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let epoch = &ctx.accounts.epoch;
    require!(
        epoch.index.checked_add(1) == Some(ctx.accounts.rewards_config.epoch_count) && epoch.is_open(now),
        MarketError::EpochNotOpen
    );

    ctx.accounts.activity.set_inner(UserEpochActivity {
        epoch: epoch.index,
        user: ctx.accounts.user.key(),
        bump: ctx.bumps.activity,
        ..Default::default()
    });
    Ok(())
}

#[derive(Accounts)]
#[instruction(epoch_index: u64)]
pub struct ClaimRewards<'info> {
    #[account(seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    #[account(seeds = [REWARDS_SEED], bump = rewards_config.bump)]
    pub rewards_config: Box<Account<'info, RewardsConfig>>,

    /// Absent when the epoch was never started
    #[account(
        mut,
        seeds = [EPOCH_SEED, epoch_index.to_le_bytes().as_ref()],
        bump = epoch.bump
    )]
    pub epoch: Option<Account<'info, Epoch>>,

    /// Weighted mode only
    #[account(
        seeds = [ACTIVITY_SEED, epoch_index.to_le_bytes().as_ref(), user.key().as_ref()],
        bump = activity.bump
    )]
    pub activity: Option<Account<'info, UserEpochActivity>>,

    #[account(
        init_if_needed,
        payer = user,
        space = ClaimReceipt::LEN,
        seeds = [CLAIM_SEED, epoch_index.to_le_bytes().as_ref(), user.key().as_ref()],
        bump
    )]
    pub receipt: Box<Account<'info, ClaimReceipt>>,

    /// CHECK: PDA derivation
    #[account(seeds = [MARKET_AUTHORITY_SEED], bump = marketplace.authority_bump)]
    pub market_authority: AccountInfo<'info>,

    #[account(
        mut,
        associated_token::mint = marketplace.reward_mint,
        associated_token::authority = market_authority,
    )]
    pub reward_treasury: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        constraint = user_reward_account.mint == marketplace.reward_mint,
        constraint = user_reward_account.owner == user.key()
    )]
    pub user_reward_account: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub user: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

/// Pays the caller's share of a closed epoch, once.
pub fn claim_rewards(ctx: Context<ClaimRewards>, epoch_index: u64, attestation: ClaimAttestation) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let user = ctx.accounts.user.key();

    let strategy: Box<dyn ClaimStrategy + '_> = match &attestation {
        ClaimAttestation::Weighted => Box::new(WeightedClaim {
            activity: ctx.accounts.activity.as_deref(),
        }),
        ClaimAttestation::Merkle { amount, proof } => Box::new(MerkleClaim {
            amount: *amount,
            proof,
        }),
    };
    let mode = strategy.mode();
    let amount = claim::compute_claim(
        &ctx.accounts.rewards_config,
        epoch_index,
        ctx.accounts.epoch.as_deref(),
        strategy.as_ref(),
        &user,
        now,
    )?;

    let receipt = &mut ctx.accounts.receipt;
    if receipt.user == Pubkey::default() {
        receipt.epoch = epoch_index;
        receipt.user = user;
        receipt.bump = ctx.bumps.receipt;
    }
    receipt.mark_claimed(amount, now)?;

    let epoch = ctx
        .accounts
        .epoch
        .as_deref_mut()
        .ok_or(MarketError::EpochNotStarted)?;
    epoch.add_claimed(amount)?;

    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.reward_treasury.to_account_info(),
                to: ctx.accounts.user_reward_account.to_account_info(),
                authority: ctx.accounts.market_authority.to_account_info(),
            },
            &[&[MARKET_AUTHORITY_SEED, &[ctx.accounts.marketplace.authority_bump]]],
        ),
        amount,
    )?;

    emit!(RewardsClaimed {
        epoch: epoch_index,
        user,
        amount,
        mode,
    });
    Ok(())
}
