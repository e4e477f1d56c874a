use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::{
    constants::*,
    errors::MarketError,
    events::{RewardAdded, RewardPaid, RewardsDurationUpdated},
    market,
    state::{Marketplace, UserPosition},
    stored::{registered_vault, Stored},
    strategy::LoadedStrategy,
};

#[derive(Accounts)]
#[instruction(name: [u8; 32])]
pub struct SetRewardsDuration<'info> {
    #[account(seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    /// CHECK: loaded as a registered `Vault` by the handler
    #[account(mut, seeds = [VAULT_SEED, name.as_ref()], bump)]
    pub vault: UncheckedAccount<'info>,

    pub owner: Signer<'info>,
}

pub fn set_rewards_duration(ctx: Context<SetRewardsDuration>, name: [u8; 32], duration: i64) -> Result<()> {
    ctx.accounts.marketplace.authorize(&ctx.accounts.owner.key())?;

    let mut vault = registered_vault(&ctx.accounts.vault)?;
    let now = Clock::get()?.unix_timestamp;
    vault.rewards.set_rewards_duration(duration, now)?;
    vault.persist()?;

    emit!(RewardsDurationUpdated { name, duration });

    Ok(())
}

#[derive(Accounts)]
#[instruction(name: [u8; 32])]
pub struct NotifyRewardAmount<'info> {
    #[account(seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    /// CHECK: loaded as a registered `Vault` by the handler
    #[account(mut, seeds = [VAULT_SEED, name.as_ref()], bump)]
    pub vault: UncheckedAccount<'info>,

    /// CHECK: PDA derivation
    #[account(seeds = [MARKET_AUTHORITY_SEED], bump = marketplace.authority_bump)]
    pub market_authority: AccountInfo<'info>,

    #[account(
        mut,
        associated_token::mint = marketplace.reward_mint,
        associated_token::authority = market_authority,
    )]
    pub reward_treasury: Box<Account<'info, TokenAccount>>,

    /// Owner's reward token account funding the period
    #[account(mut, constraint = funding_account.mint == marketplace.reward_mint)]
    pub funding_account: Box<Account<'info, TokenAccount>>,

    pub owner: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

pub fn notify_reward_amount(ctx: Context<NotifyRewardAmount>, name: [u8; 32], reward: u64) -> Result<()> {
    ctx.accounts.marketplace.authorize(&ctx.accounts.owner.key())?;
    let mut vault = registered_vault(&ctx.accounts.vault)?;

    if reward > 0 {
        token::transfer(
            CpiContext::new(
                ctx.accounts.token_program.to_account_info(),
                Transfer {
                    from: ctx.accounts.funding_account.to_account_info(),
                    to: ctx.accounts.reward_treasury.to_account_info(),
                    authority: ctx.accounts.owner.to_account_info(),
                },
            ),
            reward,
        )?;
    }

    let now = Clock::get()?.unix_timestamp;
    let total_shares = vault.total_shares;
    vault.rewards.notify_reward_amount(total_shares, reward, now)?;
    vault.persist()?;

    emit!(RewardAdded {
        name,
        reward,
        reward_rate: vault.rewards.reward_rate,
        period_finish: vault.rewards.period_finish,
    });

    Ok(())
}

#[derive(Accounts)]
#[instruction(name: [u8; 32])]
pub struct GetReward<'info> {
    #[account(seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    /// CHECK: loaded as a registered `Vault` by the handler
    #[account(mut, seeds = [VAULT_SEED, name.as_ref()], bump)]
    pub vault: UncheckedAccount<'info>,

    /// CHECK: loaded as the caller's `UserPosition` when it exists
    #[account(mut, seeds = [POSITION_SEED, vault.key().as_ref(), user.key().as_ref()], bump)]
    pub position: UncheckedAccount<'info>,

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

    pub user: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

pub fn get_reward(ctx: Context<GetReward>, name: [u8; 32]) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let mut vault = registered_vault(&ctx.accounts.vault)?;
    let Some(mut position) =
        Stored::<UserPosition>::load_if_created(Some(&*ctx.accounts.position), MarketError::PositionMismatch)?
    else {
        return Ok(());
    };

    let total_shares = vault.total_shares;
    vault.rewards.settle(total_shares, Some(&mut *position), now)?;

    let reward = position.rewards;
    position.rewards = 0;
    vault.persist()?;
    position.persist()?;
    if reward == 0 {
        return Ok(());
    }

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
        reward,
    )?;

    emit!(RewardPaid {
        name,
        user: ctx.accounts.user.key(),
        reward,
    });

    Ok(())
}

/// Balances of one user in one vault at the current strategy rate.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct VaultBalance {
    pub shares: u64,
    pub lamports: u64,
    pub principal: u64,
    pub reward_per_token: u128,
    pub earned: u64,
}

#[derive(Accounts)]
#[instruction(name: [u8; 32])]
pub struct ViewVaultBalance<'info> {
    /// CHECK: loaded as a registered `Vault` by the handler
    #[account(seeds = [VAULT_SEED, name.as_ref()], bump)]
    pub vault: UncheckedAccount<'info>,

    /// CHECK: read as a `UserPosition` when it exists
    pub position: Option<UncheckedAccount<'info>>,

    /// CHECK: matched against the vault strategy
    pub yield_source: Option<UncheckedAccount<'info>>,
}

/// Read-only; meant for simulation. Returns the balance as instruction return data.
pub fn vault_balance(ctx: Context<ViewVaultBalance>, _name: [u8; 32]) -> Result<VaultBalance> {
    let now = Clock::get()?.unix_timestamp;
    let vault = registered_vault(&ctx.accounts.vault)?;

    let stored = Stored::<UserPosition>::load_if_created(ctx.accounts.position.as_deref(), MarketError::PositionMismatch)?;
    let position = stored.as_deref();
    if let Some(position) = position {
        require_keys_eq!(position.vault, vault.key(), MarketError::PositionMismatch);
    }

    let yield_source = ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info());
    let strategy = LoadedStrategy::load(&vault.strategy, yield_source.as_ref())?;

    let earned = match position {
        Some(position) => vault.rewards.earned(position, vault.total_shares, now)?,
        None => 0,
    };

    Ok(VaultBalance {
        shares: position.map_or(0, |p| p.shares),
        lamports: market::live_value(&strategy, position)?,
        principal: position.map_or(0, |p| p.principal),
        reward_per_token: vault.rewards.reward_per_token(vault.total_shares, now)?,
        earned,
    })
}
