use anchor_lang::prelude::*;

use crate::{
    constants::*,
    errors::MarketError,
    events::DepositEvent,
    state::{Epoch, UserEpochActivity, UserPosition},
    stored::registered_vault,
    strategy::{LoadedStrategy, VaultFunds, VaultStrategy},
};

#[derive(Accounts)]
#[instruction(name: [u8; 32])]
pub struct Deposit<'info> {
    /// CHECK: loaded as a registered `Vault` by the handler
    #[account(mut, seeds = [VAULT_SEED, name.as_ref()], bump)]
    pub vault: UncheckedAccount<'info>,

    #[account(
        init_if_needed,
        payer = depositor,
        space = UserPosition::LEN,
        seeds = [POSITION_SEED, vault.key().as_ref(), depositor.key().as_ref()],
        bump
    )]
    pub position: Box<Account<'info, UserPosition>>,

    #[account(mut)]
    pub depositor: Signer<'info>,

    /// Stake pool of stake-pool vaults
    /// CHECK: matched against the vault strategy
    #[account(mut)]
    pub yield_source: Option<UncheckedAccount<'info>>,

    /// Open epoch, when deposit activity should accrue
    #[account(mut)]
    pub epoch: Option<Account<'info, Epoch>>,

    #[account(mut)]
    pub activity: Option<Account<'info, UserEpochActivity>>,

    pub system_program: Program<'info, System>,
    // Remaining accounts: stake pool fund accounts, see `STAKE_POOL_ACCOUNTS_LEN`
}

pub fn deposit<'info>(
    ctx: Context<'_, '_, '_, 'info, Deposit<'info>>,
    name: [u8; 32],
    lamports: u64,
) -> Result<()> {
    require!(lamports > 0, MarketError::InvalidAmount);

    let mut vault = registered_vault(&ctx.accounts.vault)?;
    let now = Clock::get()?.unix_timestamp;
    let depositor = ctx.accounts.depositor.key();
    ctx.accounts.position.bind(&vault.key(), &depositor, ctx.bumps.position)?;

    let funds = VaultFunds::new(
        &vault,
        ctx.accounts.system_program.to_account_info(),
        ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info()),
        ctx.remaining_accounts,
    );
    let shares = funds.accept_deposit(&depositor, &ctx.accounts.depositor.to_account_info(), lamports)?;

    vault.credit(&mut ctx.accounts.position, lamports, shares, now)?;
    vault.persist()?;

    if let (Some(epoch), Some(activity)) = (ctx.accounts.epoch.as_deref_mut(), ctx.accounts.activity.as_deref_mut()) {
        epoch.record_deposit(activity, &depositor, lamports, now)?;
    }

    emit!(DepositEvent {
        name,
        user: depositor,
        lamports,
        shares,
        lp_token: false,
        timestamp: now,
    });

    Ok(())
}

#[derive(Accounts)]
#[instruction(name: [u8; 32])]
pub struct DepositLpToken<'info> {
    /// CHECK: loaded as a registered `Vault` by the handler
    #[account(mut, seeds = [VAULT_SEED, name.as_ref()], bump)]
    pub vault: UncheckedAccount<'info>,

    #[account(
        init_if_needed,
        payer = depositor,
        space = UserPosition::LEN,
        seeds = [POSITION_SEED, vault.key().as_ref(), depositor.key().as_ref()],
        bump
    )]
    pub position: Box<Account<'info, UserPosition>>,

    #[account(mut)]
    pub depositor: Signer<'info>,

    /// Depositor's pool token account
    /// CHECK: validated by the token program during transfer
    #[account(mut)]
    pub source_pool_tokens: UncheckedAccount<'info>,

    /// CHECK: matched against the vault strategy
    pub yield_source: Option<UncheckedAccount<'info>>,

    #[account(mut)]
    pub epoch: Option<Account<'info, Epoch>>,

    #[account(mut)]
    pub activity: Option<Account<'info, UserEpochActivity>>,

    pub system_program: Program<'info, System>,
}

/// Deposits the vault's native share token directly; shares are credited 1:1.
pub fn deposit_lp_token<'info>(
    ctx: Context<'_, '_, '_, 'info, DepositLpToken<'info>>,
    name: [u8; 32],
    amount: u64,
) -> Result<()> {
    require!(amount > 0, MarketError::InvalidAmount);

    let mut vault = registered_vault(&ctx.accounts.vault)?;
    let yield_source = ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info());
    let strategy = LoadedStrategy::load(&vault.strategy, yield_source.as_ref())?;
    require!(strategy.lp_mint().is_some(), MarketError::LpTokenDisabled);
    let principal = strategy.value_of(amount)?;

    let now = Clock::get()?.unix_timestamp;
    let depositor = ctx.accounts.depositor.key();
    ctx.accounts.position.bind(&vault.key(), &depositor, ctx.bumps.position)?;

    let funds = VaultFunds::new(
        &vault,
        ctx.accounts.system_program.to_account_info(),
        yield_source,
        ctx.remaining_accounts,
    );
    funds.accept_lp(
        &depositor,
        &ctx.accounts.depositor.to_account_info(),
        &ctx.accounts.source_pool_tokens.to_account_info(),
        amount,
    )?;

    vault.credit(&mut ctx.accounts.position, principal, amount, now)?;
    vault.persist()?;

    if let (Some(epoch), Some(activity)) = (ctx.accounts.epoch.as_deref_mut(), ctx.accounts.activity.as_deref_mut()) {
        epoch.record_deposit(activity, &depositor, principal, now)?;
    }

    emit!(DepositEvent {
        name,
        user: depositor,
        lamports: principal,
        shares: amount,
        lp_token: true,
        timestamp: now,
    });

    Ok(())
}
