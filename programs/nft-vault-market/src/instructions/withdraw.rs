use anchor_lang::prelude::*;

use crate::{
    constants::*,
    errors::MarketError,
    events::WithdrawEvent,
    state::UserPosition,
    stored::{registered_vault, Stored},
    strategy::VaultFunds,
};

#[derive(Accounts)]
#[instruction(shares: u64, name: [u8; 32])]
pub struct Withdraw<'info> {
    /// CHECK: loaded as a registered `Vault` by the handler
    #[account(mut, seeds = [VAULT_SEED, name.as_ref()], bump)]
    pub vault: UncheckedAccount<'info>,

    /// CHECK: loaded as the caller's `UserPosition`; never created means nothing to withdraw
    #[account(mut, seeds = [POSITION_SEED, vault.key().as_ref(), user.key().as_ref()], bump)]
    pub position: UncheckedAccount<'info>,

    #[account(mut)]
    pub user: Signer<'info>,

    /// Receives pool tokens on LP withdrawals
    /// CHECK: validated by the token program during transfer
    #[account(mut)]
    pub destination_pool_tokens: Option<UncheckedAccount<'info>>,

    /// CHECK: matched against the vault strategy
    #[account(mut)]
    pub yield_source: Option<UncheckedAccount<'info>>,

    pub system_program: Program<'info, System>,
    // Remaining accounts: stake pool fund accounts, see `STAKE_POOL_ACCOUNTS_LEN`
}

pub fn withdraw<'info>(
    ctx: Context<'_, '_, '_, 'info, Withdraw<'info>>,
    shares: u64,
    name: [u8; 32],
) -> Result<()> {
    require!(shares > 0, MarketError::InvalidAmount);

    let now = Clock::get()?.unix_timestamp;
    let user = ctx.accounts.user.key();

    let mut vault = registered_vault(&ctx.accounts.vault)?;
    let mut position = Stored::<UserPosition>::load(&ctx.accounts.position, MarketError::InsufficientBalance)?;
    vault.debit(&mut position, shares, now)?;
    vault.persist()?;
    position.persist()?;

    let funds = VaultFunds::new(
        &vault,
        ctx.accounts.system_program.to_account_info(),
        ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info()),
        ctx.remaining_accounts,
    );
    let lamports = funds.release(&user, shares, &ctx.accounts.user.to_account_info())?;

    emit!(WithdrawEvent {
        name,
        user,
        shares,
        lamports,
        lp_token: false,
        timestamp: now,
    });

    Ok(())
}

/// Returns the vault's native share token instead of lamports.
pub fn withdraw_lp_token<'info>(
    ctx: Context<'_, '_, '_, 'info, Withdraw<'info>>,
    shares: u64,
    name: [u8; 32],
) -> Result<()> {
    require!(shares > 0, MarketError::InvalidAmount);

    let now = Clock::get()?.unix_timestamp;
    let user = ctx.accounts.user.key();
    let destination = ctx
        .accounts
        .destination_pool_tokens
        .as_ref()
        .map(|a| a.to_account_info())
        .ok_or(MarketError::StrategyAccountMismatch)?;

    let mut vault = registered_vault(&ctx.accounts.vault)?;
    let mut position = Stored::<UserPosition>::load(&ctx.accounts.position, MarketError::InsufficientBalance)?;
    vault.debit(&mut position, shares, now)?;
    vault.persist()?;
    position.persist()?;

    let funds = VaultFunds::new(
        &vault,
        ctx.accounts.system_program.to_account_info(),
        ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info()),
        ctx.remaining_accounts,
    );
    funds.release_lp(&user, shares, &destination)?;

    emit!(WithdrawEvent {
        name,
        user,
        shares,
        lamports: 0,
        lp_token: true,
        timestamp: now,
    });

    Ok(())
}
