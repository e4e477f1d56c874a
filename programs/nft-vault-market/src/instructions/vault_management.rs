use anchor_lang::prelude::*;

use crate::{
    constants::*,
    errors::MarketError,
    events::{VaultRegistered, VaultUnregistered, VaultUpgraded},
    state::{Marketplace, RewardDistributor, Vault},
    stored::registered_vault,
    strategy::StrategyConfig,
};

#[derive(Accounts)]
#[instruction(name: [u8; 32])]
pub struct RegisterVault<'info> {
    #[account(seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    #[account(
        init_if_needed,
        payer = owner,
        space = Vault::LEN,
        seeds = [VAULT_SEED, name.as_ref()],
        bump
    )]
    pub vault: Box<Account<'info, Vault>>,

    /// Stake pool backing the vault; required for stake-pool strategies
    /// CHECK: owner and layout validated when the strategy is resolved
    pub yield_source: Option<UncheckedAccount<'info>>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn register_vault(ctx: Context<RegisterVault>, name: [u8; 32], strategy: StrategyConfig) -> Result<()> {
    ctx.accounts.marketplace.authorize(&ctx.accounts.owner.key())?;

    let vault = &mut ctx.accounts.vault;
    require!(!vault.registered, MarketError::VaultAlreadyRegistered);

    let yield_source = ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info());
    let strategy = strategy.resolve(yield_source.as_ref())?;

    vault.name = name;
    vault.strategy = strategy;
    vault.registered = true;
    vault.total_principal = 0;
    vault.total_shares = 0;
    vault.rewards = RewardDistributor::default();
    vault.bump = ctx.bumps.vault;

    msg!("Vault registered, generation {}", vault.generation);

    emit!(VaultRegistered {
        name,
        strategy,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}

#[derive(Accounts)]
#[instruction(name: [u8; 32])]
pub struct ConfigureVault<'info> {
    #[account(seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    /// CHECK: loaded as a registered `Vault` by the handler
    #[account(mut, seeds = [VAULT_SEED, name.as_ref()], bump)]
    pub vault: UncheckedAccount<'info>,

    /// Successor stake pool for upgrades
    /// CHECK: owner and layout validated when the strategy is resolved
    pub yield_source: Option<UncheckedAccount<'info>>,

    pub owner: Signer<'info>,
}

pub fn unregister_vault(ctx: Context<ConfigureVault>, name: [u8; 32]) -> Result<()> {
    ctx.accounts.marketplace.authorize(&ctx.accounts.owner.key())?;

    let mut vault = registered_vault(&ctx.accounts.vault)?;
    require!(vault.is_empty(), MarketError::VaultNotEmpty);
    vault.registered = false;
    vault.persist()?;

    emit!(VaultUnregistered {
        name,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}

/// Moves the vault onto a successor strategy. Shares and principal carry over untouched,
/// so the successor must keep the same unit of account.
pub fn upgrade_vault(ctx: Context<ConfigureVault>, name: [u8; 32], strategy: StrategyConfig) -> Result<()> {
    ctx.accounts.marketplace.authorize(&ctx.accounts.owner.key())?;

    let yield_source = ctx.accounts.yield_source.as_ref().map(|a| a.to_account_info());
    let next = strategy.resolve(yield_source.as_ref())?;

    let mut vault = registered_vault(&ctx.accounts.vault)?;
    require!(vault.strategy.can_migrate_to(&next), MarketError::UnsupportedMigration);

    vault.strategy = next;
    vault.generation = vault.generation.checked_add(1).ok_or(MarketError::MathOverflow)?;
    vault.persist()?;

    msg!("Vault upgraded to generation {}", vault.generation);

    emit!(VaultUpgraded {
        name,
        generation: vault.generation,
        strategy: next,
        total_shares: vault.total_shares,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}
