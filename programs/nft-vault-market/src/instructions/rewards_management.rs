use anchor_lang::prelude::*;

use crate::{
    constants::*,
    errors::MarketError,
    events::{
        ClaimModeSet, CollectionAllocationSet, DepositsAllocationSet, EpochDurationSet,
        EpochRewardsDistributionSet, EpochStarted, SalesAllocationSet, SalesSplitSet,
    },
    state::{ClaimMode, Epoch, Marketplace, RewardsConfig},
};

/// Owner-gated access to the rewards configuration.
#[derive(Accounts)]
pub struct ConfigureRewards<'info> {
    #[account(seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    #[account(mut, seeds = [REWARDS_SEED], bump = rewards_config.bump)]
    pub rewards_config: Box<Account<'info, RewardsConfig>>,

    pub owner: Signer<'info>,
}

impl ConfigureRewards<'_> {
    fn authorized_config(&mut self) -> Result<&mut RewardsConfig> {
        self.marketplace.authorize(&self.owner.key())?;
        Ok(&mut self.rewards_config)
    }
}

pub fn set_epoch_duration(ctx: Context<ConfigureRewards>, duration: i64) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    ctx.accounts.authorized_config()?.set_epoch_duration(duration, now)?;
    emit!(EpochDurationSet { duration });
    Ok(())
}

pub fn set_collection_allocation(
    ctx: Context<ConfigureRewards>,
    collection: Pubkey,
    allocation: u64,
    floor_price: u64,
) -> Result<()> {
    ctx.accounts
        .authorized_config()?
        .set_collection_allocation(collection, allocation, floor_price)?;
    emit!(CollectionAllocationSet {
        collection,
        allocation,
        floor_price,
    });
    Ok(())
}

pub fn set_deposits_allocation(ctx: Context<ConfigureRewards>, allocation: u64) -> Result<()> {
    ctx.accounts.authorized_config()?.deposits_allocation = allocation;
    emit!(DepositsAllocationSet { allocation });
    Ok(())
}

pub fn set_sales_allocation(ctx: Context<ConfigureRewards>, allocation: u64) -> Result<()> {
    ctx.accounts.authorized_config()?.sales_allocation = allocation;
    emit!(SalesAllocationSet { allocation });
    Ok(())
}

pub fn set_sales_split(ctx: Context<ConfigureRewards>, buyer_bps: u16) -> Result<()> {
    ctx.accounts.authorized_config()?.set_sales_split(buyer_bps)?;
    emit!(SalesSplitSet { buyer_bps });
    Ok(())
}

/// Takes effect from the next `start_epoch`; running epochs keep their frozen mode.
pub fn set_claim_mode(ctx: Context<ConfigureRewards>, mode: ClaimMode) -> Result<()> {
    ctx.accounts.authorized_config()?.claim_mode = mode;
    emit!(ClaimModeSet { mode });
    Ok(())
}

#[derive(Accounts)]
pub struct StartEpoch<'info> {
    #[account(seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    #[account(mut, seeds = [REWARDS_SEED], bump = rewards_config.bump)]
    pub rewards_config: Box<Account<'info, RewardsConfig>>,

    #[account(
        init,
        payer = owner,
        space = Epoch::LEN,
        seeds = [EPOCH_SEED, rewards_config.epoch_count.to_le_bytes().as_ref()],
        bump
    )]
    pub epoch: Box<Account<'info, Epoch>>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn start_epoch(ctx: Context<StartEpoch>) -> Result<()> {
    ctx.accounts.marketplace.authorize(&ctx.accounts.owner.key())?;
    let now = Clock::get()?.unix_timestamp;

    let epoch = ctx.accounts.rewards_config.start_epoch(now, ctx.bumps.epoch)?;
    msg!("epoch {} open until {}", epoch.index, epoch.end_time);

    emit!(EpochStarted {
        index: epoch.index,
        start_time: epoch.start_time,
        end_time: epoch.end_time,
        claim_mode: epoch.claim_mode,
    });

    ctx.accounts.epoch.set_inner(epoch);
    Ok(())
}

#[derive(Accounts)]
#[instruction(epoch_index: u64)]
pub struct SetEpochRewardsDistribution<'info> {
    #[account(seeds = [MARKETPLACE_SEED], bump = marketplace.bump)]
    pub marketplace: Box<Account<'info, Marketplace>>,

    /// Absent when the epoch was never started
    #[account(
        mut,
        seeds = [EPOCH_SEED, epoch_index.to_le_bytes().as_ref()],
        bump = epoch.bump
    )]
    pub epoch: Option<Account<'info, Epoch>>,

    pub owner: Signer<'info>,
}

/// Publishes the Merkle root of an ended epoch. The root can be set once.
pub fn set_epoch_rewards_distribution(
    ctx: Context<SetEpochRewardsDistribution>,
    epoch_index: u64,
    merkle_root: [u8; 32],
    total: u64,
) -> Result<()> {
    ctx.accounts.marketplace.authorize(&ctx.accounts.owner.key())?;
    let now = Clock::get()?.unix_timestamp;

    let epoch = ctx
        .accounts
        .epoch
        .as_deref_mut()
        .ok_or(MarketError::EpochHasNotEnded)?;
    epoch.set_rewards_distribution(merkle_root, total, now)?;

    emit!(EpochRewardsDistributionSet {
        epoch: epoch_index,
        merkle_root,
        total,
    });
    Ok(())
}
