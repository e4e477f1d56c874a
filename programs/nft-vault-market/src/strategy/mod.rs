pub mod funds;

pub use funds::*;

use anchor_lang::prelude::*;

use crate::{
    errors::MarketError,
    stake_pool_integration::{self, StakePoolHeader},
    state::vault::{mul_div, mul_div_ceil},
};

/// Yield source backing a vault, stored on the vault itself.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyKind {
    /// Lamports stay in the vault account; one share is one lamport
    PassThrough,
    /// Lamports are deposited into an SPL stake pool through a per-user delegate;
    /// shares are pool tokens
    StakePool {
        stake_pool: Pubkey,
        pool_mint: Pubkey,
        lp_deposits_enabled: bool,
    },
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::PassThrough
    }
}

impl StrategyKind {
    pub const SPACE: usize = 1 + 32 + 32 + 1;

    /// Successor strategies keep the unit of account of their predecessor so that
    /// shares and principal carry over unchanged.
    pub fn can_migrate_to(&self, next: &StrategyKind) -> bool {
        match (self, next) {
            (StrategyKind::PassThrough, StrategyKind::PassThrough) => true,
            (
                StrategyKind::StakePool { pool_mint, .. },
                StrategyKind::StakePool { pool_mint: next_mint, .. },
            ) => pool_mint == next_mint,
            _ => false,
        }
    }
}

/// Strategy choice as passed to `register_vault` / `upgrade_vault`; pool keys are
/// read from the stake pool account itself.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyConfig {
    PassThrough,
    StakePool { lp_deposits_enabled: bool },
}

impl StrategyConfig {
    pub fn resolve(&self, yield_source: Option<&AccountInfo>) -> Result<StrategyKind> {
        match self {
            StrategyConfig::PassThrough => Ok(StrategyKind::PassThrough),
            StrategyConfig::StakePool { lp_deposits_enabled } => {
                let pool = yield_source.ok_or(MarketError::StrategyAccountMismatch)?;
                let header = stake_pool_integration::load_stake_pool(pool)?;
                Ok(StrategyKind::StakePool {
                    stake_pool: pool.key(),
                    pool_mint: header.pool_mint,
                    lp_deposits_enabled: *lp_deposits_enabled,
                })
            }
        }
    }
}

/// Exchange-rate view of a yield source.
pub trait VaultStrategy {
    /// Shares minted for `lamports` at the current rate.
    fn shares_for(&self, lamports: u64) -> Result<u64>;

    /// Lamports the given shares are worth at the current rate.
    fn value_of(&self, shares: u64) -> Result<u64>;

    /// Smallest share amount worth at least `lamports`.
    fn shares_for_payout(&self, lamports: u64) -> Result<u64>;

    /// Mint of the vault's native share token, when users may hold it directly.
    fn lp_mint(&self) -> Option<Pubkey>;
}

pub struct PassThrough;

impl VaultStrategy for PassThrough {
    fn shares_for(&self, lamports: u64) -> Result<u64> {
        Ok(lamports)
    }

    fn value_of(&self, shares: u64) -> Result<u64> {
        Ok(shares)
    }

    fn shares_for_payout(&self, lamports: u64) -> Result<u64> {
        Ok(lamports)
    }

    fn lp_mint(&self) -> Option<Pubkey> {
        None
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakePoolStrategy {
    pub total_lamports: u64,
    pub pool_token_supply: u64,
    pub pool_mint: Pubkey,
    pub lp_deposits_enabled: bool,
}

impl StakePoolStrategy {
    pub fn from_header(header: &StakePoolHeader, lp_deposits_enabled: bool) -> Self {
        Self {
            total_lamports: header.total_lamports,
            pool_token_supply: header.pool_token_supply,
            pool_mint: header.pool_mint,
            lp_deposits_enabled,
        }
    }

    fn is_fresh(&self) -> bool {
        self.total_lamports == 0 || self.pool_token_supply == 0
    }
}

impl VaultStrategy for StakePoolStrategy {
    fn shares_for(&self, lamports: u64) -> Result<u64> {
        if self.is_fresh() {
            return Ok(lamports);
        }
        mul_div(lamports, self.pool_token_supply, self.total_lamports)
    }

    fn value_of(&self, shares: u64) -> Result<u64> {
        if self.is_fresh() {
            return Ok(shares);
        }
        mul_div(shares, self.total_lamports, self.pool_token_supply)
    }

    fn shares_for_payout(&self, lamports: u64) -> Result<u64> {
        if self.is_fresh() {
            return Ok(lamports);
        }
        mul_div_ceil(lamports, self.pool_token_supply, self.total_lamports)
    }

    fn lp_mint(&self) -> Option<Pubkey> {
        self.lp_deposits_enabled.then_some(self.pool_mint)
    }
}

/// A vault's strategy with its exchange rate loaded for the current instruction.
pub enum LoadedStrategy {
    PassThrough(PassThrough),
    StakePool(StakePoolStrategy),
}

impl LoadedStrategy {
    /// Loads the rate of `kind`. Stake-pool vaults need the pool account they were
    /// registered with.
    pub fn load(kind: &StrategyKind, yield_source: Option<&AccountInfo>) -> Result<Self> {
        match kind {
            StrategyKind::PassThrough => Ok(LoadedStrategy::PassThrough(PassThrough)),
            StrategyKind::StakePool {
                stake_pool,
                lp_deposits_enabled,
                ..
            } => {
                let pool = yield_source.ok_or(MarketError::StrategyAccountMismatch)?;
                require_keys_eq!(pool.key(), *stake_pool, MarketError::StrategyAccountMismatch);
                let header = stake_pool_integration::load_stake_pool(pool)?;
                Ok(LoadedStrategy::StakePool(StakePoolStrategy::from_header(
                    &header,
                    *lp_deposits_enabled,
                )))
            }
        }
    }

    fn inner(&self) -> &dyn VaultStrategy {
        match self {
            LoadedStrategy::PassThrough(s) => s,
            LoadedStrategy::StakePool(s) => s,
        }
    }
}

impl VaultStrategy for LoadedStrategy {
    fn shares_for(&self, lamports: u64) -> Result<u64> {
        self.inner().shares_for(lamports)
    }

    fn value_of(&self, shares: u64) -> Result<u64> {
        self.inner().value_of(shares)
    }

    fn shares_for_payout(&self, lamports: u64) -> Result<u64> {
        self.inner().shares_for_payout(lamports)
    }

    fn lp_mint(&self) -> Option<Pubkey> {
        self.inner().lp_mint()
    }
}
