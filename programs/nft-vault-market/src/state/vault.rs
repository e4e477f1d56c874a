use anchor_lang::prelude::*;

use crate::{
    constants::REWARD_PRECISION,
    errors::MarketError,
    strategy::StrategyKind,
};

#[account]
#[derive(Default, Debug)]
pub struct Vault {
    /// Stable vault name, also the PDA seed
    pub name: [u8; 32],

    /// Yield source currently backing the vault
    pub strategy: StrategyKind,

    /// Incremented on every strategy upgrade
    pub generation: u32,

    /// Cleared on unregistration; a cleared vault behaves as not found
    pub registered: bool,

    /// Sum of user principal, lamport-equivalent at deposit time
    pub total_principal: u64,

    /// Sum of user shares
    pub total_shares: u64,

    /// Linear reward emission over the vault's shares
    pub rewards: RewardDistributor,

    /// Bump seed for PDA derivation
    pub bump: u8,

    /// Reserved space for future upgrades
    pub _reserved: [u8; 32],
}

impl Vault {
    pub const LEN: usize = 8 + // discriminator
        32 + // name
        StrategyKind::SPACE + // strategy
        4 + // generation
        1 + // registered
        8 + // total_principal
        8 + // total_shares
        RewardDistributor::SPACE + // rewards
        1 + // bump
        32; // _reserved

    /// Settles the reward snapshot of `position` and credits it with freshly minted shares.
    pub fn credit(
        &mut self,
        position: &mut UserPosition,
        principal: u64,
        shares: u64,
        now: i64,
    ) -> Result<()> {
        self.rewards.settle(self.total_shares, Some(&mut *position), now)?;

        position.principal = position
            .principal
            .checked_add(principal)
            .ok_or(MarketError::MathOverflow)?;
        position.shares = position
            .shares
            .checked_add(shares)
            .ok_or(MarketError::MathOverflow)?;

        self.total_principal = self
            .total_principal
            .checked_add(principal)
            .ok_or(MarketError::MathOverflow)?;
        self.total_shares = self
            .total_shares
            .checked_add(shares)
            .ok_or(MarketError::MathOverflow)?;

        Ok(())
    }

    /// Settles the reward snapshot of `position` and burns `shares` from it.
    /// Principal leaves in proportion to the burnt shares; returns the principal removed.
    pub fn debit(&mut self, position: &mut UserPosition, shares: u64, now: i64) -> Result<u64> {
        require!(shares <= position.shares, MarketError::InsufficientBalance);

        self.rewards.settle(self.total_shares, Some(&mut *position), now)?;

        let principal = if shares == position.shares {
            position.principal
        } else {
            mul_div(position.principal, shares, position.shares)?
        };

        position.shares -= shares;
        position.principal = position.principal.saturating_sub(principal);

        self.total_shares = self
            .total_shares
            .checked_sub(shares)
            .ok_or(MarketError::MathOverflow)?;
        self.total_principal = self.total_principal.saturating_sub(principal);

        Ok(principal)
    }

    pub fn is_empty(&self) -> bool {
        self.total_shares == 0
    }
}

/// Fixed-duration linear emission of the reward token, distributed per share.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewardDistributor {
    pub rewards_duration: i64,
    pub period_finish: i64,
    /// Reward tokens emitted per second
    pub reward_rate: u64,
    pub last_update_time: i64,
    /// Accumulated reward per share, scaled by REWARD_PRECISION
    pub reward_per_token_stored: u128,
}

impl RewardDistributor {
    pub const SPACE: usize = 8 + 8 + 8 + 8 + 16;

    pub fn last_time_reward_applicable(&self, now: i64) -> i64 {
        now.min(self.period_finish)
    }

    pub fn reward_per_token(&self, total_shares: u64, now: i64) -> Result<u128> {
        if total_shares == 0 {
            return Ok(self.reward_per_token_stored);
        }
        let elapsed = self
            .last_time_reward_applicable(now)
            .saturating_sub(self.last_update_time)
            .max(0) as u128;
        let accrued = elapsed
            .checked_mul(self.reward_rate as u128)
            .and_then(|v| v.checked_mul(REWARD_PRECISION))
            .ok_or(MarketError::MathOverflow)?
            / total_shares as u128;
        self.reward_per_token_stored
            .checked_add(accrued)
            .ok_or_else(|| MarketError::MathOverflow.into())
    }

    pub fn earned(&self, position: &UserPosition, total_shares: u64, now: i64) -> Result<u64> {
        let per_token = self.reward_per_token(total_shares, now)?;
        let pending = (position.shares as u128)
            .checked_mul(per_token.saturating_sub(position.reward_per_token_paid))
            .ok_or(MarketError::MathOverflow)?
            / REWARD_PRECISION;
        let pending = u64::try_from(pending).map_err(|_| MarketError::MathOverflow)?;
        position
            .rewards
            .checked_add(pending)
            .ok_or_else(|| MarketError::MathOverflow.into())
    }

    /// Advances the accumulator to `now` and, when given, moves the position's pending
    /// reward into its unclaimed balance. Must run before any share balance changes.
    pub fn settle(
        &mut self,
        total_shares: u64,
        position: Option<&mut UserPosition>,
        now: i64,
    ) -> Result<()> {
        self.reward_per_token_stored = self.reward_per_token(total_shares, now)?;
        self.last_update_time = self.last_time_reward_applicable(now);

        if let Some(position) = position {
            position.rewards = self.earned(position, total_shares, now)?;
            position.reward_per_token_paid = self.reward_per_token_stored;
        }
        Ok(())
    }

    pub fn set_rewards_duration(&mut self, duration: i64, now: i64) -> Result<()> {
        require!(now > self.period_finish, MarketError::PreviousPeriodNotEnded);
        require!(duration > 0, MarketError::InvalidAmount);
        self.rewards_duration = duration;
        Ok(())
    }

    /// Starts a new emission period of `reward` tokens, rolling over whatever is left
    /// of the current one.
    pub fn notify_reward_amount(&mut self, total_shares: u64, reward: u64, now: i64) -> Result<()> {
        require!(self.rewards_duration > 0, MarketError::RewardsDurationNotSet);
        self.settle(total_shares, None, now)?;

        let duration = self.rewards_duration as u64;
        self.reward_rate = if now >= self.period_finish {
            reward / duration
        } else {
            let remaining = (self.period_finish - now) as u64;
            let leftover = remaining
                .checked_mul(self.reward_rate)
                .ok_or(MarketError::MathOverflow)?;
            reward
                .checked_add(leftover)
                .ok_or(MarketError::MathOverflow)?
                / duration
        };

        self.last_update_time = now;
        self.period_finish = now
            .checked_add(self.rewards_duration)
            .ok_or(MarketError::MathOverflow)?;
        Ok(())
    }
}

#[account]
#[derive(Default, Debug)]
pub struct UserPosition {
    /// Vault account this position belongs to
    pub vault: Pubkey,

    /// Position owner
    pub owner: Pubkey,

    /// Lamport-equivalent principal still deposited
    pub principal: u64,

    /// Vault shares (pool tokens for stake-pool vaults)
    pub shares: u64,

    /// Reward-per-share snapshot at the last settlement
    pub reward_per_token_paid: u128,

    /// Settled, unclaimed reward tokens
    pub rewards: u64,

    /// Bump seed for PDA derivation
    pub bump: u8,
}

impl UserPosition {
    pub const LEN: usize = 8 + // discriminator
        32 + // vault
        32 + // owner
        8 + // principal
        8 + // shares
        16 + // reward_per_token_paid
        8 + // rewards
        1; // bump

    pub fn belongs_to(&self, vault: &Pubkey, owner: &Pubkey) -> bool {
        self.vault == *vault && self.owner == *owner
    }

    /// Binds a freshly created position; an existing one must already match.
    pub fn bind(&mut self, vault: &Pubkey, owner: &Pubkey, bump: u8) -> Result<()> {
        if self.owner == Pubkey::default() {
            self.vault = *vault;
            self.owner = *owner;
            self.bump = bump;
            return Ok(());
        }
        require!(self.belongs_to(vault, owner), MarketError::PositionMismatch);
        Ok(())
    }
}

pub(crate) fn mul_div(amount: u64, numerator: u64, denominator: u64) -> Result<u64> {
    require!(denominator > 0, MarketError::MathOverflow);
    let value = (amount as u128)
        .checked_mul(numerator as u128)
        .ok_or(MarketError::MathOverflow)?
        / denominator as u128;
    u64::try_from(value).map_err(|_| MarketError::MathOverflow.into())
}

pub(crate) fn mul_div_ceil(amount: u64, numerator: u64, denominator: u64) -> Result<u64> {
    require!(denominator > 0, MarketError::MathOverflow);
    let product = (amount as u128)
        .checked_mul(numerator as u128)
        .ok_or(MarketError::MathOverflow)?;
    let value = product
        .checked_add(denominator as u128 - 1)
        .ok_or(MarketError::MathOverflow)?
        / denominator as u128;
    u64::try_from(value).map_err(|_| MarketError::MathOverflow.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_market_error;

    const ONE_SOL: u64 = 1_000_000_000;

    fn position(vault: &Pubkey) -> UserPosition {
        UserPosition {
            vault: *vault,
            owner: Pubkey::new_unique(),
            ..Default::default()
        }
    }

    #[test]
    fn credit_then_debit_restores_balances() {
        let key = Pubkey::new_unique();
        let mut vault = Vault { registered: true, ..Default::default() };
        let mut user = position(&key);

        vault.credit(&mut user, ONE_SOL, ONE_SOL, 0).unwrap();
        assert_eq!(user.shares, ONE_SOL);
        assert_eq!(vault.total_shares, ONE_SOL);

        let principal = vault.debit(&mut user, ONE_SOL, 10).unwrap();
        assert_eq!(principal, ONE_SOL);
        assert_eq!(user.shares, 0);
        assert_eq!(user.principal, 0);
        assert!(vault.is_empty());
    }

    #[test]
    fn debit_more_than_balance_fails() {
        let key = Pubkey::new_unique();
        let mut vault = Vault::default();
        let mut user = position(&key);
        vault.credit(&mut user, 100, 100, 0).unwrap();

        assert_market_error(vault.debit(&mut user, 101, 0), MarketError::InsufficientBalance);
        assert_eq!(user.shares, 100);
    }

    #[test]
    fn partial_debit_removes_proportional_principal() {
        let key = Pubkey::new_unique();
        let mut vault = Vault::default();
        let mut user = position(&key);
        vault.credit(&mut user, 900, 300, 0).unwrap();

        let principal = vault.debit(&mut user, 100, 0).unwrap();
        assert_eq!(principal, 300);
        assert_eq!(user.principal, 600);
        assert_eq!(vault.total_principal, 600);
    }

    #[test]
    fn rewards_accrue_linearly_per_share() {
        let key = Pubkey::new_unique();
        let mut vault = Vault::default();
        let mut alice = position(&key);
        let mut bob = position(&key);

        vault.credit(&mut alice, 100, 100, 0).unwrap();
        vault.credit(&mut bob, 300, 300, 0).unwrap();

        vault.rewards.set_rewards_duration(100, 1).unwrap();
        vault.rewards.notify_reward_amount(vault.total_shares, 4_000, 0).unwrap();
        assert_eq!(vault.rewards.reward_rate, 40);

        // half way through the period
        assert_eq!(vault.rewards.earned(&alice, vault.total_shares, 50).unwrap(), 500);
        assert_eq!(vault.rewards.earned(&bob, vault.total_shares, 50).unwrap(), 1_500);

        // nothing accrues after period end
        assert_eq!(vault.rewards.earned(&alice, vault.total_shares, 500).unwrap(), 1_000);
    }

    #[test]
    fn deposit_settles_pending_rewards_before_reweighting() {
        let key = Pubkey::new_unique();
        let mut vault = Vault::default();
        let mut alice = position(&key);
        let mut bob = position(&key);

        vault.credit(&mut alice, 100, 100, 0).unwrap();
        vault.rewards.set_rewards_duration(100, 1).unwrap();
        vault.rewards.notify_reward_amount(vault.total_shares, 1_000, 0).unwrap();

        // alice alone for 50s, then bob joins with equal weight
        vault.credit(&mut bob, 100, 100, 50).unwrap();
        assert_eq!(bob.rewards, 0);

        assert_eq!(vault.rewards.earned(&alice, vault.total_shares, 100).unwrap(), 750);
        assert_eq!(vault.rewards.earned(&bob, vault.total_shares, 100).unwrap(), 250);
    }

    #[test]
    fn duration_locked_while_period_active() {
        let mut rewards = RewardDistributor::default();
        rewards.set_rewards_duration(100, 1).unwrap();
        rewards.notify_reward_amount(0, 1_000, 10).unwrap();

        assert_market_error(rewards.set_rewards_duration(200, 50), MarketError::PreviousPeriodNotEnded);
        assert!(rewards.set_rewards_duration(200, 111).is_ok());
    }

    #[test]
    fn notify_requires_duration() {
        let mut rewards = RewardDistributor::default();
        assert_market_error(rewards.notify_reward_amount(0, 1_000, 10), MarketError::RewardsDurationNotSet);
    }

    #[test]
    fn notify_rolls_over_leftover() {
        let mut rewards = RewardDistributor::default();
        rewards.set_rewards_duration(100, 1).unwrap();
        rewards.notify_reward_amount(10, 1_000, 0).unwrap();
        rewards.notify_reward_amount(10, 1_000, 50).unwrap();

        // 500 left over + 1000 new over 100s
        assert_eq!(rewards.reward_rate, 15);
        assert_eq!(rewards.period_finish, 150);
    }
}
