use anchor_lang::prelude::*;

use crate::{
    constants::{MAX_BPS, MAX_COLLECTIONS},
    errors::MarketError,
    state::vault::mul_div,
};

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimMode {
    /// Payout computed on chain from accrued activity
    Weighted,
    /// Payout attested off chain and verified against a per-epoch root
    Merkle,
}

impl Default for ClaimMode {
    fn default() -> Self {
        ClaimMode::Weighted
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectionAllocation {
    pub collection: Pubkey,
    pub allocation: u64,
    pub floor_price: u64,
}

impl CollectionAllocation {
    pub const SPACE: usize = 32 + 8 + 8;
}

/// Frozen collection allocation with the running weight of all bids in the epoch
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectionPool {
    pub collection: Pubkey,
    pub allocation: u64,
    pub floor_price: u64,
    pub total_weight: u64,
}

impl CollectionPool {
    pub const SPACE: usize = 32 + 8 + 8 + 8;

    /// Bids above the floor price earn no extra weight.
    pub fn weight_of(&self, amount: u64) -> u64 {
        amount.min(self.floor_price)
    }
}

/// Epoch schedule plus the configuration the next `start_epoch` freezes.
#[account]
#[derive(Default, Debug)]
pub struct RewardsConfig {
    pub epoch_duration: i64,

    /// Number of epochs started so far; the open or last epoch has index `epoch_count - 1`
    pub epoch_count: u64,

    pub current_epoch_end: i64,

    pub claim_mode: ClaimMode,
    pub collections: Vec<CollectionAllocation>,
    pub deposits_allocation: u64,
    pub sales_allocation: u64,

    /// Buyer share of the sales allocation
    pub sales_split_bps: u16,

    pub bump: u8,
}

impl RewardsConfig {
    pub const LEN: usize = 8 + // discriminator
        8 + // epoch_duration
        8 + // epoch_count
        8 + // current_epoch_end
        1 + // claim_mode
        4 + MAX_COLLECTIONS * CollectionAllocation::SPACE + // collections
        8 + // deposits_allocation
        8 + // sales_allocation
        2 + // sales_split_bps
        1; // bump

    pub fn epoch_open(&self, now: i64) -> bool {
        self.epoch_count > 0 && now < self.current_epoch_end
    }

    pub fn set_epoch_duration(&mut self, duration: i64, now: i64) -> Result<()> {
        require!(!self.epoch_open(now), MarketError::EpochInProgress);
        require!(duration > 0, MarketError::InvalidAmount);
        self.epoch_duration = duration;
        Ok(())
    }

    /// Opens the next epoch; returns a fresh `Epoch` with the pending configuration frozen in.
    pub fn start_epoch(&mut self, now: i64, bump: u8) -> Result<Epoch> {
        require!(self.epoch_duration > 0, MarketError::EpochDurationNotSet);
        require!(!self.epoch_open(now), MarketError::EpochHasNotEnded);

        let index = self.epoch_count;
        let end_time = now
            .checked_add(self.epoch_duration)
            .ok_or(MarketError::MathOverflow)?;

        self.epoch_count = index.checked_add(1).ok_or(MarketError::MathOverflow)?;
        self.current_epoch_end = end_time;

        Ok(Epoch {
            index,
            start_time: now,
            end_time,
            claim_mode: self.claim_mode,
            pools: self
                .collections
                .iter()
                .map(|c| CollectionPool {
                    collection: c.collection,
                    allocation: c.allocation,
                    floor_price: c.floor_price,
                    total_weight: 0,
                })
                .collect(),
            deposits_allocation: self.deposits_allocation,
            sales_allocation: self.sales_allocation,
            sales_split_bps: self.sales_split_bps,
            bump,
            ..Default::default()
        })
    }

    pub fn set_collection_allocation(&mut self, collection: Pubkey, allocation: u64, floor_price: u64) -> Result<()> {
        if let Some(entry) = self.collections.iter_mut().find(|c| c.collection == collection) {
            entry.allocation = allocation;
            entry.floor_price = floor_price;
            return Ok(());
        }
        require!(self.collections.len() < MAX_COLLECTIONS, MarketError::TooManyCollections);
        self.collections.push(CollectionAllocation {
            collection,
            allocation,
            floor_price,
        });
        Ok(())
    }

    pub fn set_sales_split(&mut self, bps: u16) -> Result<()> {
        require!(bps <= MAX_BPS, MarketError::InvalidSplitBps);
        self.sales_split_bps = bps;
        Ok(())
    }
}

#[account]
#[derive(Default, Debug)]
pub struct Epoch {
    pub index: u64,
    pub start_time: i64,
    pub end_time: i64,
    pub claim_mode: ClaimMode,

    pub pools: Vec<CollectionPool>,

    pub deposits_allocation: u64,
    pub total_deposits: u64,

    pub sales_allocation: u64,
    pub sales_split_bps: u16,
    pub total_buyer_sales: u64,
    pub total_seller_sales: u64,

    /// Root over `(user, amount)` leaves, Merkle mode only
    pub merkle_root: [u8; 32],
    pub merkle_total: u64,
    pub rewards_set: bool,

    pub total_claimed: u64,

    pub bump: u8,
}

impl Epoch {
    pub const LEN: usize = 8 + // discriminator
        8 + // index
        8 + // start_time
        8 + // end_time
        1 + // claim_mode
        4 + MAX_COLLECTIONS * CollectionPool::SPACE + // pools
        8 + // deposits_allocation
        8 + // total_deposits
        8 + // sales_allocation
        2 + // sales_split_bps
        8 + // total_buyer_sales
        8 + // total_seller_sales
        32 + // merkle_root
        8 + // merkle_total
        1 + // rewards_set
        8 + // total_claimed
        1; // bump

    pub fn is_open(&self, now: i64) -> bool {
        self.start_time <= now && now < self.end_time
    }

    pub fn has_ended(&self, now: i64) -> bool {
        now >= self.end_time
    }

    fn check_activity(&self, activity: &UserEpochActivity, user: &Pubkey) -> Result<()> {
        require!(
            activity.epoch == self.index && activity.user == *user,
            MarketError::ActivityMismatch
        );
        Ok(())
    }

    /// Adds bid weight for `bidder`. Bids outside the epoch window or on collections
    /// without an allocation accrue nothing. Returns the weight recorded.
    pub fn record_bid(
        &mut self,
        activity: &mut UserEpochActivity,
        bidder: &Pubkey,
        collection: &Pubkey,
        amount: u64,
        now: i64,
    ) -> Result<u64> {
        if !self.is_open(now) {
            return Ok(0);
        }
        self.check_activity(activity, bidder)?;

        let Some(pool) = self.pools.iter_mut().find(|p| p.collection == *collection) else {
            return Ok(0);
        };
        let weight = pool.weight_of(amount);
        if weight == 0 {
            return Ok(0);
        }

        pool.total_weight = pool
            .total_weight
            .checked_add(weight)
            .ok_or(MarketError::MathOverflow)?;
        activity.add_collection_weight(collection, weight)?;
        Ok(weight)
    }

    pub fn record_deposit(
        &mut self,
        activity: &mut UserEpochActivity,
        depositor: &Pubkey,
        lamports: u64,
        now: i64,
    ) -> Result<()> {
        if !self.is_open(now) {
            return Ok(());
        }
        self.check_activity(activity, depositor)?;

        self.total_deposits = self
            .total_deposits
            .checked_add(lamports)
            .ok_or(MarketError::MathOverflow)?;
        activity.deposits = activity
            .deposits
            .checked_add(lamports)
            .ok_or(MarketError::MathOverflow)?;
        Ok(())
    }

    pub fn record_purchase(
        &mut self,
        activity: &mut UserEpochActivity,
        buyer: &Pubkey,
        amount: u64,
        now: i64,
    ) -> Result<()> {
        if !self.is_open(now) {
            return Ok(());
        }
        self.check_activity(activity, buyer)?;

        self.total_buyer_sales = self
            .total_buyer_sales
            .checked_add(amount)
            .ok_or(MarketError::MathOverflow)?;
        activity.buyer_sales = activity
            .buyer_sales
            .checked_add(amount)
            .ok_or(MarketError::MathOverflow)?;
        Ok(())
    }

    pub fn record_sale(
        &mut self,
        activity: &mut UserEpochActivity,
        seller: &Pubkey,
        amount: u64,
        now: i64,
    ) -> Result<()> {
        if !self.is_open(now) {
            return Ok(());
        }
        self.check_activity(activity, seller)?;

        self.total_seller_sales = self
            .total_seller_sales
            .checked_add(amount)
            .ok_or(MarketError::MathOverflow)?;
        activity.seller_sales = activity
            .seller_sales
            .checked_add(amount)
            .ok_or(MarketError::MathOverflow)?;
        Ok(())
    }

    pub fn buyer_sales_allocation(&self) -> Result<u64> {
        mul_div(self.sales_allocation, self.sales_split_bps as u64, MAX_BPS as u64)
    }

    pub fn seller_sales_allocation(&self) -> Result<u64> {
        Ok(self.sales_allocation.saturating_sub(self.buyer_sales_allocation()?))
    }

    /// Sum over pools of `allocation * user_weight / total_weight`.
    pub fn weighted_payout(&self, activity: &UserEpochActivity) -> Result<u64> {
        require!(activity.epoch == self.index, MarketError::ActivityMismatch);
        require!(activity.has_weight(), MarketError::UserHasNoRewards);

        let mut payout = 0u64;
        let mut add = |allocation: u64, weight: u64, total: u64| -> Result<()> {
            if weight == 0 || total == 0 {
                return Ok(());
            }
            payout = payout
                .checked_add(mul_div(allocation, weight, total)?)
                .ok_or(MarketError::MathOverflow)?;
            Ok(())
        };

        for entry in activity.collections.iter() {
            if let Some(pool) = self.pools.iter().find(|p| p.collection == entry.collection) {
                add(pool.allocation, entry.weight, pool.total_weight)?;
            }
        }
        add(self.deposits_allocation, activity.deposits, self.total_deposits)?;
        add(self.buyer_sales_allocation()?, activity.buyer_sales, self.total_buyer_sales)?;
        add(self.seller_sales_allocation()?, activity.seller_sales, self.total_seller_sales)?;

        Ok(payout)
    }

    pub fn set_rewards_distribution(&mut self, root: [u8; 32], total: u64, now: i64) -> Result<()> {
        require!(self.has_ended(now), MarketError::EpochHasNotEnded);
        require!(!self.rewards_set, MarketError::EpochRewardsAlreadySet);
        self.merkle_root = root;
        self.merkle_total = total;
        self.rewards_set = true;
        Ok(())
    }

    /// Books a payout. Merkle epochs never pay out more than the published total.
    pub fn add_claimed(&mut self, amount: u64) -> Result<()> {
        let total = self
            .total_claimed
            .checked_add(amount)
            .ok_or(MarketError::MathOverflow)?;
        if self.claim_mode == ClaimMode::Merkle {
            require!(total <= self.merkle_total, MarketError::ClaimExceedsDistribution);
        }
        self.total_claimed = total;
        Ok(())
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectionWeight {
    pub collection: Pubkey,
    pub weight: u64,
}

/// Per-(epoch, user) accumulator, updated as activity happens.
#[account]
#[derive(Default, Debug)]
pub struct UserEpochActivity {
    pub epoch: u64,
    pub user: Pubkey,
    pub collections: Vec<CollectionWeight>,
    pub deposits: u64,
    pub buyer_sales: u64,
    pub seller_sales: u64,
    pub bump: u8,
}

impl UserEpochActivity {
    pub const LEN: usize = 8 + // discriminator
        8 + // epoch
        32 + // user
        4 + MAX_COLLECTIONS * (32 + 8) + // collections
        8 + // deposits
        8 + // buyer_sales
        8 + // seller_sales
        1; // bump

    pub fn add_collection_weight(&mut self, collection: &Pubkey, weight: u64) -> Result<()> {
        if let Some(entry) = self.collections.iter_mut().find(|c| c.collection == *collection) {
            entry.weight = entry.weight.checked_add(weight).ok_or(MarketError::MathOverflow)?;
            return Ok(());
        }
        require!(self.collections.len() < MAX_COLLECTIONS, MarketError::TooManyCollections);
        self.collections.push(CollectionWeight {
            collection: *collection,
            weight,
        });
        Ok(())
    }

    pub fn collection_weight(&self, collection: &Pubkey) -> u64 {
        self.collections
            .iter()
            .find(|c| c.collection == *collection)
            .map_or(0, |c| c.weight)
    }

    pub fn has_weight(&self) -> bool {
        self.deposits > 0
            || self.buyer_sales > 0
            || self.seller_sales > 0
            || self.collections.iter().any(|c| c.weight > 0)
    }
}

/// Exactly-once marker for a (epoch, user) payout, shared by both claim modes
#[account]
#[derive(Default, Debug)]
pub struct ClaimReceipt {
    pub epoch: u64,
    pub user: Pubkey,
    pub claimed: bool,
    pub amount: u64,
    pub claimed_at: i64,
    pub bump: u8,
}

impl ClaimReceipt {
    pub const LEN: usize = 8 + 8 + 32 + 1 + 8 + 8 + 1;

    pub fn mark_claimed(&mut self, amount: u64, now: i64) -> Result<()> {
        require!(!self.claimed, MarketError::AlreadyClaimed);
        self.claimed = true;
        self.amount = amount;
        self.claimed_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_market_error;

    const ONE_SOL: u64 = 1_000_000_000;

    fn activity(epoch: &Epoch, user: &Pubkey) -> UserEpochActivity {
        UserEpochActivity {
            epoch: epoch.index,
            user: *user,
            ..Default::default()
        }
    }

    #[test]
    fn start_epoch_requires_duration_and_previous_end() {
        let mut config = RewardsConfig::default();
        assert_market_error(config.start_epoch(0, 255), MarketError::EpochDurationNotSet);

        config.set_epoch_duration(100, 0).unwrap();
        let first = config.start_epoch(10, 255).unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.end_time, 110);

        assert_market_error(config.start_epoch(109, 255), MarketError::EpochHasNotEnded);
        assert_market_error(config.set_epoch_duration(50, 50), MarketError::EpochInProgress);

        let second = config.start_epoch(110, 255).unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(config.epoch_count, 2);
    }

    #[test]
    fn pending_configuration_is_frozen_at_start() {
        let mut config = RewardsConfig::default();
        let collection = Pubkey::new_unique();
        config.set_epoch_duration(100, 0).unwrap();
        config.set_collection_allocation(collection, 15, ONE_SOL).unwrap();
        config.set_sales_split(2_500).unwrap();

        let epoch = config.start_epoch(0, 255).unwrap();
        config.set_collection_allocation(collection, 99, 1).unwrap();

        assert_eq!(epoch.pools.len(), 1);
        assert_eq!(epoch.pools[0].allocation, 15);
        assert_eq!(epoch.sales_split_bps, 2_500);
    }

    #[test]
    fn collection_allocation_upserts_and_caps() {
        let mut config = RewardsConfig::default();
        let collection = Pubkey::new_unique();
        config.set_collection_allocation(collection, 1, 1).unwrap();
        config.set_collection_allocation(collection, 2, 3).unwrap();
        assert_eq!(config.collections.len(), 1);
        assert_eq!(config.collections[0].floor_price, 3);

        for _ in 1..MAX_COLLECTIONS {
            config.set_collection_allocation(Pubkey::new_unique(), 1, 1).unwrap();
        }
        assert_market_error(
            config.set_collection_allocation(Pubkey::new_unique(), 1, 1),
            MarketError::TooManyCollections,
        );
    }

    #[test]
    fn split_above_max_bps_rejected() {
        let mut config = RewardsConfig::default();
        assert_market_error(config.set_sales_split(10_001), MarketError::InvalidSplitBps);
        assert!(config.set_sales_split(10_000).is_ok());
    }

    #[test]
    fn bid_weight_capped_at_floor() {
        let collection = Pubkey::new_unique();
        let user = Pubkey::new_unique();
        let mut epoch = Epoch {
            end_time: 100,
            pools: vec![CollectionPool {
                collection,
                allocation: 10,
                floor_price: ONE_SOL,
                total_weight: 0,
            }],
            ..Default::default()
        };
        let mut ledger = activity(&epoch, &user);

        assert_eq!(epoch.record_bid(&mut ledger, &user, &collection, 5 * ONE_SOL, 1).unwrap(), ONE_SOL);
        assert_eq!(epoch.record_bid(&mut ledger, &user, &collection, ONE_SOL / 2, 2).unwrap(), ONE_SOL / 2);
        assert_eq!(ledger.collection_weight(&collection), 3 * ONE_SOL / 2);
        assert_eq!(epoch.pools[0].total_weight, 3 * ONE_SOL / 2);

        // untracked collection and closed window accrue nothing
        assert_eq!(epoch.record_bid(&mut ledger, &user, &Pubkey::new_unique(), ONE_SOL, 3).unwrap(), 0);
        assert_eq!(epoch.record_bid(&mut ledger, &user, &collection, ONE_SOL, 100).unwrap(), 0);
    }

    #[test]
    fn merkle_payouts_capped_at_published_total() {
        let mut epoch = Epoch {
            claim_mode: ClaimMode::Merkle,
            ..Default::default()
        };
        epoch.set_rewards_distribution([7; 32], 100, 0).unwrap();

        epoch.add_claimed(60).unwrap();
        assert_market_error(epoch.add_claimed(41), MarketError::ClaimExceedsDistribution);
        assert_eq!(epoch.total_claimed, 60);
        epoch.add_claimed(40).unwrap();
        assert_eq!(epoch.total_claimed, 100);

        let mut weighted = Epoch::default();
        weighted.add_claimed(u64::MAX).unwrap();
        assert_market_error(weighted.add_claimed(1), MarketError::MathOverflow);
    }

    #[test]
    fn foreign_activity_rejected() {
        let user = Pubkey::new_unique();
        let mut epoch = Epoch {
            end_time: 100,
            ..Default::default()
        };
        let mut ledger = activity(&epoch, &Pubkey::new_unique());
        assert_market_error(epoch.record_deposit(&mut ledger, &user, 1, 1), MarketError::ActivityMismatch);
    }

    #[test]
    fn weighted_payout_spans_all_pools() {
        let seller = Pubkey::new_unique();
        let buyer = Pubkey::new_unique();
        let mut epoch = Epoch {
            end_time: 100,
            deposits_allocation: 60,
            sales_allocation: 100,
            sales_split_bps: 2_500,
            ..Default::default()
        };
        let mut seller_ledger = activity(&epoch, &seller);
        let mut buyer_ledger = activity(&epoch, &buyer);

        epoch.record_deposit(&mut buyer_ledger, &buyer, 2 * ONE_SOL, 1).unwrap();
        epoch.record_deposit(&mut seller_ledger, &seller, ONE_SOL, 1).unwrap();
        epoch.record_purchase(&mut buyer_ledger, &buyer, ONE_SOL, 2).unwrap();
        epoch.record_sale(&mut seller_ledger, &seller, ONE_SOL, 2).unwrap();

        // 40 of deposits + 25 buyer side
        assert_eq!(epoch.weighted_payout(&buyer_ledger).unwrap(), 65);
        // 20 of deposits + 75 seller side
        assert_eq!(epoch.weighted_payout(&seller_ledger).unwrap(), 95);
    }

    #[test]
    fn empty_activity_has_no_rewards() {
        let epoch = Epoch::default();
        let ledger = activity(&epoch, &Pubkey::new_unique());
        assert_market_error(epoch.weighted_payout(&ledger), MarketError::UserHasNoRewards);
    }

    #[test]
    fn merkle_root_set_once_after_end() {
        let mut epoch = Epoch {
            end_time: 100,
            ..Default::default()
        };
        assert_market_error(epoch.set_rewards_distribution([1; 32], 10, 99), MarketError::EpochHasNotEnded);
        epoch.set_rewards_distribution([1; 32], 10, 100).unwrap();
        assert_market_error(
            epoch.set_rewards_distribution([2; 32], 10, 101),
            MarketError::EpochRewardsAlreadySet,
        );
        assert_eq!(epoch.merkle_root, [1; 32]);
    }

    #[test]
    fn receipt_marks_once() {
        let mut receipt = ClaimReceipt::default();
        receipt.mark_claimed(5, 10).unwrap();
        assert_market_error(receipt.mark_claimed(5, 11), MarketError::AlreadyClaimed);
    }
}
