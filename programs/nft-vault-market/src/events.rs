use anchor_lang::prelude::*;

use crate::{
    state::{ClaimMode, OptionDuration},
    strategy::StrategyKind,
};

#[event]
pub struct MarketplaceInitialized {
    pub owner: Pubkey,
    pub reward_mint: Pubkey,
    pub punk_registry: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct OwnershipTransferred {
    pub previous_owner: Pubkey,
    pub new_owner: Pubkey,
}

#[event]
pub struct VaultRegistered {
    pub name: [u8; 32],
    pub strategy: StrategyKind,
    pub timestamp: i64,
}

#[event]
pub struct VaultUnregistered {
    pub name: [u8; 32],
    pub timestamp: i64,
}

#[event]
pub struct VaultUpgraded {
    pub name: [u8; 32],
    pub generation: u32,
    pub strategy: StrategyKind,
    pub total_shares: u64,
    pub timestamp: i64,
}

#[event]
pub struct DepositEvent {
    pub name: [u8; 32],
    pub user: Pubkey,
    pub lamports: u64,
    pub shares: u64,
    pub lp_token: bool,
    pub timestamp: i64,
}

#[event]
pub struct WithdrawEvent {
    pub name: [u8; 32],
    pub user: Pubkey,
    pub shares: u64,
    pub lamports: u64,
    pub lp_token: bool,
    pub timestamp: i64,
}

#[event]
pub struct RewardsDurationUpdated {
    pub name: [u8; 32],
    pub duration: i64,
}

#[event]
pub struct RewardAdded {
    pub name: [u8; 32],
    pub reward: u64,
    pub reward_rate: u64,
    pub period_finish: i64,
}

#[event]
pub struct RewardPaid {
    pub name: [u8; 32],
    pub user: Pubkey,
    pub reward: u64,
}

#[event]
pub struct BidEntered {
    pub id: u64,
    pub vault: [u8; 32],
    pub collection: Pubkey,
    pub token_id: Pubkey,
    pub amount: u64,
    pub bidder: Pubkey,
}

#[event]
pub struct BidModified {
    pub id: u64,
    pub amount: u64,
}

#[event]
pub struct BidWithdrawn {
    pub id: u64,
    pub bidder: Pubkey,
}

#[event]
pub struct BidAccepted {
    pub id: u64,
    pub bidder: Pubkey,
    pub seller: Pubkey,
    pub amount: u64,
    pub shares: u64,
    pub paid: u64,
}

#[event]
pub struct OptionBidEntered {
    pub id: u64,
    pub vault: [u8; 32],
    pub collection: Pubkey,
    pub token_id: Pubkey,
    pub strike: u64,
    pub premium: u64,
    pub duration: OptionDuration,
    pub buyer: Pubkey,
}

#[event]
pub struct OptionBidModified {
    pub id: u64,
    pub strike: u64,
    pub premium: u64,
    pub duration: OptionDuration,
}

#[event]
pub struct OptionBidWithdrawn {
    pub id: u64,
    pub buyer: Pubkey,
}

#[event]
pub struct OptionBidAccepted {
    pub id: u64,
    pub buyer: Pubkey,
    pub seller: Pubkey,
    pub premium: u64,
    pub expiry: i64,
}

#[event]
pub struct OptionExercised {
    pub id: u64,
    pub buyer: Pubkey,
    pub seller: Pubkey,
    pub strike: u64,
}

#[event]
pub struct OptionClosed {
    pub id: u64,
    pub seller: Pubkey,
}

#[event]
pub struct EpochDurationSet {
    pub duration: i64,
}

#[event]
pub struct EpochStarted {
    pub index: u64,
    pub start_time: i64,
    pub end_time: i64,
    pub claim_mode: ClaimMode,
}

#[event]
pub struct CollectionAllocationSet {
    pub collection: Pubkey,
    pub allocation: u64,
    pub floor_price: u64,
}

#[event]
pub struct DepositsAllocationSet {
    pub allocation: u64,
}

#[event]
pub struct SalesAllocationSet {
    pub allocation: u64,
}

#[event]
pub struct SalesSplitSet {
    pub buyer_bps: u16,
}

#[event]
pub struct ClaimModeSet {
    pub mode: ClaimMode,
}

#[event]
pub struct EpochRewardsDistributionSet {
    pub epoch: u64,
    pub merkle_root: [u8; 32],
    pub total: u64,
}

#[event]
pub struct RewardsClaimed {
    pub epoch: u64,
    pub user: Pubkey,
    pub amount: u64,
    pub mode: ClaimMode,
}
