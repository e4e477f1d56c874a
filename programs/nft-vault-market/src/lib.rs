use anchor_lang::prelude::*;

pub mod accrual;
pub mod claim;
pub mod constants;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod market;
pub mod merkle;
pub mod nft;
pub mod punks_integration;
pub mod stake_pool_integration;
pub mod state;
pub mod stored;
pub mod strategy;

#[cfg(test)]
pub(crate) mod test_utils;
#[cfg(test)]
mod tests;

use claim::ClaimAttestation;
use instructions::*;
use state::{BidInput, ClaimMode, OptionBidInput, OptionDuration};
use strategy::StrategyConfig;

declare_id!("NftVau1tMarket11111111111111111111111111111");

#[program]
pub mod nft_vault_market {
    use super::*;

    /// Create the marketplace, the rewards configuration and the reward treasury
    pub fn initialize(ctx: Context<Initialize>, punk_registry: Pubkey) -> Result<()> {
        instructions::initialize(ctx, punk_registry)
    }

    pub fn transfer_ownership(ctx: Context<TransferOwnership>, new_owner: Pubkey) -> Result<()> {
        instructions::transfer_ownership(ctx, new_owner)
    }

    /// Register a vault, or re-activate an unregistered one
    pub fn register_vault(ctx: Context<RegisterVault>, name: [u8; 32], strategy: StrategyConfig) -> Result<()> {
        instructions::register_vault(ctx, name, strategy)
    }

    pub fn unregister_vault(ctx: Context<ConfigureVault>, name: [u8; 32]) -> Result<()> {
        instructions::unregister_vault(ctx, name)
    }

    /// Move a vault onto a successor strategy of the same kind
    pub fn upgrade_vault(ctx: Context<ConfigureVault>, name: [u8; 32], strategy: StrategyConfig) -> Result<()> {
        instructions::upgrade_vault(ctx, name, strategy)
    }

    pub fn deposit<'info>(
        ctx: Context<'_, '_, '_, 'info, Deposit<'info>>,
        name: [u8; 32],
        lamports: u64,
    ) -> Result<()> {
        instructions::deposit(ctx, name, lamports)
    }

    pub fn deposit_lp_token<'info>(
        ctx: Context<'_, '_, '_, 'info, DepositLpToken<'info>>,
        name: [u8; 32],
        amount: u64,
    ) -> Result<()> {
        instructions::deposit_lp_token(ctx, name, amount)
    }

    pub fn withdraw<'info>(
        ctx: Context<'_, '_, '_, 'info, Withdraw<'info>>,
        shares: u64,
        name: [u8; 32],
    ) -> Result<()> {
        instructions::withdraw(ctx, shares, name)
    }

    pub fn withdraw_lp_token<'info>(
        ctx: Context<'_, '_, '_, 'info, Withdraw<'info>>,
        shares: u64,
        name: [u8; 32],
    ) -> Result<()> {
        instructions::withdraw_lp_token(ctx, shares, name)
    }

    pub fn set_rewards_duration(ctx: Context<SetRewardsDuration>, name: [u8; 32], duration: i64) -> Result<()> {
        instructions::set_rewards_duration(ctx, name, duration)
    }

    /// Fund the treasury and start or extend the vault's reward emission
    pub fn notify_reward_amount(ctx: Context<NotifyRewardAmount>, name: [u8; 32], reward: u64) -> Result<()> {
        instructions::notify_reward_amount(ctx, name, reward)
    }

    pub fn get_reward(ctx: Context<GetReward>, name: [u8; 32]) -> Result<()> {
        instructions::get_reward(ctx, name)
    }

    /// User balances in a vault, returned through return data
    pub fn vault_balance(ctx: Context<ViewVaultBalance>, name: [u8; 32]) -> Result<VaultBalance> {
        instructions::vault_balance(ctx, name)
    }

    pub fn place_bid(ctx: Context<PlaceBid>, name: [u8; 32], input: BidInput) -> Result<()> {
        instructions::place_bid(ctx, name, input)
    }

    pub fn place_multiple_bids<'info>(
        ctx: Context<'_, '_, '_, 'info, PlaceMultipleBids<'info>>,
        name: [u8; 32],
        inputs: Vec<BidInput>,
    ) -> Result<()> {
        instructions::place_multiple_bids(ctx, name, inputs)
    }

    pub fn modify_bid(ctx: Context<ModifyBid>, bid_id: u64, amount: u64) -> Result<()> {
        instructions::modify_bid(ctx, bid_id, amount)
    }

    pub fn modify_multiple_bids<'info>(
        ctx: Context<'_, '_, '_, 'info, ModifyMultipleBids<'info>>,
        name: [u8; 32],
        updates: Vec<BidUpdate>,
    ) -> Result<()> {
        instructions::modify_multiple_bids(ctx, name, updates)
    }

    pub fn withdraw_bid(ctx: Context<WithdrawBid>, bid_id: u64) -> Result<()> {
        instructions::withdraw_bid(ctx, bid_id)
    }

    pub fn withdraw_multiple_bids<'info>(
        ctx: Context<'_, '_, '_, 'info, WithdrawMultipleBids<'info>>,
        bid_ids: Vec<u64>,
    ) -> Result<()> {
        instructions::withdraw_multiple_bids(ctx, bid_ids)
    }

    /// Sell into a bid; the bidder's live balance is re-checked
    pub fn accept_bid<'info>(ctx: Context<'_, '_, '_, 'info, AcceptBid<'info>>, bid_id: u64) -> Result<()> {
        instructions::accept_bid(ctx, bid_id)
    }

    pub fn place_option_bid(ctx: Context<PlaceOptionBid>, name: [u8; 32], input: OptionBidInput) -> Result<()> {
        instructions::place_option_bid(ctx, name, input)
    }

    pub fn modify_option_bid(
        ctx: Context<ModifyOptionBid>,
        option_id: u64,
        strike: u64,
        premium: u64,
        duration: OptionDuration,
    ) -> Result<()> {
        instructions::modify_option_bid(ctx, option_id, strike, premium, duration)
    }

    pub fn withdraw_option_bid(ctx: Context<WithdrawOptionBid>, option_id: u64) -> Result<()> {
        instructions::withdraw_option_bid(ctx, option_id)
    }

    /// Take the premium and escrow the NFT until exercise or expiry
    pub fn accept_option_bid<'info>(
        ctx: Context<'_, '_, '_, 'info, AcceptOptionBid<'info>>,
        option_id: u64,
    ) -> Result<()> {
        instructions::accept_option_bid(ctx, option_id)
    }

    pub fn exercise_option<'info>(
        ctx: Context<'_, '_, '_, 'info, ExerciseOption<'info>>,
        option_id: u64,
    ) -> Result<()> {
        instructions::exercise_option(ctx, option_id)
    }

    pub fn close_option(ctx: Context<CloseOption>, option_id: u64) -> Result<()> {
        instructions::close_option(ctx, option_id)
    }

    pub fn set_epoch_duration(ctx: Context<ConfigureRewards>, duration: i64) -> Result<()> {
        instructions::set_epoch_duration(ctx, duration)
    }

    pub fn start_epoch(ctx: Context<StartEpoch>) -> Result<()> {
        instructions::start_epoch(ctx)
    }

    pub fn set_collection_allocation(
        ctx: Context<ConfigureRewards>,
        collection: Pubkey,
        allocation: u64,
        floor_price: u64,
    ) -> Result<()> {
        instructions::set_collection_allocation(ctx, collection, allocation, floor_price)
    }

    pub fn set_deposits_allocation(ctx: Context<ConfigureRewards>, allocation: u64) -> Result<()> {
        instructions::set_deposits_allocation(ctx, allocation)
    }

    pub fn set_sales_allocation(ctx: Context<ConfigureRewards>, allocation: u64) -> Result<()> {
        instructions::set_sales_allocation(ctx, allocation)
    }

    pub fn set_sales_split(ctx: Context<ConfigureRewards>, buyer_bps: u16) -> Result<()> {
        instructions::set_sales_split(ctx, buyer_bps)
    }

    pub fn set_claim_mode(ctx: Context<ConfigureRewards>, mode: ClaimMode) -> Result<()> {
        instructions::set_claim_mode(ctx, mode)
    }

    /// Publish the Merkle root for an ended epoch
    pub fn set_epoch_rewards_distribution(
        ctx: Context<SetEpochRewardsDistribution>,
        epoch_index: u64,
        merkle_root: [u8; 32],
        total: u64,
    ) -> Result<()> {
        instructions::set_epoch_rewards_distribution(ctx, epoch_index, merkle_root, total)
    }

    pub fn open_epoch_activity(ctx: Context<OpenEpochActivity>) -> Result<()> {
        instructions::open_epoch_activity(ctx)
    }

    /// Claim a share of a closed epoch, weighted or Merkle-attested
    pub fn claim_rewards(ctx: Context<ClaimRewards>, epoch_index: u64, attestation: ClaimAttestation) -> Result<()> {
        instructions::claim_rewards(ctx, epoch_index, attestation)
    }
}
