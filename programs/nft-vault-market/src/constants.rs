use anchor_lang::prelude::*;

/// PDA seeds
pub const MARKETPLACE_SEED: &[u8] = b"marketplace";
/// Signer for the reward treasury and for NFTs escrowed by accepted options
pub const MARKET_AUTHORITY_SEED: &[u8] = b"market_authority";
pub const VAULT_SEED: &[u8] = b"vault";
pub const POSITION_SEED: &[u8] = b"position";
/// Owner of a user's pool tokens inside a stake-pool vault: [DELEGATE_SEED, vault_name, user]
pub const DELEGATE_SEED: &[u8] = b"delegate";
pub const BID_SEED: &[u8] = b"bid";
pub const OPTION_SEED: &[u8] = b"option";
pub const REWARDS_SEED: &[u8] = b"rewards";
pub const EPOCH_SEED: &[u8] = b"epoch";
pub const ACTIVITY_SEED: &[u8] = b"activity";
pub const CLAIM_SEED: &[u8] = b"claim";

/// Time constants
pub const SECONDS_PER_DAY: i64 = 86400;
pub const THIRTY_DAYS: i64 = 30 * SECONDS_PER_DAY;
pub const NINETY_DAYS: i64 = 90 * SECONDS_PER_DAY;

/// Reward-per-share accumulator precision
pub const REWARD_PRECISION: u128 = 1_000_000_000_000;

/// Distribution constants
pub const MAX_BPS: u16 = 10000;
pub const MAX_COLLECTIONS: usize = 16;
pub const MAX_BATCH_BIDS: usize = 8;
pub const MAX_PROOF_LEN: usize = 24;

/// SPL Stake Pool Program ID (mainnet)
pub const SPL_STAKE_POOL_PROGRAM_ID: Pubkey = solana_program::pubkey!("SPoo1Ku8WFXoNDMHPsrGSTSG1Y47rzgn41SLUNakuHy");
