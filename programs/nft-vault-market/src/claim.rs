use anchor_lang::prelude::*;

use crate::{
    constants::MAX_PROOF_LEN,
    errors::MarketError,
    merkle,
    state::{ClaimMode, Epoch, RewardsConfig, UserEpochActivity},
};

/// What a claimant presents for an epoch payout.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum ClaimAttestation {
    Weighted,
    Merkle { amount: u64, proof: Vec<[u8; 32]> },
}

/// Computes the payout owed to a claimant for a closed epoch.
pub trait ClaimStrategy {
    fn mode(&self) -> ClaimMode;

    fn payout(&self, epoch: &Epoch, claimant: &Pubkey) -> Result<u64>;
}

/// Payout from the on-chain activity accumulator.
pub struct WeightedClaim<'a> {
    pub activity: Option<&'a UserEpochActivity>,
}

impl ClaimStrategy for WeightedClaim<'_> {
    fn mode(&self) -> ClaimMode {
        ClaimMode::Weighted
    }

    fn payout(&self, epoch: &Epoch, claimant: &Pubkey) -> Result<u64> {
        let activity = self.activity.ok_or(MarketError::UserHasNoRewards)?;
        require_keys_eq!(activity.user, *claimant, MarketError::ActivityMismatch);
        let amount = epoch.weighted_payout(activity)?;
        require!(amount > 0, MarketError::UserHasNoRewards);
        Ok(amount)
    }
}

/// Payout attested off chain and proven against the epoch root.
pub struct MerkleClaim<'a> {
    pub amount: u64,
    pub proof: &'a [[u8; 32]],
}

impl ClaimStrategy for MerkleClaim<'_> {
    fn mode(&self) -> ClaimMode {
        ClaimMode::Merkle
    }

    fn payout(&self, epoch: &Epoch, claimant: &Pubkey) -> Result<u64> {
        require!(epoch.rewards_set, MarketError::EpochRewardsNotSet);
        require!(self.amount > 0, MarketError::UserHasNoRewards);
        require!(self.proof.len() <= MAX_PROOF_LEN, MarketError::InvalidMerkleProof);
        require!(
            merkle::verify(self.proof, &epoch.merkle_root, merkle::leaf(claimant, self.amount)),
            MarketError::InvalidMerkleProof
        );
        Ok(self.amount)
    }
}

/// Timing checks shared by both claim modes, then the strategy's payout.
pub fn compute_claim(
    rewards: &RewardsConfig,
    epoch_index: u64,
    epoch: Option<&Epoch>,
    strategy: &dyn ClaimStrategy,
    claimant: &Pubkey,
    now: i64,
) -> Result<u64> {
    require!(epoch_index < rewards.epoch_count, MarketError::EpochNotStarted);
    let epoch = epoch.ok_or(MarketError::EpochNotStarted)?;
    require!(epoch.index == epoch_index, MarketError::EpochNotStarted);
    require!(epoch.has_ended(now), MarketError::EpochNotEnded);
    require!(strategy.mode() == epoch.claim_mode, MarketError::ClaimModeMismatch);

    strategy.payout(epoch, claimant)
}
