use anchor_lang::prelude::*;

use crate::errors::MarketError;

#[account]
#[derive(Default, Debug)]
pub struct Bid {
    pub id: u64,

    /// Name of the vault whose live balance backs the bid
    pub vault: [u8; 32],

    /// SPL collection key, or the punk registry program id
    pub collection: Pubkey,

    /// NFT mint, or the punk record account
    pub token_id: Pubkey,

    /// Lamports offered
    pub amount: u64,

    pub bidder: Pubkey,

    /// Cleared on withdrawal or acceptance
    pub active: bool,

    /// Bump seed for PDA derivation
    pub bump: u8,
}

impl Bid {
    pub const LEN: usize = 8 + // discriminator
        8 + // id
        32 + // vault
        32 + // collection
        32 + // token_id
        8 + // amount
        32 + // bidder
        1 + // active
        1; // bump

    pub fn ensure_exists(&self) -> Result<()> {
        require!(self.active, MarketError::BidDoesNotExist);
        Ok(())
    }

    pub fn modify(&mut self, caller: &Pubkey, amount: u64) -> Result<()> {
        self.ensure_exists()?;
        require_keys_eq!(*caller, self.bidder, MarketError::NotBidOwner);
        require!(amount > 0, MarketError::InsufficientBidAmount);
        self.amount = amount;
        Ok(())
    }

    pub fn withdraw(&mut self, caller: &Pubkey) -> Result<()> {
        self.ensure_exists()?;
        require_keys_eq!(*caller, self.bidder, MarketError::NotYourBid);
        self.active = false;
        Ok(())
    }
}

/// Parameters of one bid placement
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BidInput {
    pub collection: Pubkey,
    pub token_id: Pubkey,
    pub amount: u64,
}
