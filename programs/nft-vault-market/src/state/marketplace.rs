use anchor_lang::prelude::*;

use crate::errors::MarketError;

#[account]
#[derive(Default, Debug)]
pub struct Marketplace {
    /// Privileged account for vault, reward and epoch configuration
    pub owner: Pubkey,

    /// Mint of the protocol reward token
    pub reward_mint: Pubkey,

    /// Program id of the punk registry; bids on this collection use the registry instead of SPL
    pub punk_registry: Pubkey,

    /// Next id handed out to a bid
    pub next_bid_id: u64,

    /// Next id handed out to an option bid
    pub next_option_id: u64,

    /// Bump of the market authority PDA
    pub authority_bump: u8,

    /// Bump seed for PDA derivation
    pub bump: u8,

    /// Reserved space for future upgrades
    pub _reserved: [u8; 32],
}

impl Marketplace {
    pub const LEN: usize = 8 + // discriminator
        32 + // owner
        32 + // reward_mint
        32 + // punk_registry
        8 + // next_bid_id
        8 + // next_option_id
        1 + // authority_bump
        1 + // bump
        32; // _reserved

    /// The single authorization check behind every privileged instruction.
    pub fn authorize(&self, caller: &Pubkey) -> Result<()> {
        require_keys_eq!(*caller, self.owner, MarketError::NotOwner);
        Ok(())
    }

    pub fn is_punk_collection(&self, collection: &Pubkey) -> bool {
        *collection == self.punk_registry
    }

    pub fn take_bid_id(&mut self) -> Result<u64> {
        let id = self.next_bid_id;
        self.next_bid_id = id.checked_add(1).ok_or(MarketError::MathOverflow)?;
        Ok(id)
    }

    pub fn take_option_id(&mut self) -> Result<u64> {
        let id = self.next_option_id;
        self.next_option_id = id.checked_add(1).ok_or(MarketError::MathOverflow)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_market_error;

    #[test]
    fn authorize_rejects_non_owner() {
        let owner = Pubkey::new_unique();
        let marketplace = Marketplace { owner, ..Default::default() };

        assert!(marketplace.authorize(&owner).is_ok());
        assert_market_error(marketplace.authorize(&Pubkey::new_unique()), MarketError::NotOwner);
    }

    #[test]
    fn ids_are_monotonic_and_independent() {
        let mut marketplace = Marketplace::default();

        assert_eq!(marketplace.take_bid_id().unwrap(), 0);
        assert_eq!(marketplace.take_bid_id().unwrap(), 1);
        assert_eq!(marketplace.take_option_id().unwrap(), 0);
        assert_eq!(marketplace.next_bid_id, 2);
    }
}
