use anchor_lang::prelude::*;

use crate::{
    constants::{NINETY_DAYS, THIRTY_DAYS},
    errors::MarketError,
};

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionDuration {
    ThirtyDays,
    NinetyDays,
}

impl Default for OptionDuration {
    fn default() -> Self {
        OptionDuration::ThirtyDays
    }
}

impl OptionDuration {
    pub fn seconds(&self) -> i64 {
        match self {
            OptionDuration::ThirtyDays => THIRTY_DAYS,
            OptionDuration::NinetyDays => NINETY_DAYS,
        }
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionState {
    Pending,
    Accepted,
    Exercised,
    Closed,
    /// Withdrawn by the buyer before acceptance; treated as not found
    Withdrawn,
}

impl Default for OptionState {
    fn default() -> Self {
        OptionState::Pending
    }
}

#[account]
#[derive(Default, Debug)]
pub struct OptionBid {
    pub id: u64,
    pub vault: [u8; 32],
    pub collection: Pubkey,
    pub token_id: Pubkey,

    /// Strike in lamports, paid on exercise
    pub strike: u64,

    /// Premium in lamports, paid to the seller on acceptance
    pub premium: u64,

    pub duration: OptionDuration,
    pub state: OptionState,
    pub buyer: Pubkey,

    /// Set on acceptance
    pub seller: Pubkey,

    /// Set on acceptance to acceptance time plus duration
    pub expiry: i64,

    pub bump: u8,
}

impl OptionBid {
    pub const LEN: usize = 8 + // discriminator
        8 + // id
        32 + // vault
        32 + // collection
        32 + // token_id
        8 + // strike
        8 + // premium
        1 + // duration
        1 + // state
        32 + // buyer
        32 + // seller
        8 + // expiry
        1; // bump

    pub fn ensure_exists(&self) -> Result<()> {
        require!(self.state != OptionState::Withdrawn, MarketError::OptionDoesNotExist);
        Ok(())
    }

    fn ensure_pending(&self) -> Result<()> {
        self.ensure_exists()?;
        require!(self.state == OptionState::Pending, MarketError::OptionAlreadyAccepted);
        Ok(())
    }

    pub fn modify(
        &mut self,
        caller: &Pubkey,
        strike: u64,
        premium: u64,
        duration: OptionDuration,
    ) -> Result<()> {
        self.ensure_pending()?;
        require_keys_eq!(*caller, self.buyer, MarketError::NotBidOwner);
        validate_terms(strike, premium)?;
        self.strike = strike;
        self.premium = premium;
        self.duration = duration;
        Ok(())
    }

    pub fn withdraw(&mut self, caller: &Pubkey) -> Result<()> {
        self.ensure_pending()?;
        require_keys_eq!(*caller, self.buyer, MarketError::NotYourBid);
        self.state = OptionState::Withdrawn;
        Ok(())
    }

    /// Pending to Accepted; the premium has already been settled by the caller.
    pub fn accept(&mut self, seller: &Pubkey, now: i64) -> Result<()> {
        self.ensure_pending()?;
        self.seller = *seller;
        self.expiry = now
            .checked_add(self.duration.seconds())
            .ok_or(MarketError::MathOverflow)?;
        self.state = OptionState::Accepted;
        Ok(())
    }

    /// Checks an exercise by `caller` at `now` without changing state.
    pub fn check_exercise(&self, caller: &Pubkey, now: i64) -> Result<()> {
        self.ensure_exists()?;
        require!(self.holds_escrow(), MarketError::OptionNotExercisable);
        require_keys_eq!(*caller, self.buyer, MarketError::NotYourOption);
        require!(now < self.expiry, MarketError::OptionNotExercisable);
        Ok(())
    }

    pub fn exercise(&mut self, caller: &Pubkey, now: i64) -> Result<()> {
        self.check_exercise(caller, now)?;
        self.state = OptionState::Exercised;
        Ok(())
    }

    pub fn close_expired(&mut self, caller: &Pubkey, now: i64) -> Result<()> {
        self.ensure_exists()?;
        require!(self.holds_escrow(), MarketError::OptionNotExercisable);
        require_keys_eq!(*caller, self.seller, MarketError::NotYourOption);
        require!(now >= self.expiry, MarketError::OptionNotExpired);
        self.state = OptionState::Closed;
        Ok(())
    }

    /// True while the NFT sits in market escrow.
    pub fn holds_escrow(&self) -> bool {
        self.state == OptionState::Accepted
    }
}

pub fn validate_terms(strike: u64, premium: u64) -> Result<()> {
    require!(strike > 0 && premium > 0, MarketError::InsufficientStrikeAndPremium);
    Ok(())
}

/// Parameters of one option bid placement
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptionBidInput {
    pub collection: Pubkey,
    pub token_id: Pubkey,
    pub strike: u64,
    pub premium: u64,
    pub duration: OptionDuration,
}
