use anchor_lang::prelude::*;

#[error_code]
pub enum MarketError {
    #[msg("Must be marketplace owner")]
    NotOwner,

    #[msg("Math overflow")]
    MathOverflow,

    #[msg("Amount must be greater than zero")]
    InvalidAmount,

    // ----- vaults -----
    #[msg("Vault does not exist")]
    VaultNotFound,

    #[msg("Vault already registered")]
    VaultAlreadyRegistered,

    #[msg("Vault still holds funds")]
    VaultNotEmpty,

    #[msg("Insufficient token balance")]
    InsufficientBalance,

    #[msg("Disabled.")]
    LpTokenDisabled,

    #[msg("Strategy migration between these kinds is not supported")]
    UnsupportedMigration,

    #[msg("Account does not match the vault strategy")]
    StrategyAccountMismatch,

    #[msg("Stake pool account is not an SPL stake pool")]
    InvalidStakePool,

    #[msg("Strategy returned fewer funds than expected")]
    StrategyShortfall,

    #[msg("Previous rewards period must be complete before changing the duration")]
    PreviousPeriodNotEnded,

    #[msg("Rewards duration not set")]
    RewardsDurationNotSet,

    #[msg("Position does not belong to this vault or user")]
    PositionMismatch,

    // ----- bids -----
    #[msg("Insufficient bid amount")]
    InsufficientBidAmount,

    #[msg("Insufficient funds")]
    InsufficientFunds,

    #[msg("NFT not found")]
    NftNotFound,

    #[msg("Punk not found")]
    PunkNotFound,

    #[msg("Not bid owner")]
    NotBidOwner,

    #[msg("Not your bid")]
    NotYourBid,

    #[msg("Bid does not exist")]
    BidDoesNotExist,

    #[msg("Not your NFT")]
    NotYourNFT,

    #[msg("Not your punk")]
    NotYourPunk,

    #[msg("Bid is no longer valid")]
    BidNoLongerValid,

    #[msg("Recipient token account does not match the bid")]
    RecipientMismatch,

    #[msg("Too many items in batch")]
    BatchTooLarge,

    #[msg("Batch accounts do not match the batch inputs")]
    BatchAccountsMismatch,

    // ----- options -----
    #[msg("Insufficient strike and premium amounts")]
    InsufficientStrikeAndPremium,

    #[msg("Already in option")]
    AlreadyInOption,

    #[msg("Option already accepted")]
    OptionAlreadyAccepted,

    #[msg("Option does not exist")]
    OptionDoesNotExist,

    #[msg("Option is no longer valid")]
    OptionNoLongerValid,

    #[msg("Option is not exercisable")]
    OptionNotExercisable,

    #[msg("Not your option")]
    NotYourOption,

    #[msg("Option has not expired")]
    OptionNotExpired,

    // ----- rewards -----
    #[msg("Epoch duration not set")]
    EpochDurationNotSet,

    #[msg("Epoch has not ended")]
    EpochHasNotEnded,

    #[msg("Epoch duration cannot change while an epoch is open")]
    EpochInProgress,

    #[msg("Epoch not started")]
    EpochNotStarted,

    #[msg("Epoch not ended")]
    EpochNotEnded,

    #[msg("No epoch is currently open")]
    EpochNotOpen,

    #[msg("User has no rewards")]
    UserHasNoRewards,

    #[msg("Already claimed")]
    AlreadyClaimed,

    #[msg("Invalid merkle proof")]
    InvalidMerkleProof,

    #[msg("Epoch rewards not set")]
    EpochRewardsNotSet,

    #[msg("Epoch rewards already set")]
    EpochRewardsAlreadySet,

    #[msg("Too many collection allocations")]
    TooManyCollections,

    #[msg("Invalid sales split BPS, must be <= 10000")]
    InvalidSplitBps,

    #[msg("Claim does not match the epoch claim mode")]
    ClaimModeMismatch,

    #[msg("Activity account does not belong to this epoch or user")]
    ActivityMismatch,

    #[msg("Sale activity accounts must be supplied while an epoch is open")]
    ActivityAccountsMissing,

    #[msg("Claim exceeds the epoch's published reward total")]
    ClaimExceedsDistribution,
}
