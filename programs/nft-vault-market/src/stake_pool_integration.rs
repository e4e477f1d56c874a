use anchor_lang::prelude::*;

use crate::{constants::SPL_STAKE_POOL_PROGRAM_ID, errors::MarketError};

/// `AccountType::StakePool` tag at offset 0
pub const ACCOUNT_TYPE_STAKE_POOL: u8 = 1;

/// Borsh variant index of `StakePoolInstruction::DepositSol`
pub const IX_DEPOSIT_SOL: u8 = 14;
/// Borsh variant index of `StakePoolInstruction::WithdrawSol`
pub const IX_WITHDRAW_SOL: u8 = 16;

/// Leading fields of an SPL stake pool account, up to the exchange-rate totals.
/// The tail (fees, lockup, authorities) is not needed for quoting.
#[derive(AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct StakePoolHeader {
    pub account_type: u8,
    pub manager: Pubkey,
    pub staker: Pubkey,
    pub stake_deposit_authority: Pubkey,
    pub stake_withdraw_bump_seed: u8,
    pub validator_list: Pubkey,
    pub reserve_stake: Pubkey,
    pub pool_mint: Pubkey,
    pub manager_fee_account: Pubkey,
    pub token_program_id: Pubkey,
    pub total_lamports: u64,
    pub pool_token_supply: u64,
    pub last_update_epoch: u64,
}

impl StakePoolHeader {
    pub const SPACE: usize = 1 + 32 * 3 + 1 + 32 * 5 + 8 * 3;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        require!(data.len() >= Self::SPACE, MarketError::InvalidStakePool);
        let header = Self::deserialize(&mut &data[..Self::SPACE])
            .map_err(|_| MarketError::InvalidStakePool)?;
        require!(
            header.account_type == ACCOUNT_TYPE_STAKE_POOL,
            MarketError::InvalidStakePool
        );
        Ok(header)
    }
}

/// Reads and validates a stake pool account.
pub fn load_stake_pool(account: &AccountInfo) -> Result<StakePoolHeader> {
    require_keys_eq!(
        *account.owner,
        SPL_STAKE_POOL_PROGRAM_ID,
        MarketError::InvalidStakePool
    );
    let data = account.try_borrow_data()?;
    StakePoolHeader::from_bytes(&data)
}

/// Derives the pool's withdraw authority, `[stake_pool, "withdraw"]` under the pool program.
pub fn withdraw_authority(stake_pool: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[stake_pool.as_ref(), b"withdraw"],
        &SPL_STAKE_POOL_PROGRAM_ID,
    )
    .0
}

pub mod cpi {
    use super::*;
    use anchor_lang::solana_program::{instruction::Instruction, program::invoke, program::invoke_signed};

    /// Accounts shared by `DepositSol` and `WithdrawSol`.
    pub struct StakePoolSolAccounts<'info> {
        pub stake_pool_program: AccountInfo<'info>,
        pub stake_pool: AccountInfo<'info>,
        pub withdraw_authority: AccountInfo<'info>,
        pub reserve_stake: AccountInfo<'info>,
        pub manager_fee_account: AccountInfo<'info>,
        pub pool_mint: AccountInfo<'info>,
        pub token_program: AccountInfo<'info>,
        pub system_program: AccountInfo<'info>,
        pub clock: AccountInfo<'info>,
        pub stake_history: AccountInfo<'info>,
        pub stake_program: AccountInfo<'info>,
    }

    /// Deposits `lamports` from `funder` and mints pool tokens into `destination`.
    pub fn deposit_sol<'info>(
        accounts: &StakePoolSolAccounts<'info>,
        funder: AccountInfo<'info>,
        destination: AccountInfo<'info>,
        lamports: u64,
    ) -> Result<()> {
        let mut data = Vec::with_capacity(9);
        data.push(IX_DEPOSIT_SOL);
        data.extend_from_slice(&lamports.to_le_bytes());

        let instruction = Instruction {
            program_id: accounts.stake_pool_program.key(),
            accounts: vec![
                AccountMeta::new(accounts.stake_pool.key(), false),
                AccountMeta::new_readonly(accounts.withdraw_authority.key(), false),
                AccountMeta::new(accounts.reserve_stake.key(), false),
                AccountMeta::new(funder.key(), true),
                AccountMeta::new(destination.key(), false),
                AccountMeta::new(accounts.manager_fee_account.key(), false),
                // referrer fee goes to the same destination
                AccountMeta::new(destination.key(), false),
                AccountMeta::new(accounts.pool_mint.key(), false),
                AccountMeta::new_readonly(accounts.system_program.key(), false),
                AccountMeta::new_readonly(accounts.token_program.key(), false),
            ],
            data,
        };

        invoke(
            &instruction,
            &[
                accounts.stake_pool.clone(),
                accounts.withdraw_authority.clone(),
                accounts.reserve_stake.clone(),
                funder,
                destination,
                accounts.manager_fee_account.clone(),
                accounts.pool_mint.clone(),
                accounts.system_program.clone(),
                accounts.token_program.clone(),
                accounts.stake_pool_program.clone(),
            ],
        )?;
        Ok(())
    }

    /// Burns `pool_tokens` from `source` (owned by `source_authority`) and sends lamports
    /// from the reserve to `recipient`.
    pub fn withdraw_sol<'info>(
        accounts: &StakePoolSolAccounts<'info>,
        source_authority: AccountInfo<'info>,
        source: AccountInfo<'info>,
        recipient: AccountInfo<'info>,
        pool_tokens: u64,
        signer_seeds: &[&[&[u8]]],
    ) -> Result<()> {
        let mut data = Vec::with_capacity(9);
        data.push(IX_WITHDRAW_SOL);
        data.extend_from_slice(&pool_tokens.to_le_bytes());

        let instruction = Instruction {
            program_id: accounts.stake_pool_program.key(),
            accounts: vec![
                AccountMeta::new(accounts.stake_pool.key(), false),
                AccountMeta::new_readonly(accounts.withdraw_authority.key(), false),
                AccountMeta::new_readonly(source_authority.key(), true),
                AccountMeta::new(source.key(), false),
                AccountMeta::new(accounts.reserve_stake.key(), false),
                AccountMeta::new(recipient.key(), false),
                AccountMeta::new(accounts.manager_fee_account.key(), false),
                AccountMeta::new(accounts.pool_mint.key(), false),
                AccountMeta::new_readonly(accounts.clock.key(), false),
                AccountMeta::new_readonly(accounts.stake_history.key(), false),
                AccountMeta::new_readonly(accounts.stake_program.key(), false),
                AccountMeta::new_readonly(accounts.token_program.key(), false),
            ],
            data,
        };

        invoke_signed(
            &instruction,
            &[
                accounts.stake_pool.clone(),
                accounts.withdraw_authority.clone(),
                source_authority,
                source,
                accounts.reserve_stake.clone(),
                recipient,
                accounts.manager_fee_account.clone(),
                accounts.pool_mint.clone(),
                accounts.clock.clone(),
                accounts.stake_history.clone(),
                accounts.stake_program.clone(),
                accounts.token_program.clone(),
                accounts.stake_pool_program.clone(),
            ],
            signer_seeds,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(header: &StakePoolHeader) -> Vec<u8> {
        let mut data = Vec::new();
        data.push(header.account_type);
        for key in [&header.manager, &header.staker, &header.stake_deposit_authority] {
            data.extend_from_slice(key.as_ref());
        }
        data.push(header.stake_withdraw_bump_seed);
        for key in [
            &header.validator_list,
            &header.reserve_stake,
            &header.pool_mint,
            &header.manager_fee_account,
            &header.token_program_id,
        ] {
            data.extend_from_slice(key.as_ref());
        }
        data.extend_from_slice(&header.total_lamports.to_le_bytes());
        data.extend_from_slice(&header.pool_token_supply.to_le_bytes());
        data.extend_from_slice(&header.last_update_epoch.to_le_bytes());
        // trailing fields the header ignores
        data.extend_from_slice(&[7u8; 64]);
        data
    }

    #[test]
    fn parses_pool_header_prefix() {
        let header = StakePoolHeader {
            account_type: ACCOUNT_TYPE_STAKE_POOL,
            pool_mint: Pubkey::new_unique(),
            reserve_stake: Pubkey::new_unique(),
            total_lamports: 1_100,
            pool_token_supply: 1_000,
            last_update_epoch: 42,
            ..Default::default()
        };

        let parsed = StakePoolHeader::from_bytes(&encode(&header)).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn rejects_wrong_account_type_and_short_data() {
        let header = StakePoolHeader {
            account_type: 2,
            ..Default::default()
        };
        assert!(StakePoolHeader::from_bytes(&encode(&header)).is_err());
        assert!(StakePoolHeader::from_bytes(&[1u8; 10]).is_err());
    }
}
