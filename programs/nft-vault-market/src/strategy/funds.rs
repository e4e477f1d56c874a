use anchor_lang::prelude::*;
use anchor_spl::{
    associated_token::{self, get_associated_token_address},
    token::{self, accessor},
};

use crate::{
    constants::*,
    errors::MarketError,
    stake_pool_integration::{self, cpi::StakePoolSolAccounts},
    state::Vault,
    stored::Stored,
    strategy::StrategyKind,
};

/// Number of remaining accounts a stake-pool vault needs to move funds.
///
/// Layout: `[stake_pool_program, withdraw_authority, reserve_stake, manager_fee_account,
/// pool_mint, token_program, clock, stake_history, stake_program,
/// associated_token_program, delegate, delegate_pool_tokens]`
pub const STAKE_POOL_ACCOUNTS_LEN: usize = 12;

pub fn delegate_address(vault_name: &[u8; 32], user: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[DELEGATE_SEED, vault_name.as_ref(), user.as_ref()], &crate::ID)
}

/// Fund movement for one vault and one user within an instruction.
pub struct VaultFunds<'a, 'info> {
    pub vault: AccountInfo<'info>,
    pub vault_name: [u8; 32],
    pub strategy: StrategyKind,
    pub system_program: AccountInfo<'info>,
    pub yield_source: Option<AccountInfo<'info>>,
    pub remaining: &'a [AccountInfo<'info>],
}

struct DelegateAccounts<'info> {
    pool: StakePoolSolAccounts<'info>,
    associated_token_program: AccountInfo<'info>,
    delegate: AccountInfo<'info>,
    delegate_pool_tokens: AccountInfo<'info>,
    delegate_bump: u8,
}

impl<'a, 'info> VaultFunds<'a, 'info> {
    pub fn new(
        vault: &Stored<'_, 'info, Vault>,
        system_program: AccountInfo<'info>,
        yield_source: Option<AccountInfo<'info>>,
        remaining: &'a [AccountInfo<'info>],
    ) -> Self {
        Self {
            vault: vault.info().clone(),
            vault_name: vault.name,
            strategy: vault.strategy,
            system_program,
            yield_source,
            remaining,
        }
    }

    /// Takes `lamports` from `payer` into the strategy; returns the shares minted.
    pub fn accept_deposit(&self, user: &Pubkey, payer: &AccountInfo<'info>, lamports: u64) -> Result<u64> {
        match self.strategy {
            StrategyKind::PassThrough => {
                anchor_lang::system_program::transfer(
                    CpiContext::new(
                        self.system_program.clone(),
                        anchor_lang::system_program::Transfer {
                            from: payer.clone(),
                            to: self.vault.clone(),
                        },
                    ),
                    lamports,
                )?;
                Ok(lamports)
            }
            StrategyKind::StakePool { .. } => {
                let accounts = self.delegate_accounts(user)?;
                self.ensure_delegate_tokens(&accounts, payer)?;

                let before = accessor::amount(&accounts.delegate_pool_tokens)?;
                stake_pool_integration::cpi::deposit_sol(
                    &accounts.pool,
                    payer.clone(),
                    accounts.delegate_pool_tokens.clone(),
                    lamports,
                )?;
                let after = accessor::amount(&accounts.delegate_pool_tokens)?;

                let minted = after.saturating_sub(before);
                require!(minted > 0, MarketError::StrategyShortfall);
                Ok(minted)
            }
        }
    }

    /// Redeems `shares` of `user` and pays the lamports to `recipient`; returns lamports paid.
    pub fn release(&self, user: &Pubkey, shares: u64, recipient: &AccountInfo<'info>) -> Result<u64> {
        match self.strategy {
            StrategyKind::PassThrough => {
                let rent_floor = Rent::get()?.minimum_balance(self.vault.data_len());
                let available = self.vault.lamports().saturating_sub(rent_floor);
                require!(shares <= available, MarketError::StrategyShortfall);

                **self.vault.try_borrow_mut_lamports()? -= shares;
                let mut recipient_lamports = recipient.try_borrow_mut_lamports()?;
                **recipient_lamports = recipient_lamports
                    .checked_add(shares)
                    .ok_or(MarketError::MathOverflow)?;
                Ok(shares)
            }
            StrategyKind::StakePool { .. } => {
                let accounts = self.delegate_accounts(user)?;
                let bump = [accounts.delegate_bump];
                let seeds: &[&[u8]] = &[DELEGATE_SEED, self.vault_name.as_ref(), user.as_ref(), &bump];

                let before = recipient.lamports();
                stake_pool_integration::cpi::withdraw_sol(
                    &accounts.pool,
                    accounts.delegate.clone(),
                    accounts.delegate_pool_tokens.clone(),
                    recipient.clone(),
                    shares,
                    &[seeds],
                )?;
                Ok(recipient.lamports().saturating_sub(before))
            }
        }
    }

    /// Moves `amount` pool tokens from `source` into the user's delegate custody.
    pub fn accept_lp(
        &self,
        user: &Pubkey,
        owner: &AccountInfo<'info>,
        source: &AccountInfo<'info>,
        amount: u64,
    ) -> Result<()> {
        let accounts = self.lp_accounts(user)?;
        self.ensure_delegate_tokens(&accounts, owner)?;

        token::transfer(
            CpiContext::new(
                accounts.pool.token_program.clone(),
                token::Transfer {
                    from: source.clone(),
                    to: accounts.delegate_pool_tokens.clone(),
                    authority: owner.clone(),
                },
            ),
            amount,
        )
    }

    /// Returns `shares` pool tokens from delegate custody to `destination`.
    pub fn release_lp(&self, user: &Pubkey, shares: u64, destination: &AccountInfo<'info>) -> Result<()> {
        let accounts = self.lp_accounts(user)?;
        let bump = [accounts.delegate_bump];
        let seeds: &[&[u8]] = &[DELEGATE_SEED, self.vault_name.as_ref(), user.as_ref(), &bump];

        token::transfer(
            CpiContext::new_with_signer(
                accounts.pool.token_program.clone(),
                token::Transfer {
                    from: accounts.delegate_pool_tokens.clone(),
                    to: destination.clone(),
                    authority: accounts.delegate.clone(),
                },
                &[seeds],
            ),
            shares,
        )
    }

    fn lp_accounts(&self, user: &Pubkey) -> Result<DelegateAccounts<'info>> {
        match self.strategy {
            StrategyKind::StakePool {
                lp_deposits_enabled: true,
                ..
            } => self.delegate_accounts(user),
            _ => err!(MarketError::LpTokenDisabled),
        }
    }

    fn ensure_delegate_tokens(&self, accounts: &DelegateAccounts<'info>, payer: &AccountInfo<'info>) -> Result<()> {
        if accounts.delegate_pool_tokens.data_is_empty() {
            associated_token::create_idempotent(CpiContext::new(
                accounts.associated_token_program.clone(),
                associated_token::Create {
                    payer: payer.clone(),
                    associated_token: accounts.delegate_pool_tokens.clone(),
                    authority: accounts.delegate.clone(),
                    mint: accounts.pool.pool_mint.clone(),
                    system_program: self.system_program.clone(),
                    token_program: accounts.pool.token_program.clone(),
                },
            ))?;
        }
        Ok(())
    }

    fn delegate_accounts(&self, user: &Pubkey) -> Result<DelegateAccounts<'info>> {
        let StrategyKind::StakePool {
            stake_pool,
            pool_mint,
            ..
        } = self.strategy
        else {
            return err!(MarketError::StrategyAccountMismatch);
        };

        let pool_info = self
            .yield_source
            .clone()
            .ok_or(MarketError::StrategyAccountMismatch)?;
        require_keys_eq!(pool_info.key(), stake_pool, MarketError::StrategyAccountMismatch);
        require!(
            self.remaining.len() >= STAKE_POOL_ACCOUNTS_LEN,
            MarketError::StrategyAccountMismatch
        );

        let header = stake_pool_integration::load_stake_pool(&pool_info)?;
        let r = &self.remaining[..STAKE_POOL_ACCOUNTS_LEN];

        require_keys_eq!(r[0].key(), SPL_STAKE_POOL_PROGRAM_ID, MarketError::StrategyAccountMismatch);
        require_keys_eq!(
            r[1].key(),
            stake_pool_integration::withdraw_authority(&stake_pool),
            MarketError::StrategyAccountMismatch
        );
        require_keys_eq!(r[2].key(), header.reserve_stake, MarketError::StrategyAccountMismatch);
        require_keys_eq!(r[3].key(), header.manager_fee_account, MarketError::StrategyAccountMismatch);
        require_keys_eq!(r[4].key(), pool_mint, MarketError::StrategyAccountMismatch);
        require_keys_eq!(header.pool_mint, pool_mint, MarketError::StrategyAccountMismatch);
        require_keys_eq!(r[5].key(), token::ID, MarketError::StrategyAccountMismatch);
        require_keys_eq!(r[9].key(), associated_token::ID, MarketError::StrategyAccountMismatch);

        let (delegate, delegate_bump) = delegate_address(&self.vault_name, user);
        require_keys_eq!(r[10].key(), delegate, MarketError::StrategyAccountMismatch);
        require_keys_eq!(
            r[11].key(),
            get_associated_token_address(&delegate, &pool_mint),
            MarketError::StrategyAccountMismatch
        );

        Ok(DelegateAccounts {
            pool: StakePoolSolAccounts {
                stake_pool_program: r[0].clone(),
                stake_pool: pool_info,
                withdraw_authority: r[1].clone(),
                reserve_stake: r[2].clone(),
                manager_fee_account: r[3].clone(),
                pool_mint: r[4].clone(),
                token_program: r[5].clone(),
                system_program: self.system_program.clone(),
                clock: r[6].clone(),
                stake_history: r[7].clone(),
                stake_program: r[8].clone(),
            },
            associated_token_program: r[9].clone(),
            delegate: r[10].clone(),
            delegate_pool_tokens: r[11].clone(),
            delegate_bump,
        })
    }
}
