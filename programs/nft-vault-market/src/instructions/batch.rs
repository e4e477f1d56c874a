use anchor_lang::{prelude::*, system_program};

use crate::{constants::MAX_BATCH_BIDS, errors::MarketError};

/// Checks batch size against the number of remaining accounts per item.
pub fn check_batch(items: usize, accounts: usize, accounts_per_item: usize) -> Result<()> {
    require!(items > 0, MarketError::InvalidAmount);
    require!(items <= MAX_BATCH_BIDS, MarketError::BatchTooLarge);
    require!(
        accounts == items * accounts_per_item,
        MarketError::BatchAccountsMismatch
    );
    Ok(())
}

pub fn store<T: AccountSerialize>(info: &AccountInfo, value: &T) -> Result<()> {
    let mut data = info.try_borrow_mut_data()?;
    let mut writer: &mut [u8] = &mut data[..];
    value.try_serialize(&mut writer)
}

/// Lamports `target` still needs to be rent exempt.
pub fn rent_shortfall(current: u64, required: u64) -> u64 {
    required.saturating_sub(current)
}

/// Creates a program-owned PDA at `target` funded by `payer`. An address that already holds
/// lamports is topped up, allocated and assigned instead, so pre-funding cannot block creation.
pub fn create_pda<'info>(
    payer: &AccountInfo<'info>,
    target: &AccountInfo<'info>,
    system_program: &AccountInfo<'info>,
    space: usize,
    seeds: &[&[u8]],
) -> Result<()> {
    let required = Rent::get()?.minimum_balance(space);
    let current = target.lamports();

    if current == 0 {
        return system_program::create_account(
            CpiContext::new_with_signer(
                system_program.clone(),
                system_program::CreateAccount {
                    from: payer.clone(),
                    to: target.clone(),
                },
                &[seeds],
            ),
            required,
            space as u64,
            &crate::ID,
        );
    }

    let top_up = rent_shortfall(current, required);
    if top_up > 0 {
        system_program::transfer(
            CpiContext::new(
                system_program.clone(),
                system_program::Transfer {
                    from: payer.clone(),
                    to: target.clone(),
                },
            ),
            top_up,
        )?;
    }
    system_program::allocate(
        CpiContext::new_with_signer(
            system_program.clone(),
            system_program::Allocate {
                account_to_allocate: target.clone(),
            },
            &[seeds],
        ),
        space as u64,
    )?;
    system_program::assign(
        CpiContext::new_with_signer(
            system_program.clone(),
            system_program::Assign {
                account_to_assign: target.clone(),
            },
            &[seeds],
        ),
        &crate::ID,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_market_error;

    #[test]
    fn batch_shape_is_checked() {
        assert!(check_batch(2, 4, 2).is_ok());
        assert_market_error(check_batch(0, 0, 2), MarketError::InvalidAmount);
        assert_market_error(check_batch(MAX_BATCH_BIDS + 1, (MAX_BATCH_BIDS + 1) * 2, 2), MarketError::BatchTooLarge);
        assert_market_error(check_batch(2, 3, 2), MarketError::BatchAccountsMismatch);
    }

    #[test]
    fn prefunded_address_only_tops_up_the_difference() {
        assert_eq!(rent_shortfall(0, 1_000), 1_000);
        assert_eq!(rent_shortfall(1, 1_000), 999);
        assert_eq!(rent_shortfall(1_000, 1_000), 0);
        assert_eq!(rent_shortfall(5_000, 1_000), 0);
    }
}
