use std::ops::{Deref, DerefMut};

use anchor_lang::prelude::*;

use crate::{errors::MarketError, state::Vault};

/// A program account read by hand from an unchecked address. Addresses that were never
/// created, or hold another account type, surface `missing` instead of an account
/// validation failure. Changes are written back with `persist`.
pub struct Stored<'a, 'info, T> {
    info: &'a AccountInfo<'info>,
    inner: T,
}

impl<'a, 'info, T> Stored<'a, 'info, T>
where
    T: AccountSerialize + AccountDeserialize + Owner,
{
    pub fn load(info: &'a AccountInfo<'info>, missing: MarketError) -> Result<Self> {
        if *info.owner != T::owner() || info.data_is_empty() {
            return Err(missing.into());
        }
        let inner = {
            let data = info.try_borrow_data()?;
            T::try_deserialize(&mut &data[..]).map_err(|_| Error::from(missing))?
        };
        Ok(Self { info, inner })
    }

    /// Loads only when `info` is present, for optional accounts.
    pub fn load_optional(info: Option<&'a AccountInfo<'info>>, missing: MarketError) -> Result<Option<Self>> {
        info.map(|info| Self::load(info, missing)).transpose()
    }

    /// Loads `info` if it was ever created by this program; an absent or uncreated
    /// address reads as `None`.
    pub fn load_if_created(info: Option<&'a AccountInfo<'info>>, mismatch: MarketError) -> Result<Option<Self>> {
        match info {
            Some(info) if *info.owner == T::owner() && !info.data_is_empty() => Self::load(info, mismatch).map(Some),
            _ => Ok(None),
        }
    }

    pub fn persist(&self) -> Result<()> {
        require!(self.info.is_writable, anchor_lang::error::ErrorCode::AccountNotMutable);
        let mut data = self.info.try_borrow_mut_data()?;
        let mut writer: &mut [u8] = &mut data[..];
        self.inner.try_serialize(&mut writer)
    }

    pub fn key(&self) -> Pubkey {
        *self.info.key
    }

    pub fn info(&self) -> &'a AccountInfo<'info> {
        self.info
    }
}

impl<T> Deref for Stored<'_, '_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for Stored<'_, '_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

/// A registered vault; unregistered and never-created vaults both read as not found.
pub fn registered_vault<'a, 'info>(info: &'a AccountInfo<'info>) -> Result<Stored<'a, 'info, Vault>> {
    let vault = Stored::<Vault>::load(info, MarketError::VaultNotFound)?;
    require!(vault.registered, MarketError::VaultNotFound);
    Ok(vault)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Bid, OptionBid, UserPosition};
    use crate::test_utils::assert_market_error;

    fn serialized<T: AccountSerialize>(value: &T, len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        let mut writer: &mut [u8] = &mut data[..];
        value.try_serialize(&mut writer).unwrap();
        data
    }

    #[test]
    fn never_created_address_reports_domain_error() {
        let key = Pubkey::new_unique();
        let system = anchor_lang::system_program::ID;
        let mut lamports = 0;
        let mut data = vec![];
        let info = AccountInfo::new(&key, false, true, &mut lamports, &mut data, &system, false, 0);

        assert_market_error(Stored::<Vault>::load(&info, MarketError::VaultNotFound), MarketError::VaultNotFound);
        assert_market_error(Stored::<Bid>::load(&info, MarketError::BidDoesNotExist), MarketError::BidDoesNotExist);
        assert_market_error(
            Stored::<OptionBid>::load(&info, MarketError::OptionDoesNotExist),
            MarketError::OptionDoesNotExist,
        );
    }

    #[test]
    fn other_account_type_reports_domain_error() {
        let key = Pubkey::new_unique();
        let mut lamports = 1;
        let mut data = serialized(&Vault::default(), Vault::LEN);
        let info = AccountInfo::new(&key, false, true, &mut lamports, &mut data, &crate::ID, false, 0);

        assert_market_error(Stored::<Bid>::load(&info, MarketError::BidDoesNotExist), MarketError::BidDoesNotExist);
    }

    #[test]
    fn changes_written_back_on_persist() {
        let key = Pubkey::new_unique();
        let mut lamports = 1;
        let mut data = serialized(&Bid { id: 4, active: true, ..Default::default() }, Bid::LEN);
        let info = AccountInfo::new(&key, false, true, &mut lamports, &mut data, &crate::ID, false, 0);

        let mut bid = Stored::<Bid>::load(&info, MarketError::BidDoesNotExist).unwrap();
        assert_eq!(bid.id, 4);
        bid.active = false;
        bid.persist().unwrap();

        let reloaded = Stored::<Bid>::load(&info, MarketError::BidDoesNotExist).unwrap();
        assert!(!reloaded.active);
        assert_eq!(reloaded.key(), key);
    }

    #[test]
    fn absent_optional_account_is_none() {
        assert!(Stored::<Vault>::load_optional(None, MarketError::VaultNotFound).unwrap().is_none());
        assert!(Stored::<UserPosition>::load_if_created(None, MarketError::PositionMismatch).unwrap().is_none());
    }

    #[test]
    fn uncreated_address_reads_as_none() {
        let key = Pubkey::new_unique();
        let system = anchor_lang::system_program::ID;
        let mut lamports = 10;
        let mut data = vec![];
        let info = AccountInfo::new(&key, false, true, &mut lamports, &mut data, &system, false, 0);

        assert!(Stored::<UserPosition>::load_if_created(Some(&info), MarketError::PositionMismatch)
            .unwrap()
            .is_none());
    }

    #[test]
    fn unregistered_vault_is_not_found() {
        let key = Pubkey::new_unique();
        let mut lamports = 1;
        let mut data = serialized(&Vault { registered: false, ..Default::default() }, Vault::LEN);
        let info = AccountInfo::new(&key, false, true, &mut lamports, &mut data, &crate::ID, false, 0);
        assert_market_error(registered_vault(&info), MarketError::VaultNotFound);

        let mut lamports = 1;
        let mut data = serialized(&Vault { registered: true, ..Default::default() }, Vault::LEN);
        let info = AccountInfo::new(&key, false, true, &mut lamports, &mut data, &crate::ID, false, 0);
        assert!(registered_vault(&info).is_ok());
    }
}
