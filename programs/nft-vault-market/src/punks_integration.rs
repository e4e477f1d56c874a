use anchor_lang::prelude::*;
use bytemuck::{Pod, Zeroable};

use crate::errors::MarketError;

/// Instruction tags of the punk registry program
pub const IX_TRANSFER_PUNK: u8 = 1;
pub const IX_OFFER_PUNK_FOR_SALE_TO_ADDRESS: u8 = 4;
pub const IX_BUY_PUNK: u8 = 5;

/// One record per punk, owned by the registry program
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PunkRecord {
    pub punk_index: u64,
    /// Current holder; zero while unassigned
    pub owner: Pubkey,
    /// Only this address may buy while an offer is open
    pub offered_to: Pubkey,
    pub min_price: u64,
    pub is_for_sale: u8,
    pub padding: [u8; 7],
    pub reserved: [u8; 32],
}

impl PunkRecord {
    pub fn holder(&self) -> Option<Pubkey> {
        (self.owner != Pubkey::default()).then_some(self.owner)
    }
}

/// Reads a punk record owned by `registry`, skipping the 8 byte discriminator.
pub fn deserialize_punk_record(account: &AccountInfo, registry: &Pubkey) -> Result<PunkRecord> {
    require_keys_eq!(*account.owner, *registry, MarketError::PunkNotFound);
    if account.data_len() < 8 + std::mem::size_of::<PunkRecord>() {
        return Err(MarketError::PunkNotFound.into());
    }

    let data = account.try_borrow_data()?;
    let record = bytemuck::try_pod_read_unaligned::<PunkRecord>(
        &data[8..8 + std::mem::size_of::<PunkRecord>()],
    )
    .map_err(|_| MarketError::PunkNotFound)?;

    Ok(record)
}

/// Current holder of the punk; fails with `PunkNotFound` for unassigned punks.
pub fn punk_index_to_address(account: &AccountInfo, registry: &Pubkey) -> Result<Pubkey> {
    deserialize_punk_record(account, registry)?
        .holder()
        .ok_or_else(|| MarketError::PunkNotFound.into())
}

pub mod cpi {
    use super::*;
    use anchor_lang::solana_program::{instruction::Instruction, program::invoke_signed};

    fn punk_ix(registry: &AccountInfo, metas: Vec<AccountMeta>, tag: u8, args: &[&[u8]]) -> Instruction {
        let mut data = Vec::with_capacity(1 + args.iter().map(|a| a.len()).sum::<usize>());
        data.push(tag);
        for arg in args {
            data.extend_from_slice(arg);
        }
        Instruction {
            program_id: registry.key(),
            accounts: metas,
            data,
        }
    }

    /// Restricts the sale of a punk to `to_address` at `min_price`. Signed by the holder.
    pub fn offer_punk_for_sale_to_address<'info>(
        registry: AccountInfo<'info>,
        record: AccountInfo<'info>,
        holder: AccountInfo<'info>,
        punk_index: u64,
        min_price: u64,
        to_address: Pubkey,
        signer_seeds: &[&[&[u8]]],
    ) -> Result<()> {
        let instruction = punk_ix(
            &registry,
            vec![
                AccountMeta::new(record.key(), false),
                AccountMeta::new_readonly(holder.key(), true),
            ],
            IX_OFFER_PUNK_FOR_SALE_TO_ADDRESS,
            &[&punk_index.to_le_bytes(), &min_price.to_le_bytes(), to_address.as_ref()],
        );
        invoke_signed(&instruction, &[record, holder, registry], signer_seeds)?;
        Ok(())
    }

    /// Takes an open offer; the buyer must be the offered-to address.
    pub fn buy_punk<'info>(
        registry: AccountInfo<'info>,
        record: AccountInfo<'info>,
        buyer: AccountInfo<'info>,
        punk_index: u64,
        signer_seeds: &[&[&[u8]]],
    ) -> Result<()> {
        let instruction = punk_ix(
            &registry,
            vec![
                AccountMeta::new(record.key(), false),
                AccountMeta::new_readonly(buyer.key(), true),
            ],
            IX_BUY_PUNK,
            &[&punk_index.to_le_bytes()],
        );
        invoke_signed(&instruction, &[record, buyer, registry], signer_seeds)?;
        Ok(())
    }

    pub fn transfer_punk<'info>(
        registry: AccountInfo<'info>,
        record: AccountInfo<'info>,
        holder: AccountInfo<'info>,
        to: Pubkey,
        punk_index: u64,
        signer_seeds: &[&[&[u8]]],
    ) -> Result<()> {
        let instruction = punk_ix(
            &registry,
            vec![
                AccountMeta::new(record.key(), false),
                AccountMeta::new_readonly(holder.key(), true),
            ],
            IX_TRANSFER_PUNK,
            &[to.as_ref(), &punk_index.to_le_bytes()],
        );
        invoke_signed(&instruction, &[record, holder, registry], signer_seeds)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unassigned_punk_has_no_holder() {
        let mut record = PunkRecord::zeroed();
        assert!(record.holder().is_none());

        let owner = Pubkey::new_unique();
        record.owner = owner;
        assert_eq!(record.holder(), Some(owner));
    }

    #[test]
    fn record_layout_is_packed() {
        assert_eq!(std::mem::size_of::<PunkRecord>(), 8 + 32 + 32 + 8 + 1 + 7 + 32);
    }
}
