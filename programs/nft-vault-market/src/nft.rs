use anchor_lang::prelude::*;
use anchor_spl::token::{self, TokenAccount};

use crate::{
    errors::MarketError,
    punks_integration::{self, PunkRecord},
    state::Marketplace,
};

/// Accounts naming one NFT and where it moves, for either SPL NFTs or registry punks.
///
/// For SPL NFTs `nft_program` is the token program, `source` the token account holding the
/// single unit and `destination` the recipient's token account. For punks `nft_program` is
/// the registry and `source` the punk record; `destination` is unused.
pub struct NftAccounts<'info> {
    pub nft_program: AccountInfo<'info>,
    pub source: AccountInfo<'info>,
    pub destination: Option<AccountInfo<'info>>,
}

fn read_token_account(info: &AccountInfo, err: MarketError) -> Result<TokenAccount> {
    require_keys_eq!(*info.owner, token::ID, err);
    let data = info.try_borrow_data()?;
    TokenAccount::try_deserialize(&mut &data[..]).map_err(|_| err.into())
}

fn read_punk(marketplace: &Marketplace, token_id: &Pubkey, record: &AccountInfo) -> Result<PunkRecord> {
    require_keys_eq!(record.key(), *token_id, MarketError::PunkNotFound);
    punks_integration::deserialize_punk_record(record, &marketplace.punk_registry)
}

/// Current owner of the NFT. Fails with `PunkNotFound` / `NftNotFound` when the token
/// has no resolvable owner.
pub fn owner_of(
    marketplace: &Marketplace,
    collection: &Pubkey,
    token_id: &Pubkey,
    holder: &AccountInfo,
) -> Result<Pubkey> {
    if marketplace.is_punk_collection(collection) {
        require_keys_eq!(holder.key(), *token_id, MarketError::PunkNotFound);
        return punks_integration::punk_index_to_address(holder, &marketplace.punk_registry);
    }

    let account = read_token_account(holder, MarketError::NftNotFound)?;
    require!(
        account.mint == *token_id && account.amount == 1,
        MarketError::NftNotFound
    );
    Ok(account.owner)
}

pub fn require_owner(
    marketplace: &Marketplace,
    collection: &Pubkey,
    token_id: &Pubkey,
    holder: &AccountInfo,
    expected: &Pubkey,
) -> Result<()> {
    let owner = owner_of(marketplace, collection, token_id, holder)?;
    if owner != *expected {
        return if marketplace.is_punk_collection(collection) {
            err!(MarketError::NotYourPunk)
        } else {
            err!(MarketError::NotYourNFT)
        };
    }
    Ok(())
}

fn require_nft_program(marketplace: &Marketplace, collection: &Pubkey, program: &AccountInfo) -> Result<()> {
    let expected = if marketplace.is_punk_collection(collection) {
        marketplace.punk_registry
    } else {
        token::ID
    };
    require_keys_eq!(program.key(), expected, MarketError::RecipientMismatch);
    Ok(())
}

fn require_recipient_account(token_id: &Pubkey, destination: &AccountInfo, recipient: &Pubkey) -> Result<()> {
    let account = read_token_account(destination, MarketError::RecipientMismatch)?;
    require!(
        account.mint == *token_id && account.owner == *recipient,
        MarketError::RecipientMismatch
    );
    Ok(())
}

/// Moves the NFT from its signing holder to `recipient`.
///
/// Punks go through the registry's two-step sale: the holder offers the punk to the
/// market authority at zero price, the authority buys it and, unless it is itself the
/// recipient, transfers it on.
pub fn deliver_from_holder<'info>(
    marketplace: &Marketplace,
    collection: &Pubkey,
    token_id: &Pubkey,
    accounts: &NftAccounts<'info>,
    holder: &AccountInfo<'info>,
    recipient: &Pubkey,
    market_authority: &AccountInfo<'info>,
    authority_seeds: &[&[u8]],
) -> Result<()> {
    require_nft_program(marketplace, collection, &accounts.nft_program)?;

    if marketplace.is_punk_collection(collection) {
        let record = read_punk(marketplace, token_id, &accounts.source)?;
        punks_integration::cpi::offer_punk_for_sale_to_address(
            accounts.nft_program.clone(),
            accounts.source.clone(),
            holder.clone(),
            record.punk_index,
            0,
            market_authority.key(),
            &[],
        )?;
        punks_integration::cpi::buy_punk(
            accounts.nft_program.clone(),
            accounts.source.clone(),
            market_authority.clone(),
            record.punk_index,
            &[authority_seeds],
        )?;
        if *recipient != market_authority.key() {
            punks_integration::cpi::transfer_punk(
                accounts.nft_program.clone(),
                accounts.source.clone(),
                market_authority.clone(),
                *recipient,
                record.punk_index,
                &[authority_seeds],
            )?;
        }
        return Ok(());
    }

    let destination = accounts
        .destination
        .clone()
        .ok_or(MarketError::RecipientMismatch)?;
    require_recipient_account(token_id, &destination, recipient)?;

    token::transfer(
        CpiContext::new(
            accounts.nft_program.clone(),
            token::Transfer {
                from: accounts.source.clone(),
                to: destination,
                authority: holder.clone(),
            },
        ),
        1,
    )
}

/// Releases an NFT held by the market authority to `recipient`.
pub fn release_from_escrow<'info>(
    marketplace: &Marketplace,
    collection: &Pubkey,
    token_id: &Pubkey,
    accounts: &NftAccounts<'info>,
    recipient: &Pubkey,
    market_authority: &AccountInfo<'info>,
    authority_seeds: &[&[u8]],
) -> Result<()> {
    require_nft_program(marketplace, collection, &accounts.nft_program)?;
    require_owner(
        marketplace,
        collection,
        token_id,
        &accounts.source,
        &market_authority.key(),
    )?;

    if marketplace.is_punk_collection(collection) {
        let record = read_punk(marketplace, token_id, &accounts.source)?;
        return punks_integration::cpi::transfer_punk(
            accounts.nft_program.clone(),
            accounts.source.clone(),
            market_authority.clone(),
            *recipient,
            record.punk_index,
            &[authority_seeds],
        );
    }

    let destination = accounts
        .destination
        .clone()
        .ok_or(MarketError::RecipientMismatch)?;
    require_recipient_account(token_id, &destination, recipient)?;

    token::transfer(
        CpiContext::new_with_signer(
            accounts.nft_program.clone(),
            token::Transfer {
                from: accounts.source.clone(),
                to: destination,
                authority: market_authority.clone(),
            },
            &[authority_seeds],
        ),
        1,
    )
}
