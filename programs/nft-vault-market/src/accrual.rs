use anchor_lang::prelude::*;

use crate::{
    constants::ACTIVITY_SEED,
    errors::MarketError,
    state::{Epoch, RewardsConfig, UserEpochActivity},
    stored::Stored,
};

pub fn activity_address(epoch_index: u64, user: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[ACTIVITY_SEED, epoch_index.to_le_bytes().as_ref(), user.as_ref()],
        &crate::ID,
    )
    .0
}

/// Accounts a completed sale accrues into while an epoch is open.
pub struct SaleLedgers<'a, 'info> {
    pub epoch: Option<&'a AccountInfo<'info>>,
    pub buyer_activity: Option<&'a AccountInfo<'info>>,
    pub seller_activity: Option<&'a AccountInfo<'info>>,
}

/// Records `amount` toward both parties of a sale. While an epoch is open the current
/// epoch and both parties' ledger addresses must be supplied, so neither side can skip
/// the other's accrual. A ledger the party never opened is left alone.
pub fn record_completed_sale(
    rewards: &RewardsConfig,
    ledgers: SaleLedgers,
    buyer: &Pubkey,
    seller: &Pubkey,
    amount: u64,
    now: i64,
) -> Result<()> {
    if !rewards.epoch_open(now) {
        return Ok(());
    }
    let index = rewards.epoch_count - 1;

    let epoch_info = ledgers.epoch.ok_or(MarketError::ActivityAccountsMissing)?;
    let mut epoch = Stored::<Epoch>::load(epoch_info, MarketError::EpochNotStarted)?;
    require!(epoch.index == index, MarketError::EpochNotOpen);

    let buyer_info = party_ledger(ledgers.buyer_activity, index, buyer)?;
    let seller_info = party_ledger(ledgers.seller_activity, index, seller)?;

    // loaded one at a time so a buyer who is also the seller keeps both entries
    if let Some(mut activity) = Stored::<UserEpochActivity>::load_if_created(Some(buyer_info), MarketError::ActivityMismatch)? {
        epoch.record_purchase(&mut activity, buyer, amount, now)?;
        activity.persist()?;
    }
    if let Some(mut activity) = Stored::<UserEpochActivity>::load_if_created(Some(seller_info), MarketError::ActivityMismatch)? {
        epoch.record_sale(&mut activity, seller, amount, now)?;
        activity.persist()?;
    }

    epoch.persist()
}

fn party_ledger<'a, 'info>(
    info: Option<&'a AccountInfo<'info>>,
    index: u64,
    user: &Pubkey,
) -> Result<&'a AccountInfo<'info>> {
    let info = info.ok_or(MarketError::ActivityAccountsMissing)?;
    require_keys_eq!(info.key(), activity_address(index, user), MarketError::ActivityMismatch);
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_market_error;

    const NOW: i64 = 50;

    fn bytes<T: AccountSerialize>(value: &T, len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        let mut writer: &mut [u8] = &mut data[..];
        value.try_serialize(&mut writer).unwrap();
        data
    }

    fn read<T: AccountDeserialize>(data: &[u8]) -> T {
        T::try_deserialize(&mut &data[..]).unwrap()
    }

    fn open_rewards() -> RewardsConfig {
        RewardsConfig {
            epoch_count: 1,
            current_epoch_end: 100,
            ..Default::default()
        }
    }

    fn open_epoch() -> Epoch {
        Epoch {
            index: 0,
            end_time: 100,
            ..Default::default()
        }
    }

    fn ledger(user: &Pubkey) -> UserEpochActivity {
        UserEpochActivity {
            epoch: 0,
            user: *user,
            ..Default::default()
        }
    }

    #[test]
    fn closed_epoch_ignores_missing_accounts() {
        let rewards = RewardsConfig::default();
        let ledgers = SaleLedgers {
            epoch: None,
            buyer_activity: None,
            seller_activity: None,
        };
        record_completed_sale(&rewards, ledgers, &Pubkey::new_unique(), &Pubkey::new_unique(), 10, NOW).unwrap();
    }

    #[test]
    fn open_epoch_requires_both_ledgers() {
        let (buyer, seller) = (Pubkey::new_unique(), Pubkey::new_unique());
        let epoch_key = Pubkey::new_unique();
        let buyer_key = activity_address(0, &buyer);

        let mut epoch_lamports = 1;
        let mut epoch_data = bytes(&open_epoch(), Epoch::LEN);
        let epoch_info = AccountInfo::new(&epoch_key, false, true, &mut epoch_lamports, &mut epoch_data, &crate::ID, false, 0);
        let mut buyer_lamports = 1;
        let mut buyer_data = bytes(&ledger(&buyer), UserEpochActivity::LEN);
        let buyer_info = AccountInfo::new(&buyer_key, false, true, &mut buyer_lamports, &mut buyer_data, &crate::ID, false, 0);

        assert_market_error(
            record_completed_sale(
                &open_rewards(),
                SaleLedgers {
                    epoch: None,
                    buyer_activity: Some(&buyer_info),
                    seller_activity: None,
                },
                &buyer,
                &seller,
                10,
                NOW,
            ),
            MarketError::ActivityAccountsMissing,
        );
        assert_market_error(
            record_completed_sale(
                &open_rewards(),
                SaleLedgers {
                    epoch: Some(&epoch_info),
                    buyer_activity: Some(&buyer_info),
                    seller_activity: None,
                },
                &buyer,
                &seller,
                10,
                NOW,
            ),
            MarketError::ActivityAccountsMissing,
        );
    }

    #[test]
    fn ledger_at_foreign_address_rejected() {
        let (buyer, seller) = (Pubkey::new_unique(), Pubkey::new_unique());
        let epoch_key = Pubkey::new_unique();
        let buyer_key = activity_address(0, &buyer);
        let wrong_key = Pubkey::new_unique();

        let mut epoch_lamports = 1;
        let mut epoch_data = bytes(&open_epoch(), Epoch::LEN);
        let epoch_info = AccountInfo::new(&epoch_key, false, true, &mut epoch_lamports, &mut epoch_data, &crate::ID, false, 0);
        let (mut a, mut b) = (0, 0);
        let (mut buyer_data, mut wrong_data) = (vec![], vec![]);
        let system = anchor_lang::system_program::ID;
        let buyer_info = AccountInfo::new(&buyer_key, false, true, &mut a, &mut buyer_data, &system, false, 0);
        let wrong_info = AccountInfo::new(&wrong_key, false, true, &mut b, &mut wrong_data, &system, false, 0);

        assert_market_error(
            record_completed_sale(
                &open_rewards(),
                SaleLedgers {
                    epoch: Some(&epoch_info),
                    buyer_activity: Some(&buyer_info),
                    seller_activity: Some(&wrong_info),
                },
                &buyer,
                &seller,
                10,
                NOW,
            ),
            MarketError::ActivityMismatch,
        );
    }

    #[test]
    fn opened_ledger_accrues_and_unopened_is_skipped() {
        let (buyer, seller) = (Pubkey::new_unique(), Pubkey::new_unique());
        let epoch_key = Pubkey::new_unique();
        let buyer_key = activity_address(0, &buyer);
        let seller_key = activity_address(0, &seller);
        let system = anchor_lang::system_program::ID;

        let mut epoch_lamports = 1;
        let mut epoch_data = bytes(&open_epoch(), Epoch::LEN);
        let mut seller_lamports = 1;
        let mut seller_data = bytes(&ledger(&seller), UserEpochActivity::LEN);
        let mut buyer_lamports = 0;
        let mut buyer_data = vec![];
        {
            let epoch_info = AccountInfo::new(&epoch_key, false, true, &mut epoch_lamports, &mut epoch_data, &crate::ID, false, 0);
            let seller_info =
                AccountInfo::new(&seller_key, false, true, &mut seller_lamports, &mut seller_data, &crate::ID, false, 0);
            let buyer_info = AccountInfo::new(&buyer_key, false, true, &mut buyer_lamports, &mut buyer_data, &system, false, 0);

            record_completed_sale(
                &open_rewards(),
                SaleLedgers {
                    epoch: Some(&epoch_info),
                    buyer_activity: Some(&buyer_info),
                    seller_activity: Some(&seller_info),
                },
                &buyer,
                &seller,
                10,
                NOW,
            )
            .unwrap();
        }

        let epoch: Epoch = read(&epoch_data);
        let sold: UserEpochActivity = read(&seller_data);
        assert_eq!(sold.seller_sales, 10);
        assert_eq!(epoch.total_seller_sales, 10);
        assert_eq!(epoch.total_buyer_sales, 0);
    }

    #[test]
    fn self_sale_keeps_both_sides() {
        let user = Pubkey::new_unique();
        let epoch_key = Pubkey::new_unique();
        let user_key = activity_address(0, &user);

        let mut epoch_lamports = 1;
        let mut epoch_data = bytes(&open_epoch(), Epoch::LEN);
        let mut lamports = 1;
        let mut data = bytes(&ledger(&user), UserEpochActivity::LEN);
        {
            let epoch_info = AccountInfo::new(&epoch_key, false, true, &mut epoch_lamports, &mut epoch_data, &crate::ID, false, 0);
            let info = AccountInfo::new(&user_key, false, true, &mut lamports, &mut data, &crate::ID, false, 0);

            record_completed_sale(
                &open_rewards(),
                SaleLedgers {
                    epoch: Some(&epoch_info),
                    buyer_activity: Some(&info),
                    seller_activity: Some(&info),
                },
                &user,
                &user,
                7,
                NOW,
            )
            .unwrap();
        }

        let activity: UserEpochActivity = read(&data);
        assert_eq!((activity.buyer_sales, activity.seller_sales), (7, 7));
    }
}
