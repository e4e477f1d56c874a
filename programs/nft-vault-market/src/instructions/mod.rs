pub mod batch;

pub mod initialize;
pub mod vault_management;
pub mod deposit;
pub mod withdraw;
pub mod vault_rewards;
pub mod place_bid;
pub mod manage_bid;
pub mod accept_bid;
pub mod option_market;
pub mod rewards_management;
pub mod claim_rewards;

pub use initialize::*;
pub use vault_management::*;
pub use deposit::*;
pub use withdraw::*;
pub use vault_rewards::*;
pub use place_bid::*;
pub use manage_bid::*;
pub use accept_bid::*;
pub use option_market::*;
pub use rewards_management::*;
pub use claim_rewards::*;
