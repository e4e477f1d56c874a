pub mod marketplace;
pub mod vault;
pub mod bid;
pub mod option_bid;
pub mod epoch;

pub use marketplace::*;
pub use vault::*;
pub use bid::*;
pub use option_bid::*;
pub use epoch::*;
