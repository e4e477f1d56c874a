use anchor_lang::error::ERROR_CODE_OFFSET;
use anchor_lang::prelude::*;

use crate::errors::MarketError;

pub fn assert_market_error<T>(result: Result<T>, expected: MarketError) {
    match result {
        Err(Error::AnchorError(err)) => assert_eq!(
            err.error_code_number,
            ERROR_CODE_OFFSET + expected as u32,
            "expected {:?}, got {}",
            expected,
            err.error_name
        ),
        Err(other) => panic!("expected {:?}, got {:?}", expected, other),
        Ok(_) => panic!("expected {:?}, got Ok", expected),
    }
}
