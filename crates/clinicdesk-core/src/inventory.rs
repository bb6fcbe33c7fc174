//! Stock ledger arithmetic and derived inventory states.

use chrono::{Days, NaiveDate};
use thiserror::Error;

use crate::models::StockOperation;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error("Stock quantity would overflow ({current} + {amount})")]
    Overflow { current: u32, amount: u32 },
}

/// New quantity after applying `operation`. Subtraction floors at zero.
pub fn apply_stock_operation(current: u32, operation: StockOperation, amount: u32) -> Result<u32, StockError> {
    match operation {
        StockOperation::Add => current
            .checked_add(amount)
            .ok_or(StockError::Overflow { current, amount }),
        StockOperation::Subtract => Ok(current.saturating_sub(amount)),
        StockOperation::Set => Ok(amount),
    }
}

/// At or below the reorder threshold.
pub fn is_low_stock(quantity: u32, min_quantity: u32) -> bool {
    quantity <= min_quantity
}

/// Expiry date set and no later than `today + days_ahead`. Already expired
/// items count as expiring.
pub fn is_expiring(expiry_date: Option<NaiveDate>, today: NaiveDate, days_ahead: u32) -> bool {
    let Some(expiry) = expiry_date else {
        return false;
    };
    let horizon = today
        .checked_add_days(Days::new(u64::from(days_ahead)))
        .unwrap_or(NaiveDate::MAX);
    expiry <= horizon
}
