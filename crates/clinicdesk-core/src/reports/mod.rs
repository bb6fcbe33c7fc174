//! Read-only rollups over clinic data.
//!
//! Each report loads the clinic-scoped collections it needs and aggregates
//! them in memory.

mod dashboard;
mod revenue;
mod summary;

pub use dashboard::*;
pub use revenue::*;
pub use summary::*;

use rust_decimal::Decimal;

use crate::models::{Invoice, InvoiceStatus};

/// Sum of balances on invoices that are neither paid nor cancelled
/// (drafts included).
pub fn outstanding_balance(invoices: &[Invoice]) -> Decimal {
    invoices
        .iter()
        .filter(|invoice| invoice.status.is_open())
        .map(Invoice::balance_due)
        .sum()
}

/// Sum of totals on paid invoices.
pub fn collected_revenue(invoices: &[Invoice]) -> Decimal {
    invoices
        .iter()
        .filter(|invoice| invoice.status == InvoiceStatus::Paid)
        .map(|invoice| invoice.total_amount)
        .sum()
}
