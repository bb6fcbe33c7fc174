//! Invoice/payment reconciliation arithmetic.
//!
//! Pure functions only; the store applies them inside a transaction
//! (see `db::billing`). Amounts are rounded to cents at every boundary.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Invoice, InvoiceStatus, NewInvoiceItem};

/// Why a payment cannot be applied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaymentRejection {
    #[error("Payment amount must be greater than zero (got {0})")]
    NonPositiveAmount(Decimal),

    #[error("Payment amount {amount} exceeds balance due {balance}")]
    ExceedsBalance { amount: Decimal, balance: Decimal },

    #[error("Invoice {0} is cancelled")]
    InvoiceCancelled(String),
}

/// Computed invoice money fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
}

/// New money state for an invoice after a payment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentApplication {
    pub amount: Decimal,
    pub new_paid_amount: Decimal,
    pub new_status: InvoiceStatus,
}

/// Round to cents, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn line_total(quantity: u32, unit_price: Decimal) -> Decimal {
    round_money(Decimal::from(quantity) * unit_price)
}

/// `subtotal = sum(line totals)`, `total = subtotal + tax - discount`.
pub fn compute_totals(items: &[NewInvoiceItem], tax_amount: Decimal, discount_amount: Decimal) -> InvoiceTotals {
    let subtotal = items.iter().map(NewInvoiceItem::line_total).sum::<Decimal>();
    totals_from_subtotal(subtotal, tax_amount, discount_amount)
}

pub fn totals_from_subtotal(subtotal: Decimal, tax_amount: Decimal, discount_amount: Decimal) -> InvoiceTotals {
    let subtotal = round_money(subtotal);
    let tax_amount = round_money(tax_amount);
    let discount_amount = round_money(discount_amount);
    InvoiceTotals {
        subtotal,
        tax_amount,
        discount_amount,
        total_amount: subtotal + tax_amount - discount_amount,
    }
}

/// `max(0, total - paid)`.
pub fn balance_due(total_amount: Decimal, paid_amount: Decimal) -> Decimal {
    (total_amount - paid_amount).max(Decimal::ZERO)
}

/// Status implied by the paid amount, if any money has been received.
pub fn payment_status(total_amount: Decimal, paid_amount: Decimal) -> Option<InvoiceStatus> {
    if paid_amount >= total_amount && paid_amount > Decimal::ZERO {
        Some(InvoiceStatus::Paid)
    } else if paid_amount > Decimal::ZERO {
        Some(InvoiceStatus::Partial)
    } else {
        None
    }
}

/// Status after the total changed (tax or discount edit).
///
/// Cancelled invoices stay cancelled; invoices with money received get the
/// payment-derived status; otherwise a previously paid/partial status falls
/// back to `Sent`.
pub fn reconcile_status(current: InvoiceStatus, total_amount: Decimal, paid_amount: Decimal) -> InvoiceStatus {
    if current == InvoiceStatus::Cancelled {
        return current;
    }
    match payment_status(total_amount, paid_amount) {
        Some(status) => status,
        None if current.is_payment_derived() => InvoiceStatus::Sent,
        None => current,
    }
}

/// Compute the invoice state after receiving `amount`.
pub fn apply_payment(
    invoice: &Invoice,
    amount: Decimal,
    allow_overpayment: bool,
) -> Result<PaymentApplication, PaymentRejection> {
    let amount = round_money(amount);
    if amount <= Decimal::ZERO {
        return Err(PaymentRejection::NonPositiveAmount(amount));
    }
    if invoice.status == InvoiceStatus::Cancelled {
        return Err(PaymentRejection::InvoiceCancelled(invoice.invoice_number.clone()));
    }

    let balance = invoice.balance_due();
    if !allow_overpayment && amount > balance {
        return Err(PaymentRejection::ExceedsBalance { amount, balance });
    }

    let new_paid_amount = invoice.paid_amount + amount;
    let new_status = if new_paid_amount >= invoice.total_amount {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::Partial
    };

    Ok(PaymentApplication {
        amount,
        new_paid_amount,
        new_status,
    })
}
