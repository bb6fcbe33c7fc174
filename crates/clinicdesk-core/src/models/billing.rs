//! Invoice and payment models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Invoice status.
///
/// `Paid` and `Partial` are derived from recorded payments; the others are set
/// explicitly (or by the overdue sweep).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Partial,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Paid => "paid",
            Self::Partial => "partial",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "sent" => Some(Self::Sent),
            "paid" => Some(Self::Paid),
            "partial" => Some(Self::Partial),
            "overdue" => Some(Self::Overdue),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether the invoice still counts toward outstanding receivables.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Paid | Self::Cancelled)
    }

    /// Statuses that only payments may produce.
    pub fn is_payment_derived(self) -> bool {
        matches!(self, Self::Paid | Self::Partial)
    }
}

/// How a payment was made.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Esewa,
    Khalti,
    Insurance,
    Other,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::BankTransfer => "bank_transfer",
            Self::Esewa => "esewa",
            Self::Khalti => "khalti",
            Self::Insurance => "insurance",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(Self::Cash),
            "card" => Some(Self::Card),
            "bank_transfer" => Some(Self::BankTransfer),
            "esewa" => Some(Self::Esewa),
            "khalti" => Some(Self::Khalti),
            "insurance" => Some(Self::Insurance),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// An invoice header. Line items and payments are stored separately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: String,
    pub clinic_id: String,
    pub patient_id: String,
    /// Unique per clinic
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    /// Always `subtotal + tax_amount - discount_amount`
    pub total_amount: Decimal,
    /// Running sum of recorded payments
    pub paid_amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Optimistic concurrency counter, bumped on every money-affecting write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Outstanding amount, never negative and never stored.
    pub fn balance_due(&self) -> Decimal {
        crate::billing::balance_due(self.total_amount, self.paid_amount)
    }

    /// Whether the due date has passed while money is still owed.
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        matches!(self.status, InvoiceStatus::Sent | InvoiceStatus::Partial)
            && self.due_date.is_some_and(|due| due < today)
            && self.balance_due() > Decimal::ZERO
    }

    /// Status as it should be shown on `today`, without waiting for the
    /// overdue sweep to persist it.
    pub fn effective_status(&self, today: NaiveDate) -> InvoiceStatus {
        if self.is_past_due(today) {
            InvoiceStatus::Overdue
        } else {
            self.status
        }
    }
}

/// A billed line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// `quantity * unit_price`
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Input line for a new invoice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewInvoiceItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl NewInvoiceItem {
    pub fn new(description: impl Into<String>, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> Decimal {
        crate::billing::line_total(self.quantity, self.unit_price)
    }
}

/// Input for a new invoice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewInvoice {
    pub patient_id: String,
    pub items: Vec<NewInvoiceItem>,
    #[serde(default)]
    pub tax_amount: Decimal,
    #[serde(default)]
    pub discount_amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl NewInvoice {
    /// Invoice with no tax, discount or due date.
    pub fn with_items(patient_id: impl Into<String>, items: Vec<NewInvoiceItem>) -> Self {
        Self {
            patient_id: patient_id.into(),
            items,
            tax_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            due_date: None,
            notes: None,
        }
    }
}

/// A recorded payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: String,
    pub clinic_id: String,
    pub invoice_id: String,
    pub patient_id: String,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_date: DateTime<Utc>,
    pub reference_number: Option<String>,
    pub proof_url: Option<String>,
    pub is_verified: bool,
    /// Profile/user ID of the verifier
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPayment {
    pub invoice_id: String,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    /// Defaults to the clock's current time
    pub payment_date: Option<DateTime<Utc>>,
    pub reference_number: Option<String>,
    pub proof_url: Option<String>,
    pub notes: Option<String>,
}

impl NewPayment {
    pub fn new(invoice_id: impl Into<String>, amount: Decimal, payment_method: PaymentMethod) -> Self {
        Self {
            invoice_id: invoice_id.into(),
            amount,
            payment_method,
            payment_date: None,
            reference_number: None,
            proof_url: None,
            notes: None,
        }
    }
}

/// Invoice with its lines and payments (payments newest first).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<Payment>,
}

/// Result of applying a payment to an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub invoice: Invoice,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn invoice(total: Decimal, paid: Decimal, status: InvoiceStatus) -> Invoice {
        let now: DateTime<Utc> = "2024-06-01T00:00:00Z".parse().unwrap();
        Invoice {
            id: "inv-1".into(),
            clinic_id: "clinic-1".into(),
            patient_id: "p1".into(),
            invoice_number: "INV-000001".into(),
            status,
            subtotal: total,
            tax_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            total_amount: total,
            paid_amount: paid,
            due_date: NaiveDate::from_ymd_opt(2024, 6, 10),
            notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_balance_due_never_negative() {
        assert_eq!(invoice(dec!(100), dec!(40), InvoiceStatus::Partial).balance_due(), dec!(60));
        assert_eq!(invoice(dec!(100), dec!(120), InvoiceStatus::Paid).balance_due(), dec!(0));
    }

    #[test]
    fn test_effective_status_overdue() {
        let before = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let after = NaiveDate::from_ymd_opt(2024, 6, 11).unwrap();

        let sent = invoice(dec!(100), dec!(0), InvoiceStatus::Sent);
        assert_eq!(sent.effective_status(before), InvoiceStatus::Sent);
        assert_eq!(sent.effective_status(after), InvoiceStatus::Overdue);

        // Drafts were never sent, so they cannot be overdue
        let draft = invoice(dec!(100), dec!(0), InvoiceStatus::Draft);
        assert_eq!(draft.effective_status(after), InvoiceStatus::Draft);

        let paid = invoice(dec!(100), dec!(100), InvoiceStatus::Paid);
        assert_eq!(paid.effective_status(after), InvoiceStatus::Paid);
    }

    #[test]
    fn test_status_classification() {
        assert!(InvoiceStatus::Draft.is_open());
        assert!(InvoiceStatus::Overdue.is_open());
        assert!(!InvoiceStatus::Paid.is_open());
        assert!(!InvoiceStatus::Cancelled.is_open());
        assert!(InvoiceStatus::Partial.is_payment_derived());
        assert!(!InvoiceStatus::Sent.is_payment_derived());
    }

    #[test]
    fn test_payment_method_strings() {
        assert_eq!(PaymentMethod::BankTransfer.as_str(), "bank_transfer");
        assert_eq!(PaymentMethod::parse("khalti"), Some(PaymentMethod::Khalti));
        assert_eq!(PaymentMethod::parse("cheque"), None);
    }
}
