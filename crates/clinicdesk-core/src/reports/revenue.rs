//! Revenue grouping by day and by payment method.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Payment, PaymentMethod};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub payment_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodRevenue {
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub payment_count: u32,
}

/// First date of a trailing window of `days` days ending on `today`.
pub fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
        .unwrap_or(NaiveDate::MIN)
}

fn in_window(payment: &Payment, from: NaiveDate, to: NaiveDate) -> bool {
    let day = payment.payment_date.date_naive();
    day >= from && day <= to
}

/// Sum of payments received on `date`.
pub fn revenue_on(payments: &[Payment], date: NaiveDate) -> Decimal {
    payments
        .iter()
        .filter(|p| p.payment_date.date_naive() == date)
        .map(|p| p.amount)
        .sum()
}

/// One entry per day of the window, oldest first, days without payments
/// included as zero.
pub fn revenue_by_day(payments: &[Payment], today: NaiveDate, days: u32) -> Vec<DailyRevenue> {
    let from = window_start(today, days);
    let mut by_day: BTreeMap<NaiveDate, (Decimal, u32)> = from
        .iter_days()
        .take_while(|d| *d <= today)
        .map(|d| (d, (Decimal::ZERO, 0)))
        .collect();

    for payment in payments.iter().filter(|p| in_window(p, from, today)) {
        if let Some(entry) = by_day.get_mut(&payment.payment_date.date_naive()) {
            entry.0 += payment.amount;
            entry.1 += 1;
        }
    }

    by_day
        .into_iter()
        .map(|(date, (amount, payment_count))| DailyRevenue {
            date,
            amount,
            payment_count,
        })
        .collect()
}

/// Methods used in the window, largest amount first.
pub fn revenue_by_method(payments: &[Payment], today: NaiveDate, days: u32) -> Vec<MethodRevenue> {
    let from = window_start(today, days);
    let mut by_method: BTreeMap<PaymentMethod, (Decimal, u32)> = BTreeMap::new();
    for payment in payments.iter().filter(|p| in_window(p, from, today)) {
        let entry = by_method.entry(payment.payment_method).or_insert((Decimal::ZERO, 0));
        entry.0 += payment.amount;
        entry.1 += 1;
    }

    let mut rows: Vec<MethodRevenue> = by_method
        .into_iter()
        .map(|(method, (amount, payment_count))| MethodRevenue {
            method,
            amount,
            payment_count,
        })
        .collect();
    rows.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.method.cmp(&b.method)));
    rows
}

/// Revenue over a trailing window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevenueReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total: Decimal,
    pub by_day: Vec<DailyRevenue>,
    pub by_method: Vec<MethodRevenue>,
}

impl RevenueReport {
    pub fn build(payments: &[Payment], today: NaiveDate, days: u32) -> Self {
        let by_day = revenue_by_day(payments, today, days);
        Self {
            from: window_start(today, days),
            to: today,
            total: by_day.iter().map(|d| d.amount).sum(),
            by_day,
            by_method: revenue_by_method(payments, today, days),
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export daily revenue to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str("date,payment_count,amount\n");

        for day in &self.by_day {
            csv.push_str(&format!(
                "{},{},{}\n",
                day.date.format("%Y-%m-%d"),
                day.payment_count,
                escape_csv(&day.amount.to_string()),
            ));
        }

        csv
    }

    /// Export the method split to CSV format.
    pub fn methods_to_csv(&self) -> String {
        let mut csv = String::from("payment_method,payment_count,amount\n");
        for row in &self.by_method {
            csv.push_str(&format!(
                "{},{},{}\n",
                escape_csv(row.method.as_str()),
                row.payment_count,
                row.amount
            ));
        }
        csv
    }
}

/// Escape a field for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
