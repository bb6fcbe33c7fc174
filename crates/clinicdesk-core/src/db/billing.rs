//! Invoice and payment database operations.
//!
//! Money-affecting writes run in one immediate transaction and update the
//! invoice only if its `version` is unchanged since it was read.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::{enum_from_sql, money_from_sql, money_to_sql, Database, DbError, DbResult};
use crate::billing::{apply_payment, compute_totals, reconcile_status, totals_from_subtotal};
use crate::context::TenantContext;
use crate::models::{
    Invoice, InvoiceDetail, InvoiceItem, InvoiceStatus, NewInvoice, NewPayment, Payment,
    PaymentMethod, PaymentReceipt,
};

const INVOICE_COLUMNS: &str = "id, clinic_id, patient_id, invoice_number, status, subtotal, \
     tax_amount, discount_amount, total_amount, paid_amount, due_date, notes, version, \
     created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, clinic_id, invoice_id, patient_id, amount, payment_method, \
     payment_date, reference_number, proof_url, is_verified, verified_by, verified_at, notes, \
     created_at";

impl Database {
    // =========================================================================
    // Invoices
    // =========================================================================

    /// Create a draft invoice with its line items and a fresh per-clinic
    /// number `{prefix}-{sequence:06}`.
    pub fn create_invoice(
        &self,
        ctx: &TenantContext,
        number_prefix: &str,
        new: &NewInvoice,
        now: DateTime<Utc>,
    ) -> DbResult<InvoiceDetail> {
        self.immediate(|| {
            self.ensure_patient(ctx, &new.patient_id)?;

            let sequence = self.next_invoice_sequence(ctx)?;
            let totals = compute_totals(&new.items, new.tax_amount, new.discount_amount);
            let invoice = Invoice {
                id: uuid::Uuid::new_v4().to_string(),
                clinic_id: ctx.clinic_id.clone(),
                patient_id: new.patient_id.clone(),
                invoice_number: format!("{number_prefix}-{sequence:06}"),
                status: InvoiceStatus::Draft,
                subtotal: totals.subtotal,
                tax_amount: totals.tax_amount,
                discount_amount: totals.discount_amount,
                total_amount: totals.total_amount,
                paid_amount: Decimal::ZERO,
                due_date: new.due_date,
                notes: new.notes.clone(),
                version: 0,
                created_at: now,
                updated_at: now,
            };

            self.conn.execute(
                &format!(
                    "INSERT INTO invoices ({INVOICE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
                ),
                params![
                    invoice.id,
                    invoice.clinic_id,
                    invoice.patient_id,
                    invoice.invoice_number,
                    invoice.status.as_str(),
                    money_to_sql(invoice.subtotal),
                    money_to_sql(invoice.tax_amount),
                    money_to_sql(invoice.discount_amount),
                    money_to_sql(invoice.total_amount),
                    money_to_sql(invoice.paid_amount),
                    invoice.due_date,
                    invoice.notes,
                    invoice.version,
                    invoice.created_at,
                    invoice.updated_at,
                ],
            )?;

            let mut items = Vec::with_capacity(new.items.len());
            for line in &new.items {
                let item = InvoiceItem {
                    id: uuid::Uuid::new_v4().to_string(),
                    invoice_id: invoice.id.clone(),
                    description: line.description.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    total_price: line.line_total(),
                    created_at: now,
                };
                self.conn.execute(
                    r#"
                    INSERT INTO invoice_items (id, invoice_id, description, quantity, unit_price, total_price, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    params![
                        item.id,
                        item.invoice_id,
                        item.description,
                        item.quantity,
                        money_to_sql(item.unit_price),
                        money_to_sql(item.total_price),
                        item.created_at,
                    ],
                )?;
                items.push(item);
            }

            info!(
                clinic_id = %ctx.clinic_id,
                invoice_id = %invoice.id,
                invoice_number = %invoice.invoice_number,
                total = %invoice.total_amount,
                "invoice created"
            );

            Ok(InvoiceDetail {
                invoice,
                items,
                payments: Vec::new(),
            })
        })
    }

    fn next_invoice_sequence(&self, ctx: &TenantContext) -> DbResult<i64> {
        self.conn.execute(
            "INSERT INTO invoice_sequences (clinic_id, next_value) VALUES (?1, 1)
             ON CONFLICT (clinic_id) DO NOTHING",
            [&ctx.clinic_id],
        )?;
        let value: i64 = self.conn.query_row(
            "SELECT next_value FROM invoice_sequences WHERE clinic_id = ?1",
            [&ctx.clinic_id],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "UPDATE invoice_sequences SET next_value = next_value + 1 WHERE clinic_id = ?1",
            [&ctx.clinic_id],
        )?;
        Ok(value)
    }

    pub fn get_invoice(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<Invoice>> {
        self.conn
            .query_row(
                &format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1 AND clinic_id = ?2"),
                params![id, ctx.clinic_id],
                read_invoice_row,
            )
            .optional()?
            .map(Invoice::try_from)
            .transpose()
    }

    fn require_invoice(&self, ctx: &TenantContext, id: &str) -> DbResult<Invoice> {
        self.get_invoice(ctx, id)?
            .ok_or_else(|| DbError::NotFound(format!("invoice {id}")))
    }

    /// All invoices of the clinic, newest first.
    pub fn list_invoices(&self, ctx: &TenantContext) -> DbResult<Vec<Invoice>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE clinic_id = ?1 ORDER BY created_at DESC, invoice_number DESC"
        ))?;
        let rows = stmt.query_map([&ctx.clinic_id], read_invoice_row)?;

        let mut invoices = Vec::new();
        for row in rows {
            invoices.push(row?.try_into()?);
        }
        Ok(invoices)
    }

    pub fn invoices_for_patient(&self, ctx: &TenantContext, patient_id: &str) -> DbResult<Vec<Invoice>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices
             WHERE clinic_id = ?1 AND patient_id = ?2
             ORDER BY created_at DESC, invoice_number DESC"
        ))?;
        let rows = stmt.query_map(params![ctx.clinic_id, patient_id], read_invoice_row)?;

        let mut invoices = Vec::new();
        for row in rows {
            invoices.push(row?.try_into()?);
        }
        Ok(invoices)
    }

    pub fn invoice_items(&self, ctx: &TenantContext, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT i.id, i.invoice_id, i.description, i.quantity, i.unit_price, i.total_price, i.created_at
            FROM invoice_items i
            JOIN invoices v ON v.id = i.invoice_id
            WHERE i.invoice_id = ?1 AND v.clinic_id = ?2
            ORDER BY i.rowid
            "#,
        )?;
        let rows = stmt.query_map(params![invoice_id, ctx.clinic_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, DateTime<Utc>>(6)?,
            ))
        })?;

        let mut items = Vec::new();
        for row in rows {
            let (id, invoice_id, description, quantity, unit_price, total_price, created_at) = row?;
            items.push(InvoiceItem {
                id,
                invoice_id,
                description,
                quantity,
                unit_price: money_from_sql("unit_price", &unit_price)?,
                total_price: money_from_sql("total_price", &total_price)?,
                created_at,
            });
        }
        Ok(items)
    }

    /// Invoice with its items and payments (newest payment first).
    pub fn invoice_detail(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<InvoiceDetail>> {
        let Some(invoice) = self.get_invoice(ctx, id)? else {
            return Ok(None);
        };
        let items = self.invoice_items(ctx, id)?;
        let payments = self.payments_for_invoice(ctx, id)?;
        Ok(Some(InvoiceDetail {
            invoice,
            items,
            payments,
        }))
    }

    /// Replace tax and discount, recompute the total and re-derive the
    /// payment status.
    pub fn update_invoice_adjustments(
        &self,
        ctx: &TenantContext,
        id: &str,
        tax_amount: Decimal,
        discount_amount: Decimal,
        now: DateTime<Utc>,
    ) -> DbResult<Invoice> {
        self.immediate(|| {
            let mut invoice = self.require_invoice(ctx, id)?;
            let totals = totals_from_subtotal(invoice.subtotal, tax_amount, discount_amount);
            let status = reconcile_status(invoice.status, totals.total_amount, invoice.paid_amount);

            let rows_affected = self.conn.execute(
                r#"
                UPDATE invoices SET
                    tax_amount = ?3, discount_amount = ?4, total_amount = ?5,
                    status = ?6, version = version + 1, updated_at = ?7
                WHERE id = ?1 AND clinic_id = ?2 AND version = ?8
                "#,
                params![
                    id,
                    ctx.clinic_id,
                    money_to_sql(totals.tax_amount),
                    money_to_sql(totals.discount_amount),
                    money_to_sql(totals.total_amount),
                    status.as_str(),
                    now,
                    invoice.version,
                ],
            )?;
            if rows_affected == 0 {
                warn!(clinic_id = %ctx.clinic_id, invoice_id = id, "invoice version conflict");
                return Err(DbError::Conflict(format!("invoice {id}")));
            }

            invoice.tax_amount = totals.tax_amount;
            invoice.discount_amount = totals.discount_amount;
            invoice.total_amount = totals.total_amount;
            invoice.status = status;
            invoice.version += 1;
            invoice.updated_at = now;
            Ok(invoice)
        })
    }

    /// Manual status change (send, cancel, overdue, back to draft).
    ///
    /// `paid`/`partial` are derived from payments and cannot be set here; an
    /// invoice with money received can only be cancelled or marked overdue.
    pub fn update_invoice_status(
        &self,
        ctx: &TenantContext,
        id: &str,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> DbResult<Invoice> {
        if status.is_payment_derived() {
            return Err(DbError::Constraint(format!(
                "invoice status {} is derived from payments",
                status.as_str()
            )));
        }

        self.immediate(|| {
            let mut invoice = self.require_invoice(ctx, id)?;
            if invoice.status == status {
                return Ok(invoice);
            }
            if invoice.paid_amount > Decimal::ZERO
                && !matches!(status, InvoiceStatus::Cancelled | InvoiceStatus::Overdue)
            {
                return Err(DbError::Constraint(format!(
                    "invoice {} has payments and cannot become {}",
                    invoice.invoice_number,
                    status.as_str()
                )));
            }

            let rows_affected = self.conn.execute(
                r#"
                UPDATE invoices SET status = ?3, version = version + 1, updated_at = ?4
                WHERE id = ?1 AND clinic_id = ?2 AND version = ?5
                "#,
                params![id, ctx.clinic_id, status.as_str(), now, invoice.version],
            )?;
            if rows_affected == 0 {
                return Err(DbError::Conflict(format!("invoice {id}")));
            }

            invoice.status = status;
            invoice.version += 1;
            invoice.updated_at = now;
            Ok(invoice)
        })
    }

    /// Persist `overdue` on sent/partial invoices past their due date with a
    /// balance left. Returns the IDs that changed.
    pub fn mark_overdue(&self, ctx: &TenantContext, today: NaiveDate, now: DateTime<Utc>) -> DbResult<Vec<String>> {
        self.immediate(|| {
            let candidates: Vec<Invoice> = self
                .list_invoices(ctx)?
                .into_iter()
                .filter(|invoice| invoice.is_past_due(today))
                .collect();

            let mut changed = Vec::with_capacity(candidates.len());
            for invoice in candidates {
                let rows_affected = self.conn.execute(
                    r#"
                    UPDATE invoices SET status = 'overdue', version = version + 1, updated_at = ?3
                    WHERE id = ?1 AND clinic_id = ?2 AND version = ?4
                    "#,
                    params![invoice.id, ctx.clinic_id, now, invoice.version],
                )?;
                if rows_affected == 0 {
                    return Err(DbError::Conflict(format!("invoice {}", invoice.id)));
                }
                changed.push(invoice.id);
            }
            Ok(changed)
        })
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Record a payment and apply it to its invoice atomically.
    ///
    /// Rejected payments (non-positive, exceeding the balance, cancelled
    /// invoice) surface as [`DbError::Constraint`] and leave no trace.
    pub fn record_payment(
        &self,
        ctx: &TenantContext,
        new: &NewPayment,
        allow_overpayment: bool,
        now: DateTime<Utc>,
    ) -> DbResult<PaymentReceipt> {
        self.immediate(|| {
            let mut invoice = self.require_invoice(ctx, &new.invoice_id)?;
            let applied = apply_payment(&invoice, new.amount, allow_overpayment).map_err(|rejection| {
                warn!(
                    clinic_id = %ctx.clinic_id,
                    invoice_id = %invoice.id,
                    amount = %new.amount,
                    %rejection,
                    "payment rejected"
                );
                DbError::Constraint(rejection.to_string())
            })?;

            let payment = Payment {
                id: uuid::Uuid::new_v4().to_string(),
                clinic_id: ctx.clinic_id.clone(),
                invoice_id: invoice.id.clone(),
                patient_id: invoice.patient_id.clone(),
                amount: applied.amount,
                payment_method: new.payment_method,
                payment_date: new.payment_date.unwrap_or(now),
                reference_number: new.reference_number.clone(),
                proof_url: new.proof_url.clone(),
                is_verified: false,
                verified_by: None,
                verified_at: None,
                notes: new.notes.clone(),
                created_at: now,
            };
            self.insert_payment_row(&payment)?;

            self.write_payment_state(ctx, &invoice, applied.new_paid_amount, applied.new_status, now)?;
            invoice.paid_amount = applied.new_paid_amount;
            invoice.status = applied.new_status;
            invoice.version += 1;
            invoice.updated_at = now;

            info!(
                clinic_id = %ctx.clinic_id,
                invoice_id = %invoice.id,
                payment_id = %payment.id,
                amount = %payment.amount,
                status = invoice.status.as_str(),
                "payment recorded"
            );
            Ok(PaymentReceipt { payment, invoice })
        })
    }

    fn insert_payment_row(&self, payment: &Payment) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO payments ({PAYMENT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                payment.id,
                payment.clinic_id,
                payment.invoice_id,
                payment.patient_id,
                money_to_sql(payment.amount),
                payment.payment_method.as_str(),
                payment.payment_date,
                payment.reference_number,
                payment.proof_url,
                payment.is_verified,
                payment.verified_by,
                payment.verified_at,
                payment.notes,
                payment.created_at,
            ],
        )?;
        Ok(())
    }

    /// Version-guarded write of the paid amount and derived status.
    fn write_payment_state(
        &self,
        ctx: &TenantContext,
        read: &Invoice,
        paid_amount: Decimal,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE invoices SET
                paid_amount = ?3, status = ?4, version = version + 1, updated_at = ?5
            WHERE id = ?1 AND clinic_id = ?2 AND version = ?6
            "#,
            params![
                read.id,
                ctx.clinic_id,
                money_to_sql(paid_amount),
                status.as_str(),
                now,
                read.version,
            ],
        )?;
        if rows_affected == 0 {
            warn!(clinic_id = %ctx.clinic_id, invoice_id = %read.id, version = read.version, "invoice version conflict");
            return Err(DbError::Conflict(format!("invoice {}", read.id)));
        }
        Ok(())
    }

    /// Mark a payment verified. The first verification wins; later calls
    /// return the payment unchanged. Invoice totals are never touched.
    pub fn verify_payment(
        &self,
        ctx: &TenantContext,
        payment_id: &str,
        verified_by: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Payment> {
        self.conn.execute(
            r#"
            UPDATE payments SET is_verified = 1, verified_by = ?3, verified_at = ?4
            WHERE id = ?1 AND clinic_id = ?2 AND is_verified = 0
            "#,
            params![payment_id, ctx.clinic_id, verified_by, now],
        )?;
        self.get_payment(ctx, payment_id)?
            .ok_or_else(|| DbError::NotFound(format!("payment {payment_id}")))
    }

    pub fn get_payment(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<Payment>> {
        self.conn
            .query_row(
                &format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1 AND clinic_id = ?2"),
                params![id, ctx.clinic_id],
                read_payment_row,
            )
            .optional()?
            .map(Payment::try_from)
            .transpose()
    }

    /// All payments of the clinic, newest first.
    pub fn list_payments(&self, ctx: &TenantContext) -> DbResult<Vec<Payment>> {
        self.query_payments(
            &format!(
                "SELECT {PAYMENT_COLUMNS} FROM payments WHERE clinic_id = ?1
                 ORDER BY payment_date DESC, created_at DESC"
            ),
            params![ctx.clinic_id],
        )
    }

    pub fn payments_for_invoice(&self, ctx: &TenantContext, invoice_id: &str) -> DbResult<Vec<Payment>> {
        self.query_payments(
            &format!(
                "SELECT {PAYMENT_COLUMNS} FROM payments WHERE clinic_id = ?1 AND invoice_id = ?2
                 ORDER BY payment_date DESC, created_at DESC"
            ),
            params![ctx.clinic_id, invoice_id],
        )
    }

    /// Unverified payments, oldest first (review queue order).
    pub fn pending_payments(&self, ctx: &TenantContext) -> DbResult<Vec<Payment>> {
        self.query_payments(
            &format!(
                "SELECT {PAYMENT_COLUMNS} FROM payments WHERE clinic_id = ?1 AND is_verified = 0
                 ORDER BY payment_date, created_at"
            ),
            params![ctx.clinic_id],
        )
    }

    fn query_payments(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> DbResult<Vec<Payment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, read_payment_row)?;
        rows.map(|row| Payment::try_from(row?)).collect()
    }
}

/// Internal row type for database mapping.
struct InvoiceRow {
    id: String,
    clinic_id: String,
    patient_id: String,
    invoice_number: String,
    status: String,
    subtotal: String,
    tax_amount: String,
    discount_amount: String,
    total_amount: String,
    paid_amount: String,
    due_date: Option<NaiveDate>,
    notes: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn read_invoice_row(row: &Row<'_>) -> rusqlite::Result<InvoiceRow> {
    Ok(InvoiceRow {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        patient_id: row.get(2)?,
        invoice_number: row.get(3)?,
        status: row.get(4)?,
        subtotal: row.get(5)?,
        tax_amount: row.get(6)?,
        discount_amount: row.get(7)?,
        total_amount: row.get(8)?,
        paid_amount: row.get(9)?,
        due_date: row.get(10)?,
        notes: row.get(11)?,
        version: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DbError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Invoice {
            id: row.id,
            clinic_id: row.clinic_id,
            patient_id: row.patient_id,
            invoice_number: row.invoice_number,
            status: enum_from_sql("status", &row.status, InvoiceStatus::parse)?,
            subtotal: money_from_sql("subtotal", &row.subtotal)?,
            tax_amount: money_from_sql("tax_amount", &row.tax_amount)?,
            discount_amount: money_from_sql("discount_amount", &row.discount_amount)?,
            total_amount: money_from_sql("total_amount", &row.total_amount)?,
            paid_amount: money_from_sql("paid_amount", &row.paid_amount)?,
            due_date: row.due_date,
            notes: row.notes,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

struct PaymentRow {
    id: String,
    clinic_id: String,
    invoice_id: String,
    patient_id: String,
    amount: String,
    payment_method: String,
    payment_date: DateTime<Utc>,
    reference_number: Option<String>,
    proof_url: Option<String>,
    is_verified: bool,
    verified_by: Option<String>,
    verified_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

fn read_payment_row(row: &Row<'_>) -> rusqlite::Result<PaymentRow> {
    Ok(PaymentRow {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        invoice_id: row.get(2)?,
        patient_id: row.get(3)?,
        amount: row.get(4)?,
        payment_method: row.get(5)?,
        payment_date: row.get(6)?,
        reference_number: row.get(7)?,
        proof_url: row.get(8)?,
        is_verified: row.get(9)?,
        verified_by: row.get(10)?,
        verified_at: row.get(11)?,
        notes: row.get(12)?,
        created_at: row.get(13)?,
    })
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DbError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            clinic_id: row.clinic_id,
            invoice_id: row.invoice_id,
            patient_id: row.patient_id,
            amount: money_from_sql("amount", &row.amount)?,
            payment_method: enum_from_sql("payment_method", &row.payment_method, PaymentMethod::parse)?,
            payment_date: row.payment_date,
            reference_number: row.reference_number,
            proof_url: row.proof_url,
            is_verified: row.is_verified,
            verified_by: row.verified_by,
            verified_at: row.verified_at,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}
