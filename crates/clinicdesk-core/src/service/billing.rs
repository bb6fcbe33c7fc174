//! Invoicing and payment recording.

use rust_decimal::Decimal;
use tracing::info;

use super::{ClinicService, ServiceResult};
use crate::cache::QueryScope;
use crate::context::TenantContext;
use crate::db::DbError;
use crate::models::{Invoice, InvoiceDetail, InvoiceStatus, NewInvoice, NewPayment, Payment, PaymentReceipt};
use crate::validation::{validate_adjustments, validate_new_invoice, validate_new_payment};

impl ClinicService {
    pub fn create_invoice(&self, ctx: &TenantContext, new: &NewInvoice) -> ServiceResult<InvoiceDetail> {
        validate_new_invoice(new)?;
        let detail = self
            .db
            .create_invoice(ctx, &self.config.invoice_number_prefix, new, self.clock.now())?;
        self.invalidate(ctx, &[QueryScope::Dashboard]);
        Ok(detail)
    }

    pub fn get_invoice(&self, ctx: &TenantContext, id: &str) -> ServiceResult<Option<Invoice>> {
        Ok(self.db.get_invoice(ctx, id)?)
    }

    pub fn invoice_detail(&self, ctx: &TenantContext, id: &str) -> ServiceResult<Option<InvoiceDetail>> {
        Ok(self.db.invoice_detail(ctx, id)?)
    }

    /// Newest first.
    pub fn list_invoices(&self, ctx: &TenantContext) -> ServiceResult<Vec<Invoice>> {
        Ok(self.db.list_invoices(ctx)?)
    }

    pub fn invoices_for_patient(&self, ctx: &TenantContext, patient_id: &str) -> ServiceResult<Vec<Invoice>> {
        Ok(self.db.invoices_for_patient(ctx, patient_id)?)
    }

    pub fn update_invoice_adjustments(
        &self,
        ctx: &TenantContext,
        id: &str,
        tax_amount: Decimal,
        discount_amount: Decimal,
    ) -> ServiceResult<Invoice> {
        let current = self
            .db
            .get_invoice(ctx, id)?
            .ok_or_else(|| DbError::NotFound(format!("invoice {id}")))?;
        validate_adjustments(current.subtotal, tax_amount, discount_amount)?;

        let invoice = self
            .db
            .update_invoice_adjustments(ctx, id, tax_amount, discount_amount, self.clock.now())?;
        self.invalidate(ctx, &[QueryScope::Dashboard]);
        Ok(invoice)
    }

    pub fn update_invoice_status(&self, ctx: &TenantContext, id: &str, status: InvoiceStatus) -> ServiceResult<Invoice> {
        let invoice = self.db.update_invoice_status(ctx, id, status, self.clock.now())?;
        info!(
            clinic_id = %ctx.clinic_id,
            invoice_number = %invoice.invoice_number,
            status = status.as_str(),
            "invoice status set"
        );
        self.invalidate(ctx, &[QueryScope::Dashboard]);
        Ok(invoice)
    }

    /// Persist `overdue` on invoices past due as of the clock's today.
    pub fn mark_overdue(&self, ctx: &TenantContext) -> ServiceResult<Vec<String>> {
        let changed = self.db.mark_overdue(ctx, self.clock.today(), self.clock.now())?;
        if !changed.is_empty() {
            self.invalidate(ctx, &[QueryScope::Dashboard]);
        }
        Ok(changed)
    }

    /// Record a payment and apply it to its invoice. Not idempotent: each
    /// call records a new payment.
    pub fn record_payment(&self, ctx: &TenantContext, new: &NewPayment) -> ServiceResult<PaymentReceipt> {
        validate_new_payment(new)?;
        let receipt = self
            .db
            .record_payment(ctx, new, self.config.allow_overpayment, self.clock.now())?;
        self.invalidate(ctx, &[QueryScope::Dashboard]);
        Ok(receipt)
    }

    /// Mark a payment verified by the acting user.
    pub fn verify_payment(&self, ctx: &TenantContext, payment_id: &str) -> ServiceResult<Payment> {
        let payment = self
            .db
            .verify_payment(ctx, payment_id, &ctx.user_id, self.clock.now())?;
        info!(clinic_id = %ctx.clinic_id, payment_id = %payment_id, "payment verified");
        Ok(payment)
    }

    pub fn list_payments(&self, ctx: &TenantContext) -> ServiceResult<Vec<Payment>> {
        Ok(self.db.list_payments(ctx)?)
    }

    pub fn payments_for_invoice(&self, ctx: &TenantContext, invoice_id: &str) -> ServiceResult<Vec<Payment>> {
        Ok(self.db.payments_for_invoice(ctx, invoice_id)?)
    }

    /// Unverified payments, oldest first.
    pub fn pending_payments(&self, ctx: &TenantContext) -> ServiceResult<Vec<Payment>> {
        Ok(self.db.pending_payments(ctx)?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::ServiceError;
    use crate::config::ClinicConfig;
    use crate::db::DbError;
    use crate::models::{InvoiceStatus, NewInvoice, NewInvoiceItem, NewPayment, PaymentMethod};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn cleaning_and_xray(patient_id: &str) -> NewInvoice {
        NewInvoice::with_items(
            patient_id,
            vec![
                NewInvoiceItem::new("Cleaning", 1, dec!(80.00)),
                NewInvoiceItem::new("X-ray", 2, dec!(25.00)),
            ],
        )
    }

    #[test]
    fn test_full_payment_settles_invoice() {
        let service = service();
        let ctx = reception("clinic-1");
        let patient = patient(&service, &ctx);

        let detail = service.create_invoice(&ctx, &cleaning_and_xray(&patient.id)).unwrap();
        assert_eq!(detail.invoice.subtotal, dec!(130.00));
        assert_eq!(detail.invoice.total_amount, dec!(130.00));
        assert_eq!(detail.invoice.status, InvoiceStatus::Draft);
        assert!(detail.invoice.invoice_number.starts_with("INV-"));

        let receipt = service
            .record_payment(&ctx, &NewPayment::new(&detail.invoice.id, dec!(130.00), PaymentMethod::Cash))
            .unwrap();
        assert_eq!(receipt.invoice.status, InvoiceStatus::Paid);
        assert_eq!(receipt.invoice.balance_due(), Decimal::ZERO);
    }

    #[test]
    fn test_half_payment_is_partial() {
        let service = service();
        let ctx = reception("clinic-1");
        let patient = patient(&service, &ctx);
        let detail = service.create_invoice(&ctx, &cleaning_and_xray(&patient.id)).unwrap();

        let receipt = service
            .record_payment(&ctx, &NewPayment::new(&detail.invoice.id, dec!(65.00), PaymentMethod::Card))
            .unwrap();
        assert_eq!(receipt.invoice.paid_amount, dec!(65.00));
        assert_eq!(receipt.invoice.status, InvoiceStatus::Partial);
        assert_eq!(receipt.invoice.balance_due(), dec!(65.00));
    }

    #[test]
    fn test_validation_runs_before_store() {
        let service = service();
        let ctx = reception("clinic-1");
        let patient = patient(&service, &ctx);

        let empty = NewInvoice::with_items(&patient.id, vec![]);
        assert!(matches!(service.create_invoice(&ctx, &empty), Err(ServiceError::Validation(_))));
        assert!(service.list_invoices(&ctx).unwrap().is_empty());

        let detail = service.create_invoice(&ctx, &cleaning_and_xray(&patient.id)).unwrap();
        let zero = NewPayment::new(&detail.invoice.id, Decimal::ZERO, PaymentMethod::Cash);
        assert!(matches!(service.record_payment(&ctx, &zero), Err(ServiceError::Validation(_))));

        let err = service
            .update_invoice_adjustments(&ctx, &detail.invoice.id, Decimal::ZERO, dec!(500))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_overpayment_follows_config() {
        let strict = service();
        let ctx = reception("clinic-1");
        let patient = patient(&strict, &ctx);
        let detail = strict.create_invoice(&ctx, &cleaning_and_xray(&patient.id)).unwrap();
        let err = strict
            .record_payment(&ctx, &NewPayment::new(&detail.invoice.id, dec!(200), PaymentMethod::Cash))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Database(DbError::Constraint(_))));

        let lenient = service_with(ClinicConfig {
            allow_overpayment: true,
            ..ClinicConfig::default()
        });
        let patient = super::super::test_support::patient(&lenient, &ctx);
        let detail = lenient.create_invoice(&ctx, &cleaning_and_xray(&patient.id)).unwrap();
        let receipt = lenient
            .record_payment(&ctx, &NewPayment::new(&detail.invoice.id, dec!(200), PaymentMethod::Cash))
            .unwrap();
        assert_eq!(receipt.invoice.status, InvoiceStatus::Paid);
        assert_eq!(receipt.invoice.balance_due(), Decimal::ZERO);
    }

    #[test]
    fn test_verify_records_acting_user() {
        let service = service();
        let ctx = reception("clinic-1");
        let patient = patient(&service, &ctx);
        let detail = service.create_invoice(&ctx, &cleaning_and_xray(&patient.id)).unwrap();
        let receipt = service
            .record_payment(&ctx, &NewPayment::new(&detail.invoice.id, dec!(65), PaymentMethod::Esewa))
            .unwrap();
        assert_eq!(service.pending_payments(&ctx).unwrap().len(), 1);

        let verified = service.verify_payment(&ctx, &receipt.payment.id).unwrap();
        assert!(verified.is_verified);
        assert_eq!(verified.verified_by.as_deref(), Some("desk-1"));

        let again = service.verify_payment(&admin("clinic-1"), &receipt.payment.id).unwrap();
        assert_eq!(again.verified_by.as_deref(), Some("desk-1"));
        assert!(service.pending_payments(&ctx).unwrap().is_empty());

        let invoice = service.get_invoice(&ctx, &detail.invoice.id).unwrap().unwrap();
        assert_eq!(invoice.paid_amount, dec!(65));
        assert_eq!(invoice.status, InvoiceStatus::Partial);
    }

    #[test]
    fn test_mark_overdue_uses_clock() {
        let service = service();
        let ctx = reception("clinic-1");
        let patient = patient(&service, &ctx);
        let mut new = cleaning_and_xray(&patient.id);
        new.due_date = today().pred_opt();
        let detail = service.create_invoice(&ctx, &new).unwrap();

        // Drafts are never overdue
        assert!(service.mark_overdue(&ctx).unwrap().is_empty());

        service
            .update_invoice_status(&ctx, &detail.invoice.id, InvoiceStatus::Sent)
            .unwrap();
        assert_eq!(service.mark_overdue(&ctx).unwrap(), vec![detail.invoice.id.clone()]);
        let invoice = service.get_invoice(&ctx, &detail.invoice.id).unwrap().unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Overdue);
    }
}
