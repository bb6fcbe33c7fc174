//! Dashboard and report reads.

use super::{ClinicService, ServiceResult};
use crate::context::TenantContext;
use crate::reports::{load_clinic_report, load_dashboard, ClinicReport, DashboardStats, RevenueReport};

impl ClinicService {
    /// Today's dashboard. Served from cache until a mutation touches the
    /// dashboard scope; the low-stock count is always read fresh.
    pub fn dashboard(&self, ctx: &TenantContext) -> ServiceResult<DashboardStats> {
        let today = self.clock.today();
        if let Some(mut stats) = self.cache.dashboard(&ctx.clinic_id, today) {
            stats.low_stock_count = self.db.low_stock_items(ctx)?.len() as u32;
            return Ok(stats);
        }
        let stats = load_dashboard(&self.db, ctx, today, &self.config)?;
        self.cache.store_dashboard(&ctx.clinic_id, today, stats.clone());
        Ok(stats)
    }

    pub fn clinic_report(&self, ctx: &TenantContext) -> ServiceResult<ClinicReport> {
        Ok(load_clinic_report(&self.db, ctx)?)
    }

    /// Revenue over the trailing `days` days ending today.
    pub fn revenue_report(&self, ctx: &TenantContext, days: u32) -> ServiceResult<RevenueReport> {
        let payments = self.db.list_payments(ctx)?;
        Ok(RevenueReport::build(&payments, self.clock.today(), days))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::ClinicService;
    use crate::config::ClinicConfig;
    use crate::models::{NewInventoryItem, NewInvoice, NewInvoiceItem, NewPayment, PaymentMethod, StockOperation};
    use rust_decimal_macros::dec;

    #[test]
    fn test_dashboard_refreshes_after_mutations() {
        let service = service();
        let ctx = reception("clinic-1");
        let patient = patient(&service, &ctx);

        let before = service.dashboard(&ctx).unwrap();
        assert_eq!(before.active_patients, 1);
        assert_eq!(before.outstanding_balance, dec!(0));

        let detail = service
            .create_invoice(
                &ctx,
                &NewInvoice::with_items(&patient.id, vec![NewInvoiceItem::new("Cleaning", 1, dec!(80))]),
            )
            .unwrap();
        assert_eq!(service.dashboard(&ctx).unwrap().outstanding_balance, dec!(80));

        service
            .record_payment(&ctx, &NewPayment::new(&detail.invoice.id, dec!(30), PaymentMethod::Cash))
            .unwrap();
        let stats = service.dashboard(&ctx).unwrap();
        assert_eq!(stats.outstanding_balance, dec!(50));
        assert_eq!(stats.todays_revenue, dec!(30));

        let item = service
            .create_inventory_item(&ctx, &NewInventoryItem::basic("Gloves", "box", 3, 10))
            .unwrap();
        assert_eq!(service.dashboard(&ctx).unwrap().low_stock_count, 1);
        service.adjust_stock(&ctx, &item.id, StockOperation::Add, 10).unwrap();
        assert_eq!(service.dashboard(&ctx).unwrap().low_stock_count, 0);
    }

    #[test]
    fn test_low_stock_seen_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");
        let path = path.to_str().unwrap();
        let front_desk = ClinicService::open(path, ClinicConfig::default()).unwrap();
        let stock_room = ClinicService::open(path, ClinicConfig::default()).unwrap();
        let ctx = reception("clinic-1");

        assert_eq!(front_desk.dashboard(&ctx).unwrap().low_stock_count, 0);
        stock_room
            .create_inventory_item(&ctx, &NewInventoryItem::basic("Gloves", "box", 3, 10))
            .unwrap();
        assert_eq!(front_desk.dashboard(&ctx).unwrap().low_stock_count, 1);
    }

    #[test]
    fn test_dashboard_is_per_clinic() {
        let service = service();
        patient(&service, &reception("clinic-1"));
        assert_eq!(service.dashboard(&reception("clinic-1")).unwrap().active_patients, 1);
        assert_eq!(service.dashboard(&reception("clinic-2")).unwrap().active_patients, 0);
    }

    #[test]
    fn test_revenue_report_csv() {
        let service = service();
        let ctx = reception("clinic-1");
        let patient = patient(&service, &ctx);
        let detail = service
            .create_invoice(
                &ctx,
                &NewInvoice::with_items(&patient.id, vec![NewInvoiceItem::new("X-ray", 2, dec!(25))]),
            )
            .unwrap();
        service
            .record_payment(&ctx, &NewPayment::new(&detail.invoice.id, dec!(50), PaymentMethod::Khalti))
            .unwrap();

        let report = service.revenue_report(&ctx, 30).unwrap();
        assert_eq!(report.by_day.len(), 30);
        assert_eq!(report.to, today());
        assert_eq!(report.by_method[0].method, PaymentMethod::Khalti);
        assert_eq!(report.by_day.last().unwrap().amount, dec!(50));
        assert!(report.to_csv().lines().last().unwrap().starts_with("2024-06-03,1,"));

        let summary = service.clinic_report(&ctx).unwrap();
        assert_eq!(summary.billing.collected, dec!(50));
        assert_eq!(summary.total_patients, 1);
    }
}
