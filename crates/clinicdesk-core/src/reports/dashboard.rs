//! Front-page rollups.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{outstanding_balance, revenue_by_day, revenue_by_method, revenue_on, DailyRevenue, MethodRevenue};
use crate::config::ClinicConfig;
use crate::context::TenantContext;
use crate::db::{Database, DbResult};
use crate::models::{Appointment, AppointmentStatus, Invoice, Patient, Payment};

/// Number of today's appointments in one status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusCount {
    pub status: AppointmentStatus,
    pub count: u32,
}

/// Dashboard numbers for one clinic on one day.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    pub date: Option<NaiveDate>,
    pub todays_appointments: u32,
    pub active_patients: u32,
    pub todays_revenue: Decimal,
    pub outstanding_balance: Decimal,
    /// All six statuses, zero counts included
    pub appointments_by_status: Vec<StatusCount>,
    pub low_stock_count: u32,
    /// Oldest first
    pub revenue_by_day: Vec<DailyRevenue>,
    pub revenue_by_method: Vec<MethodRevenue>,
    pub recent_patients: Vec<Patient>,
}

/// Collections the dashboard is computed from.
#[derive(Debug, Clone, Copy)]
pub struct DashboardSources<'a> {
    pub todays_appointments: &'a [Appointment],
    pub invoices: &'a [Invoice],
    pub payments: &'a [Payment],
    pub active_patients: u32,
    pub low_stock_count: u32,
    pub recent_patients: &'a [Patient],
}

/// Counts per status for the given appointments, in lifecycle order.
pub fn status_counts(appointments: &[Appointment]) -> Vec<StatusCount> {
    AppointmentStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: appointments.iter().filter(|a| a.status == status).count() as u32,
        })
        .collect()
}

impl DashboardStats {
    /// Pure aggregation over already-loaded collections.
    pub fn compute(sources: DashboardSources<'_>, today: NaiveDate, config: &ClinicConfig) -> Self {
        let todays: Vec<Appointment> = sources
            .todays_appointments
            .iter()
            .filter(|a| a.scheduled_date == today)
            .cloned()
            .collect();

        Self {
            date: Some(today),
            todays_appointments: todays.len() as u32,
            active_patients: sources.active_patients,
            todays_revenue: revenue_on(sources.payments, today),
            outstanding_balance: outstanding_balance(sources.invoices),
            appointments_by_status: status_counts(&todays),
            low_stock_count: sources.low_stock_count,
            revenue_by_day: revenue_by_day(sources.payments, today, config.revenue_window_days),
            revenue_by_method: revenue_by_method(sources.payments, today, config.payment_method_window_days),
            recent_patients: sources.recent_patients.to_vec(),
        }
    }

    pub fn count_for(&self, status: AppointmentStatus) -> u32 {
        self.appointments_by_status
            .iter()
            .find(|c| c.status == status)
            .map_or(0, |c| c.count)
    }
}

/// Load every collection the dashboard needs and aggregate it.
pub fn load_dashboard(
    db: &Database,
    ctx: &TenantContext,
    today: NaiveDate,
    config: &ClinicConfig,
) -> DbResult<DashboardStats> {
    let todays_appointments = db.appointments_on(ctx, today)?;
    let invoices = db.list_invoices(ctx)?;
    let payments = db.list_payments(ctx)?;
    let recent_patients = db.recent_patients(ctx, config.recent_patients_limit)?;
    let active_patients = db.count_active_patients(ctx)?;
    let low_stock_count = db.low_stock_items(ctx)?.len() as u32;

    Ok(DashboardStats::compute(
        DashboardSources {
            todays_appointments: &todays_appointments,
            invoices: &invoices,
            payments: &payments,
            active_patients,
            low_stock_count,
            recent_patients: &recent_patients,
        },
        today,
        config,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AppointmentType, InventoryItem, NewAppointment, NewInventoryItem, NewInvoice, NewInvoiceItem, NewPayment,
        PaymentMethod, StockOperation,
    };
    use chrono::{DateTime, NaiveTime, Utc};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        "2024-06-03T10:00:00Z".parse().unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn ctx() -> TenantContext {
        TenantContext::new("clinic-1", "user-1", vec![])
    }

    fn appointment(patient_id: &str, date: NaiveDate, hour: u32, status: AppointmentStatus) -> Appointment {
        let mut appointment = Appointment::new(
            "clinic-1".into(),
            NewAppointment {
                patient_id: patient_id.into(),
                provider_id: None,
                title: "Checkup".into(),
                description: None,
                appointment_type: AppointmentType::Consultation,
                scheduled_date: date,
                start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(hour, 30, 0).unwrap(),
                notes: None,
                telemedicine_link: None,
            },
            now(),
        );
        appointment.status = status;
        appointment
    }

    #[test]
    fn test_status_counts_cover_all_statuses() {
        let appointments = vec![
            appointment("p1", today(), 9, AppointmentStatus::Scheduled),
            appointment("p1", today(), 10, AppointmentStatus::Scheduled),
            appointment("p1", today(), 11, AppointmentStatus::Completed),
        ];
        let counts = status_counts(&appointments);
        assert_eq!(counts.len(), 6);
        assert_eq!(counts[0], StatusCount { status: AppointmentStatus::Scheduled, count: 2 });
        assert_eq!(counts[3].count, 1);
        assert_eq!(counts[5].status, AppointmentStatus::NoShow);
        assert_eq!(counts[5].count, 0);
    }

    #[test]
    fn test_compute_ignores_other_days() {
        let tomorrow = today().succ_opt().unwrap();
        let appointments = vec![
            appointment("p1", today(), 9, AppointmentStatus::Confirmed),
            appointment("p1", tomorrow, 9, AppointmentStatus::Confirmed),
        ];
        let stats = DashboardStats::compute(
            DashboardSources {
                todays_appointments: &appointments,
                invoices: &[],
                payments: &[],
                active_patients: 4,
                low_stock_count: 1,
                recent_patients: &[],
            },
            today(),
            &ClinicConfig::default(),
        );
        assert_eq!(stats.todays_appointments, 1);
        assert_eq!(stats.count_for(AppointmentStatus::Confirmed), 1);
        assert_eq!(stats.active_patients, 4);
        assert_eq!(stats.revenue_by_day.len(), 7);
        assert_eq!(stats.todays_revenue, Decimal::ZERO);
    }

    #[test]
    fn test_load_dashboard_from_store() {
        let db = Database::open_in_memory().unwrap();
        let ctx = ctx();

        let patient = Patient::new("clinic-1".into(), "Ada".into(), "Lovelace".into(), now());
        db.insert_patient(&ctx, &patient).unwrap();
        db.insert_appointment(&ctx, &appointment(&patient.id, today(), 9, AppointmentStatus::Scheduled))
            .unwrap();

        let first = db
            .create_invoice(
                &ctx,
                "INV",
                &NewInvoice::with_items(&patient.id, vec![NewInvoiceItem::new("Cleaning", 1, dec!(80))]),
                now(),
            )
            .unwrap();
        let second = db
            .create_invoice(
                &ctx,
                "INV",
                &NewInvoice::with_items(&patient.id, vec![NewInvoiceItem::new("X-ray", 2, dec!(25))]),
                now(),
            )
            .unwrap();
        db.record_payment(&ctx, &NewPayment::new(&first.invoice.id, dec!(80), PaymentMethod::Cash), false, now())
            .unwrap();
        db.record_payment(&ctx, &NewPayment::new(&second.invoice.id, dec!(20), PaymentMethod::Card), false, now())
            .unwrap();

        let item = InventoryItem::new("clinic-1".into(), NewInventoryItem::basic("Gloves", "box", 3, 10), now());
        db.insert_inventory_item(&ctx, &item).unwrap();

        let stats = load_dashboard(&db, &ctx, today(), &ClinicConfig::default()).unwrap();
        assert_eq!(stats.todays_appointments, 1);
        assert_eq!(stats.active_patients, 1);
        assert_eq!(stats.todays_revenue, dec!(100));
        // Second invoice is partial: 50 - 20
        assert_eq!(stats.outstanding_balance, dec!(30));
        assert_eq!(stats.low_stock_count, 1);
        assert_eq!(stats.recent_patients.len(), 1);
        assert_eq!(stats.revenue_by_day.last().unwrap().amount, dec!(100));
        assert_eq!(stats.revenue_by_method.len(), 2);

        db.adjust_stock(&ctx, &item.id, StockOperation::Add, 10, now()).unwrap();
        let stats = load_dashboard(&db, &ctx, today(), &ClinicConfig::default()).unwrap();
        assert_eq!(stats.low_stock_count, 0);
    }
}
