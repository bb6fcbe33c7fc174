//! Whole-clinic summary: demographics, visit mix and billing totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{collected_revenue, outstanding_balance};
use crate::context::TenantContext;
use crate::db::{Database, DbResult};
use crate::models::{Appointment, AppointmentStatus, AppointmentType, Gender, Invoice, InvoiceStatus, Patient};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenderCount {
    /// `None` when gender was not captured
    pub gender: Option<Gender>,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeCount {
    pub appointment_type: AppointmentType,
    pub count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BillingSummary {
    /// Sum of totals on paid invoices
    pub collected: Decimal,
    /// Sum of balances on open invoices
    pub outstanding: Decimal,
    pub invoice_count: u32,
    pub paid_count: u32,
    pub open_count: u32,
}

impl BillingSummary {
    pub fn from_invoices(invoices: &[Invoice]) -> Self {
        Self {
            collected: collected_revenue(invoices),
            outstanding: outstanding_balance(invoices),
            invoice_count: invoices.len() as u32,
            paid_count: invoices.iter().filter(|i| i.status == InvoiceStatus::Paid).count() as u32,
            open_count: invoices.iter().filter(|i| i.status.is_open()).count() as u32,
        }
    }
}

/// Clinic-wide report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicReport {
    pub total_patients: u32,
    pub gender_distribution: Vec<GenderCount>,
    pub total_appointments: u32,
    pub completed_appointments: u32,
    pub telemedicine_appointments: u32,
    /// Types that occur at least once, most frequent first
    pub appointment_types: Vec<TypeCount>,
    pub billing: BillingSummary,
}

/// Patients per gender, unspecified last. Genders with no patients are omitted.
pub fn gender_distribution(patients: &[Patient]) -> Vec<GenderCount> {
    [Some(Gender::Male), Some(Gender::Female), Some(Gender::Other), None]
        .into_iter()
        .map(|gender| GenderCount {
            gender,
            count: patients.iter().filter(|p| p.gender == gender).count() as u32,
        })
        .filter(|c| c.count > 0)
        .collect()
}

pub fn appointment_type_counts(appointments: &[Appointment]) -> Vec<TypeCount> {
    let mut counts: Vec<TypeCount> = [
        AppointmentType::Consultation,
        AppointmentType::FollowUp,
        AppointmentType::Procedure,
        AppointmentType::Emergency,
        AppointmentType::Telemedicine,
    ]
    .into_iter()
    .map(|appointment_type| TypeCount {
        appointment_type,
        count: appointments
            .iter()
            .filter(|a| a.appointment_type == appointment_type)
            .count() as u32,
    })
    .filter(|c| c.count > 0)
    .collect();
    // Stable sort keeps declaration order among ties
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

impl ClinicReport {
    pub fn build(patients: &[Patient], appointments: &[Appointment], invoices: &[Invoice]) -> Self {
        Self {
            total_patients: patients.len() as u32,
            gender_distribution: gender_distribution(patients),
            total_appointments: appointments.len() as u32,
            completed_appointments: appointments
                .iter()
                .filter(|a| a.status == AppointmentStatus::Completed)
                .count() as u32,
            telemedicine_appointments: appointments
                .iter()
                .filter(|a| a.appointment_type == AppointmentType::Telemedicine)
                .count() as u32,
            appointment_types: appointment_type_counts(appointments),
            billing: BillingSummary::from_invoices(invoices),
        }
    }
}

/// Build the clinic report from the store.
pub fn load_clinic_report(db: &Database, ctx: &TenantContext) -> DbResult<ClinicReport> {
    let patients = db.list_patients(ctx)?;
    let appointments = db.list_appointments(ctx)?;
    let invoices = db.list_invoices(ctx)?;
    Ok(ClinicReport::build(&patients, &appointments, &invoices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewAppointment;
    use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        "2024-06-03T10:00:00Z".parse().unwrap()
    }

    fn patient(gender: Option<Gender>) -> Patient {
        let mut patient = Patient::new("clinic-1".into(), "A".into(), "B".into(), now());
        patient.gender = gender;
        patient
    }

    fn appointment(kind: AppointmentType, status: AppointmentStatus) -> Appointment {
        let mut appointment = Appointment::new(
            "clinic-1".into(),
            NewAppointment {
                patient_id: "p1".into(),
                provider_id: None,
                title: "Visit".into(),
                description: None,
                appointment_type: kind,
                scheduled_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                notes: None,
                telemedicine_link: None,
            },
            now(),
        );
        appointment.status = status;
        appointment
    }

    fn invoice(total: Decimal, paid: Decimal, status: InvoiceStatus) -> Invoice {
        Invoice {
            id: uuid::Uuid::new_v4().to_string(),
            clinic_id: "clinic-1".into(),
            patient_id: "p1".into(),
            invoice_number: "INV-000001".into(),
            status,
            subtotal: total,
            tax_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            total_amount: total,
            paid_amount: paid,
            due_date: None,
            notes: None,
            version: 0,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn test_gender_distribution_includes_unspecified() {
        let patients = vec![
            patient(Some(Gender::Female)),
            patient(Some(Gender::Female)),
            patient(None),
        ];
        let distribution = gender_distribution(&patients);
        assert_eq!(
            distribution,
            vec![
                GenderCount { gender: Some(Gender::Female), count: 2 },
                GenderCount { gender: None, count: 1 },
            ]
        );
    }

    #[test]
    fn test_appointment_mix() {
        let appointments = vec![
            appointment(AppointmentType::Telemedicine, AppointmentStatus::Completed),
            appointment(AppointmentType::Telemedicine, AppointmentStatus::Scheduled),
            appointment(AppointmentType::Consultation, AppointmentStatus::Completed),
        ];
        let report = ClinicReport::build(&[], &appointments, &[]);
        assert_eq!(report.total_appointments, 3);
        assert_eq!(report.completed_appointments, 2);
        assert_eq!(report.telemedicine_appointments, 2);
        assert_eq!(report.appointment_types[0].appointment_type, AppointmentType::Telemedicine);
        assert_eq!(report.appointment_types.len(), 2);
    }

    #[test]
    fn test_billing_summary() {
        let invoices = vec![
            invoice(dec!(100), dec!(100), InvoiceStatus::Paid),
            invoice(dec!(80), dec!(30), InvoiceStatus::Partial),
            invoice(dec!(40), dec!(0), InvoiceStatus::Draft),
            invoice(dec!(500), dec!(0), InvoiceStatus::Cancelled),
        ];
        let summary = BillingSummary::from_invoices(&invoices);
        assert_eq!(summary.collected, dec!(100));
        assert_eq!(summary.outstanding, dec!(90));
        assert_eq!(summary.invoice_count, 4);
        assert_eq!(summary.paid_count, 1);
        assert_eq!(summary.open_count, 2);
    }

    #[test]
    fn test_load_clinic_report_skips_inactive_patients() {
        let db = Database::open_in_memory().unwrap();
        let ctx = TenantContext::new("clinic-1", "user-1", vec![]);
        let kept = patient(Some(Gender::Male));
        let gone = patient(Some(Gender::Other));
        db.insert_patient(&ctx, &kept).unwrap();
        db.insert_patient(&ctx, &gone).unwrap();
        db.deactivate_patient(&ctx, &gone.id, now()).unwrap();

        let report = load_clinic_report(&db, &ctx).unwrap();
        assert_eq!(report.total_patients, 1);
        assert_eq!(report.gender_distribution[0].gender, Some(Gender::Male));
        assert_eq!(report.billing, BillingSummary::default());
    }
}
