//! ClinicDesk Core Library
//!
//! Multi-tenant clinic management core: patients, appointments, billing,
//! clinical charts, inventory, team roles and public showcase content, on an
//! embedded SQLite store with row-level tenant isolation.
//!
//! # Architecture
//!
//! ```text
//!   UI shell ──► ClinicCore (FFI) ──► ClinicService ──► Database (SQLite)
//!                                        │    │
//!                      validation ◄──────┘    └──────► QueryCache
//!                      billing / inventory            (appointments, dashboard)
//!                      scheduler / reports
//! ```
//!
//! Every call carries a [`TenantContext`]; every query filters on its
//! `clinic_id`.
//!
//! # Modules
//!
//! - [`db`]: SQLite layer, one `impl Database` block per aggregate
//! - [`models`]: Domain types with closed enums
//! - [`billing`]: Invoice totals and payment reconciliation arithmetic
//! - [`inventory`]: Stock ledger operations
//! - [`scheduler`]: Week/day appointment grid
//! - [`reports`]: Dashboard, revenue and clinic summary rollups
//! - [`cache`]: Per-clinic read cache with scope invalidation
//! - [`service`]: Validation, policy and invalidation around the store

pub mod billing;
pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod inventory;
pub mod models;
pub mod reports;
pub mod scheduler;
pub mod service;
pub mod validation;

// Re-export commonly used types
pub use config::ClinicConfig;
pub use context::{Clock, FixedClock, SystemClock, TenantContext};
pub use db::Database;
pub use models::{
    AppRole, Appointment, AppointmentStatus, Invoice, InvoiceStatus, InventoryItem, Patient, Payment,
    PaymentMethod, StockOperation,
};
pub use scheduler::WeekGrid;
pub use service::{ClinicService, ServiceError, ServiceResult};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicCoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for ClinicCoreError {
    fn from(e: db::DbError) -> Self {
        use db::DbError;
        match e {
            DbError::NotFound(what) | DbError::TenantMismatch(what) => ClinicCoreError::NotFound(what),
            DbError::Constraint(message) => ClinicCoreError::InvalidInput(message),
            conflict @ DbError::Conflict(_) => ClinicCoreError::Conflict(conflict.to_string()),
            other => ClinicCoreError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ServiceError> for ClinicCoreError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Database(db) => db.into(),
            ServiceError::Unauthorized(message) => ClinicCoreError::Unauthorized(message),
            taken @ ServiceError::SlotTaken(_) => ClinicCoreError::Conflict(taken.to_string()),
            other => ClinicCoreError::InvalidInput(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for ClinicCoreError {
    fn from(e: config::ConfigError) -> Self {
        ClinicCoreError::InvalidInput(e.to_string())
    }
}

impl From<serde_json::Error> for ClinicCoreError {
    fn from(e: serde_json::Error) -> Self {
        ClinicCoreError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicCoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicCoreError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path. `config_json` may be empty
/// for defaults.
#[uniffi::export]
pub fn open_database(path: String, config_json: String) -> Result<Arc<ClinicCore>, ClinicCoreError> {
    let config = parse_config(&config_json)?;
    let service = ClinicService::open(&path, config)?;
    Ok(Arc::new(ClinicCore {
        service: Arc::new(Mutex::new(service)),
    }))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<ClinicCore>, ClinicCoreError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(ClinicCore {
        service: Arc::new(Mutex::new(ClinicService::new(db, ClinicConfig::default()))),
    }))
}

fn parse_config(json: &str) -> Result<ClinicConfig, ClinicCoreError> {
    if json.trim().is_empty() {
        return Ok(ClinicConfig::default());
    }
    Ok(ClinicConfig::from_json_str(json)?)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe service wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicCore {
    service: Arc<Mutex<ClinicService>>,
}

#[uniffi::export]
impl ClinicCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    pub fn register_patient(
        &self,
        ctx: FfiContext,
        first_name: String,
        last_name: String,
    ) -> Result<FfiPatient, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let service = self.service.lock()?;
        let patient = service.register_patient(&ctx, &first_name, &last_name, &Default::default())?;
        Ok(patient.into())
    }

    pub fn get_patient(&self, ctx: FfiContext, id: String) -> Result<Option<FfiPatient>, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let service = self.service.lock()?;
        Ok(service.get_patient(&ctx, &id)?.map(Into::into))
    }

    /// Search active patients by name prefix.
    pub fn search_patients(
        &self,
        ctx: FfiContext,
        prefix: String,
        limit: u32,
    ) -> Result<Vec<FfiPatient>, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let service = self.service.lock()?;
        let patients = service.search_patients(&ctx, &prefix, limit)?;
        Ok(patients.into_iter().map(Into::into).collect())
    }

    pub fn deactivate_patient(&self, ctx: FfiContext, id: String) -> Result<(), ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let service = self.service.lock()?;
        Ok(service.deactivate_patient(&ctx, &id)?)
    }

    // =========================================================================
    // Appointment Operations
    // =========================================================================

    pub fn book_appointment(
        &self,
        ctx: FfiContext,
        appointment: FfiNewAppointment,
    ) -> Result<FfiAppointment, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let new: models::NewAppointment = appointment.try_into()?;
        let service = self.service.lock()?;
        Ok(service.book_appointment(&ctx, &new)?.into())
    }

    pub fn set_appointment_status(
        &self,
        ctx: FfiContext,
        id: String,
        status: String,
    ) -> Result<FfiAppointment, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let status = parse_enum("status", &status, AppointmentStatus::parse)?;
        let service = self.service.lock()?;
        Ok(service.set_appointment_status(&ctx, &id, status)?.into())
    }

    pub fn delete_appointment(&self, ctx: FfiContext, id: String) -> Result<(), ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let service = self.service.lock()?;
        Ok(service.delete_appointment(&ctx, &id)?)
    }

    pub fn upcoming_appointments(&self, ctx: FfiContext, limit: u32) -> Result<Vec<FfiAppointment>, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let service = self.service.lock()?;
        let appointments = service.upcoming_appointments(&ctx, limit)?;
        Ok(appointments.into_iter().map(Into::into).collect())
    }

    /// Week grid for the Sunday-started week containing `reference_date`
    /// (`YYYY-MM-DD`).
    pub fn week_schedule(&self, ctx: FfiContext, reference_date: String) -> Result<FfiWeekSchedule, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let reference = parse_date("reference_date", &reference_date)?;
        let service = self.service.lock()?;
        let appointments = service.week_appointments(&ctx, reference)?;
        let grid = WeekGrid::from_config(&appointments, reference, service.config())?;
        Ok(FfiWeekSchedule::from_grid(&grid))
    }

    /// Occupied slots of a single day, in slot order.
    pub fn day_schedule(&self, ctx: FfiContext, date: String) -> Result<Vec<FfiScheduleCell>, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let date = parse_date("date", &date)?;
        let service = self.service.lock()?;
        let appointments = service.appointments_on(&ctx, date)?;
        let grid = WeekGrid::from_config(&appointments, date, service.config())?;
        Ok(grid
            .day_view(date)
            .into_iter()
            .filter_map(|row| {
                let appointments: Vec<FfiAppointment> = row.cells.into_iter().flatten().cloned().map(Into::into).collect();
                (!appointments.is_empty()).then(|| FfiScheduleCell {
                    date: date.to_string(),
                    slot: row.slot,
                    appointments,
                })
            })
            .collect())
    }

    // =========================================================================
    // Billing Operations
    // =========================================================================

    pub fn create_invoice(&self, ctx: FfiContext, invoice: FfiNewInvoice) -> Result<FfiInvoice, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let new: models::NewInvoice = invoice.try_into()?;
        let service = self.service.lock()?;
        Ok(service.create_invoice(&ctx, &new)?.invoice.into())
    }

    pub fn list_invoices(&self, ctx: FfiContext) -> Result<Vec<FfiInvoice>, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let service = self.service.lock()?;
        Ok(service.list_invoices(&ctx)?.into_iter().map(Into::into).collect())
    }

    pub fn update_invoice_status(
        &self,
        ctx: FfiContext,
        invoice_id: String,
        status: String,
    ) -> Result<FfiInvoice, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let status = parse_enum("status", &status, InvoiceStatus::parse)?;
        let service = self.service.lock()?;
        Ok(service.update_invoice_status(&ctx, &invoice_id, status)?.into())
    }

    /// Record a payment; returns the updated invoice.
    pub fn record_payment(
        &self,
        ctx: FfiContext,
        invoice_id: String,
        amount: String,
        method: String,
        reference_number: Option<String>,
    ) -> Result<FfiInvoice, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let mut payment = models::NewPayment::new(
            invoice_id,
            parse_money("amount", &amount)?,
            parse_enum("method", &method, PaymentMethod::parse)?,
        );
        payment.reference_number = reference_number;
        let service = self.service.lock()?;
        Ok(service.record_payment(&ctx, &payment)?.invoice.into())
    }

    pub fn verify_payment(&self, ctx: FfiContext, payment_id: String) -> Result<(), ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let service = self.service.lock()?;
        service.verify_payment(&ctx, &payment_id)?;
        Ok(())
    }

    // =========================================================================
    // Inventory Operations
    // =========================================================================

    pub fn adjust_stock(
        &self,
        ctx: FfiContext,
        item_id: String,
        operation: String,
        amount: u32,
    ) -> Result<FfiInventoryItem, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let operation = parse_enum("operation", &operation, StockOperation::parse)?;
        let service = self.service.lock()?;
        Ok(service.adjust_stock(&ctx, &item_id, operation, amount)?.into())
    }

    pub fn list_inventory(&self, ctx: FfiContext) -> Result<Vec<FfiInventoryItem>, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let service = self.service.lock()?;
        Ok(service.list_inventory(&ctx)?.into_iter().map(Into::into).collect())
    }

    pub fn low_stock_items(&self, ctx: FfiContext) -> Result<Vec<FfiInventoryItem>, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let service = self.service.lock()?;
        Ok(service.low_stock_items(&ctx)?.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Team Operations
    // =========================================================================

    pub fn assign_role(&self, ctx: FfiContext, user_id: String, role: String) -> Result<(), ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let role = parse_enum("role", &role, AppRole::parse)?;
        let service = self.service.lock()?;
        Ok(service.assign_role(&ctx, &user_id, role)?)
    }

    pub fn remove_role(&self, ctx: FfiContext, user_id: String, role: String) -> Result<bool, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let role = parse_enum("role", &role, AppRole::parse)?;
        let service = self.service.lock()?;
        Ok(service.remove_role(&ctx, &user_id, role)?)
    }

    // =========================================================================
    // Medical Record Operations
    // =========================================================================

    /// Chart a visit from a JSON `NewMedicalRecord`. Returns the stored record
    /// as JSON.
    pub fn create_medical_record_json(&self, ctx: FfiContext, record_json: String) -> Result<String, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let new: models::NewMedicalRecord = serde_json::from_str(&record_json)?;
        let service = self.service.lock()?;
        Ok(serde_json::to_string(&service.create_medical_record(&ctx, &new)?)?)
    }

    /// Apply a JSON `MedicalRecordUpdate`.
    pub fn update_medical_record_json(
        &self,
        ctx: FfiContext,
        id: String,
        update_json: String,
    ) -> Result<String, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let update: models::MedicalRecordUpdate = serde_json::from_str(&update_json)?;
        let service = self.service.lock()?;
        Ok(serde_json::to_string(&service.update_medical_record(&ctx, &id, &update)?)?)
    }

    /// A patient's chart as a JSON array, newest visit first.
    pub fn medical_records_json(&self, ctx: FfiContext, patient_id: String) -> Result<String, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let service = self.service.lock()?;
        Ok(serde_json::to_string(&service.medical_records(&ctx, &patient_id)?)?)
    }

    /// Record plus attachments as JSON.
    pub fn medical_record_detail_json(&self, ctx: FfiContext, id: String) -> Result<Option<String>, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let service = self.service.lock()?;
        service
            .medical_record_detail(&ctx, &id)?
            .map(|detail| serde_json::to_string(&detail))
            .transpose()
            .map_err(Into::into)
    }

    // =========================================================================
    // Report Operations
    // =========================================================================

    /// Dashboard stats as JSON.
    pub fn dashboard_json(&self, ctx: FfiContext) -> Result<String, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let service = self.service.lock()?;
        Ok(serde_json::to_string(&service.dashboard(&ctx)?)?)
    }

    /// Clinic summary report as JSON.
    pub fn clinic_report_json(&self, ctx: FfiContext) -> Result<String, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let service = self.service.lock()?;
        Ok(serde_json::to_string(&service.clinic_report(&ctx)?)?)
    }

    /// Daily revenue over the trailing `days` days as CSV.
    pub fn revenue_csv(&self, ctx: FfiContext, days: u32) -> Result<String, ClinicCoreError> {
        let ctx: TenantContext = ctx.try_into()?;
        let service = self.service.lock()?;
        Ok(service.revenue_report(&ctx, days)?.to_csv())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

fn parse_enum<T>(field: &str, value: &str, parse: fn(&str) -> Option<T>) -> Result<T, ClinicCoreError> {
    parse(value).ok_or_else(|| ClinicCoreError::InvalidInput(format!("{field}: unknown value {value:?}")))
}

fn parse_money(field: &str, value: &str) -> Result<Decimal, ClinicCoreError> {
    Decimal::from_str(value.trim())
        .map_err(|e| ClinicCoreError::InvalidInput(format!("{field}: {value:?} is not an amount ({e})")))
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ClinicCoreError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| ClinicCoreError::InvalidInput(format!("{field}: {value:?} is not YYYY-MM-DD ({e})")))
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, ClinicCoreError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| ClinicCoreError::InvalidInput(format!("{field}: {value:?} is not HH:MM ({e})")))
}

/// FFI-safe caller identity.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiContext {
    pub clinic_id: String,
    pub user_id: String,
    pub roles: Vec<String>,
}

impl TryFrom<FfiContext> for TenantContext {
    type Error = ClinicCoreError;

    fn try_from(ctx: FfiContext) -> Result<Self, Self::Error> {
        let roles = ctx
            .roles
            .iter()
            .map(|role| parse_enum("roles", role, AppRole::parse))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TenantContext::new(ctx.clinic_id, ctx.user_id, roles))
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub is_active: bool,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            first_name: patient.first_name,
            last_name: patient.last_name,
            email: patient.email,
            phone: patient.phone,
            date_of_birth: patient.date_of_birth.map(|d| d.to_string()),
            gender: patient.gender.map(|g| g.as_str().to_string()),
            is_active: patient.is_active,
        }
    }
}

/// FFI-safe booking request. Date is `YYYY-MM-DD`, times `HH:MM`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewAppointment {
    pub patient_id: String,
    pub provider_id: Option<String>,
    pub title: String,
    pub appointment_type: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub notes: Option<String>,
}

impl TryFrom<FfiNewAppointment> for models::NewAppointment {
    type Error = ClinicCoreError;

    fn try_from(new: FfiNewAppointment) -> Result<Self, Self::Error> {
        Ok(models::NewAppointment {
            patient_id: new.patient_id,
            provider_id: new.provider_id,
            title: new.title,
            description: None,
            appointment_type: parse_enum("appointment_type", &new.appointment_type, models::AppointmentType::parse)?,
            scheduled_date: parse_date("date", &new.date)?,
            start_time: parse_time("start_time", &new.start_time)?,
            end_time: parse_time("end_time", &new.end_time)?,
            notes: new.notes,
            telemedicine_link: None,
        })
    }
}

/// FFI-safe appointment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub id: String,
    pub patient_id: String,
    pub provider_id: Option<String>,
    pub title: String,
    pub appointment_type: String,
    pub status: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

impl From<Appointment> for FfiAppointment {
    fn from(appointment: Appointment) -> Self {
        Self {
            start_time: appointment.start_label(),
            end_time: appointment.end_time.format("%H:%M").to_string(),
            id: appointment.id,
            patient_id: appointment.patient_id,
            provider_id: appointment.provider_id,
            title: appointment.title,
            appointment_type: appointment.appointment_type.as_str().to_string(),
            status: appointment.status.as_str().to_string(),
            date: appointment.scheduled_date.to_string(),
        }
    }
}

/// One non-empty `(date, slot)` cell of the week grid.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiScheduleCell {
    pub date: String,
    pub slot: String,
    pub appointments: Vec<FfiAppointment>,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiWeekSchedule {
    pub dates: Vec<String>,
    pub slots: Vec<String>,
    pub cells: Vec<FfiScheduleCell>,
    /// Appointments whose start falls between slot labels
    pub unslotted: Vec<FfiAppointment>,
}

impl FfiWeekSchedule {
    fn from_grid(grid: &WeekGrid<'_>) -> Self {
        let dates = grid.dates();
        let mut cells = Vec::new();
        for row in grid.rows() {
            for (date, appointments) in dates.iter().zip(row.cells) {
                if appointments.is_empty() {
                    continue;
                }
                cells.push(FfiScheduleCell {
                    date: date.to_string(),
                    slot: row.slot.clone(),
                    appointments: appointments.into_iter().cloned().map(Into::into).collect(),
                });
            }
        }
        Self {
            dates: dates.iter().map(ToString::to_string).collect(),
            slots: grid.slots().to_vec(),
            cells,
            unslotted: grid.unslotted().into_iter().cloned().map(Into::into).collect(),
        }
    }
}

/// FFI-safe invoice line. `unit_price` is a decimal string.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInvoiceLine {
    pub description: String,
    pub quantity: u32,
    pub unit_price: String,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewInvoice {
    pub patient_id: String,
    pub items: Vec<FfiInvoiceLine>,
    pub tax_amount: Option<String>,
    pub discount_amount: Option<String>,
    pub due_date: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<FfiNewInvoice> for models::NewInvoice {
    type Error = ClinicCoreError;

    fn try_from(new: FfiNewInvoice) -> Result<Self, Self::Error> {
        let items = new
            .items
            .into_iter()
            .map(|line| {
                Ok(models::NewInvoiceItem::new(
                    line.description,
                    line.quantity,
                    parse_money("unit_price", &line.unit_price)?,
                ))
            })
            .collect::<Result<Vec<_>, ClinicCoreError>>()?;
        let optional_money = |field: &str, value: Option<String>| -> Result<Decimal, ClinicCoreError> {
            value.map_or(Ok(Decimal::ZERO), |v| parse_money(field, &v))
        };

        Ok(models::NewInvoice {
            patient_id: new.patient_id,
            items,
            tax_amount: optional_money("tax_amount", new.tax_amount)?,
            discount_amount: optional_money("discount_amount", new.discount_amount)?,
            due_date: new.due_date.map(|d| parse_date("due_date", &d)).transpose()?,
            notes: new.notes,
        })
    }
}

/// FFI-safe invoice. Money fields are decimal strings.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInvoice {
    pub id: String,
    pub invoice_number: String,
    pub patient_id: String,
    pub status: String,
    pub subtotal: String,
    pub tax_amount: String,
    pub discount_amount: String,
    pub total_amount: String,
    pub paid_amount: String,
    pub balance_due: String,
    pub due_date: Option<String>,
}

impl From<Invoice> for FfiInvoice {
    fn from(invoice: Invoice) -> Self {
        Self {
            balance_due: invoice.balance_due().to_string(),
            id: invoice.id,
            invoice_number: invoice.invoice_number,
            patient_id: invoice.patient_id,
            status: invoice.status.as_str().to_string(),
            subtotal: invoice.subtotal.to_string(),
            tax_amount: invoice.tax_amount.to_string(),
            discount_amount: invoice.discount_amount.to_string(),
            total_amount: invoice.total_amount.to_string(),
            paid_amount: invoice.paid_amount.to_string(),
            due_date: invoice.due_date.map(|d| d.to_string()),
        }
    }
}

/// FFI-safe inventory item.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInventoryItem {
    pub id: String,
    pub name: String,
    pub sku: Option<String>,
    pub unit: String,
    pub quantity: u32,
    pub min_quantity: u32,
    pub is_low_stock: bool,
    pub expiry_date: Option<String>,
}

impl From<InventoryItem> for FfiInventoryItem {
    fn from(item: InventoryItem) -> Self {
        Self {
            is_low_stock: item.is_low_stock(),
            id: item.id,
            name: item.name,
            sku: item.sku,
            unit: item.unit,
            quantity: item.quantity,
            min_quantity: item.min_quantity,
            expiry_date: item.expiry_date.map(|d| d.to_string()),
        }
    }
}
