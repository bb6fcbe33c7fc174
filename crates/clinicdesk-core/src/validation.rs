//! Input validation run before anything reaches the store.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{
    AppointmentUpdate, InventoryItemUpdate, MedicalRecordUpdate, NewAppointment, NewInventoryItem, NewInvoice,
    NewMedicalRecord, NewPayment, NewPortfolioItem, NewStaffBio, NewTestimonial, PatientUpdate,
};

/// A single rejected field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// All problems found in one input.
#[derive(Error, Debug, Clone, PartialEq, Eq, Default)]
#[error("validation failed: {}", join(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(ValidationError::new(field, message));
    }

    fn require(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "is required");
        }
    }

    fn require_opt(&mut self, field: &'static str, value: Option<&String>) {
        if let Some(v) = value {
            self.require(field, v);
        }
    }

    fn non_negative(&mut self, field: &'static str, value: Decimal) {
        if value < Decimal::ZERO {
            self.push(field, format!("must not be negative (got {value})"));
        }
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub fn validate_new_patient(first_name: &str, last_name: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.require("first_name", first_name);
    errors.require("last_name", last_name);
    errors.into_result()
}

pub fn validate_patient_update(update: &PatientUpdate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.require_opt("first_name", update.first_name.as_ref());
    errors.require_opt("last_name", update.last_name.as_ref());
    errors.into_result()
}

pub fn validate_new_medical_record(new: &NewMedicalRecord) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.require("patient_id", &new.patient_id);
    errors.require("chief_complaint", &new.chief_complaint);
    errors.into_result()
}

pub fn validate_medical_record_update(update: &MedicalRecordUpdate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.require_opt("chief_complaint", update.chief_complaint.as_ref());
    errors.into_result()
}

pub fn validate_new_appointment(new: &NewAppointment) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.require("patient_id", &new.patient_id);
    errors.require("title", &new.title);
    if new.start_time >= new.end_time {
        errors.push(
            "end_time",
            format!("must be after start_time ({} >= {})", new.start_time, new.end_time),
        );
    }
    errors.into_result()
}

pub fn validate_appointment_update(update: &AppointmentUpdate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.require_opt("title", update.title.as_ref());
    if let (Some(start), Some(end)) = (update.start_time, update.end_time) {
        if start >= end {
            errors.push("end_time", format!("must be after start_time ({start} >= {end})"));
        }
    }
    errors.into_result()
}

pub fn validate_new_invoice(new: &NewInvoice) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.require("patient_id", &new.patient_id);
    if new.items.is_empty() {
        errors.push("items", "at least one line item is required");
    }
    for item in &new.items {
        errors.require("items.description", &item.description);
        if item.quantity == 0 {
            errors.push("items.quantity", "must be greater than zero");
        }
        errors.non_negative("items.unit_price", item.unit_price);
    }
    errors.non_negative("tax_amount", new.tax_amount);
    errors.non_negative("discount_amount", new.discount_amount);

    if errors.is_empty() {
        let totals = crate::billing::compute_totals(&new.items, new.tax_amount, new.discount_amount);
        if totals.total_amount < Decimal::ZERO {
            errors.push("discount_amount", "exceeds subtotal plus tax");
        }
    }
    errors.into_result()
}

/// Tax/discount edit against an existing subtotal.
pub fn validate_adjustments(
    subtotal: Decimal,
    tax_amount: Decimal,
    discount_amount: Decimal,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.non_negative("tax_amount", tax_amount);
    errors.non_negative("discount_amount", discount_amount);
    if errors.is_empty() && subtotal + tax_amount - discount_amount < Decimal::ZERO {
        errors.push("discount_amount", "exceeds subtotal plus tax");
    }
    errors.into_result()
}

pub fn validate_new_payment(new: &NewPayment) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.require("invoice_id", &new.invoice_id);
    if new.amount <= Decimal::ZERO {
        errors.push("amount", format!("must be greater than zero (got {})", new.amount));
    }
    errors.into_result()
}

pub fn validate_new_inventory_item(new: &NewInventoryItem) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.require("name", &new.name);
    errors.require("unit", &new.unit);
    errors.non_negative("unit_cost", new.unit_cost);
    errors.non_negative("selling_price", new.selling_price);
    errors.into_result()
}

pub fn validate_inventory_update(update: &InventoryItemUpdate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.require_opt("name", update.name.as_ref());
    errors.require_opt("unit", update.unit.as_ref());
    if let Some(cost) = update.unit_cost {
        errors.non_negative("unit_cost", cost);
    }
    if let Some(price) = update.selling_price {
        errors.non_negative("selling_price", price);
    }
    errors.into_result()
}

pub fn validate_new_testimonial(new: &NewTestimonial) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.require("patient_name", &new.patient_name);
    errors.require("content", &new.content);
    if !(1..=5).contains(&new.rating) {
        errors.push("rating", format!("must be between 1 and 5 (got {})", new.rating));
    }
    errors.into_result()
}

pub fn validate_new_portfolio_item(new: &NewPortfolioItem) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.require("title", &new.title);
    errors.require("category", &new.category);
    errors.into_result()
}

pub fn validate_new_staff_bio(new: &NewStaffBio) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.require("name", &new.name);
    errors.require("title", &new.title);
    errors.into_result()
}
