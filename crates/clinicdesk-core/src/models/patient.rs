//! Patient models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Administrative gender as captured at registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// A patient record owned by a single clinic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// UUID, generated locally
    pub id: String,
    /// Owning clinic (tenant)
    pub clinic_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_type: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relation: Option<String>,
    pub notes: Option<String>,
    /// Soft-delete flag; inactive patients are hidden from lists
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Create a new active patient with required fields.
    pub fn new(clinic_id: String, first_name: String, last_name: String, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            clinic_id,
            first_name,
            last_name,
            email: None,
            phone: None,
            date_of_birth: None,
            gender: None,
            blood_type: None,
            address: None,
            city: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            emergency_contact_relation: None,
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// "First Last", as shown in lists and on invoices.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on `today`, if the date of birth is known.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        self.date_of_birth.and_then(|dob| today.years_since(dob))
    }

    /// Apply a partial update. Fields left as `None` are untouched.
    pub fn apply(&mut self, update: &PatientUpdate) {
        if let Some(v) = &update.first_name {
            self.first_name = v.clone();
        }
        if let Some(v) = &update.last_name {
            self.last_name = v.clone();
        }
        if let Some(v) = &update.email {
            self.email = Some(v.clone());
        }
        if let Some(v) = &update.phone {
            self.phone = Some(v.clone());
        }
        if let Some(v) = update.date_of_birth {
            self.date_of_birth = Some(v);
        }
        if let Some(v) = update.gender {
            self.gender = Some(v);
        }
        if let Some(v) = &update.blood_type {
            self.blood_type = Some(v.clone());
        }
        if let Some(v) = &update.address {
            self.address = Some(v.clone());
        }
        if let Some(v) = &update.city {
            self.city = Some(v.clone());
        }
        if let Some(v) = &update.emergency_contact_name {
            self.emergency_contact_name = Some(v.clone());
        }
        if let Some(v) = &update.emergency_contact_phone {
            self.emergency_contact_phone = Some(v.clone());
        }
        if let Some(v) = &update.emergency_contact_relation {
            self.emergency_contact_relation = Some(v.clone());
        }
        if let Some(v) = &update.notes {
            self.notes = Some(v.clone());
        }
    }
}

/// Partial patient update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_type: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relation: Option<String>,
    pub notes: Option<String>,
}

/// Allergy severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AllergySeverity {
    Mild,
    Moderate,
    Severe,
}

impl AllergySeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mild" => Some(Self::Mild),
            "moderate" => Some(Self::Moderate),
            "severe" => Some(Self::Severe),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientAllergy {
    pub id: String,
    pub patient_id: String,
    pub allergy_name: String,
    pub severity: AllergySeverity,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientMedication {
    pub id: String,
    pub patient_id: String,
    pub medication_name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub prescribing_doctor: Option<String>,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Status of a condition in the medical history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionStatus {
    Active,
    Resolved,
    Chronic,
}

impl ConditionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Resolved => "resolved",
            Self::Chronic => "chronic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "resolved" => Some(Self::Resolved),
            "chronic" => Some(Self::Chronic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalHistoryEntry {
    pub id: String,
    pub patient_id: String,
    pub condition: String,
    pub diagnosis_date: Option<NaiveDate>,
    pub status: ConditionStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording an allergy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAllergy {
    pub allergy_name: String,
    pub severity: AllergySeverity,
    pub notes: Option<String>,
}

/// Input for recording a medication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMedication {
    pub medication_name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub prescribing_doctor: Option<String>,
    pub notes: Option<String>,
}

/// Input for a medical history entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewHistoryEntry {
    pub condition: String,
    pub diagnosis_date: Option<NaiveDate>,
    pub status: ConditionStatus,
    pub notes: Option<String>,
}
