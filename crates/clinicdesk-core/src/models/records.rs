//! Clinical chart entries (examination records) and their attachments.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One charted visit for a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalRecord {
    pub id: String,
    pub clinic_id: String,
    pub patient_id: String,
    /// Date of the visit being charted, not of data entry
    pub record_date: NaiveDate,
    pub chief_complaint: String,
    pub history_of_complaint: Option<String>,
    pub dental_history: Option<String>,
    pub medical_history: Option<String>,
    pub family_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
    pub extra_oral_examination: Option<String>,
    pub intra_oral_examination: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub notes: Option<String>,
    /// Acting user at creation
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicalRecord {
    /// Build a record from input. `record_date` defaults to `today`.
    pub fn new(
        clinic_id: String,
        created_by: Option<String>,
        new: NewMedicalRecord,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            clinic_id,
            patient_id: new.patient_id,
            record_date: new.record_date.unwrap_or(today),
            chief_complaint: new.chief_complaint.trim().to_string(),
            history_of_complaint: new.history_of_complaint,
            dental_history: new.dental_history,
            medical_history: new.medical_history,
            family_history: new.family_history,
            current_medications: new.current_medications,
            allergies: new.allergies,
            extra_oral_examination: new.extra_oral_examination,
            intra_oral_examination: new.intra_oral_examination,
            diagnosis: new.diagnosis,
            treatment_plan: new.treatment_plan,
            notes: new.notes,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update. Fields left as `None` are untouched.
    pub fn apply(&mut self, update: &MedicalRecordUpdate) {
        if let Some(v) = update.record_date {
            self.record_date = v;
        }
        if let Some(v) = &update.chief_complaint {
            self.chief_complaint = v.trim().to_string();
        }
        let text_fields = [
            (&mut self.history_of_complaint, &update.history_of_complaint),
            (&mut self.dental_history, &update.dental_history),
            (&mut self.medical_history, &update.medical_history),
            (&mut self.family_history, &update.family_history),
            (&mut self.current_medications, &update.current_medications),
            (&mut self.allergies, &update.allergies),
            (&mut self.extra_oral_examination, &update.extra_oral_examination),
            (&mut self.intra_oral_examination, &update.intra_oral_examination),
            (&mut self.diagnosis, &update.diagnosis),
            (&mut self.treatment_plan, &update.treatment_plan),
            (&mut self.notes, &update.notes),
        ];
        for (field, value) in text_fields {
            if let Some(v) = value {
                *field = Some(v.clone());
            }
        }
    }
}

/// Input for charting a visit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewMedicalRecord {
    pub patient_id: String,
    pub record_date: Option<NaiveDate>,
    pub chief_complaint: String,
    pub history_of_complaint: Option<String>,
    pub dental_history: Option<String>,
    pub medical_history: Option<String>,
    pub family_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
    pub extra_oral_examination: Option<String>,
    pub intra_oral_examination: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub notes: Option<String>,
}

impl NewMedicalRecord {
    pub fn new(patient_id: impl Into<String>, chief_complaint: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            chief_complaint: chief_complaint.into(),
            ..Default::default()
        }
    }
}

/// Partial record update. Patient and author never change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MedicalRecordUpdate {
    pub record_date: Option<NaiveDate>,
    pub chief_complaint: Option<String>,
    pub history_of_complaint: Option<String>,
    pub dental_history: Option<String>,
    pub medical_history: Option<String>,
    pub family_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
    pub extra_oral_examination: Option<String>,
    pub intra_oral_examination: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub notes: Option<String>,
}

/// File attached to a record (radiograph, photo, referral letter).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordAttachment {
    pub id: String,
    pub record_id: String,
    pub file_name: String,
    pub file_url: String,
    pub file_type: Option<String>,
    pub uploaded_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewRecordAttachment {
    pub file_name: String,
    pub file_url: String,
    pub file_type: Option<String>,
}

/// A record with its attachments, oldest attachment first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalRecordDetail {
    pub record: MedicalRecord,
    pub attachments: Vec<RecordAttachment>,
}
