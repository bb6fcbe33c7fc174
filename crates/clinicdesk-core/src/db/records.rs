//! Medical record (chart) storage and attachments.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::context::TenantContext;
use crate::models::{MedicalRecord, MedicalRecordDetail, RecordAttachment};

const RECORD_COLUMNS: &str = "id, clinic_id, patient_id, record_date, chief_complaint, \
     history_of_complaint, dental_history, medical_history, family_history, current_medications, \
     allergies, extra_oral_examination, intra_oral_examination, diagnosis, treatment_plan, notes, \
     created_by, created_at, updated_at";

impl Database {
    pub fn insert_medical_record(&self, ctx: &TenantContext, record: &MedicalRecord) -> DbResult<()> {
        if record.clinic_id != ctx.clinic_id {
            return Err(DbError::TenantMismatch(format!("medical record {}", record.id)));
        }
        self.ensure_patient(ctx, &record.patient_id)?;
        self.conn.execute(
            &format!(
                "INSERT INTO medical_records ({RECORD_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
            ),
            params![
                record.id,
                record.clinic_id,
                record.patient_id,
                record.record_date,
                record.chief_complaint,
                record.history_of_complaint,
                record.dental_history,
                record.medical_history,
                record.family_history,
                record.current_medications,
                record.allergies,
                record.extra_oral_examination,
                record.intra_oral_examination,
                record.diagnosis,
                record.treatment_plan,
                record.notes,
                record.created_by,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_medical_record(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<MedicalRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM medical_records WHERE id = ?1 AND clinic_id = ?2"),
                params![id, ctx.clinic_id],
                read_record_row,
            )
            .optional()?
            .map(MedicalRecord::from))
    }

    /// Record with its attachments.
    pub fn medical_record_detail(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<MedicalRecordDetail>> {
        let Some(record) = self.get_medical_record(ctx, id)? else {
            return Ok(None);
        };
        let attachments = self.list_record_attachments(ctx, id)?;
        Ok(Some(MedicalRecordDetail { record, attachments }))
    }

    /// Overwrite the editable fields. Patient, author and creation time stay.
    pub fn update_medical_record(&self, ctx: &TenantContext, record: &MedicalRecord) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE medical_records SET
                record_date = ?3, chief_complaint = ?4, history_of_complaint = ?5,
                dental_history = ?6, medical_history = ?7, family_history = ?8,
                current_medications = ?9, allergies = ?10, extra_oral_examination = ?11,
                intra_oral_examination = ?12, diagnosis = ?13, treatment_plan = ?14,
                notes = ?15, updated_at = ?16
            WHERE id = ?1 AND clinic_id = ?2
            "#,
            params![
                record.id,
                ctx.clinic_id,
                record.record_date,
                record.chief_complaint,
                record.history_of_complaint,
                record.dental_history,
                record.medical_history,
                record.family_history,
                record.current_medications,
                record.allergies,
                record.extra_oral_examination,
                record.intra_oral_examination,
                record.diagnosis,
                record.treatment_plan,
                record.notes,
                record.updated_at,
            ],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("medical record {}", record.id)));
        }
        Ok(())
    }

    /// A patient's chart, newest visit first.
    pub fn list_medical_records(&self, ctx: &TenantContext, patient_id: &str) -> DbResult<Vec<MedicalRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM medical_records
             WHERE clinic_id = ?1 AND patient_id = ?2
             ORDER BY record_date DESC, created_at DESC"
        ))?;
        let rows = stmt.query_map(params![ctx.clinic_id, patient_id], read_record_row)?;
        Ok(rows
            .map(|row| row.map(MedicalRecord::from))
            .collect::<Result<Vec<_>, _>>()?)
    }

    // =========================================================================
    // Attachments
    // =========================================================================

    pub fn insert_record_attachment(&self, ctx: &TenantContext, attachment: &RecordAttachment) -> DbResult<()> {
        if self.get_medical_record(ctx, &attachment.record_id)?.is_none() {
            return Err(DbError::NotFound(format!("medical record {}", attachment.record_id)));
        }
        self.conn.execute(
            "INSERT INTO medical_record_attachments (id, record_id, file_name, file_url, file_type, uploaded_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                attachment.id,
                attachment.record_id,
                attachment.file_name,
                attachment.file_url,
                attachment.file_type,
                attachment.uploaded_by,
                attachment.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn list_record_attachments(&self, ctx: &TenantContext, record_id: &str) -> DbResult<Vec<RecordAttachment>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT a.id, a.record_id, a.file_name, a.file_url, a.file_type, a.uploaded_by, a.created_at
            FROM medical_record_attachments a
            JOIN medical_records r ON r.id = a.record_id
            WHERE a.record_id = ?1 AND r.clinic_id = ?2
            ORDER BY a.created_at, a.file_name
            "#,
        )?;
        let rows = stmt.query_map(params![record_id, ctx.clinic_id], |row| {
            Ok(RecordAttachment {
                id: row.get(0)?,
                record_id: row.get(1)?,
                file_name: row.get(2)?,
                file_url: row.get(3)?,
                file_type: row.get(4)?,
                uploaded_by: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

/// Internal row type for database mapping.
struct RecordRow {
    id: String,
    clinic_id: String,
    patient_id: String,
    record_date: NaiveDate,
    chief_complaint: String,
    history_of_complaint: Option<String>,
    dental_history: Option<String>,
    medical_history: Option<String>,
    family_history: Option<String>,
    current_medications: Option<String>,
    allergies: Option<String>,
    extra_oral_examination: Option<String>,
    intra_oral_examination: Option<String>,
    diagnosis: Option<String>,
    treatment_plan: Option<String>,
    notes: Option<String>,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn read_record_row(row: &Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        patient_id: row.get(2)?,
        record_date: row.get(3)?,
        chief_complaint: row.get(4)?,
        history_of_complaint: row.get(5)?,
        dental_history: row.get(6)?,
        medical_history: row.get(7)?,
        family_history: row.get(8)?,
        current_medications: row.get(9)?,
        allergies: row.get(10)?,
        extra_oral_examination: row.get(11)?,
        intra_oral_examination: row.get(12)?,
        diagnosis: row.get(13)?,
        treatment_plan: row.get(14)?,
        notes: row.get(15)?,
        created_by: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

impl From<RecordRow> for MedicalRecord {
    fn from(row: RecordRow) -> Self {
        MedicalRecord {
            id: row.id,
            clinic_id: row.clinic_id,
            patient_id: row.patient_id,
            record_date: row.record_date,
            chief_complaint: row.chief_complaint,
            history_of_complaint: row.history_of_complaint,
            dental_history: row.dental_history,
            medical_history: row.medical_history,
            family_history: row.family_history,
            current_medications: row.current_medications,
            allergies: row.allergies,
            extra_oral_examination: row.extra_oral_examination,
            intra_oral_examination: row.intra_oral_examination,
            diagnosis: row.diagnosis,
            treatment_plan: row.treatment_plan,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
