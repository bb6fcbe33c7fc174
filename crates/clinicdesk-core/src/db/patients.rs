//! Patient database operations, including allergies, medications and
//! medical history.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{enum_from_sql, Database, DbError, DbResult};
use crate::context::TenantContext;
use crate::models::{
    AllergySeverity, ConditionStatus, Gender, MedicalHistoryEntry, Patient, PatientAllergy,
    PatientMedication,
};

const PATIENT_COLUMNS: &str = "id, clinic_id, first_name, last_name, email, phone, date_of_birth, \
     gender, blood_type, address, city, emergency_contact_name, emergency_contact_phone, \
     emergency_contact_relation, notes, is_active, created_at, updated_at";

impl Database {
    /// Insert a new patient into the acting clinic.
    pub fn insert_patient(&self, ctx: &TenantContext, patient: &Patient) -> DbResult<()> {
        if patient.clinic_id != ctx.clinic_id {
            return Err(DbError::TenantMismatch(format!("patient {}", patient.id)));
        }
        self.conn.execute(
            &format!("INSERT INTO patients ({PATIENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"),
            params![
                patient.id,
                patient.clinic_id,
                patient.first_name,
                patient.last_name,
                patient.email,
                patient.phone,
                patient.date_of_birth,
                patient.gender.map(Gender::as_str),
                patient.blood_type,
                patient.address,
                patient.city,
                patient.emergency_contact_name,
                patient.emergency_contact_phone,
                patient.emergency_contact_relation,
                patient.notes,
                patient.is_active,
                patient.created_at,
                patient.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a patient by ID (active or not).
    pub fn get_patient(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1 AND clinic_id = ?2"),
                params![id, ctx.clinic_id],
                read_patient_row,
            )
            .optional()?
            .map(Patient::try_from)
            .transpose()
    }

    /// Overwrite the editable fields of an existing patient.
    pub fn update_patient(&self, ctx: &TenantContext, patient: &Patient) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                first_name = ?3, last_name = ?4, email = ?5, phone = ?6,
                date_of_birth = ?7, gender = ?8, blood_type = ?9, address = ?10,
                city = ?11, emergency_contact_name = ?12, emergency_contact_phone = ?13,
                emergency_contact_relation = ?14, notes = ?15, updated_at = ?16
            WHERE id = ?1 AND clinic_id = ?2
            "#,
            params![
                patient.id,
                ctx.clinic_id,
                patient.first_name,
                patient.last_name,
                patient.email,
                patient.phone,
                patient.date_of_birth,
                patient.gender.map(Gender::as_str),
                patient.blood_type,
                patient.address,
                patient.city,
                patient.emergency_contact_name,
                patient.emergency_contact_phone,
                patient.emergency_contact_relation,
                patient.notes,
                patient.updated_at,
            ],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("patient {}", patient.id)));
        }
        Ok(())
    }

    /// Soft delete. Deactivating an inactive patient is a no-op.
    pub fn deactivate_patient(&self, ctx: &TenantContext, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            "UPDATE patients SET is_active = 0, updated_at = ?3 WHERE id = ?1 AND clinic_id = ?2",
            params![id, ctx.clinic_id, now],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("patient {id}")));
        }
        Ok(())
    }

    /// Active patients, ordered by last then first name.
    pub fn list_patients(&self, ctx: &TenantContext) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients
             WHERE clinic_id = ?1 AND is_active = 1
             ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE"
        ))?;
        let rows = stmt.query_map([&ctx.clinic_id], read_patient_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Active patients whose first or last name starts with `prefix`
    /// (case-insensitive).
    pub fn search_patients(&self, ctx: &TenantContext, prefix: &str, limit: u32) -> DbResult<Vec<Patient>> {
        let pattern = format!("{}%", escape_like(prefix.trim()));
        let mut stmt = self.conn.prepare(&format!(
            r"SELECT {PATIENT_COLUMNS} FROM patients
              WHERE clinic_id = ?1 AND is_active = 1
                AND (first_name LIKE ?2 ESCAPE '\' OR last_name LIKE ?2 ESCAPE '\')
              ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE
              LIMIT ?3"
        ))?;
        let rows = stmt.query_map(params![ctx.clinic_id, pattern, limit], read_patient_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Most recently registered active patients.
    pub fn recent_patients(&self, ctx: &TenantContext, limit: u32) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients
             WHERE clinic_id = ?1 AND is_active = 1
             ORDER BY created_at DESC
             LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![ctx.clinic_id, limit], read_patient_row)?;
        rows.map(|row| Patient::try_from(row?)).collect()
    }

    pub fn count_active_patients(&self, ctx: &TenantContext) -> DbResult<u32> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM patients WHERE clinic_id = ?1 AND is_active = 1",
            [&ctx.clinic_id],
            |row| row.get(0),
        )?)
    }

    /// Check that `patient_id` may be referenced from the acting clinic.
    pub(crate) fn ensure_patient(&self, ctx: &TenantContext, patient_id: &str) -> DbResult<()> {
        let owner: Option<String> = self
            .conn
            .query_row("SELECT clinic_id FROM patients WHERE id = ?1", [patient_id], |row| row.get(0))
            .optional()?;
        match owner {
            Some(clinic) if clinic == ctx.clinic_id => Ok(()),
            Some(_) => Err(DbError::TenantMismatch(format!("patient {patient_id}"))),
            None => Err(DbError::NotFound(format!("patient {patient_id}"))),
        }
    }

    // =========================================================================
    // Allergies
    // =========================================================================

    pub fn insert_allergy(&self, ctx: &TenantContext, allergy: &PatientAllergy) -> DbResult<()> {
        self.ensure_patient(ctx, &allergy.patient_id)?;
        self.conn.execute(
            "INSERT INTO patient_allergies (id, patient_id, allergy_name, severity, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                allergy.id,
                allergy.patient_id,
                allergy.allergy_name,
                allergy.severity.as_str(),
                allergy.notes,
                allergy.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn list_allergies(&self, ctx: &TenantContext, patient_id: &str) -> DbResult<Vec<PatientAllergy>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT a.id, a.patient_id, a.allergy_name, a.severity, a.notes, a.created_at
            FROM patient_allergies a
            JOIN patients p ON p.id = a.patient_id
            WHERE a.patient_id = ?1 AND p.clinic_id = ?2
            ORDER BY a.allergy_name
            "#,
        )?;
        let rows = stmt.query_map(params![patient_id, ctx.clinic_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, DateTime<Utc>>(5)?,
            ))
        })?;

        let mut allergies = Vec::new();
        for row in rows {
            let (id, patient_id, allergy_name, severity, notes, created_at) = row?;
            allergies.push(PatientAllergy {
                id,
                patient_id,
                allergy_name,
                severity: enum_from_sql("severity", &severity, AllergySeverity::parse)?,
                notes,
                created_at,
            });
        }
        Ok(allergies)
    }

    /// Hard delete of an allergy record.
    pub fn delete_allergy(&self, ctx: &TenantContext, allergy_id: &str) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            DELETE FROM patient_allergies
            WHERE id = ?1
              AND patient_id IN (SELECT id FROM patients WHERE clinic_id = ?2)
            "#,
            params![allergy_id, ctx.clinic_id],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("allergy {allergy_id}")));
        }
        Ok(())
    }

    // =========================================================================
    // Medications
    // =========================================================================

    pub fn insert_medication(&self, ctx: &TenantContext, medication: &PatientMedication) -> DbResult<()> {
        self.ensure_patient(ctx, &medication.patient_id)?;
        self.conn.execute(
            r#"
            INSERT INTO patient_medications (
                id, patient_id, medication_name, dosage, frequency, start_date,
                end_date, prescribing_doctor, is_active, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                medication.id,
                medication.patient_id,
                medication.medication_name,
                medication.dosage,
                medication.frequency,
                medication.start_date,
                medication.end_date,
                medication.prescribing_doctor,
                medication.is_active,
                medication.notes,
                medication.created_at,
            ],
        )?;
        Ok(())
    }

    /// Medications currently taken by the patient.
    pub fn list_active_medications(
        &self,
        ctx: &TenantContext,
        patient_id: &str,
    ) -> DbResult<Vec<PatientMedication>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT m.id, m.patient_id, m.medication_name, m.dosage, m.frequency,
                   m.start_date, m.end_date, m.prescribing_doctor, m.is_active,
                   m.notes, m.created_at
            FROM patient_medications m
            JOIN patients p ON p.id = m.patient_id
            WHERE m.patient_id = ?1 AND p.clinic_id = ?2 AND m.is_active = 1
            ORDER BY m.medication_name
            "#,
        )?;
        let rows = stmt.query_map(params![patient_id, ctx.clinic_id], |row| {
            Ok(PatientMedication {
                id: row.get(0)?,
                patient_id: row.get(1)?,
                medication_name: row.get(2)?,
                dosage: row.get(3)?,
                frequency: row.get(4)?,
                start_date: row.get(5)?,
                end_date: row.get(6)?,
                prescribing_doctor: row.get(7)?,
                is_active: row.get(8)?,
                notes: row.get(9)?,
                created_at: row.get(10)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // =========================================================================
    // Medical history
    // =========================================================================

    pub fn insert_history_entry(&self, ctx: &TenantContext, entry: &MedicalHistoryEntry) -> DbResult<()> {
        self.ensure_patient(ctx, &entry.patient_id)?;
        self.conn.execute(
            "INSERT INTO patient_medical_history (id, patient_id, condition, diagnosis_date, status, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.patient_id,
                entry.condition,
                entry.diagnosis_date,
                entry.status.as_str(),
                entry.notes,
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    /// Medical history, most recent diagnosis first.
    pub fn list_medical_history(
        &self,
        ctx: &TenantContext,
        patient_id: &str,
    ) -> DbResult<Vec<MedicalHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT h.id, h.patient_id, h.condition, h.diagnosis_date, h.status, h.notes, h.created_at
            FROM patient_medical_history h
            JOIN patients p ON p.id = h.patient_id
            WHERE h.patient_id = ?1 AND p.clinic_id = ?2
            ORDER BY h.diagnosis_date IS NULL, h.diagnosis_date DESC, h.created_at DESC
            "#,
        )?;
        let rows = stmt.query_map(params![patient_id, ctx.clinic_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<NaiveDate>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, DateTime<Utc>>(6)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, patient_id, condition, diagnosis_date, status, notes, created_at) = row?;
            entries.push(MedicalHistoryEntry {
                id,
                patient_id,
                condition,
                diagnosis_date,
                status: enum_from_sql("status", &status, ConditionStatus::parse)?,
                notes,
                created_at,
            });
        }
        Ok(entries)
    }
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Internal row type for database mapping.
struct PatientRow {
    id: String,
    clinic_id: String,
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone: Option<String>,
    date_of_birth: Option<NaiveDate>,
    gender: Option<String>,
    blood_type: Option<String>,
    address: Option<String>,
    city: Option<String>,
    emergency_contact_name: Option<String>,
    emergency_contact_phone: Option<String>,
    emergency_contact_relation: Option<String>,
    notes: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn read_patient_row(row: &Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        date_of_birth: row.get(6)?,
        gender: row.get(7)?,
        blood_type: row.get(8)?,
        address: row.get(9)?,
        city: row.get(10)?,
        emergency_contact_name: row.get(11)?,
        emergency_contact_phone: row.get(12)?,
        emergency_contact_relation: row.get(13)?,
        notes: row.get(14)?,
        is_active: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let gender = row
            .gender
            .as_deref()
            .map(|g| enum_from_sql("gender", g, Gender::parse))
            .transpose()?;

        Ok(Patient {
            id: row.id,
            clinic_id: row.clinic_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            date_of_birth: row.date_of_birth,
            gender,
            blood_type: row.blood_type,
            address: row.address,
            city: row.city,
            emergency_contact_name: row.emergency_contact_name,
            emergency_contact_phone: row.emergency_contact_phone,
            emergency_contact_relation: row.emergency_contact_relation,
            notes: row.notes,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
