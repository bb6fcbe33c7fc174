//! Appointment database operations.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{enum_from_sql, Database, DbError, DbResult};
use crate::context::TenantContext;
use crate::models::{Appointment, AppointmentStatus, AppointmentType};

const APPOINTMENT_COLUMNS: &str = "id, clinic_id, patient_id, provider_id, title, description, \
     appointment_type, status, scheduled_date, start_time, end_time, notes, telemedicine_link, \
     created_at, updated_at";

impl Database {
    /// Insert a new appointment. Patient and provider must belong to the
    /// acting clinic.
    pub fn insert_appointment(&self, ctx: &TenantContext, appointment: &Appointment) -> DbResult<()> {
        if appointment.clinic_id != ctx.clinic_id {
            return Err(DbError::TenantMismatch(format!("appointment {}", appointment.id)));
        }
        self.ensure_patient(ctx, &appointment.patient_id)?;
        if let Some(provider_id) = &appointment.provider_id {
            self.ensure_profile(ctx, provider_id)?;
        }

        self.conn.execute(
            &format!(
                "INSERT INTO appointments ({APPOINTMENT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            ),
            params![
                appointment.id,
                appointment.clinic_id,
                appointment.patient_id,
                appointment.provider_id,
                appointment.title,
                appointment.description,
                appointment.appointment_type.as_str(),
                appointment.status.as_str(),
                appointment.scheduled_date,
                appointment.start_time,
                appointment.end_time,
                appointment.notes,
                appointment.telemedicine_link,
                appointment.created_at,
                appointment.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_appointment(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<Appointment>> {
        self.conn
            .query_row(
                &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1 AND clinic_id = ?2"),
                params![id, ctx.clinic_id],
                read_appointment_row,
            )
            .optional()?
            .map(Appointment::try_from)
            .transpose()
    }

    /// Overwrite the editable fields (everything except status).
    pub fn update_appointment(&self, ctx: &TenantContext, appointment: &Appointment) -> DbResult<()> {
        if let Some(provider_id) = &appointment.provider_id {
            self.ensure_profile(ctx, provider_id)?;
        }
        let rows_affected = self.conn.execute(
            r#"
            UPDATE appointments SET
                provider_id = ?3, title = ?4, description = ?5, appointment_type = ?6,
                scheduled_date = ?7, start_time = ?8, end_time = ?9, notes = ?10,
                telemedicine_link = ?11, updated_at = ?12
            WHERE id = ?1 AND clinic_id = ?2
            "#,
            params![
                appointment.id,
                ctx.clinic_id,
                appointment.provider_id,
                appointment.title,
                appointment.description,
                appointment.appointment_type.as_str(),
                appointment.scheduled_date,
                appointment.start_time,
                appointment.end_time,
                appointment.notes,
                appointment.telemedicine_link,
                appointment.updated_at,
            ],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("appointment {}", appointment.id)));
        }
        Ok(())
    }

    /// Single-row status write.
    pub fn set_appointment_status(
        &self,
        ctx: &TenantContext,
        id: &str,
        status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            "UPDATE appointments SET status = ?3, updated_at = ?4 WHERE id = ?1 AND clinic_id = ?2",
            params![id, ctx.clinic_id, status.as_str(), now],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("appointment {id}")));
        }
        Ok(())
    }

    /// Hard delete.
    pub fn delete_appointment(&self, ctx: &TenantContext, id: &str) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            "DELETE FROM appointments WHERE id = ?1 AND clinic_id = ?2",
            params![id, ctx.clinic_id],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("appointment {id}")));
        }
        Ok(())
    }

    /// All appointments of the clinic, by date then start time.
    pub fn list_appointments(&self, ctx: &TenantContext) -> DbResult<Vec<Appointment>> {
        self.query_appointments(
            &format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                 WHERE clinic_id = ?1
                 ORDER BY scheduled_date, start_time"
            ),
            params![ctx.clinic_id],
        )
    }

    pub fn appointments_on(&self, ctx: &TenantContext, date: NaiveDate) -> DbResult<Vec<Appointment>> {
        self.query_appointments(
            &format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                 WHERE clinic_id = ?1 AND scheduled_date = ?2
                 ORDER BY start_time"
            ),
            params![ctx.clinic_id, date],
        )
    }

    /// Appointments with `from <= date <= to`.
    pub fn appointments_between(
        &self,
        ctx: &TenantContext,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<Appointment>> {
        self.query_appointments(
            &format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                 WHERE clinic_id = ?1 AND scheduled_date BETWEEN ?2 AND ?3
                 ORDER BY scheduled_date, start_time"
            ),
            params![ctx.clinic_id, from, to],
        )
    }

    /// Scheduled or confirmed appointments on or after `from`, soonest first.
    pub fn upcoming_appointments(
        &self,
        ctx: &TenantContext,
        from: NaiveDate,
        limit: u32,
    ) -> DbResult<Vec<Appointment>> {
        self.query_appointments(
            &format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                 WHERE clinic_id = ?1 AND scheduled_date >= ?2
                   AND status IN ('scheduled', 'confirmed')
                 ORDER BY scheduled_date, start_time
                 LIMIT ?3"
            ),
            params![ctx.clinic_id, from, limit],
        )
    }

    /// Live appointments on `date` overlapping `[start, end)` that share the
    /// provider or the patient.
    pub fn overlapping_appointments(
        &self,
        ctx: &TenantContext,
        candidate: &Appointment,
    ) -> DbResult<Vec<Appointment>> {
        let same_day = self.appointments_on(ctx, candidate.scheduled_date)?;
        Ok(same_day
            .into_iter()
            .filter(|other| other.id != candidate.id && other.status.occupies_slot())
            .filter(|other| {
                let same_provider = candidate.provider_id.is_some() && other.provider_id == candidate.provider_id;
                same_provider || other.patient_id == candidate.patient_id
            })
            .filter(|other| other.overlaps(candidate.scheduled_date, candidate.start_time, candidate.end_time))
            .collect())
    }

    fn query_appointments(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> DbResult<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, read_appointment_row)?;

        let mut appointments = Vec::new();
        for row in rows {
            appointments.push(row?.try_into()?);
        }
        Ok(appointments)
    }
}

/// Internal row type for database mapping.
struct AppointmentRow {
    id: String,
    clinic_id: String,
    patient_id: String,
    provider_id: Option<String>,
    title: String,
    description: Option<String>,
    appointment_type: String,
    status: String,
    scheduled_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    notes: Option<String>,
    telemedicine_link: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn read_appointment_row(row: &Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        patient_id: row.get(2)?,
        provider_id: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        appointment_type: row.get(6)?,
        status: row.get(7)?,
        scheduled_date: row.get(8)?,
        start_time: row.get(9)?,
        end_time: row.get(10)?,
        notes: row.get(11)?,
        telemedicine_link: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = DbError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: row.id,
            clinic_id: row.clinic_id,
            patient_id: row.patient_id,
            provider_id: row.provider_id,
            title: row.title,
            description: row.description,
            appointment_type: enum_from_sql("appointment_type", &row.appointment_type, AppointmentType::parse)?,
            status: enum_from_sql("status", &row.status, AppointmentStatus::parse)?,
            scheduled_date: row.scheduled_date,
            start_time: row.start_time,
            end_time: row.end_time,
            notes: row.notes,
            telemedicine_link: row.telemedicine_link,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
