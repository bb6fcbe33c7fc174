//! Appointment booking, status changes and cached schedule reads.

use chrono::NaiveDate;
use tracing::{info, warn};

use super::{ClinicService, ServiceError, ServiceResult};
use crate::cache::{AppointmentQuery, QueryScope};
use crate::context::TenantContext;
use crate::db::DbError;
use crate::models::{Appointment, AppointmentStatus, AppointmentUpdate, NewAppointment};
use crate::scheduler::week_of;
use crate::validation::{validate_appointment_update, validate_new_appointment, ValidationError, ValidationErrors};

const SCHEDULE_SCOPES: [QueryScope; 2] = [QueryScope::Appointments, QueryScope::Dashboard];

impl ClinicService {
    pub fn book_appointment(&self, ctx: &TenantContext, new: &NewAppointment) -> ServiceResult<Appointment> {
        validate_new_appointment(new)?;

        let appointment = Appointment::new(ctx.clinic_id.clone(), new.clone(), self.clock.now());
        self.check_slot(ctx, &appointment)?;
        self.db.insert_appointment(ctx, &appointment)?;

        info!(
            clinic_id = %ctx.clinic_id,
            appointment_id = %appointment.id,
            date = %appointment.scheduled_date,
            start = %appointment.start_label(),
            "booked appointment"
        );
        self.invalidate(ctx, &SCHEDULE_SCOPES);
        Ok(appointment)
    }

    /// Partial update of everything but status.
    pub fn update_appointment(
        &self,
        ctx: &TenantContext,
        id: &str,
        update: &AppointmentUpdate,
    ) -> ServiceResult<Appointment> {
        validate_appointment_update(update)?;

        let mut appointment = self.require_appointment(ctx, id)?;
        appointment.apply(update);
        if appointment.start_time >= appointment.end_time {
            return Err(ValidationErrors(vec![ValidationError::new(
                "end_time",
                format!(
                    "must be after start_time ({} >= {})",
                    appointment.start_time, appointment.end_time
                ),
            )])
            .into());
        }
        appointment.updated_at = self.clock.now();

        self.check_slot(ctx, &appointment)?;
        self.db.update_appointment(ctx, &appointment)?;
        self.invalidate(ctx, &SCHEDULE_SCOPES);
        Ok(appointment)
    }

    /// Move an appointment to `status`, subject to the configured
    /// transition policy.
    pub fn set_appointment_status(
        &self,
        ctx: &TenantContext,
        id: &str,
        status: AppointmentStatus,
    ) -> ServiceResult<Appointment> {
        let mut appointment = self.require_appointment(ctx, id)?;
        let from = appointment.status;
        if !self.config.transition_policy.allows(from, status) {
            warn!(
                clinic_id = %ctx.clinic_id,
                appointment_id = %id,
                from = from.as_str(),
                to = status.as_str(),
                "rejected appointment status change"
            );
            return Err(ServiceError::InvalidTransition { from, to: status });
        }
        if from == status {
            return Ok(appointment);
        }
        if !from.occupies_slot() && status.occupies_slot() {
            let mut revived = appointment.clone();
            revived.status = status;
            self.check_slot(ctx, &revived)?;
        }

        let now = self.clock.now();
        self.db.set_appointment_status(ctx, id, status, now)?;
        appointment.status = status;
        appointment.updated_at = now;

        info!(
            clinic_id = %ctx.clinic_id,
            appointment_id = %id,
            from = from.as_str(),
            to = status.as_str(),
            "appointment status changed"
        );
        self.invalidate(ctx, &SCHEDULE_SCOPES);
        Ok(appointment)
    }

    pub fn delete_appointment(&self, ctx: &TenantContext, id: &str) -> ServiceResult<()> {
        self.db.delete_appointment(ctx, id)?;
        info!(clinic_id = %ctx.clinic_id, appointment_id = %id, "deleted appointment");
        self.invalidate(ctx, &SCHEDULE_SCOPES);
        Ok(())
    }

    pub fn get_appointment(&self, ctx: &TenantContext, id: &str) -> ServiceResult<Option<Appointment>> {
        Ok(self.db.get_appointment(ctx, id)?)
    }

    pub fn list_appointments(&self, ctx: &TenantContext) -> ServiceResult<Vec<Appointment>> {
        self.cached_appointments(ctx, AppointmentQuery::All)
    }

    pub fn appointments_on(&self, ctx: &TenantContext, date: NaiveDate) -> ServiceResult<Vec<Appointment>> {
        self.cached_appointments(ctx, AppointmentQuery::OnDate(date))
    }

    pub fn appointments_between(
        &self,
        ctx: &TenantContext,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ServiceResult<Vec<Appointment>> {
        self.cached_appointments(ctx, AppointmentQuery::Range { from, to })
    }

    /// Appointments of the Sunday-started week containing `reference`.
    pub fn week_appointments(&self, ctx: &TenantContext, reference: NaiveDate) -> ServiceResult<Vec<Appointment>> {
        let dates = week_of(reference);
        self.appointments_between(ctx, dates[0], dates[6])
    }

    /// Scheduled or confirmed appointments from today on.
    pub fn upcoming_appointments(&self, ctx: &TenantContext, limit: u32) -> ServiceResult<Vec<Appointment>> {
        self.cached_appointments(
            ctx,
            AppointmentQuery::Upcoming {
                from: self.clock.today(),
                limit,
            },
        )
    }

    fn cached_appointments(&self, ctx: &TenantContext, query: AppointmentQuery) -> ServiceResult<Vec<Appointment>> {
        if let Some(rows) = self.cache.appointments(&ctx.clinic_id, &query) {
            return Ok(rows);
        }
        let rows = match &query {
            AppointmentQuery::All => self.db.list_appointments(ctx)?,
            AppointmentQuery::OnDate(date) => self.db.appointments_on(ctx, *date)?,
            AppointmentQuery::Range { from, to } => self.db.appointments_between(ctx, *from, *to)?,
            AppointmentQuery::Upcoming { from, limit } => self.db.upcoming_appointments(ctx, *from, *limit)?,
        };
        self.cache.store_appointments(&ctx.clinic_id, query, rows.clone());
        Ok(rows)
    }

    fn require_appointment(&self, ctx: &TenantContext, id: &str) -> ServiceResult<Appointment> {
        Ok(self
            .db
            .get_appointment(ctx, id)?
            .ok_or_else(|| DbError::NotFound(format!("appointment {id}")))?)
    }

    /// Reject overlapping bookings when the clinic asks for it.
    fn check_slot(&self, ctx: &TenantContext, appointment: &Appointment) -> ServiceResult<()> {
        if !self.config.reject_overlapping_appointments || !appointment.status.occupies_slot() {
            return Ok(());
        }
        let clashes = self.db.overlapping_appointments(ctx, appointment)?;
        if let Some(clash) = clashes.first() {
            warn!(
                clinic_id = %ctx.clinic_id,
                date = %appointment.scheduled_date,
                clash_id = %clash.id,
                "rejected overlapping appointment"
            );
            return Err(ServiceError::SlotTaken(format!(
                "{} {}-{} overlaps {} ({})",
                appointment.scheduled_date,
                appointment.start_time.format("%H:%M"),
                appointment.end_time.format("%H:%M"),
                clash.title,
                clash.start_label()
            )));
        }
        Ok(())
    }
}
