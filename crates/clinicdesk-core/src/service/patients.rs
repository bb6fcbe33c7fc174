//! Patient records and their clinical sub-records.

use tracing::info;

use super::{ClinicService, ServiceResult};
use crate::cache::QueryScope;
use crate::context::TenantContext;
use crate::db::DbError;
use crate::models::{
    MedicalHistoryEntry, NewAllergy, NewHistoryEntry, NewMedication, Patient, PatientAllergy, PatientMedication,
    PatientUpdate,
};
use crate::validation::{validate_new_patient, validate_patient_update, ValidationError, ValidationErrors};

impl ClinicService {
    /// Register a patient with the given names and optional extra fields.
    pub fn register_patient(
        &self,
        ctx: &TenantContext,
        first_name: &str,
        last_name: &str,
        details: &PatientUpdate,
    ) -> ServiceResult<Patient> {
        validate_new_patient(first_name, last_name)?;
        validate_patient_update(details)?;

        let mut patient = Patient::new(
            ctx.clinic_id.clone(),
            first_name.trim().to_string(),
            last_name.trim().to_string(),
            self.clock.now(),
        );
        patient.apply(details);
        self.db.insert_patient(ctx, &patient)?;

        info!(clinic_id = %ctx.clinic_id, patient_id = %patient.id, "registered patient");
        self.invalidate(ctx, &[QueryScope::Dashboard]);
        Ok(patient)
    }

    pub fn get_patient(&self, ctx: &TenantContext, id: &str) -> ServiceResult<Option<Patient>> {
        Ok(self.db.get_patient(ctx, id)?)
    }

    pub fn update_patient(&self, ctx: &TenantContext, id: &str, update: &PatientUpdate) -> ServiceResult<Patient> {
        validate_patient_update(update)?;
        let mut patient = self
            .db
            .get_patient(ctx, id)?
            .ok_or_else(|| DbError::NotFound(format!("patient {id}")))?;
        patient.apply(update);
        patient.updated_at = self.clock.now();
        self.db.update_patient(ctx, &patient)?;

        self.invalidate(ctx, &[QueryScope::Dashboard]);
        Ok(patient)
    }

    /// Soft delete. Repeating it is harmless.
    pub fn deactivate_patient(&self, ctx: &TenantContext, id: &str) -> ServiceResult<()> {
        self.db.deactivate_patient(ctx, id, self.clock.now())?;
        info!(clinic_id = %ctx.clinic_id, patient_id = %id, "deactivated patient");
        self.invalidate(ctx, &[QueryScope::Dashboard]);
        Ok(())
    }

    pub fn list_patients(&self, ctx: &TenantContext) -> ServiceResult<Vec<Patient>> {
        Ok(self.db.list_patients(ctx)?)
    }

    pub fn search_patients(&self, ctx: &TenantContext, prefix: &str, limit: u32) -> ServiceResult<Vec<Patient>> {
        Ok(self.db.search_patients(ctx, prefix, limit)?)
    }

    pub fn recent_patients(&self, ctx: &TenantContext) -> ServiceResult<Vec<Patient>> {
        Ok(self.db.recent_patients(ctx, self.config.recent_patients_limit)?)
    }

    // =========================================================================
    // Clinical sub-records
    // =========================================================================

    pub fn add_allergy(&self, ctx: &TenantContext, patient_id: &str, new: &NewAllergy) -> ServiceResult<PatientAllergy> {
        require("allergy_name", &new.allergy_name)?;
        let allergy = PatientAllergy {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: patient_id.to_string(),
            allergy_name: new.allergy_name.trim().to_string(),
            severity: new.severity,
            notes: new.notes.clone(),
            created_at: self.clock.now(),
        };
        self.db.insert_allergy(ctx, &allergy)?;
        Ok(allergy)
    }

    pub fn list_allergies(&self, ctx: &TenantContext, patient_id: &str) -> ServiceResult<Vec<PatientAllergy>> {
        Ok(self.db.list_allergies(ctx, patient_id)?)
    }

    pub fn remove_allergy(&self, ctx: &TenantContext, allergy_id: &str) -> ServiceResult<()> {
        Ok(self.db.delete_allergy(ctx, allergy_id)?)
    }

    pub fn add_medication(
        &self,
        ctx: &TenantContext,
        patient_id: &str,
        new: &NewMedication,
    ) -> ServiceResult<PatientMedication> {
        require("medication_name", &new.medication_name)?;
        if let (Some(start), Some(end)) = (new.start_date, new.end_date) {
            if end < start {
                return Err(ValidationErrors(vec![ValidationError::new(
                    "end_date",
                    format!("must not be before start_date ({end} < {start})"),
                )])
                .into());
            }
        }
        let medication = PatientMedication {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: patient_id.to_string(),
            medication_name: new.medication_name.trim().to_string(),
            dosage: new.dosage.clone(),
            frequency: new.frequency.clone(),
            start_date: new.start_date,
            end_date: new.end_date,
            prescribing_doctor: new.prescribing_doctor.clone(),
            is_active: true,
            notes: new.notes.clone(),
            created_at: self.clock.now(),
        };
        self.db.insert_medication(ctx, &medication)?;
        Ok(medication)
    }

    pub fn active_medications(&self, ctx: &TenantContext, patient_id: &str) -> ServiceResult<Vec<PatientMedication>> {
        Ok(self.db.list_active_medications(ctx, patient_id)?)
    }

    pub fn add_history_entry(
        &self,
        ctx: &TenantContext,
        patient_id: &str,
        new: &NewHistoryEntry,
    ) -> ServiceResult<MedicalHistoryEntry> {
        require("condition", &new.condition)?;
        let entry = MedicalHistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: patient_id.to_string(),
            condition: new.condition.trim().to_string(),
            diagnosis_date: new.diagnosis_date,
            status: new.status,
            notes: new.notes.clone(),
            created_at: self.clock.now(),
        };
        self.db.insert_history_entry(ctx, &entry)?;
        Ok(entry)
    }

    pub fn medical_history(&self, ctx: &TenantContext, patient_id: &str) -> ServiceResult<Vec<MedicalHistoryEntry>> {
        Ok(self.db.list_medical_history(ctx, patient_id)?)
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationErrors> {
    if value.trim().is_empty() {
        return Err(ValidationErrors(vec![ValidationError::new(field, "is required")]));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::ServiceError;
    use crate::models::{AllergySeverity, ConditionStatus, Gender};
    use crate::models::{NewAllergy, NewHistoryEntry, NewMedication, PatientUpdate};
    use chrono::NaiveDate;

    #[test]
    fn test_register_with_details() {
        let service = service();
        let ctx = reception("clinic-1");
        let details = PatientUpdate {
            gender: Some(Gender::Female),
            phone: Some("555-0100".into()),
            ..Default::default()
        };
        let patient = service.register_patient(&ctx, " Grace ", "Hopper", &details).unwrap();
        assert_eq!(patient.first_name, "Grace");
        assert_eq!(patient.gender, Some(Gender::Female));

        let loaded = service.get_patient(&ctx, &patient.id).unwrap().unwrap();
        assert_eq!(loaded, patient);
    }

    #[test]
    fn test_register_requires_names() {
        let service = service();
        let err = service
            .register_patient(&reception("clinic-1"), "", " ", &PatientUpdate::default())
            .unwrap_err();
        match err {
            ServiceError::Validation(errors) => {
                assert!(errors.has_field("first_name"));
                assert!(errors.has_field("last_name"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(service.list_patients(&reception("clinic-1")).unwrap().is_empty());
    }

    #[test]
    fn test_update_and_deactivate() {
        let service = service();
        let ctx = reception("clinic-1");
        let patient = patient(&service, &ctx);

        let update = PatientUpdate {
            city: Some("Kathmandu".into()),
            ..Default::default()
        };
        let updated = service.update_patient(&ctx, &patient.id, &update).unwrap();
        assert_eq!(updated.city.as_deref(), Some("Kathmandu"));
        assert_eq!(updated.last_name, "Lovelace");

        service.deactivate_patient(&ctx, &patient.id).unwrap();
        service.deactivate_patient(&ctx, &patient.id).unwrap();
        assert!(service.list_patients(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_other_clinic_cannot_update() {
        let service = service();
        let patient = patient(&service, &reception("clinic-1"));
        let err = service
            .update_patient(&reception("clinic-2"), &patient.id, &PatientUpdate::default())
            .unwrap_err();
        assert!(matches!(err, ServiceError::Database(crate::db::DbError::NotFound(_))));
    }

    #[test]
    fn test_clinical_sub_records() {
        let service = service();
        let ctx = reception("clinic-1");
        let patient = patient(&service, &ctx);

        let allergy = service
            .add_allergy(
                &ctx,
                &patient.id,
                &NewAllergy {
                    allergy_name: "Penicillin".into(),
                    severity: AllergySeverity::Severe,
                    notes: None,
                },
            )
            .unwrap();
        assert_eq!(service.list_allergies(&ctx, &patient.id).unwrap().len(), 1);
        service.remove_allergy(&ctx, &allergy.id).unwrap();
        assert!(service.list_allergies(&ctx, &patient.id).unwrap().is_empty());

        let bad_dates = NewMedication {
            medication_name: "Amoxicillin".into(),
            dosage: Some("500mg".into()),
            frequency: None,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 10),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            prescribing_doctor: None,
            notes: None,
        };
        assert!(matches!(
            service.add_medication(&ctx, &patient.id, &bad_dates),
            Err(ServiceError::Validation(_))
        ));
        let good = NewMedication {
            end_date: None,
            ..bad_dates
        };
        service.add_medication(&ctx, &patient.id, &good).unwrap();
        assert_eq!(service.active_medications(&ctx, &patient.id).unwrap().len(), 1);

        service
            .add_history_entry(
                &ctx,
                &patient.id,
                &NewHistoryEntry {
                    condition: "Hypertension".into(),
                    diagnosis_date: NaiveDate::from_ymd_opt(2020, 1, 1),
                    status: ConditionStatus::Chronic,
                    notes: None,
                },
            )
            .unwrap();
        let history = service.medical_history(&ctx, &patient.id).unwrap();
        assert_eq!(history[0].condition, "Hypertension");
    }
}
