//! Clinical chart: examination records and their attachments.

use tracing::info;

use super::{ClinicService, ServiceResult};
use crate::context::TenantContext;
use crate::db::DbError;
use crate::models::{
    MedicalRecord, MedicalRecordDetail, MedicalRecordUpdate, NewMedicalRecord, NewRecordAttachment, RecordAttachment,
};
use crate::validation::{validate_medical_record_update, validate_new_medical_record, ValidationError, ValidationErrors};

impl ClinicService {
    /// Chart a visit. The acting user is recorded as the author.
    pub fn create_medical_record(&self, ctx: &TenantContext, new: &NewMedicalRecord) -> ServiceResult<MedicalRecord> {
        validate_new_medical_record(new)?;
        let record = MedicalRecord::new(
            ctx.clinic_id.clone(),
            Some(ctx.user_id.clone()),
            new.clone(),
            self.clock.today(),
            self.clock.now(),
        );
        self.db.insert_medical_record(ctx, &record)?;

        info!(
            clinic_id = %ctx.clinic_id,
            patient_id = %record.patient_id,
            record_id = %record.id,
            "charted medical record"
        );
        Ok(record)
    }

    pub fn get_medical_record(&self, ctx: &TenantContext, id: &str) -> ServiceResult<Option<MedicalRecord>> {
        Ok(self.db.get_medical_record(ctx, id)?)
    }

    /// Record with its attachments.
    pub fn medical_record_detail(&self, ctx: &TenantContext, id: &str) -> ServiceResult<Option<MedicalRecordDetail>> {
        Ok(self.db.medical_record_detail(ctx, id)?)
    }

    pub fn update_medical_record(
        &self,
        ctx: &TenantContext,
        id: &str,
        update: &MedicalRecordUpdate,
    ) -> ServiceResult<MedicalRecord> {
        validate_medical_record_update(update)?;
        let mut record = self
            .db
            .get_medical_record(ctx, id)?
            .ok_or_else(|| DbError::NotFound(format!("medical record {id}")))?;
        record.apply(update);
        record.updated_at = self.clock.now();
        self.db.update_medical_record(ctx, &record)?;

        info!(clinic_id = %ctx.clinic_id, record_id = %id, "updated medical record");
        Ok(record)
    }

    /// A patient's chart, newest visit first.
    pub fn medical_records(&self, ctx: &TenantContext, patient_id: &str) -> ServiceResult<Vec<MedicalRecord>> {
        Ok(self.db.list_medical_records(ctx, patient_id)?)
    }

    pub fn add_record_attachment(
        &self,
        ctx: &TenantContext,
        record_id: &str,
        new: &NewRecordAttachment,
    ) -> ServiceResult<RecordAttachment> {
        let mut errors = Vec::new();
        for (field, value) in [("file_name", &new.file_name), ("file_url", &new.file_url)] {
            if value.trim().is_empty() {
                errors.push(ValidationError::new(field, "must not be empty"));
            }
        }
        if !errors.is_empty() {
            return Err(ValidationErrors(errors).into());
        }

        let attachment = RecordAttachment {
            id: uuid::Uuid::new_v4().to_string(),
            record_id: record_id.to_string(),
            file_name: new.file_name.trim().to_string(),
            file_url: new.file_url.clone(),
            file_type: new.file_type.clone(),
            uploaded_by: Some(ctx.user_id.clone()),
            created_at: self.clock.now(),
        };
        self.db.insert_record_attachment(ctx, &attachment)?;
        Ok(attachment)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::ServiceError;
    use super::*;
    use chrono::NaiveDate;

    fn visit(patient_id: &str, day: u32, complaint: &str) -> NewMedicalRecord {
        NewMedicalRecord {
            record_date: NaiveDate::from_ymd_opt(2024, 5, day),
            ..NewMedicalRecord::new(patient_id, complaint)
        }
    }

    #[test]
    fn test_create_records_acting_user_and_today() {
        let service = service();
        let ctx = reception("clinic-1");
        let patient = patient(&service, &ctx);

        let record = service
            .create_medical_record(&ctx, &NewMedicalRecord::new(&patient.id, "Sensitivity on 26"))
            .unwrap();

        assert_eq!(record.created_by.as_deref(), Some("desk-1"));
        assert_eq!(record.record_date, today());
        assert_eq!(service.get_medical_record(&ctx, &record.id).unwrap(), Some(record));
    }

    #[test]
    fn test_create_requires_complaint() {
        let service = service();
        let ctx = admin("clinic-1");
        let patient = patient(&service, &ctx);

        let err = service
            .create_medical_record(&ctx, &NewMedicalRecord::new(&patient.id, "  "))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(service.medical_records(&ctx, &patient.id).unwrap().is_empty());
    }

    #[test]
    fn test_chart_newest_visit_first() {
        let service = service();
        let ctx = admin("clinic-1");
        let patient = patient(&service, &ctx);
        for (day, complaint) in [(14, "Follow-up"), (2, "Toothache"), (28, "Suture removal")] {
            service.create_medical_record(&ctx, &visit(&patient.id, day, complaint)).unwrap();
        }

        let complaints: Vec<_> = service
            .medical_records(&ctx, &patient.id)
            .unwrap()
            .into_iter()
            .map(|r| r.chief_complaint)
            .collect();
        assert_eq!(complaints, vec!["Suture removal", "Follow-up", "Toothache"]);
    }

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let service = service();
        let ctx = admin("clinic-1");
        let patient = patient(&service, &ctx);
        let mut new = visit(&patient.id, 2, "Toothache");
        new.diagnosis = Some("Caries 36".into());
        new.allergies = Some("Penicillin".into());
        let record = service.create_medical_record(&ctx, &new).unwrap();

        let updated = service
            .update_medical_record(
                &ctx,
                &record.id,
                &MedicalRecordUpdate {
                    treatment_plan: Some("Composite filling 36".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let stored = service.get_medical_record(&ctx, &record.id).unwrap().unwrap();
        assert_eq!(stored, updated);
        assert_eq!(stored.treatment_plan.as_deref(), Some("Composite filling 36"));
        assert_eq!(stored.diagnosis.as_deref(), Some("Caries 36"));
        assert_eq!(stored.allergies.as_deref(), Some("Penicillin"));
        assert_eq!(stored.chief_complaint, "Toothache");
        assert_eq!(stored.created_by.as_deref(), Some("admin-1"));

        let err = service
            .update_medical_record(
                &ctx,
                &record.id,
                &MedicalRecordUpdate {
                    chief_complaint: Some(String::new()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_records_isolated_by_clinic() {
        let service = service();
        let c1 = admin("clinic-1");
        let c2 = admin("clinic-2");
        let patient = patient(&service, &c1);
        let record = service.create_medical_record(&c1, &visit(&patient.id, 2, "Toothache")).unwrap();

        assert!(service.get_medical_record(&c2, &record.id).unwrap().is_none());
        assert!(service.medical_records(&c2, &patient.id).unwrap().is_empty());
        assert!(matches!(
            service.update_medical_record(&c2, &record.id, &MedicalRecordUpdate::default()),
            Err(ServiceError::Database(DbError::NotFound(_)))
        ));
        assert!(matches!(
            service.create_medical_record(&c2, &visit(&patient.id, 3, "Swelling")),
            Err(ServiceError::Database(DbError::TenantMismatch(_)))
        ));
    }

    #[test]
    fn test_detail_lists_attachments_with_uploader() {
        let service = service();
        let ctx = admin("clinic-1");
        let patient = patient(&service, &ctx);
        let record = service.create_medical_record(&ctx, &visit(&patient.id, 2, "Toothache")).unwrap();

        let attachment = service
            .add_record_attachment(
                &ctx,
                &record.id,
                &NewRecordAttachment {
                    file_name: "periapical-36.png".into(),
                    file_url: "records/periapical-36.png".into(),
                    file_type: Some("image/png".into()),
                },
            )
            .unwrap();
        assert_eq!(attachment.uploaded_by.as_deref(), Some("admin-1"));

        let detail = service.medical_record_detail(&ctx, &record.id).unwrap().unwrap();
        assert_eq!(detail.record, record);
        assert_eq!(detail.attachments, vec![attachment]);
        assert!(service
            .medical_record_detail(&admin("clinic-2"), &record.id)
            .unwrap()
            .is_none());
    }
}
