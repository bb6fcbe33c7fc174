//! Team roles and public showcase content.

use tracing::{info, warn};

use super::{ClinicService, ServiceError, ServiceResult};
use crate::context::TenantContext;
use crate::models::{
    AppRole, NewPortfolioItem, NewStaffBio, NewTestimonial, PortfolioItem, Profile, StaffBio, TeamMember, Testimonial,
    TestimonialModeration,
};
use crate::validation::{validate_new_portfolio_item, validate_new_staff_bio, validate_new_testimonial};

impl ClinicService {
    // =========================================================================
    // Team
    // =========================================================================

    pub fn add_profile(&self, ctx: &TenantContext, profile: &Profile) -> ServiceResult<()> {
        self.require_admin(ctx, "add team members")?;
        self.db.insert_profile(ctx, profile)?;
        Ok(())
    }

    /// Profiles of the clinic with the roles each holds.
    pub fn list_team_members(&self, ctx: &TenantContext) -> ServiceResult<Vec<TeamMember>> {
        Ok(self.db.list_team_members(ctx)?)
    }

    pub fn assign_role(&self, ctx: &TenantContext, user_id: &str, role: AppRole) -> ServiceResult<()> {
        self.require_admin(ctx, "assign roles")?;
        self.db.assign_role(ctx, user_id, role, self.clock.now())?;
        info!(clinic_id = %ctx.clinic_id, user_id, role = role.as_str(), "role assigned");
        Ok(())
    }

    /// Returns whether the user held the role.
    pub fn remove_role(&self, ctx: &TenantContext, user_id: &str, role: AppRole) -> ServiceResult<bool> {
        self.require_admin(ctx, "remove roles")?;
        let removed = self.db.remove_role(ctx, user_id, role)?;
        if removed {
            info!(clinic_id = %ctx.clinic_id, user_id, role = role.as_str(), "role removed");
        }
        Ok(removed)
    }

    fn require_admin(&self, ctx: &TenantContext, action: &str) -> ServiceResult<()> {
        if ctx.is_clinic_admin() {
            return Ok(());
        }
        warn!(clinic_id = %ctx.clinic_id, user_id = %ctx.user_id, action, "clinic admin required");
        Err(ServiceError::Unauthorized(format!(
            "only a clinic admin may {action}"
        )))
    }

    // =========================================================================
    // Showcase
    // =========================================================================

    pub fn add_portfolio_item(&self, ctx: &TenantContext, new: &NewPortfolioItem) -> ServiceResult<PortfolioItem> {
        validate_new_portfolio_item(new)?;
        let item = PortfolioItem::new(ctx.clinic_id.clone(), new.clone(), self.clock.now());
        self.db.insert_portfolio_item(ctx, &item)?;
        Ok(item)
    }

    pub fn list_portfolio(&self, ctx: &TenantContext, published_only: bool) -> ServiceResult<Vec<PortfolioItem>> {
        Ok(self.db.list_portfolio(ctx, published_only)?)
    }

    /// Submit a testimonial. It stays hidden until approved and published.
    pub fn submit_testimonial(&self, ctx: &TenantContext, new: &NewTestimonial) -> ServiceResult<Testimonial> {
        validate_new_testimonial(new)?;
        let testimonial = Testimonial::new(ctx.clinic_id.clone(), new.clone(), self.clock.now());
        self.db.insert_testimonial(ctx, &testimonial)?;
        Ok(testimonial)
    }

    pub fn list_testimonials(&self, ctx: &TenantContext, public_only: bool) -> ServiceResult<Vec<Testimonial>> {
        Ok(self.db.list_testimonials(ctx, public_only)?)
    }

    pub fn moderate_testimonial(
        &self,
        ctx: &TenantContext,
        id: &str,
        moderation: TestimonialModeration,
    ) -> ServiceResult<Testimonial> {
        Ok(self.db.moderate_testimonial(ctx, id, moderation)?)
    }

    pub fn add_staff_bio(&self, ctx: &TenantContext, new: &NewStaffBio) -> ServiceResult<StaffBio> {
        validate_new_staff_bio(new)?;
        let bio = StaffBio::new(ctx.clinic_id.clone(), new.clone(), self.clock.now());
        self.db.insert_staff_bio(ctx, &bio)?;
        Ok(bio)
    }

    /// Active bios in display order.
    pub fn list_staff_bios(&self, ctx: &TenantContext) -> ServiceResult<Vec<StaffBio>> {
        Ok(self.db.list_staff_bios(ctx)?)
    }

    pub fn deactivate_staff_bio(&self, ctx: &TenantContext, id: &str) -> ServiceResult<()> {
        Ok(self.db.deactivate_staff_bio(ctx, id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::ServiceError;
    use crate::models::{AppRole, NewStaffBio, NewTestimonial, Profile, TestimonialModeration};

    #[test]
    fn test_only_admins_manage_roles() {
        let service = service();
        let admin = admin("clinic-1");
        let desk = reception("clinic-1");

        let profile = Profile::new("clinic-1".into(), "doc-1".into(), "Meera".into(), "Shah".into(), now());
        let err = service.add_profile(&desk, &profile).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        service.add_profile(&admin, &profile).unwrap();

        let err = service.assign_role(&desk, "doc-1", AppRole::Provider).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        service.assign_role(&admin, "doc-1", AppRole::Provider).unwrap();
        service.assign_role(&admin, "doc-1", AppRole::Provider).unwrap();
        let members = service.list_team_members(&desk).unwrap();
        assert_eq!(members.len(), 1);
        assert!(members[0].has_role(AppRole::Provider));
        assert_eq!(members[0].roles.len(), 1);

        assert!(service.remove_role(&admin, "doc-1", AppRole::Provider).unwrap());
        assert!(!service.remove_role(&admin, "doc-1", AppRole::Provider).unwrap());
    }

    #[test]
    fn test_admin_of_other_clinic_cannot_touch_roles() {
        let service = service();
        service
            .assign_role(&admin("clinic-2"), "doc-1", AppRole::Provider)
            .unwrap();
        assert!(!service
            .remove_role(&admin("clinic-2"), "doc-1", AppRole::Reception)
            .unwrap());
        assert!(service.list_team_members(&admin("clinic-1")).unwrap().is_empty());
    }

    #[test]
    fn test_testimonial_lifecycle() {
        let service = service();
        let ctx = reception("clinic-1");
        let bad = NewTestimonial {
            patient_name: "Asha".into(),
            content: "Great".into(),
            rating: 6,
            treatment_type: None,
        };
        assert!(matches!(
            service.submit_testimonial(&ctx, &bad),
            Err(ServiceError::Validation(_))
        ));

        let testimonial = service
            .submit_testimonial(&ctx, &NewTestimonial { rating: 5, ..bad })
            .unwrap();
        assert!(!testimonial.is_public());
        assert!(service.list_testimonials(&ctx, true).unwrap().is_empty());

        let public = service
            .moderate_testimonial(
                &ctx,
                &testimonial.id,
                TestimonialModeration {
                    is_approved: Some(true),
                    is_published: Some(true),
                },
            )
            .unwrap();
        assert!(public.is_public());
        assert_eq!(service.list_testimonials(&ctx, true).unwrap().len(), 1);
    }

    #[test]
    fn test_staff_bios() {
        let service = service();
        let ctx = reception("clinic-1");
        let bio = service
            .add_staff_bio(
                &ctx,
                &NewStaffBio {
                    profile_id: None,
                    name: "Dr. Meera Shah".into(),
                    title: "Orthodontist".into(),
                    specialization: None,
                    qualifications: vec!["BDS".into(), "MDS".into()],
                    bio: None,
                    display_order: 1,
                },
            )
            .unwrap();
        let listed = service.list_staff_bios(&ctx).unwrap();
        assert_eq!(listed[0].qualifications, vec!["BDS".to_string(), "MDS".to_string()]);

        service.deactivate_staff_bio(&ctx, &bio.id).unwrap();
        assert!(service.list_staff_bios(&ctx).unwrap().is_empty());
    }
}
