//! Showcase content: portfolio entries, testimonials and staff bios.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::context::TenantContext;
use crate::models::{PortfolioItem, StaffBio, Testimonial, TestimonialModeration};

impl Database {
    // =========================================================================
    // Portfolio
    // =========================================================================

    pub fn insert_portfolio_item(&self, ctx: &TenantContext, item: &PortfolioItem) -> DbResult<()> {
        if item.clinic_id != ctx.clinic_id {
            return Err(DbError::TenantMismatch(format!("portfolio item {}", item.id)));
        }
        self.conn.execute(
            r#"
            INSERT INTO showcase_portfolio (
                id, clinic_id, title, description, category, before_image_url,
                after_image_url, is_published, display_order, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                item.id,
                item.clinic_id,
                item.title,
                item.description,
                item.category,
                item.before_image_url,
                item.after_image_url,
                item.is_published,
                item.display_order,
                item.created_at,
            ],
        )?;
        Ok(())
    }

    /// Portfolio entries by display order; `published_only` for the public page.
    pub fn list_portfolio(&self, ctx: &TenantContext, published_only: bool) -> DbResult<Vec<PortfolioItem>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, clinic_id, title, description, category, before_image_url,
                   after_image_url, is_published, display_order, created_at
            FROM showcase_portfolio
            WHERE clinic_id = ?1 AND (is_published = 1 OR ?2 = 0)
            ORDER BY display_order, created_at
            "#,
        )?;
        let rows = stmt.query_map(params![ctx.clinic_id, published_only], |row| {
            Ok(PortfolioItem {
                id: row.get(0)?,
                clinic_id: row.get(1)?,
                title: row.get(2)?,
                description: row.get(3)?,
                category: row.get(4)?,
                before_image_url: row.get(5)?,
                after_image_url: row.get(6)?,
                is_published: row.get(7)?,
                display_order: row.get(8)?,
                created_at: row.get(9)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // =========================================================================
    // Testimonials
    // =========================================================================

    pub fn insert_testimonial(&self, ctx: &TenantContext, testimonial: &Testimonial) -> DbResult<()> {
        if testimonial.clinic_id != ctx.clinic_id {
            return Err(DbError::TenantMismatch(format!("testimonial {}", testimonial.id)));
        }
        self.conn.execute(
            r#"
            INSERT INTO showcase_testimonials (
                id, clinic_id, patient_name, content, rating, treatment_type,
                is_approved, is_published, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                testimonial.id,
                testimonial.clinic_id,
                testimonial.patient_name,
                testimonial.content,
                testimonial.rating,
                testimonial.treatment_type,
                testimonial.is_approved,
                testimonial.is_published,
                testimonial.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_testimonial(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<Testimonial>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, clinic_id, patient_name, content, rating, treatment_type,
                       is_approved, is_published, created_at
                FROM showcase_testimonials WHERE id = ?1 AND clinic_id = ?2
                "#,
                params![id, ctx.clinic_id],
                read_testimonial,
            )
            .optional()?)
    }

    /// Testimonials newest first; `public_only` keeps approved and published ones.
    pub fn list_testimonials(&self, ctx: &TenantContext, public_only: bool) -> DbResult<Vec<Testimonial>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, clinic_id, patient_name, content, rating, treatment_type,
                   is_approved, is_published, created_at
            FROM showcase_testimonials
            WHERE clinic_id = ?1 AND ((is_approved = 1 AND is_published = 1) OR ?2 = 0)
            ORDER BY created_at DESC
            "#,
        )?;
        let rows = stmt.query_map(params![ctx.clinic_id, public_only], read_testimonial)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Apply approval/publication flags. Unset fields keep their value.
    pub fn moderate_testimonial(
        &self,
        ctx: &TenantContext,
        id: &str,
        moderation: TestimonialModeration,
    ) -> DbResult<Testimonial> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE showcase_testimonials SET
                is_approved = COALESCE(?3, is_approved),
                is_published = COALESCE(?4, is_published)
            WHERE id = ?1 AND clinic_id = ?2
            "#,
            params![id, ctx.clinic_id, moderation.is_approved, moderation.is_published],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("testimonial {id}")));
        }
        self.get_testimonial(ctx, id)?
            .ok_or_else(|| DbError::NotFound(format!("testimonial {id}")))
    }

    // =========================================================================
    // Staff bios
    // =========================================================================

    pub fn insert_staff_bio(&self, ctx: &TenantContext, bio: &StaffBio) -> DbResult<()> {
        if bio.clinic_id != ctx.clinic_id {
            return Err(DbError::TenantMismatch(format!("staff bio {}", bio.id)));
        }
        if let Some(profile_id) = &bio.profile_id {
            self.ensure_profile(ctx, profile_id)?;
        }
        let qualifications_json = serde_json::to_string(&bio.qualifications)?;
        self.conn.execute(
            r#"
            INSERT INTO showcase_staff (
                id, clinic_id, profile_id, name, title, specialization,
                qualifications, bio, display_order, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                bio.id,
                bio.clinic_id,
                bio.profile_id,
                bio.name,
                bio.title,
                bio.specialization,
                qualifications_json,
                bio.bio,
                bio.display_order,
                bio.is_active,
                bio.created_at,
            ],
        )?;
        Ok(())
    }

    /// Active staff bios by display order.
    pub fn list_staff_bios(&self, ctx: &TenantContext) -> DbResult<Vec<StaffBio>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, clinic_id, profile_id, name, title, specialization,
                   qualifications, bio, display_order, is_active, created_at
            FROM showcase_staff
            WHERE clinic_id = ?1 AND is_active = 1
            ORDER BY display_order, name
            "#,
        )?;
        let rows = stmt.query_map([&ctx.clinic_id], |row| {
            Ok((
                StaffBio {
                    id: row.get(0)?,
                    clinic_id: row.get(1)?,
                    profile_id: row.get(2)?,
                    name: row.get(3)?,
                    title: row.get(4)?,
                    specialization: row.get(5)?,
                    qualifications: Vec::new(),
                    bio: row.get(7)?,
                    display_order: row.get(8)?,
                    is_active: row.get(9)?,
                    created_at: row.get(10)?,
                },
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut bios = Vec::new();
        for row in rows {
            let (mut bio, qualifications_json) = row?;
            bio.qualifications = serde_json::from_str(&qualifications_json)?;
            bios.push(bio);
        }
        Ok(bios)
    }

    /// Soft delete. Deactivating twice is a no-op.
    pub fn deactivate_staff_bio(&self, ctx: &TenantContext, id: &str) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            "UPDATE showcase_staff SET is_active = 0 WHERE id = ?1 AND clinic_id = ?2",
            params![id, ctx.clinic_id],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("staff bio {id}")));
        }
        Ok(())
    }
}

fn read_testimonial(row: &rusqlite::Row<'_>) -> rusqlite::Result<Testimonial> {
    Ok(Testimonial {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        patient_name: row.get(2)?,
        content: row.get(3)?,
        rating: row.get(4)?,
        treatment_type: row.get(5)?,
        is_approved: row.get(6)?,
        is_published: row.get(7)?,
        created_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppRole;
    use chrono::{DateTime, Utc};

    fn now() -> DateTime<Utc> {
        "2024-06-03T10:00:00Z".parse().unwrap()
    }

    fn ctx(clinic: &str) -> TenantContext {
        TenantContext::new(clinic, "admin-1", vec![AppRole::ClinicAdmin])
    }

    fn testimonial(id: &str) -> Testimonial {
        Testimonial {
            id: id.into(),
            clinic_id: "clinic-1".into(),
            patient_name: "Asha".into(),
            content: "Painless and quick".into(),
            rating: 5,
            treatment_type: Some("Cleaning".into()),
            is_approved: false,
            is_published: false,
            created_at: now(),
        }
    }

    #[test]
    fn test_testimonial_moderation() {
        let db = Database::open_in_memory().unwrap();
        let c1 = ctx("clinic-1");
        db.insert_testimonial(&c1, &testimonial("t1")).unwrap();
        assert!(db.list_testimonials(&c1, true).unwrap().is_empty());
        assert_eq!(db.list_testimonials(&c1, false).unwrap().len(), 1);

        let approved = db
            .moderate_testimonial(&c1, "t1", TestimonialModeration { is_approved: Some(true), is_published: None })
            .unwrap();
        assert!(approved.is_approved);
        assert!(!approved.is_published);

        let published = db
            .moderate_testimonial(&c1, "t1", TestimonialModeration { is_approved: None, is_published: Some(true) })
            .unwrap();
        assert!(published.is_public());
        assert_eq!(db.list_testimonials(&c1, true).unwrap().len(), 1);

        assert!(matches!(
            db.moderate_testimonial(&ctx("clinic-2"), "t1", TestimonialModeration::default()),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_portfolio_publication_filter() {
        let db = Database::open_in_memory().unwrap();
        let c1 = ctx("clinic-1");
        for (id, published, order) in [("p1", true, 2), ("p2", false, 1), ("p3", true, 0)] {
            db.insert_portfolio_item(
                &c1,
                &PortfolioItem {
                    id: id.into(),
                    clinic_id: "clinic-1".into(),
                    title: format!("Case {id}"),
                    description: None,
                    category: "Orthodontics".into(),
                    before_image_url: None,
                    after_image_url: None,
                    is_published: published,
                    display_order: order,
                    created_at: now(),
                },
            )
            .unwrap();
        }

        let public: Vec<_> = db.list_portfolio(&c1, true).unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(public, vec!["p3", "p1"]);
        assert_eq!(db.list_portfolio(&c1, false).unwrap().len(), 3);
    }

    #[test]
    fn test_staff_bios() {
        let db = Database::open_in_memory().unwrap();
        let c1 = ctx("clinic-1");
        let bio = StaffBio {
            id: "s1".into(),
            clinic_id: "clinic-1".into(),
            profile_id: None,
            name: "Dr. Maya Thapa".into(),
            title: "Orthodontist".into(),
            specialization: Some("Braces".into()),
            qualifications: vec!["BDS".into(), "MDS".into()],
            bio: None,
            display_order: 0,
            is_active: true,
            created_at: now(),
        };
        db.insert_staff_bio(&c1, &bio).unwrap();
        assert_eq!(db.list_staff_bios(&c1).unwrap(), vec![bio]);

        db.deactivate_staff_bio(&c1, "s1").unwrap();
        db.deactivate_staff_bio(&c1, "s1").unwrap();
        assert!(db.list_staff_bios(&c1).unwrap().is_empty());
    }
}
