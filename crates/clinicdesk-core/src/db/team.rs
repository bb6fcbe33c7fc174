//! Staff profile and role database operations.
//!
//! Authorization for role changes lives in the service layer; these calls
//! only enforce tenant scoping.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{enum_from_sql, Database, DbError, DbResult};
use crate::context::TenantContext;
use crate::models::{AppRole, Profile, TeamMember, UserRole};

const PROFILE_COLUMNS: &str =
    "id, user_id, clinic_id, first_name, last_name, email, phone, specialization, is_active, created_at";

impl Database {
    pub fn insert_profile(&self, ctx: &TenantContext, profile: &Profile) -> DbResult<()> {
        if profile.clinic_id != ctx.clinic_id {
            return Err(DbError::TenantMismatch(format!("profile {}", profile.id)));
        }
        self.conn.execute(
            &format!("INSERT INTO profiles ({PROFILE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            params![
                profile.id,
                profile.user_id,
                profile.clinic_id,
                profile.first_name,
                profile.last_name,
                profile.email,
                profile.phone,
                profile.specialization,
                profile.is_active,
                profile.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<Profile>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1 AND clinic_id = ?2"),
                params![id, ctx.clinic_id],
                read_profile,
            )
            .optional()?)
    }

    /// Check that profile `id` may be referenced from the acting clinic.
    pub(crate) fn ensure_profile(&self, ctx: &TenantContext, id: &str) -> DbResult<()> {
        let owner: Option<String> = self
            .conn
            .query_row("SELECT clinic_id FROM profiles WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        match owner {
            Some(clinic) if clinic == ctx.clinic_id => Ok(()),
            Some(_) => Err(DbError::TenantMismatch(format!("profile {id}"))),
            None => Err(DbError::NotFound(format!("profile {id}"))),
        }
    }

    /// Active profiles with their roles, by last name.
    pub fn list_team_members(&self, ctx: &TenantContext) -> DbResult<Vec<TeamMember>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles
             WHERE clinic_id = ?1 AND is_active = 1
             ORDER BY last_name, first_name"
        ))?;
        let profiles = stmt
            .query_map([&ctx.clinic_id], read_profile)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut members = Vec::with_capacity(profiles.len());
        for profile in profiles {
            let roles = self.roles_for_user(ctx, &profile.user_id)?;
            members.push(TeamMember { profile, roles });
        }
        Ok(members)
    }

    pub fn roles_for_user(&self, ctx: &TenantContext, user_id: &str) -> DbResult<Vec<UserRole>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, clinic_id, role, created_at
            FROM user_roles
            WHERE clinic_id = ?1 AND user_id = ?2
            ORDER BY created_at
            "#,
        )?;
        let rows = stmt.query_map(params![ctx.clinic_id, user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, DateTime<Utc>>(4)?,
            ))
        })?;

        let mut roles = Vec::new();
        for row in rows {
            let (id, user_id, clinic_id, role, created_at) = row?;
            roles.push(UserRole {
                id,
                user_id,
                clinic_id,
                role: enum_from_sql("role", &role, AppRole::parse)?,
                created_at,
            });
        }
        Ok(roles)
    }

    /// Grant `role`. Granting a role already held is a no-op.
    pub fn assign_role(
        &self,
        ctx: &TenantContext,
        user_id: &str,
        role: AppRole,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO user_roles (id, user_id, clinic_id, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (clinic_id, user_id, role) DO NOTHING
            "#,
            params![
                uuid::Uuid::new_v4().to_string(),
                user_id,
                ctx.clinic_id,
                role.as_str(),
                now,
            ],
        )?;
        Ok(())
    }

    /// Revoke `role`. Returns whether the role was held.
    pub fn remove_role(&self, ctx: &TenantContext, user_id: &str, role: AppRole) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM user_roles WHERE clinic_id = ?1 AND user_id = ?2 AND role = ?3",
            params![ctx.clinic_id, user_id, role.as_str()],
        )?;
        Ok(rows_affected > 0)
    }
}

fn read_profile(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        clinic_id: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        specialization: row.get(7)?,
        is_active: row.get(8)?,
        created_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2024-06-03T08:00:00Z".parse().unwrap()
    }

    fn ctx(clinic: &str) -> TenantContext {
        TenantContext::new(clinic, "admin-1", vec![AppRole::ClinicAdmin])
    }

    #[test]
    fn test_team_members_with_roles() {
        let db = Database::open_in_memory().unwrap();
        let c1 = ctx("clinic-1");
        let profile = Profile::new("clinic-1".into(), "user-7".into(), "Maya".into(), "Thapa".into(), now());
        db.insert_profile(&c1, &profile).unwrap();

        db.assign_role(&c1, "user-7", AppRole::Provider, now()).unwrap();
        // Idempotent
        db.assign_role(&c1, "user-7", AppRole::Provider, now()).unwrap();
        db.assign_role(&c1, "user-7", AppRole::Reception, now()).unwrap();

        let members = db.list_team_members(&c1).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].roles.len(), 2);
        assert!(members[0].has_role(AppRole::Provider));

        assert!(db.remove_role(&c1, "user-7", AppRole::Reception).unwrap());
        assert!(!db.remove_role(&c1, "user-7", AppRole::Reception).unwrap());
        assert!(!db.list_team_members(&c1).unwrap()[0].has_role(AppRole::Reception));
    }

    #[test]
    fn test_roles_are_per_clinic() {
        let db = Database::open_in_memory().unwrap();
        db.assign_role(&ctx("clinic-1"), "user-7", AppRole::ClinicAdmin, now())
            .unwrap();
        assert!(db.roles_for_user(&ctx("clinic-2"), "user-7").unwrap().is_empty());
        assert!(db.list_team_members(&ctx("clinic-2")).unwrap().is_empty());
    }

    #[test]
    fn test_profile_scoping() {
        let db = Database::open_in_memory().unwrap();
        let profile = Profile::new("clinic-1".into(), "user-7".into(), "Maya".into(), "Thapa".into(), now());
        db.insert_profile(&ctx("clinic-1"), &profile).unwrap();

        assert!(db.get_profile(&ctx("clinic-2"), &profile.id).unwrap().is_none());
        assert!(matches!(
            db.ensure_profile(&ctx("clinic-2"), &profile.id),
            Err(DbError::TenantMismatch(_))
        ));
        assert!(matches!(
            db.ensure_profile(&ctx("clinic-1"), "missing"),
            Err(DbError::NotFound(_))
        ));
    }
}
