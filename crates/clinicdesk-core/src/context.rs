//! Tenant context and clock, passed explicitly into every store call.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::AppRole;

/// Who is acting, and for which clinic.
///
/// Every query and mutation is scoped to `clinic_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub clinic_id: String,
    /// Acting user (identity-provider user ID)
    pub user_id: String,
    /// Roles the acting user holds in `clinic_id`
    pub roles: Vec<AppRole>,
}

impl TenantContext {
    pub fn new(clinic_id: impl Into<String>, user_id: impl Into<String>, roles: Vec<AppRole>) -> Self {
        Self {
            clinic_id: clinic_id.into(),
            user_id: user_id.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: AppRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_clinic_admin(&self) -> bool {
        self.has_role(AppRole::ClinicAdmin)
    }
}

/// Source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Today's date (UTC).
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a fixed instant (for tests and replays).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_today() {
        let clock = FixedClock("2024-06-03T23:59:59Z".parse().unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
    }

    #[test]
    fn test_roles() {
        let ctx = TenantContext::new("clinic-1", "user-1", vec![AppRole::Reception]);
        assert!(ctx.has_role(AppRole::Reception));
        assert!(!ctx.is_clinic_admin());
    }
}
