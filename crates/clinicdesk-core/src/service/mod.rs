//! Service facade over the store.
//!
//! Every operation validates its input, applies clinic policy from
//! [`ClinicConfig`], performs the store call and drops the cached queries the
//! mutation affects before returning.

mod appointments;
mod billing;
mod inventory;
mod patients;
mod records;
mod reports;
mod team;

use thiserror::Error;
use tracing::debug;

use crate::cache::{QueryCache, QueryScope};
use crate::config::{ClinicConfig, ConfigError};
use crate::context::{Clock, SystemClock, TenantContext};
use crate::db::{Database, DbError};
use crate::models::AppointmentStatus;
use crate::validation::ValidationErrors;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid status transition from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Time slot taken: {0}")]
    SlotTaken(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// One clinic-core session: a store connection, its configuration, a clock
/// and the read cache.
pub struct ClinicService {
    db: Database,
    config: ClinicConfig,
    clock: Box<dyn Clock>,
    cache: QueryCache,
}

impl ClinicService {
    pub fn new(db: Database, config: ClinicConfig) -> Self {
        Self::with_clock(db, config, Box::new(SystemClock))
    }

    pub fn with_clock(db: Database, config: ClinicConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            db,
            config,
            clock,
            cache: QueryCache::new(),
        }
    }

    /// Open a file-backed store using the configured busy timeout.
    pub fn open(path: &str, config: ClinicConfig) -> ServiceResult<Self> {
        config.validate()?;
        let db = Database::open_with_timeout(path, config.busy_timeout())?;
        Ok(Self::new(db, config))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &ClinicConfig {
        &self.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn invalidate(&self, ctx: &TenantContext, scopes: &[QueryScope]) {
        debug!(clinic_id = %ctx.clinic_id, ?scopes, "dropping cached queries after mutation");
        self.cache.invalidate(&ctx.clinic_id, scopes);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::context::FixedClock;
    use crate::models::{AppRole, Patient};
    use chrono::{DateTime, NaiveDate, Utc};

    pub fn now() -> DateTime<Utc> {
        "2024-06-03T10:00:00Z".parse().unwrap()
    }

    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    pub fn admin(clinic_id: &str) -> TenantContext {
        TenantContext::new(clinic_id, "admin-1", vec![AppRole::ClinicAdmin])
    }

    pub fn reception(clinic_id: &str) -> TenantContext {
        TenantContext::new(clinic_id, "desk-1", vec![AppRole::Reception])
    }

    pub fn service_with(config: ClinicConfig) -> ClinicService {
        let db = Database::open_in_memory().unwrap();
        ClinicService::with_clock(db, config, Box::new(FixedClock(now())))
    }

    pub fn service() -> ClinicService {
        service_with(ClinicConfig::default())
    }

    pub fn patient(service: &ClinicService, ctx: &TenantContext) -> Patient {
        service
            .register_patient(ctx, "Ada", "Lovelace", &Default::default())
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_open_rejects_invalid_config() {
        let config = ClinicConfig {
            slot_minutes: 0,
            ..ClinicConfig::default()
        };
        let err = ClinicService::open(":memory:", config).err().unwrap();
        assert!(matches!(err, ServiceError::Config(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = ServiceError::InvalidTransition {
            from: AppointmentStatus::Completed,
            to: AppointmentStatus::Scheduled,
        };
        assert_eq!(err.to_string(), "Invalid status transition from completed to scheduled");

        let err: ServiceError = DbError::NotFound("patient p1".into()).into();
        assert!(err.to_string().contains("patient p1"));
    }

    #[test]
    fn test_service_uses_injected_clock() {
        let service = service();
        let ctx = reception("clinic-1");
        let patient = patient(&service, &ctx);
        assert_eq!(patient.created_at, now());
    }
}
