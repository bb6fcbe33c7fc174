//! Per-clinic read cache with scope-based invalidation.
//!
//! Only appointment lists and dashboard stats are cached. Inventory reads
//! (including low-stock) always hit the store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use tracing::debug;

use crate::models::Appointment;
use crate::reports::DashboardStats;

/// Group of cached queries dropped together after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryScope {
    Appointments,
    Dashboard,
}

/// Which appointment list was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AppointmentQuery {
    All,
    OnDate(NaiveDate),
    Range { from: NaiveDate, to: NaiveDate },
    Upcoming { from: NaiveDate, limit: u32 },
}

type AppointmentKey = (String, AppointmentQuery);
type DashboardKey = (String, NaiveDate);

#[derive(Debug, Default)]
pub struct QueryCache {
    appointments: Mutex<HashMap<AppointmentKey, Vec<Appointment>>>,
    dashboard: Mutex<HashMap<DashboardKey, DashboardStats>>,
}

// A poisoned map only ever holds fully inserted entries.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn appointments(&self, clinic_id: &str, query: &AppointmentQuery) -> Option<Vec<Appointment>> {
        let hit = lock(&self.appointments)
            .get(&(clinic_id.to_string(), query.clone()))
            .cloned();
        if hit.is_some() {
            debug!(clinic_id, ?query, "appointment cache hit");
        }
        hit
    }

    pub fn store_appointments(&self, clinic_id: &str, query: AppointmentQuery, rows: Vec<Appointment>) {
        lock(&self.appointments).insert((clinic_id.to_string(), query), rows);
    }

    pub fn dashboard(&self, clinic_id: &str, today: NaiveDate) -> Option<DashboardStats> {
        let hit = lock(&self.dashboard)
            .get(&(clinic_id.to_string(), today))
            .cloned();
        if hit.is_some() {
            debug!(clinic_id, %today, "dashboard cache hit");
        }
        hit
    }

    pub fn store_dashboard(&self, clinic_id: &str, today: NaiveDate, stats: DashboardStats) {
        lock(&self.dashboard).insert((clinic_id.to_string(), today), stats);
    }

    /// Drop every cached entry of `clinic_id` in the given scopes.
    pub fn invalidate(&self, clinic_id: &str, scopes: &[QueryScope]) {
        for scope in scopes {
            let dropped = match scope {
                QueryScope::Appointments => {
                    let mut map = lock(&self.appointments);
                    let before = map.len();
                    map.retain(|(clinic, _), _| clinic != clinic_id);
                    before - map.len()
                }
                QueryScope::Dashboard => {
                    let mut map = lock(&self.dashboard);
                    let before = map.len();
                    map.retain(|(clinic, _), _| clinic != clinic_id);
                    before - map.len()
                }
            };
            debug!(clinic_id, ?scope, dropped, "cache invalidated");
        }
    }

    pub fn clear(&self) {
        lock(&self.appointments).clear();
        lock(&self.dashboard).clear();
    }
}
