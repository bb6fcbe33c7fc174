//! Runtime configuration.
//!
//! Loaded from JSON; every field has a default so an empty object `{}` is a
//! valid configuration.

use std::path::Path;
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::TransitionPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Clinic core configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClinicConfig {
    /// How appointment status changes are validated
    pub transition_policy: TransitionPolicy,
    /// Reject bookings that overlap a live appointment of the same provider
    /// or patient
    pub reject_overlapping_appointments: bool,
    /// Accept payments larger than the balance due
    pub allow_overpayment: bool,
    pub invoice_number_prefix: String,
    /// First slot label of the schedule grid (`HH:MM`)
    pub slot_start: String,
    /// Last slot label of the schedule grid (`HH:MM`)
    pub slot_end: String,
    pub slot_minutes: u32,
    pub expiry_lookahead_days: u32,
    pub revenue_window_days: u32,
    pub payment_method_window_days: u32,
    pub recent_patients_limit: u32,
    /// SQLite busy timeout for contended writes
    pub busy_timeout_ms: u64,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            transition_policy: TransitionPolicy::Permissive,
            reject_overlapping_appointments: false,
            allow_overpayment: false,
            invoice_number_prefix: "INV".into(),
            slot_start: "08:00".into(),
            slot_end: "17:30".into(),
            slot_minutes: 30,
            expiry_lookahead_days: 30,
            revenue_window_days: 7,
            payment_method_window_days: 30,
            recent_patients_limit: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

impl ClinicConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let start = self.slot_start_time()?;
        let end = self.slot_end_time()?;
        if start > end {
            return Err(ConfigError::Invalid {
                field: "slot_end",
                message: format!("{} is before slot_start {}", self.slot_end, self.slot_start),
            });
        }
        if self.slot_minutes == 0 || self.slot_minutes > 24 * 60 {
            return Err(ConfigError::Invalid {
                field: "slot_minutes",
                message: format!("{} is out of range 1..=1440", self.slot_minutes),
            });
        }
        if self.invoice_number_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "invoice_number_prefix",
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn slot_start_time(&self) -> ConfigResult<NaiveTime> {
        parse_slot_time("slot_start", &self.slot_start)
    }

    pub fn slot_end_time(&self) -> ConfigResult<NaiveTime> {
        parse_slot_time("slot_end", &self.slot_end)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

fn parse_slot_time(field: &'static str, value: &str) -> ConfigResult<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| ConfigError::Invalid {
        field,
        message: format!("{value:?} is not HH:MM ({e})"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let config = ClinicConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ClinicConfig::default());
        assert_eq!(config.transition_policy, TransitionPolicy::Permissive);
        assert_eq!(config.expiry_lookahead_days, 30);
    }

    #[test]
    fn test_partial_override() {
        let config = ClinicConfig::from_json_str(
            r#"{"transition_policy": "strict", "slot_minutes": 15, "allow_overpayment": true}"#,
        )
        .unwrap();
        assert_eq!(config.transition_policy, TransitionPolicy::Strict);
        assert_eq!(config.slot_minutes, 15);
        assert!(config.allow_overpayment);
        assert_eq!(config.invoice_number_prefix, "INV");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ClinicConfig::from_json_str(r#"{"slot_start": "8am"}"#),
            Err(ConfigError::Invalid { field: "slot_start", .. })
        ));
        assert!(matches!(
            ClinicConfig::from_json_str(r#"{"slot_start": "18:00", "slot_end": "08:00"}"#),
            Err(ConfigError::Invalid { field: "slot_end", .. })
        ));
        assert!(matches!(
            ClinicConfig::from_json_str(r#"{"slot_minutes": 0}"#),
            Err(ConfigError::Invalid { field: "slot_minutes", .. })
        ));
        assert!(matches!(
            ClinicConfig::from_json_str(r#"{"transition_policy": "lenient"}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.json");
        std::fs::write(&path, r#"{"invoice_number_prefix": "BILL"}"#).unwrap();

        let config = ClinicConfig::load(&path).unwrap();
        assert_eq!(config.invoice_number_prefix, "BILL");

        assert!(matches!(
            ClinicConfig::load(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
