//! Appointment models and status transitions.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Appointment lifecycle status.
///
/// Happy path is `Scheduled -> Confirmed -> InProgress -> Completed`; any
/// state before completion may also end in `Cancelled` or `NoShow`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 6] = [
        Self::Scheduled,
        Self::Confirmed,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
        Self::NoShow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "confirmed" => Some(Self::Confirmed),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "no_show" => Some(Self::NoShow),
            _ => None,
        }
    }

    /// Terminal states never transition further under the strict policy.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }

    /// Whether the appointment still occupies its slot.
    pub fn occupies_slot(self) -> bool {
        !matches!(self, Self::Cancelled | Self::NoShow)
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    ///
    /// Re-setting the current status is always permitted.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        if self == next {
            return true;
        }
        match (self, next) {
            (Self::Scheduled, Self::Confirmed)
            | (Self::Confirmed, Self::InProgress)
            | (Self::InProgress, Self::Completed) => true,
            (from, Self::Cancelled | Self::NoShow) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// How status changes are validated.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Any status may be set from any other.
    #[default]
    Permissive,
    /// Only lifecycle edges are accepted.
    Strict,
}

impl TransitionPolicy {
    pub fn allows(self, from: AppointmentStatus, to: AppointmentStatus) -> bool {
        match self {
            Self::Permissive => true,
            Self::Strict => from.can_transition_to(to),
        }
    }
}

/// Kind of visit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Consultation,
    FollowUp,
    Procedure,
    Emergency,
    Telemedicine,
}

impl AppointmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Consultation => "consultation",
            Self::FollowUp => "follow_up",
            Self::Procedure => "procedure",
            Self::Emergency => "emergency",
            Self::Telemedicine => "telemedicine",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "consultation" => Some(Self::Consultation),
            "follow_up" => Some(Self::FollowUp),
            "procedure" => Some(Self::Procedure),
            "emergency" => Some(Self::Emergency),
            "telemedicine" => Some(Self::Telemedicine),
            _ => None,
        }
    }
}

/// A scheduled visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub clinic_id: String,
    pub patient_id: String,
    /// Profile ID of the provider, if assigned
    pub provider_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub scheduled_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub notes: Option<String>,
    pub telemedicine_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Create a new appointment in `Scheduled` status.
    pub fn new(clinic_id: String, new: NewAppointment, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            clinic_id,
            patient_id: new.patient_id,
            provider_id: new.provider_id,
            title: new.title,
            description: new.description,
            appointment_type: new.appointment_type,
            status: AppointmentStatus::Scheduled,
            scheduled_date: new.scheduled_date,
            start_time: new.start_time,
            end_time: new.end_time,
            notes: new.notes,
            telemedicine_link: new.telemedicine_link,
            created_at: now,
            updated_at: now,
        }
    }

    /// Start time as the `HH:MM` label used by the schedule grid.
    pub fn start_label(&self) -> String {
        self.start_time.format("%H:%M").to_string()
    }

    /// Half-open interval overlap on the same day.
    pub fn overlaps(&self, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> bool {
        self.scheduled_date == date && self.start_time < end && start < self.end_time
    }

    /// Apply a partial update. Fields left as `None` are untouched.
    pub fn apply(&mut self, update: &AppointmentUpdate) {
        if let Some(v) = &update.provider_id {
            self.provider_id = Some(v.clone());
        }
        if let Some(v) = &update.title {
            self.title = v.clone();
        }
        if let Some(v) = &update.description {
            self.description = Some(v.clone());
        }
        if let Some(v) = update.appointment_type {
            self.appointment_type = v;
        }
        if let Some(v) = update.scheduled_date {
            self.scheduled_date = v;
        }
        if let Some(v) = update.start_time {
            self.start_time = v;
        }
        if let Some(v) = update.end_time {
            self.end_time = v;
        }
        if let Some(v) = &update.notes {
            self.notes = Some(v.clone());
        }
        if let Some(v) = &update.telemedicine_link {
            self.telemedicine_link = Some(v.clone());
        }
    }
}

/// Input for booking an appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAppointment {
    pub patient_id: String,
    pub provider_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub appointment_type: AppointmentType,
    pub scheduled_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub notes: Option<String>,
    pub telemedicine_link: Option<String>,
}

/// Partial appointment update. Status changes go through the status path.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentUpdate {
    pub provider_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub appointment_type: Option<AppointmentType>,
    pub scheduled_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub notes: Option<String>,
    pub telemedicine_link: Option<String>,
}
