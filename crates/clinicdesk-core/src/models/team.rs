//! Staff profiles and role memberships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role a user holds within a clinic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppRole {
    ClinicAdmin,
    Provider,
    Reception,
    Patient,
}

impl AppRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClinicAdmin => "clinic_admin",
            Self::Provider => "provider",
            Self::Reception => "reception",
            Self::Patient => "patient",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "clinic_admin" => Some(Self::ClinicAdmin),
            "provider" => Some(Self::Provider),
            "reception" => Some(Self::Reception),
            "patient" => Some(Self::Patient),
            _ => None,
        }
    }
}

/// A user's profile within a clinic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    /// Identity-provider user ID
    pub user_id: String,
    pub clinic_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(
        clinic_id: String,
        user_id: String,
        first_name: String,
        last_name: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            clinic_id,
            first_name,
            last_name,
            email: None,
            phone: None,
            specialization: None,
            is_active: true,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRole {
    pub id: String,
    pub user_id: String,
    pub clinic_id: String,
    pub role: AppRole,
    pub created_at: DateTime<Utc>,
}

/// A profile together with its role memberships.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamMember {
    pub profile: Profile,
    pub roles: Vec<UserRole>,
}

impl TeamMember {
    pub fn has_role(&self, role: AppRole) -> bool {
        self.roles.iter().any(|r| r.role == role)
    }
}
