//! Public-facing showcase content: portfolio, testimonials, staff bios.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Before/after case shown on the clinic's public page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioItem {
    pub id: String,
    pub clinic_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub before_image_url: Option<String>,
    pub after_image_url: Option<String>,
    pub is_published: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPortfolioItem {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub before_image_url: Option<String>,
    pub after_image_url: Option<String>,
    pub is_published: bool,
    pub display_order: i32,
}

impl PortfolioItem {
    pub fn new(clinic_id: String, new: NewPortfolioItem, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            clinic_id,
            title: new.title,
            description: new.description,
            category: new.category,
            before_image_url: new.before_image_url,
            after_image_url: new.after_image_url,
            is_published: new.is_published,
            display_order: new.display_order,
            created_at: now,
        }
    }
}

/// Patient testimonial. Shown publicly only once approved and published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Testimonial {
    pub id: String,
    pub clinic_id: String,
    pub patient_name: String,
    pub content: String,
    /// 1 to 5
    pub rating: u8,
    pub treatment_type: Option<String>,
    pub is_approved: bool,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl Testimonial {
    /// New testimonials start unapproved and unpublished.
    pub fn new(clinic_id: String, new: NewTestimonial, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            clinic_id,
            patient_name: new.patient_name,
            content: new.content,
            rating: new.rating,
            treatment_type: new.treatment_type,
            is_approved: false,
            is_published: false,
            created_at: now,
        }
    }

    pub fn is_public(&self) -> bool {
        self.is_approved && self.is_published
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTestimonial {
    pub patient_name: String,
    pub content: String,
    pub rating: u8,
    pub treatment_type: Option<String>,
}

/// Moderation update for a testimonial.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct TestimonialModeration {
    pub is_approved: Option<bool>,
    pub is_published: Option<bool>,
}

/// Staff bio on the public page (distinct from login profiles).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffBio {
    pub id: String,
    pub clinic_id: String,
    /// Linked login profile, if any
    pub profile_id: Option<String>,
    pub name: String,
    pub title: String,
    pub specialization: Option<String>,
    pub qualifications: Vec<String>,
    pub bio: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl StaffBio {
    pub fn new(clinic_id: String, new: NewStaffBio, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            clinic_id,
            profile_id: new.profile_id,
            name: new.name,
            title: new.title,
            specialization: new.specialization,
            qualifications: new.qualifications,
            bio: new.bio,
            display_order: new.display_order,
            is_active: true,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewStaffBio {
    pub profile_id: Option<String>,
    pub name: String,
    pub title: String,
    pub specialization: Option<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
    pub bio: Option<String>,
    pub display_order: i32,
}
