// Course Entity and the Enrollment join entity (many-to-many with Account)

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};
use super::{EntityId, Millis};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Course {
    #[serde(default)]
    pub id: EntityId,
    pub title: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_duration")]
    pub duration_hours: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub starts_at: Millis,
    #[serde(default)]
    pub ends_at: Millis,
    #[serde(default)]
    pub created_at: Millis,
    #[serde(default)]
    pub updated_at: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Millis>,
}

fn default_true() -> bool {
    true
}

fn default_duration() -> i64 {
    40
}

impl Course {
    pub fn new(title: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            code: code.into(),
            duration_hours: default_duration(),
            is_active: true,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::invalid("course", "title", "must not be empty"));
        }
        if self.code.trim().is_empty() {
            return Err(DomainError::invalid("course", "code", "must not be empty"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(DomainError::invalid(
                "course",
                "price",
                format!("must be >= 0, got {}", self.price),
            ));
        }
        if self.ends_at != 0 && self.starts_at > self.ends_at {
            return Err(DomainError::invalid(
                "course",
                "starts_at",
                "start date is after end date",
            ));
        }
        Ok(())
    }

    pub fn is_ongoing(&self, now: Millis) -> bool {
        self.is_active && now >= self.starts_at && (self.ends_at == 0 || now < self.ends_at)
    }
}

/// Enrollment lifecycle status, stored as upper-snake text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    #[default]
    Enrolled,
    Completed,
    Dropped,
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrollmentStatus::Enrolled => write!(f, "ENROLLED"),
            EnrollmentStatus::Completed => write!(f, "COMPLETED"),
            EnrollmentStatus::Dropped => write!(f, "DROPPED"),
        }
    }
}

impl EnrollmentStatus {
    /// Parse the stored text form. Unknown values fall back to `Enrolled`.
    pub fn parse(s: &str) -> Self {
        match s {
            "COMPLETED" => EnrollmentStatus::Completed,
            "DROPPED" => EnrollmentStatus::Dropped,
            _ => EnrollmentStatus::Enrolled,
        }
    }
}

/// Join entity carrying enrollment state between Account and Course.
/// The (account_id, course_id) pair is unique at the storage boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(default)]
    pub id: EntityId,
    pub account_id: EntityId,
    pub course_id: EntityId,
    #[serde(default)]
    pub status: EnrollmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<f64>,
    #[serde(default)]
    pub created_at: Millis,
    #[serde(default)]
    pub updated_at: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Millis>,
}

impl Enrollment {
    pub fn new(account_id: EntityId, course_id: EntityId) -> Self {
        Self {
            account_id,
            course_id,
            status: EnrollmentStatus::Enrolled,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.account_id <= 0 {
            return Err(DomainError::invalid("enrollment", "account_id", "must reference an account"));
        }
        if self.course_id <= 0 {
            return Err(DomainError::invalid("enrollment", "course_id", "must reference a course"));
        }
        if let Some(grade) = self.grade {
            if !grade.is_finite() || !(0.0..=100.0).contains(&grade) {
                return Err(DomainError::invalid(
                    "enrollment",
                    "grade",
                    format!("must be within [0,100], got {grade}"),
                ));
            }
        }
        Ok(())
    }
}
