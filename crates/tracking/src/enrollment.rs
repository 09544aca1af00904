//! Enrollment records: one subject's progress through one schedule.
//!
//! The engine never stores enrollments. Values come from the persistence
//! collaborator and transitions hand back new values for it to commit.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::schema::ScheduleDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrollmentId(pub Uuid);

impl EnrollmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EnrollmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Defaulted,
    Unenrolled,
}

impl EnrollmentStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EnrollmentStatus::Active)
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrollmentStatus::Active => write!(f, "ACTIVE"),
            EnrollmentStatus::Completed => write!(f, "COMPLETED"),
            EnrollmentStatus::Defaulted => write!(f, "DEFAULTED"),
            EnrollmentStatus::Unenrolled => write!(f, "UNENROLLED"),
        }
    }
}

/// A recorded fulfillment of one milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneFulfillment {
    pub milestone: String,
    pub fulfilled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    /// Subject identifier in the surrounding system (patient, health worker).
    pub external_id: String,
    pub schedule_name: String,
    pub current_milestone: String,
    /// Instant the current milestone's window offsets are measured from.
    pub reference_instant: DateTime<Utc>,
    /// Instant the subject joined the schedule.
    pub enrollment_instant: DateTime<Utc>,
    pub status: EnrollmentStatus,
    /// Time of day the dispatcher should prefer for alerts.
    #[serde(default)]
    pub preferred_alert_time: Option<NaiveTime>,
    /// Opaque data carried for the alerting collaborator.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub fulfillments: Vec<MilestoneFulfillment>,
    /// Instant a terminal status was entered.
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    /// Enroll at the schedule's first milestone, measured from `enrolled_at`.
    pub fn new(
        external_id: impl Into<String>,
        schedule: &ScheduleDefinition,
        enrolled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EnrollmentId::new(),
            external_id: external_id.into(),
            schedule_name: schedule.name().to_string(),
            current_milestone: schedule.first_milestone().name.clone(),
            reference_instant: enrolled_at,
            enrollment_instant: enrolled_at,
            status: EnrollmentStatus::Active,
            preferred_alert_time: None,
            metadata: BTreeMap::new(),
            fulfillments: Vec::new(),
            ended_at: None,
        }
    }

    /// Enroll at an explicit milestone with an explicit reference instant.
    ///
    /// Fails with `UnknownMilestone` if the schedule has no such milestone.
    pub fn starting_at(
        external_id: impl Into<String>,
        schedule: &ScheduleDefinition,
        milestone: &str,
        reference_instant: DateTime<Utc>,
        enrolled_at: DateTime<Utc>,
    ) -> Result<Self> {
        let milestone = schedule.milestone(milestone)?;
        let mut enrollment = Self::new(external_id, schedule, enrolled_at);
        enrollment.current_milestone = milestone.name.clone();
        enrollment.reference_instant = reference_instant;
        Ok(enrollment)
    }

    pub fn with_id(mut self, id: EnrollmentId) -> Self {
        self.id = id;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_preferred_alert_time(mut self, time: NaiveTime) -> Self {
        self.preferred_alert_time = Some(time);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Active
    }

    /// Most recent fulfillment, if any.
    pub fn last_fulfillment(&self) -> Option<&MilestoneFulfillment> {
        self.fulfillments.last()
    }
}
