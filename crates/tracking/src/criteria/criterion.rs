//! Criterion types for batch enrollment queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enrollment::EnrollmentStatus;
use crate::schema::WindowName;

/// Inclusive instant range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl InstantRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// A predicate over enrollments.
///
/// Leaf variants inspect one enrollment (window boundaries, status,
/// identifiers); `And`, `Or` and `Not` combine other criteria and evaluate
/// children left to right with short-circuiting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Criterion {
    /// Start of `window` for the current milestone lies in `range`.
    /// Non-active enrollments and milestones lacking the window never match.
    StartOfWindow { window: WindowName, range: InstantRange },
    /// End of `window` for the current milestone lies in `range`.
    EndOfWindow { window: WindowName, range: InstantRange },
    /// The window containing `at` is one of `windows`. Active only.
    InWindow { windows: Vec<WindowName>, at: DateTime<Utc> },
    /// The current milestone's deadline has passed at `at`. Active only.
    Overdue { at: DateTime<Utc> },
    Status { statuses: Vec<EnrollmentStatus> },
    Milestone { name: String },
    Schedule { names: Vec<String> },
    ExternalId { ids: Vec<String> },
    Metadata { key: String, value: String },
    /// The enrollment entered a terminal status within `range`.
    EndedDuring { range: InstantRange },
    And { criteria: Vec<Criterion> },
    Or { criteria: Vec<Criterion> },
    Not { criterion: Box<Criterion> },
}

impl Criterion {
    pub fn start_of_window(window: WindowName, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Criterion::StartOfWindow {
            window,
            range: InstantRange::new(start, end),
        }
    }

    pub fn end_of_window(window: WindowName, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Criterion::EndOfWindow {
            window,
            range: InstantRange::new(start, end),
        }
    }

    pub fn milestone(name: impl Into<String>) -> Self {
        Criterion::Milestone { name: name.into() }
    }

    pub fn status(status: EnrollmentStatus) -> Self {
        Criterion::Status {
            statuses: vec![status],
        }
    }

    pub fn and(self, other: Criterion) -> Self {
        match self {
            Criterion::And { mut criteria } => {
                criteria.push(other);
                Criterion::And { criteria }
            }
            first => Criterion::And {
                criteria: vec![first, other],
            },
        }
    }

    pub fn or(self, other: Criterion) -> Self {
        match self {
            Criterion::Or { mut criteria } => {
                criteria.push(other);
                Criterion::Or { criteria }
            }
            first => Criterion::Or {
                criteria: vec![first, other],
            },
        }
    }

    pub fn negate(self) -> Self {
        Criterion::Not {
            criterion: Box::new(self),
        }
    }
}
