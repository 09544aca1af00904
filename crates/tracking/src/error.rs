//! Error kinds raised by the scheduling engine.
//!
//! Construction errors reject a whole schedule definition. Every other kind
//! is scoped to a single enrollment and leaves that enrollment untouched.

use cadence_core::format_offset;
use chrono::Duration;

use crate::enrollment::{EnrollmentId, EnrollmentStatus};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackingError {
    /// Malformed schedule definition; carries the first violation found.
    #[error("Invalid schedule '{schedule}': {reason}")]
    InvalidSchedule { schedule: String, reason: String },

    /// A window's end offset precedes its start offset, or the offsets
    /// push a boundary outside the representable range.
    #[error(
        "Invalid offset: window [{}, {}] is not ordered or out of range",
        format_offset(.start),
        format_offset(.end)
    )]
    InvalidOffset { start: Duration, end: Duration },

    /// Enrollment references a milestone absent from its schedule.
    #[error("Milestone '{milestone}' not found in schedule '{schedule}'")]
    UnknownMilestone { schedule: String, milestone: String },

    /// Enrollment references a schedule the registry does not hold.
    #[error("Schedule '{0}' not found")]
    UnknownSchedule(String),

    /// Transition attempted on an enrollment in a terminal status.
    #[error("Enrollment is already terminal ({status})")]
    AlreadyTerminal { status: EnrollmentStatus },

    /// Fast-forward to a nonexistent or earlier milestone.
    #[error("Invalid transition from '{from}' to '{to}': {reason}")]
    InvalidTransition { from: String, to: String, reason: String },
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, TrackingError>;

/// A per-enrollment failure isolated during a batch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentFailure {
    pub enrollment_id: EnrollmentId,
    pub error: TrackingError,
}
