//! Advancement state machine.
//!
//! States are `ACTIVE(milestone)` plus the terminal `COMPLETED`,
//! `DEFAULTED` and `UNENROLLED`. Every transition borrows the enrollment and
//! returns a new value; a failed transition leaves the caller's value as it
//! was. Committing the result is the persistence collaborator's job.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::enrollment::{Enrollment, EnrollmentStatus, MilestoneFulfillment};
use crate::error::{Result, TrackingError};
use crate::resolver::{ensure_same_schedule, resolve_current_window};
use crate::schema::ScheduleDefinition;

/// Applies fulfillment, default, unenrollment and fast-forward events
/// against one schedule definition.
#[derive(Debug, Clone, Copy)]
pub struct AdvancementEngine<'a> {
    schedule: &'a ScheduleDefinition,
}

impl<'a> AdvancementEngine<'a> {
    pub fn new(schedule: &'a ScheduleDefinition) -> Self {
        Self { schedule }
    }

    /// Fulfill the current milestone at `now`.
    pub fn fulfill(&self, enrollment: &Enrollment, now: DateTime<Utc>) -> Result<Enrollment> {
        self.fulfill_at(enrollment, now)
    }

    /// Fulfill the current milestone at a caller-supplied (possibly
    /// backdated) instant.
    ///
    /// Moves to the next milestone measured from `fulfilled_at`, or to
    /// `COMPLETED` when the current milestone is the last one.
    pub fn fulfill_at(&self, enrollment: &Enrollment, fulfilled_at: DateTime<Utc>) -> Result<Enrollment> {
        self.ensure_applicable(enrollment)?;
        let next = self.schedule.next_milestone(&enrollment.current_milestone)?;

        let mut updated = enrollment.clone();
        updated.fulfillments.push(MilestoneFulfillment {
            milestone: enrollment.current_milestone.clone(),
            fulfilled_at,
        });

        match next {
            Some(milestone) => {
                updated.current_milestone = milestone.name.clone();
                updated.reference_instant = fulfilled_at;
                info!(
                    enrollment_id = %enrollment.id,
                    schedule = %self.schedule.name(),
                    from = %enrollment.current_milestone,
                    to = %milestone.name,
                    "milestone fulfilled"
                );
            }
            None => {
                updated.status = EnrollmentStatus::Completed;
                updated.ended_at = Some(fulfilled_at);
                info!(
                    enrollment_id = %enrollment.id,
                    schedule = %self.schedule.name(),
                    milestone = %enrollment.current_milestone,
                    "final milestone fulfilled, schedule completed"
                );
            }
        }
        Ok(updated)
    }

    /// Mark the enrollment as defaulted. Milestone and reference instant
    /// are frozen.
    pub fn default(&self, enrollment: &Enrollment, at: DateTime<Utc>) -> Result<Enrollment> {
        self.terminate(enrollment, EnrollmentStatus::Defaulted, at)
    }

    /// Default the enrollment only if its current milestone is overdue at
    /// `now`. Returns the (possibly unchanged) value and whether it changed.
    pub fn default_if_overdue(
        &self,
        enrollment: &Enrollment,
        now: DateTime<Utc>,
    ) -> Result<(Enrollment, bool)> {
        self.ensure_applicable(enrollment)?;
        if resolve_current_window(enrollment, self.schedule, now)?.is_overdue() {
            Ok((self.default(enrollment, now)?, true))
        } else {
            debug!(enrollment_id = %enrollment.id, "not overdue, default skipped");
            Ok((enrollment.clone(), false))
        }
    }

    /// Unenroll from any non-terminal state.
    pub fn unenroll(&self, enrollment: &Enrollment, at: DateTime<Utc>) -> Result<Enrollment> {
        self.terminate(enrollment, EnrollmentStatus::Unenrolled, at)
    }

    /// Jump to `target`, which must exist and not precede the current
    /// milestone. The target's windows are measured from `at`.
    /// Fast-forwarding to the current milestone is a no-op.
    pub fn fast_forward(
        &self,
        enrollment: &Enrollment,
        target: &str,
        at: DateTime<Utc>,
    ) -> Result<Enrollment> {
        self.ensure_applicable(enrollment)?;
        let invalid = |reason: &str| TrackingError::InvalidTransition {
            from: enrollment.current_milestone.clone(),
            to: target.to_string(),
            reason: reason.to_string(),
        };

        let current = self
            .schedule
            .position(&enrollment.current_milestone)
            .ok_or_else(|| TrackingError::UnknownMilestone {
                schedule: self.schedule.name().to_string(),
                milestone: enrollment.current_milestone.clone(),
            })?;
        let target_pos = self
            .schedule
            .position(target)
            .ok_or_else(|| invalid("target milestone does not exist"))?;

        if target_pos < current {
            return Err(invalid("target precedes the current milestone"));
        }
        if target_pos == current {
            debug!(enrollment_id = %enrollment.id, milestone = %target, "fast-forward to current milestone");
            return Ok(enrollment.clone());
        }

        let mut updated = enrollment.clone();
        updated.current_milestone = target.to_string();
        updated.reference_instant = at;
        info!(
            enrollment_id = %enrollment.id,
            schedule = %self.schedule.name(),
            from = %enrollment.current_milestone,
            to = %target,
            "fast-forwarded"
        );
        Ok(updated)
    }

    fn terminate(
        &self,
        enrollment: &Enrollment,
        status: EnrollmentStatus,
        at: DateTime<Utc>,
    ) -> Result<Enrollment> {
        self.ensure_applicable(enrollment)?;
        let mut updated = enrollment.clone();
        updated.status = status;
        updated.ended_at = Some(at);
        info!(
            enrollment_id = %enrollment.id,
            schedule = %self.schedule.name(),
            milestone = %enrollment.current_milestone,
            status = %status,
            "enrollment terminated"
        );
        Ok(updated)
    }

    /// The enrollment must belong to this schedule and still be active.
    fn ensure_applicable(&self, enrollment: &Enrollment) -> Result<()> {
        ensure_same_schedule(enrollment, self.schedule)?;
        ensure_active(enrollment)
    }
}

fn ensure_active(enrollment: &Enrollment) -> Result<()> {
    if enrollment.status.is_terminal() {
        return Err(TrackingError::AlreadyTerminal {
            status: enrollment.status,
        });
    }
    Ok(())
}
