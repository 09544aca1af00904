//! Criterion evaluation and batch filtering.

use tracing::{debug, warn};

use crate::enrollment::Enrollment;
use crate::error::{EnrollmentFailure, Result};
use crate::resolver::WindowBoundsSource;

use super::criterion::Criterion;

/// Filtered enrollments plus per-enrollment failures.
#[derive(Debug)]
pub struct FilterOutcome<'a> {
    /// Matching enrollments in input order.
    pub matched: Vec<&'a Enrollment>,
    /// Enrollments that could not be evaluated.
    pub failures: Vec<EnrollmentFailure>,
}

impl FilterOutcome<'_> {
    pub fn matched_ids(&self) -> Vec<crate::enrollment::EnrollmentId> {
        self.matched.iter().map(|e| e.id).collect()
    }
}

impl Criterion {
    /// Evaluate this criterion against one enrollment.
    pub fn matches<S>(&self, enrollment: &Enrollment, source: &S) -> Result<bool>
    where
        S: WindowBoundsSource + ?Sized,
    {
        match self {
            Criterion::StartOfWindow { window, range } => {
                if !enrollment.is_active() {
                    return Ok(false);
                }
                Ok(source
                    .start_of_window(enrollment, *window)?
                    .is_some_and(|start| range.contains(start)))
            }
            Criterion::EndOfWindow { window, range } => {
                if !enrollment.is_active() {
                    return Ok(false);
                }
                Ok(source
                    .end_of_window(enrollment, *window)?
                    .is_some_and(|end| range.contains(end)))
            }
            Criterion::InWindow { windows, at } => {
                if !enrollment.is_active() {
                    return Ok(false);
                }
                let state = source.current_window(enrollment, *at)?;
                Ok(state.window().is_some_and(|w| windows.contains(&w)))
            }
            Criterion::Overdue { at } => {
                if !enrollment.is_active() {
                    return Ok(false);
                }
                Ok(source.current_window(enrollment, *at)?.is_overdue())
            }
            Criterion::Status { statuses } => Ok(statuses.contains(&enrollment.status)),
            Criterion::Milestone { name } => Ok(enrollment.current_milestone == *name),
            Criterion::Schedule { names } => Ok(names.contains(&enrollment.schedule_name)),
            Criterion::ExternalId { ids } => Ok(ids.contains(&enrollment.external_id)),
            Criterion::Metadata { key, value } => {
                Ok(enrollment.metadata.get(key).is_some_and(|v| v == value))
            }
            Criterion::EndedDuring { range } => {
                Ok(enrollment.ended_at.is_some_and(|at| range.contains(at)))
            }
            Criterion::And { criteria } => {
                for criterion in criteria {
                    if !criterion.matches(enrollment, source)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Criterion::Or { criteria } => {
                for criterion in criteria {
                    if criterion.matches(enrollment, source)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Criterion::Not { criterion } => Ok(!criterion.matches(enrollment, source)?),
        }
    }

    /// Keep the enrollments this criterion matches, preserving input order.
    ///
    /// An enrollment that fails to evaluate (e.g. its milestone vanished from
    /// the schedule) is reported in `failures` and the batch continues.
    pub fn filter<'a, S>(&self, enrollments: &'a [Enrollment], source: &S) -> FilterOutcome<'a>
    where
        S: WindowBoundsSource + ?Sized,
    {
        let mut matched = Vec::new();
        let mut failures = Vec::new();

        for enrollment in enrollments {
            match self.matches(enrollment, source) {
                Ok(true) => matched.push(enrollment),
                Ok(false) => {}
                Err(error) => {
                    warn!(
                        enrollment_id = %enrollment.id,
                        schedule = %enrollment.schedule_name,
                        error = %error,
                        "skipping enrollment in criterion filter"
                    );
                    failures.push(EnrollmentFailure {
                        enrollment_id: enrollment.id,
                        error,
                    });
                }
            }
        }

        debug!(
            candidates = enrollments.len(),
            matched = matched.len(),
            failed = failures.len(),
            "criterion filter complete"
        );

        FilterOutcome { matched, failures }
    }
}
