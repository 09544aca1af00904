//! Fluent builder for conjunctive enrollment queries.

use chrono::{DateTime, Utc};

use crate::enrollment::{Enrollment, EnrollmentStatus};
use crate::resolver::WindowBoundsSource;
use crate::schema::WindowName;

use super::criterion::{Criterion, InstantRange};
use super::evaluator::FilterOutcome;

/// Collects criteria and ANDs them, in the order they were added.
///
/// ```
/// use cadence_tracking::{EnrollmentsQuery, WindowName};
/// use chrono::{TimeZone, Utc};
///
/// let start = Utc.with_ymd_and_hms(2012, 2, 3, 0, 0, 0).unwrap();
/// let end = Utc.with_ymd_and_hms(2012, 2, 5, 23, 59, 59).unwrap();
/// let query = EnrollmentsQuery::new()
///     .having_schedule(["Delivery"])
///     .having_window_starting_during(WindowName::Due, start, end);
/// assert_eq!(query.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EnrollmentsQuery {
    criteria: Vec<Criterion>,
}

impl EnrollmentsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn having_window_starting_during(
        self,
        window: WindowName,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        self.matching(Criterion::start_of_window(window, start, end))
    }

    pub fn having_window_ending_during(
        self,
        window: WindowName,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        self.matching(Criterion::end_of_window(window, start, end))
    }

    pub fn currently_in_windows(self, windows: &[WindowName], at: DateTime<Utc>) -> Self {
        self.matching(Criterion::InWindow {
            windows: windows.to_vec(),
            at,
        })
    }

    pub fn overdue_at(self, at: DateTime<Utc>) -> Self {
        self.matching(Criterion::Overdue { at })
    }

    pub fn having_status(self, status: EnrollmentStatus) -> Self {
        self.matching(Criterion::status(status))
    }

    pub fn active(self) -> Self {
        self.having_status(EnrollmentStatus::Active)
    }

    pub fn having_milestone(self, name: impl Into<String>) -> Self {
        self.matching(Criterion::milestone(name))
    }

    pub fn having_schedule<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.matching(Criterion::Schedule {
            names: names.into_iter().map(Into::into).collect(),
        })
    }

    pub fn having_external_id<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.matching(Criterion::ExternalId {
            ids: ids.into_iter().map(Into::into).collect(),
        })
    }

    pub fn having_metadata(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.matching(Criterion::Metadata {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn ended_during(self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.matching(Criterion::EndedDuring {
            range: InstantRange::new(start, end),
        })
    }

    pub fn matching(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Collapse into a single criterion. An empty query matches everything.
    pub fn build(self) -> Criterion {
        let mut criteria = self.criteria;
        if criteria.len() == 1 {
            return criteria.remove(0);
        }
        Criterion::And { criteria }
    }

    pub fn execute<'a, S>(self, enrollments: &'a [Enrollment], source: &S) -> FilterOutcome<'a>
    where
        S: WindowBoundsSource + ?Sized,
    {
        self.build().filter(enrollments, source)
    }
}
