//! Window resolution: which window of the current milestone contains "now".
//!
//! Resolution is a pure function of (enrollment, schedule, now). It never
//! mutates the enrollment and is safe to run concurrently over a snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculus::{contains, resolve_window, EndBound, WindowBounds};
use crate::enrollment::{Enrollment, EnrollmentStatus};
use crate::error::{Result, TrackingError};
use crate::schema::{Milestone, ScheduleDefinition, WindowName};

// ── Absolute boundaries ─────────────────────────────────────────────

/// Absolute boundaries of every window of one milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneWindows {
    milestone: String,
    bounds: BTreeMap<WindowName, WindowBounds>,
}

impl MilestoneWindows {
    /// Resolve every window of `milestone` against `reference`.
    pub fn compute(milestone: &Milestone, reference: DateTime<Utc>) -> Result<Self> {
        let bounds = milestone
            .windows
            .iter()
            .map(|(name, window)| resolve_window(reference, window).map(|b| (*name, b)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            milestone: milestone.name.clone(),
            bounds,
        })
    }

    pub fn milestone(&self) -> &str {
        &self.milestone
    }

    pub fn bounds(&self, window: WindowName) -> Option<&WindowBounds> {
        self.bounds.get(&window)
    }

    pub fn start_of(&self, window: WindowName) -> Option<DateTime<Utc>> {
        self.bounds(window).map(|b| b.start)
    }

    pub fn end_of(&self, window: WindowName) -> Option<DateTime<Utc>> {
        self.bounds(window).map(|b| b.end)
    }

    /// Windows in lateness order, earliest first.
    pub fn iter(&self) -> impl Iterator<Item = (WindowName, &WindowBounds)> {
        self.bounds.iter().map(|(name, b)| (*name, b))
    }

    /// The latest-named window, whose end is closed.
    pub fn last_window(&self) -> Option<WindowName> {
        self.bounds.keys().next_back().copied()
    }

    /// Earliest start across all windows.
    pub fn opens_at(&self) -> Option<DateTime<Utc>> {
        self.bounds.values().map(|b| b.start).min()
    }

    /// Latest end across all windows: the milestone's hard deadline.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.bounds.values().map(|b| b.end).max()
    }

    /// The latest-named window containing `now`.
    ///
    /// The last-named window and any window ending at the deadline are
    /// closed at their end, so the deadline instant is never overdue.
    pub fn window_at(&self, now: DateTime<Utc>) -> Option<(WindowName, WindowBounds)> {
        let last = self.last_window()?;
        let deadline = self.deadline()?;
        self.bounds.iter().rev().find_map(|(name, b)| {
            let end = if *name == last || b.end == deadline {
                EndBound::Closed
            } else {
                EndBound::Open
            };
            contains(now, b, end).then_some((*name, *b))
        })
    }

    /// Classify `now` against this milestone's windows.
    pub fn state_at(&self, now: DateTime<Utc>) -> WindowState {
        let milestone = self.milestone.clone();
        if let Some((window, bounds)) = self.window_at(now) {
            return WindowState::InWindow {
                milestone,
                window,
                bounds,
            };
        }

        let opens_at = self.opens_at().unwrap_or(now);
        if now < opens_at {
            return WindowState::BeforeSchedule { milestone, opens_at };
        }

        let deadline = self.deadline().unwrap_or(now);
        let next = self
            .bounds
            .iter()
            .filter(|(_, b)| b.start > now)
            .min_by_key(|(name, b)| (b.start, **name));
        match next {
            Some((name, b)) if now < deadline => WindowState::BetweenWindows {
                milestone,
                next_window: *name,
                opens_at: b.start,
            },
            _ => WindowState::Overdue { milestone, deadline },
        }
    }
}

// ── Window state ────────────────────────────────────────────────────

/// Where "now" falls relative to an enrollment's current milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WindowState {
    /// Before the first window opens.
    BeforeSchedule {
        milestone: String,
        opens_at: DateTime<Utc>,
    },
    /// Inside `window` (late-wins when windows overlap).
    InWindow {
        milestone: String,
        window: WindowName,
        bounds: WindowBounds,
    },
    /// In a gap between non-contiguous windows.
    BetweenWindows {
        milestone: String,
        next_window: WindowName,
        opens_at: DateTime<Utc>,
    },
    /// Past the hard deadline of the milestone.
    Overdue {
        milestone: String,
        deadline: DateTime<Utc>,
    },
    /// The enrollment is no longer active; milestone and status are frozen.
    Terminal {
        milestone: String,
        status: EnrollmentStatus,
    },
}

impl WindowState {
    pub fn milestone(&self) -> &str {
        match self {
            WindowState::BeforeSchedule { milestone, .. }
            | WindowState::InWindow { milestone, .. }
            | WindowState::BetweenWindows { milestone, .. }
            | WindowState::Overdue { milestone, .. }
            | WindowState::Terminal { milestone, .. } => milestone,
        }
    }

    /// The window containing "now", if any.
    pub fn window(&self) -> Option<WindowName> {
        match self {
            WindowState::InWindow { window, .. } => Some(*window),
            _ => None,
        }
    }

    pub fn is_overdue(&self) -> bool {
        matches!(self, WindowState::Overdue { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WindowState::Terminal { .. })
    }
}

// ── Resolution ──────────────────────────────────────────────────────

/// Absolute window boundaries of the enrollment's current milestone.
///
/// Works regardless of status; callers that need "active only" semantics
/// check the status themselves. Fails with `UnknownSchedule` when the
/// enrollment belongs to another schedule.
pub fn milestone_windows(
    enrollment: &Enrollment,
    schedule: &ScheduleDefinition,
) -> Result<MilestoneWindows> {
    ensure_same_schedule(enrollment, schedule)?;
    let milestone = schedule.milestone(&enrollment.current_milestone)?;
    MilestoneWindows::compute(milestone, enrollment.reference_instant)
}

/// Reject an enrollment that refers to a schedule other than `schedule`.
pub(crate) fn ensure_same_schedule(enrollment: &Enrollment, schedule: &ScheduleDefinition) -> Result<()> {
    if enrollment.schedule_name != schedule.name() {
        return Err(TrackingError::UnknownSchedule(enrollment.schedule_name.clone()));
    }
    Ok(())
}

/// Resolve which window of the current milestone contains `now`.
///
/// Non-active enrollments yield [`WindowState::Terminal`] instead of an
/// error. Fails with `UnknownSchedule` for an enrollment of another
/// schedule and with `UnknownMilestone` when the schedule no longer holds
/// the enrollment's current milestone.
pub fn resolve_current_window(
    enrollment: &Enrollment,
    schedule: &ScheduleDefinition,
    now: DateTime<Utc>,
) -> Result<WindowState> {
    if enrollment.status.is_terminal() {
        return Ok(WindowState::Terminal {
            milestone: enrollment.current_milestone.clone(),
            status: enrollment.status,
        });
    }
    let state = milestone_windows(enrollment, schedule)?.state_at(now);
    debug!(
        enrollment_id = %enrollment.id,
        schedule = %schedule.name(),
        milestone = %state.milestone(),
        window = ?state.window(),
        "resolved window state"
    );
    Ok(state)
}

/// Capability the criterion engine and sweep depend on: boundary and state
/// lookups for an enrollment's current milestone.
pub trait WindowBoundsSource: Sync {
    /// Absolute boundaries of the enrollment's current milestone.
    fn milestone_windows(&self, enrollment: &Enrollment) -> Result<MilestoneWindows>;

    /// Window state of the enrollment at `now`.
    fn current_window(&self, enrollment: &Enrollment, now: DateTime<Utc>) -> Result<WindowState>;

    /// Start instant of `window` for the current milestone; `None` when the
    /// milestone lacks that window.
    fn start_of_window(
        &self,
        enrollment: &Enrollment,
        window: WindowName,
    ) -> Result<Option<DateTime<Utc>>> {
        Ok(self.milestone_windows(enrollment)?.start_of(window))
    }

    /// End instant of `window` for the current milestone.
    fn end_of_window(
        &self,
        enrollment: &Enrollment,
        window: WindowName,
    ) -> Result<Option<DateTime<Utc>>> {
        Ok(self.milestone_windows(enrollment)?.end_of(window))
    }
}

/// Resolver bound to a single schedule definition.
#[derive(Debug, Clone, Copy)]
pub struct WindowResolver<'a> {
    schedule: &'a ScheduleDefinition,
}

impl<'a> WindowResolver<'a> {
    pub fn new(schedule: &'a ScheduleDefinition) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &'a ScheduleDefinition {
        self.schedule
    }
}

impl WindowBoundsSource for WindowResolver<'_> {
    fn milestone_windows(&self, enrollment: &Enrollment) -> Result<MilestoneWindows> {
        milestone_windows(enrollment, self.schedule)
    }

    fn current_window(&self, enrollment: &Enrollment, now: DateTime<Utc>) -> Result<WindowState> {
        resolve_current_window(enrollment, self.schedule, now)
    }
}

// ── Alert snapshot ──────────────────────────────────────────────────

/// Window start instants of an enrollment's current milestone, handed to
/// the alert dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneAlert {
    pub schedule_name: String,
    pub milestone: String,
    pub earliest_start: Option<DateTime<Utc>>,
    pub due: Option<DateTime<Utc>>,
    pub late: Option<DateTime<Utc>>,
    pub max: Option<DateTime<Utc>>,
    /// End of the last window.
    pub deadline: Option<DateTime<Utc>>,
}

impl MilestoneAlert {
    pub fn from_windows(enrollment: &Enrollment, windows: &MilestoneWindows) -> Self {
        Self {
            schedule_name: enrollment.schedule_name.clone(),
            milestone: windows.milestone().to_string(),
            earliest_start: windows.start_of(WindowName::EarliestStart),
            due: windows.start_of(WindowName::Due),
            late: windows.start_of(WindowName::Late),
            max: windows.start_of(WindowName::Max),
            deadline: windows.deadline(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::schema::Window;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2012, 2, 1, 0, 0, 0).unwrap()
    }

    fn day(n: i64) -> DateTime<Utc> {
        t0() + Duration::days(n)
    }

    /// earliest [0,7) due [7,14) late [14,21) max [21,28]
    fn schedule() -> ScheduleDefinition {
        ScheduleDefinition::new(
            "Delivery",
            vec![
                Milestone::contiguous_days("ANC 1", 7, 14, 21, 28),
                Milestone::contiguous_days("ANC 2", 7, 14, 21, 28),
            ],
        )
        .unwrap()
    }

    fn enrollment(schedule: &ScheduleDefinition) -> Enrollment {
        Enrollment::new("patient-7", schedule, t0())
    }

    fn window_at(n_days: i64, secs: i64) -> WindowState {
        let s = schedule();
        let e = enrollment(&s);
        resolve_current_window(&e, &s, day(n_days) + Duration::seconds(secs)).unwrap()
    }

    #[test]
    fn reports_each_contiguous_window() {
        assert_eq!(window_at(0, 0).window(), Some(WindowName::EarliestStart));
        assert_eq!(window_at(6, 86_399).window(), Some(WindowName::EarliestStart));
        assert_eq!(window_at(7, 0).window(), Some(WindowName::Due));
        assert_eq!(window_at(14, 0).window(), Some(WindowName::Late));
        assert_eq!(window_at(21, 0).window(), Some(WindowName::Max));
    }

    #[test]
    fn before_first_window() {
        let state = window_at(0, -1);
        assert_eq!(
            state,
            WindowState::BeforeSchedule {
                milestone: "ANC 1".to_string(),
                opens_at: t0(),
            }
        );
    }

    #[test]
    fn deadline_instant_is_still_in_max() {
        assert_eq!(window_at(28, 0).window(), Some(WindowName::Max));
    }

    #[test]
    fn after_deadline_is_overdue() {
        let state = window_at(28, 1);
        assert!(state.is_overdue());
        assert_eq!(
            state,
            WindowState::Overdue {
                milestone: "ANC 1".to_string(),
                deadline: day(28),
            }
        );
    }

    #[test]
    fn every_instant_has_exactly_one_classification() {
        let s = schedule();
        let e = enrollment(&s);
        let mut hour = -24;
        while hour <= 30 * 24 {
            let now = t0() + Duration::hours(hour);
            let state = resolve_current_window(&e, &s, now).unwrap();
            let windows = milestone_windows(&e, &s).unwrap();
            match &state {
                WindowState::InWindow { window, .. } => {
                    // No later-named window may also contain `now`.
                    let later_hit = windows.iter().any(|(name, b)| {
                        name > *window
                            && contains(
                                now,
                                b,
                                if name == WindowName::Max { EndBound::Closed } else { EndBound::Open },
                            )
                    });
                    assert!(!later_hit, "late-wins violated at {}", now);
                }
                WindowState::BeforeSchedule { .. } => assert!(now < t0()),
                WindowState::Overdue { .. } => assert!(now > day(28)),
                other => panic!("unexpected state {:?} at {}", other, now),
            }
            hour += 1;
        }
    }

    #[test]
    fn overlapping_windows_prefer_later_name() {
        let milestone = Milestone::new("Overlap")
            .with_window(WindowName::EarliestStart, Window::days(0, 10))
            .with_window(WindowName::Due, Window::days(5, 12))
            .with_window(WindowName::Late, Window::days(8, 12));
        let s = ScheduleDefinition::new("Overlap", vec![milestone]).unwrap();
        let e = enrollment(&s);
        assert_eq!(
            resolve_current_window(&e, &s, day(4)).unwrap().window(),
            Some(WindowName::EarliestStart)
        );
        assert_eq!(
            resolve_current_window(&e, &s, day(6)).unwrap().window(),
            Some(WindowName::Due)
        );
        assert_eq!(
            resolve_current_window(&e, &s, day(9)).unwrap().window(),
            Some(WindowName::Late)
        );
    }

    #[test]
    fn gap_between_windows() {
        let milestone = Milestone::new("Gappy")
            .with_window(WindowName::EarliestStart, Window::days(0, 3))
            .with_window(WindowName::Due, Window::days(5, 8));
        let s = ScheduleDefinition::new("Gappy", vec![milestone]).unwrap();
        let e = enrollment(&s);
        assert_eq!(
            resolve_current_window(&e, &s, day(4)).unwrap(),
            WindowState::BetweenWindows {
                milestone: "Gappy".to_string(),
                next_window: WindowName::Due,
                opens_at: day(5),
            }
        );
        // `due` is the last window here, so its end is closed.
        assert_eq!(
            resolve_current_window(&e, &s, day(8)).unwrap().window(),
            Some(WindowName::Due)
        );
    }

    #[test]
    fn terminal_enrollment_reports_frozen_state() {
        let s = schedule();
        let mut e = enrollment(&s);
        e.status = EnrollmentStatus::Defaulted;
        e.current_milestone = "gone".to_string();
        let state = resolve_current_window(&e, &s, day(3)).unwrap();
        assert_eq!(
            state,
            WindowState::Terminal {
                milestone: "gone".to_string(),
                status: EnrollmentStatus::Defaulted,
            }
        );
    }

    #[test]
    fn unknown_milestone_is_an_error() {
        let s = schedule();
        let mut e = enrollment(&s);
        e.current_milestone = "ANC 9".to_string();
        let err = resolve_current_window(&e, &s, day(1)).unwrap_err();
        assert_eq!(
            err,
            TrackingError::UnknownMilestone {
                schedule: "Delivery".to_string(),
                milestone: "ANC 9".to_string(),
            }
        );
    }

    #[test]
    fn window_ending_at_deadline_is_closed_even_when_not_last() {
        // late [8,14) outlasts max [10,12]
        let milestone = Milestone::new("Long late")
            .with_window(WindowName::Due, Window::days(0, 8))
            .with_window(WindowName::Late, Window::days(8, 14))
            .with_window(WindowName::Max, Window::days(10, 12));
        let s = ScheduleDefinition::new("Long late", vec![milestone]).unwrap();
        let e = enrollment(&s);
        let at = |when| resolve_current_window(&e, &s, when).unwrap();

        assert_eq!(at(day(12)).window(), Some(WindowName::Max));
        assert_eq!(at(day(13)).window(), Some(WindowName::Late));
        assert_eq!(at(day(14)).window(), Some(WindowName::Late));
        assert_eq!(
            at(day(14) + Duration::seconds(1)),
            WindowState::Overdue {
                milestone: "Long late".to_string(),
                deadline: day(14),
            }
        );
    }

    #[test]
    fn enrollment_of_another_schedule_is_rejected() {
        let s = schedule();
        let other = ScheduleDefinition::new(
            "Postnatal",
            vec![Milestone::contiguous_days("ANC 1", 1, 2, 3, 4)],
        )
        .unwrap();
        let e = enrollment(&other);
        let expected = TrackingError::UnknownSchedule("Postnatal".to_string());

        assert_eq!(resolve_current_window(&e, &s, day(1)).unwrap_err(), expected);
        assert_eq!(milestone_windows(&e, &s).unwrap_err(), expected);
        let resolver = WindowResolver::new(&s);
        assert_eq!(resolver.current_window(&e, day(1)).unwrap_err(), expected);
        assert_eq!(resolver.start_of_window(&e, WindowName::Due).unwrap_err(), expected);
    }

    #[test]
    fn resolution_does_not_touch_enrollment() {
        let s = schedule();
        let e = enrollment(&s);
        let before = e.clone();
        let first = resolve_current_window(&e, &s, day(9)).unwrap();
        let second = resolve_current_window(&e, &s, day(9)).unwrap();
        assert_eq!(first, second);
        assert_eq!(e, before);
    }

    #[test]
    fn alert_snapshot_lists_window_starts() {
        let s = schedule();
        let e = enrollment(&s);
        let windows = WindowResolver::new(&s).milestone_windows(&e).unwrap();
        let alert = MilestoneAlert::from_windows(&e, &windows);
        assert_eq!(alert.milestone, "ANC 1");
        assert_eq!(alert.earliest_start, Some(day(0)));
        assert_eq!(alert.due, Some(day(7)));
        assert_eq!(alert.late, Some(day(14)));
        assert_eq!(alert.max, Some(day(21)));
        assert_eq!(alert.deadline, Some(day(28)));
    }
}
