//! One scheduling cycle over an immutable enrollment snapshot.
//!
//! The periodic loop that calls [`Sweep::run`] lives outside this crate.
//! A sweep resolves every enrollment's window state at an explicit `now`,
//! selects alert candidates with start-of-window criteria, and optionally
//! proposes `default` transitions for overdue enrollments. Nothing is
//! committed: the caller persists proposed transitions and dispatches alerts.

use std::collections::HashSet;
use std::str::FromStr;

use cadence_core::config::SweepConfig;
use cadence_core::CoreError;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::criteria::Criterion;
use crate::enrollment::{Enrollment, EnrollmentId};
use crate::error::{EnrollmentFailure, Result};
use crate::registry::ScheduleRegistry;
use crate::resolver::{WindowBoundsSource, WindowState};
use crate::schema::WindowName;

/// An enrollment whose `window` opens within the sweep's lookahead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertCandidate {
    pub enrollment_id: EnrollmentId,
    pub external_id: String,
    pub schedule_name: String,
    pub milestone: String,
    pub window: WindowName,
    pub starts_at: DateTime<Utc>,
    pub preferred_alert_time: Option<NaiveTime>,
}

/// Everything one sweep decided.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Window state per successfully resolved enrollment, in input order.
    pub states: Vec<(EnrollmentId, WindowState)>,
    /// Alert candidates grouped by window (configured order), input order
    /// within each window.
    pub alerts: Vec<AlertCandidate>,
    /// Defaulted enrollment values awaiting commit.
    pub defaults: Vec<Enrollment>,
    pub failures: Vec<EnrollmentFailure>,
}

impl SweepReport {
    pub fn state_of(&self, id: EnrollmentId) -> Option<&WindowState> {
        self.states.iter().find(|(e, _)| *e == id).map(|(_, s)| s)
    }
}

pub struct Sweep<'a> {
    registry: &'a ScheduleRegistry,
    lookahead: Duration,
    alert_windows: Vec<WindowName>,
    parallel: bool,
    auto_default: bool,
}

impl<'a> Sweep<'a> {
    /// Sweep with default settings: one hour lookahead, every window.
    pub fn new(registry: &'a ScheduleRegistry) -> Self {
        Self {
            registry,
            lookahead: Duration::hours(1),
            alert_windows: WindowName::ALL.to_vec(),
            parallel: true,
            auto_default: false,
        }
    }

    /// Sweep configured from [`SweepConfig`]; unknown window names are
    /// rejected.
    pub fn from_config(registry: &'a ScheduleRegistry, config: &SweepConfig) -> cadence_core::Result<Self> {
        let alert_windows = config
            .alert_windows
            .iter()
            .map(|name| {
                WindowName::from_str(name).map_err(|message| CoreError::InvalidValue {
                    key: "CADENCE_ALERT_WINDOWS".to_string(),
                    message,
                })
            })
            .collect::<cadence_core::Result<Vec<_>>>()?;
        Ok(Self::new(registry)
            .with_lookahead(config.lookahead)
            .with_alert_windows(alert_windows)
            .parallel(config.parallel)
            .auto_default(config.auto_default))
    }

    pub fn with_lookahead(mut self, lookahead: Duration) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn with_alert_windows(mut self, windows: Vec<WindowName>) -> Self {
        self.alert_windows = windows;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn auto_default(mut self, auto_default: bool) -> Self {
        self.auto_default = auto_default;
        self
    }

    /// Run one cycle at `now` over `enrollments`.
    pub fn run(&self, enrollments: &[Enrollment], now: DateTime<Utc>) -> SweepReport {
        let resolve = |e: &Enrollment| (e.id, self.registry.current_window(e, now));
        let resolved: Vec<(EnrollmentId, Result<WindowState>)> = if self.parallel {
            enrollments.par_iter().map(resolve).collect()
        } else {
            enrollments.iter().map(resolve).collect()
        };

        let mut report = SweepReport::default();
        let mut failed: HashSet<EnrollmentId> = HashSet::new();
        for (enrollment_id, result) in resolved {
            match result {
                Ok(state) => report.states.push((enrollment_id, state)),
                Err(error) => {
                    warn!(enrollment_id = %enrollment_id, error = %error, "window resolution failed");
                    failed.insert(enrollment_id);
                    report.failures.push(EnrollmentFailure { enrollment_id, error });
                }
            }
        }

        self.collect_alerts(enrollments, now, &mut failed, &mut report);
        if self.auto_default {
            self.collect_defaults(enrollments, now, &mut report);
        }

        info!(
            enrollments = enrollments.len(),
            alerts = report.alerts.len(),
            defaults = report.defaults.len(),
            failures = report.failures.len(),
            "sweep complete"
        );
        report
    }

    fn collect_alerts(
        &self,
        enrollments: &[Enrollment],
        now: DateTime<Utc>,
        failed: &mut HashSet<EnrollmentId>,
        report: &mut SweepReport,
    ) {
        let Some(until) = now.checked_add_signed(self.lookahead) else {
            warn!("sweep lookahead overflows, no alerts selected");
            return;
        };

        for window in &self.alert_windows {
            let outcome = Criterion::start_of_window(*window, now, until).filter(enrollments, self.registry);
            for enrollment in outcome.matched {
                // Matched implies the window resolved, so the lookup succeeds.
                if let Ok(Some(starts_at)) = self.registry.start_of_window(enrollment, *window) {
                    report.alerts.push(AlertCandidate {
                        enrollment_id: enrollment.id,
                        external_id: enrollment.external_id.clone(),
                        schedule_name: enrollment.schedule_name.clone(),
                        milestone: enrollment.current_milestone.clone(),
                        window: *window,
                        starts_at,
                        preferred_alert_time: enrollment.preferred_alert_time,
                    });
                }
            }
            for failure in outcome.failures {
                if failed.insert(failure.enrollment_id) {
                    report.failures.push(failure);
                }
            }
        }
    }

    fn collect_defaults(&self, enrollments: &[Enrollment], now: DateTime<Utc>, report: &mut SweepReport) {
        let overdue: HashSet<EnrollmentId> = report
            .states
            .iter()
            .filter(|(_, state)| state.is_overdue())
            .map(|(id, _)| *id)
            .collect();

        for enrollment in enrollments.iter().filter(|e| overdue.contains(&e.id)) {
            let defaulted = self
                .registry
                .advancement_for(enrollment)
                .and_then(|engine| engine.default(enrollment, now));
            match defaulted {
                Ok(value) => report.defaults.push(value),
                Err(error) => {
                    warn!(enrollment_id = %enrollment.id, error = %error, "default proposal failed");
                    report.failures.push(EnrollmentFailure {
                        enrollment_id: enrollment.id,
                        error,
                    });
                }
            }
        }
    }
}
