//! [`ScheduleRegistry`]: validated schedule definitions keyed by name.
//!
//! Enrollments reference their schedule by name; the registry routes each
//! enrollment to its definition for resolution and advancement.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::advancement::AdvancementEngine;
use crate::enrollment::Enrollment;
use crate::error::{Result, TrackingError};
use crate::resolver::{milestone_windows, resolve_current_window, MilestoneWindows, WindowBoundsSource, WindowState};
use crate::schema::ScheduleDefinition;

#[derive(Debug, Clone, Default)]
pub struct ScheduleRegistry {
    schedules: HashMap<String, Arc<ScheduleDefinition>>,
}

impl ScheduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting duplicate schedule names.
    pub fn from_definitions(definitions: impl IntoIterator<Item = ScheduleDefinition>) -> Result<Self> {
        let mut registry = Self::new();
        for definition in definitions {
            if registry.schedules.contains_key(definition.name()) {
                return Err(TrackingError::InvalidSchedule {
                    schedule: definition.name().to_string(),
                    reason: "duplicate schedule name".to_string(),
                });
            }
            registry.register(definition);
        }
        Ok(registry)
    }

    /// Add or replace a definition. Returns the replaced one, if any.
    ///
    /// Enrollments keep referring to the schedule by name, so a replacement
    /// that drops milestones surfaces later as `UnknownMilestone`.
    pub fn register(&mut self, definition: ScheduleDefinition) -> Option<Arc<ScheduleDefinition>> {
        let name = definition.name().to_string();
        let previous = self.schedules.insert(name.clone(), Arc::new(definition));
        if previous.is_some() {
            warn!(schedule = %name, "schedule definition replaced");
        } else {
            debug!(schedule = %name, "schedule definition registered");
        }
        previous
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<ScheduleDefinition>> {
        self.schedules.remove(name)
    }

    pub fn get(&self, name: &str) -> Result<&Arc<ScheduleDefinition>> {
        self.schedules
            .get(name)
            .ok_or_else(|| TrackingError::UnknownSchedule(name.to_string()))
    }

    /// The definition the enrollment refers to.
    pub fn schedule_for(&self, enrollment: &Enrollment) -> Result<&ScheduleDefinition> {
        self.get(&enrollment.schedule_name).map(Arc::as_ref)
    }

    /// Advancement engine bound to the enrollment's schedule.
    pub fn advancement_for(&self, enrollment: &Enrollment) -> Result<AdvancementEngine<'_>> {
        self.schedule_for(enrollment).map(AdvancementEngine::new)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schedules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}

impl WindowBoundsSource for ScheduleRegistry {
    fn milestone_windows(&self, enrollment: &Enrollment) -> Result<MilestoneWindows> {
        milestone_windows(enrollment, self.schedule_for(enrollment)?)
    }

    fn current_window(&self, enrollment: &Enrollment, now: DateTime<Utc>) -> Result<WindowState> {
        if enrollment.status.is_terminal() {
            return Ok(WindowState::Terminal {
                milestone: enrollment.current_milestone.clone(),
                status: enrollment.status,
            });
        }
        resolve_current_window(enrollment, self.schedule_for(enrollment)?, now)
    }
}
