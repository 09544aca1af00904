//! Validated schedule definitions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackingError};

use super::milestone::Milestone;

/// Unvalidated schedule, as handed over by a configuration source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleSpec {
    pub name: String,
    pub milestones: Vec<Milestone>,
}

/// An immutable, validated protocol: an ordered sequence of milestones.
///
/// The only way to obtain one is through [`ScheduleDefinition::new`] (or
/// deserialization, which runs the same validation), so every instance
/// satisfies: at least one milestone, unique non-empty milestone names,
/// at least one window per milestone, and `start <= end` for every window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleSpec", into = "ScheduleSpec")]
pub struct ScheduleDefinition {
    name: String,
    milestones: Vec<Milestone>,
    positions: HashMap<String, usize>,
}

impl ScheduleDefinition {
    pub fn new(name: impl Into<String>, milestones: Vec<Milestone>) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: String| TrackingError::InvalidSchedule {
            schedule: name.clone(),
            reason,
        };

        if name.trim().is_empty() {
            return Err(invalid("schedule name is empty".to_string()));
        }
        if milestones.is_empty() {
            return Err(invalid("schedule has no milestones".to_string()));
        }

        let mut positions = HashMap::with_capacity(milestones.len());
        for (idx, milestone) in milestones.iter().enumerate() {
            if milestone.name.trim().is_empty() {
                return Err(invalid(format!("milestone #{} has an empty name", idx + 1)));
            }
            if positions.insert(milestone.name.clone(), idx).is_some() {
                return Err(invalid(format!("duplicate milestone name '{}'", milestone.name)));
            }
            if milestone.windows.is_empty() {
                return Err(invalid(format!("milestone '{}' has no windows", milestone.name)));
            }
            if let Some((window, w)) = milestone.windows.iter().find(|(_, w)| !w.is_ordered()) {
                let offset = TrackingError::InvalidOffset {
                    start: w.start,
                    end: w.end,
                };
                return Err(invalid(format!(
                    "window '{}' of milestone '{}': {}",
                    window, milestone.name, offset
                )));
            }
        }

        Ok(Self {
            name,
            milestones,
            positions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn len(&self) -> usize {
        self.milestones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.milestones.is_empty()
    }

    /// Index of a milestone in the advancement order.
    pub fn position(&self, milestone: &str) -> Option<usize> {
        self.positions.get(milestone).copied()
    }

    pub fn milestone(&self, name: &str) -> Result<&Milestone> {
        self.position(name)
            .map(|idx| &self.milestones[idx])
            .ok_or_else(|| self.unknown(name))
    }

    pub fn first_milestone(&self) -> &Milestone {
        &self.milestones[0]
    }

    pub fn last_milestone(&self) -> &Milestone {
        &self.milestones[self.milestones.len() - 1]
    }

    /// Milestone following `current`; `None` when `current` is the last one.
    pub fn next_milestone(&self, current: &str) -> Result<Option<&Milestone>> {
        let idx = self.position(current).ok_or_else(|| self.unknown(current))?;
        Ok(self.milestones.get(idx + 1))
    }

    pub fn is_last(&self, milestone: &str) -> bool {
        self.position(milestone) == Some(self.milestones.len() - 1)
    }

    fn unknown(&self, milestone: &str) -> TrackingError {
        TrackingError::UnknownMilestone {
            schedule: self.name.clone(),
            milestone: milestone.to_string(),
        }
    }
}

impl TryFrom<ScheduleSpec> for ScheduleDefinition {
    type Error = TrackingError;

    fn try_from(spec: ScheduleSpec) -> Result<Self> {
        Self::new(spec.name, spec.milestones)
    }
}

impl From<ScheduleDefinition> for ScheduleSpec {
    fn from(def: ScheduleDefinition) -> Self {
        Self {
            name: def.name,
            milestones: def.milestones,
        }
    }
}
