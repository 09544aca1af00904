//! Window names and relative window offsets.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Named windows of a milestone.
///
/// Declaration order is lateness order: when windows overlap, the greater
/// name wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowName {
    EarliestStart,
    Due,
    Late,
    Max,
}

impl WindowName {
    /// All window names, earliest first.
    pub const ALL: [WindowName; 4] = [
        WindowName::EarliestStart,
        WindowName::Due,
        WindowName::Late,
        WindowName::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WindowName::EarliestStart => "earliest_start",
            WindowName::Due => "due",
            WindowName::Late => "late",
            WindowName::Max => "max",
        }
    }
}

impl fmt::Display for WindowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "earliest_start" | "earlieststart" | "earliest" => Ok(WindowName::EarliestStart),
            "due" => Ok(WindowName::Due),
            "late" => Ok(WindowName::Late),
            "max" => Ok(WindowName::Max),
            other => Err(format!("unknown window name '{}'", other)),
        }
    }
}

/// Start and end offsets of one window, relative to a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Window {
    #[serde(with = "cadence_core::offset::serde_offset")]
    pub start: Duration,
    #[serde(with = "cadence_core::offset::serde_offset")]
    pub end: Duration,
}

impl Window {
    pub fn new(start: Duration, end: Duration) -> Self {
        Self { start, end }
    }

    /// Window spanning whole days: `[start_days, end_days)`.
    pub fn days(start_days: i64, end_days: i64) -> Self {
        Self::new(Duration::days(start_days), Duration::days(end_days))
    }

    /// Whether `start <= end`.
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }
}
