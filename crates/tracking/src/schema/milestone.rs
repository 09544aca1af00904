//! A single stage of a schedule.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::window::{Window, WindowName};

/// One protocol stage with its named windows.
///
/// Windows are keyed by [`WindowName`], so iteration always runs from
/// `earliest_start` to `max`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Milestone {
    pub name: String,
    pub windows: BTreeMap<WindowName, Window>,
    /// Protocol annotations carried for collaborators (e.g. visit type).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl Milestone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            windows: BTreeMap::new(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_window(mut self, name: WindowName, window: Window) -> Self {
        self.windows.insert(name, window);
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Contiguous milestone from day boundaries: `earliest_start` covers
    /// `[0, due)`, `due` covers `[due, late)`, and so on up to `max_end`.
    pub fn contiguous_days(name: impl Into<String>, due: i64, late: i64, max: i64, max_end: i64) -> Self {
        Self::new(name)
            .with_window(WindowName::EarliestStart, Window::days(0, due))
            .with_window(WindowName::Due, Window::days(due, late))
            .with_window(WindowName::Late, Window::days(late, max))
            .with_window(WindowName::Max, Window::days(max, max_end))
    }

    pub fn window(&self, name: WindowName) -> Option<&Window> {
        self.windows.get(&name)
    }

    pub fn has_window(&self, name: WindowName) -> bool {
        self.windows.contains_key(&name)
    }

    /// The latest-named window present; its end is closed.
    pub fn last_window(&self) -> Option<WindowName> {
        self.windows.keys().next_back().copied()
    }
}
