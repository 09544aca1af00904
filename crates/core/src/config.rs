use std::env;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::offset::{format_offset, parse_offset};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled value: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_opt(lookup: &dyn Fn(&str) -> Option<String>, profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = lookup(&prefixed).filter(|s| !s.is_empty()) {
            return Some(v);
        }
    }
    lookup(key).filter(|s| !s.is_empty())
}

fn profiled_duration(
    lookup: &dyn Fn(&str) -> Option<String>,
    profile: &str,
    key: &str,
    default: Duration,
) -> Result<Duration> {
    match profiled_opt(lookup, profile, key) {
        Some(v) => parse_offset(&v).map_err(|e| CoreError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn profiled_bool(
    lookup: &dyn Fn(&str) -> Option<String>,
    profile: &str,
    key: &str,
    default: bool,
) -> Result<bool> {
    match profiled_opt(lookup, profile, key) {
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(CoreError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a boolean, got '{}'", other),
            }),
        },
        None => Ok(default),
    }
}

fn profiled_list(
    lookup: &dyn Fn(&str) -> Option<String>,
    profile: &str,
    key: &str,
    default: &[&str],
) -> Vec<String> {
    match profiled_opt(lookup, profile, key) {
        Some(v) => v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        None => default.iter().map(|s| s.to_string()).collect(),
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub sweep: SweepConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `CADENCE_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self> {
        let profile = env_opt("CADENCE_PROFILE").unwrap_or_default();
        Self::for_profile(&profile, &env_opt)
    }

    /// Build config for a named profile from an arbitrary key lookup.
    pub fn for_profile(profile: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let p = profile.to_uppercase();
        Ok(Self {
            sweep: SweepConfig::from_lookup(lookup, &p)?,
            profile: p,
        })
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  sweep:       lookahead={}, parallel={}, auto_default={}",
            format_offset(&self.sweep.lookahead),
            self.sweep.parallel,
            self.sweep.auto_default
        );
        tracing::info!("  alerts:      windows={}", self.sweep.alert_windows.join(","));
    }

    /// Return a JSON view of the effective settings.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "sweep": {
                "lookahead": format_offset(&self.sweep.lookahead),
                "parallel": self.sweep.parallel,
                "auto_default": self.sweep.auto_default,
                "alert_windows": self.sweep.alert_windows,
            },
        })
    }
}

// ── Sweep ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Width of the `[now, now + lookahead]` alert query range.
    #[serde(with = "crate::offset::serde_offset")]
    pub lookahead: Duration,
    /// Resolve enrollments on the rayon pool.
    pub parallel: bool,
    /// Propose `default` transitions for overdue enrollments.
    pub auto_default: bool,
    /// Window names (snake_case) whose start produces an alert candidate.
    pub alert_windows: Vec<String>,
}

const DEFAULT_ALERT_WINDOWS: &[&str] = &["earliest_start", "due", "late", "max"];

impl SweepConfig {
    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>, p: &str) -> Result<Self> {
        Ok(Self {
            lookahead: profiled_duration(lookup, p, "CADENCE_SWEEP_LOOKAHEAD", Duration::hours(1))?,
            parallel: profiled_bool(lookup, p, "CADENCE_SWEEP_PARALLEL", true)?,
            auto_default: profiled_bool(lookup, p, "CADENCE_AUTO_DEFAULT", false)?,
            alert_windows: profiled_list(lookup, p, "CADENCE_ALERT_WINDOWS", DEFAULT_ALERT_WINDOWS),
        })
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            lookahead: Duration::hours(1),
            parallel: true,
            auto_default: false,
            alert_windows: DEFAULT_ALERT_WINDOWS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
