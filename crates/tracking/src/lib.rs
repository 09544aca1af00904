//! Milestone/window scheduling engine.
//!
//! This crate provides:
//! - Time calculus converting relative window offsets into absolute boundaries
//! - Validated, immutable schedule definitions (milestones and their windows)
//! - Enrollment records tracking one subject's progress through a schedule
//! - A window resolver reporting which window "now" falls into
//! - Composable enrollment criteria (AND/OR/NOT) for batch scheduling queries
//! - The advancement state machine (fulfill, default, unenroll, fast-forward)
//! - A sweep that runs one alerting cycle over an enrollment snapshot
//!
//! Nothing here performs I/O or reads the wall clock: every temporal
//! operation takes `now` explicitly.

pub mod advancement;
pub mod calculus;
pub mod criteria;
pub mod enrollment;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod sweep;

pub use advancement::AdvancementEngine;
pub use criteria::{Criterion, EnrollmentsQuery, FilterOutcome, InstantRange, WindowBoundsSource};
pub use enrollment::{Enrollment, EnrollmentId, EnrollmentStatus, MilestoneFulfillment};
pub use error::{EnrollmentFailure, Result, TrackingError};
pub use registry::ScheduleRegistry;
pub use resolver::{resolve_current_window, MilestoneAlert, MilestoneWindows, WindowResolver, WindowState};
pub use schema::{Milestone, ScheduleDefinition, ScheduleSpec, Window, WindowName};
pub use sweep::{AlertCandidate, Sweep, SweepReport};
