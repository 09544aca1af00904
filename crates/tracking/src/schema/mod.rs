//! Schedule definition types.
//!
//! A [`ScheduleDefinition`] is an ordered, validated sequence of
//! [`Milestone`]s. Each milestone holds up to four named [`Window`]s whose
//! offsets are measured from the enrollment's reference instant.

mod definition;
mod milestone;
mod window;

#[cfg(test)]
mod tests;

pub use definition::{ScheduleDefinition, ScheduleSpec};
pub use milestone::Milestone;
pub use window::{Window, WindowName};
