//! Criterion/filter engine for batch scheduling queries.
//!
//! A [`Criterion`] is a closed set of predicate variants evaluated by a
//! single dispatcher ([`Criterion::matches`]). Temporal leaves ask a
//! [`WindowBoundsSource`] for window boundaries instead of recomputing
//! them, so all window arithmetic stays in the resolver.
//!
//! Filtering preserves the input order and never reorders or deduplicates.

mod criterion;
mod evaluator;
mod query;


pub use self::criterion::{Criterion, InstantRange};
pub use self::evaluator::FilterOutcome;
pub use self::query::EnrollmentsQuery;
pub use crate::resolver::WindowBoundsSource;
