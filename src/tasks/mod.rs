//! Background work outside the export critical path.
//!
//! - [`BackgroundTasks`] / [`StatusSink`] - detached threads and their outcomes
//! - [`ensure_dependency`] - runtime package version check with repair

mod background;
mod deps;

pub use background::{BackgroundTasks, StatusSink, TaskStatus};
pub use deps::{check_dependency, ensure_dependency, DependencyState};
