//! Activity abstractions
//!
//! Activities are the units of work a workflow schedules. They:
//! - Are instantiated through the scoped service provider per dispatch
//! - Have inputs populated from property-provider expressions
//! - Report what happened through an [`ActivityResult`]

mod context;
mod definition;
mod result;

pub use context::ActivityExecutionContext;
pub use definition::{Activity, ActivityError};
pub use result::ActivityResult;
