//! Workflow execution
//!
//! This module provides the run machinery:
//! - [`WorkflowExecutionContext`] for per-run queue and status state
//! - [`WorkflowRunner`] for the drain loop and lifecycle events
//! - [`WorkflowContextManager`] / [`ContextFidelityManager`] for the user
//!   workflow-context value

mod context;
mod context_manager;
mod runner;

pub use context::WorkflowExecutionContext;
pub use context_manager::{ContextError, ContextFidelityManager, WorkflowContextManager};
pub use runner::{RunOptions, RunnerConfig, WorkflowRunner};
