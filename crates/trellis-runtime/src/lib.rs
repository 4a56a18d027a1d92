//! # Trellis Workflow Runtime
//!
//! The execution core of a durable, graph-structured workflow engine.
//! A workflow is a directed graph of activities connected by named
//! outcomes; the runtime drives an instance of such a graph from start to
//! completion while persisting enough state that execution can suspend
//! (when an activity waits on an external signal) and resume later, in
//! another process if need be.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowRunner                          │
//! │  (drain loop: dispatch, apply results, publish lifecycle)   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 WorkflowExecutionContext                     │
//! │  (primary + post-scheduled queues, blocking set, status)    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Blueprint                             │
//! │  (materialized graph: activities, connections, providers)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything the runtime needs from its host is a port: activity
//! resolution ([`ServiceProvider`]), blueprint lookup ([`WorkflowRegistry`]),
//! instance persistence ([`WorkflowInstanceStore`]), expression evaluation
//! ([`ExpressionEvaluator`]), workflow-context storage
//! ([`WorkflowContextManager`]) and event fan-out ([`Mediator`]).
//!
//! ## Example
//!
//! ```ignore
//! use trellis_runtime::prelude::*;
//!
//! let definition = WorkflowDefinition::new("hello", 1)
//!     .with_activity(ActivityDefinition::new("greet", "write-line"))
//!     .with_activity(ActivityDefinition::new("bye", "write-line"))
//!     .with_connection(ConnectionDefinition::new("greet", "bye", "Done"));
//!
//! let blueprint = Arc::new(materialize(&definition)?);
//!
//! let provider = Arc::new(StaticServiceProvider::new());
//! provider.register("write-line", || Box::new(WriteLine::default()));
//!
//! let runner = WorkflowRunner::new(provider);
//! let instance = runner.run_new(blueprint, RunOptions::new()).await?;
//! assert_eq!(instance.status, WorkflowStatus::Finished);
//! ```

pub mod activity;
pub mod blueprint;
pub mod definition;
pub mod error;
pub mod events;
pub mod execution;
pub mod expression;
pub mod instance;
pub mod registry;
pub mod scope;
pub mod store;

/// Prelude for common imports
pub mod prelude {
    pub use crate::activity::{Activity, ActivityError, ActivityExecutionContext, ActivityResult};
    pub use crate::blueprint::{materialize, Blueprint, MaterializeError};
    pub use crate::definition::{
        ActivityDefinition, ActivityProperty, ConnectionDefinition, ContextOptions, Variables,
        WorkflowContextFidelity, WorkflowDefinition,
    };
    pub use crate::error::RunnerError;
    pub use crate::events::{Mediator, NoopMediator, WorkflowNotification};
    pub use crate::execution::{
        RunOptions, RunnerConfig, WorkflowContextManager, WorkflowExecutionContext, WorkflowRunner,
    };
    pub use crate::expression::{ExpressionEvaluator, LiteralEvaluator};
    pub use crate::instance::{
        BlockingActivity, DefaultWorkflowFactory, WorkflowFactory, WorkflowInstance,
        WorkflowStatus,
    };
    pub use crate::registry::{WorkflowProvider, WorkflowRegistry};
    pub use crate::scope::{ServiceProvider, ServiceScope, StaticServiceProvider};
    pub use crate::store::{InMemoryWorkflowInstanceStore, WorkflowInstanceStore};
}

// Re-export key types at crate root
pub use activity::{Activity, ActivityError, ActivityExecutionContext, ActivityResult};
pub use blueprint::{materialize, Blueprint, MaterializeError};
pub use definition::{WorkflowContextFidelity, WorkflowDefinition};
pub use error::RunnerError;
pub use events::{Mediator, NoopMediator, WorkflowNotification};
pub use execution::{
    RunOptions, RunnerConfig, WorkflowContextManager, WorkflowExecutionContext, WorkflowRunner,
};
pub use expression::{ExpressionEvaluator, LiteralEvaluator};
pub use instance::{WorkflowInstance, WorkflowStatus};
pub use registry::{WorkflowProvider, WorkflowRegistry};
pub use scope::{ServiceProvider, ServiceScope, StaticServiceProvider};
pub use store::{InMemoryWorkflowInstanceStore, WorkflowInstanceStore};
