//! Activity trait definition

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::execution::WorkflowExecutionContext;

use super::{ActivityExecutionContext, ActivityResult};

/// Error type for activity failures
///
/// Returned errors are captured by the runner and become workflow faults;
/// they are never rethrown to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityError {
    /// Error message
    pub message: String,

    /// Error type/code for programmatic handling
    pub error_type: Option<String>,

    /// Additional error details (for debugging)
    pub details: Option<Value>,
}

impl ActivityError {
    /// Create a new error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            details: None,
        }
    }

    /// Set the error type
    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    /// Add error details
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for ActivityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActivityError {}

impl From<anyhow::Error> for ActivityError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// A unit of executable work in a workflow
///
/// Activities are instantiated through the scoped service provider each time
/// they are dispatched, have their inputs populated from property providers,
/// and report what happened through an [`ActivityResult`].
///
/// Execution receives both the workflow-level context (for variables,
/// scheduling and the cancellation token) and the per-dispatch activity
/// context (input, output slot, scope access).
///
/// # Example
///
/// ```ignore
/// struct WriteLine {
///     text: String,
/// }
///
/// #[async_trait]
/// impl Activity for WriteLine {
///     fn type_name(&self) -> &str {
///         "write-line"
///     }
///
///     async fn execute(
///         &mut self,
///         _workflow: &mut WorkflowExecutionContext,
///         _activity: &mut ActivityExecutionContext,
///     ) -> Result<ActivityResult, ActivityError> {
///         println!("{}", self.text);
///         Ok(ActivityResult::outcome("Done"))
///     }
/// }
/// ```
#[async_trait]
pub trait Activity: Send + Sync {
    /// Activity type name, matching the definition's `type` field
    fn type_name(&self) -> &str;

    /// Populate one input property from its evaluated expression
    ///
    /// Called once per registered property provider before dispatch.
    /// Activities ignore properties they do not declare.
    fn set_property(&mut self, name: &str, value: Value) -> Result<(), ActivityError> {
        let _ = (name, value);
        Ok(())
    }

    /// Whether this activity is willing to run for the pending dispatch
    ///
    /// Declining makes the whole run a silent no-op. The default accepts.
    async fn can_execute(
        &self,
        workflow: &WorkflowExecutionContext,
        activity: &ActivityExecutionContext,
    ) -> Result<bool, ActivityError> {
        let _ = (workflow, activity);
        Ok(true)
    }

    /// Execute the activity
    async fn execute(
        &mut self,
        workflow: &mut WorkflowExecutionContext,
        activity: &mut ActivityExecutionContext,
    ) -> Result<ActivityResult, ActivityError>;

    /// Resume after an external signal unblocked this activity
    ///
    /// Defaults to plain execution.
    async fn resume(
        &mut self,
        workflow: &mut WorkflowExecutionContext,
        activity: &mut ActivityExecutionContext,
    ) -> Result<ActivityResult, ActivityError> {
        self.execute(workflow, activity).await
    }
}
