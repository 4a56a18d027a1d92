//! Runner-level errors
//!
//! Activity-level failures never surface here; they are captured as faults
//! on the instance. These errors are the framework-level conditions a
//! caller must handle.

use crate::blueprint::MaterializeError;
use crate::registry::RegistryError;
use crate::store::StoreError;

/// Errors surfaced by the workflow runner
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The registry no longer has the instance's definition and version
    #[error("workflow definition missing: {definition_id} v{version}")]
    WorkflowDefinitionMissing {
        definition_id: String,
        version: i32,
    },

    /// Materialization error
    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    /// Registry error
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Instance store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An instance-only run was requested but no registry is configured
    #[error("no workflow registry configured")]
    RegistryNotConfigured,

    /// Resuming a suspended workflow requires the blocking activity id
    #[error("resume requires a blocking activity id")]
    MissingResumeActivity,

    /// The resume target is not in the instance's blocking set
    #[error("activity {activity_id} is not blocking this workflow")]
    ActivityNotBlocked { activity_id: String },

    /// An explicitly named activity does not exist in the blueprint
    #[error("activity not found in blueprint: {activity_id}")]
    ActivityNotFound { activity_id: String },

    /// The starting activity could not be constructed for its probe
    #[error("activity {activity_id} could not be constructed: {message}")]
    ActivityConstruction {
        activity_id: String,
        message: String,
    },
}
