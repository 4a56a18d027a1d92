//! Durable workflow instance model
//!
//! A [`WorkflowInstance`] is the per-run record a host persists between
//! invocations of the runner. The runtime only writes `status`,
//! `blocking_activities`, `scheduled_activities`, `variables`, `output`,
//! `faults`, `context_id` and the append-only `execution_log`.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::blueprint::Blueprint;
use crate::definition::Variables;

/// Workflow instance status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Instance created but never started
    #[default]
    Idle,

    /// A burst is in progress
    Running,

    /// Waiting on at least one blocking activity
    Suspended,

    /// Completed successfully
    Finished,

    /// Cancelled by external request
    Cancelled,

    /// An activity fault stopped the run
    Faulted,
}

impl WorkflowStatus {
    /// Terminal statuses do not accept further runs without a reset
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled | Self::Faulted)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Suspended => write!(f, "suspended"),
            Self::Finished => write!(f, "finished"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Faulted => write!(f, "faulted"),
        }
    }
}

/// An activity waiting on an external signal
///
/// The tag records the activity type so hosts can query what kind of
/// stimulus an instance is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockingActivity {
    pub activity_id: String,
    pub tag: String,
}

impl BlockingActivity {
    pub fn new(activity_id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            tag: tag.into(),
        }
    }
}

/// A queued activity dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledActivity {
    pub activity_id: String,

    #[serde(default)]
    pub input: Option<Value>,
}

impl ScheduledActivity {
    pub fn new(activity_id: impl Into<String>, input: Option<Value>) -> Self {
        Self {
            activity_id: activity_id.into(),
            input,
        }
    }
}

/// A fault recorded on the instance when an activity fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowFault {
    /// Error message
    pub message: String,

    /// Activity that raised the fault, if known
    pub faulted_activity_id: Option<String>,

    /// When the fault was recorded
    pub faulted_at: DateTime<Utc>,
}

impl WorkflowFault {
    pub fn new(message: impl Into<String>, faulted_activity_id: Option<String>) -> Self {
        Self {
            message: message.into(),
            faulted_activity_id,
            faulted_at: Utc::now(),
        }
    }
}

/// One entry in the append-only execution log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub activity_id: String,
    pub timestamp: DateTime<Utc>,
}

/// The durable per-run record of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Instance id (UUID v7, monotonically increasing)
    pub id: Uuid,

    /// Definition this instance was created from
    pub workflow_definition_id: String,

    /// Definition version this instance is pinned to
    pub version: i32,

    #[serde(default)]
    pub tenant_id: Option<String>,

    #[serde(default)]
    pub correlation_id: Option<String>,

    /// Handle to the user workflow-context value, set by the context manager
    #[serde(default)]
    pub context_id: Option<String>,

    pub status: WorkflowStatus,

    #[serde(default)]
    pub variables: Variables,

    /// Activities waiting on external signals
    #[serde(default)]
    pub blocking_activities: HashSet<BlockingActivity>,

    /// Dispatches carried over between runs (seeded into the primary queue)
    #[serde(default)]
    pub scheduled_activities: VecDeque<ScheduledActivity>,

    /// Activity currently (or last) dispatched
    #[serde(default)]
    pub current_activity: Option<String>,

    /// Workflow output value
    #[serde(default)]
    pub output: Option<Value>,

    #[serde(default)]
    pub faults: Vec<WorkflowFault>,

    /// Append-only dispatch log
    #[serde(default)]
    pub execution_log: Vec<ExecutionLogEntry>,
}

impl WorkflowInstance {
    /// Record a fault and move the instance to [`WorkflowStatus::Faulted`]
    pub fn record_fault(&mut self, fault: WorkflowFault) {
        self.faults.push(fault);
        self.status = WorkflowStatus::Faulted;
    }

    /// Append an execution-log entry for a dispatched activity
    pub fn log_dispatch(&mut self, activity_id: &str) {
        self.execution_log.push(ExecutionLogEntry {
            activity_id: activity_id.to_string(),
            timestamp: Utc::now(),
        });
    }
}

/// Creates fresh instances for a blueprint
///
/// Hosts may substitute their own factory to control id generation or seed
/// tenant data; the runner only requires the [`WorkflowStatus::Idle`] start
/// state and the blueprint's declared variables.
pub trait WorkflowFactory: Send + Sync {
    fn instantiate(
        &self,
        blueprint: &Blueprint,
        correlation_id: Option<String>,
        context_id: Option<String>,
    ) -> WorkflowInstance;
}

/// Default factory: UUID v7 ids, variables seeded from the blueprint
#[derive(Debug, Clone, Default)]
pub struct DefaultWorkflowFactory;

impl WorkflowFactory for DefaultWorkflowFactory {
    fn instantiate(
        &self,
        blueprint: &Blueprint,
        correlation_id: Option<String>,
        context_id: Option<String>,
    ) -> WorkflowInstance {
        WorkflowInstance {
            id: Uuid::now_v7(),
            workflow_definition_id: blueprint.id.clone(),
            version: blueprint.version,
            tenant_id: None,
            correlation_id,
            context_id,
            status: WorkflowStatus::Idle,
            variables: blueprint.variables.clone(),
            blocking_activities: HashSet::new(),
            scheduled_activities: VecDeque::new(),
            current_activity: None,
            output: None,
            faults: Vec::new(),
            execution_log: Vec::new(),
        }
    }
}
