//! Lifecycle notifications
//!
//! The runner publishes notifications through a [`Mediator`] port at fixed
//! points of every run: `(ActivityExecuting, ActivityExecuted)` pairs per
//! dispatch, then `WorkflowExecuted`, then at most one terminal status
//! notification. Subscribers run synchronously inside the run and may
//! inspect, but never mutate, the referenced contexts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::activity::ActivityExecutionContext;
use crate::execution::WorkflowExecutionContext;

/// Mutable listing-time settings for one workflow
///
/// Published with [`WorkflowNotification::WorkflowSettingsLoaded`] while the
/// registry lists workflows; a subscriber may disable the workflow by
/// flipping the flag.
#[derive(Debug)]
pub struct WorkflowSettings {
    pub definition_id: String,
    pub version: i32,
    disabled: AtomicBool,
}

impl WorkflowSettings {
    pub fn new(definition_id: impl Into<String>, version: i32) -> Self {
        Self {
            definition_id: definition_id.into(),
            version,
            disabled: AtomicBool::new(false),
        }
    }

    /// Mark the workflow disabled for listing
    pub fn disable(&self) {
        self.disabled.store(true, Ordering::Relaxed);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }
}

/// Notifications published during workflow execution
///
/// Each variant borrows the live context it describes; subscribers needing
/// data past the call must copy it out.
#[derive(Debug, Clone, Copy)]
pub enum WorkflowNotification<'a> {
    /// A workflow's settings were loaded while listing the registry
    WorkflowSettingsLoaded { settings: &'a WorkflowSettings },

    /// An activity dispatch ran and its result is about to be applied
    ActivityExecuting {
        workflow: &'a WorkflowExecutionContext,
        activity: &'a ActivityExecutionContext,
    },

    /// The dispatch's result has been applied
    ActivityExecuted {
        workflow: &'a WorkflowExecutionContext,
        activity: &'a ActivityExecutionContext,
    },

    /// A run finished (published once per run, before any terminal event)
    WorkflowExecuted { workflow: &'a WorkflowExecutionContext },

    /// Terminal: the workflow completed successfully
    WorkflowCompleted { workflow: &'a WorkflowExecutionContext },

    /// Terminal for this run: the workflow is waiting on blocking activities
    WorkflowSuspended { workflow: &'a WorkflowExecutionContext },

    /// Terminal: the workflow was cancelled
    WorkflowCancelled { workflow: &'a WorkflowExecutionContext },

    /// Terminal: an activity fault stopped the workflow
    WorkflowFaulted { workflow: &'a WorkflowExecutionContext },
}

impl WorkflowNotification<'_> {
    /// Notification name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::WorkflowSettingsLoaded { .. } => "WorkflowSettingsLoaded",
            Self::ActivityExecuting { .. } => "ActivityExecuting",
            Self::ActivityExecuted { .. } => "ActivityExecuted",
            Self::WorkflowExecuted { .. } => "WorkflowExecuted",
            Self::WorkflowCompleted { .. } => "WorkflowCompleted",
            Self::WorkflowSuspended { .. } => "WorkflowSuspended",
            Self::WorkflowCancelled { .. } => "WorkflowCancelled",
            Self::WorkflowFaulted { .. } => "WorkflowFaulted",
        }
    }
}

/// Port for fanning notifications out to subscribers
///
/// Publication failures are logged by the runner and never alter workflow
/// state.
#[async_trait]
pub trait Mediator: Send + Sync {
    async fn publish<'a>(&self, notification: WorkflowNotification<'a>) -> anyhow::Result<()>;

    /// Human-readable name for logging/debugging
    fn name(&self) -> &'static str {
        "Mediator"
    }
}

/// Mediator that drops every notification
#[derive(Debug, Clone, Default)]
pub struct NoopMediator;

#[async_trait]
impl Mediator for NoopMediator {
    async fn publish<'a>(&self, _notification: WorkflowNotification<'a>) -> anyhow::Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "NoopMediator"
    }
}

/// Mediator that forwards to multiple subscribers, in order
///
/// A failing subscriber is logged and skipped; the rest still receive the
/// notification.
pub struct CompositeMediator {
    subscribers: Vec<Arc<dyn Mediator>>,
}

impl CompositeMediator {
    pub fn new(subscribers: Vec<Arc<dyn Mediator>>) -> Self {
        Self { subscribers }
    }

    pub fn add(&mut self, subscriber: Arc<dyn Mediator>) {
        self.subscribers.push(subscriber);
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[async_trait]
impl Mediator for CompositeMediator {
    async fn publish<'a>(&self, notification: WorkflowNotification<'a>) -> anyhow::Result<()> {
        for subscriber in &self.subscribers {
            if let Err(error) = subscriber.publish(notification).await {
                warn!(
                    subscriber = subscriber.name(),
                    notification = notification.name(),
                    %error,
                    "subscriber failed"
                );
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "CompositeMediator"
    }
}

/// Mediator that logs every notification through `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingMediator;

#[async_trait]
impl Mediator for TracingMediator {
    async fn publish<'a>(&self, notification: WorkflowNotification<'a>) -> anyhow::Result<()> {
        match &notification {
            WorkflowNotification::ActivityExecuting { activity, .. }
            | WorkflowNotification::ActivityExecuted { activity, .. } => {
                debug!(
                    notification = notification.name(),
                    activity_id = activity.activity_id(),
                    activity_type = activity.activity_type(),
                    "workflow notification"
                );
            }
            WorkflowNotification::WorkflowSettingsLoaded { settings } => {
                debug!(
                    notification = notification.name(),
                    definition_id = %settings.definition_id,
                    version = settings.version,
                    "workflow notification"
                );
            }
            WorkflowNotification::WorkflowExecuted { workflow }
            | WorkflowNotification::WorkflowCompleted { workflow }
            | WorkflowNotification::WorkflowSuspended { workflow }
            | WorkflowNotification::WorkflowCancelled { workflow }
            | WorkflowNotification::WorkflowFaulted { workflow } => {
                debug!(
                    notification = notification.name(),
                    workflow_instance_id = %workflow.instance.id,
                    status = %workflow.status(),
                    "workflow notification"
                );
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "TracingMediator"
    }
}
