//! Workflow execution context
//!
//! Transient per-run state: one [`WorkflowExecutionContext`] exists for the
//! duration of a single runner invocation and is owned exclusively by it.
//! It composes the instance with its blueprint and adds the two scheduling
//! queues, the loaded workflow-context value and the cancellation token.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::blueprint::Blueprint;
use crate::instance::{
    BlockingActivity, ScheduledActivity, WorkflowFault, WorkflowInstance, WorkflowStatus,
};

/// Mutable per-run state driving one workflow burst
///
/// Queue and status operations are non-suspending; only the runner thread
/// mutates them. Activities reach this context mutably during their own
/// dispatch and nowhere else.
#[derive(Debug)]
pub struct WorkflowExecutionContext {
    blueprint: Arc<Blueprint>,

    /// The durable record this run mutates
    pub instance: WorkflowInstance,

    /// Primary FIFO dispatch queue
    scheduled: VecDeque<ScheduledActivity>,

    /// Deferred queue, drained once the primary empties
    post_scheduled: VecDeque<ScheduledActivity>,

    /// The loaded user workflow-context value, if any
    pub workflow_context: Option<Value>,

    cancellation: CancellationToken,
}

impl WorkflowExecutionContext {
    /// Build a context, seeding the primary queue from the instance's
    /// persisted scheduled activities
    pub fn new(
        blueprint: Arc<Blueprint>,
        mut instance: WorkflowInstance,
        cancellation: CancellationToken,
    ) -> Self {
        let scheduled = std::mem::take(&mut instance.scheduled_activities);

        Self {
            blueprint,
            instance,
            scheduled,
            post_scheduled: VecDeque::new(),
            workflow_context: None,
            cancellation,
        }
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    pub fn blueprint_arc(&self) -> Arc<Blueprint> {
        Arc::clone(&self.blueprint)
    }

    pub fn status(&self) -> WorkflowStatus {
        self.instance.status
    }

    /// The run's cancellation token; activities observe it during dispatch
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    // =========================================================================
    // Status transitions
    // =========================================================================

    /// Idle → Running
    pub fn begin(&mut self) {
        debug!(workflow_instance_id = %self.instance.id, "workflow beginning");
        self.instance.status = WorkflowStatus::Running;
    }

    /// Suspended → Running
    pub fn resume(&mut self) {
        debug!(workflow_instance_id = %self.instance.id, "workflow resuming");
        self.instance.status = WorkflowStatus::Running;
    }

    /// Running → Finished, once both queues and the blocking set are empty
    pub fn complete(&mut self) {
        if self.instance.status == WorkflowStatus::Running {
            debug!(workflow_instance_id = %self.instance.id, "workflow completed");
            self.instance.status = WorkflowStatus::Finished;
        }
    }

    /// Running → Suspended, while blocking activities remain
    pub fn suspend(&mut self) {
        if self.instance.status == WorkflowStatus::Running {
            debug!(workflow_instance_id = %self.instance.id, "workflow suspended");
            self.instance.status = WorkflowStatus::Suspended;
        }
    }

    /// Record a fault and move to Faulted
    pub fn fault(&mut self, message: impl Into<String>, activity_id: Option<String>) {
        let fault = WorkflowFault::new(message, activity_id);
        debug!(
            workflow_instance_id = %self.instance.id,
            fault = %fault.message,
            "workflow faulted"
        );
        self.instance.record_fault(fault);
    }

    /// Any non-terminal status → Cancelled
    pub fn cancel(&mut self) {
        if !self.instance.status.is_terminal() {
            debug!(workflow_instance_id = %self.instance.id, "workflow cancelled");
            self.instance.status = WorkflowStatus::Cancelled;
        }
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Append a dispatch to the primary queue
    ///
    /// An activity id may be queued more than once; re-entry is legal.
    pub fn schedule_activity(&mut self, activity_id: impl Into<String>, input: Option<Value>) {
        self.scheduled
            .push_back(ScheduledActivity::new(activity_id, input));
    }

    /// Append a dispatch to the post-scheduled queue
    pub fn schedule_post_activity(&mut self, activity_id: impl Into<String>, input: Option<Value>) {
        self.post_scheduled
            .push_back(ScheduledActivity::new(activity_id, input));
    }

    /// Remove and return the head of the primary queue
    pub fn pop_scheduled_activity(&mut self) -> Option<ScheduledActivity> {
        self.scheduled.pop_front()
    }

    /// Move every post-scheduled dispatch onto the primary queue
    pub fn schedule_post_activities(&mut self) {
        trace!(
            count = self.post_scheduled.len(),
            "promoting post-scheduled activities"
        );
        self.scheduled.append(&mut self.post_scheduled);
    }

    pub fn has_scheduled_activities(&self) -> bool {
        !self.scheduled.is_empty()
    }

    pub fn has_post_scheduled_activities(&self) -> bool {
        !self.post_scheduled.is_empty()
    }

    /// End-of-pass hook, invoked after every dispatch
    pub fn complete_pass(&mut self) {
        trace!(workflow_instance_id = %self.instance.id, "pass complete");
    }

    // =========================================================================
    // Blocking set
    // =========================================================================

    pub fn add_blocking_activity(&mut self, blocking: BlockingActivity) {
        self.instance.blocking_activities.insert(blocking);
    }

    /// Remove every blocking entry for the given activity id
    ///
    /// Returns whether anything was removed.
    pub fn remove_blocking_activities(&mut self, activity_id: &str) -> bool {
        let before = self.instance.blocking_activities.len();
        self.instance
            .blocking_activities
            .retain(|b| b.activity_id != activity_id);
        self.instance.blocking_activities.len() != before
    }

    pub fn has_blocking_activities(&self) -> bool {
        !self.instance.blocking_activities.is_empty()
    }

    /// Tear down the context, writing unprocessed dispatches back onto the
    /// instance for the next run
    pub fn into_instance(mut self) -> WorkflowInstance {
        self.scheduled.append(&mut self.post_scheduled);
        self.instance.scheduled_activities = self.scheduled;
        self.instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::materialize;
    use crate::definition::{ActivityDefinition, WorkflowDefinition};
    use crate::instance::{DefaultWorkflowFactory, WorkflowFactory};
    use serde_json::json;

    fn context() -> WorkflowExecutionContext {
        let definition = WorkflowDefinition::new("wf", 1)
            .with_activity(ActivityDefinition::new("a", "noop"))
            .with_activity(ActivityDefinition::new("b", "noop"));
        let blueprint = Arc::new(materialize(&definition).unwrap());
        let instance = DefaultWorkflowFactory.instantiate(&blueprint, None, None);
        WorkflowExecutionContext::new(blueprint, instance, CancellationToken::new())
    }

    #[test]
    fn test_status_transitions() {
        let mut ctx = context();
        assert_eq!(ctx.status(), WorkflowStatus::Idle);

        ctx.begin();
        assert_eq!(ctx.status(), WorkflowStatus::Running);

        ctx.suspend();
        assert_eq!(ctx.status(), WorkflowStatus::Suspended);

        ctx.resume();
        assert_eq!(ctx.status(), WorkflowStatus::Running);

        ctx.complete();
        assert_eq!(ctx.status(), WorkflowStatus::Finished);
    }

    #[test]
    fn test_suspend_only_from_running() {
        let mut ctx = context();
        ctx.begin();
        ctx.fault("boom", None);

        ctx.suspend();
        assert_eq!(ctx.status(), WorkflowStatus::Faulted);
    }

    #[test]
    fn test_cancel_only_from_non_terminal() {
        let mut ctx = context();
        ctx.begin();
        ctx.complete();

        ctx.cancel();
        assert_eq!(ctx.status(), WorkflowStatus::Finished);
    }

    #[test]
    fn test_primary_queue_is_fifo_and_allows_reentry() {
        let mut ctx = context();
        ctx.schedule_activity("a", None);
        ctx.schedule_activity("b", Some(json!(1)));
        ctx.schedule_activity("a", None);

        assert_eq!(ctx.pop_scheduled_activity().unwrap().activity_id, "a");
        assert_eq!(ctx.pop_scheduled_activity().unwrap().activity_id, "b");
        assert_eq!(ctx.pop_scheduled_activity().unwrap().activity_id, "a");
        assert!(ctx.pop_scheduled_activity().is_none());
    }

    #[test]
    fn test_post_queue_promotion() {
        let mut ctx = context();
        ctx.schedule_post_activity("b", None);
        assert!(!ctx.has_scheduled_activities());
        assert!(ctx.has_post_scheduled_activities());

        ctx.schedule_post_activities();
        assert!(ctx.has_scheduled_activities());
        assert!(!ctx.has_post_scheduled_activities());
        assert_eq!(ctx.pop_scheduled_activity().unwrap().activity_id, "b");
    }

    #[test]
    fn test_queue_seeded_from_instance() {
        let definition = WorkflowDefinition::new("wf", 1)
            .with_activity(ActivityDefinition::new("a", "noop"));
        let blueprint = Arc::new(materialize(&definition).unwrap());
        let mut instance = DefaultWorkflowFactory.instantiate(&blueprint, None, None);
        instance
            .scheduled_activities
            .push_back(ScheduledActivity::new("a", None));

        let mut ctx = WorkflowExecutionContext::new(blueprint, instance, CancellationToken::new());
        assert!(ctx.has_scheduled_activities());
        assert_eq!(ctx.pop_scheduled_activity().unwrap().activity_id, "a");
    }

    #[test]
    fn test_into_instance_preserves_unprocessed_dispatches() {
        let mut ctx = context();
        ctx.schedule_activity("a", None);
        ctx.schedule_post_activity("b", None);

        let instance = ctx.into_instance();
        let ids: Vec<_> = instance
            .scheduled_activities
            .iter()
            .map(|s| s.activity_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_remove_blocking_activities() {
        let mut ctx = context();
        ctx.add_blocking_activity(BlockingActivity::new("a", "signal"));
        ctx.add_blocking_activity(BlockingActivity::new("a", "timer"));
        ctx.add_blocking_activity(BlockingActivity::new("b", "signal"));

        assert!(ctx.remove_blocking_activities("a"));
        assert!(!ctx.remove_blocking_activities("a"));
        assert_eq!(ctx.instance.blocking_activities.len(), 1);
        assert!(ctx.has_blocking_activities());
    }
}
