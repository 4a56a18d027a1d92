//! Activity results
//!
//! An [`ActivityResult`] is what an activity dispatch reports back to the
//! runner. Applying a result is the only way activity outcomes reach the
//! workflow's queues, blocking set and status.

use serde::{Deserialize, Serialize};

use crate::execution::WorkflowExecutionContext;
use crate::instance::BlockingActivity;

use super::ActivityExecutionContext;

/// What an activity dispatch did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityResult {
    /// The activity finished and emitted the named outcomes
    ///
    /// Applying schedules every successor connected along a matching
    /// outcome edge, with the activity's output as input.
    Outcomes { names: Vec<String> },

    /// The activity is waiting on an external signal
    Suspend,

    /// The workflow was cancelled during the dispatch
    Cancel,

    /// The dispatch failed
    Fault { message: String },

    /// Several results applied in sequence
    Combined { results: Vec<ActivityResult> },
}

impl ActivityResult {
    /// A single-outcome result
    pub fn outcome(name: impl Into<String>) -> Self {
        Self::Outcomes {
            names: vec![name.into()],
        }
    }

    /// A multi-outcome result
    pub fn outcomes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Outcomes {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// A fault result
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }

    /// Compose results, applied in order
    pub fn combined(results: impl IntoIterator<Item = ActivityResult>) -> Self {
        Self::Combined {
            results: results.into_iter().collect(),
        }
    }

    /// Apply this result to the workflow
    ///
    /// Outcome edges resolve against the composite scope that owns the
    /// dispatched activity; connections never cross scope boundaries.
    pub fn apply(
        &self,
        workflow: &mut WorkflowExecutionContext,
        activity: &ActivityExecutionContext,
    ) {
        match self {
            Self::Outcomes { names } => {
                let blueprint = workflow.blueprint_arc();
                let activity_id = activity.activity_id();

                if let Some(scope) = blueprint.graph.owning_scope(activity_id) {
                    for name in names {
                        for connection in scope.connections_from(activity_id, name) {
                            workflow.schedule_activity(
                                connection.target.id.clone(),
                                activity.output.clone(),
                            );
                        }
                    }
                }
            }

            Self::Suspend => {
                workflow.add_blocking_activity(BlockingActivity::new(
                    activity.activity_id(),
                    activity.activity_type(),
                ));
            }

            Self::Cancel => workflow.cancel(),

            Self::Fault { message } => {
                workflow.fault(message.clone(), Some(activity.activity_id().to_string()));
            }

            Self::Combined { results } => {
                for result in results {
                    result.apply(workflow, activity);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::materialize;
    use crate::definition::{ActivityDefinition, ConnectionDefinition, WorkflowDefinition};
    use crate::instance::{DefaultWorkflowFactory, WorkflowFactory, WorkflowStatus};
    use crate::scope::{ServiceProvider, StaticServiceProvider};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn harness() -> (WorkflowExecutionContext, ActivityExecutionContext) {
        let definition = WorkflowDefinition::new("wf", 1)
            .with_activity(ActivityDefinition::new("a", "fork"))
            .with_activity(ActivityDefinition::new("b", "noop"))
            .with_activity(ActivityDefinition::new("c", "noop"))
            .with_connection(ConnectionDefinition::new("a", "b", "Left"))
            .with_connection(ConnectionDefinition::new("a", "c", "Right"));

        let blueprint = Arc::new(materialize(&definition).unwrap());
        let instance = DefaultWorkflowFactory.instantiate(&blueprint, None, None);
        let workflow =
            WorkflowExecutionContext::new(blueprint.clone(), instance, CancellationToken::new());

        let mut activity = ActivityExecutionContext::new(
            blueprint.activity("a").unwrap().clone(),
            None,
            StaticServiceProvider::new().create_scope(),
        );
        activity.set_output(serde_json::json!("payload"));

        (workflow, activity)
    }

    #[test]
    fn test_outcomes_schedule_matching_successors() {
        let (mut workflow, activity) = harness();

        ActivityResult::outcome("Left").apply(&mut workflow, &activity);

        let scheduled = workflow.pop_scheduled_activity().unwrap();
        assert_eq!(scheduled.activity_id, "b");
        assert_eq!(scheduled.input, Some(serde_json::json!("payload")));
        assert!(!workflow.has_scheduled_activities());
    }

    #[test]
    fn test_multiple_outcomes_schedule_in_order() {
        let (mut workflow, activity) = harness();

        ActivityResult::outcomes(["Left", "Right"]).apply(&mut workflow, &activity);

        assert_eq!(workflow.pop_scheduled_activity().unwrap().activity_id, "b");
        assert_eq!(workflow.pop_scheduled_activity().unwrap().activity_id, "c");
    }

    #[test]
    fn test_unmatched_outcome_schedules_nothing() {
        let (mut workflow, activity) = harness();

        ActivityResult::outcome("Missing").apply(&mut workflow, &activity);

        assert!(!workflow.has_scheduled_activities());
    }

    #[test]
    fn test_suspend_adds_blocking_activity() {
        let (mut workflow, activity) = harness();

        ActivityResult::Suspend.apply(&mut workflow, &activity);

        assert!(workflow
            .instance
            .blocking_activities
            .contains(&BlockingActivity::new("a", "fork")));
        assert_eq!(workflow.status(), WorkflowStatus::Idle);
    }

    #[test]
    fn test_fault_records_and_faults() {
        let (mut workflow, activity) = harness();
        workflow.begin();

        ActivityResult::fault("boom").apply(&mut workflow, &activity);

        assert_eq!(workflow.status(), WorkflowStatus::Faulted);
        assert_eq!(workflow.instance.faults.len(), 1);
        assert_eq!(
            workflow.instance.faults[0].faulted_activity_id.as_deref(),
            Some("a")
        );
    }

    #[test]
    fn test_cancel_sets_status() {
        let (mut workflow, activity) = harness();
        workflow.begin();

        ActivityResult::Cancel.apply(&mut workflow, &activity);

        assert_eq!(workflow.status(), WorkflowStatus::Cancelled);
    }

    #[test]
    fn test_combined_applies_in_sequence() {
        let (mut workflow, activity) = harness();

        ActivityResult::combined([ActivityResult::outcome("Left"), ActivityResult::Suspend])
            .apply(&mut workflow, &activity);

        assert!(workflow.has_scheduled_activities());
        assert!(!workflow.instance.blocking_activities.is_empty());
    }

    #[test]
    fn test_result_serialization() {
        let result = ActivityResult::outcomes(["Done"]);

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"type\":\"outcomes\""));

        let parsed: ActivityResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, parsed);
    }
}
