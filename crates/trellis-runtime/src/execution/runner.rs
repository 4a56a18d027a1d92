//! Workflow runner
//!
//! The runner drives one workflow instance through one burst: it builds the
//! transient execution context, dispatches begin/resume/continue based on
//! the instance status, drains the scheduled queues, applies activity
//! results and publishes lifecycle notifications.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::activity::{Activity, ActivityError, ActivityExecutionContext, ActivityResult};
use crate::blueprint::{materialize, ActivityBlueprint, Blueprint};
use crate::definition::{WorkflowContextFidelity, WorkflowDefinition};
use crate::error::RunnerError;
use crate::events::{Mediator, NoopMediator, WorkflowNotification};
use crate::expression::{ExpressionEvaluator, LiteralEvaluator};
use crate::instance::{DefaultWorkflowFactory, WorkflowFactory, WorkflowInstance, WorkflowStatus};
use crate::registry::WorkflowRegistry;
use crate::scope::ServiceProvider;
use crate::store::WorkflowInstanceStore;

use super::context_manager::{ContextFidelityManager, WorkflowContextManager};
use super::WorkflowExecutionContext;

/// Configuration for the workflow runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum activity dispatches in one run (for safety)
    ///
    /// Exceeding the limit faults the workflow.
    pub max_dispatches_per_run: usize,

    /// Whether to append execution-log entries per dispatch
    pub log_execution: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_dispatches_per_run: 10_000,
            log_execution: true,
        }
    }
}

/// Per-call options for the run entry points
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Activity to start from (begin) or resume (suspended instances)
    pub activity_id: Option<String>,

    /// Input for the first dispatched activity
    pub input: Option<Value>,

    /// Correlation id for fresh instances
    pub correlation_id: Option<String>,

    /// Workflow-context id for fresh instances
    pub context_id: Option<String>,

    /// Token observed by activities during dispatch
    pub cancellation: CancellationToken,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_activity(mut self, activity_id: impl Into<String>) -> Self {
        self.activity_id = Some(activity_id.into());
        self
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// Which entry point the next dispatch uses
///
/// Resume applies only to the exact activity the caller named; everything
/// scheduled afterwards is a fresh execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Execute,
    Resume,
}

/// Drives workflow instances through bursts of activity execution
///
/// One runner serves many concurrent runs; each run owns its transient
/// [`WorkflowExecutionContext`] exclusively.
///
/// # Example
///
/// ```ignore
/// let provider = Arc::new(StaticServiceProvider::new());
/// provider.register("write-line", || Box::new(WriteLine::default()));
///
/// let runner = WorkflowRunner::new(provider);
/// let instance = runner.run_new(blueprint, RunOptions::new()).await?;
/// assert_eq!(instance.status, WorkflowStatus::Finished);
/// ```
pub struct WorkflowRunner {
    service_provider: Arc<dyn ServiceProvider>,
    factory: Arc<dyn WorkflowFactory>,
    evaluator: Arc<dyn ExpressionEvaluator>,
    mediator: Arc<dyn Mediator>,
    fidelity: ContextFidelityManager,
    registry: Option<Arc<dyn WorkflowRegistry>>,
    instance_store: Option<Arc<dyn WorkflowInstanceStore>>,
    config: RunnerConfig,
}

impl WorkflowRunner {
    /// Create a runner with default collaborators
    ///
    /// Defaults: [`DefaultWorkflowFactory`], [`LiteralEvaluator`],
    /// [`NoopMediator`], no registry, no instance store, no context manager.
    pub fn new(service_provider: Arc<dyn ServiceProvider>) -> Self {
        Self {
            service_provider,
            factory: Arc::new(DefaultWorkflowFactory),
            evaluator: Arc::new(LiteralEvaluator),
            mediator: Arc::new(NoopMediator),
            fidelity: ContextFidelityManager::new(None),
            registry: None,
            instance_store: None,
            config: RunnerConfig::default(),
        }
    }

    pub fn with_factory(mut self, factory: Arc<dyn WorkflowFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_mediator(mut self, mediator: Arc<dyn Mediator>) -> Self {
        self.mediator = mediator;
        self
    }

    pub fn with_context_manager(mut self, manager: Arc<dyn WorkflowContextManager>) -> Self {
        self.fidelity = ContextFidelityManager::new(Some(manager));
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn WorkflowRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_instance_store(mut self, store: Arc<dyn WorkflowInstanceStore>) -> Self {
        self.instance_store = Some(store);
        self
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Run a fresh instance of a blueprint
    ///
    /// For singleton workflows with an instance store configured, an
    /// existing non-finished instance is returned untouched instead of
    /// starting a second one.
    #[instrument(skip(self, blueprint, options), fields(definition_id = %blueprint.id))]
    pub async fn run_new(
        &self,
        blueprint: Arc<Blueprint>,
        options: RunOptions,
    ) -> Result<WorkflowInstance, RunnerError> {
        if blueprint.is_singleton {
            if let Some(store) = &self.instance_store {
                if let Some(existing) = store.find_active_by_definition(&blueprint.id).await? {
                    debug!(
                        workflow_instance_id = %existing.id,
                        "singleton already has a live instance"
                    );
                    return Ok(existing);
                }
            }
        }

        let instance = self.factory.instantiate(
            &blueprint,
            options.correlation_id.clone(),
            options.context_id.clone(),
        );
        info!(workflow_instance_id = %instance.id, "starting new workflow");

        self.run_internal(blueprint, instance, options).await
    }

    /// Materialize a definition and run a fresh instance of it
    pub async fn run_definition(
        &self,
        definition: &WorkflowDefinition,
        options: RunOptions,
    ) -> Result<WorkflowInstance, RunnerError> {
        let blueprint = Arc::new(materialize(definition)?);
        self.run_new(blueprint, options).await
    }

    /// Run an existing instance against its blueprint
    #[instrument(
        skip(self, blueprint, instance, options),
        fields(definition_id = %blueprint.id, workflow_instance_id = %instance.id)
    )]
    pub async fn run(
        &self,
        blueprint: Arc<Blueprint>,
        instance: WorkflowInstance,
        options: RunOptions,
    ) -> Result<WorkflowInstance, RunnerError> {
        self.run_internal(blueprint, instance, options).await
    }

    /// Run an existing instance, resolving its blueprint from the registry
    ///
    /// Fails with [`RunnerError::WorkflowDefinitionMissing`] when the
    /// definition (or the instance's pinned version) has been removed; no
    /// notifications are published in that case.
    #[instrument(skip(self, instance, options), fields(workflow_instance_id = %instance.id))]
    pub async fn run_instance(
        &self,
        instance: WorkflowInstance,
        options: RunOptions,
    ) -> Result<WorkflowInstance, RunnerError> {
        let registry = self
            .registry
            .as_ref()
            .ok_or(RunnerError::RegistryNotConfigured)?;

        let blueprint = registry
            .get_by_instance(&instance.workflow_definition_id, instance.version)
            .await?
            .ok_or_else(|| RunnerError::WorkflowDefinitionMissing {
                definition_id: instance.workflow_definition_id.clone(),
                version: instance.version,
            })?;

        self.run_internal(blueprint, instance, options).await
    }

    // =========================================================================
    // Run orchestration
    // =========================================================================

    async fn run_internal(
        &self,
        blueprint: Arc<Blueprint>,
        instance: WorkflowInstance,
        options: RunOptions,
    ) -> Result<WorkflowInstance, RunnerError> {
        let mut context =
            WorkflowExecutionContext::new(blueprint, instance, options.cancellation.clone());

        self.fidelity
            .load(WorkflowContextFidelity::Burst, &mut context)
            .await;

        let executed = match context.status() {
            WorkflowStatus::Idle => {
                self.begin(
                    &mut context,
                    options.activity_id.as_deref(),
                    options.input.clone(),
                )
                .await?
            }

            WorkflowStatus::Running => {
                self.drain(&mut context, Operation::Execute).await;
                true
            }

            WorkflowStatus::Suspended => {
                self.resume(
                    &mut context,
                    options.activity_id.as_deref(),
                    options.input.clone(),
                )
                .await?
            }

            status => {
                debug!(%status, "instance is terminal; run is a no-op");
                false
            }
        };

        if executed {
            if context.has_blocking_activities() {
                context.suspend();
            } else {
                context.complete();
            }
        }

        self.fidelity
            .save(WorkflowContextFidelity::Burst, &mut context)
            .await;

        self.publish(WorkflowNotification::WorkflowExecuted {
            workflow: &context,
        })
        .await;

        if executed {
            let terminal = match context.status() {
                WorkflowStatus::Finished => Some(WorkflowNotification::WorkflowCompleted {
                    workflow: &context,
                }),
                WorkflowStatus::Suspended => Some(WorkflowNotification::WorkflowSuspended {
                    workflow: &context,
                }),
                WorkflowStatus::Cancelled => Some(WorkflowNotification::WorkflowCancelled {
                    workflow: &context,
                }),
                WorkflowStatus::Faulted => Some(WorkflowNotification::WorkflowFaulted {
                    workflow: &context,
                }),
                WorkflowStatus::Idle | WorkflowStatus::Running => None,
            };
            if let Some(notification) = terminal {
                self.publish(notification).await;
            }
        }

        Ok(context.into_instance())
    }

    /// Start an idle instance
    async fn begin(
        &self,
        context: &mut WorkflowExecutionContext,
        activity_id: Option<&str>,
        input: Option<Value>,
    ) -> Result<bool, RunnerError> {
        let blueprint = context.blueprint_arc();

        let start = match activity_id {
            Some(id) => blueprint
                .activity(id)
                .cloned()
                .ok_or_else(|| RunnerError::ActivityNotFound {
                    activity_id: id.to_string(),
                })?,
            None => match blueprint.graph.start_activity().cloned() {
                Some(start) => start,
                None => {
                    debug!("blueprint has no activities; nothing to run");
                    return Ok(false);
                }
            },
        };

        if !self.probe_can_execute(context, &start, &input).await? {
            return Ok(false);
        }

        context.begin();
        context.schedule_activity(start.id.clone(), input);
        self.drain(context, Operation::Execute).await;
        Ok(true)
    }

    /// Resume a suspended instance at one of its blocking activities
    async fn resume(
        &self,
        context: &mut WorkflowExecutionContext,
        activity_id: Option<&str>,
        input: Option<Value>,
    ) -> Result<bool, RunnerError> {
        let activity_id = activity_id.ok_or(RunnerError::MissingResumeActivity)?;

        let blocked = context
            .instance
            .blocking_activities
            .iter()
            .any(|b| b.activity_id == activity_id);
        if !blocked {
            return Err(RunnerError::ActivityNotBlocked {
                activity_id: activity_id.to_string(),
            });
        }

        let blueprint = context.blueprint_arc();
        let target = blueprint
            .activity(activity_id)
            .cloned()
            .ok_or_else(|| RunnerError::ActivityNotFound {
                activity_id: activity_id.to_string(),
            })?;

        if !self.probe_can_execute(context, &target, &input).await? {
            return Ok(false);
        }

        context.remove_blocking_activities(activity_id);
        context.resume();
        context.schedule_activity(activity_id.to_string(), input);
        self.drain(context, Operation::Resume).await;
        Ok(true)
    }

    /// The drain loop: dispatch scheduled activities until the queues empty
    /// or the workflow leaves the Running state
    async fn drain(&self, context: &mut WorkflowExecutionContext, mut operation: Operation) {
        // One scope per burst; dropped on every exit path
        let scope = self.service_provider.create_scope();
        let mut dispatches: usize = 0;

        while context.has_scheduled_activities() {
            dispatches += 1;
            if dispatches > self.config.max_dispatches_per_run {
                context.fault(
                    format!(
                        "too many dispatches in one run (limit {})",
                        self.config.max_dispatches_per_run
                    ),
                    None,
                );
                break;
            }

            self.fidelity
                .load(WorkflowContextFidelity::Activity, context)
                .await;

            let Some(scheduled) = context.pop_scheduled_activity() else {
                break;
            };

            let Some(activity_blueprint) = context
                .blueprint_arc()
                .activity(&scheduled.activity_id)
                .cloned()
            else {
                context.fault(
                    format!(
                        "scheduled activity not found in blueprint: {}",
                        scheduled.activity_id
                    ),
                    Some(scheduled.activity_id.clone()),
                );
                break;
            };

            context.instance.current_activity = Some(activity_blueprint.id.clone());
            if self.config.log_execution {
                context.instance.log_dispatch(&activity_blueprint.id);
            }

            let mut activity_context = ActivityExecutionContext::new(
                activity_blueprint.clone(),
                scheduled.input.clone(),
                scope.clone(),
            );

            // Failures here become Fault results; they are captured, not
            // rethrown, and still flow through the notification pair.
            let result = match self.build_activity(context, &activity_context).await {
                Ok(mut activity) => {
                    let invoked = match operation {
                        Operation::Execute => {
                            activity.execute(context, &mut activity_context).await
                        }
                        Operation::Resume => activity.resume(context, &mut activity_context).await,
                    };
                    invoked.unwrap_or_else(|error| {
                        debug!(
                            activity_id = %activity_blueprint.id,
                            %error,
                            "activity dispatch failed"
                        );
                        ActivityResult::fault(error.to_string())
                    })
                }
                Err(error) => {
                    debug!(
                        activity_id = %activity_blueprint.id,
                        %error,
                        "activity construction failed"
                    );
                    ActivityResult::fault(error.to_string())
                }
            };

            self.publish(WorkflowNotification::ActivityExecuting {
                workflow: context,
                activity: &activity_context,
            })
            .await;

            result.apply(context, &activity_context);

            self.publish(WorkflowNotification::ActivityExecuted {
                workflow: context,
                activity: &activity_context,
            })
            .await;

            self.fidelity
                .save(WorkflowContextFidelity::Activity, context)
                .await;

            operation = Operation::Execute;
            context.complete_pass();

            // Deferred work only starts once the current burst has locally
            // completed.
            if !context.has_scheduled_activities() && context.has_post_scheduled_activities() {
                context.schedule_post_activities();
            }

            if context.status() != WorkflowStatus::Running {
                break;
            }
        }
    }

    /// Instantiate and probe an activity ahead of begin/resume
    ///
    /// Construction failures surface to the caller; a failing `can_execute`
    /// is treated as a decline.
    async fn probe_can_execute(
        &self,
        context: &WorkflowExecutionContext,
        activity_blueprint: &Arc<ActivityBlueprint>,
        input: &Option<Value>,
    ) -> Result<bool, RunnerError> {
        let scope = self.service_provider.create_scope();
        let activity_context =
            ActivityExecutionContext::new(activity_blueprint.clone(), input.clone(), scope);

        let activity = self
            .build_activity(context, &activity_context)
            .await
            .map_err(|error| RunnerError::ActivityConstruction {
                activity_id: activity_blueprint.id.clone(),
                message: error.to_string(),
            })?;

        match activity.can_execute(context, &activity_context).await {
            Ok(can_execute) => {
                if !can_execute {
                    debug!(
                        activity_id = %activity_blueprint.id,
                        "activity declined execution"
                    );
                }
                Ok(can_execute)
            }
            Err(error) => {
                warn!(
                    activity_id = %activity_blueprint.id,
                    %error,
                    "can_execute failed; treating as declined"
                );
                Ok(false)
            }
        }
    }

    /// Instantiate an activity and populate its inputs from providers
    async fn build_activity(
        &self,
        workflow: &WorkflowExecutionContext,
        activity_context: &ActivityExecutionContext,
    ) -> Result<Box<dyn Activity>, ActivityError> {
        let mut activity = (activity_context.blueprint.factory)(activity_context.scope())
            .map_err(|error| ActivityError::new(error.to_string()).with_type("CONSTRUCTION"))?;

        for provider in workflow
            .blueprint()
            .providers_for(activity_context.activity_id())
        {
            let value = self
                .evaluator
                .evaluate(
                    &provider.expression,
                    &provider.syntax,
                    provider.type_name.as_deref(),
                    workflow,
                    activity_context,
                )
                .await
                .map_err(|error| ActivityError::new(error.to_string()).with_type("PROPERTY"))?;

            activity.set_property(&provider.property_name, value)?;
        }

        Ok(activity)
    }

    /// Publish a notification; failures are logged and never fatal
    async fn publish(&self, notification: WorkflowNotification<'_>) {
        let name = notification.name();
        if let Err(error) = self.mediator.publish(notification).await {
            warn!(notification = name, %error, "event publication failed");
        }
    }
}
