//! Workflow-context fidelity management
//!
//! Workflows may declare a user context object that is loaded and saved
//! around execution. The [`WorkflowContextManager`] port owns the storage;
//! the [`ContextFidelityManager`] decides *when* load and save happen based
//! on the blueprint's declared fidelity.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::blueprint::Blueprint;
use crate::definition::WorkflowContextFidelity;
use crate::instance::WorkflowInstance;

use super::WorkflowExecutionContext;

/// Errors from workflow-context storage
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// Loading the context value failed
    #[error("workflow context load failed: {0}")]
    Load(String),

    /// Saving the context value failed
    #[error("workflow context save failed: {0}")]
    Save(String),
}

/// Port for storing the user workflow-context value
///
/// `save_context` returns the context id to record on the instance so later
/// runs can rehydrate.
#[async_trait]
pub trait WorkflowContextManager: Send + Sync {
    async fn load_context(
        &self,
        blueprint: &Blueprint,
        instance: &WorkflowInstance,
    ) -> Result<Option<Value>, ContextError>;

    async fn save_context(
        &self,
        context: &WorkflowExecutionContext,
    ) -> Result<String, ContextError>;
}

/// Orchestrates context load/save around the burst or around each activity
///
/// Load and save are best-effort: a failed load leaves the run with no
/// context value, a failed save keeps the previous context id. Neither
/// alters workflow status.
pub struct ContextFidelityManager {
    manager: Option<Arc<dyn WorkflowContextManager>>,
}

impl ContextFidelityManager {
    pub fn new(manager: Option<Arc<dyn WorkflowContextManager>>) -> Self {
        Self { manager }
    }

    fn manager_for(
        &self,
        blueprint: &Blueprint,
        fidelity: WorkflowContextFidelity,
    ) -> Option<&Arc<dyn WorkflowContextManager>> {
        let options = blueprint.context_options.as_ref()?;
        if options.fidelity != fidelity {
            return None;
        }
        self.manager.as_ref()
    }

    /// Load the context value if the blueprint declares this fidelity
    ///
    /// Skipped when the instance has no context id yet.
    pub async fn load(
        &self,
        fidelity: WorkflowContextFidelity,
        context: &mut WorkflowExecutionContext,
    ) {
        let blueprint = context.blueprint_arc();
        let Some(manager) = self.manager_for(&blueprint, fidelity) else {
            return;
        };
        if context.instance.context_id.is_none() {
            return;
        }

        match manager.load_context(&blueprint, &context.instance).await {
            Ok(value) => context.workflow_context = value,
            Err(error) => {
                warn!(
                    workflow_instance_id = %context.instance.id,
                    %error,
                    "continuing without workflow context"
                );
                context.workflow_context = None;
            }
        }
    }

    /// Save the context value if the blueprint declares this fidelity
    ///
    /// On success the returned context id is recorded on the instance.
    pub async fn save(
        &self,
        fidelity: WorkflowContextFidelity,
        context: &mut WorkflowExecutionContext,
    ) {
        let blueprint = context.blueprint_arc();
        let Some(manager) = self.manager_for(&blueprint, fidelity) else {
            return;
        };

        match manager.save_context(context).await {
            Ok(context_id) => context.instance.context_id = Some(context_id),
            Err(error) => {
                warn!(
                    workflow_instance_id = %context.instance.id,
                    %error,
                    "keeping previous workflow context id"
                );
            }
        }
    }
}
