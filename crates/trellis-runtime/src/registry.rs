//! Workflow registry and providers
//!
//! Providers are the source of blueprints (database, filesystem, code);
//! the registry enumerates them lazily to answer two questions: which
//! blueprint does an instance belong to, and which workflows are currently
//! active. Both are ports; [`ProviderWorkflowRegistry`] is the default
//! implementation.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tracing::warn;

use crate::blueprint::Blueprint;
use crate::events::{Mediator, WorkflowNotification, WorkflowSettings};
use crate::store::{StoreError, WorkflowInstanceStore};

/// Errors from registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Instance store error while checking activity
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Lazy source of blueprints
pub trait WorkflowProvider: Send + Sync {
    /// Stream every blueprint this provider knows about
    fn workflows(&self) -> BoxStream<'_, Arc<Blueprint>>;
}

/// Registry of executable workflows
#[async_trait]
pub trait WorkflowRegistry: Send + Sync {
    /// The blueprint matching an instance's definition id and exact version
    async fn get_by_instance(
        &self,
        definition_id: &str,
        version: i32,
    ) -> Result<Option<Arc<Blueprint>>, RegistryError>;

    /// All workflows currently eligible for new or resumed runs
    async fn list_active(&self) -> Result<Vec<Arc<Blueprint>>, RegistryError>;
}

/// Provider backed by a fixed blueprint list
pub struct StaticWorkflowProvider {
    blueprints: Vec<Arc<Blueprint>>,
}

impl StaticWorkflowProvider {
    pub fn new(blueprints: Vec<Arc<Blueprint>>) -> Self {
        Self { blueprints }
    }
}

impl WorkflowProvider for StaticWorkflowProvider {
    fn workflows(&self) -> BoxStream<'_, Arc<Blueprint>> {
        stream::iter(self.blueprints.iter().cloned()).boxed()
    }
}

/// Default registry: enumerates providers, gates listing on settings
///
/// While listing, a [`WorkflowNotification::WorkflowSettingsLoaded`] is
/// published per workflow so subscribers can disable individual workflows.
/// Unpublished workflows stay listed only while non-terminal instances of
/// them exist in the store.
pub struct ProviderWorkflowRegistry {
    providers: Vec<Arc<dyn WorkflowProvider>>,
    instance_store: Arc<dyn WorkflowInstanceStore>,
    mediator: Arc<dyn Mediator>,
}

impl ProviderWorkflowRegistry {
    pub fn new(
        providers: Vec<Arc<dyn WorkflowProvider>>,
        instance_store: Arc<dyn WorkflowInstanceStore>,
        mediator: Arc<dyn Mediator>,
    ) -> Self {
        Self {
            providers,
            instance_store,
            mediator,
        }
    }
}

#[async_trait]
impl WorkflowRegistry for ProviderWorkflowRegistry {
    async fn get_by_instance(
        &self,
        definition_id: &str,
        version: i32,
    ) -> Result<Option<Arc<Blueprint>>, RegistryError> {
        for provider in &self.providers {
            let mut workflows = provider.workflows();
            while let Some(blueprint) = workflows.next().await {
                if blueprint.id == definition_id && blueprint.version == version {
                    return Ok(Some(blueprint));
                }
            }
        }
        Ok(None)
    }

    async fn list_active(&self) -> Result<Vec<Arc<Blueprint>>, RegistryError> {
        let mut active = Vec::new();

        for provider in &self.providers {
            let mut workflows = provider.workflows();
            while let Some(blueprint) = workflows.next().await {
                if !blueprint.is_enabled {
                    continue;
                }

                let settings = WorkflowSettings::new(&blueprint.id, blueprint.version);
                if let Err(error) = self
                    .mediator
                    .publish(WorkflowNotification::WorkflowSettingsLoaded {
                        settings: &settings,
                    })
                    .await
                {
                    warn!(definition_id = %blueprint.id, %error, "settings publication failed");
                }
                if settings.is_disabled() {
                    continue;
                }

                let listed = blueprint.is_published
                    || self
                        .instance_store
                        .count_active(&blueprint.id, blueprint.version)
                        .await?
                        > 0;

                if listed {
                    active.push(blueprint);
                }
            }
        }

        Ok(active)
    }
}
