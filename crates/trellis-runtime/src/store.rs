//! Workflow instance store port
//!
//! Persistence of instances is external to the runtime; the runner and the
//! registry only need the narrow contract below. The in-memory store backs
//! tests and single-process hosts.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::instance::WorkflowInstance;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Instance not found
    #[error("workflow instance not found: {0}")]
    InstanceNotFound(Uuid),

    /// Backend error
    #[error("storage error: {0}")]
    Storage(String),
}

/// Store for workflow instances
///
/// Implementations must be safe for concurrent use by multiple runner
/// invocations; the store is the serialization point between runs.
#[async_trait]
pub trait WorkflowInstanceStore: Send + Sync {
    /// Save (upsert) an instance
    async fn save(&self, instance: &WorkflowInstance) -> Result<(), StoreError>;

    /// Find an instance by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<WorkflowInstance>, StoreError>;

    /// Count non-terminal instances of a definition version
    ///
    /// Used by the registry to decide whether an unpublished workflow is
    /// still active.
    async fn count_active(&self, definition_id: &str, version: i32) -> Result<usize, StoreError>;

    /// Find any non-terminal instance of a definition, regardless of version
    ///
    /// Used by the singleton guard.
    async fn find_active_by_definition(
        &self,
        definition_id: &str,
    ) -> Result<Option<WorkflowInstance>, StoreError>;
}

/// In-memory instance store for testing and single-process hosts
#[derive(Debug, Default)]
pub struct InMemoryWorkflowInstanceStore {
    instances: DashMap<Uuid, WorkflowInstance>,
}

impl InMemoryWorkflowInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[async_trait]
impl WorkflowInstanceStore for InMemoryWorkflowInstanceStore {
    async fn save(&self, instance: &WorkflowInstance) -> Result<(), StoreError> {
        self.instances.insert(instance.id, instance.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WorkflowInstance>, StoreError> {
        Ok(self.instances.get(&id).map(|entry| entry.value().clone()))
    }

    async fn count_active(&self, definition_id: &str, version: i32) -> Result<usize, StoreError> {
        Ok(self
            .instances
            .iter()
            .filter(|entry| {
                entry.workflow_definition_id == definition_id
                    && entry.version == version
                    && !entry.status.is_terminal()
            })
            .count())
    }

    async fn find_active_by_definition(
        &self,
        definition_id: &str,
    ) -> Result<Option<WorkflowInstance>, StoreError> {
        Ok(self
            .instances
            .iter()
            .find(|entry| {
                entry.workflow_definition_id == definition_id && !entry.status.is_terminal()
            })
            .map(|entry| entry.value().clone()))
    }
}
