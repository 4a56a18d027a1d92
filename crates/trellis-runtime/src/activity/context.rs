//! Activity execution context

use std::sync::Arc;

use serde_json::Value;

use crate::blueprint::ActivityBlueprint;
use crate::scope::ServiceScope;

/// Per-dispatch state for one activity invocation
///
/// Created immediately before dispatch and discarded after the result is
/// applied. Carries the activity's blueprint, the input it was scheduled
/// with, its output slot, and the burst's service scope.
#[derive(Clone)]
pub struct ActivityExecutionContext {
    /// Blueprint of the activity being dispatched
    pub blueprint: Arc<ActivityBlueprint>,

    /// Input the activity was scheduled with
    pub input: Option<Value>,

    /// Output produced by the activity, forwarded to scheduled successors
    pub output: Option<Value>,

    scope: Arc<dyn ServiceScope>,
}

impl ActivityExecutionContext {
    pub fn new(
        blueprint: Arc<ActivityBlueprint>,
        input: Option<Value>,
        scope: Arc<dyn ServiceScope>,
    ) -> Self {
        Self {
            blueprint,
            input,
            output: None,
            scope,
        }
    }

    /// Id of the activity being dispatched
    pub fn activity_id(&self) -> &str {
        &self.blueprint.id
    }

    /// Type name of the activity being dispatched
    pub fn activity_type(&self) -> &str {
        &self.blueprint.activity_type
    }

    /// Set the activity's output
    pub fn set_output(&mut self, value: Value) {
        self.output = Some(value);
    }

    /// The service scope this dispatch runs inside
    pub fn scope(&self) -> &dyn ServiceScope {
        self.scope.as_ref()
    }
}

impl std::fmt::Debug for ActivityExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityExecutionContext")
            .field("activity_id", &self.blueprint.id)
            .field("activity_type", &self.blueprint.activity_type)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}
