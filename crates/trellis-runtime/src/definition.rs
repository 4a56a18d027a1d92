//! Serialized workflow definition model
//!
//! A [`WorkflowDefinition`] is the storage/wire form of a workflow: a list of
//! activity definitions plus the outcome-labeled connections between them.
//! Definitions are inert data; the materializer turns them into executable
//! [`Blueprint`](crate::blueprint::Blueprint)s.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named workflow variables, persisted with the instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables(pub HashMap<String, Value>);

impl Variables {
    /// Create an empty variable set
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a variable by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Set a variable, returning the previous value if any
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    /// Check if no variables are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// When the user workflow-context object is loaded and saved during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowContextFidelity {
    /// Load once before the drain loop, save once after
    #[default]
    Burst,

    /// Load before and save after every activity dispatch
    Activity,
}

/// Options for the user workflow-context object tied to an instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextOptions {
    /// Type name of the context value (opaque to the runtime)
    pub context_type: Option<String>,

    /// Load/save policy
    #[serde(default)]
    pub fidelity: WorkflowContextFidelity,
}

/// When the host should persist the workflow instance
///
/// Persistence itself is external to the runtime; this is carried metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceBehavior {
    /// Persist when the workflow suspends
    Suspended,

    /// Persist after each burst
    #[default]
    WorkflowBurst,

    /// Persist after every activity
    ActivityExecuted,
}

/// A single property on an activity definition
///
/// Properties are expressions evaluated against the activity execution
/// context when the activity is instantiated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityProperty {
    /// Expression text
    pub expression: String,

    /// Expression syntax (e.g. "Literal", "JavaScript")
    pub syntax: String,

    /// Declared type name of the evaluated value
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
}

impl ActivityProperty {
    /// Create a literal property (the expression text is the value)
    pub fn literal(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            syntax: crate::expression::syntaxes::LITERAL.to_string(),
            type_name: None,
        }
    }
}

/// A serialized activity within a workflow definition
///
/// A composite activity carries its own nested `activities` and
/// `connections`; a leaf activity leaves both empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityDefinition {
    /// Unique activity id within its composite scope
    pub activity_id: String,

    /// Activity type name, resolved through the service scope at run time
    #[serde(rename = "type")]
    pub activity_type: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Whether the host should persist the instance after this activity
    #[serde(default)]
    pub persist_workflow: bool,

    /// Property expressions keyed by property name
    #[serde(default)]
    pub properties: HashMap<String, ActivityProperty>,

    /// Nested activities (composite activities only)
    #[serde(default)]
    pub activities: Vec<ActivityDefinition>,

    /// Nested connections (composite activities only)
    #[serde(default)]
    pub connections: Vec<ConnectionDefinition>,
}

impl ActivityDefinition {
    /// Create a leaf activity definition
    pub fn new(activity_id: impl Into<String>, activity_type: impl Into<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            activity_type: activity_type.into(),
            ..Self::default()
        }
    }

    /// Add a property expression
    pub fn with_property(mut self, name: impl Into<String>, property: ActivityProperty) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Add a nested activity (turns this definition into a composite)
    pub fn with_activity(mut self, activity: ActivityDefinition) -> Self {
        self.activities.push(activity);
        self
    }

    /// Add a nested connection
    pub fn with_connection(mut self, connection: ConnectionDefinition) -> Self {
        self.connections.push(connection);
        self
    }

    /// Whether this definition carries a nested sub-graph
    pub fn is_composite(&self) -> bool {
        !self.activities.is_empty()
    }
}

/// A directed, outcome-labeled edge between two activities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDefinition {
    pub source_activity_id: String,
    pub target_activity_id: String,
    pub outcome: String,
}

impl ConnectionDefinition {
    pub fn new(
        source_activity_id: impl Into<String>,
        target_activity_id: impl Into<String>,
        outcome: impl Into<String>,
    ) -> Self {
        Self {
            source_activity_id: source_activity_id.into(),
            target_activity_id: target_activity_id.into(),
            outcome: outcome.into(),
        }
    }
}

/// Serialized description of a workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Definition id, stable across versions
    pub id: String,

    /// Definition version
    pub version: i32,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// At most one non-finished instance may exist at a time
    #[serde(default)]
    pub is_singleton: bool,

    #[serde(default = "default_true")]
    pub is_enabled: bool,

    #[serde(default)]
    pub is_latest: bool,

    #[serde(default)]
    pub is_published: bool,

    /// Initial variables for new instances
    #[serde(default)]
    pub variables: Variables,

    /// User workflow-context options; absent means no context load/save
    #[serde(default)]
    pub context_options: Option<ContextOptions>,

    #[serde(default)]
    pub persistence_behavior: PersistenceBehavior,

    #[serde(default)]
    pub delete_completed_instances: bool,

    #[serde(default)]
    pub activities: Vec<ActivityDefinition>,

    #[serde(default)]
    pub connections: Vec<ConnectionDefinition>,
}

fn default_true() -> bool {
    true
}

impl WorkflowDefinition {
    /// Create a definition with the given id and version
    pub fn new(id: impl Into<String>, version: i32) -> Self {
        Self {
            id: id.into(),
            version,
            is_enabled: true,
            ..Self::default()
        }
    }

    /// Add a top-level activity
    pub fn with_activity(mut self, activity: ActivityDefinition) -> Self {
        self.activities.push(activity);
        self
    }

    /// Add a top-level connection
    pub fn with_connection(mut self, connection: ConnectionDefinition) -> Self {
        self.connections.push(connection);
        self
    }

    /// Set the context options
    pub fn with_context_options(mut self, options: ContextOptions) -> Self {
        self.context_options = Some(options);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_definition_roundtrip() {
        let definition = WorkflowDefinition::new("wf-1", 2)
            .with_activity(
                ActivityDefinition::new("a", "write-line")
                    .with_property("text", ActivityProperty::literal("hello")),
            )
            .with_activity(ActivityDefinition::new("b", "write-line"))
            .with_connection(ConnectionDefinition::new("a", "b", "Done"));

        let json = serde_json::to_string(&definition).unwrap();
        let parsed: WorkflowDefinition = serde_json::from_str(&json).unwrap();

        assert_eq!(definition, parsed);
    }

    #[test]
    fn test_defaults_on_sparse_input() {
        let parsed: WorkflowDefinition =
            serde_json::from_value(json!({ "id": "wf-1", "version": 1 })).unwrap();

        assert!(parsed.is_enabled);
        assert!(!parsed.is_singleton);
        assert!(parsed.context_options.is_none());
        assert_eq!(parsed.persistence_behavior, PersistenceBehavior::WorkflowBurst);
        assert!(parsed.activities.is_empty());
    }

    #[test]
    fn test_composite_definition() {
        let composite = ActivityDefinition::new("outer", "sequence")
            .with_activity(ActivityDefinition::new("inner-1", "write-line"))
            .with_activity(ActivityDefinition::new("inner-2", "write-line"))
            .with_connection(ConnectionDefinition::new("inner-1", "inner-2", "Done"));

        assert!(composite.is_composite());
        assert!(!ActivityDefinition::new("leaf", "write-line").is_composite());
    }

    #[test]
    fn test_variables() {
        let mut variables = Variables::new();
        assert!(variables.is_empty());

        variables.set("count", json!(3));
        assert_eq!(variables.get("count"), Some(&json!(3)));
        assert_eq!(variables.set("count", json!(4)), Some(json!(3)));
    }

    #[test]
    fn test_context_fidelity_serialization() {
        let options = ContextOptions {
            context_type: Some("OrderContext".to_string()),
            fidelity: WorkflowContextFidelity::Activity,
        };

        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"fidelity\":\"activity\""));
    }
}
