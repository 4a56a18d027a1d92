//! Executable blueprint model
//!
//! A [`Blueprint`] is the immutable, materialized form of a workflow
//! definition. Activities are owned by their scope's [`ActivityGraph`];
//! connections hold shared references into that map, so the graph can be
//! walked without id lookups.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::activity::Activity;
use crate::definition::{ContextOptions, PersistenceBehavior, Variables};
use crate::scope::{ScopeError, ServiceScope};

/// Instantiates an activity through the scoped service provider
pub type ActivityFactory =
    Arc<dyn Fn(&dyn ServiceScope) -> Result<Box<dyn Activity>, ScopeError> + Send + Sync>;

/// Evaluates one activity property from its stored expression
///
/// A provider closes over the `(expression, syntax, type)` triple from the
/// definition; the expression engine invoked with it is a port, so the
/// provider itself stays inert data.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyProvider {
    pub property_name: String,
    pub expression: String,
    pub syntax: String,
    pub type_name: Option<String>,
}

/// Executable form of a single activity
///
/// Composite activities carry their nested sub-graph in `body`; the outer
/// scope schedules them as a single atomic node and their internals are
/// entered only by their own execute/resume logic.
pub struct ActivityBlueprint {
    pub id: String,
    pub activity_type: String,
    pub display_name: Option<String>,
    pub persist_workflow: bool,
    pub factory: ActivityFactory,
    pub body: Option<ActivityGraph>,
}

impl ActivityBlueprint {
    pub fn is_composite(&self) -> bool {
        self.body.is_some()
    }
}

impl fmt::Debug for ActivityBlueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityBlueprint")
            .field("id", &self.id)
            .field("activity_type", &self.activity_type)
            .field("composite", &self.is_composite())
            .finish()
    }
}

/// A materialized connection: direct references plus the outcome label
#[derive(Debug, Clone)]
pub struct Connection {
    pub source: Arc<ActivityBlueprint>,
    pub target: Arc<ActivityBlueprint>,
    pub outcome: String,
}

/// One composite scope of activities and connections
///
/// The activity map is the single owner of its blueprints; connections and
/// callers share them through `Arc`. Declaration order is preserved for
/// start-activity resolution.
#[derive(Debug)]
pub struct ActivityGraph {
    activities: Vec<Arc<ActivityBlueprint>>,
    index: HashMap<String, usize>,
    connections: Vec<Connection>,
}

impl ActivityGraph {
    pub(crate) fn new(activities: Vec<Arc<ActivityBlueprint>>, connections: Vec<Connection>) -> Self {
        let index = activities
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.clone(), i))
            .collect();
        Self {
            activities,
            index,
            connections,
        }
    }

    /// Look up an activity in this scope only
    pub fn activity(&self, id: &str) -> Option<&Arc<ActivityBlueprint>> {
        self.index.get(id).map(|&i| &self.activities[i])
    }

    /// Look up an activity in this scope or any nested composite scope
    ///
    /// Outer scopes win when an id is reused inside a composite.
    pub fn find_activity(&self, id: &str) -> Option<&Arc<ActivityBlueprint>> {
        if let Some(found) = self.activity(id) {
            return Some(found);
        }
        self.activities
            .iter()
            .filter_map(|a| a.body.as_ref())
            .find_map(|body| body.find_activity(id))
    }

    /// The scope (this graph or a nested one, outer-first) that owns `id`
    ///
    /// Outcome edges resolve against the owning scope, so connections never
    /// cross composite boundaries.
    pub fn owning_scope(&self, id: &str) -> Option<&ActivityGraph> {
        if self.index.contains_key(id) {
            return Some(self);
        }
        self.activities
            .iter()
            .filter_map(|a| a.body.as_ref())
            .find_map(|body| body.owning_scope(id))
    }

    /// Activities in declaration order
    pub fn activities(&self) -> impl Iterator<Item = &Arc<ActivityBlueprint>> {
        self.activities.iter()
    }

    /// Connections declared in this scope
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Connections leaving `source_id` along `outcome`, in declaration order
    pub fn connections_from<'a>(
        &'a self,
        source_id: &'a str,
        outcome: &'a str,
    ) -> impl Iterator<Item = &'a Connection> {
        self.connections
            .iter()
            .filter(move |c| c.source.id == source_id && c.outcome == outcome)
    }

    /// The scope's start activity
    ///
    /// The first activity that is never the target of a connection, falling
    /// back to the first declared activity.
    pub fn start_activity(&self) -> Option<&Arc<ActivityBlueprint>> {
        let targeted: HashSet<&str> = self
            .connections
            .iter()
            .map(|c| c.target.id.as_str())
            .collect();

        self.activities
            .iter()
            .find(|a| !targeted.contains(a.id.as_str()))
            .or_else(|| self.activities.first())
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }
}

/// The immutable, executable form of a workflow
#[derive(Debug)]
pub struct Blueprint {
    pub id: String,
    pub version: i32,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_singleton: bool,
    pub is_enabled: bool,
    pub is_latest: bool,
    pub is_published: bool,
    pub variables: Variables,
    pub context_options: Option<ContextOptions>,
    pub persistence_behavior: PersistenceBehavior,
    pub delete_completed_instances: bool,

    /// Top-level composite scope
    pub graph: ActivityGraph,

    /// Property providers keyed by `(activity_id, property_name)`,
    /// including providers for nested activities
    pub property_providers: HashMap<(String, String), PropertyProvider>,
}

impl Blueprint {
    /// Look up an activity anywhere in the blueprint (outer scopes first)
    pub fn activity(&self, id: &str) -> Option<&Arc<ActivityBlueprint>> {
        self.graph.find_activity(id)
    }

    /// Providers registered for one activity, in no particular order
    pub fn providers_for<'a>(
        &'a self,
        activity_id: &'a str,
    ) -> impl Iterator<Item = &'a PropertyProvider> {
        self.property_providers
            .iter()
            .filter(move |((id, _), _)| id == activity_id)
            .map(|(_, provider)| provider)
    }
}
