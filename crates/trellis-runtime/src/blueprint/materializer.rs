//! Blueprint materialization
//!
//! Converts a serialized [`WorkflowDefinition`] into an executable
//! [`Blueprint`]: activities become blueprints with factory closures,
//! connections are re-wired to direct references, and every property
//! expression becomes a [`PropertyProvider`]. Composite activities are
//! materialized recursively into their own scopes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::definition::{ActivityDefinition, ConnectionDefinition, WorkflowDefinition};
use crate::scope::ServiceScope;

use super::model::{
    ActivityBlueprint, ActivityFactory, ActivityGraph, Blueprint, Connection, PropertyProvider,
};

/// Errors raised while materializing a definition
///
/// Both kinds are fatal: a definition that trips them cannot be executed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MaterializeError {
    /// An activity id appears twice within one composite scope
    #[error("duplicate activity id in scope: {activity_id}")]
    DuplicateActivityId { activity_id: String },

    /// A connection endpoint does not resolve within its scope
    #[error(
        "connection {source_activity_id} -[{outcome}]-> {target_activity_id} \
         references unknown activity {unknown_id}"
    )]
    UnresolvedConnection {
        source_activity_id: String,
        target_activity_id: String,
        outcome: String,
        unknown_id: String,
    },
}

/// Materialize a definition into an executable blueprint
///
/// Total on well-formed input and deterministic: materializing the same
/// definition twice yields structurally equal blueprints.
pub fn materialize(definition: &WorkflowDefinition) -> Result<Blueprint, MaterializeError> {
    let mut property_providers = HashMap::new();
    let graph = materialize_scope(
        &definition.activities,
        &definition.connections,
        &mut property_providers,
    )?;

    Ok(Blueprint {
        id: definition.id.clone(),
        version: definition.version,
        name: definition.name.clone(),
        description: definition.description.clone(),
        is_singleton: definition.is_singleton,
        is_enabled: definition.is_enabled,
        is_latest: definition.is_latest,
        is_published: definition.is_published,
        variables: definition.variables.clone(),
        context_options: definition.context_options.clone(),
        persistence_behavior: definition.persistence_behavior,
        delete_completed_instances: definition.delete_completed_instances,
        graph,
        property_providers,
    })
}

/// Materialize one composite scope, recursing into nested composites
fn materialize_scope(
    activities: &[ActivityDefinition],
    connections: &[ConnectionDefinition],
    property_providers: &mut HashMap<(String, String), PropertyProvider>,
) -> Result<ActivityGraph, MaterializeError> {
    let mut built: Vec<Arc<ActivityBlueprint>> = Vec::with_capacity(activities.len());
    let mut seen: HashSet<&str> = HashSet::with_capacity(activities.len());

    for def in activities {
        if !seen.insert(def.activity_id.as_str()) {
            return Err(MaterializeError::DuplicateActivityId {
                activity_id: def.activity_id.clone(),
            });
        }

        // Nested activities and connections live in their own scope and are
        // not visible to the outer scope's connection resolution.
        let body = if def.is_composite() {
            Some(materialize_scope(
                &def.activities,
                &def.connections,
                property_providers,
            )?)
        } else {
            None
        };

        for (name, property) in &def.properties {
            property_providers.insert(
                (def.activity_id.clone(), name.clone()),
                PropertyProvider {
                    property_name: name.clone(),
                    expression: property.expression.clone(),
                    syntax: property.syntax.clone(),
                    type_name: property.type_name.clone(),
                },
            );
        }

        let activity_type = def.activity_type.clone();
        let factory: ActivityFactory =
            Arc::new(move |scope: &dyn ServiceScope| scope.resolve(&activity_type));

        built.push(Arc::new(ActivityBlueprint {
            id: def.activity_id.clone(),
            activity_type: def.activity_type.clone(),
            display_name: def.display_name.clone(),
            persist_workflow: def.persist_workflow,
            factory,
            body,
        }));
    }

    let by_id: HashMap<&str, &Arc<ActivityBlueprint>> =
        built.iter().map(|a| (a.id.as_str(), a)).collect();

    let mut materialized = Vec::with_capacity(connections.len());
    for connection in connections {
        let resolve = |id: &str| {
            by_id.get(id).map(|a| Arc::clone(a)).ok_or_else(|| {
                MaterializeError::UnresolvedConnection {
                    source_activity_id: connection.source_activity_id.clone(),
                    target_activity_id: connection.target_activity_id.clone(),
                    outcome: connection.outcome.clone(),
                    unknown_id: id.to_string(),
                }
            })
        };

        materialized.push(Connection {
            source: resolve(&connection.source_activity_id)?,
            target: resolve(&connection.target_activity_id)?,
            outcome: connection.outcome.clone(),
        });
    }

    Ok(ActivityGraph::new(built, materialized))
}
