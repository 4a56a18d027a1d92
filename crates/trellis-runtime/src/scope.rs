//! Scoped activity resolution
//!
//! The runner never constructs activities directly: each burst acquires a
//! fresh [`ServiceScope`] from the host's [`ServiceProvider`] and resolves
//! activity instances by type name through it. Scopes are released by drop
//! on every exit path.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::activity::Activity;

/// Errors from activity resolution
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScopeError {
    /// No constructor registered for the type name
    #[error("unknown activity type: {0}")]
    UnknownActivityType(String),

    /// The constructor itself failed
    #[error("activity construction failed: {0}")]
    Construction(String),
}

/// A resolution scope for one burst (or one `can_execute` probe)
///
/// Activities resolved from the same scope share scope-local services;
/// scopes from different bursts are independent.
pub trait ServiceScope: Send + Sync {
    /// Produce a fresh activity instance for the given type name
    fn resolve(&self, type_name: &str) -> Result<Box<dyn Activity>, ScopeError>;
}

/// Produces resolution scopes
pub trait ServiceProvider: Send + Sync {
    fn create_scope(&self) -> Arc<dyn ServiceScope>;
}

type ActivityConstructor = Arc<dyn Fn() -> Box<dyn Activity> + Send + Sync>;

/// Service provider backed by a static name → constructor table
///
/// The common host setup: register every activity type once at startup,
/// hand the provider to the runner.
#[derive(Default)]
pub struct StaticServiceProvider {
    constructors: RwLock<HashMap<String, ActivityConstructor>>,
}

impl StaticServiceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for an activity type name
    pub fn register<F>(&self, type_name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn Activity> + Send + Sync + 'static,
    {
        self.constructors
            .write()
            .insert(type_name.into(), Arc::new(constructor));
    }
}

impl ServiceProvider for StaticServiceProvider {
    fn create_scope(&self) -> Arc<dyn ServiceScope> {
        // Each scope gets its own snapshot of the table
        Arc::new(StaticScope {
            constructors: self.constructors.read().clone(),
        })
    }
}

struct StaticScope {
    constructors: HashMap<String, ActivityConstructor>,
}

impl ServiceScope for StaticScope {
    fn resolve(&self, type_name: &str) -> Result<Box<dyn Activity>, ScopeError> {
        let constructor = self
            .constructors
            .get(type_name)
            .ok_or_else(|| ScopeError::UnknownActivityType(type_name.to_string()))?;

        Ok(constructor())
    }
}
