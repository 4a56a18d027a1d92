//! Executable workflow blueprints
//!
//! This module contains the materialized form of a workflow:
//! - [`Blueprint`] and [`ActivityBlueprint`] for the executable graph
//! - [`materialize`] for converting serialized definitions
//! - [`PropertyProvider`] records for expression-backed activity inputs

mod materializer;
mod model;

pub use materializer::{materialize, MaterializeError};
pub use model::{
    ActivityBlueprint, ActivityFactory, ActivityGraph, Blueprint, Connection, PropertyProvider,
};
