//! USE Method analysis
//!
//! This module provides:
//! - Resource definitions and the two-tier severity threshold table
//! - The resource scorer (samples -> utilization/saturation/errors)
//! - Health aggregation with worst-resource-wins
//! - Rule-based finding generation
//!
//! Everything here is synchronous, pure computation with no I/O.

mod aggregator;
pub mod definitions;
mod findings;
mod scorer;

pub use aggregator::aggregate;
pub use definitions::{
    default_resources, resources, signals, AnalysisConfig, AxisSignal, ResourceDefinition,
    ScoreWeights, ThresholdCheck,
};
pub use findings::generate as generate_findings;
pub use scorer::{score_resource, ResourceScorer};
