//! Cohort Sim
//!
//! Drives synthetic client traffic through an [`cohort_core::ExperimentManager`]
//! over the cookie transport, and decodes state tokens for debugging.
//!
//! # Core Concepts
//!
//! - [`run_simulator`]: many clients, each checked against the lifecycle rules
//! - [`inspect`]: derived per-experiment state of one token

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod inspect;
mod simulator;

// Re-exports
pub use error::SimError;
pub use inspect::{inspect, InspectedExperiment, Inspection};
pub use simulator::{
    run_simulator, AlternativeTally, ExperimentTally, SimulatorConfig, SimulatorReport, Violation,
};

use cohort_core::ManagerConfig;
use cohort_experiment::{AlternativeDefinition, ExperimentDefinition};

/// Key of the experiment simulated when the config declares none
pub const DEMO_EXPERIMENT: &str = "demo";

/// `config`, or `config` plus a two-way demo experiment if it declares none
#[must_use]
pub fn with_demo_experiment(config: ManagerConfig) -> ManagerConfig {
    if !config.experiments.is_empty() {
        return config;
    }
    config.with_experiment(ExperimentDefinition {
        key: DEMO_EXPERIMENT.to_string(),
        alternatives: vec![
            AlternativeDefinition::new("control"),
            AlternativeDefinition::new("variant"),
        ],
    })
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
