//! Cohort Experiments
//!
//! Experiment definitions, registration validation and weighted selection.
//!
//! # Core Concepts
//!
//! - [`ExperimentDefinition`]: unvalidated experiment as declared
//! - [`Experiment`]: validated, immutable experiment (only built through validation)
//! - [`Selector`]: weighted random choice over an injected random source
//!
//! # Example
//!
//! ```rust
//! use cohort_experiment::{Experiment, Selector};
//!
//! let experiment = Experiment::builder("checkout_button")
//!     .alternative("control")
//!     .weighted_alternative("green", 3)
//!     .build()
//!     .unwrap();
//!
//! let mut selector = Selector::seeded(42);
//! let chosen = selector.choose(&experiment).unwrap();
//! assert!(experiment.alternative(chosen).is_some());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod experiment;
mod selector;

// Re-exports
pub use error::{RegistrationError, SelectionError};
pub use experiment::{
    Alternative, AlternativeDefinition, Experiment, ExperimentBuilder, ExperimentDefinition,
    DEFAULT_WEIGHT, FINISHED_SUFFIX,
};
pub use selector::{choose, Selector};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
