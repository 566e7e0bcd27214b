//! Cohort Registry
//!
//! Holds registered experiments and enforces registration invariants.
//!
//! # Core Concepts
//!
//! - [`ExperimentStore`]: three-operation backend contract (get/set/delete)
//! - [`MemoryExperimentStore`]: concurrent in-memory backend
//! - [`FileExperimentStore`]: durable JSON-file backend
//! - [`Registry`]: registration and lookup over any store
//!
//! # Example
//!
//! ```rust
//! use cohort_experiment::Experiment;
//! use cohort_registry::Registry;
//!
//! let registry = Registry::new();
//! let experiment = Experiment::builder("pricing_page")
//!     .alternative("control")
//!     .alternative("annual_first")
//!     .build()
//!     .unwrap();
//!
//! registry.register(experiment).unwrap();
//! assert!(registry.lookup("pricing_page").unwrap().is_some());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod file;
mod memory;
mod registry;
mod store;

// Re-exports
pub use error::{RegistryError, StoreError};
pub use file::FileExperimentStore;
pub use memory::MemoryExperimentStore;
pub use registry::Registry;
pub use store::ExperimentStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
