//! Cohort Core
//!
//! A/B experiment manager that keeps every per-client assignment in one token
//! carried by the client, typically a cookie.
//!
//! # Core Concepts
//!
//! - [`ExperimentManager`]: register, start and finish experiments
//! - [`ManagerConfig`]: token name, cookie attributes, experiments to register
//! - [`ManagerError`]: misuse (abort startup) vs recoverable (per request)
//!
//! A client is assigned at most once per experiment and finishes at most once;
//! the first-time flags on the responses say when each happened.
//!
//! # Example
//!
//! ```rust
//! use cohort_core::prelude::*;
//!
//! let manager = ExperimentManager::new();
//! manager
//!     .register_experiment(
//!         Experiment::builder("checkout_button")
//!             .alternative("green")
//!             .weighted_alternative("red", 3)
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! let request = CookieRequest::parse("theme=dark");
//! let mut response = manager.cookie_response();
//! let started = manager
//!     .start_experiment("checkout_button", &request, &mut response)
//!     .unwrap();
//! assert!(started.did_start_first_time);
//! assert!(response.header("cohort").is_some());
//!
//! let request = response.to_request();
//! let mut response = manager.cookie_response();
//! let finished = manager
//!     .finish_experiment("checkout_button", &request, &mut response)
//!     .unwrap();
//! assert_eq!(finished.alternative, started.alternative);
//! assert!(finished.did_finish_first_time);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod config;
mod error;
mod manager;

// Re-exports
pub use config::ManagerConfig;
pub use error::{ConfigError, ManagerError};
pub use manager::ExperimentManager;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Cohort
    pub use crate::{ExperimentManager, ManagerConfig, ManagerError};
    pub use cohort_experiment::{Experiment, ExperimentDefinition};
    pub use cohort_persistence::{
        CookieConfig, CookieRequest, CookieResponse, FinishExperimentResponse, MemoryTokenJar,
        StartExperimentResponse, TokenSink, TokenSource,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
