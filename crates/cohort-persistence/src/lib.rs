//! Cohort Persistence
//!
//! Per-client experiment state carried in a single opaque token.
//!
//! # Core Concepts
//!
//! - [`StateBlob`]: flat string map holding every experiment's state for a client
//! - [`TokenSource`] / [`TokenSink`]: read/write contract for the token transport
//! - [`CookieRequest`] / [`CookieResponse`]: HTTP cookie transport
//! - [`MemoryTokenJar`]: in-memory transport for tests and simulation
//! - [`PersistenceProtocol`]: the start/finish state machine
//!
//! The token carries no integrity protection: a client can edit its own
//! assignment.
//!
//! # Example
//!
//! ```rust
//! use cohort_experiment::{Experiment, Selector};
//! use cohort_persistence::{MemoryTokenJar, PersistenceProtocol};
//!
//! let experiment = Experiment::builder("signup_copy")
//!     .alternative("short")
//!     .alternative("long")
//!     .build()
//!     .unwrap();
//! let protocol = PersistenceProtocol::default();
//! let mut selector = Selector::seeded(1);
//!
//! let request = MemoryTokenJar::new();
//! let mut response = MemoryTokenJar::new();
//! let started = protocol
//!     .start(&experiment, &request, &mut response, |e| {
//!         selector.choose(e).map(str::to_string)
//!     })
//!     .unwrap();
//! assert!(started.did_start_first_time);
//!
//! let request = request.next_request(&response);
//! let mut response = MemoryTokenJar::new();
//! let finished = protocol.finish(&experiment, &request, &mut response).unwrap();
//! assert_eq!(finished.alternative, started.alternative);
//! assert!(finished.did_finish_first_time);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod blob;
pub mod cookie;
mod error;
mod protocol;
mod response;
mod transport;

// Re-exports
pub use blob::{ClientState, StateBlob, FINISHED_VALUE};
pub use cookie::{CookieConfig, CookieRequest, CookieResponse, SameSite};
pub use error::{CodecError, ProtocolError, TransportError};
pub use protocol::{PersistenceProtocol, DEFAULT_TOKEN_NAME};
pub use response::{FinishExperimentResponse, StartExperimentResponse};
pub use transport::{MemoryTokenJar, TokenSink, TokenSource};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
