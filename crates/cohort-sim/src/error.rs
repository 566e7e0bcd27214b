//! Simulator error types

use cohort_core::ManagerError;
use cohort_persistence::{CodecError, TransportError};

/// Simulator and inspector errors
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Manager call failed
    #[error(transparent)]
    Manager(#[from] ManagerError),

    /// Token could not be unescaped
    #[error("cannot unescape token: {0}")]
    Transport(#[from] TransportError),

    /// Token is not a state blob
    #[error("cannot decode token: {0}")]
    Codec(#[from] CodecError),

    /// Finish rate outside `[0, 1]`
    #[error("finish rate must be within 0..=1, got {0}")]
    InvalidFinishRate(f64),
}
