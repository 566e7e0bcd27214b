//! Outcomes of start and finish transitions

use serde::Serialize;

/// Result of starting an experiment for a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartExperimentResponse {
    /// Alternative the client is in
    pub alternative: String,
    /// Always true on success
    pub did_start: bool,
    /// True only on the call that assigned the alternative
    pub did_start_first_time: bool,
}

impl StartExperimentResponse {
    /// Freshly assigned
    #[inline]
    pub fn first_time(alternative: impl Into<String>) -> Self {
        Self {
            alternative: alternative.into(),
            did_start: true,
            did_start_first_time: true,
        }
    }

    /// Recalled from existing state
    #[inline]
    pub fn resumed(alternative: impl Into<String>) -> Self {
        Self {
            alternative: alternative.into(),
            did_start: true,
            did_start_first_time: false,
        }
    }
}

/// Result of finishing an experiment for a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinishExperimentResponse {
    /// Stored alternative, or the first declared one if none is stored
    pub alternative: String,
    /// Whether the client has a finished assignment after this call
    pub did_finish: bool,
    /// True only on the call that recorded the finish
    pub did_finish_first_time: bool,
}

impl FinishExperimentResponse {
    /// Nothing assigned; nothing recorded
    #[inline]
    pub fn not_started(first_alternative: impl Into<String>) -> Self {
        Self {
            alternative: first_alternative.into(),
            did_finish: false,
            did_finish_first_time: false,
        }
    }

    /// Finish recorded by this call
    #[inline]
    pub fn first_time(alternative: impl Into<String>) -> Self {
        Self {
            alternative: alternative.into(),
            did_finish: true,
            did_finish_first_time: true,
        }
    }

    /// Finish recorded by an earlier call
    #[inline]
    pub fn already_finished(alternative: impl Into<String>) -> Self {
        Self {
            alternative: alternative.into(),
            did_finish: true,
            did_finish_first_time: false,
        }
    }
}
