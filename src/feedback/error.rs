use std::time::Duration;

use thiserror::Error;

/// Errors a caller of the feedback pipeline can observe.
#[derive(Debug, Error)]
pub enum FeedbackError {
    /// Request rejected before any generator ran.
    #[error("invalid feedback request: {reason}")]
    Validation { reason: String },

    /// Every persona failed, or the fan-out itself broke.
    #[error("feedback aggregation failed: {reason}")]
    Aggregation { reason: String },

    /// The feedback service could not be reached or did not answer.
    #[error("feedback service unavailable: {reason}")]
    Transport { reason: String },
}

impl FeedbackError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn aggregation(reason: impl Into<String>) -> Self {
        Self::Aggregation {
            reason: reason.into(),
        }
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_aggregation(&self) -> bool {
        matches!(self, Self::Aggregation { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// One persona's failure. Recovered inside the aggregator and only logged.
#[derive(Debug, Error)]
#[error("{role} persona failed: {kind}")]
pub struct PersonaFailure {
    pub role: &'static str,
    pub kind: PersonaFailureKind,
}

#[derive(Debug, Error)]
pub enum PersonaFailureKind {
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("returned no text")]
    EmptyResponse,
    #[error("task aborted: {0}")]
    Aborted(String),
}
