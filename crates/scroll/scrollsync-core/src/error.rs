//! Error types for scrollsync-core.
//!
//! Only construction-time and handle-lookup failures surface as `Err`. Faults
//! discovered while running frames (missing triggers, stale pin rectangles)
//! are recovered in place and reported as [`crate::outputs::Event`]s.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{LoopId, NodeId, ScopeId, SubscriptionId, TimelineId};

/// Why a node could not be measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementErrorKind {
    /// Not attached to the document.
    Missing,
    /// Attached but without a box.
    ZeroSized,
}

impl fmt::Display for MeasurementErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementErrorKind::Missing => f.write_str("missing from document"),
            MeasurementErrorKind::ZeroSized => f.write_str("zero-sized"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScrollSyncError {
    #[error("unknown timeline {0:?}")]
    UnknownTimeline(TimelineId),
    #[error("unknown loop {0:?}")]
    UnknownLoop(LoopId),
    #[error("unknown scope {0:?}")]
    UnknownScope(ScopeId),
    #[error("unknown subscription {0:?}")]
    UnknownSubscription(SubscriptionId),
    #[error("scope {0:?} is already disposed")]
    ScopeDisposed(ScopeId),
    #[error("invalid keyframes: {0}")]
    InvalidKeyframes(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid loop: {0}")]
    InvalidLoop(String),
    #[error("measurement failed for node {node:?}: {kind}")]
    Measurement {
        node: NodeId,
        kind: MeasurementErrorKind,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScrollSyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measurement_error_message_names_node_and_kind() {
        let err = ScrollSyncError::Measurement {
            node: NodeId(7),
            kind: MeasurementErrorKind::ZeroSized,
        };
        let msg = err.to_string();
        assert!(msg.contains("NodeId(7)"));
        assert!(msg.contains("zero-sized"));
    }

    #[test]
    fn json_errors_convert() {
        let parse: std::result::Result<u32, serde_json::Error> = serde_json::from_str("nope");
        let err: ScrollSyncError = parse.unwrap_err().into();
        assert!(matches!(err, ScrollSyncError::Json(_)));
    }
}
