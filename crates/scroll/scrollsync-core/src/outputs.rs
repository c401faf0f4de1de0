//! Output contracts from the core engine.
//!
//! A frame produces a [`StyleBatch`] (inline-style and spacer mutations the
//! host applies to its document, in order) plus a list of semantic events.

use serde::{Deserialize, Serialize};

use crate::error::MeasurementErrorKind;
use crate::ids::{LoopId, NodeId, ScopeId, TimelineId};
use crate::scroll::ScrollSample;

/// One document mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StyleOp {
    /// Set an inline declaration.
    Set {
        node: NodeId,
        prop: String,
        value: String,
    },
    /// Remove an inline declaration the engine introduced.
    Clear { node: NodeId, prop: String },
    /// Put back an inline declaration that existed before the engine wrote it.
    Restore {
        node: NodeId,
        prop: String,
        value: String,
    },
    /// Create an empty block of the given size immediately before `before`.
    InsertSpacer {
        spacer: NodeId,
        before: NodeId,
        width: f32,
        height: f32,
    },
    /// Remove a node the engine created.
    RemoveNode { node: NodeId },
}

/// Ordered batch of mutations. Hosts apply it front to back.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleBatch(pub Vec<StyleOp>);

impl StyleBatch {
    pub fn new() -> Self {
        StyleBatch(Vec::new())
    }

    #[inline]
    pub fn push(&mut self, op: StyleOp) {
        self.0.push(op);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = StyleOp>) {
        self.0.extend(other);
    }

    pub fn append(&mut self, mut other: StyleBatch) {
        self.0.append(&mut other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyleOp> {
        self.0.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn into_vec(self) -> Vec<StyleOp> {
        self.0
    }

    /// Move every op out, leaving the batch empty.
    pub fn take(&mut self) -> StyleBatch {
        StyleBatch(std::mem::take(&mut self.0))
    }
}

/// Discrete lifecycle signals emitted while stepping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Event {
    TimelineCreated {
        timeline: TimelineId,
        scope: ScopeId,
    },
    TimelineActivated {
        timeline: TimelineId,
    },
    /// Measurement failed; the timeline stays static until the next re-measure.
    TimelineSuspended {
        timeline: TimelineId,
        node: NodeId,
        reason: MeasurementErrorKind,
    },
    TimelineDisposed {
        timeline: TimelineId,
    },
    Pinned {
        timeline: TimelineId,
        spacer: NodeId,
    },
    Unpinned {
        timeline: TimelineId,
    },
    /// A pin rectangle predates the current layout generation and was released.
    StaleRectangle {
        timeline: TimelineId,
        generation: u64,
    },
    LoopStarted {
        handle: LoopId,
    },
    LoopStopped {
        handle: LoopId,
    },
    BreakpointChanged {
        from: Option<String>,
        to: String,
    },
    LayoutInvalidated {
        generation: u64,
    },
    ScopeDisposed {
        scope: ScopeId,
    },
}

/// Everything one `Engine::frame` call produced.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FrameOutput {
    pub sample: ScrollSample,
    #[serde(default)]
    pub styles: StyleBatch,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl FrameOutput {
    #[inline]
    pub fn clear(&mut self) {
        self.styles.clear();
        self.events.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty() && self.events.is_empty()
    }
}
