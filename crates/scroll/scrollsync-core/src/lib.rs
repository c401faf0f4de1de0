//! Scrollsync core (host-agnostic)
//!
//! Maps a continuous scroll position and viewport state to interpolated
//! style writes. The engine reads geometry through [`LayoutSource`] and
//! returns [`StyleBatch`]es for the host to apply; it never touches a
//! document itself.
//!
//! Lifetimes are explicit: every timeline, loop, listener and style write
//! belongs to a [`ScopeId`] and is released when that scope is disposed.

pub mod breakpoint;
pub mod config;
pub mod ease;
pub mod engine;
pub mod error;
pub mod host;
pub mod ids;
pub mod interp;
pub mod loops;
pub mod outputs;
pub mod pin;
pub mod scope;
pub mod scroll;
pub mod timeline;
pub mod value;
pub mod view;

// Re-exports for consumers (adapters)
pub use breakpoint::{Breakpoint, BreakpointResolver, BreakpointState};
pub use config::{Config, FrameSource};
pub use ease::Ease;
pub use engine::{Engine, EngineStats, FrameInput, Remount};
pub use error::{MeasurementErrorKind, Result, ScrollSyncError};
pub use host::{
    ContentProvider, DetachedLayout, LayoutSource, MemoryDocument, Rect, StaticContent, Viewport,
};
pub use ids::{LoopId, NodeId, ScopeId, SubscriptionId, TimelineId};
pub use interp::{sample_track, StyleStore};
pub use loops::{LoopAxis, LoopConfig, LoopDirection, LoopOptions, LoopState};
pub use outputs::{Event, FrameOutput, StyleBatch, StyleOp};
pub use scope::{Disposable, Liveness};
pub use scroll::ScrollSample;
pub use timeline::{
    Distance, Edge, EndSpec, Keyframe, Playback, TimelineConfig, TimelineState, TriggerPoint,
};
pub use value::{Measure, MeasuredUnit, StyleValue, ValueSpec};
pub use view::{VariantConfig, ViewDefinition};
