//! Identifiers and simple allocators for engine-owned entities.

use serde::{Deserialize, Serialize};

/// Host element handle. Hosts number their own elements; spacer nodes created
/// by the pin controller are allocated from [`SPACER_ID_BASE`] upwards.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TimelineId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct LoopId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SubscriptionId(pub u32);

/// First node id handed out for spacer elements. Host ids must stay below it.
pub const SPACER_ID_BASE: u32 = 0x8000_0000;

impl NodeId {
    #[inline]
    pub fn is_spacer(self) -> bool {
        self.0 >= SPACER_ID_BASE
    }
}

/// Monotonic allocator for every engine-issued handle.
/// Handles are never reused, so a stale handle can't alias a fresh resource.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_timeline: u32,
    next_loop: u32,
    next_scope: u32,
    next_spacer: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_timeline(&mut self) -> TimelineId {
        let id = TimelineId(self.next_timeline);
        self.next_timeline = self.next_timeline.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_loop(&mut self) -> LoopId {
        let id = LoopId(self.next_loop);
        self.next_loop = self.next_loop.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_scope(&mut self) -> ScopeId {
        let id = ScopeId(self.next_scope);
        self.next_scope = self.next_scope.wrapping_add(1);
        id
    }

    /// Whether `id` was handed out by this allocator.
    #[inline]
    pub fn issued_timeline(&self, id: TimelineId) -> bool {
        id.0 < self.next_timeline
    }

    #[inline]
    pub fn alloc_spacer(&mut self) -> NodeId {
        let id = NodeId(SPACER_ID_BASE.wrapping_add(self.next_spacer));
        self.next_spacer = (self.next_spacer + 1) % SPACER_ID_BASE;
        id
    }
}
