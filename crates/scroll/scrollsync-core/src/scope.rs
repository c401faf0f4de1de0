//! Scope manager: per-view lifetime boundaries.
//!
//! Every resource built for a mounted view is registered with that view's
//! scope as a [`Disposable`]. The engine drains them in reverse order on
//! disposal. Scope ids are issued in increasing order, so an id below the
//! high-water mark that is no longer live has been retired and disposing it
//! again is a no-op.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrollSyncError};
use crate::ids::{LoopId, NodeId, ScopeId, SubscriptionId, TimelineId};

/// Which half of a view a resource belongs to. Breakpoint switches only
/// dispose the `Variant` half.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Shared,
    Variant,
}

pub enum Disposable {
    Timeline(TimelineId),
    Loop(LoopId),
    ScrollSubscription(SubscriptionId),
    BreakpointListener(SubscriptionId),
    /// Arbitrary host teardown, run once.
    Callback(Box<dyn FnOnce()>),
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposable::Timeline(id) => f.debug_tuple("Timeline").field(id).finish(),
            Disposable::Loop(id) => f.debug_tuple("Loop").field(id).finish(),
            Disposable::ScrollSubscription(id) => {
                f.debug_tuple("ScrollSubscription").field(id).finish()
            }
            Disposable::BreakpointListener(id) => {
                f.debug_tuple("BreakpointListener").field(id).finish()
            }
            Disposable::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Shared flag a host callback checks before touching the document.
/// Cleared synchronously when the owning scope is disposed.
#[derive(Clone, Debug)]
pub struct Liveness(Rc<Cell<bool>>);

impl Liveness {
    fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.0.get()
    }

    fn revoke(&self) {
        self.0.set(false);
    }
}

#[derive(Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub root: NodeId,
    entries: Vec<(Part, Disposable)>,
    liveness: Liveness,
}

impl Scope {
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ScopeManager {
    scopes: IndexMap<ScopeId, Scope>,
    /// One past the highest id ever created.
    issued: u32,
}

impl ScopeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, id: ScopeId, root: NodeId) -> &mut Scope {
        self.issued = self.issued.max(id.0.saturating_add(1));
        self.scopes.entry(id).or_insert_with(|| Scope {
            id,
            root,
            entries: Vec::new(),
            liveness: Liveness::new(),
        })
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(&id)
    }

    pub fn is_live(&self, id: ScopeId) -> bool {
        self.scopes.contains_key(&id)
    }

    pub fn is_retired(&self, id: ScopeId) -> bool {
        id.0 < self.issued && !self.scopes.contains_key(&id)
    }

    pub fn live_scope_for_root(&self, root: NodeId) -> Option<ScopeId> {
        self.scopes.values().find(|s| s.root == root).map(|s| s.id)
    }

    pub fn live_ids(&self) -> Vec<ScopeId> {
        self.scopes.keys().copied().collect()
    }

    pub fn live_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn add(&mut self, id: ScopeId, part: Part, disposable: Disposable) -> Result<()> {
        if let Some(scope) = self.scopes.get_mut(&id) {
            scope.entries.push((part, disposable));
            return Ok(());
        }
        if self.is_retired(id) {
            Err(ScrollSyncError::ScopeDisposed(id))
        } else {
            Err(ScrollSyncError::UnknownScope(id))
        }
    }

    /// Remove one registration without running it (resource already gone).
    pub fn forget(&mut self, id: ScopeId, pred: impl Fn(&Disposable) -> bool) {
        if let Some(scope) = self.scopes.get_mut(&id) {
            scope.entries.retain(|(_, d)| !pred(d));
        }
    }

    /// Drain registrations of `part` (or all) newest first.
    pub fn take_part(&mut self, id: ScopeId, part: Option<Part>) -> Vec<Disposable> {
        let Some(scope) = self.scopes.get_mut(&id) else {
            return Vec::new();
        };
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(scope.entries.len());
        for (p, d) in scope.entries.drain(..) {
            if part.map_or(true, |want| want == p) {
                taken.push(d);
            } else {
                kept.push((p, d));
            }
        }
        scope.entries = kept;
        taken.reverse();
        taken
    }

    /// Retire the scope: revoke liveness and hand back every registration
    /// newest first. `None` when it was already retired or never existed.
    pub fn retire(&mut self, id: ScopeId) -> Option<Vec<Disposable>> {
        let scope = self.scopes.shift_remove(&id)?;
        scope.liveness.revoke();
        let mut out: Vec<Disposable> = scope.entries.into_iter().map(|(_, d)| d).collect();
        out.reverse();
        Some(out)
    }
}
