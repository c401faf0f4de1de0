//! Breakpoint resolver: viewport width to named layout variant.
//!
//! Resizes are debounced (trailing edge); listeners fire only when the
//! classification actually changes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrollSyncError};
use crate::ids::SubscriptionId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub name: String,
    pub min_width: f32,
}

impl Breakpoint {
    pub fn new(name: &str, min_width: f32) -> Self {
        Self {
            name: name.to_string(),
            min_width,
        }
    }
}

/// Immutable classification snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreakpointState {
    pub name: String,
    pub min_width: f32,
}

pub(crate) fn validate_breakpoints(bps: &[Breakpoint]) -> Result<()> {
    if bps.is_empty() {
        return Err(ScrollSyncError::InvalidConfig(
            "at least one breakpoint is required".into(),
        ));
    }
    let mut last = f32::NEG_INFINITY;
    for bp in bps {
        if !bp.min_width.is_finite() || bp.min_width <= last {
            return Err(ScrollSyncError::InvalidConfig(format!(
                "breakpoint '{}' must have a finite min_width above the previous one",
                bp.name
            )));
        }
        if bps.iter().filter(|b| b.name == bp.name).count() > 1 {
            return Err(ScrollSyncError::InvalidConfig(format!(
                "duplicate breakpoint name '{}'",
                bp.name
            )));
        }
        last = bp.min_width;
    }
    Ok(())
}

#[derive(Clone, Copy, Debug)]
struct PendingResize {
    width: f32,
    deadline: f64,
}

type BreakpointCallback = Box<dyn FnMut(&BreakpointState)>;

pub struct BreakpointResolver {
    breakpoints: Vec<Breakpoint>,
    debounce_s: f64,
    current: Option<BreakpointState>,
    pending: Option<PendingResize>,
    next_sub: u32,
    listeners: Vec<(SubscriptionId, BreakpointCallback)>,
}

impl fmt::Debug for BreakpointResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakpointResolver")
            .field("breakpoints", &self.breakpoints)
            .field("current", &self.current)
            .field("pending", &self.pending)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl BreakpointResolver {
    pub fn new(breakpoints: Vec<Breakpoint>, debounce_ms: f32) -> Result<Self> {
        validate_breakpoints(&breakpoints)?;
        Ok(Self {
            breakpoints,
            debounce_s: f64::from(debounce_ms.max(0.0)) / 1000.0,
            current: None,
            pending: None,
            next_sub: 0,
            listeners: Vec::new(),
        })
    }

    /// Classify a width. Widths below every threshold fall into the first breakpoint.
    pub fn evaluate(&self, width: f32) -> BreakpointState {
        let bp = self
            .breakpoints
            .iter()
            .rev()
            .find(|b| width >= b.min_width)
            .unwrap_or(&self.breakpoints[0]);
        BreakpointState {
            name: bp.name.clone(),
            min_width: bp.min_width,
        }
    }

    pub fn current(&self) -> Option<&BreakpointState> {
        self.current.as_ref()
    }

    pub fn on_change(&mut self, cb: impl FnMut(&BreakpointState) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_sub);
        self.next_sub = self.next_sub.wrapping_add(1);
        self.listeners.push((id, Box::new(cb)));
        id
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Set the initial classification without notifying anyone.
    pub fn prime(&mut self, width: f32) -> BreakpointState {
        let state = self.evaluate(width);
        self.current = Some(state.clone());
        self.pending = None;
        state
    }

    /// Record a resize. Classification happens once the debounce window passes.
    pub fn resize(&mut self, width: f32, now: f64) {
        self.pending = Some(PendingResize {
            width,
            deadline: now + self.debounce_s,
        });
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    /// Settle a due resize. Returns the new state only when the classification changed.
    pub fn poll(&mut self, now: f64) -> Option<BreakpointState> {
        match self.pending {
            Some(p) if now >= p.deadline => {
                self.pending = None;
                self.classify(p.width)
            }
            _ => None,
        }
    }

    /// Settle any pending resize immediately (orientation change, tests).
    pub fn flush(&mut self) -> Option<BreakpointState> {
        let p = self.pending.take()?;
        self.classify(p.width)
    }

    fn classify(&mut self, width: f32) -> Option<BreakpointState> {
        let next = self.evaluate(width);
        if self.current.as_ref() == Some(&next) {
            return None;
        }
        log::debug!(
            "breakpoint {:?} -> {}",
            self.current.as_ref().map(|s| s.name.as_str()),
            next.name
        );
        self.current = Some(next.clone());
        for (_, cb) in self.listeners.iter_mut() {
            cb(&next);
        }
        Some(next)
    }
}
