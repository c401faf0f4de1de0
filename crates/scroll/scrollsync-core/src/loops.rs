//! Loop controller: constant-velocity marquee translations driven by wall-clock time.

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrollSyncError};
use crate::ids::{LoopId, NodeId, ScopeId};
use crate::interp::{Owner, StyleStore};
use crate::value::StyleValue;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopDirection {
    /// 0% towards -distance.
    #[default]
    Forward,
    /// -distance towards 0%.
    Reverse,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopAxis {
    #[default]
    X,
    Y,
}

fn default_distance() -> f32 {
    50.0
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoopOptions {
    #[serde(default)]
    pub direction: LoopDirection,
    #[serde(default)]
    pub axis: LoopAxis,
    /// Travel per period as a percentage of the target's own size.
    /// 50 suits content duplicated once.
    #[serde(default = "default_distance")]
    pub distance_percent: f32,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            direction: LoopDirection::Forward,
            axis: LoopAxis::X,
            distance_percent: default_distance(),
        }
    }
}

impl LoopOptions {
    pub fn reverse(mut self) -> Self {
        self.direction = LoopDirection::Reverse;
        self
    }

    pub fn vertical(mut self) -> Self {
        self.axis = LoopAxis::Y;
        self
    }

    fn channel(&self) -> &'static str {
        match self.axis {
            LoopAxis::X => "xPercent",
            LoopAxis::Y => "yPercent",
        }
    }
}

/// Loop declared inside a view definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    pub target: NodeId,
    pub period_s: f32,
    #[serde(flatten)]
    pub options: LoopOptions,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoopState {
    /// Seconds into the current period, always in `[0, period)`.
    pub phase: f32,
    pub period: f32,
    pub paused: bool,
}

impl LoopState {
    fn advance(&mut self, dt: f32) {
        if self.paused || !(dt > 0.0) {
            return;
        }
        let mut phase = (self.phase + dt).rem_euclid(self.period);
        // rem_euclid can round up to exactly `period` for tiny negative remainders
        if phase >= self.period {
            phase = 0.0;
        }
        self.phase = phase;
    }

    #[inline]
    pub fn fraction(&self) -> f32 {
        self.phase / self.period
    }
}

/// Percentage translation for `state` under `options`.
pub fn loop_offset(state: &LoopState, options: &LoopOptions) -> f32 {
    let f = state.fraction();
    let d = options.distance_percent;
    match options.direction {
        LoopDirection::Forward => -d * f,
        LoopDirection::Reverse => -d * (1.0 - f),
    }
}

#[derive(Clone, Debug)]
struct LoopEntry {
    scope: ScopeId,
    target: NodeId,
    options: LoopOptions,
    state: LoopState,
}

#[derive(Debug, Default)]
pub struct LoopController {
    loops: IndexMap<LoopId, LoopEntry>,
}

impl LoopController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loop at phase 0.
    pub fn start(&mut self, id: LoopId, scope: ScopeId, config: &LoopConfig) -> Result<()> {
        if !config.period_s.is_finite() || config.period_s <= 0.0 {
            return Err(ScrollSyncError::InvalidLoop(format!(
                "period must be positive, got {}",
                config.period_s
            )));
        }
        if !config.options.distance_percent.is_finite() {
            return Err(ScrollSyncError::InvalidLoop(
                "distance_percent must be finite".into(),
            ));
        }
        self.loops.insert(
            id,
            LoopEntry {
                scope,
                target: config.target,
                options: config.options,
                state: LoopState {
                    phase: 0.0,
                    period: config.period_s,
                    paused: false,
                },
            },
        );
        debug!("loop {:?} started on {:?}", id, config.target);
        Ok(())
    }

    pub fn pause(&mut self, id: LoopId) -> Result<()> {
        self.entry_mut(id)?.state.paused = true;
        Ok(())
    }

    pub fn resume(&mut self, id: LoopId) -> Result<()> {
        self.entry_mut(id)?.state.paused = false;
        Ok(())
    }

    /// Remove the loop and release its channel.
    pub fn stop(&mut self, id: LoopId, store: &mut StyleStore) -> Result<()> {
        self.loops
            .shift_remove(&id)
            .ok_or(ScrollSyncError::UnknownLoop(id))?;
        store.release_owner(Owner::Loop(id));
        debug!("loop {:?} stopped", id);
        Ok(())
    }

    pub fn state(&self, id: LoopId) -> Option<LoopState> {
        self.loops.get(&id).map(|e| e.state)
    }

    pub fn scope_of(&self, id: LoopId) -> Option<ScopeId> {
        self.loops.get(&id).map(|e| e.scope)
    }

    pub fn contains(&self, id: LoopId) -> bool {
        self.loops.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Advance every running loop by `dt` seconds and write its translation.
    pub fn tick(&mut self, dt: f32, store: &mut StyleStore) {
        for (&id, entry) in self.loops.iter_mut() {
            entry.state.advance(dt);
            let value = loop_offset(&entry.state, &entry.options);
            store.write(
                entry.target,
                Owner::Loop(id),
                entry.options.channel(),
                StyleValue::Percent(value),
            );
        }
    }

    fn entry_mut(&mut self, id: LoopId) -> Result<&mut LoopEntry> {
        self.loops.get_mut(&id).ok_or(ScrollSyncError::UnknownLoop(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::DetachedLayout;
    use crate::outputs::StyleBatch;

    fn marquee(period_s: f32) -> LoopConfig {
        LoopConfig {
            target: NodeId(20),
            period_s,
            options: LoopOptions::default(),
        }
    }

    #[test]
    fn phase_wraps_within_period() {
        let mut c = LoopController::new();
        let mut store = StyleStore::new();
        c.start(LoopId(0), ScopeId(0), &marquee(2.0)).unwrap();
        for _ in 0..5 {
            c.tick(0.5, &mut store);
        }
        let s = c.state(LoopId(0)).unwrap();
        assert!((s.phase - 0.5).abs() < 1e-5);
        assert!(s.phase < s.period);
    }

    #[test]
    fn pause_preserves_phase() {
        let mut c = LoopController::new();
        let mut store = StyleStore::new();
        c.start(LoopId(0), ScopeId(0), &marquee(4.0)).unwrap();
        c.tick(1.0, &mut store);
        c.pause(LoopId(0)).unwrap();
        c.tick(10.0, &mut store);
        assert_eq!(c.state(LoopId(0)).unwrap().phase, 1.0);
        c.resume(LoopId(0)).unwrap();
        c.tick(0.5, &mut store);
        assert!((c.state(LoopId(0)).unwrap().phase - 1.5).abs() < 1e-6);
    }

    #[test]
    fn directions_map_to_translation() {
        let forward = LoopOptions::default();
        let reverse = LoopOptions::default().reverse();
        let quarter = LoopState {
            phase: 1.0,
            period: 4.0,
            paused: false,
        };
        assert_eq!(loop_offset(&quarter, &forward), -12.5);
        assert_eq!(loop_offset(&quarter, &reverse), -37.5);
    }

    #[test]
    fn rejects_non_positive_period() {
        let mut c = LoopController::new();
        assert!(matches!(
            c.start(LoopId(0), ScopeId(0), &marquee(0.0)),
            Err(ScrollSyncError::InvalidLoop(_))
        ));
        assert!(c.start(LoopId(0), ScopeId(0), &marquee(f32::NAN)).is_err());
    }

    #[test]
    fn stop_releases_channel() {
        let mut c = LoopController::new();
        let mut store = StyleStore::new();
        let mut batch = StyleBatch::new();
        c.start(LoopId(3), ScopeId(0), &marquee(2.0)).unwrap();
        c.tick(0.5, &mut store);
        store.flush(&DetachedLayout, &mut batch);
        assert_eq!(
            store.applied(NodeId(20)).unwrap()["transform"],
            "translate(-12.5%, 0%)"
        );
        c.stop(LoopId(3), &mut store).unwrap();
        store.flush(&DetachedLayout, &mut batch);
        assert!(store.is_empty());
        assert!(matches!(
            c.stop(LoopId(3), &mut store),
            Err(ScrollSyncError::UnknownLoop(_))
        ));
    }

    #[test]
    fn options_default_from_json() {
        let cfg: LoopConfig =
            serde_json::from_str(r#"{"target": 21, "period_s": 30, "direction": "reverse", "axis": "y"}"#)
                .unwrap();
        assert_eq!(cfg.options.distance_percent, 50.0);
        assert_eq!(cfg.options.direction, LoopDirection::Reverse);
        assert_eq!(cfg.options.axis, LoopAxis::Y);
    }
}
