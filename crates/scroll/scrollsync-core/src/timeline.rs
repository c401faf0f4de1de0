//! Timeline registry: scroll-range definitions and progress computation.
//!
//! A timeline binds an ordered keyframe list to a scroll range derived from
//! its trigger element's document position. Ranges and measured keyframe
//! values are recomputed whenever the layout generation moves.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ease::Ease;
use crate::error::{MeasurementErrorKind, Result, ScrollSyncError};
use crate::host::{Rect, Viewport};
use crate::ids::{NodeId, ScopeId, TimelineId};
use crate::value::{MeasureContext, StyleValue, ValueSpec};

const LAG_SETTLE_RATE: f32 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Top,
    Center,
    Bottom,
}

impl Edge {
    #[inline]
    fn along(self, extent: f32) -> f32 {
        match self {
            Edge::Top => 0.0,
            Edge::Center => extent * 0.5,
            Edge::Bottom => extent,
        }
    }
}

/// "When `element` edge of the trigger meets `viewport` edge of the screen."
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerPoint {
    pub element: Edge,
    #[serde(default)]
    pub element_offset: f32,
    pub viewport: Edge,
    #[serde(default)]
    pub viewport_offset: f32,
}

impl TriggerPoint {
    pub const fn new(element: Edge, viewport: Edge) -> Self {
        Self {
            element,
            element_offset: 0.0,
            viewport,
            viewport_offset: 0.0,
        }
    }

    /// Scroll offset at which the two edges coincide.
    pub fn resolve(&self, rect: &Rect, viewport: Viewport) -> f32 {
        rect.top + self.element.along(rect.height) + self.element_offset
            - self.viewport.along(viewport.height)
            - self.viewport_offset
    }
}

/// Range length measured from the start offset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distance {
    Px(f32),
    ViewportHeights(f32),
    /// Content width minus viewport width: the horizontal rail distance.
    HorizontalOverflow(NodeId),
}

impl Distance {
    fn resolve(&self, ctx: &MeasureContext<'_>) -> Result<f32> {
        match *self {
            Distance::Px(px) => Ok(px),
            Distance::ViewportHeights(k) => Ok(k * ctx.viewport.height),
            Distance::HorizontalOverflow(node) => {
                ctx.measure(crate::value::Measure::HorizontalOverflow(node))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndSpec {
    At(TriggerPoint),
    Distance(Distance),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Position in [0,1] along the timeline.
    pub progress: f32,
    pub properties: IndexMap<String, ValueSpec>,
    /// Easing of the segment that ends at this keyframe. Falls back to the timeline ease.
    #[serde(default)]
    pub ease: Option<Ease>,
}

impl Keyframe {
    pub fn new(progress: f32) -> Self {
        Self {
            progress,
            properties: IndexMap::new(),
            ease: None,
        }
    }

    pub fn with(mut self, property: &str, value: impl Into<ValueSpec>) -> Self {
        self.properties.insert(property.to_string(), value.into());
        self
    }

    pub fn eased(mut self, ease: Ease) -> Self {
        self.ease = Some(ease);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Playback {
    /// Progress is the scroll position within the range.
    #[default]
    Scrub,
    /// Progress chases the scroll position with exponential lag.
    SmoothedScrub { lag_s: f32 },
    /// Entering the range plays a wall-clock tween; `reverse` plays it back
    /// when scrolling returns above the start.
    Triggered {
        duration_s: f32,
        #[serde(default)]
        reverse: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineConfig {
    pub trigger: NodeId,
    /// Animated nodes; empty means the trigger itself.
    #[serde(default)]
    pub targets: Vec<NodeId>,
    pub start: TriggerPoint,
    pub end: EndSpec,
    pub keyframes: Vec<Keyframe>,
    #[serde(default)]
    pub ease: Ease,
    #[serde(default)]
    pub playback: Playback,
    #[serde(default)]
    pub pin: bool,
    /// Node frozen while pinned; defaults to the trigger.
    #[serde(default)]
    pub pin_target: Option<NodeId>,
    /// Fraction of the range between consecutive targets' starts.
    #[serde(default)]
    pub stagger: f32,
}

impl TimelineConfig {
    pub fn new(trigger: NodeId, start: TriggerPoint, end: EndSpec) -> Self {
        Self {
            trigger,
            targets: Vec::new(),
            start,
            end,
            keyframes: Vec::new(),
            ease: Ease::Linear,
            playback: Playback::Scrub,
            pin: false,
            pin_target: None,
            stagger: 0.0,
        }
    }

    pub fn keyframe(mut self, kf: Keyframe) -> Self {
        self.keyframes.push(kf);
        self
    }

    pub fn targets(mut self, targets: Vec<NodeId>) -> Self {
        self.targets = targets;
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pin = true;
        self
    }

    pub fn with_pin_target(mut self, node: NodeId) -> Self {
        self.pin = true;
        self.pin_target = Some(node);
        self
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn with_playback(mut self, playback: Playback) -> Self {
        self.playback = playback;
        self
    }

    pub fn with_stagger(mut self, stagger: f32) -> Self {
        self.stagger = stagger;
        self
    }

    pub fn target_nodes(&self) -> Vec<NodeId> {
        if self.targets.is_empty() {
            vec![self.trigger]
        } else {
            self.targets.clone()
        }
    }

    pub fn pin_node(&self) -> NodeId {
        self.pin_target.unwrap_or(self.trigger)
    }

    pub fn validate(&self) -> Result<()> {
        if self.keyframes.is_empty() {
            return Err(ScrollSyncError::InvalidKeyframes(
                "a timeline needs at least one keyframe".into(),
            ));
        }
        let mut last = f32::NEG_INFINITY;
        for kf in &self.keyframes {
            if !kf.progress.is_finite() || !(0.0..=1.0).contains(&kf.progress) {
                return Err(ScrollSyncError::InvalidKeyframes(format!(
                    "keyframe progress {} is outside [0,1]",
                    kf.progress
                )));
            }
            if kf.progress < last {
                return Err(ScrollSyncError::InvalidKeyframes(
                    "keyframe progress must be non-decreasing".into(),
                ));
            }
            last = kf.progress;
        }
        let n = self.target_nodes().len();
        if !self.stagger.is_finite()
            || self.stagger < 0.0
            || (n > 1 && self.stagger * (n - 1) as f32 >= 1.0)
        {
            return Err(ScrollSyncError::InvalidKeyframes(format!(
                "stagger {} leaves no room for {} targets",
                self.stagger, n
            )));
        }
        match self.playback {
            Playback::SmoothedScrub { lag_s } if !lag_s.is_finite() || lag_s < 0.0 => Err(
                ScrollSyncError::InvalidKeyframes("lag_s must be finite and >= 0".into()),
            ),
            Playback::Triggered { duration_s, .. } if !duration_s.is_finite() || duration_s < 0.0 => {
                Err(ScrollSyncError::InvalidKeyframes(
                    "duration_s must be finite and >= 0".into(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Lifecycle: `Created -> Active -> Disposed`. `Suspended` is an active
/// timeline parked by a measurement failure until the next re-measure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum TimelineState {
    Created,
    Active,
    Suspended(MeasurementErrorKind),
    Disposed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedPoint {
    pub progress: f32,
    pub value: StyleValue,
    pub ease: Ease,
}

/// One property's keyframes with measurements substituted.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTrack {
    pub property: String,
    pub points: Vec<ResolvedPoint>,
}

/// Split keyframes into per-property tracks, in first-appearance order.
pub fn resolve_tracks(config: &TimelineConfig, ctx: &MeasureContext<'_>) -> Result<Vec<ResolvedTrack>> {
    let mut tracks: IndexMap<String, Vec<ResolvedPoint>> = IndexMap::new();
    for kf in &config.keyframes {
        let ease = kf.ease.unwrap_or(config.ease);
        for (prop, spec) in &kf.properties {
            let value = spec.resolve(ctx)?;
            tracks.entry(prop.clone()).or_default().push(ResolvedPoint {
                progress: kf.progress,
                value,
                ease,
            });
        }
    }
    Ok(tracks
        .into_iter()
        .map(|(property, points)| ResolvedTrack { property, points })
        .collect())
}

/// Saturating position of `offset` within `[start, end]`. Empty or inverted
/// ranges are complete as soon as they exist.
#[inline]
pub fn progress_for(offset: f32, start: f32, end: f32) -> f32 {
    if !offset.is_finite() {
        return 0.0;
    }
    let span = end - start;
    if !(span > 0.0) {
        return 1.0;
    }
    ((offset - start) / span).clamp(0.0, 1.0)
}

/// Local progress of target `index` out of `count` when starts are spread by `stagger`.
#[inline]
pub fn stagger_progress(p: f32, index: usize, count: usize, stagger: f32) -> f32 {
    if count <= 1 || stagger <= 0.0 {
        return p;
    }
    let window = 1.0 - stagger * (count - 1) as f32;
    if window <= 0.0 {
        return p;
    }
    ((p - stagger * index as f32) / window).clamp(0.0, 1.0)
}

#[derive(Clone, Copy, Debug, Default)]
struct Playhead {
    value: f32,
    target: f32,
    primed: bool,
}

#[derive(Clone, Debug)]
pub struct Timeline {
    pub id: TimelineId,
    pub scope: ScopeId,
    pub config: TimelineConfig,
    /// Belongs to the breakpoint-specific part of its view.
    pub variant: bool,
    state: TimelineState,
    start_offset: f32,
    end_offset: f32,
    tracks: Vec<ResolvedTrack>,
    raw_progress: f32,
    progress: f32,
    generation: Option<u64>,
    playhead: Playhead,
}

impl Timeline {
    pub(crate) fn new(id: TimelineId, scope: ScopeId, config: TimelineConfig, variant: bool) -> Self {
        Self {
            id,
            scope,
            config,
            variant,
            state: TimelineState::Created,
            start_offset: 0.0,
            end_offset: 0.0,
            tracks: Vec::new(),
            raw_progress: 0.0,
            progress: 0.0,
            generation: None,
            playhead: Playhead::default(),
        }
    }

    pub fn state(&self) -> TimelineState {
        self.state
    }

    pub fn start_offset(&self) -> f32 {
        self.start_offset
    }

    pub fn end_offset(&self) -> f32 {
        self.end_offset
    }

    /// Scroll-bound progress before playback shaping.
    pub fn raw_progress(&self) -> f32 {
        self.raw_progress
    }

    /// Progress the interpolator samples at.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn pinned(&self) -> bool {
        self.config.pin
    }

    pub fn scrubbed(&self) -> bool {
        !matches!(self.config.playback, Playback::Triggered { .. })
    }

    pub fn tracks(&self) -> &[ResolvedTrack] {
        &self.tracks
    }

    /// Layout generation of the last measurement attempt.
    pub fn generation(&self) -> Option<u64> {
        self.generation
    }

    pub(crate) fn set_state(&mut self, state: TimelineState) {
        if self.state != TimelineState::Disposed {
            self.state = state;
        }
    }

    /// Recompute range and tracks. The generation is recorded even on failure
    /// so a broken trigger is not retried until layout changes again.
    pub(crate) fn measure(&mut self, ctx: &MeasureContext<'_>, generation: u64) -> Result<()> {
        self.generation = Some(generation);
        let trigger = self.config.trigger;
        let rect = ctx.layout.rect(trigger).ok_or(ScrollSyncError::Measurement {
            node: trigger,
            kind: MeasurementErrorKind::Missing,
        })?;
        if rect.is_empty() {
            return Err(ScrollSyncError::Measurement {
                node: trigger,
                kind: MeasurementErrorKind::ZeroSized,
            });
        }
        for node in self.config.target_nodes() {
            if !ctx.layout.is_connected(node) {
                return Err(ScrollSyncError::Measurement {
                    node,
                    kind: MeasurementErrorKind::Missing,
                });
            }
        }
        let start = self.config.start.resolve(&rect, ctx.viewport);
        let end = match self.config.end {
            EndSpec::At(point) => point.resolve(&rect, ctx.viewport),
            EndSpec::Distance(d) => start + d.resolve(ctx)?,
        };
        let tracks = resolve_tracks(&self.config, ctx)?;
        self.start_offset = start;
        self.end_offset = end;
        self.tracks = tracks;
        Ok(())
    }

    /// Feed a scroll offset and frame step; returns the progress to sample at.
    pub(crate) fn advance(&mut self, offset: f32, dt: f32) -> f32 {
        let raw = progress_for(offset, self.start_offset, self.end_offset);
        self.raw_progress = raw;
        let ph = &mut self.playhead;
        let p = match self.config.playback {
            Playback::Scrub => raw,
            Playback::SmoothedScrub { lag_s } => {
                if !ph.primed || lag_s <= 0.0 {
                    ph.value = raw;
                } else {
                    let alpha = 1.0 - (-dt * LAG_SETTLE_RATE / lag_s).exp();
                    ph.value += (raw - ph.value) * alpha;
                    if (raw - ph.value).abs() < 1e-4 {
                        ph.value = raw;
                    }
                }
                ph.value
            }
            Playback::Triggered {
                duration_s,
                reverse,
            } => {
                if raw > 0.0 {
                    ph.target = 1.0;
                } else if reverse {
                    ph.target = 0.0;
                }
                if duration_s <= 0.0 {
                    ph.value = ph.target;
                } else {
                    let step = dt / duration_s;
                    if ph.value < ph.target {
                        ph.value = (ph.value + step).min(ph.target);
                    } else if ph.value > ph.target {
                        ph.value = (ph.value - step).max(ph.target);
                    }
                }
                ph.value
            }
        };
        ph.primed = true;
        self.progress = p;
        p
    }
}

/// Timelines in registration order. Order is write order for shared targets.
#[derive(Debug, Default)]
pub struct TimelineRegistry {
    timelines: Vec<Timeline>,
}

impl TimelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, timeline: Timeline) {
        self.timelines.push(timeline);
    }

    pub fn get(&self, id: TimelineId) -> Option<&Timeline> {
        self.timelines.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: TimelineId) -> Option<&mut Timeline> {
        self.timelines.iter_mut().find(|t| t.id == id)
    }

    pub fn remove(&mut self, id: TimelineId) -> Option<Timeline> {
        let idx = self.timelines.iter().position(|t| t.id == id)?;
        Some(self.timelines.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timeline> {
        self.timelines.iter()
    }

    pub fn ids(&self) -> Vec<TimelineId> {
        self.timelines.iter().map(|t| t.id).collect()
    }

    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.timelines
            .iter()
            .filter(|t| t.state == TimelineState::Active)
            .count()
    }
}
