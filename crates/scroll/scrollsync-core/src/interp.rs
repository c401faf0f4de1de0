//! Layout interpolator.
//!
//! Sampling maps a progress value onto a resolved track. The [`StyleStore`]
//! collects every owner's channel writes per node, composes transform
//! channels into one declaration and flushes only what changed since the
//! last flush. Original inline values are remembered the first time a
//! property is written so release restores exactly what was there.

use indexmap::IndexMap;

use crate::host::LayoutSource;
use crate::ids::{LoopId, NodeId, TimelineId};
use crate::outputs::{StyleBatch, StyleOp};
use crate::timeline::{ResolvedPoint, ResolvedTrack};
use crate::value::{fmt_num, StyleValue};

/// Scalar lerp that is exact at both endpoints.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

#[inline]
fn lerp_vec4(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        lerp_f32(a[0], b[0], t),
        lerp_f32(a[1], b[1], t),
        lerp_f32(a[2], b[2], t),
        lerp_f32(a[3], b[3], t),
    ]
}

/// Blend two values. Keywords and mismatched units hold the left value.
pub fn blend(a: &StyleValue, b: &StyleValue, t: f32) -> StyleValue {
    if t >= 1.0 {
        return b.clone();
    }
    match (a, b) {
        (StyleValue::Color(x), StyleValue::Color(y)) => StyleValue::Color(lerp_vec4(*x, *y, t)),
        _ if a.unit() == b.unit() => match (a.scalar(), b.scalar()) {
            (Some(x), Some(y)) => a.with_scalar(lerp_f32(x, y, t)),
            _ => a.clone(),
        },
        _ => a.clone(),
    }
}

/// Segment `[i, i+1]` containing `u` and the local parameter within it.
/// Before the first stamp returns `(0, 0, 0)`; past the last `(last, last, 0)`.
fn find_segment(points: &[ResolvedPoint], u: f32) -> (usize, usize, f32) {
    let n = points.len();
    if n <= 1 || u <= points[0].progress {
        return (0, 0, 0.0);
    }
    if u >= points[n - 1].progress {
        return (n - 1, n - 1, 0.0);
    }
    for i in 0..(n - 1) {
        let t0 = points[i].progress;
        let t1 = points[i + 1].progress;
        if u >= t0 && u < t1 {
            let lt = (u - t0) / (t1 - t0);
            return (i, i + 1, lt.clamp(0.0, 1.0));
        }
    }
    (n - 1, n - 1, 0.0)
}

/// Value of `track` at progress `u`. The arriving keyframe's ease shapes the segment.
pub fn sample_track(track: &ResolvedTrack, u: f32) -> Option<StyleValue> {
    let points = &track.points;
    match points.len() {
        0 => None,
        1 => Some(points[0].value.clone()),
        _ => {
            let u = if u.is_finite() { u.clamp(0.0, 1.0) } else { 0.0 };
            let (i0, i1, lt) = find_segment(points, u);
            if i0 == i1 {
                return Some(points[i0].value.clone());
            }
            let right = &points[i1];
            let eased = right.ease.apply(lt);
            Some(blend(&points[i0].value, &right.value, eased))
        }
    }
}

/// Who wrote a channel. Pin geometry sits below animation so a pinned
/// element can still grow or move through its timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {
    Timeline(TimelineId),
    Loop(LoopId),
    Pin(TimelineId),
}

impl Owner {
    #[inline]
    fn layer(self) -> u8 {
        match self {
            Owner::Pin(_) => 0,
            Owner::Timeline(_) | Owner::Loop(_) => 1,
        }
    }
}

const TRANSFORM_CHANNELS: [&str; 8] = [
    "x", "y", "xPercent", "yPercent", "rotate", "scale", "scaleX", "scaleY",
];

#[inline]
pub fn is_transform_channel(name: &str) -> bool {
    TRANSFORM_CHANNELS.contains(&name)
}

/// `backgroundColor` -> `background-color`. Already-kebab names pass through.
pub fn css_property_name(channel: &str) -> String {
    let mut out = String::with_capacity(channel.len() + 4);
    for ch in channel.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn length_css(v: &StyleValue) -> String {
    match v {
        StyleValue::Number(n) => format!("{}px", fmt_num(*n)),
        other => other.to_css(),
    }
}

fn percent_css(v: &StyleValue) -> String {
    match v.scalar() {
        Some(n) => format!("{}%", fmt_num(n)),
        None => v.to_css(),
    }
}

/// Compose transform channels in a fixed order: translate, percent translate, rotate, scale.
fn compose_transform(channels: &IndexMap<&str, &StyleValue>) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    let x = channels.get("x");
    let y = channels.get("y");
    if x.is_some() || y.is_some() {
        parts.push(format!(
            "translate({}, {})",
            x.map(|v| length_css(v)).unwrap_or_else(|| "0px".into()),
            y.map(|v| length_css(v)).unwrap_or_else(|| "0px".into()),
        ));
    }
    let xp = channels.get("xPercent");
    let yp = channels.get("yPercent");
    if xp.is_some() || yp.is_some() {
        parts.push(format!(
            "translate({}, {})",
            xp.map(|v| percent_css(v)).unwrap_or_else(|| "0%".into()),
            yp.map(|v| percent_css(v)).unwrap_or_else(|| "0%".into()),
        ));
    }
    if let Some(r) = channels.get("rotate") {
        let deg = r.scalar().unwrap_or(0.0);
        parts.push(format!("rotate({}deg)", fmt_num(deg)));
    }
    let uniform = channels.get("scale").and_then(|v| v.scalar());
    let sx = channels.get("scaleX").and_then(|v| v.scalar());
    let sy = channels.get("scaleY").and_then(|v| v.scalar());
    if uniform.is_some() || sx.is_some() || sy.is_some() {
        let base = uniform.unwrap_or(1.0);
        let sx = sx.unwrap_or(base);
        let sy = sy.unwrap_or(base);
        parts.push(format!("scale({}, {})", fmt_num(sx), fmt_num(sy)));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

#[derive(Clone, Debug)]
struct Entry {
    owner: Owner,
    value: StyleValue,
}

#[derive(Clone, Debug, Default)]
struct NodeStyles {
    channels: IndexMap<String, Vec<Entry>>,
    /// Declarations as last flushed to the host.
    emitted: IndexMap<String, String>,
    /// Inline value present before the first write, per css property.
    originals: IndexMap<String, Option<String>>,
    dirty: bool,
}

impl NodeStyles {
    fn effective(&self) -> IndexMap<&str, &StyleValue> {
        let mut out = IndexMap::new();
        for (name, entries) in &self.channels {
            let top = entries.iter().map(|e| e.owner.layer()).max();
            if let Some(top) = top {
                if let Some(e) = entries.iter().rev().find(|e| e.owner.layer() == top) {
                    out.insert(name.as_str(), &e.value);
                }
            }
        }
        out
    }

    fn declarations(&self) -> IndexMap<String, String> {
        let effective = self.effective();
        let mut transform: IndexMap<&str, &StyleValue> = IndexMap::new();
        let mut decls = IndexMap::new();
        for (&name, &value) in &effective {
            if is_transform_channel(name) {
                transform.insert(name, value);
            } else {
                decls.insert(css_property_name(name), value.to_css());
            }
        }
        if let Some(t) = compose_transform(&transform) {
            decls.insert("transform".to_string(), t);
        }
        decls
    }

    fn is_vacant(&self) -> bool {
        self.channels.is_empty() && self.emitted.is_empty()
    }
}

/// Per-node channel writes from every owner, flushed as minimal style ops.
#[derive(Debug, Default)]
pub struct StyleStore {
    nodes: IndexMap<NodeId, NodeStyles>,
}

impl StyleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `owner`'s value for a channel. Later owners on the same layer win.
    pub fn write(&mut self, node: NodeId, owner: Owner, channel: &str, value: StyleValue) {
        let styles = self.nodes.entry(node).or_default();
        let entries = styles.channels.entry(channel.to_string()).or_default();
        match entries.iter_mut().find(|e| e.owner == owner) {
            Some(e) if e.value == value => {}
            Some(e) => {
                e.value = value;
                styles.dirty = true;
            }
            None => {
                entries.push(Entry { owner, value });
                styles.dirty = true;
            }
        }
    }

    /// Drop every channel `owner` wrote. The next flush restores or clears them.
    pub fn release_owner(&mut self, owner: Owner) {
        for styles in self.nodes.values_mut() {
            let mut touched = false;
            styles.channels.retain(|_, entries| {
                let before = entries.len();
                entries.retain(|e| e.owner != owner);
                touched |= entries.len() != before;
                !entries.is_empty()
            });
            styles.dirty |= touched;
        }
    }

    /// Forget a node entirely without emitting anything (node left the document).
    pub fn forget_node(&mut self, node: NodeId) {
        self.nodes.shift_remove(&node);
    }

    pub fn has_writes(&self, owner: Owner) -> bool {
        self.nodes
            .values()
            .any(|s| s.channels.values().any(|es| es.iter().any(|e| e.owner == owner)))
    }

    /// Declarations currently applied to `node`, as flushed.
    pub fn applied(&self, node: NodeId) -> Option<&IndexMap<String, String>> {
        self.nodes.get(&node).map(|s| &s.emitted)
    }

    /// Nodes with live channels or applied declarations.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Emit the difference between what is applied and what owners now produce.
    pub fn flush(&mut self, layout: &dyn LayoutSource, batch: &mut StyleBatch) {
        for (&node, styles) in self.nodes.iter_mut() {
            if !styles.dirty {
                continue;
            }
            styles.dirty = false;
            let next = styles.declarations();

            let stale: Vec<String> = styles
                .emitted
                .keys()
                .filter(|k| !next.contains_key(*k))
                .cloned()
                .collect();
            for prop in stale {
                styles.emitted.shift_remove(&prop);
                match styles.originals.shift_remove(&prop).flatten() {
                    Some(value) => batch.push(StyleOp::Restore { node, prop, value }),
                    None => batch.push(StyleOp::Clear { node, prop }),
                }
            }

            for (prop, value) in next {
                if styles.emitted.get(&prop) == Some(&value) {
                    continue;
                }
                if !styles.originals.contains_key(&prop) {
                    let original = layout.inline_style(node, &prop);
                    styles.originals.insert(prop.clone(), original);
                }
                batch.push(StyleOp::Set {
                    node,
                    prop: prop.clone(),
                    value: value.clone(),
                });
                styles.emitted.insert(prop, value);
            }
        }
        self.nodes.retain(|_, s| !s.is_vacant());
    }
}
