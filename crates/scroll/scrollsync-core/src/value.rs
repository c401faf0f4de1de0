//! Typed style values and keyframe value specifications.

use serde::{Deserialize, Serialize};

use crate::error::{MeasurementErrorKind, Result, ScrollSyncError};
use crate::host::{LayoutSource, Viewport};
use crate::ids::NodeId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StyleValue {
    /// Unitless (opacity, scale).
    Number(f32),
    Px(f32),
    Percent(f32),
    Deg(f32),
    /// RGBA, each component in [0,1].
    Color([f32; 4]),
    /// Discrete value (no blending): `"fixed"`, `"hidden"`, ...
    Keyword(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Unit {
    Number,
    Px,
    Percent,
    Deg,
    Color,
    Keyword,
}

impl StyleValue {
    #[inline]
    pub fn unit(&self) -> Unit {
        match self {
            StyleValue::Number(_) => Unit::Number,
            StyleValue::Px(_) => Unit::Px,
            StyleValue::Percent(_) => Unit::Percent,
            StyleValue::Deg(_) => Unit::Deg,
            StyleValue::Color(_) => Unit::Color,
            StyleValue::Keyword(_) => Unit::Keyword,
        }
    }

    /// Scalar magnitude for numeric units.
    pub fn scalar(&self) -> Option<f32> {
        match self {
            StyleValue::Number(v)
            | StyleValue::Px(v)
            | StyleValue::Percent(v)
            | StyleValue::Deg(v) => Some(*v),
            _ => None,
        }
    }

    /// Same unit, new magnitude. Non-scalar values are returned unchanged.
    pub fn with_scalar(&self, v: f32) -> StyleValue {
        match self {
            StyleValue::Number(_) => StyleValue::Number(v),
            StyleValue::Px(_) => StyleValue::Px(v),
            StyleValue::Percent(_) => StyleValue::Percent(v),
            StyleValue::Deg(_) => StyleValue::Deg(v),
            other => other.clone(),
        }
    }

    pub fn to_css(&self) -> String {
        match self {
            StyleValue::Number(v) => fmt_num(*v),
            StyleValue::Px(v) => format!("{}px", fmt_num(*v)),
            StyleValue::Percent(v) => format!("{}%", fmt_num(*v)),
            StyleValue::Deg(v) => format!("{}deg", fmt_num(*v)),
            StyleValue::Color(c) => format!(
                "rgba({}, {}, {}, {})",
                channel_255(c[0]),
                channel_255(c[1]),
                channel_255(c[2]),
                fmt_num(c[3].clamp(0.0, 1.0))
            ),
            StyleValue::Keyword(k) => k.clone(),
        }
    }
}

#[inline]
fn channel_255(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Compact decimal: at most four fractional digits, no trailing zeros, no `-0`.
pub fn fmt_num(v: f32) -> String {
    if !v.is_finite() {
        return "0".into();
    }
    let s = format!("{:.4}", v);
    let s = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    };
    if s == "-0" {
        "0".into()
    } else {
        s
    }
}

/// Geometry a keyframe value can be derived from at measurement time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "node", rename_all = "snake_case")]
pub enum Measure {
    /// `scroll_width(node) - viewport.width`, never negative.
    HorizontalOverflow(NodeId),
    ViewportWidth,
    ViewportHeight,
    ElementWidth(NodeId),
    ElementHeight(NodeId),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasuredUnit {
    #[default]
    Px,
    Number,
}

fn one() -> f32 {
    1.0
}

/// Keyframe value as authored: a literal, or a measurement resolved on every re-measure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSpec {
    Literal(StyleValue),
    Measured {
        measure: Measure,
        #[serde(default = "one")]
        scale: f32,
        #[serde(default)]
        offset: f32,
        #[serde(default)]
        unit: MeasuredUnit,
    },
}

impl From<StyleValue> for ValueSpec {
    fn from(v: StyleValue) -> Self {
        ValueSpec::Literal(v)
    }
}

/// What a measurement pass can see.
pub struct MeasureContext<'a> {
    pub layout: &'a dyn LayoutSource,
    pub viewport: Viewport,
}

impl<'a> MeasureContext<'a> {
    pub fn new(layout: &'a dyn LayoutSource, viewport: Viewport) -> Self {
        Self { layout, viewport }
    }

    pub fn measure(&self, m: Measure) -> Result<f32> {
        match m {
            Measure::ViewportWidth => Ok(self.viewport.width),
            Measure::ViewportHeight => Ok(self.viewport.height),
            Measure::ElementWidth(node) => Ok(self.rect_of(node)?.width),
            Measure::ElementHeight(node) => Ok(self.rect_of(node)?.height),
            Measure::HorizontalOverflow(node) => {
                let content = self.layout.scroll_width(node).ok_or(ScrollSyncError::Measurement {
                    node,
                    kind: MeasurementErrorKind::Missing,
                })?;
                Ok((content - self.viewport.width).max(0.0))
            }
        }
    }

    fn rect_of(&self, node: NodeId) -> Result<crate::host::Rect> {
        self.layout.rect(node).ok_or(ScrollSyncError::Measurement {
            node,
            kind: MeasurementErrorKind::Missing,
        })
    }
}

impl ValueSpec {
    pub fn resolve(&self, ctx: &MeasureContext<'_>) -> Result<StyleValue> {
        match self {
            ValueSpec::Literal(v) => Ok(v.clone()),
            ValueSpec::Measured {
                measure,
                scale,
                offset,
                unit,
            } => {
                let v = ctx.measure(*measure)? * scale + offset;
                Ok(match unit {
                    MeasuredUnit::Px => StyleValue::Px(v),
                    MeasuredUnit::Number => StyleValue::Number(v),
                })
            }
        }
    }
}
