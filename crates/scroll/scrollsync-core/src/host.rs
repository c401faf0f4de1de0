//! Host-facing read interfaces and an in-memory document.
//!
//! The engine never touches a real document. It reads geometry through
//! [`LayoutSource`] and hands back [`StyleBatch`]es for the host to apply.
//! [`MemoryDocument`] implements both halves for headless use and tests.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ids::NodeId;
use crate::outputs::{StyleBatch, StyleOp};

/// Border box in document coordinates (scroll offset already added).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Geometry and style queries answered by the hosting environment.
pub trait LayoutSource {
    /// `None` when the node is not attached to the document.
    fn rect(&self, node: NodeId) -> Option<Rect>;

    /// Full content width including overflow.
    fn scroll_width(&self, node: NodeId) -> Option<f32> {
        self.rect(node).map(|r| r.width)
    }

    /// Inline declaration present on the node before the engine touched it.
    fn inline_style(&self, _node: NodeId, _prop: &str) -> Option<String> {
        None
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.rect(node).is_some()
    }
}

/// Layout source that knows nothing. Used for teardown, which never measures.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetachedLayout;

impl LayoutSource for DetachedLayout {
    fn rect(&self, _node: NodeId) -> Option<Rect> {
        None
    }
}

/// Pre-resolved content consumed only to detect text-length changes.
pub trait ContentProvider {
    fn locale(&self) -> &str;
    fn texts(&self) -> Vec<&str>;
}

/// Plain owned content, for hosts that resolve translations up front.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticContent {
    pub locale: String,
    #[serde(default)]
    pub texts: Vec<String>,
}

impl ContentProvider for StaticContent {
    fn locale(&self) -> &str {
        &self.locale
    }

    fn texts(&self) -> Vec<&str> {
        self.texts.iter().map(String::as_str).collect()
    }
}

/// Fingerprint of the locale plus every text length. Equal fingerprints mean
/// measured offsets are still valid.
pub fn content_fingerprint(content: &dyn ContentProvider) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.locale().hash(&mut hasher);
    for text in content.texts() {
        text.chars().count().hash(&mut hasher);
    }
    hasher.finish()
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryNode {
    pub rect: Rect,
    pub scroll_width: Option<f32>,
    pub inline: IndexMap<String, String>,
    pub spacer: bool,
}

/// Headless document: static rectangles plus inline styles.
#[derive(Clone, Debug, Default)]
pub struct MemoryDocument {
    nodes: IndexMap<NodeId, MemoryNode>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: NodeId, rect: Rect) -> &mut MemoryNode {
        let entry = self.nodes.entry(node).or_default();
        entry.rect = rect;
        entry
    }

    pub fn with_node(mut self, node: NodeId, rect: Rect) -> Self {
        self.insert(node, rect);
        self
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.rect = rect;
        }
    }

    pub fn set_scroll_width(&mut self, node: NodeId, width: f32) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.scroll_width = Some(width);
        }
    }

    /// Seed an inline declaration that exists independently of the engine.
    pub fn set_inline(&mut self, node: NodeId, prop: &str, value: &str) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.inline.insert(prop.to_string(), value.to_string());
        }
    }

    pub fn remove(&mut self, node: NodeId) -> Option<MemoryNode> {
        self.nodes.shift_remove(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn node(&self, node: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(&node)
    }

    pub fn style(&self, node: NodeId, prop: &str) -> Option<&str> {
        self.nodes
            .get(&node)
            .and_then(|n| n.inline.get(prop))
            .map(String::as_str)
    }

    pub fn inline_styles(&self, node: NodeId) -> Option<&IndexMap<String, String>> {
        self.nodes.get(&node).map(|n| &n.inline)
    }

    pub fn spacer_count(&self) -> usize {
        self.nodes.values().filter(|n| n.spacer).count()
    }

    pub fn apply(&mut self, batch: &StyleBatch) {
        for op in batch.iter() {
            match op {
                StyleOp::Set { node, prop, value } | StyleOp::Restore { node, prop, value } => {
                    if let Some(n) = self.nodes.get_mut(node) {
                        n.inline.insert(prop.clone(), value.clone());
                    }
                }
                StyleOp::Clear { node, prop } => {
                    if let Some(n) = self.nodes.get_mut(node) {
                        n.inline.shift_remove(prop);
                    }
                }
                StyleOp::InsertSpacer {
                    spacer,
                    before,
                    width,
                    height,
                } => {
                    let (left, top) = self
                        .nodes
                        .get(before)
                        .map(|n| (n.rect.left, n.rect.top))
                        .unwrap_or((0.0, 0.0));
                    self.nodes.insert(
                        *spacer,
                        MemoryNode {
                            rect: Rect::new(left, top, *width, *height),
                            scroll_width: None,
                            inline: IndexMap::new(),
                            spacer: true,
                        },
                    );
                }
                StyleOp::RemoveNode { node } => {
                    self.nodes.shift_remove(node);
                }
            }
        }
    }
}

impl LayoutSource for MemoryDocument {
    fn rect(&self, node: NodeId) -> Option<Rect> {
        self.nodes.get(&node).map(|n| n.rect)
    }

    fn scroll_width(&self, node: NodeId) -> Option<f32> {
        self.nodes
            .get(&node)
            .map(|n| n.scroll_width.unwrap_or(n.rect.width))
    }

    fn inline_style(&self, node: NodeId, prop: &str) -> Option<String> {
        self.style(node, prop).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_set_clear_and_restore() {
        let mut doc = MemoryDocument::new().with_node(NodeId(1), Rect::new(0.0, 0.0, 10.0, 10.0));
        doc.set_inline(NodeId(1), "color", "red");
        let mut batch = StyleBatch::new();
        batch.push(StyleOp::Set {
            node: NodeId(1),
            prop: "opacity".into(),
            value: "0.5".into(),
        });
        batch.push(StyleOp::Set {
            node: NodeId(1),
            prop: "color".into(),
            value: "blue".into(),
        });
        doc.apply(&batch);
        assert_eq!(doc.style(NodeId(1), "opacity"), Some("0.5"));

        let mut undo = StyleBatch::new();
        undo.push(StyleOp::Clear {
            node: NodeId(1),
            prop: "opacity".into(),
        });
        undo.push(StyleOp::Restore {
            node: NodeId(1),
            prop: "color".into(),
            value: "red".into(),
        });
        doc.apply(&undo);
        assert_eq!(doc.style(NodeId(1), "opacity"), None);
        assert_eq!(doc.style(NodeId(1), "color"), Some("red"));
    }

    #[test]
    fn spacers_take_position_of_their_anchor() {
        let mut doc =
            MemoryDocument::new().with_node(NodeId(1), Rect::new(20.0, 300.0, 100.0, 50.0));
        let mut batch = StyleBatch::new();
        batch.push(StyleOp::InsertSpacer {
            spacer: NodeId(0x8000_0000),
            before: NodeId(1),
            width: 100.0,
            height: 50.0,
        });
        doc.apply(&batch);
        assert_eq!(doc.spacer_count(), 1);
        assert_eq!(
            doc.rect(NodeId(0x8000_0000)),
            Some(Rect::new(20.0, 300.0, 100.0, 50.0))
        );
    }

    #[test]
    fn fingerprint_tracks_locale_and_lengths() {
        let en = StaticContent {
            locale: "en".into(),
            texts: vec!["Plan your day".into()],
        };
        let de = StaticContent {
            locale: "de".into(),
            texts: vec!["Planen Sie Ihren Tag".into()],
        };
        let en_same_len = StaticContent {
            locale: "en".into(),
            texts: vec!["Plan your way".into()],
        };
        assert_ne!(content_fingerprint(&en), content_fingerprint(&de));
        assert_eq!(content_fingerprint(&en), content_fingerprint(&en_same_len));
    }

    #[test]
    fn empty_rect_detection() {
        assert!(Rect::new(0.0, 0.0, 0.0, 10.0).is_empty());
        assert!(!Rect::new(0.0, 0.0, 1.0, 1.0).is_empty());
    }
}
