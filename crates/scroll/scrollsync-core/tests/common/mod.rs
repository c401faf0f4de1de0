#![allow(dead_code)]

use scrollsync_core::{
    Config, Engine, FrameInput, FrameOutput, MemoryDocument, NodeId, Rect, ScopeId, Viewport,
    ViewDefinition,
};
use serde::Deserialize;

pub const FRAME: f64 = 1.0 / 60.0;

pub fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

#[derive(Debug, Deserialize)]
pub struct LayoutFixture {
    pub viewport: Viewport,
    pub nodes: Vec<NodeFixture>,
}

#[derive(Debug, Deserialize)]
pub struct NodeFixture {
    pub id: NodeId,
    pub rect: Rect,
    #[serde(default)]
    pub scroll_width: Option<f32>,
}

pub fn load_layout(name: &str) -> (MemoryDocument, Viewport) {
    let fixture: LayoutFixture =
        scrollsync_test_fixtures::layouts::load(name).expect("layout fixture");
    let mut doc = MemoryDocument::new();
    for n in fixture.nodes {
        doc.insert(n.id, n.rect);
        if let Some(w) = n.scroll_width {
            doc.set_scroll_width(n.id, w);
        }
    }
    (doc, fixture.viewport)
}

pub fn load_view(name: &str) -> ViewDefinition {
    let json = scrollsync_test_fixtures::views::json(name).expect("view fixture");
    ViewDefinition::from_json(&json).expect("view definition")
}

/// Unsmoothed scroll, measurement on the first frame.
pub fn direct_config() -> Config {
    Config {
        smoothing_decay_s: 0.0,
        require_layout_ready: false,
        ..Config::default()
    }
}

/// Engine plus an in-memory document that applies every frame's output.
pub struct Harness {
    pub engine: Engine,
    pub doc: MemoryDocument,
    pub now: f64,
}

impl Harness {
    pub fn new(cfg: Config, layout: &str) -> Self {
        let (doc, viewport) = load_layout(layout);
        let mut engine = Engine::new(cfg).expect("engine");
        engine.set_viewport(viewport);
        Self {
            engine,
            doc,
            now: 0.0,
        }
    }

    pub fn mount(&mut self, root: u32, view: &str) -> ScopeId {
        self.engine
            .mount_view(NodeId(root), load_view(view))
            .expect("mount")
    }

    pub fn frame(&mut self, scroll: f32) -> FrameOutput {
        self.step(FrameInput::new(self.now, scroll))
    }

    pub fn frame_with_viewport(&mut self, scroll: f32, viewport: Viewport) -> FrameOutput {
        self.step(FrameInput::new(self.now, scroll).with_viewport(viewport))
    }

    fn step(&mut self, input: FrameInput) -> FrameOutput {
        let out = self.engine.frame(input, &self.doc).clone();
        self.doc.apply(&out.styles);
        self.now += FRAME;
        out
    }

    /// Run frames at a fixed scroll offset for `seconds` of host time.
    pub fn hold(&mut self, scroll: f32, seconds: f64) {
        let frames = (seconds / FRAME).ceil() as usize;
        for _ in 0..frames {
            self.frame(scroll);
        }
    }

    pub fn dispose(&mut self, scope: ScopeId) {
        let batch = self.engine.dispose_scope(scope).expect("dispose");
        self.doc.apply(&batch);
    }

    pub fn style(&self, node: u32, prop: &str) -> Option<String> {
        self.doc.style(NodeId(node), prop).map(str::to_string)
    }

    pub fn number(&self, node: u32, prop: &str) -> f32 {
        let raw = self.style(node, prop).unwrap_or_else(|| panic!("{prop} on {node}"));
        raw.trim_end_matches("px").parse().expect("numeric style")
    }

    /// First translate() x component of the node's transform, in px.
    pub fn translate_x(&self, node: u32) -> f32 {
        let t = self.style(node, "transform").expect("transform");
        let inner = t
            .strip_prefix("translate(")
            .and_then(|s| s.split(',').next())
            .expect("translate()");
        inner.trim_end_matches("px").parse().expect("px value")
    }

    /// Inline styles of every host node, for before/after comparisons.
    pub fn snapshot(&self, nodes: &[u32]) -> Vec<Option<Vec<(String, String)>>> {
        nodes
            .iter()
            .map(|n| {
                self.doc.inline_styles(NodeId(*n)).map(|m| {
                    let mut v: Vec<_> = m.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                    v.sort();
                    v
                })
            })
            .collect()
    }
}
