use js_sys::{Function, Reflect};
use serde::Serialize;
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use scrollsync_core::{
    Config, Engine, FrameInput, LayoutSource, LoopId, LoopOptions, NodeId, Rect, ScopeId,
    ScrollSyncError, StaticContent, SubscriptionId, TimelineConfig, TimelineId, ViewDefinition,
    Viewport,
};

#[wasm_bindgen]
pub struct ScrollSync {
    core: Engine,
}

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

fn core_err(e: ScrollSyncError) -> JsError {
    JsError::new(&e.to_string())
}

fn to_js<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<JsValue, JsError> {
    // maps as plain objects
    let ser = swb::Serializer::new().serialize_maps_as_objects(true);
    value
        .serialize(&ser)
        .map_err(|e| JsError::new(&format!("{what} error: {e}")))
}

/// Layout queries answered by a JS object:
/// `{ rect(id) -> {left, top, width, height} | null, scrollWidth?(id), inlineStyle?(id, prop) }`.
struct JsLayout {
    target: JsValue,
    rect: Function,
    scroll_width: Option<Function>,
    inline_style: Option<Function>,
}

impl JsLayout {
    fn from_js(target: JsValue) -> Result<Self, JsError> {
        let rect = method(&target, "rect")?
            .ok_or_else(|| JsError::new("layout source must provide rect(id)"))?;
        let scroll_width = method(&target, "scrollWidth")?;
        let inline_style = method(&target, "inlineStyle")?;
        Ok(Self {
            target,
            rect,
            scroll_width,
            inline_style,
        })
    }
}

fn method(target: &JsValue, name: &str) -> Result<Option<Function>, JsError> {
    let v = Reflect::get(target, &JsValue::from_str(name))
        .map_err(|e| JsError::new(&format!("layout source lookup '{name}': {e:?}")))?;
    if jsvalue_is_undefined_or_null(&v) {
        return Ok(None);
    }
    v.dyn_into::<Function>()
        .map(Some)
        .map_err(|_| JsError::new(&format!("layout source '{name}' is not a function")))
}

impl LayoutSource for JsLayout {
    fn rect(&self, node: NodeId) -> Option<Rect> {
        let val = self
            .rect
            .call1(&self.target, &JsValue::from_f64(node.0 as f64))
            .ok()?;
        if jsvalue_is_undefined_or_null(&val) {
            return None;
        }
        swb::from_value(val).ok()
    }

    fn scroll_width(&self, node: NodeId) -> Option<f32> {
        let Some(f) = &self.scroll_width else {
            return self.rect(node).map(|r| r.width);
        };
        f.call1(&self.target, &JsValue::from_f64(node.0 as f64))
            .ok()?
            .as_f64()
            .map(|w| w as f32)
    }

    fn inline_style(&self, node: NodeId, prop: &str) -> Option<String> {
        let f = self.inline_style.as_ref()?;
        let val = f
            .call2(
                &self.target,
                &JsValue::from_f64(node.0 as f64),
                &JsValue::from_str(prop),
            )
            .ok()?;
        val.as_string().filter(|s| !s.is_empty())
    }
}

#[wasm_bindgen]
impl ScrollSync {
    /// Create an engine. Pass a partial Config object or undefined/null for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<ScrollSync, JsError> {
        console_error_panic_hook::set_once();

        let cfg: Config = if jsvalue_is_undefined_or_null(&config) {
            Config::default()
        } else {
            swb::from_value(config).map_err(|e| JsError::new(&format!("config error: {e}")))?
        };
        Ok(ScrollSync {
            core: Engine::new(cfg).map_err(core_err)?,
        })
    }

    /// Immediate viewport change (initial sizing, orientation).
    #[wasm_bindgen(js_name = set_viewport)]
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.core.set_viewport(Viewport::new(width, height));
    }

    /// Interactive resize; the breakpoint settles after the debounce window.
    #[wasm_bindgen]
    pub fn resize(&mut self, width: f32, height: f32, now_s: f64) {
        self.core.resize(Viewport::new(width, height), now_s);
    }

    #[wasm_bindgen(js_name = invalidate_layout)]
    pub fn invalidate_layout(&mut self) {
        self.core.invalidate_layout();
    }

    /// Upper bound for the scroll offset, or null/undefined to clear it.
    #[wasm_bindgen(js_name = set_scroll_limit)]
    pub fn set_scroll_limit(&mut self, limit: Option<f32>) {
        self.core.set_scroll_limit(limit);
    }

    /// Feed the active locale and resolved strings. Returns `[{old, new}]` for
    /// every view remounted because the content changed.
    #[wasm_bindgen(js_name = set_content)]
    pub fn set_content(&mut self, locale: String, texts: JsValue) -> Result<JsValue, JsError> {
        let texts: Vec<String> = if jsvalue_is_undefined_or_null(&texts) {
            Vec::new()
        } else {
            swb::from_value(texts).map_err(|e| JsError::new(&format!("texts error: {e}")))?
        };
        let remounts = self
            .core
            .set_content(&StaticContent { locale, texts })
            .map_err(core_err)?;
        to_js(&remounts, "remounts")
    }

    // ---------- scopes and views ----------

    #[wasm_bindgen(js_name = create_scope)]
    pub fn create_scope(&mut self, root: u32) -> u32 {
        self.core.create_scope(NodeId(root)).0
    }

    /// Dispose a scope. Returns the style ops that restore the document.
    #[wasm_bindgen(js_name = dispose_scope)]
    pub fn dispose_scope(&mut self, scope: u32) -> Result<JsValue, JsError> {
        let batch = self.core.dispose_scope(ScopeId(scope)).map_err(core_err)?;
        to_js(&batch, "dispose")
    }

    #[wasm_bindgen(js_name = mark_layout_ready)]
    pub fn mark_layout_ready(&mut self, scope: u32) -> Result<(), JsError> {
        self.core.mark_layout_ready(ScopeId(scope)).map_err(core_err)
    }

    /// Mount a view definition (object or JSON string) on `root`. Returns the scope id.
    #[wasm_bindgen(js_name = mount_view)]
    pub fn mount_view(&mut self, root: u32, definition: JsValue) -> Result<u32, JsError> {
        let def = if let Some(s) = definition.as_string() {
            ViewDefinition::from_json(&s).map_err(core_err)?
        } else {
            swb::from_value(definition)
                .map_err(|e| JsError::new(&format!("view definition error: {e}")))?
        };
        let scope = self.core.mount_view(NodeId(root), def).map_err(core_err)?;
        Ok(scope.0)
    }

    #[wasm_bindgen(js_name = unmount_view)]
    pub fn unmount_view(&mut self, scope: u32) -> Result<JsValue, JsError> {
        let batch = self.core.unmount_view(ScopeId(scope)).map_err(core_err)?;
        to_js(&batch, "unmount")
    }

    // ---------- timelines ----------

    #[wasm_bindgen(js_name = create_timeline)]
    pub fn create_timeline(&mut self, scope: u32, config: JsValue) -> Result<u32, JsError> {
        let cfg: TimelineConfig = swb::from_value(config)
            .map_err(|e| JsError::new(&format!("timeline config error: {e}")))?;
        let id = self
            .core
            .create_timeline(ScopeId(scope), cfg)
            .map_err(core_err)?;
        Ok(id.0)
    }

    #[wasm_bindgen]
    pub fn progress(&self, timeline: u32) -> Result<f32, JsError> {
        self.core.progress(TimelineId(timeline)).map_err(core_err)
    }

    #[wasm_bindgen(js_name = timeline_state)]
    pub fn timeline_state(&self, timeline: u32) -> Result<JsValue, JsError> {
        let state = self
            .core
            .timeline_state(TimelineId(timeline))
            .map_err(core_err)?;
        to_js(&state, "timeline state")
    }

    // ---------- loops ----------

    /// Start a loop on `target`. `options` is an optional LoopOptions object.
    #[wasm_bindgen(js_name = start_loop)]
    pub fn start_loop(
        &mut self,
        scope: u32,
        target: u32,
        period_s: f32,
        options: JsValue,
    ) -> Result<u32, JsError> {
        let opts: LoopOptions = if jsvalue_is_undefined_or_null(&options) {
            LoopOptions::default()
        } else {
            swb::from_value(options)
                .map_err(|e| JsError::new(&format!("loop options error: {e}")))?
        };
        let id = self
            .core
            .start_loop(ScopeId(scope), NodeId(target), period_s, opts)
            .map_err(core_err)?;
        Ok(id.0)
    }

    #[wasm_bindgen(js_name = pause_loop)]
    pub fn pause_loop(&mut self, id: u32) -> Result<(), JsError> {
        self.core.pause_loop(LoopId(id)).map_err(core_err)
    }

    #[wasm_bindgen(js_name = resume_loop)]
    pub fn resume_loop(&mut self, id: u32) -> Result<(), JsError> {
        self.core.resume_loop(LoopId(id)).map_err(core_err)
    }

    #[wasm_bindgen(js_name = stop_loop)]
    pub fn stop_loop(&mut self, id: u32) -> Result<(), JsError> {
        self.core.stop_loop(LoopId(id)).map_err(core_err)
    }

    // ---------- listeners ----------

    /// `callback(sample)` runs every frame while `scope` is live.
    #[wasm_bindgen(js_name = subscribe_scroll)]
    pub fn subscribe_scroll(&mut self, scope: u32, callback: Function) -> Result<u32, JsError> {
        let id = self
            .core
            .subscribe_scroll(ScopeId(scope), move |sample| {
                if let Ok(v) = swb::to_value(sample) {
                    let _ = callback.call1(&JsValue::UNDEFINED, &v);
                }
            })
            .map_err(core_err)?;
        Ok(id.0)
    }

    #[wasm_bindgen(js_name = unsubscribe_scroll)]
    pub fn unsubscribe_scroll(&mut self, scope: u32, id: u32) -> Result<(), JsError> {
        self.core
            .unsubscribe_scroll(ScopeId(scope), SubscriptionId(id))
            .map_err(core_err)
    }

    /// `callback(state)` runs on each settled breakpoint change while `scope` is live.
    #[wasm_bindgen(js_name = on_breakpoint_change)]
    pub fn on_breakpoint_change(&mut self, scope: u32, callback: Function) -> Result<u32, JsError> {
        let id = self
            .core
            .on_breakpoint_change(ScopeId(scope), move |state| {
                if let Ok(v) = swb::to_value(state) {
                    let _ = callback.call1(&JsValue::UNDEFINED, &v);
                }
            })
            .map_err(core_err)?;
        Ok(id.0)
    }

    // ---------- frame ----------

    /// Advance one frame. `layout` answers geometry queries (see `JsLayout`).
    /// Returns `{ sample, styles, events }`.
    #[wasm_bindgen]
    pub fn frame(
        &mut self,
        now_s: f64,
        native_scroll: f32,
        layout: JsValue,
    ) -> Result<JsValue, JsError> {
        let layout = JsLayout::from_js(layout)?;
        let out = self.core.frame(FrameInput::new(now_s, native_scroll), &layout);
        to_js(out, "frame output")
    }

    /// Style ops queued outside a frame (stop_loop, variant rebuilds).
    #[wasm_bindgen(js_name = take_pending)]
    pub fn take_pending(&mut self) -> Result<JsValue, JsError> {
        let batch = self.core.take_pending();
        to_js(&batch, "pending")
    }

    #[wasm_bindgen]
    pub fn stats(&self) -> Result<JsValue, JsError> {
        to_js(&self.core.stats(), "stats")
    }

    #[wasm_bindgen(js_name = current_breakpoint)]
    pub fn current_breakpoint(&self) -> Option<String> {
        self.core.current_breakpoint().map(|b| b.name.clone())
    }
}

/// Numeric ABI version for compatibility checks at init.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}
