//! Engine: owns every subsystem and drives them once per frame.
//!
//! Frame order:
//! 1. viewport change (debounced breakpoint classification, layout generation bump)
//! 2. scroll smoothing and subscriber notification
//! 3. settled breakpoint change (variant teardown and rebuild)
//! 4. timelines in registration order (measure, pin, sample, write)
//! 5. loops
//! 6. style flush into the frame's [`StyleBatch`]

use hashbrown::HashSet;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::breakpoint::{BreakpointResolver, BreakpointState};
use crate::config::Config;
use crate::error::{MeasurementErrorKind, Result, ScrollSyncError};
use crate::host::{content_fingerprint, ContentProvider, DetachedLayout, LayoutSource, Viewport};
use crate::ids::{IdAllocator, LoopId, NodeId, ScopeId, SubscriptionId, TimelineId};
use crate::interp::{sample_track, Owner, StyleStore};
use crate::loops::{LoopConfig, LoopController, LoopOptions, LoopState};
use crate::outputs::{Event, FrameOutput, StyleBatch};
use crate::pin::{PinController, PinSink};
use crate::scope::{Disposable, Liveness, Part, ScopeManager};
use crate::scroll::{ScrollSample, ScrollSource};
use crate::timeline::{stagger_progress, Timeline, TimelineConfig, TimelineRegistry, TimelineState};
use crate::value::MeasureContext;
use crate::view::{MountedView, VariantConfig, ViewDefinition};

/// Host input for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    /// Monotonic host clock in seconds.
    pub now_s: f64,
    /// Raw document scroll offset.
    pub native_scroll: f32,
    /// Current viewport when the host observed a change; `None` keeps the last one.
    #[serde(default)]
    pub viewport: Option<Viewport>,
}

impl FrameInput {
    pub fn new(now_s: f64, native_scroll: f32) -> Self {
        Self {
            now_s,
            native_scroll,
            viewport: None,
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub live_scopes: usize,
    pub timelines: usize,
    pub active_timelines: usize,
    pub loops: usize,
    pub pins: usize,
    pub spacers: usize,
    pub styled_nodes: usize,
    pub listeners: usize,
}

/// A view torn down and rebuilt after a content change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remount {
    pub old: ScopeId,
    pub new: ScopeId,
}

#[derive(Debug)]
pub struct Engine {
    cfg: Config,
    ids: IdAllocator,

    scroll: ScrollSource,
    breakpoints: BreakpointResolver,
    timelines: TimelineRegistry,
    pins: PinController,
    loops: LoopController,
    scopes: ScopeManager,
    store: StyleStore,

    views: IndexMap<ScopeId, MountedView>,
    ready: HashSet<ScopeId>,
    viewport: Option<Viewport>,
    generation: u64,
    content: Option<u64>,

    // Produced between frames, drained into the next output.
    pending: StyleBatch,
    pending_events: Vec<Event>,
    output: FrameOutput,
}

impl Engine {
    pub fn new(cfg: Config) -> Result<Self> {
        cfg.validate()?;
        let breakpoints = BreakpointResolver::new(cfg.breakpoints.clone(), cfg.resize_debounce_ms)?;
        Ok(Self {
            scroll: ScrollSource::new(&cfg),
            breakpoints,
            cfg,
            ids: IdAllocator::new(),
            timelines: TimelineRegistry::new(),
            pins: PinController::new(),
            loops: LoopController::new(),
            scopes: ScopeManager::new(),
            store: StyleStore::new(),
            views: IndexMap::new(),
            ready: HashSet::new(),
            viewport: None,
            generation: 0,
            content: None,
            pending: StyleBatch::new(),
            pending_events: Vec::new(),
            output: FrameOutput::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Layout generation. Every measurement older than this is stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_breakpoint(&self) -> Option<&BreakpointState> {
        self.breakpoints.current()
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll.offset()
    }

    pub fn last_sample(&self) -> ScrollSample {
        self.scroll.last_sample()
    }

    pub fn set_scroll_limit(&mut self, limit: Option<f32>) {
        self.scroll.set_limit(limit);
    }

    // ---------- viewport / layout ----------

    /// Apply a viewport immediately, classifying without debounce.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        let from = self.breakpoint_name();
        self.resize(viewport, 0.0);
        if let Some(state) = self.breakpoints.flush() {
            self.switch_variants(from, state);
        }
    }

    /// Record an interactive resize. Offsets are re-measured next frame; the
    /// breakpoint settles after the debounce window.
    pub fn resize(&mut self, viewport: Viewport, now: f64) {
        if self.viewport == Some(viewport) {
            return;
        }
        self.viewport = Some(viewport);
        self.invalidate_layout();
        if self.breakpoints.current().is_none() {
            let state = self.breakpoints.prime(viewport.width);
            debug!("initial breakpoint {}", state.name);
            self.rebuild_variants();
        } else {
            self.breakpoints.resize(viewport.width, now);
        }
    }

    /// Force every timeline to re-measure on the next frame (fonts, images, orientation).
    pub fn invalidate_layout(&mut self) {
        self.generation += 1;
        self.pending_events.push(Event::LayoutInvalidated {
            generation: self.generation,
        });
    }

    /// Feed the active locale and strings. Remounts every view when they changed.
    pub fn set_content(&mut self, content: &dyn ContentProvider) -> Result<Vec<Remount>> {
        let fingerprint = content_fingerprint(content);
        let previous = self.content.replace(fingerprint);
        match previous {
            None => return Ok(Vec::new()),
            Some(p) if p == fingerprint => return Ok(Vec::new()),
            Some(_) => {}
        }
        debug!("content changed (locale {}), remounting views", content.locale());
        self.invalidate_layout();

        let mounted: Vec<(ScopeId, NodeId, ViewDefinition)> = self
            .views
            .values()
            .map(|v| (v.scope, v.root, v.definition.clone()))
            .collect();
        let mut out = Vec::with_capacity(mounted.len());
        for (old, root, definition) in mounted {
            let was_ready = self.ready.contains(&old);
            self.dispose_scope_inner(old)?;
            let new = self.mount_view(root, definition)?;
            if was_ready {
                self.ready.insert(new);
            }
            out.push(Remount { old, new });
        }
        Ok(out)
    }

    // ---------- scopes ----------

    /// Open a scope for `root`. A live scope on the same root is disposed first.
    pub fn create_scope(&mut self, root: NodeId) -> ScopeId {
        if let Some(existing) = self.scopes.live_scope_for_root(root) {
            debug!("disposing {:?} before recreating scope on {:?}", existing, root);
            // cannot fail: the scope is live
            let _ = self.dispose_scope_inner(existing);
        }
        let id = self.ids.alloc_scope();
        self.scopes.create(id, root);
        id
    }

    /// Register an extra disposable, typically a host callback.
    pub fn scope_add(&mut self, scope: ScopeId, disposable: Disposable) -> Result<()> {
        self.scopes.add(scope, Part::Shared, disposable)
    }

    /// Tear down everything `scope` owns and return the resulting style ops.
    /// Disposing an already disposed scope returns an empty batch.
    pub fn dispose_scope(&mut self, scope: ScopeId) -> Result<StyleBatch> {
        self.dispose_scope_inner(scope)?;
        Ok(self.take_pending())
    }

    /// Flag checked by host callbacks scheduled before a disposal.
    pub fn liveness(&self, scope: ScopeId) -> Option<Liveness> {
        self.scopes.get(scope).map(|s| s.liveness())
    }

    pub fn mark_layout_ready(&mut self, scope: ScopeId) -> Result<()> {
        self.ensure_live(scope)?;
        self.ready.insert(scope);
        Ok(())
    }

    fn is_ready(&self, scope: ScopeId) -> bool {
        !self.cfg.require_layout_ready || self.ready.contains(&scope)
    }

    fn ensure_live(&self, scope: ScopeId) -> Result<()> {
        if self.scopes.is_live(scope) {
            Ok(())
        } else if self.scopes.is_retired(scope) {
            Err(ScrollSyncError::ScopeDisposed(scope))
        } else {
            Err(ScrollSyncError::UnknownScope(scope))
        }
    }

    fn dispose_scope_inner(&mut self, scope: ScopeId) -> Result<()> {
        if self.scopes.is_retired(scope) {
            return Ok(());
        }
        let Some(disposables) = self.scopes.retire(scope) else {
            warn!("dispose of unknown scope {:?}", scope);
            return Err(ScrollSyncError::UnknownScope(scope));
        };
        for d in disposables {
            self.run_disposable(d);
        }
        self.views.shift_remove(&scope);
        self.ready.remove(&scope);
        if self.scopes.live_count() == 0 {
            self.breakpoints.cancel_pending();
        }
        self.store.flush(&DetachedLayout, &mut self.pending);
        debug!("scope {:?} disposed", scope);
        self.pending_events.push(Event::ScopeDisposed { scope });
        Ok(())
    }

    fn run_disposable(&mut self, disposable: Disposable) {
        match disposable {
            Disposable::Timeline(id) => self.dispose_timeline(id),
            Disposable::Loop(id) => {
                if self.loops.stop(id, &mut self.store).is_ok() {
                    self.pending_events.push(Event::LoopStopped { handle: id });
                }
            }
            Disposable::ScrollSubscription(id) => {
                self.scroll.unsubscribe(id);
            }
            Disposable::BreakpointListener(id) => {
                self.breakpoints.off(id);
            }
            Disposable::Callback(f) => f(),
        }
    }

    // ---------- timelines ----------

    pub fn create_timeline(&mut self, scope: ScopeId, config: TimelineConfig) -> Result<TimelineId> {
        self.create_timeline_in(scope, Part::Shared, config)
    }

    fn create_timeline_in(
        &mut self,
        scope: ScopeId,
        part: Part,
        config: TimelineConfig,
    ) -> Result<TimelineId> {
        config.validate()?;
        self.ensure_live(scope)?;
        let id = self.ids.alloc_timeline();
        self.scopes.add(scope, part, Disposable::Timeline(id))?;
        self.timelines
            .insert(Timeline::new(id, scope, config, part == Part::Variant));
        debug!("timeline {:?} created in {:?}", id, scope);
        self.pending_events.push(Event::TimelineCreated { timeline: id, scope });
        Ok(id)
    }

    pub fn timeline(&self, id: TimelineId) -> Option<&Timeline> {
        self.timelines.get(id)
    }

    pub fn timeline_state(&self, id: TimelineId) -> Result<TimelineState> {
        match self.timelines.get(id) {
            Some(tl) => Ok(tl.state()),
            // ids are never reused: issued but gone means disposed
            None if self.ids.issued_timeline(id) => Ok(TimelineState::Disposed),
            None => Err(ScrollSyncError::UnknownTimeline(id)),
        }
    }

    pub fn progress(&self, id: TimelineId) -> Result<f32> {
        self.timelines
            .get(id)
            .map(Timeline::progress)
            .ok_or(ScrollSyncError::UnknownTimeline(id))
    }

    /// Timeline ids in registration order.
    pub fn timeline_ids(&self) -> Vec<TimelineId> {
        self.timelines.ids()
    }

    fn dispose_timeline(&mut self, id: TimelineId) {
        let Some(mut tl) = self.timelines.remove(id) else {
            return;
        };
        tl.set_state(TimelineState::Disposed);
        let mut sink = PinSink {
            ids: &mut self.ids,
            store: &mut self.store,
            batch: &mut self.pending,
            events: &mut self.pending_events,
        };
        self.pins.remove(id, &mut sink);
        self.store.release_owner(Owner::Timeline(id));
        debug!("timeline {:?} disposed", id);
        self.pending_events.push(Event::TimelineDisposed { timeline: id });
    }

    // ---------- loops ----------

    pub fn start_loop(
        &mut self,
        scope: ScopeId,
        target: NodeId,
        period_s: f32,
        options: LoopOptions,
    ) -> Result<LoopId> {
        let config = LoopConfig {
            target,
            period_s,
            options,
        };
        self.start_loop_in(scope, Part::Shared, &config)
    }

    fn start_loop_in(&mut self, scope: ScopeId, part: Part, config: &LoopConfig) -> Result<LoopId> {
        self.ensure_live(scope)?;
        let id = self.ids.alloc_loop();
        self.loops.start(id, scope, config)?;
        self.scopes.add(scope, part, Disposable::Loop(id))?;
        self.pending_events.push(Event::LoopStarted { handle: id });
        Ok(id)
    }

    pub fn pause_loop(&mut self, id: LoopId) -> Result<()> {
        self.loops.pause(id)
    }

    pub fn resume_loop(&mut self, id: LoopId) -> Result<()> {
        self.loops.resume(id)
    }

    pub fn stop_loop(&mut self, id: LoopId) -> Result<()> {
        let scope = self.loops.scope_of(id).ok_or(ScrollSyncError::UnknownLoop(id))?;
        self.loops.stop(id, &mut self.store)?;
        self.scopes
            .forget(scope, |d| matches!(d, Disposable::Loop(l) if *l == id));
        self.pending_events.push(Event::LoopStopped { handle: id });
        Ok(())
    }

    pub fn loop_state(&self, id: LoopId) -> Option<LoopState> {
        self.loops.state(id)
    }

    // ---------- listeners ----------

    /// Per-frame scroll callback owned by `scope`. Skipped once the scope is gone.
    pub fn subscribe_scroll(
        &mut self,
        scope: ScopeId,
        mut cb: impl FnMut(&ScrollSample) + 'static,
    ) -> Result<SubscriptionId> {
        let live = self.liveness(scope).ok_or_else(|| self.scope_error(scope))?;
        let id = self.scroll.subscribe(move |s| {
            if live.is_live() {
                cb(s)
            }
        });
        self.scopes.add(scope, Part::Shared, Disposable::ScrollSubscription(id))?;
        Ok(id)
    }

    pub fn unsubscribe_scroll(&mut self, scope: ScopeId, id: SubscriptionId) -> Result<()> {
        if !self.scroll.unsubscribe(id) {
            return Err(ScrollSyncError::UnknownSubscription(id));
        }
        self.scopes
            .forget(scope, |d| matches!(d, Disposable::ScrollSubscription(s) if *s == id));
        Ok(())
    }

    pub fn on_breakpoint_change(
        &mut self,
        scope: ScopeId,
        mut cb: impl FnMut(&BreakpointState) + 'static,
    ) -> Result<SubscriptionId> {
        let live = self.liveness(scope).ok_or_else(|| self.scope_error(scope))?;
        let id = self.breakpoints.on_change(move |s| {
            if live.is_live() {
                cb(s)
            }
        });
        self.scopes.add(scope, Part::Shared, Disposable::BreakpointListener(id))?;
        Ok(id)
    }

    fn scope_error(&self, scope: ScopeId) -> ScrollSyncError {
        if self.scopes.is_retired(scope) {
            ScrollSyncError::ScopeDisposed(scope)
        } else {
            ScrollSyncError::UnknownScope(scope)
        }
    }

    /// Scroll subscribers plus breakpoint listeners.
    pub fn listener_count(&self) -> usize {
        self.scroll.subscriber_count() + self.breakpoints.listener_count()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            live_scopes: self.scopes.live_count(),
            timelines: self.timelines.len(),
            active_timelines: self.timelines.active_count(),
            loops: self.loops.len(),
            pins: self.pins.len(),
            spacers: self.pins.spacer_count(),
            styled_nodes: self.store.node_count(),
            listeners: self.listener_count(),
        }
    }

    // ---------- views ----------

    /// Build a view's shared part plus the variant for the current breakpoint.
    pub fn mount_view(&mut self, root: NodeId, definition: ViewDefinition) -> Result<ScopeId> {
        definition.validate()?;
        self.sync_breakpoint();
        let scope = self.create_scope(root);
        let variant = self.breakpoint_name();
        self.views.insert(
            scope,
            MountedView {
                scope,
                root,
                definition: definition.clone(),
                variant: None,
            },
        );
        let built = self.build_part(scope, Part::Shared, &definition.shared).and_then(|_| {
            match variant.as_deref().and_then(|bp| definition.variant(bp)) {
                Some(part) => self.build_part(scope, Part::Variant, part),
                None => Ok(()),
            }
        });
        if let Err(e) = built {
            let _ = self.dispose_scope_inner(scope);
            return Err(e);
        }
        if let Some(view) = self.views.get_mut(&scope) {
            view.variant = variant;
        }
        debug!("view '{}' mounted in {:?}", definition.name, scope);
        Ok(scope)
    }

    pub fn unmount_view(&mut self, scope: ScopeId) -> Result<StyleBatch> {
        self.dispose_scope(scope)
    }

    pub fn mounted_view(&self, scope: ScopeId) -> Option<&MountedView> {
        self.views.get(&scope)
    }

    fn build_part(&mut self, scope: ScopeId, part: Part, config: &VariantConfig) -> Result<()> {
        for tl in &config.timelines {
            self.create_timeline_in(scope, part, tl.clone())?;
        }
        for lp in &config.loops {
            self.start_loop_in(scope, part, lp)?;
        }
        Ok(())
    }

    fn breakpoint_name(&self) -> Option<String> {
        self.breakpoints.current().map(|s| s.name.clone())
    }

    /// Settle the breakpoint for the recorded viewport when nothing is pending.
    fn sync_breakpoint(&mut self) {
        let Some(vp) = self.viewport else {
            return;
        };
        if self.breakpoints.has_pending() {
            return;
        }
        let wanted = self.breakpoints.evaluate(vp.width);
        if self.breakpoints.current() == Some(&wanted) {
            return;
        }
        let from = self.breakpoint_name();
        self.breakpoints.resize(vp.width, 0.0);
        if let Some(state) = self.breakpoints.flush() {
            self.switch_variants(from, state);
        }
    }

    fn switch_variants(&mut self, from: Option<String>, to: BreakpointState) {
        debug!("breakpoint {:?} -> {}", from, to.name);
        self.pending_events.push(Event::BreakpointChanged {
            from,
            to: to.name.clone(),
        });
        self.invalidate_layout();
        self.rebuild_variants();
    }

    /// Dispose every mounted view's variant part and build the one for the current breakpoint.
    fn rebuild_variants(&mut self) {
        let name = self.breakpoint_name();
        let scopes: Vec<ScopeId> = self.views.keys().copied().collect();
        for scope in scopes {
            for d in self.scopes.take_part(scope, Some(Part::Variant)) {
                self.run_disposable(d);
            }
            let next = self.views.get(&scope).and_then(|v| {
                name.as_deref()
                    .and_then(|bp| v.definition.variant(bp))
                    .cloned()
            });
            if let Some(part) = next {
                if let Err(e) = self.build_part(scope, Part::Variant, &part) {
                    warn!("variant rebuild failed for {:?}: {}", scope, e);
                }
            }
            if let Some(view) = self.views.get_mut(&scope) {
                view.variant = name.clone();
            }
        }
    }

    // ---------- frame ----------

    /// Style ops produced outside a frame (disposal) and not yet handed out.
    pub fn take_pending(&mut self) -> StyleBatch {
        self.pending.take()
    }

    /// Advance one frame and return what the host must apply.
    pub fn frame(&mut self, input: FrameInput, layout: &dyn LayoutSource) -> &FrameOutput {
        self.output.clear();
        let now = input.now_s;
        if let Some(vp) = input.viewport {
            self.resize(vp, now);
        }

        let sample = self.scroll.frame(now, input.native_scroll);
        let dt = self.scroll.last_dt();
        self.output.sample = sample;

        let from = self.breakpoint_name();
        if let Some(state) = self.breakpoints.poll(now) {
            self.switch_variants(from, state);
        }

        self.step_timelines(sample.offset, dt, layout);
        self.loops.tick(dt, &mut self.store);
        self.store.flush(layout, &mut self.pending);

        self.output.styles = self.pending.take();
        self.output.events = std::mem::take(&mut self.pending_events);
        &self.output
    }

    fn step_timelines(&mut self, offset: f32, dt: f32, layout: &dyn LayoutSource) {
        let viewport = self.viewport.unwrap_or_default();
        let generation = self.generation;
        for id in self.timelines.ids() {
            let scope = match self.timelines.get(id) {
                Some(tl) => tl.scope,
                None => continue,
            };
            if !self.is_ready(scope) {
                continue;
            }

            let Engine {
                timelines,
                pins,
                ids,
                store,
                pending,
                pending_events,
                ..
            } = self;
            let Some(tl) = timelines.get_mut(id) else {
                continue;
            };
            let mut sink = PinSink {
                ids,
                store,
                batch: pending,
                events: pending_events,
            };

            // Geometry from an older layout: release the pin and every
            // animated channel this frame, measure next frame once the host
            // has put the element back in flow.
            if tl.generation().is_some_and(|g| g != generation) {
                let owner = Owner::Timeline(id);
                let stale_pin = pins.is_stale(id, generation);
                if stale_pin || sink.store.has_writes(owner) {
                    if stale_pin {
                        warn!("stale pin rectangle for {:?}, re-pinning", id);
                        pins.release(id, &mut sink);
                        sink.events.push(Event::StaleRectangle {
                            timeline: id,
                            generation,
                        });
                    }
                    sink.store.release_owner(owner);
                    continue;
                }
            }

            if tl.generation() != Some(generation) {
                let ctx = MeasureContext::new(layout, viewport);
                if let Err(e) = measure_timeline(tl, pins, &ctx, generation) {
                    let (node, kind) = match e {
                        ScrollSyncError::Measurement { node, kind } => (node, kind),
                        other => {
                            warn!("measuring {:?} failed: {}", id, other);
                            (tl.config.trigger, MeasurementErrorKind::Missing)
                        }
                    };
                    suspend(tl, node, kind, pins, &mut sink);
                    continue;
                }
                if !matches!(tl.state(), TimelineState::Active) {
                    tl.set_state(TimelineState::Active);
                    debug!("timeline {:?} active [{}, {}]", id, tl.start_offset(), tl.end_offset());
                    sink.events.push(Event::TimelineActivated { timeline: id });
                }
            }

            if !matches!(tl.state(), TimelineState::Active) {
                continue;
            }
            let trigger = tl.config.trigger;
            if !layout.is_connected(trigger) {
                suspend(tl, trigger, MeasurementErrorKind::Missing, pins, &mut sink);
                continue;
            }

            let p = tl.advance(offset, dt);
            if tl.pinned() {
                pins.update(id, tl.raw_progress(), &mut sink);
            }
            write_tracks(tl, p, sink.store);
        }
    }
}

fn measure_timeline(
    tl: &mut Timeline,
    pins: &mut PinController,
    ctx: &MeasureContext<'_>,
    generation: u64,
) -> Result<()> {
    tl.measure(ctx, generation)?;
    if tl.pinned() {
        let node = tl.config.pin_node();
        let rect = ctx.layout.rect(node).ok_or(ScrollSyncError::Measurement {
            node,
            kind: MeasurementErrorKind::Missing,
        })?;
        pins.measure(tl.id, node, rect, tl.start_offset(), generation);
    }
    Ok(())
}

/// Park a timeline until the next layout generation. Its styles and pin are released.
fn suspend(
    tl: &mut Timeline,
    node: NodeId,
    kind: MeasurementErrorKind,
    pins: &mut PinController,
    sink: &mut PinSink<'_>,
) {
    warn!("timeline {:?} suspended: {:?} is {}", tl.id, node, kind);
    tl.set_state(TimelineState::Suspended(kind));
    pins.remove(tl.id, sink);
    sink.store.release_owner(Owner::Timeline(tl.id));
    sink.events.push(Event::TimelineSuspended {
        timeline: tl.id,
        node,
        reason: kind,
    });
}

fn write_tracks(tl: &Timeline, p: f32, store: &mut StyleStore) {
    let targets = tl.config.target_nodes();
    let count = targets.len();
    let owner = Owner::Timeline(tl.id);
    for (i, node) in targets.into_iter().enumerate() {
        let local = stagger_progress(p, i, count, tl.config.stagger);
        for track in tl.tracks() {
            if let Some(value) = sample_track(track, local) {
                store.write(node, owner, &track.property, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryDocument, Rect};
    use crate::timeline::{Edge, EndSpec, Keyframe, TriggerPoint};
    use crate::value::StyleValue;

    fn engine() -> Engine {
        let cfg = Config {
            smoothing_decay_s: 0.0,
            require_layout_ready: false,
            ..Config::default()
        };
        let mut e = Engine::new(cfg).unwrap();
        e.set_viewport(Viewport::new(1000.0, 800.0));
        e
    }

    fn fade(trigger: NodeId) -> TimelineConfig {
        TimelineConfig::new(
            trigger,
            TriggerPoint::new(Edge::Top, Edge::Top),
            EndSpec::At(TriggerPoint::new(Edge::Bottom, Edge::Top)),
        )
        .keyframe(Keyframe::new(0.0).with("opacity", StyleValue::Number(0.0)))
        .keyframe(Keyframe::new(1.0).with("opacity", StyleValue::Number(1.0)))
    }

    #[test]
    fn created_timeline_activates_on_first_frame() {
        let mut doc = MemoryDocument::new();
        doc.insert(NodeId(1), Rect::new(0.0, 1000.0, 1000.0, 400.0));
        let mut e = engine();
        let scope = e.create_scope(NodeId(0));
        let tl = e.create_timeline(scope, fade(NodeId(1))).unwrap();
        assert_eq!(e.timeline_state(tl).unwrap(), TimelineState::Created);

        let out = e.frame(FrameInput::new(0.0, 1200.0), &doc).clone();
        doc.apply(&out.styles);
        assert_eq!(e.timeline_state(tl).unwrap(), TimelineState::Active);
        assert_eq!(doc.style(NodeId(1), "opacity"), Some("0.5"));
        assert!(out
            .events
            .iter()
            .any(|ev| matches!(ev, Event::TimelineActivated { .. })));
    }

    #[test]
    fn waits_for_layout_ready_signal() {
        let mut doc = MemoryDocument::new();
        doc.insert(NodeId(1), Rect::new(0.0, 0.0, 1000.0, 400.0));
        let mut e = Engine::new(Config::default()).unwrap();
        let scope = e.create_scope(NodeId(0));
        let tl = e.create_timeline(scope, fade(NodeId(1))).unwrap();
        e.frame(FrameInput::new(0.0, 0.0), &doc);
        assert_eq!(e.timeline_state(tl).unwrap(), TimelineState::Created);
        e.mark_layout_ready(scope).unwrap();
        e.frame(FrameInput::new(0.016, 0.0), &doc);
        assert_eq!(e.timeline_state(tl).unwrap(), TimelineState::Active);
    }

    #[test]
    fn detached_trigger_suspends_without_error() {
        let mut doc = MemoryDocument::new();
        doc.insert(NodeId(1), Rect::new(0.0, 0.0, 1000.0, 400.0));
        let mut e = engine();
        let scope = e.create_scope(NodeId(0));
        let tl = e.create_timeline(scope, fade(NodeId(1))).unwrap();
        e.frame(FrameInput::new(0.0, 100.0), &doc);
        doc.remove(NodeId(1));
        let out = e.frame(FrameInput::new(0.016, 100.0), &doc).clone();
        assert_eq!(
            e.timeline_state(tl).unwrap(),
            TimelineState::Suspended(MeasurementErrorKind::Missing)
        );
        assert!(out
            .events
            .iter()
            .any(|ev| matches!(ev, Event::TimelineSuspended { .. })));
        // not retried on later frames
        let out = e.frame(FrameInput::new(0.032, 100.0), &doc);
        assert!(out.events.is_empty());
    }

    #[test]
    fn disposed_handles_report_disposed() {
        let mut e = engine();
        let scope = e.create_scope(NodeId(0));
        let tl = e.create_timeline(scope, fade(NodeId(1))).unwrap();
        e.dispose_scope(scope).unwrap();
        assert_eq!(e.timeline_state(tl).unwrap(), TimelineState::Disposed);
        assert!(matches!(
            e.create_timeline(scope, fade(NodeId(1))),
            Err(ScrollSyncError::ScopeDisposed(_))
        ));
        assert!(matches!(
            e.dispose_scope(ScopeId(99)),
            Err(ScrollSyncError::UnknownScope(_))
        ));
    }

    #[test]
    fn handle_status_survives_many_remounts() {
        let mut e = engine();
        let mut old = Vec::new();
        for _ in 0..50 {
            let scope = e.create_scope(NodeId(0));
            old.push((scope, e.create_timeline(scope, fade(NodeId(1))).unwrap()));
        }
        let (last_scope, last_tl) = old.pop().unwrap();
        for (scope, tl) in old {
            assert_eq!(e.timeline_state(tl).unwrap(), TimelineState::Disposed);
            assert!(e.dispose_scope(scope).unwrap().is_empty());
        }
        assert_eq!(e.timeline_state(last_tl).unwrap(), TimelineState::Created);
        assert!(e.mark_layout_ready(last_scope).is_ok());
        assert!(matches!(
            e.timeline_state(TimelineId(last_tl.0 + 1)),
            Err(ScrollSyncError::UnknownTimeline(_))
        ));
    }

    #[test]
    fn recreating_scope_for_root_disposes_previous() {
        let mut e = engine();
        let a = e.create_scope(NodeId(5));
        let live = e.liveness(a).unwrap();
        let b = e.create_scope(NodeId(5));
        assert_ne!(a, b);
        assert!(!live.is_live());
        assert_eq!(e.stats().live_scopes, 1);
    }

    #[test]
    fn scroll_callbacks_are_scope_owned() {
        use std::cell::Cell;
        use std::rc::Rc;

        let doc = MemoryDocument::new();
        let mut e = engine();
        let scope = e.create_scope(NodeId(0));
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        e.subscribe_scroll(scope, move |_| h.set(h.get() + 1)).unwrap();
        e.on_breakpoint_change(scope, |_| {}).unwrap();
        assert_eq!(e.listener_count(), 2);
        e.frame(FrameInput::new(0.0, 0.0), &doc);
        e.dispose_scope(scope).unwrap();
        e.frame(FrameInput::new(0.016, 0.0), &doc);
        assert_eq!(hits.get(), 1);
        assert_eq!(e.listener_count(), 0);
    }
}
