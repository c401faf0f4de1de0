//! Pin controller: holds an element visually fixed across a scroll range.
//!
//! While a pinned timeline's raw progress is strictly inside (0,1) the pin
//! target is switched to fixed positioning at its pre-pin rectangle and a
//! spacer of the same size is inserted before it. At 0 or 1 the spacer is
//! removed and the pin's style channels are released, returning the element
//! to normal flow.

use indexmap::IndexMap;
use log::debug;

use crate::host::Rect;
use crate::ids::{IdAllocator, NodeId, TimelineId};
use crate::interp::{Owner, StyleStore};
use crate::outputs::{Event, StyleBatch, StyleOp};
use crate::value::StyleValue;

#[derive(Clone, Debug, PartialEq)]
pub struct PinState {
    pub node: NodeId,
    /// In-flow rectangle measured at `generation`.
    pub original_rect: Rect,
    /// Viewport-relative top while fixed.
    pub fixed_top: f32,
    pub spacer: Option<NodeId>,
    pub generation: u64,
}

impl PinState {
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.spacer.is_some()
    }
}

/// Frame-scoped outputs a pin transition writes into.
pub struct PinSink<'a> {
    pub ids: &'a mut IdAllocator,
    pub store: &'a mut StyleStore,
    pub batch: &'a mut StyleBatch,
    pub events: &'a mut Vec<Event>,
}

/// One [`PinState`] per pinned timeline.
#[derive(Debug, Default)]
pub struct PinController {
    pins: IndexMap<TimelineId, PinState>,
}

impl PinController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh pre-pin rectangle. Any previous state for `timeline`
    /// must already be released; a pinned state is never re-measured in place.
    pub fn measure(
        &mut self,
        timeline: TimelineId,
        node: NodeId,
        rect: Rect,
        start_offset: f32,
        generation: u64,
    ) {
        debug_assert!(!self.is_pinned(timeline));
        self.pins.insert(
            timeline,
            PinState {
                node,
                original_rect: rect,
                fixed_top: rect.top - start_offset,
                spacer: None,
                generation,
            },
        );
    }

    pub fn get(&self, timeline: TimelineId) -> Option<&PinState> {
        self.pins.get(&timeline)
    }

    pub fn is_pinned(&self, timeline: TimelineId) -> bool {
        self.pins.get(&timeline).is_some_and(PinState::is_pinned)
    }

    /// Pinned against a rectangle from an older layout generation.
    pub fn is_stale(&self, timeline: TimelineId, generation: u64) -> bool {
        self.pins
            .get(&timeline)
            .is_some_and(|s| s.is_pinned() && s.generation != generation)
    }

    /// Pin or unpin according to raw progress.
    pub fn update(&mut self, timeline: TimelineId, progress: f32, sink: &mut PinSink<'_>) {
        let Some(state) = self.pins.get_mut(&timeline) else {
            return;
        };
        let inside = progress > 0.0 && progress < 1.0;
        if inside && !state.is_pinned() {
            engage(timeline, state, sink);
        } else if !inside && state.is_pinned() {
            disengage(timeline, state, sink);
        }
    }

    /// Return the element to flow. Keeps the measured state.
    pub fn release(&mut self, timeline: TimelineId, sink: &mut PinSink<'_>) -> bool {
        match self.pins.get_mut(&timeline) {
            Some(state) if state.is_pinned() => {
                disengage(timeline, state, sink);
                true
            }
            _ => false,
        }
    }

    /// Release and forget. Used on timeline disposal.
    pub fn remove(&mut self, timeline: TimelineId, sink: &mut PinSink<'_>) {
        self.release(timeline, sink);
        self.pins.shift_remove(&timeline);
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn spacer_count(&self) -> usize {
        self.pins.values().filter(|s| s.is_pinned()).count()
    }
}

fn engage(timeline: TimelineId, state: &mut PinState, sink: &mut PinSink<'_>) {
    let spacer = sink.ids.alloc_spacer();
    let r = state.original_rect;
    sink.batch.push(StyleOp::InsertSpacer {
        spacer,
        before: state.node,
        width: r.width,
        height: r.height,
    });
    let owner = Owner::Pin(timeline);
    let node = state.node;
    sink.store
        .write(node, owner, "position", StyleValue::Keyword("fixed".into()));
    sink.store.write(node, owner, "top", StyleValue::Px(state.fixed_top));
    sink.store.write(node, owner, "left", StyleValue::Px(r.left));
    sink.store.write(node, owner, "width", StyleValue::Px(r.width));
    sink.store.write(node, owner, "height", StyleValue::Px(r.height));
    state.spacer = Some(spacer);
    debug!("pinned {:?} on {:?} with spacer {:?}", timeline, node, spacer);
    sink.events.push(Event::Pinned { timeline, spacer });
}

fn disengage(timeline: TimelineId, state: &mut PinState, sink: &mut PinSink<'_>) {
    if let Some(spacer) = state.spacer.take() {
        sink.batch.push(StyleOp::RemoveNode { node: spacer });
    }
    sink.store.release_owner(Owner::Pin(timeline));
    debug!("unpinned {:?}", timeline);
    sink.events.push(Event::Unpinned { timeline });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryDocument;

    struct Harness {
        ids: IdAllocator,
        store: StyleStore,
        batch: StyleBatch,
        events: Vec<Event>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                ids: IdAllocator::new(),
                store: StyleStore::new(),
                batch: StyleBatch::new(),
                events: Vec::new(),
            }
        }

        fn sink(&mut self) -> PinSink<'_> {
            PinSink {
                ids: &mut self.ids,
                store: &mut self.store,
                batch: &mut self.batch,
                events: &mut self.events,
            }
        }

        fn flush_into(&mut self, doc: &mut MemoryDocument) {
            self.store.flush(&*doc, &mut self.batch);
            doc.apply(&self.batch);
            self.batch.clear();
        }
    }

    const TL: TimelineId = TimelineId(7);

    #[test]
    fn pins_only_strictly_inside_range() {
        let mut doc = MemoryDocument::new();
        doc.insert(NodeId(1), Rect::new(0.0, 2000.0, 1000.0, 800.0));
        let mut h = Harness::new();
        let mut pins = PinController::new();
        pins.measure(TL, NodeId(1), Rect::new(0.0, 2000.0, 1000.0, 800.0), 2000.0, 0);

        pins.update(TL, 0.0, &mut h.sink());
        assert!(!pins.is_pinned(TL));

        pins.update(TL, 0.5, &mut h.sink());
        assert!(pins.is_pinned(TL));
        h.flush_into(&mut doc);
        assert_eq!(doc.style(NodeId(1), "position"), Some("fixed"));
        assert_eq!(doc.style(NodeId(1), "top"), Some("0px"));
        assert_eq!(doc.spacer_count(), 1);

        pins.update(TL, 1.0, &mut h.sink());
        assert!(!pins.is_pinned(TL));
        h.flush_into(&mut doc);
        assert_eq!(doc.spacer_count(), 0);
        assert_eq!(doc.style(NodeId(1), "position"), None);
    }

    #[test]
    fn round_trip_leaves_no_residue() {
        let mut doc = MemoryDocument::new();
        doc.insert(NodeId(1), Rect::new(10.0, 500.0, 300.0, 200.0));
        doc.set_inline(NodeId(1), "position", "relative");
        let before = doc.inline_styles(NodeId(1)).cloned();

        let mut h = Harness::new();
        let mut pins = PinController::new();
        pins.measure(TL, NodeId(1), Rect::new(10.0, 500.0, 300.0, 200.0), 500.0, 0);
        pins.update(TL, 0.3, &mut h.sink());
        h.flush_into(&mut doc);
        assert_eq!(doc.style(NodeId(1), "position"), Some("fixed"));

        pins.update(TL, 0.0, &mut h.sink());
        h.flush_into(&mut doc);
        assert_eq!(doc.inline_styles(NodeId(1)).cloned(), before);
        assert_eq!(doc.spacer_count(), 0);
        assert!(h.store.is_empty());
    }

    #[test]
    fn stale_generation_is_detected_only_while_pinned() {
        let mut h = Harness::new();
        let mut pins = PinController::new();
        pins.measure(TL, NodeId(1), Rect::new(0.0, 0.0, 10.0, 10.0), 0.0, 3);
        assert!(!pins.is_stale(TL, 4));
        pins.update(TL, 0.5, &mut h.sink());
        assert!(!pins.is_stale(TL, 3));
        assert!(pins.is_stale(TL, 4));
        assert!(pins.release(TL, &mut h.sink()));
        assert!(!pins.is_stale(TL, 4));
        assert!(!pins.release(TL, &mut h.sink()));
    }

    #[test]
    fn remove_drops_state_and_spacer() {
        let mut h = Harness::new();
        let mut pins = PinController::new();
        pins.measure(TL, NodeId(1), Rect::new(0.0, 0.0, 10.0, 10.0), 0.0, 0);
        pins.update(TL, 0.5, &mut h.sink());
        assert_eq!(pins.spacer_count(), 1);
        pins.remove(TL, &mut h.sink());
        assert!(pins.is_empty());
        assert!(h
            .batch
            .iter()
            .any(|op| matches!(op, StyleOp::RemoveNode { node } if node.is_spacer())));
    }
}
