//! Drag session controller.
//!
//! A [`DragSession`] owns one drag lifecycle for one pickup source: it asks
//! the source for items on pointer-down, hit-tests pointer movement against
//! the registered drop targets, resolves nested sub-targets, keeps the
//! hovered target informed, and dispatches the drop.
//!
//! Targets are capability objects: anything implementing [`DropTarget`] can
//! be registered, and every hook beyond geometry, filtering, and catching is
//! optional through default methods. A target may itself host nested drop
//! targets (a grid cell that is a target container) and exposes them through
//! [`DropTarget::sub_target_at`].
//!
//! # States
//!
//! `Idle → PickedUp → Dragging → {Dropped, Cancelled}`
//!
//! A session handles exactly one active drag: a pointer-down while a drag is
//! in flight is rejected outright. Releasing the pointer outside any valid
//! drop zone cancels the drag with no state mutation anywhere.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{OptionsError, OptionsResult};
use crate::geometry::{Point, Rect};
use crate::item::DragItem;

/// Bound on nested sub-target resolution. Real nesting is strictly
/// hierarchical and shallow; the bound only guards against malformed
/// configuration.
pub const MAX_NESTING_DEPTH: usize = 8;

/// Identity of a drag session, assigned by the embedder at construction.
///
/// Used to tell sessions apart in logs and by targets that care which
/// controller a drag originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionToken(pub u64);

/// A shared, lockable drop target.
pub type TargetHandle = Arc<Mutex<dyn DropTarget>>;

/// Capability interface for anything items can be picked up from or
/// dropped onto.
///
/// Only [`bounds`](Self::bounds), [`filter_items_for_drop`]
/// (Self::filter_items_for_drop) and [`catch_dropped_items`]
/// (Self::catch_dropped_items) carry behaviour a target must decide;
/// everything else defaults to a no-op.
pub trait DropTarget: Send {
    /// Page-space bounds of the drop area, used for hit-testing.
    fn bounds(&self) -> Rect;

    /// Veto for points inside [`bounds`](Self::bounds) that are
    /// nevertheless not droppable.
    fn is_valid_drop_zone(&self, _point: Point) -> bool {
        true
    }

    /// Items to pick up when a drag starts on this target. Empty means
    /// nothing to drag.
    fn pickup_items(&mut self) -> Vec<DragItem> {
        Vec::new()
    }

    /// Pre-validate items entering this target's airspace, e.g. to gray
    /// out incompatible ones.
    fn inspect_dragged_items(&mut self, _items: &mut Vec<DragItem>) {}

    /// A nested drop target under the given local point, if any.
    fn sub_target_at(&self, _local: Point) -> Option<TargetHandle> {
        None
    }

    /// Which of the dragged items this target would accept at the given
    /// local point. Items failing this are never removed from their origin.
    fn filter_items_for_drop(&self, items: &[DragItem], _local: Point) -> Vec<DragItem> {
        items.to_vec()
    }

    /// Hover notification while the pointer moves inside the target.
    fn on_dragging_over(&mut self, _local: Point) {}

    /// The pointer (or the drag) left the target.
    fn on_dragging_leave(&mut self) {}

    /// A drop this target participates in is starting.
    fn on_drag_drop_start(&mut self) {}

    /// A drop this target participates in has finished.
    fn on_drag_drop_end(&mut self) {}

    /// Origin-side hook before items land elsewhere: rewrite the pending
    /// list, typically removing the items from this origin and renumbering
    /// the rest. `into_self` is set when origin and destination are the
    /// same target.
    fn on_items_dropping(&mut self, _items: &mut Vec<DragItem>, _into_self: bool) {}

    /// Take ownership of dropped items at the given local point.
    fn catch_dropped_items(&mut self, items: Vec<DragItem>, local: Point);
}

/// Lifecycle state of a drag session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DragState {
    /// No drag in flight.
    #[default]
    Idle,
    /// Pointer went down on the source and items were picked up, but the
    /// pointer has not moved yet.
    PickedUp,
    /// The drag visual is live and following the pointer.
    Dragging,
    /// The last drag ended over a target.
    Dropped,
    /// The last drag ended outside any target, or was abandoned.
    Cancelled,
}

impl DragState {
    fn active(self) -> bool {
        matches!(self, DragState::PickedUp | DragState::Dragging)
    }
}

/// One drag lifecycle per pickup source.
pub struct DragSession {
    token: SessionToken,
    source: TargetHandle,
    state: DragState,
    targets: Vec<TargetHandle>,
    items: Vec<DragItem>,
    offset: Point,
    /// The currently hovered target and its bounds at hover time.
    over: Option<(TargetHandle, Rect)>,
}

impl DragSession {
    /// A session for the given pickup source.
    pub fn new(source: TargetHandle, token: SessionToken) -> Self {
        Self {
            token,
            source,
            state: DragState::Idle,
            targets: Vec::new(),
            items: Vec::new(),
            offset: Point::default(),
            over: None,
        }
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// The offset from the pointer to the dragged visual's top-left corner.
    pub fn drag_offset(&self) -> Point {
        self.offset
    }

    /// Items currently in flight.
    pub fn dragged_items(&self) -> &[DragItem] {
        &self.items
    }

    /// Register a drop target for hit-testing.
    pub fn register_target(&mut self, target: TargetHandle) -> OptionsResult<()> {
        if self.targets.iter().any(|t| Arc::ptr_eq(t, &target)) {
            return Err(OptionsError::TargetAlreadyRegistered);
        }
        self.targets.push(target);
        Ok(())
    }

    /// Remove a previously registered drop target.
    pub fn unregister_target(&mut self, target: &TargetHandle) -> OptionsResult<()> {
        let before = self.targets.len();
        self.targets.retain(|t| !Arc::ptr_eq(t, target));
        if self.targets.len() == before {
            return Err(OptionsError::TargetNotRegistered);
        }
        if let Some((over, _)) = &self.over {
            if Arc::ptr_eq(over, target) {
                self.over = None;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Pointer-down on the source: pick up the source's current items.
    ///
    /// Returns `false` when there is nothing to pick up, or when a drag is
    /// already in flight (a second pointer-down mid-drag is rejected and
    /// leaves the session untouched).
    pub fn pickup(&mut self, point: Point) -> bool {
        if self.state.active() {
            tracing::debug!(
                target: "strata_options::drag",
                token = self.token.0,
                state = ?self.state,
                "pickup rejected, drag already in flight"
            );
            return false;
        }

        let items = self.source.lock().pickup_items();
        if items.is_empty() {
            self.state = DragState::Idle;
            return false;
        }

        // offset = item whose top-left corner is nearest the pointer,
        // both deltas non-negative
        let mut best = -1.0f32;
        for item in &items {
            let corner = item.bounds.top_left();
            let dx = point.x - corner.x;
            let dy = point.y - corner.y;
            if dx >= 0.0 && dy >= 0.0 && (dx + dy < best || best < 0.0) {
                best = dx + dy;
                self.offset = Point::new(dx, dy);
            }
        }
        if best < 0.0 {
            self.offset = Point::default();
        }

        self.items = items;
        self.state = DragState::PickedUp;
        // track self-hover from the start
        self.set_over_target(self.source.clone(), point);
        tracing::debug!(
            target: "strata_options::drag",
            token = self.token.0,
            items = self.items.len(),
            "picked up items"
        );
        true
    }

    /// Pointer movement while a drag is in flight.
    pub fn drag_move(&mut self, point: Point) {
        if !self.state.active() {
            return;
        }
        self.state = DragState::Dragging;

        self.determine_target(point);

        let hovered = self.fire_dragging(point);
        if let Some(target) = hovered {
            match self.resolve_target(target, point) {
                Ok(resolved) => {
                    let is_current = self
                        .over
                        .as_ref()
                        .is_some_and(|(t, _)| Arc::ptr_eq(t, &resolved));
                    if !is_current {
                        self.set_over_target(resolved, point);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        target: "strata_options::drag",
                        token = self.token.0,
                        %err,
                        "sub-target resolution aborted"
                    );
                }
            }
        }
    }

    /// Pointer-up: drop onto the hovered target, or cancel.
    ///
    /// Returns `true` when items were delivered to a target.
    pub fn drop_items(&mut self, point: Point) -> bool {
        if !self.state.active() {
            return false;
        }

        let mut delivered = false;
        if self.state == DragState::Dragging {
            let over = self.over.clone();
            if let Some((target, bounds)) = over {
                if self.still_over(&target, bounds, point) {
                    delivered = self.drop_into_target(&target, bounds, point);
                    self.state = DragState::Dropped;
                } else {
                    self.cancel_hover();
                    self.state = DragState::Cancelled;
                }
            } else {
                self.state = DragState::Cancelled;
            }
        } else {
            // released before any movement: a click, not a drag
            self.cancel_hover();
            self.state = DragState::Cancelled;
        }

        if self.state == DragState::Cancelled {
            tracing::debug!(
                target: "strata_options::drag",
                token = self.token.0,
                "drag cancelled, no mutation"
            );
        }
        self.items.clear();
        self.over = None;
        delivered
    }

    /// Abandon the drag without dropping.
    pub fn cancel(&mut self) {
        if !self.state.active() {
            return;
        }
        self.cancel_hover();
        self.items.clear();
        self.over = None;
        self.state = DragState::Cancelled;
        tracing::debug!(target: "strata_options::drag", token = self.token.0, "drag cancelled");
    }

    // =========================================================================
    // Hit-testing
    // =========================================================================

    /// Scan the registered targets when the pointer is not over the current
    /// one. Used where native enter/leave notifications are unavailable.
    fn determine_target(&mut self, point: Point) {
        let over_current = self
            .over
            .clone()
            .is_some_and(|(t, bounds)| self.still_over(&t, bounds, point));
        if over_current {
            return;
        }

        for target in self.targets.clone() {
            let bounds = target.lock().bounds();
            if !bounds.contains(point) {
                continue;
            }
            if !target.lock().is_valid_drop_zone(point) {
                continue;
            }
            let is_current = self
                .over
                .as_ref()
                .is_some_and(|(t, _)| Arc::ptr_eq(t, &target));
            if !is_current {
                self.set_over_target(target, point);
            }
            break;
        }
    }

    /// Notify the hovered target of pointer movement inside it. Returns the
    /// target the pointer is still over, if any.
    fn fire_dragging(&mut self, point: Point) -> Option<TargetHandle> {
        let (target, bounds) = self.over.clone()?;
        if !self.still_over(&target, bounds, point) {
            return None;
        }
        target.lock().on_dragging_over(bounds.to_local(point));
        Some(target)
    }

    /// Descend through nested sub-targets to the most specific target under
    /// the pointer, bounded by [`MAX_NESTING_DEPTH`].
    fn resolve_target(&self, target: TargetHandle, point: Point) -> OptionsResult<TargetHandle> {
        let mut current = target;
        for _ in 0..=MAX_NESTING_DEPTH {
            let sub = {
                let guard = current.lock();
                let local = guard.bounds().to_local(point);
                guard.sub_target_at(local)
            };
            match sub {
                Some(next) => current = next,
                None => return Ok(current),
            }
        }
        Err(OptionsError::NestingTooDeep {
            max: MAX_NESTING_DEPTH,
        })
    }

    /// Make a target the hovered one, letting it inspect the dragged items
    /// and notifying the previous target that the drag left it.
    fn set_over_target(&mut self, target: TargetHandle, _point: Point) {
        if self.state == DragState::Dragging {
            let mut items = std::mem::take(&mut self.items);
            target.lock().inspect_dragged_items(&mut items);
            self.items = items;
        }

        let bounds = target.lock().bounds();

        if let Some((prev, _)) = &self.over {
            if !Arc::ptr_eq(prev, &target) {
                prev.lock().on_dragging_leave();
            }
        }
        self.over = Some((target, bounds));
    }

    fn still_over(&self, target: &TargetHandle, bounds: Rect, point: Point) -> bool {
        bounds.contains(point) && target.lock().is_valid_drop_zone(point)
    }

    fn cancel_hover(&mut self) {
        if let Some((target, _)) = &self.over {
            target.lock().on_dragging_leave();
        }
    }

    // =========================================================================
    // Drop dispatch
    // =========================================================================

    /// The full drop pipeline: filter, start hooks, origin rewrite, catch,
    /// end hooks, leave. An empty filter result is a silent no-op that
    /// mutates nothing on either side.
    fn drop_into_target(&mut self, target: &TargetHandle, bounds: Rect, point: Point) -> bool {
        let local = bounds.to_local(point);
        let mut to_drop = target.lock().filter_items_for_drop(&self.items, local);
        if to_drop.is_empty() {
            tracing::debug!(
                target: "strata_options::drag",
                token = self.token.0,
                "target rejected all items"
            );
            return false;
        }

        let into_self = Arc::ptr_eq(target, &self.source);

        target.lock().on_drag_drop_start();
        if !into_self {
            self.source.lock().on_drag_drop_start();
        }

        self.source.lock().on_items_dropping(&mut to_drop, into_self);
        target.lock().catch_dropped_items(to_drop, local);

        target.lock().on_drag_drop_end();
        if !into_self {
            self.source.lock().on_drag_drop_end();
        }

        target.lock().on_dragging_leave();
        tracing::debug!(
            target: "strata_options::drag",
            token = self.token.0,
            "items dropped"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormattedValue;

    struct TestZone {
        name: &'static str,
        bounds: Rect,
        valid: bool,
        supply: Vec<DragItem>,
        caught: Vec<DragItem>,
        sub: Option<TargetHandle>,
        accept_drops: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl TestZone {
        fn new(name: &'static str, bounds: Rect, log: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                bounds,
                valid: true,
                supply: Vec::new(),
                caught: Vec::new(),
                sub: None,
                accept_drops: true,
                log,
            }
        }

        fn push(&self, event: &str) {
            self.log.lock().push(format!("{}:{}", self.name, event));
        }
    }

    impl DropTarget for TestZone {
        fn bounds(&self) -> Rect {
            self.bounds
        }

        fn is_valid_drop_zone(&self, _point: Point) -> bool {
            self.valid
        }

        fn pickup_items(&mut self) -> Vec<DragItem> {
            self.supply.clone()
        }

        fn sub_target_at(&self, _local: Point) -> Option<TargetHandle> {
            self.sub.clone()
        }

        fn filter_items_for_drop(&self, items: &[DragItem], _local: Point) -> Vec<DragItem> {
            if self.accept_drops {
                items.to_vec()
            } else {
                Vec::new()
            }
        }

        fn on_dragging_over(&mut self, _local: Point) {
            self.push("over");
        }

        fn on_dragging_leave(&mut self) {
            self.push("leave");
        }

        fn on_drag_drop_start(&mut self) {
            self.push("start");
        }

        fn on_drag_drop_end(&mut self) {
            self.push("end");
        }

        fn on_items_dropping(&mut self, _items: &mut Vec<DragItem>, _into_self: bool) {
            self.push("dropping");
        }

        fn catch_dropped_items(&mut self, items: Vec<DragItem>, _local: Point) {
            self.push("catch");
            self.caught = items;
        }
    }

    fn item_at(name: &str, x: f32, y: f32) -> DragItem {
        DragItem::new(FormattedValue::variable(name)).with_bounds(Rect::new(x, y, 50.0, 20.0))
    }

    fn session_with(
        source_items: Vec<DragItem>,
    ) -> (DragSession, Arc<Mutex<TestZone>>, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut source = TestZone::new("source", Rect::new(0.0, 0.0, 100.0, 100.0), log.clone());
        source.supply = source_items;
        let source = Arc::new(Mutex::new(source));
        let handle: TargetHandle = source.clone();
        let session = DragSession::new(handle, SessionToken(1));
        (session, source, log)
    }

    #[test]
    fn test_pickup_with_no_items_stays_idle() {
        let (mut session, _, _) = session_with(Vec::new());
        assert!(!session.pickup(Point::new(5.0, 5.0)));
        assert_eq!(session.state(), DragState::Idle);
    }

    #[test]
    fn test_pickup_offset_minimizes_corner_distance() {
        let items = vec![item_at("a", 0.0, 0.0), item_at("b", 0.0, 20.0)];
        let (mut session, _, _) = session_with(items);
        // pointer at (10, 25): corner of b is (0,20), deltas (10,5); corner
        // of a gives (10,25)
        assert!(session.pickup(Point::new(10.0, 25.0)));
        assert_eq!(session.drag_offset(), Point::new(10.0, 5.0));
        assert_eq!(session.state(), DragState::PickedUp);
    }

    #[test]
    fn test_second_pickup_mid_drag_is_rejected() {
        let (mut session, _, _) = session_with(vec![item_at("a", 0.0, 0.0)]);
        assert!(session.pickup(Point::new(5.0, 5.0)));
        session.drag_move(Point::new(10.0, 10.0));
        assert_eq!(session.state(), DragState::Dragging);

        assert!(!session.pickup(Point::new(5.0, 5.0)));
        assert_eq!(session.state(), DragState::Dragging);
        assert_eq!(session.dragged_items().len(), 1);
    }

    #[test]
    fn test_drop_pipeline_order() {
        let (mut session, _source, log) = session_with(vec![item_at("a", 0.0, 0.0)]);
        let target = Arc::new(Mutex::new(TestZone::new(
            "target",
            Rect::new(200.0, 0.0, 100.0, 100.0),
            log.clone(),
        )));
        session.register_target(target.clone()).unwrap();

        assert!(session.pickup(Point::new(5.0, 5.0)));
        session.drag_move(Point::new(250.0, 50.0));
        assert!(session.drop_items(Point::new(250.0, 50.0)));
        assert_eq!(session.state(), DragState::Dropped);
        assert_eq!(target.lock().caught.len(), 1);

        let log = log.lock();
        let drop_events: Vec<&str> = log
            .iter()
            .map(String::as_str)
            .filter(|e| !e.ends_with(":over"))
            .collect();
        assert_eq!(
            drop_events,
            vec![
                "source:leave", // hover moved from source to target
                "target:start",
                "source:start",
                "source:dropping",
                "target:catch",
                "target:end",
                "source:end",
                "target:leave",
            ]
        );
    }

    #[test]
    fn test_rejecting_target_leaves_state_untouched() {
        let (mut session, _, log) = session_with(vec![item_at("a", 0.0, 0.0)]);
        let target = Arc::new(Mutex::new(TestZone::new(
            "target",
            Rect::new(200.0, 0.0, 100.0, 100.0),
            log.clone(),
        )));
        target.lock().accept_drops = false;
        session.register_target(target.clone()).unwrap();

        session.pickup(Point::new(5.0, 5.0));
        session.drag_move(Point::new(250.0, 50.0));
        assert!(!session.drop_items(Point::new(250.0, 50.0)));
        assert!(target.lock().caught.is_empty());
        assert!(!log.lock().iter().any(|e| e.contains("catch")));
    }

    #[test]
    fn test_release_outside_targets_cancels() {
        let (mut session, _, _) = session_with(vec![item_at("a", 0.0, 0.0)]);
        session.pickup(Point::new(5.0, 5.0));
        session.drag_move(Point::new(500.0, 500.0));
        assert!(!session.drop_items(Point::new(500.0, 500.0)));
        assert_eq!(session.state(), DragState::Cancelled);
        assert!(session.dragged_items().is_empty());
    }

    #[test]
    fn test_release_without_movement_is_not_a_drop() {
        let (mut session, source, _) = session_with(vec![item_at("a", 0.0, 0.0)]);
        session.pickup(Point::new(5.0, 5.0));
        assert!(!session.drop_items(Point::new(5.0, 5.0)));
        assert_eq!(session.state(), DragState::Cancelled);
        assert!(source.lock().caught.is_empty());
    }

    #[test]
    fn test_sub_target_resolution() {
        let (mut session, _, log) = session_with(vec![item_at("a", 0.0, 0.0)]);
        let inner = Arc::new(Mutex::new(TestZone::new(
            "inner",
            Rect::new(220.0, 20.0, 40.0, 40.0),
            log.clone(),
        )));
        let outer = Arc::new(Mutex::new(TestZone::new(
            "outer",
            Rect::new(200.0, 0.0, 100.0, 100.0),
            log.clone(),
        )));
        outer.lock().sub = Some(inner.clone());
        session.register_target(outer.clone()).unwrap();

        session.pickup(Point::new(5.0, 5.0));
        session.drag_move(Point::new(230.0, 30.0));
        session.drag_move(Point::new(231.0, 31.0));
        assert!(session.drop_items(Point::new(231.0, 31.0)));
        assert_eq!(inner.lock().caught.len(), 1);
        assert!(outer.lock().caught.is_empty());
    }

    #[test]
    fn test_cyclic_sub_targets_hit_depth_guard() {
        let (mut session, _, log) = session_with(vec![item_at("a", 0.0, 0.0)]);
        let outer = Arc::new(Mutex::new(TestZone::new(
            "outer",
            Rect::new(200.0, 0.0, 100.0, 100.0),
            log.clone(),
        )));
        // malformed configuration: target resolves to itself
        outer.lock().sub = Some(outer.clone());
        session.register_target(outer.clone()).unwrap();

        session.pickup(Point::new(5.0, 5.0));
        // must terminate rather than loop
        session.drag_move(Point::new(250.0, 50.0));
        assert_eq!(session.state(), DragState::Dragging);
    }

    #[test]
    fn test_register_target_twice_fails() {
        let (mut session, _, log) = session_with(Vec::new());
        let target = Arc::new(Mutex::new(TestZone::new(
            "target",
            Rect::new(0.0, 0.0, 10.0, 10.0),
            log,
        )));
        session.register_target(target.clone()).unwrap();
        assert!(matches!(
            session.register_target(target.clone()),
            Err(OptionsError::TargetAlreadyRegistered)
        ));
        session.unregister_target(&(target as TargetHandle)).unwrap();
    }
}
