//! The transfer model: one supplier, its target lists, and the movement of
//! values between them.
//!
//! [`TransferModel`] owns the pool and the lists and is the only place
//! values move through, whether by add-button click or by drag and drop.
//! Every entry point runs inside an edit scope that suspends supplier
//! filtering until the batch completes, so a ten-item transfer repaints the
//! pool once.
//!
//! [`SupplierSource`] and [`TargetDropZone`] adapt a shared model to the
//! drag controller's [`DropTarget`](crate::drag::DropTarget) interface. The
//! embedding UI owns their geometry and feeds measured rectangles in.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::drag::{DropTarget, TargetHandle};
use crate::error::{OptionsError, OptionsResult};
use crate::format::{Format, FormattedValue};
use crate::geometry::{Point, Rect};
use crate::item::DragItem;
use strata_core::Signal;

use super::interactions::interactions;
use super::supplier::Supplier;
use super::target::{AddOutcome, DropOverflow, TargetList, TransferAction};

/// Hook for embedder-side rewriting of items about to enter a target.
pub type PreprocessHook = Box<dyn Fn(&mut Vec<DragItem>) + Send + Sync>;

pub struct TransferModel {
    supplier: Supplier,
    targets: Vec<TargetList>,
    edit_depth: usize,
    preprocess: Option<PreprocessHook>,
    /// Values no list could take: the originating list was full, its
    /// overflow policy was exhausted, and no sibling had space.
    pub dropped_overflow: Signal<Vec<FormattedValue>>,
}

impl TransferModel {
    pub fn new(supplier: Supplier) -> Self {
        Self {
            supplier,
            targets: Vec::new(),
            edit_depth: 0,
            preprocess: None,
            dropped_overflow: Signal::new(),
        }
    }

    pub fn supplier(&self) -> &Supplier {
        &self.supplier
    }

    pub fn supplier_mut(&mut self) -> &mut Supplier {
        &mut self.supplier
    }

    /// Add a target list. Registration order decides the overflow cascade.
    pub fn register_target(&mut self, target: TargetList) -> usize {
        self.targets.push(target);
        self.targets.len() - 1
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// More than one target changes interaction affordances, e.g.
    /// double-click-to-transfer is suppressed as ambiguous.
    pub fn is_multi_target(&self) -> bool {
        self.targets.len() > 1
    }

    pub fn target(&self, index: usize) -> OptionsResult<&TargetList> {
        self.targets.get(index).ok_or(OptionsError::TargetIndexOutOfRange {
            index,
            count: self.targets.len(),
        })
    }

    pub fn target_mut(&mut self, index: usize) -> OptionsResult<&mut TargetList> {
        let count = self.targets.len();
        self.targets
            .get_mut(index)
            .ok_or(OptionsError::TargetIndexOutOfRange { index, count })
    }

    /// Install a rewrite hook applied to items before the permitted and
    /// duplicate filters.
    pub fn set_preprocess(&mut self, hook: PreprocessHook) {
        self.preprocess = Some(hook);
    }

    // =========================================================================
    // Edit scope
    // =========================================================================

    /// Open a batch: supplier filtering is suspended until the matching
    /// [`end_edit`](Self::end_edit). Scopes nest.
    pub fn begin_edit(&mut self) {
        if self.edit_depth == 0 {
            self.supplier.set_block_filter(true);
        }
        self.edit_depth += 1;
    }

    /// Close a batch; the outermost close runs one filter pass.
    pub fn end_edit(&mut self) {
        if self.edit_depth == 0 {
            return;
        }
        self.edit_depth -= 1;
        if self.edit_depth == 0 {
            self.supplier.set_block_filter(false);
            self.supplier.filter_supplier_list(true);
        }
    }

    pub fn run_in_edit_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_edit();
        let result = f(self);
        self.end_edit();
        result
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// The supplier's selected items as drag items.
    ///
    /// When the model has exactly one target and that target holds a single
    /// value, only the first selected item travels; anything beyond it could
    /// never land.
    pub fn supplier_items(&self) -> Vec<DragItem> {
        let mut items: Vec<DragItem> = self
            .supplier
            .selection()
            .iter()
            .filter_map(|&i| self.supplier.item(i))
            .map(|item| DragItem::new(item.value.clone()).with_properties(item.properties))
            .collect();
        if self.targets.len() == 1 && self.targets[0].is_single_item() {
            items.truncate(1);
        }
        items
    }

    /// Target rows as drag items, for picking up out of a list.
    pub fn target_items(&self, index: usize) -> OptionsResult<Vec<DragItem>> {
        let target = self.target(index)?;
        Ok(target
            .items()
            .iter()
            .enumerate()
            .map(|(row, value)| {
                let (value, power) = match target.format() {
                    Format::Variable => match value.as_uniform_variable() {
                        Some((name, power)) if value.format() == Format::Term => {
                            (FormattedValue::variable(name), power)
                        }
                        _ => (value.clone(), 1),
                    },
                    Format::Term => (value.clone(), 1),
                };
                DragItem::new(value)
                    .with_properties(crate::item::ItemProperties::with_power(power))
                    .with_source_index(row)
            })
            .collect())
    }

    /// Items rendered into the values a target would store, with the
    /// target's transfer action applied.
    pub fn items_to_values(&self, items: &[DragItem], target_index: usize) -> Vec<FormattedValue> {
        let Ok(target) = self.target(target_index) else {
            return Vec::new();
        };
        apply_transfer_action(target.transfer_action(), items, target.format())
    }

    /// Drop the hook-rewritten, non-permitted, and duplicate items.
    ///
    /// `into_self` bypasses everything: reordering a list against itself is
    /// always legal. A row moved within one list matches its own old
    /// position rather than counting as a duplicate.
    pub fn preprocess_items(&self, items: &mut Vec<DragItem>, target_index: usize, into_self: bool) {
        if into_self {
            return;
        }
        if let Some(hook) = &self.preprocess {
            hook(items);
        }
        items.retain(|item| item.properties.permitted);
        if let Ok(target) = self.target(target_index) {
            items.retain(|item| {
                let converted = item.value.convert(target.format(), item.properties.power);
                if target.test_value(&converted) {
                    return true;
                }
                item.source_index
                    .is_some_and(|i| target.item(i).is_some_and(|v| v.equal_to(&converted)))
            });
        }
    }

    // =========================================================================
    // Movement
    // =========================================================================

    /// The add/remove button: with target rows selected the transfer runs
    /// back to the pool, otherwise the supplier's selected items transfer
    /// into the target.
    pub fn add_button_click(&mut self, target_index: usize) -> OptionsResult<()> {
        self.target(target_index)?;
        let mut select_from = None;

        self.begin_edit();
        let selected_rows = self.targets[target_index].selection().to_vec();
        if !selected_rows.is_empty() {
            self.remove_rows_unchecked(target_index, &selected_rows);
        } else {
            let items = self.supplier_items();
            if !items.is_empty() {
                let lowest = self.supplier.selection().first().copied().unwrap_or(0);
                let values = self.items_to_values(&items, target_index);
                let placed = self.deliver(target_index, values, None);
                for value in &placed {
                    self.pull_usage(value);
                }
                if !placed.is_empty() {
                    select_from = Some(if self.supplier.persistent_items() {
                        lowest + 1
                    } else {
                        lowest
                    });
                }
            }
        }
        self.end_edit();

        // the highlight moves only once visibility is settled
        if let Some(from) = select_from {
            self.supplier.select_next_available(from);
        }
        Ok(())
    }

    /// Place dropped items into a target at an optional row. Returns how
    /// many values landed (anywhere, counting the overflow cascade).
    pub fn drop_items_into(
        &mut self,
        target_index: usize,
        items: &[DragItem],
        at: Option<usize>,
    ) -> OptionsResult<usize> {
        self.target(target_index)?;
        let values = self.items_to_values(items, target_index);
        let placed = self.deliver(target_index, values, at);
        for value in &placed {
            self.pull_usage(value);
        }
        Ok(placed.len())
    }

    /// Remove rows from a target, releasing their supplier usage.
    pub fn remove_rows(&mut self, target_index: usize, rows: &[usize]) -> OptionsResult<()> {
        self.target(target_index)?;
        self.remove_rows_unchecked(target_index, rows);
        Ok(())
    }

    fn remove_rows_unchecked(&mut self, target_index: usize, rows: &[usize]) {
        let mut rows = rows.to_vec();
        rows.sort_unstable();
        rows.dedup();
        for &row in rows.iter().rev() {
            if let Some(value) = self.targets[target_index].remove_at(row) {
                self.push_usage(&value);
            }
        }
    }

    /// Offer values to a target one by one. A value the filter rejects is
    /// skipped; a value the capacity refuses triggers the list's overflow
    /// policy for it and everything after it. Values already placed are
    /// never rolled back.
    fn deliver(
        &mut self,
        target_index: usize,
        values: Vec<FormattedValue>,
        at: Option<usize>,
    ) -> Vec<FormattedValue> {
        let mut placed = Vec::new();
        let mut cursor = at;
        let mut pending = values.into_iter();
        while let Some(value) = pending.next() {
            match self.targets[target_index].add_value(value.clone(), cursor) {
                AddOutcome::Added => {
                    placed.push(value);
                    cursor = cursor.map(|c| c + 1);
                }
                AddOutcome::Replaced(displaced) => {
                    // the overwritten row leaves every list, so its pool
                    // usage is released here
                    self.push_usage(&displaced);
                    placed.push(value);
                    cursor = cursor.map(|c| c + 1);
                }
                AddOutcome::Rejected => {}
                AddOutcome::Full(value) => {
                    let overflow: Vec<FormattedValue> =
                        std::iter::once(value).chain(pending).collect();
                    match self.targets[target_index].drop_overflow() {
                        DropOverflow::Discard => {
                            tracing::debug!(
                                target: "strata_options::transfer",
                                count = overflow.len(),
                                "list full, overflow discarded"
                            );
                        }
                        DropOverflow::TryNext => match self.next_list_with_space(target_index) {
                            Some(next) => {
                                placed.extend(self.deliver(next, overflow, None));
                            }
                            None => {
                                tracing::debug!(
                                    target: "strata_options::transfer",
                                    count = overflow.len(),
                                    "no list with space, overflow dropped"
                                );
                                self.dropped_overflow.emit(overflow);
                            }
                        },
                    }
                    break;
                }
            }
        }
        placed
    }

    /// The first list after `index`, in registration order, with room left.
    fn next_list_with_space(&self, index: usize) -> Option<usize> {
        (index + 1..self.targets.len()).find(|&i| self.targets[i].has_space())
    }

    // =========================================================================
    // Usage accounting
    // =========================================================================

    /// Count a placed value against the pool. A value foreign to the pool,
    /// typically an interaction term over pooled variables, counts one use
    /// per distinct factor instead.
    fn pull_usage(&mut self, value: &FormattedValue) {
        if self.supplier.pull_item(value, true).is_some() {
            return;
        }
        for name in distinct_parts(value) {
            self.supplier.pull_item(&FormattedValue::variable(name), true);
        }
    }

    /// The inverse of [`pull_usage`](Self::pull_usage).
    fn push_usage(&mut self, value: &FormattedValue) {
        let direct = self
            .supplier
            .items()
            .iter()
            .any(|item| item.value.equal_to(value));
        if direct {
            self.supplier.push_item(value);
            return;
        }
        for name in distinct_parts(value) {
            self.supplier.push_item(&FormattedValue::variable(name));
        }
    }
}

fn distinct_parts(value: &FormattedValue) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for part in value.parts() {
        if !seen.contains(&part) {
            seen.push(part);
        }
    }
    seen
}

/// Render items into the values a target stores, expanding per the action.
fn apply_transfer_action(
    action: TransferAction,
    items: &[DragItem],
    format: Format,
) -> Vec<FormattedValue> {
    match action {
        TransferAction::None | TransferAction::MainEffects => items
            .iter()
            .map(|item| item.value.convert(format, item.properties.power))
            .collect(),
        TransferAction::Interaction => {
            if items.is_empty() {
                return Vec::new();
            }
            let parts = items
                .iter()
                .flat_map(|item| item.value.to_term_parts(item.properties.power))
                .collect();
            vec![FormattedValue::term(parts)]
        }
        TransferAction::All2Way => combine(items, 2, Some(2), format),
        TransferAction::All3Way => combine(items, 3, Some(3), format),
        TransferAction::All4Way => combine(items, 4, Some(4), format),
        TransferAction::All5Way => combine(items, 5, Some(5), format),
        TransferAction::Interactions => combine(items, 1, None, format),
    }
}

/// Every `min ..= max` combination of the items, singletons rendered in the
/// target's format and longer combinations as interaction terms.
fn combine(
    items: &[DragItem],
    min: usize,
    max: Option<usize>,
    format: Format,
) -> Vec<FormattedValue> {
    // combinations over positions, so equal values at different positions
    // stay distinct items
    let indices: Vec<usize> = (0..items.len()).collect();
    interactions(&indices, min, max)
        .into_iter()
        .map(|combo| {
            if let [only] = combo[..] {
                items[only].value.convert(format, items[only].properties.power)
            } else {
                let parts = combo
                    .iter()
                    .flat_map(|&i| items[i].value.to_term_parts(items[i].properties.power))
                    .collect();
                FormattedValue::term(parts)
            }
        })
        .collect()
}

// =============================================================================
// Drop-zone adapters
// =============================================================================

/// The supplier as a drag source and drop target over a shared model.
pub struct SupplierSource {
    model: Arc<Mutex<TransferModel>>,
    bounds: Rect,
    /// Measured bounds of each selected row, in selection order.
    item_bounds: Vec<Rect>,
}

impl SupplierSource {
    pub fn new(model: Arc<Mutex<TransferModel>>) -> Self {
        Self {
            model,
            bounds: Rect::default(),
            item_bounds: Vec::new(),
        }
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    pub fn set_item_bounds(&mut self, bounds: Vec<Rect>) {
        self.item_bounds = bounds;
    }

    /// Wrap in the handle form the drag controller works with.
    pub fn into_handle(self) -> TargetHandle {
        Arc::new(Mutex::new(self))
    }
}

impl DropTarget for SupplierSource {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn pickup_items(&mut self) -> Vec<DragItem> {
        let items = self.model.lock().supplier_items();
        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match self.item_bounds.get(i) {
                Some(&bounds) => item.with_bounds(bounds),
                None => item,
            })
            .collect()
    }

    fn on_drag_drop_start(&mut self) {
        self.model.lock().begin_edit();
    }

    fn on_drag_drop_end(&mut self) {
        self.model.lock().end_edit();
    }

    fn catch_dropped_items(&mut self, items: Vec<DragItem>, _local: Point) {
        // rows dropped back into the pool were already released by the
        // origin list; there is nothing to add
        tracing::debug!(
            target: "strata_options::transfer",
            count = items.len(),
            "items returned to supplier"
        );
    }
}

/// One target list as a drop zone over a shared model.
pub struct TargetDropZone {
    model: Arc<Mutex<TransferModel>>,
    target_index: usize,
    bounds: Rect,
    /// Measured bounds of each row, local to `bounds`.
    row_bounds: Vec<Rect>,
    hover_row: Option<usize>,
}

impl TargetDropZone {
    pub fn new(model: Arc<Mutex<TransferModel>>, target_index: usize) -> Self {
        Self {
            model,
            target_index,
            bounds: Rect::default(),
            row_bounds: Vec::new(),
            hover_row: None,
        }
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    pub fn set_row_bounds(&mut self, bounds: Vec<Rect>) {
        self.row_bounds = bounds;
    }

    /// The row currently hovered during a drag, for highlight rendering.
    pub fn hover_row(&self) -> Option<usize> {
        self.hover_row
    }

    pub fn into_handle(self) -> TargetHandle {
        Arc::new(Mutex::new(self))
    }

    fn row_at(&self, local: Point) -> Option<usize> {
        self.row_bounds.iter().position(|r| r.contains(local))
    }
}

impl DropTarget for TargetDropZone {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn pickup_items(&mut self) -> Vec<DragItem> {
        let model = self.model.lock();
        let rows = model
            .target(self.target_index)
            .map(|t| t.selection().to_vec())
            .unwrap_or_default();
        let all = model.target_items(self.target_index).unwrap_or_default();
        all.into_iter()
            .filter(|item| item.source_index.is_some_and(|i| rows.contains(&i)))
            .collect()
    }

    fn filter_items_for_drop(&self, items: &[DragItem], _local: Point) -> Vec<DragItem> {
        let mut items = items.to_vec();
        self.model
            .lock()
            .preprocess_items(&mut items, self.target_index, false);
        items
    }

    fn on_dragging_over(&mut self, local: Point) {
        self.hover_row = self.row_at(local);
    }

    fn on_dragging_leave(&mut self) {
        self.hover_row = None;
    }

    fn on_drag_drop_start(&mut self) {
        self.model.lock().begin_edit();
    }

    fn on_drag_drop_end(&mut self) {
        self.model.lock().end_edit();
    }

    /// Origin side of a move out of this list: the moved rows leave
    /// immediately so the destination never sees them as duplicates.
    fn on_items_dropping(&mut self, items: &mut Vec<DragItem>, _into_self: bool) {
        let rows: Vec<usize> = items.iter().filter_map(|i| i.source_index).collect();
        if rows.is_empty() {
            return;
        }
        if let Err(err) = self.model.lock().remove_rows(self.target_index, &rows) {
            tracing::warn!(
                target: "strata_options::transfer",
                %err,
                "origin rows not removed"
            );
            return;
        }
        for item in items.iter_mut() {
            item.source_index = None;
        }
    }

    fn catch_dropped_items(&mut self, items: Vec<DragItem>, local: Point) {
        let at = self.row_at(local);
        let result = self
            .model
            .lock()
            .drop_items_into(self.target_index, &items, at);
        if let Err(err) = result {
            tracing::warn!(
                target: "strata_options::transfer",
                %err,
                "dropped items lost, target list gone"
            );
        }
        self.hover_row = None;
    }
}
