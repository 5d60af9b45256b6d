//! The supplier: the source list values are transferred out of.

use strata_core::{Property, ReadOnlyProperty, Signal};

use crate::format::FormattedValue;
use crate::item::Item;

/// The pool of available values, with usage accounting and a search filter.
///
/// A non-persistent supplier hides a value while any target holds it, so the
/// pool visually drains as a model is built. A persistent supplier keeps
/// every value visible and merely marks used ones.
pub struct Supplier {
    items: Vec<Item>,
    selection: Vec<usize>,
    visible: Vec<bool>,
    persistent_items: bool,
    search: Property<String>,
    block_filter: bool,
    /// Emitted when the item list itself is replaced.
    pub items_changed: Signal<()>,
    /// Emitted when filtering changes which items are visible.
    pub visibility_changed: Signal<()>,
}

impl Supplier {
    pub fn new(persistent_items: bool) -> Self {
        Self {
            items: Vec::new(),
            selection: Vec::new(),
            visible: Vec::new(),
            persistent_items,
            search: Property::default(),
            block_filter: false,
            items_changed: Signal::new(),
            visibility_changed: Signal::new(),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn persistent_items(&self) -> bool {
        self.persistent_items
    }

    /// Replace the item list, carrying usage counts over from matching
    /// values. Properties always come from the incoming item, so a power or
    /// permission change on an unchanged value takes effect.
    pub fn set_list(&mut self, mut items: Vec<Item>) {
        for item in &mut items {
            if let Some(existing) = self.items.iter().find(|e| e.value.equal_to(&item.value)) {
                item.used = existing.used;
            }
        }
        self.items = items;
        self.selection.clear();
        self.items_changed.emit(());
        self.filter_supplier_list(true);
    }

    /// How many target rows currently hold a value equal to this one.
    pub fn usage(&self, value: &FormattedValue) -> usize {
        self.items
            .iter()
            .find(|item| item.value.equal_to(value))
            .map_or(0, |item| item.used)
    }

    /// Take a copy of the matching item, counting it as used when `use_item`
    /// is set. Values foreign to the pool yield `None`.
    pub fn pull_item(&mut self, value: &FormattedValue, use_item: bool) -> Option<Item> {
        let index = self.items.iter().position(|i| i.value.equal_to(value))?;
        if use_item {
            self.items[index].used += 1;
        }
        let item = self.items[index].clone();
        self.filter_supplier_list(false);
        Some(item)
    }

    /// Return a value to the pool, releasing one use. Usage never goes
    /// below zero.
    pub fn push_item(&mut self, value: &FormattedValue) {
        if let Some(item) = self.items.iter_mut().find(|i| i.value.equal_to(value)) {
            item.used = item.used.saturating_sub(1);
        }
        self.filter_supplier_list(false);
    }

    // =========================================================================
    // Filtering
    // =========================================================================

    pub fn is_visible(&self, index: usize) -> bool {
        self.visible.get(index).copied().unwrap_or(false)
    }

    pub fn visible_indices(&self) -> Vec<usize> {
        (0..self.items.len()).filter(|&i| self.is_visible(i)).collect()
    }

    /// Read-only view of the current search term.
    pub fn search_term(&self) -> ReadOnlyProperty<'_, String> {
        ReadOnlyProperty::new(&self.search)
    }

    /// Update the search term; an unchanged term triggers no filter pass.
    pub fn set_search(&mut self, term: impl Into<String>) {
        if self.search.set(term.into()) {
            self.filter_supplier_list(true);
        }
    }

    /// Suspend filtering during a batch of pulls and pushes. The caller runs
    /// one [`filter_supplier_list`](Self::filter_supplier_list) pass after
    /// unblocking.
    pub fn set_block_filter(&mut self, block: bool) {
        self.block_filter = block;
    }

    /// Recompute which items are visible. With persistent items, usage
    /// changes do not affect visibility, so the pass is skipped unless
    /// forced by a search or list change.
    pub fn filter_supplier_list(&mut self, force: bool) {
        if self.block_filter {
            return;
        }
        if self.persistent_items && !force {
            return;
        }
        let search = self.search.with(|s| s.to_lowercase());
        let visible: Vec<bool> = self
            .items
            .iter()
            .map(|item| {
                let free = self.persistent_items || !item.is_used();
                let matches =
                    search.is_empty() || item.value.to_string().to_lowercase().contains(&search);
                free && matches
            })
            .collect();
        if visible != self.visible {
            self.visible = visible;
            let flags = &self.visible;
            self.selection
                .retain(|&i| flags.get(i).copied().unwrap_or(false));
            self.visibility_changed.emit(());
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn selection(&self) -> &[usize] {
        &self.selection
    }

    pub fn set_selection(&mut self, mut rows: Vec<usize>) {
        rows.retain(|&i| i < self.items.len());
        rows.sort_unstable();
        rows.dedup();
        self.selection = rows;
    }

    /// The nearest visible item at or after `from`, falling back to the
    /// nearest one before it. Used to move the highlight on after a
    /// transfer consumes the selected item.
    pub fn next_available_index(&self, from: usize) -> Option<usize> {
        for i in from..self.items.len() {
            if self.is_visible(i) {
                return Some(i);
            }
        }
        (0..from.min(self.items.len())).rev().find(|&i| self.is_visible(i))
    }

    /// Move the selection to [`next_available_index`]
    /// (Self::next_available_index).
    pub fn select_next_available(&mut self, from: usize) {
        match self.next_available_index(from) {
            Some(i) => self.selection = vec![i],
            None => self.selection.clear(),
        }
    }
}
