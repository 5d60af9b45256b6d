//! Target lists: the ordered value lists items are transferred into.

use serde::{Deserialize, Serialize};
use strata_core::Signal;

use crate::format::{Format, FormattedValue};

/// How a value lands relative to the list's existing rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropBehaviour {
    /// Insert at the drop row, shifting later rows down.
    #[default]
    Insert,
    /// Replace the value at the drop row.
    Overwrite,
    /// Only land on unoccupied space below the last row.
    EmptySpace,
}

/// What happens to values a full list cannot take.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropOverflow {
    /// Excess values are dropped on the floor.
    Discard,
    /// Excess values cascade into the next sibling list with space.
    #[default]
    TryNext,
}

/// Expansion applied to supplier values on their way into a target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferAction {
    /// Values pass through unchanged (format-converted only).
    #[default]
    None,
    /// Each value becomes its own main-effect term.
    MainEffects,
    /// All values combine into a single interaction term.
    Interaction,
    /// All two-way combinations.
    All2Way,
    /// All three-way combinations.
    All3Way,
    /// All four-way combinations.
    All4Way,
    /// All five-way combinations.
    All5Way,
    /// Main effects plus every interaction up to the full order.
    Interactions,
}

/// Per-list duplicate policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFilter {
    /// Duplicates allowed.
    None,
    /// A value equal to one already in the list is rejected.
    #[default]
    Unique,
}

/// Outcome of offering a single value to a list.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum AddOutcome {
    Added,
    /// The value landed by replacing an occupied row. The displaced value
    /// no longer sits in any list and must be released back to the pool.
    Replaced(FormattedValue),
    /// The list's filter refused the value. Rejected values are consumed,
    /// not overflowed.
    Rejected,
    /// No space left; the value may overflow to a sibling.
    Full(FormattedValue),
}

/// An ordered list of values with a capacity, a duplicate policy, and drop
/// placement rules.
///
/// Lists are headless rows of [`FormattedValue`]s; the embedding UI renders
/// them and reports row geometry back through the drop-zone adapters.
pub struct TargetList {
    name: String,
    format: Format,
    items: Vec<FormattedValue>,
    selection: Vec<usize>,
    max_item_count: Option<usize>,
    single_item: bool,
    drop_behaviour: DropBehaviour,
    drop_overflow: DropOverflow,
    value_filter: ValueFilter,
    transfer_action: TransferAction,
    /// Emitted after any change to the list's rows.
    pub changed: Signal<()>,
}

impl TargetList {
    pub fn new(name: impl Into<String>, format: Format) -> Self {
        Self {
            name: name.into(),
            format,
            items: Vec::new(),
            selection: Vec::new(),
            max_item_count: None,
            single_item: false,
            drop_behaviour: DropBehaviour::default(),
            drop_overflow: DropOverflow::default(),
            value_filter: ValueFilter::default(),
            transfer_action: TransferAction::default(),
            changed: Signal::new(),
        }
    }

    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_item_count = Some(max);
        self
    }

    /// A list that holds at most one value at a time.
    pub fn single_item(mut self) -> Self {
        self.single_item = true;
        self
    }

    pub fn with_drop_behaviour(mut self, behaviour: DropBehaviour) -> Self {
        self.drop_behaviour = behaviour;
        self
    }

    pub fn with_drop_overflow(mut self, overflow: DropOverflow) -> Self {
        self.drop_overflow = overflow;
        self
    }

    pub fn with_value_filter(mut self, filter: ValueFilter) -> Self {
        self.value_filter = filter;
        self
    }

    pub fn with_transfer_action(mut self, action: TransferAction) -> Self {
        self.transfer_action = action;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn items(&self) -> &[FormattedValue] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&FormattedValue> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_single_item(&self) -> bool {
        self.single_item
    }

    pub fn drop_overflow(&self) -> DropOverflow {
        self.drop_overflow
    }

    pub fn transfer_action(&self) -> TransferAction {
        self.transfer_action
    }

    /// Effective capacity, `None` for unbounded.
    pub fn capacity(&self) -> Option<usize> {
        if self.single_item {
            Some(1)
        } else {
            self.max_item_count
        }
    }

    pub fn is_full(&self) -> bool {
        self.capacity().is_some_and(|max| self.items.len() >= max)
    }

    pub fn has_space(&self) -> bool {
        !self.is_full()
    }

    pub fn contains(&self, value: &FormattedValue) -> bool {
        self.items.iter().any(|v| v.equal_to(value))
    }

    /// Whether the list's duplicate policy admits the value.
    pub fn test_value(&self, value: &FormattedValue) -> bool {
        match self.value_filter {
            ValueFilter::None => true,
            ValueFilter::Unique => !self.contains(value),
        }
    }

    /// The placement behaviour a drop would actually use. A bounded list
    /// with no space left falls back to overwriting the drop row.
    pub fn effective_drop_behaviour(&self) -> DropBehaviour {
        if self.drop_behaviour == DropBehaviour::Insert && self.is_full() {
            DropBehaviour::Overwrite
        } else {
            self.drop_behaviour
        }
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Offer one value at an optional drop row.
    pub(crate) fn add_value(
        &mut self,
        value: FormattedValue,
        index: Option<usize>,
    ) -> AddOutcome {
        if !self.test_value(&value) {
            return AddOutcome::Rejected;
        }
        let outcome = match self.effective_drop_behaviour() {
            DropBehaviour::Insert => {
                if self.is_full() {
                    return AddOutcome::Full(value);
                }
                let at = index.unwrap_or(self.items.len()).min(self.items.len());
                self.items.insert(at, value);
                AddOutcome::Added
            }
            DropBehaviour::Overwrite => match index {
                Some(i) if i < self.items.len() => {
                    let displaced = std::mem::replace(&mut self.items[i], value);
                    AddOutcome::Replaced(displaced)
                }
                _ => {
                    if self.is_full() {
                        return AddOutcome::Full(value);
                    }
                    self.items.push(value);
                    AddOutcome::Added
                }
            },
            DropBehaviour::EmptySpace => {
                if index.is_some_and(|i| i < self.items.len()) {
                    return AddOutcome::Rejected;
                }
                if self.is_full() {
                    return AddOutcome::Full(value);
                }
                self.items.push(value);
                AddOutcome::Added
            }
        };
        self.changed.emit(());
        outcome
    }

    /// Remove and return the value at a row.
    pub fn remove_at(&mut self, index: usize) -> Option<FormattedValue> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        self.selection.retain(|&i| i != index);
        for i in &mut self.selection {
            if *i > index {
                *i -= 1;
            }
        }
        self.changed.emit(());
        Some(removed)
    }

    pub fn selection(&self) -> &[usize] {
        &self.selection
    }

    /// Replace the selected rows. Out-of-range indices are discarded.
    pub fn set_selection(&mut self, mut rows: Vec<usize>) {
        rows.retain(|&i| i < self.items.len());
        rows.sort_unstable();
        rows.dedup();
        self.selection = rows;
    }
}
