//! Items: values as the supplier and drag machinery carry them.

use crate::format::FormattedValue;
use crate::geometry::Rect;

/// Highest power a supplier item may carry.
pub const MAX_POWER: u8 = 5;

/// Per-item attributes beyond the value itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemProperties {
    /// Higher-order repeat count for a variable (1..=[`MAX_POWER`]).
    /// A power of 3 makes the variable enter term expansion as `a✻a✻a`.
    pub power: u8,
    /// Whether targets accept this item. Non-permitted items stay listed
    /// in the supplier (grayed out by the UI) but are filtered from every
    /// transfer.
    pub permitted: bool,
}

impl Default for ItemProperties {
    fn default() -> Self {
        Self {
            power: 1,
            permitted: true,
        }
    }
}

impl ItemProperties {
    /// Properties with a clamped power.
    pub fn with_power(power: u8) -> Self {
        Self {
            power: power.clamp(1, MAX_POWER),
            ..Self::default()
        }
    }
}

/// A supplier item: a value plus usage accounting.
#[derive(Clone, Debug)]
pub struct Item {
    /// The transferable value.
    pub value: FormattedValue,
    /// How many times an equal value currently sits in target lists.
    pub used: usize,
    pub properties: ItemProperties,
}

impl Item {
    /// An unused item with default properties.
    pub fn new(value: FormattedValue) -> Self {
        Self {
            value,
            used: 0,
            properties: ItemProperties::default(),
        }
    }

    /// An unused item with explicit properties.
    pub fn with_properties(value: FormattedValue, properties: ItemProperties) -> Self {
        Self {
            value,
            used: 0,
            properties,
        }
    }

    /// Whether any target currently holds an equal value.
    pub fn is_used(&self) -> bool {
        self.used > 0
    }
}

/// An item in flight during a drag.
#[derive(Clone, Debug)]
pub struct DragItem {
    pub value: FormattedValue,
    pub properties: ItemProperties,
    /// Page-space bounds of the picked-up element, for drag-offset math.
    pub bounds: Rect,
    /// Row index in the origin list, when picked up from a target.
    pub source_index: Option<usize>,
}

impl DragItem {
    pub fn new(value: FormattedValue) -> Self {
        Self {
            value,
            properties: ItemProperties::default(),
            bounds: Rect::default(),
            source_index: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_source_index(mut self, index: usize) -> Self {
        self.source_index = Some(index);
        self
    }

    pub fn with_properties(mut self, properties: ItemProperties) -> Self {
        self.properties = properties;
        self
    }
}
