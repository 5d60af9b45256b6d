//! Value transfer between a supplier pool and target lists.
//!
//! The pieces, bottom up:
//!
//! - [`interactions`] expands values into combination terms
//! - [`TargetList`] is one destination list with capacity, duplicate policy
//!   and placement rules
//! - [`Supplier`] is the pool with usage accounting and a search filter
//! - [`TransferModel`] ties one supplier to its targets and moves values
//!   between them, cascading overflow across siblings
//! - [`SupplierSource`] and [`TargetDropZone`] expose a shared model to the
//!   drag controller
//! - [`ClickDetector`] turns timestamped clicks into double-clicks, the
//!   keyboard-free transfer gesture

use std::time::Duration;

mod interactions;
mod model;
mod supplier;
mod target;

pub use interactions::interactions;
pub use model::{PreprocessHook, SupplierSource, TargetDropZone, TransferModel};
pub use supplier::Supplier;
pub use target::{DropBehaviour, DropOverflow, TargetList, TransferAction, ValueFilter};

/// Two clicks on the same element within this window make a double-click.
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(300);

/// Double-click detection over embedder-supplied timestamps.
///
/// The model is headless, so the embedder reports each click as an element
/// id plus a monotonic timestamp and acts when [`register`]
/// (Self::register) answers `true`. A recognized double-click consumes both
/// clicks; a third click starts a fresh cycle.
#[derive(Debug, Default)]
pub struct ClickDetector {
    last: Option<(u64, Duration)>,
}

impl ClickDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a click, answering whether it completed a double-click.
    pub fn register(&mut self, element: u64, at: Duration) -> bool {
        let double = self.last.is_some_and(|(prev, when)| {
            prev == element
                && at
                    .checked_sub(when)
                    .is_some_and(|elapsed| elapsed <= DOUBLE_CLICK_WINDOW)
        });
        self.last = if double { None } else { Some((element, at)) };
        double
    }

    /// Forget the pending click, e.g. when the pointer starts a drag.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
