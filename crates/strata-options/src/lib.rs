//! Analysis-options item transfer model for Strata.
//!
//! This crate implements the interactive core of an analysis options panel:
//! a supplier list of available values (variables, terms) that the user moves
//! into one or more target lists via multi-select, drag-and-drop, and toolbar
//! actions, including automatic generation of k-way interaction terms.
//!
//! The crate is deliberately headless: it owns selection state, drag
//! lifecycles, item usage accounting, and capacity/overflow policy, while the
//! embedding UI supplies geometry (cell and list bounds) and forwards pointer
//! and keyboard events.
//!
//! # Components
//!
//! - [`grid::SelectableGrid`] - 2-D cell collection with single/multi/range
//!   selection and keyboard navigation
//! - [`drag::DragSession`] - one drag lifecycle per pickup source:
//!   hit-testing, nested sub-target resolution, hover and drop dispatch
//! - [`transfer::TransferModel`] - the supplier/target item pool with usage
//!   accounting and overflow redistribution
//! - [`transfer::interactions`] - pure combinatorial interaction-term
//!   expansion
//!
//! # Example
//!
//! ```
//! use strata_options::format::FormattedValue;
//! use strata_options::transfer::interactions;
//!
//! let values = vec![
//!     FormattedValue::variable("a"),
//!     FormattedValue::variable("b"),
//!     FormattedValue::variable("c"),
//! ];
//! // All 2-way interactions: ab, ac, bc
//! let pairs = interactions(&values, 2, Some(2));
//! assert_eq!(pairs.len(), 3);
//! ```

pub mod drag;
pub mod error;
pub mod format;
pub mod geometry;
pub mod grid;
pub mod item;
pub mod transfer;

pub use drag::{DragSession, DragState, DropTarget, SessionToken, TargetHandle};
pub use error::{OptionsError, OptionsResult};
pub use format::{Format, FormattedValue};
pub use geometry::{Point, Rect};
pub use grid::{Cell, CellKey, SelectableGrid};
pub use item::{DragItem, Item, ItemProperties};
pub use transfer::{
    ClickDetector, DropBehaviour, DropOverflow, Supplier, TargetList, TransferAction,
    TransferModel, ValueFilter, interactions,
};
