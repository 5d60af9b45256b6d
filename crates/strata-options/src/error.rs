//! Error types for the options crate.
//!
//! Recoverable transfer conditions (a full target, a value rejected by a
//! format or uniqueness filter) are not errors; they surface as `false`/
//! filtered outcomes and feed the overflow machinery. The variants here cover
//! structural misuse of the component contracts - developer-time
//! configuration mistakes.

use thiserror::Error;

/// Errors that can occur while configuring or driving the option model.
#[derive(Error, Debug)]
pub enum OptionsError {
    /// A cell already exists at the given grid coordinate.
    #[error("cell already occupies row {row}, column {column}")]
    CellOccupied { row: usize, column: usize },

    /// The drop target has already been registered with this session.
    #[error("drop target is already registered")]
    TargetAlreadyRegistered,

    /// The drop target is not registered with this session.
    #[error("drop target is not registered")]
    TargetNotRegistered,

    /// Sub-target resolution descended past the nesting bound.
    #[error("sub-target nesting exceeds {max} levels")]
    NestingTooDeep { max: usize },

    /// A target-list index was out of range.
    #[error("target index {index} out of range ({count} targets)")]
    TargetIndexOutOfRange { index: usize, count: usize },
}

/// Result type for option-model operations.
pub type OptionsResult<T> = Result<T, OptionsError>;
