//! Logging facilities for Strata.
//!
//! Strata uses the `tracing` crate for instrumentation. To see logs, install
//! a tracing subscriber in your application:
//!
//! ```ignore
//! use tracing_subscriber;
//!
//! fn main() {
//!     // Initialize tracing (you can customize this)
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! The constants below name the targets Strata logs under, for use in
//! subscriber filter directives such as
//! `RUST_LOG=strata_options::drag=debug`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "strata_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "strata_core::signal";
    /// Property system target.
    pub const PROPERTY: &str = "strata_core::property";
    /// Drag session controller target.
    pub const DRAG: &str = "strata_options::drag";
    /// Supplier/target transfer model target.
    pub const TRANSFER: &str = "strata_options::transfer";
    /// Selectable grid target.
    pub const GRID: &str = "strata_options::grid";
}
