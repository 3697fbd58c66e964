//! Terminal UI helpers for hvm.
//!
//! Status lines, error display with fixes, and spinners for the long
//! operations (unpacking, configure, make).

pub mod output;
pub mod spinner;
pub mod style;

pub use output::{Output, Verbosity};
pub use spinner::Spinner;
pub use style::Style;
