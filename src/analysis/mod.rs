//! Analysis toolkit for testing hypotheses against extracted numbers.

mod error;
mod tool;
mod toolkit;

pub use error::*;
pub use tool::*;
pub use toolkit::*;
