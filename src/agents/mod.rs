//! Specialist agents wrapping a single model call each.

mod base;
mod hypothesis;
mod verifier;

pub use base::*;
pub use hypothesis::*;
pub use verifier::*;
