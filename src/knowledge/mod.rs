//! Domain knowledge for audit investigations.
//!
//! Four fixed categories (market pricing, vendor profiles, audit rules,
//! compliance), each searchable through its own index. The supervisor sees
//! this layer only through [`KnowledgeSource`].

mod samples;
mod source;
mod store;
mod types;

pub use samples::*;
pub use source::*;
pub use store::*;
pub use types::*;
