//! Evidence layer: chunking, document registry, retrieval and extraction.

mod chunker;
mod error;
mod extract;
mod index;
mod ingest;
mod registry;
mod retrieval;

pub use chunker::*;
pub use error::*;
pub use extract::*;
pub use index::*;
pub use ingest::*;
pub use registry::*;
pub use retrieval::*;
