//! Investigation orchestration: shared context, tools, drivers and reports.

mod context;
mod driver;
mod report;
mod runner;
mod state;
mod tools;

pub use context::*;
pub use driver::*;
pub use report::*;
pub use runner::*;
pub use state::*;
pub use tools::*;
