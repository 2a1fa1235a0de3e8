//! Audit Investigator - document-grounded, hypothesis-driven audit investigations.

pub mod agents;
pub mod ai;
pub mod analysis;
pub mod config;
pub mod display;
pub mod evidence;
pub mod knowledge;
pub mod supervisor;
