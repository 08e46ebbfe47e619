//! Staged per-layer edits.

pub mod set;

pub use set::ModificationSet;
