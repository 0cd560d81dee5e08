//! Analysis modules.
//!
//! Breakdowns of the consolidated table and headline statistics.

pub mod aggregator;
pub mod summary;

pub use aggregator::*;
pub use summary::*;
