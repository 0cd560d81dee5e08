//! Report generation.
//!
//! The consolidated spreadsheet, the chart images, the markdown summary and
//! the assembler that runs them in order.

pub mod assembler;
pub mod chart;
pub mod consolidated;
pub mod gallery;
pub mod generator;

pub use assembler::ReportAssembler;
