//! Core library for the budgetscan command line application.
//!
//! The library exposes high-level batch functions that power the command-line
//! interface as well as the tests. The modules are structured to keep
//! responsibilities narrow and composable: worksheet access lives in
//! [`sheet`], the heuristic field locator in [`locate`], budget-ID
//! normalization in [`normalize`], the sequential batch orchestration in
//! [`scan`], and the styled report writer in [`report`].

pub mod error;
pub mod locate;
pub mod model;
pub mod normalize;
pub mod report;
pub mod scan;
pub mod sheet;

pub use error::{Result, ScanError};
