//! Access analysis of recorded runs.
//!
//! The analysis turns executions of a program into a reconstruction of the memory cells it
//! needs:
//!
//! - [`access`] - Per-cell [`AccessFacts`] accumulated from recorded runs
//! - [`entry`] - Locating ([`find_entry`]) and moving ([`optimize_entry`]) the entry point
//! - [`components`] - Partitioning the accessed cells into code and data blocks
//! - [`cycle`] - Classifying self-modifying cells by their rewrite cycle
//!
//! All steps run on independent copies of the machine state; only [`AccessFacts`] is shared
//! between them, and it only ever grows.

pub mod access;
pub mod components;
pub mod cycle;
pub mod entry;

pub use access::{AccessFacts, AccessFlags, CellInfo, CellLinks};
pub use components::{extract_components, Components, ConnectedBlock};
pub use cycle::{
    classify_cell, classify_cell_with_threshold, cycle_length, CellClass, LONG_CYCLE_THRESHOLD,
};
pub use entry::{find_entry, optimize_entry, EntryPoint};
