//! Orchestration of a disassembly session.
//!
//! A session loads a program, locates its entry point, collects access facts from runs of the
//! program, moves the entry point as early as the facts allow, and extracts the code and data
//! blocks. [`Disassembler`] drives the whole pipeline; the collection steps are available on
//! their own as [`collect_interactive`] and [`collect_scripted`].

mod collect;
mod config;
mod disassembler;

pub use collect::{collect_interactive, collect_scripted, trace_from_bytes, FixedRuns, Operator};
pub use config::DisassemblerConfig;
pub use disassembler::{Disassembler, Disassembly, RunDriver};
