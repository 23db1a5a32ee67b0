//! # malscope Prelude
//!
//! The most commonly used types of the library, for glob import.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all malscope operations
pub use crate::Error;

/// The result type used throughout malscope
pub use crate::Result;

// ================================================================================================
// Program Images and the Machine
// ================================================================================================

/// A program image, from a file or from memory
pub use crate::file::ProgramImage;

/// Machine state, instructions and execution
pub use crate::vm::{
    execute, Channel, Console, EndOfTrace, Execution, Interrupt, Opcode, OpcodeMask, Recording,
    StopCondition, StopReason, VmState,
};

// ================================================================================================
// Analysis
// ================================================================================================

/// Access facts and their flags
pub use crate::analysis::{AccessFacts, AccessFlags};

/// Entry point recovery
pub use crate::analysis::{find_entry, optimize_entry, EntryPoint};

/// Block reconstruction and cell classification
pub use crate::analysis::{classify_cell, extract_components, CellClass, Components, ConnectedBlock};

// ================================================================================================
// Sessions and Output
// ================================================================================================

/// The disassembly pipeline
pub use crate::session::{Disassembler, DisassemblerConfig, Disassembly, Operator, RunDriver};

/// HeLL output
pub use crate::hell::{default_output_path, HellWriter};
