// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # malscope
//!
//! A dynamic disassembler for programs of the ternary, self-modifying machine best known as
//! Malbolge. Static disassembly is meaningless for such programs: every executed instruction
//! is rewritten in place, and the instruction a cell represents depends on its address.
//! `malscope` instead runs the program, records how every memory cell is accessed, and
//! reconstructs the program from those observations.
//!
//! ## Features
//!
//! - **Faithful machine model** - Loader and interpreter with exact rewrite and fault semantics
//! - **Entry point recovery** - Skips the generated bootstrap that builds up the real code
//! - **Access analysis** - Per-cell code/data classification accumulated over many runs
//! - **Block reconstruction** - Connected code and data blocks, with fixed-offset detection
//! - **HeLL output** - The reconstruction as an assembly source file
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use malscope::prelude::*;
//! use std::path::Path;
//!
//! let image = ProgramImage::from_file(Path::new("hello.mb"))?;
//! let traces = vec![b"input".iter().map(|&b| u32::from(b)).collect::<Vec<u32>>()];
//!
//! let disassembly = Disassembler::new(DisassemblerConfig::scripted())
//!     .analyse(&image, RunDriver::Scripted { traces: &traces })?;
//!
//! println!(
//!     "entry at step {}, {} code blocks, {} data blocks",
//!     disassembly.entry.steps,
//!     disassembly.components.code.len(),
//!     disassembly.components.data.len()
//! );
//! # Ok::<(), malscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - Program image backends (memory buffer, memory-mapped file)
//! - [`vm`] - The machine: loader, interpreter, I/O channels, cancellation
//! - [`analysis`] - Access facts, entry point search, block extraction, cycle classification
//! - [`session`] - The complete pipeline and its configuration
//! - [`hell`] - HeLL assembly output
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Logging
//!
//! The library logs through the [`log`] facade: session milestones at `info`, per-run details
//! at `debug`, and recoverable anomalies at `warn`. Install any logger implementation to see
//! them.
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//!
//! # Fuzz the loader
//! cargo +nightly fuzz run loader --release
//! ```

pub(crate) mod error;
pub(crate) mod utils;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// ```rust
/// use malscope::prelude::*;
///
/// let state = VmState::from_bytes(b"DP")?;
/// assert_eq!(state.current_opcode(), Some(Opcode::Nop));
/// # Ok::<(), malscope::Error>(())
/// ```
pub mod prelude;

pub mod analysis;
pub mod file;
pub mod hell;
pub mod session;
pub mod vm;

/// `malscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `malscope` Error type
///
/// See [`Error`] for the conditions that abort a session.
pub use error::Error;
