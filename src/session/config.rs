//! Disassembler configuration.
//!
//! [`DisassemblerConfig`] aggregates every tunable of a disassembly session. Two presets cover
//! the usual modes of operation:
//!
//! - [`DisassemblerConfig::interactive()`] - An operator drives the program at the terminal
//! - [`DisassemblerConfig::scripted()`] - Recorded input traces are replayed
//!
//! # Example
//!
//! ```rust
//! use malscope::session::DisassemblerConfig;
//!
//! let config = DisassemblerConfig::scripted()
//!     .with_entry_search_limit(1_000_000)
//!     .with_optimize_entry(false);
//! assert_eq!(config.entry_search_limit, 1_000_000);
//! ```

use crate::{analysis::LONG_CYCLE_THRESHOLD, vm::EndOfTrace};

/// Configuration of a disassembly session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisassemblerConfig {
    /// Try to move the entry point to an earlier `Jmp` after collecting access facts.
    pub optimize_entry: bool,
    /// Step bound of the entry point scan, `0` for none.
    ///
    /// Programs that never perform I/O keep the scan running until they halt or fault; a bound
    /// makes the entry search terminate for programs that loop forever without I/O.
    pub entry_search_limit: u64,
    /// What a replayed input trace does once exhausted.
    pub end_of_trace: EndOfTrace,
    /// Rewrite cycles longer than this are emitted as a single instruction.
    pub long_cycle_threshold: usize,
}

impl Default for DisassemblerConfig {
    fn default() -> Self {
        DisassemblerConfig {
            optimize_entry: true,
            entry_search_limit: 0,
            end_of_trace: EndOfTrace::EndOfInput,
            long_cycle_threshold: LONG_CYCLE_THRESHOLD,
        }
    }
}

impl DisassemblerConfig {
    /// Settings for a session driven by an operator at the terminal.
    #[must_use]
    pub fn interactive() -> Self {
        Self::default()
    }

    /// Settings for a session that replays recorded input traces.
    ///
    /// A run stops as soon as its trace is used up, so no access is recorded for input the
    /// trace does not contain.
    #[must_use]
    pub fn scripted() -> Self {
        DisassemblerConfig {
            end_of_trace: EndOfTrace::Stop,
            ..Self::default()
        }
    }

    /// Enable or disable the entry point optimizer.
    #[must_use]
    pub fn with_optimize_entry(mut self, optimize: bool) -> Self {
        self.optimize_entry = optimize;
        self
    }

    /// Bound the entry point scan to `limit` steps (`0` for none).
    #[must_use]
    pub fn with_entry_search_limit(mut self, limit: u64) -> Self {
        self.entry_search_limit = limit;
        self
    }

    /// Set what replayed traces do once exhausted.
    #[must_use]
    pub fn with_end_of_trace(mut self, end: EndOfTrace) -> Self {
        self.end_of_trace = end;
        self
    }

    /// Set the long-cycle threshold of the cycle classification.
    #[must_use]
    pub fn with_long_cycle_threshold(mut self, threshold: usize) -> Self {
        self.long_cycle_threshold = threshold;
        self
    }
}
