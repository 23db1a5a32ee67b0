use std::collections::TryReserveError;

use thiserror::Error;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Only conditions that abort a disassembly session are modelled here. Faults that merely end a
/// single execution trace (an instruction cell holding a value outside the printable alphabet,
/// an exhausted input trace, an interrupt) are reported through
/// [`crate::vm::StopReason`] on the [`crate::vm::Execution`] result instead, because they may
/// legitimately occur on synthetic traces.
///
/// # Error Categories
///
/// ## Loading Errors
/// - [`Error::FileError`] - The program image could not be read
/// - [`Error::InvalidProgramByte`] - A byte does not decode to a valid instruction
/// - [`Error::ProgramTooShort`] - Fewer than two instruction bytes, including an empty image
/// - [`Error::ProgramTooLong`] - More instruction bytes than the address space holds
///
/// ## Analysis Errors
/// - [`Error::EntryPointNotFound`] - No JMP at the computed entry position
/// - [`Error::OutOfMemory`] - An analysis structure could not be allocated
///
/// # Examples
///
/// ```rust
/// use malscope::{Error, file::ProgramImage, vm::VmState};
///
/// let image = ProgramImage::from_mem(b"(=<".to_vec())?;
/// match VmState::load(&image) {
///     Ok(state) => println!("loaded, C = {}", state.c),
///     Err(Error::InvalidProgramByte { byte, position }) => {
///         eprintln!("invalid byte 0x{byte:02x} at 0x{position:05x}");
///     }
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// # Ok::<(), malscope::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    ///
    /// Wraps standard I/O errors that occur while opening or mapping the program image.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// A byte of the program image is neither whitespace, a terminator, nor a printable
    /// character that decodes to one of the eight instructions at its position.
    ///
    /// `position` is the index the byte would have occupied in memory, i.e. the number of
    /// instruction bytes accepted before it.
    #[error("Invalid character 0x{byte:02x} at 0x{position:05x}")]
    InvalidProgramByte {
        /// The offending byte
        byte: u8,
        /// The memory position the byte would have been loaded to
        position: usize,
    },

    /// The program image holds fewer than two instruction bytes.
    #[error("Minimal program length of 2 deceeded ({length} instruction bytes)")]
    ProgramTooShort {
        /// Number of instruction bytes that were found
        length: usize,
    },

    /// The program image holds more instruction bytes than there are memory cells.
    #[error("Maximum program length of {limit} exceeded")]
    ProgramTooLong {
        /// The maximum number of instruction bytes
        limit: usize,
    },

    /// The structure of the program does not match the "setup, then loop" idiom: re-running the
    /// program up to the last JMP before its first I/O instruction did not land on a JMP.
    #[error("Failed to find the entry point (candidate at step {steps})")]
    EntryPointNotFound {
        /// The candidate step count that was checked
        steps: u64,
    },

    /// Allocation of an analysis structure failed.
    ///
    /// The address space has a fixed size, so this is never degraded gracefully.
    #[error("Cannot allocate memory - {0}")]
    OutOfMemory(String),

    /// Generic error for miscellaneous failures.
    ///
    /// Used for errors that don't fit into other categories, such as a failing memory mapping.
    #[error("{0}")]
    Error(String),
}

impl From<TryReserveError> for Error {
    fn from(error: TryReserveError) -> Self {
        Error::OutOfMemory(error.to_string())
    }
}
