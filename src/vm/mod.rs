//! The ternary machine: instruction set, arithmetic, state, loader and execution engine.
//!
//! The machine has three registers (`A` accumulator, `C` instruction pointer, `D` data pointer)
//! and `3^10` memory cells. After every executed instruction the cell at `C` is rewritten
//! through a fixed permutation ([`xlat`]), which makes every program self-modifying.
//!
//! # Key Components
//!
//! - [`VmState`] - Registers plus memory, loaded from a [`crate::file::ProgramImage`]
//! - [`execute`] - Runs a state until a [`StopCondition`] fires
//! - [`Opcode`] / [`OpcodeMask`] - Instruction decoding
//! - [`Channel`] / [`Console`] - Character I/O of a run
//! - [`Interrupt`] - Cooperative cancellation
//! - [`Recorder`] / [`Recording`] - Hooks the access analysis attaches to a run
//!
//! # Example
//!
//! ```rust
//! use malscope::vm::{execute, Channel, Interrupt, Recording, StopCondition, StopReason, VmState};
//!
//! // Nop, Hlt
//! let mut state = VmState::from_bytes(b"DP")?;
//! let run = execute(
//!     &mut state,
//!     &mut Channel::silent(),
//!     &StopCondition::unbounded(),
//!     Recording::Off,
//!     &Interrupt::new(),
//! );
//! assert_eq!(run.steps, 2);
//! assert_eq!(run.stop, StopReason::Halted);
//! // the executed Nop was rewritten
//! assert_eq!(state.cell(0), 33);
//! # Ok::<(), malscope::Error>(())
//! ```

mod engine;
mod interrupt;
mod io;
mod opcode;
mod state;
pub mod ternary;

pub use engine::{
    execute, AccessEvent, Execution, Recorder, Recording, StopCondition, StopReason,
};
pub(crate) use engine::successor;
pub use interrupt::Interrupt;
pub use io::{BufferConsole, Channel, Console, ConsoleRead, EndOfTrace, ReplayInput};
pub use opcode::{Opcode, OpcodeMask, OPCODE_MODULUS};
pub use state::{VmState, MIN_PROGRAM_LENGTH};
pub use ternary::{operate, rotate_right, xlat};

/// Number of memory cells, and the modulus of every address and word (`3^10`).
pub const MEMORY_SIZE: usize = 59_049;

/// Largest machine word (`3^10 - 1`).
pub const WORD_MAX: u32 = 59_048;

/// The value `In` stores when the input stream is closed.
pub const END_OF_INPUT: u32 = WORD_MAX;

/// Smallest value a cell may hold to be executable.
pub const PRINTABLE_MIN: u32 = 33;

/// Largest value a cell may hold to be executable.
pub const PRINTABLE_MAX: u32 = 126;
