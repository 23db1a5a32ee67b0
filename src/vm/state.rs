//! Machine state and program loading.

use std::fmt;

use log::debug;

use crate::{
    file::ProgramImage,
    vm::{ternary::operate, Opcode, MEMORY_SIZE, OPCODE_MODULUS, PRINTABLE_MAX, PRINTABLE_MIN},
    Error::{InvalidProgramByte, ProgramTooLong, ProgramTooShort},
    Result,
};

/// Minimal number of instruction bytes a program image must contain.
pub const MIN_PROGRAM_LENGTH: usize = 2;

/// Complete state of the machine: three registers and the full memory.
///
/// A state is built once from the program image and cloned for every independent trace (entry
/// search, optimizer replays, interactive runs). Clones share nothing.
#[derive(Clone, PartialEq, Eq)]
pub struct VmState {
    /// Accumulator
    pub a: u32,
    /// Instruction pointer, always in `[0, N)`
    pub c: u32,
    /// Data pointer, always in `[0, N)`
    pub d: u32,
    memory: Box<[u32]>,
}

impl VmState {
    /// Load a program image.
    ///
    /// Bytes `0x1A` and `0x04` end the image, whitespace (space, tab, CR, LF) is skipped and every
    /// other byte must be printable and decode to one of the eight instructions at the position
    /// it is loaded to. Memory past the loaded prefix is filled by applying
    /// [`crate::vm::ternary::operate`] to the two preceding cells.
    ///
    /// # Arguments
    /// * `image` - The raw program image
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidProgramByte`] for an illegal byte,
    /// [`crate::Error::ProgramTooShort`] / [`crate::Error::ProgramTooLong`] if the number of
    /// instruction bytes is outside `[2, 59049]` and [`crate::Error::OutOfMemory`] if the
    /// memory cannot be allocated.
    pub fn load(image: &ProgramImage) -> Result<VmState> {
        Self::from_bytes(image.data())
    }

    /// Load a program from raw image bytes. See [`VmState::load`].
    ///
    /// # Errors
    /// See [`VmState::load`].
    pub fn from_bytes(data: &[u8]) -> Result<VmState> {
        let mut prefix = Vec::new();
        prefix.try_reserve(data.len().min(MEMORY_SIZE))?;

        for &byte in data {
            if byte == 0x1A || byte == 0x04 {
                break;
            }
            if matches!(byte, b' ' | b'\t' | b'\r' | b'\n') {
                continue;
            }

            let position = prefix.len();
            let value = u32::from(byte);
            let index = (value + (position as u32) % OPCODE_MODULUS) % OPCODE_MODULUS;
            if !(PRINTABLE_MIN..=PRINTABLE_MAX).contains(&value) || !Opcode::is_valid_index(index)
            {
                return Err(InvalidProgramByte { byte, position });
            }
            if position == MEMORY_SIZE {
                return Err(ProgramTooLong { limit: MEMORY_SIZE });
            }

            prefix.push(value);
        }

        debug!("program image holds {} instruction bytes", prefix.len());
        Self::from_cells(&prefix)
    }

    /// Build a state from the given memory prefix without validating it as instructions.
    ///
    /// The remaining cells are derived exactly as for a loaded image, so crafted images (and
    /// images whose data cells hold arbitrary words) can be analysed the same way.
    ///
    /// # Errors
    /// Returns [`crate::Error::ProgramTooShort`] / [`crate::Error::ProgramTooLong`] if the
    /// prefix length is outside `[2, 59049]` and [`crate::Error::OutOfMemory`] if the memory
    /// cannot be allocated.
    pub fn from_cells(prefix: &[u32]) -> Result<VmState> {
        if prefix.len() < MIN_PROGRAM_LENGTH {
            return Err(ProgramTooShort {
                length: prefix.len(),
            });
        }
        if prefix.len() > MEMORY_SIZE {
            return Err(ProgramTooLong { limit: MEMORY_SIZE });
        }

        let mut memory = Vec::new();
        memory.try_reserve_exact(MEMORY_SIZE)?;
        memory.extend(prefix.iter().map(|value| value % MEMORY_SIZE as u32));
        while memory.len() < MEMORY_SIZE {
            let len = memory.len();
            memory.push(operate(memory[len - 1], memory[len - 2]));
        }

        Ok(VmState {
            a: 0,
            c: 0,
            d: 0,
            memory: memory.into_boxed_slice(),
        })
    }

    /// The value stored at `address` (taken modulo the memory size).
    #[must_use]
    pub fn cell(&self, address: u32) -> u32 {
        self.memory[address as usize % MEMORY_SIZE]
    }

    /// Store `value` at `address` (both taken modulo the memory size).
    pub fn set_cell(&mut self, address: u32, value: u32) {
        self.memory[address as usize % MEMORY_SIZE] = value % MEMORY_SIZE as u32;
    }

    /// The whole memory.
    #[must_use]
    pub fn memory(&self) -> &[u32] {
        &self.memory
    }

    /// The instruction `C` currently points at, or `None` if its cell is not printable.
    #[must_use]
    pub fn current_opcode(&self) -> Option<Opcode> {
        Opcode::decode(self.cell(self.c), self.c)
    }
}

impl fmt::Debug for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VmState")
            .field("a", &self.a)
            .field("c", &self.c)
            .field("d", &self.d)
            .field("memory[c]", &self.cell(self.c))
            .field("memory[d]", &self.cell(self.d))
            .finish_non_exhaustive()
    }
}
