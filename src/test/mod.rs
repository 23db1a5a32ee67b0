//! Helpers for crafting machine states in unit tests.

use crate::vm::{Opcode, VmState};

/// Builds a [`VmState`] from instructions placed at consecutive addresses, with optional cell
/// overrides applied after the memory fill.
#[derive(Debug, Default, Clone)]
pub struct ProgramBuilder {
    prefix: Vec<u32>,
    overrides: Vec<(u32, u32)>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        ProgramBuilder::default()
    }

    /// Append instructions, each encoded for the address it lands on.
    pub fn instructions(mut self, opcodes: &[Opcode]) -> Self {
        for opcode in opcodes {
            let address = self.prefix.len() as u32;
            self.prefix.push(opcode.encode(address));
        }
        self
    }

    /// Overwrite a single cell after the memory has been filled.
    pub fn cell(mut self, address: u32, value: u32) -> Self {
        self.overrides.push((address, value));
        self
    }

    pub fn build(&self) -> VmState {
        let mut state = VmState::from_cells(&self.prefix).unwrap();
        for &(address, value) in &self.overrides {
            state.set_cell(address, value);
        }
        state
    }
}
