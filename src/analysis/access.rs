//! Per-cell access facts accumulated over recorded runs.
//!
//! Every recorded run of the engine reports its memory accesses as
//! [`AccessEvent`](crate::vm::AccessEvent)s; [`AccessFacts`] folds them into one
//! [`AccessFlags`] word per cell plus four lazily allocated link sets. The facts only ever grow:
//! no event clears a flag or removes a link.

use std::collections::BTreeSet;

use bitflags::bitflags;

use crate::{
    vm::{successor, AccessEvent, Recorder, MEMORY_SIZE},
    Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// How a memory cell has been accessed
    pub struct AccessFlags: u16 {
        /// `MovD` read the new data pointer from this cell
        const MOVE_SOURCE = 0x0001;
        /// `Jmp` read its target from this cell
        const JUMP_SOURCE = 0x0002;
        /// `Rot` or `Opr` read and wrote this cell
        const DATA_RW = 0x0004;
        /// `D` landed here after a `MovD`
        const REACHED_BY_MOVE = 0x0008;
        /// The instruction in this cell ran (not counting the first step of a run)
        const EXECUTED = 0x0100;
        /// The cell went through the rewrite permutation
        const REWRITTEN = 0x0200;
        /// `C` landed here after a `Jmp`
        const REACHED_BY_JUMP = 0x0400;
        /// `C` reached this cell by the regular increment
        const REACHED_SEQUENTIALLY = 0x0800;
        /// The block containing this cell must keep its absolute address
        const FIXED_OFFSET = 0x8000;

        /// Flags that make a cell part of the code
        const CODE = Self::REWRITTEN.bits()
            | Self::REACHED_SEQUENTIALLY.bits()
            | Self::EXECUTED.bits()
            | Self::REACHED_BY_JUMP.bits();
        /// Flags that make a cell part of the data
        const DATA = Self::MOVE_SOURCE.bits()
            | Self::JUMP_SOURCE.bits()
            | Self::DATA_RW.bits()
            | Self::REACHED_BY_MOVE.bits();
    }
}

/// The address relations of a single cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellLinks {
    /// Data accesses that directly followed an access of this cell within a run
    pub successors: BTreeSet<u32>,
    /// Data accesses that directly preceded an access of this cell within a run
    pub predecessors: BTreeSet<u32>,
    /// Every target a `Jmp` read from this cell
    pub jump_destinations: BTreeSet<u32>,
    /// Every target a `MovD` read from this cell
    pub move_destinations: BTreeSet<u32>,
}

impl CellLinks {
    fn merge(&mut self, other: &CellLinks) {
        self.successors.extend(&other.successors);
        self.predecessors.extend(&other.predecessors);
        self.jump_destinations.extend(&other.jump_destinations);
        self.move_destinations.extend(&other.move_destinations);
    }
}

/// Access flags and links of one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellInfo {
    /// Accumulated access flags
    pub access: AccessFlags,
    /// Link sets, allocated on first use
    pub links: Option<Box<CellLinks>>,
}

/// Accumulated knowledge about every cell, built from recorded runs.
///
/// `Clone` produces an independent snapshot, which the entry optimizer consults while it keeps
/// recording into the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessFacts {
    cells: Vec<CellInfo>,
    /// The accumulator value at the entry point is observable by the program
    pub accumulator_matters: bool,
    /// Largest number of steps any recorded run took from the entry point
    pub max_steps_from_entry: u64,
}

impl AccessFacts {
    /// Create empty facts covering the whole address space.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfMemory`] if the cell table cannot be allocated.
    pub fn new() -> Result<Self> {
        let mut cells = Vec::new();
        cells.try_reserve_exact(MEMORY_SIZE)?;
        cells.resize_with(MEMORY_SIZE, CellInfo::default);

        Ok(AccessFacts {
            cells,
            accumulator_matters: false,
            max_steps_from_entry: 0,
        })
    }

    /// Facts about the cell at `address` (modulo the memory size).
    #[must_use]
    pub fn cell(&self, address: u32) -> &CellInfo {
        &self.cells[address as usize % MEMORY_SIZE]
    }

    /// Access flags of the cell at `address`.
    #[must_use]
    pub fn access(&self, address: u32) -> AccessFlags {
        self.cell(address).access
    }

    /// Link sets of the cell at `address`, if any link was ever recorded.
    #[must_use]
    pub fn links(&self, address: u32) -> Option<&CellLinks> {
        self.cell(address).links.as_deref()
    }

    /// Set `flags` on the cell at `address`.
    pub fn insert(&mut self, address: u32, flags: AccessFlags) {
        self.cells[address as usize % MEMORY_SIZE].access |= flags;
    }

    /// Returns `true` if no cell was ever accessed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|cell| cell.access.is_empty())
    }

    /// Addresses of all cells with at least one flag, ascending.
    pub fn accessed(&self) -> impl Iterator<Item = u32> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.access.is_empty())
            .map(|(address, _)| address as u32)
    }

    /// Union `other` into these facts.
    pub fn merge(&mut self, other: &AccessFacts) {
        for (cell, theirs) in self.cells.iter_mut().zip(&other.cells) {
            cell.access |= theirs.access;
            if let Some(links) = &theirs.links {
                cell.links.get_or_insert_with(Box::default).merge(links);
            }
        }
        self.accumulator_matters |= other.accumulator_matters;
        self.max_steps_from_entry = self.max_steps_from_entry.max(other.max_steps_from_entry);
    }

    fn links_mut(&mut self, address: u32) -> &mut CellLinks {
        self.cells[address as usize % MEMORY_SIZE]
            .links
            .get_or_insert_with(Box::default)
    }
}

impl Recorder for AccessFacts {
    fn record(&mut self, event: AccessEvent) {
        match event {
            AccessEvent::Executed { address } => self.insert(address, AccessFlags::EXECUTED),
            AccessEvent::Jump {
                source,
                destination,
            } => {
                self.insert(source, AccessFlags::JUMP_SOURCE);
                self.links_mut(source).jump_destinations.insert(destination);
                self.insert(successor(destination), AccessFlags::REACHED_BY_JUMP);
            }
            AccessEvent::Move {
                source,
                destination,
            } => {
                self.insert(source, AccessFlags::MOVE_SOURCE);
                self.links_mut(source).move_destinations.insert(destination);
                self.insert(successor(destination), AccessFlags::REACHED_BY_MOVE);
            }
            AccessEvent::ReadWrite { address } => self.insert(address, AccessFlags::DATA_RW),
            AccessEvent::FlowEdge { from, to } => {
                self.links_mut(from).successors.insert(to);
                self.links_mut(to).predecessors.insert(from);
            }
            AccessEvent::Rewritten { address } => self.insert(address, AccessFlags::REWRITTEN),
            AccessEvent::ReachedSequentially { address } => {
                self.insert(address, AccessFlags::REACHED_SEQUENTIALLY);
            }
        }
    }

    fn is_known_code(&self, address: u32) -> bool {
        self.access(address).contains(AccessFlags::EXECUTED)
    }

    fn is_known_data(&self, address: u32) -> bool {
        self.access(address).contains(AccessFlags::DATA_RW)
    }
}
