//! Reconstruction of connected code and data blocks.
//!
//! The extractor partitions every accessed cell into blocks of cells that have to stay together
//! in the reconstructed program: consecutively executed instructions, and data cells that were
//! accessed one after another. Each block is classified as code or data, and marked as
//! *fixed* when it has to keep its absolute address (because some cell holds a pointer into it
//! that the program computes on, or because it wraps around the end of memory).

use std::collections::{BTreeSet, VecDeque};

use log::{debug, warn};

use crate::{
    analysis::{AccessFacts, AccessFlags, EntryPoint},
    utils::BitSet,
    vm::{
        execute, successor, Channel, Interrupt, Opcode, OpcodeMask, Recording, StopCondition,
        MEMORY_SIZE,
    },
    Result,
};

const LAST_ADDRESS: u32 = MEMORY_SIZE as u32 - 1;

/// A maximal set of cells that belong together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectedBlock {
    /// The addresses of the block, ascending
    pub cells: BTreeSet<u32>,
    /// Some cell was accessed as code
    pub has_code: bool,
    /// Some cell was accessed as data
    pub has_data: bool,
    /// The block must keep its absolute address
    pub fixed_offset: bool,
}

impl ConnectedBlock {
    /// Lowest address of the block.
    #[must_use]
    pub fn first(&self) -> Option<u32> {
        self.cells.first().copied()
    }

    /// Number of cells in the block.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the block has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns `true` if the block contains `address`.
    #[must_use]
    pub fn contains(&self, address: u32) -> bool {
        self.cells.contains(&address)
    }
}

/// The blocks extracted from a set of access facts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Components {
    /// Blocks of code, in order of their lowest address
    pub code: Vec<ConnectedBlock>,
    /// Blocks of data, in order of their lowest address
    pub data: Vec<ConnectedBlock>,
    /// Number of blocks that were neither code nor data
    pub inconsistencies: usize,
}

impl Components {
    /// Returns `true` if some block could not be classified, which means the access facts
    /// contradict themselves and the reconstruction is not trustworthy.
    #[must_use]
    pub fn unreliable(&self) -> bool {
        self.inconsistencies > 0
    }
}

/// Partition the accessed cells into connected code and data blocks.
///
/// Before partitioning, every cell whose address is stored in a cell that is both used as a
/// pointer and modified as data gets [`AccessFlags::FIXED_OFFSET`], and a replay from `entry`
/// decides [`AccessFacts::accumulator_matters`]: the initial accumulator is observable if the
/// first accumulator-touching instruction reached from the entry is `Out` or `Opr`.
///
/// # Errors
/// Returns [`crate::Error::OutOfMemory`] if the work set cannot be allocated.
pub fn extract_components(facts: &mut AccessFacts, entry: &EntryPoint) -> Result<Components> {
    mark_fixed_targets(facts);
    facts.accumulator_matters = accumulator_matters(facts, entry);

    let mut remaining = BitSet::new(MEMORY_SIZE)?;
    for address in facts.accessed() {
        remaining.insert(address as usize);
    }
    debug!("partitioning {} accessed cells", remaining.count());

    let mut components = Components::default();
    let mut queue = VecDeque::new();

    while let Some(seed) = remaining.pop_first() {
        let mut block = ConnectedBlock::default();
        let mut has_code = false;
        let mut has_data = false;
        let mut fixed = false;
        queue.push_back(seed as u32);

        while let Some(address) = queue.pop_front() {
            let access = facts.access(address);
            let mut claim = |neighbour: u32, queue: &mut VecDeque<u32>| {
                if remaining.remove(neighbour as usize) {
                    queue.push_back(neighbour);
                }
            };

            if access.contains(AccessFlags::REACHED_SEQUENTIALLY) {
                let previous = if address == 0 {
                    fixed = true;
                    LAST_ADDRESS
                } else {
                    address - 1
                };
                claim(previous, &mut queue);
            }
            if access.contains(AccessFlags::REWRITTEN) {
                if address == LAST_ADDRESS {
                    fixed = true;
                }
                claim(successor(address), &mut queue);
            }
            if let Some(links) = facts.links(address) {
                for &next in &links.successors {
                    if next < address {
                        fixed = true;
                    }
                    claim(next, &mut queue);
                }
                for &previous in &links.predecessors {
                    if previous > address {
                        fixed = true;
                    }
                    claim(previous, &mut queue);
                }
            }

            has_code |= access.intersects(AccessFlags::CODE);
            has_data |= access.intersects(AccessFlags::DATA);
            fixed |= access.contains(AccessFlags::FIXED_OFFSET);
            block.cells.insert(address);
        }

        if has_code && has_data {
            // pointers into the code are data that has to stay where the code is
            has_code = false;
            fixed = true;
        }
        block.has_code = has_code;
        block.has_data = has_data;
        block.fixed_offset = fixed;

        if has_data {
            components.data.push(block);
        } else if has_code {
            components.code.push(block);
        } else {
            warn!(
                "Block at 0x{seed:05x} ({} cells) is neither code nor data",
                block.len()
            );
            components.inconsistencies += 1;
        }
    }

    debug!(
        "extracted {} code and {} data blocks",
        components.code.len(),
        components.data.len()
    );
    Ok(components)
}

/// Fix the targets of pointers the program modifies.
fn mark_fixed_targets(facts: &mut AccessFacts) {
    let mut targets = Vec::new();
    for address in facts.accessed() {
        let access = facts.access(address);
        if !access.contains(AccessFlags::DATA_RW)
            || !access.intersects(AccessFlags::JUMP_SOURCE | AccessFlags::MOVE_SOURCE)
        {
            continue;
        }
        if let Some(links) = facts.links(address) {
            targets.extend(
                links
                    .move_destinations
                    .iter()
                    .chain(&links.jump_destinations)
                    .map(|&destination| successor(destination)),
            );
        }
    }

    for target in targets {
        facts.insert(target, AccessFlags::FIXED_OFFSET);
    }
}

fn accumulator_matters(facts: &AccessFacts, entry: &EntryPoint) -> bool {
    let mut state = entry.state.clone();
    let stop = StopCondition::before(
        OpcodeMask::HALT
            | OpcodeMask::OPERATE
            | OpcodeMask::OUTPUT
            | OpcodeMask::INPUT
            | OpcodeMask::ROTATE,
    )
    .with_max_steps(facts.max_steps_from_entry.max(1));

    execute(
        &mut state,
        &mut Channel::silent(),
        &stop,
        Recording::Off,
        &Interrupt::new(),
    );

    matches!(
        state.current_opcode(),
        Some(Opcode::Output | Opcode::Operate)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test::ProgramBuilder,
        vm::{AccessEvent, Recorder, VmState},
    };

    /// The classic greeting program: prints and halts without ever jumping.
    const HELLO_WORLD: &[u8] =
        b"(=<`#9]~6ZY32Vx/4Rs+0No-&Jk)\"Fh}|Bcy?`=*z]Kw%oG4UUS0/@-ejc(:'8dc";

    fn entry_at(opcodes: &[Opcode]) -> EntryPoint {
        EntryPoint {
            state: ProgramBuilder::new().instructions(opcodes).build(),
            steps: 0,
        }
    }

    fn cells(block: &ConnectedBlock) -> Vec<u32> {
        block.cells.iter().copied().collect()
    }

    /// Record one silent run of `image` from its loaded state until it stops by itself.
    fn recorded(image: &[u8]) -> (AccessFacts, EntryPoint) {
        let state = VmState::from_bytes(image).unwrap();
        let mut facts = AccessFacts::new().unwrap();
        let mut running = state.clone();
        let run = execute(
            &mut running,
            &mut Channel::silent(),
            &StopCondition::unbounded(),
            Recording::Record(&mut facts),
            &Interrupt::new(),
        );
        facts.max_steps_from_entry = run.steps;
        (facts, EntryPoint { state, steps: 0 })
    }

    /// Every accessed cell lands in exactly one block, and every block is either code or data.
    fn assert_partition(facts: &mut AccessFacts, entry: &EntryPoint) -> Components {
        let components = extract_components(facts, entry).unwrap();
        assert_eq!(components.inconsistencies, 0);

        let mut seen = BTreeSet::new();
        for block in components.code.iter().chain(&components.data) {
            assert!(!block.is_empty());
            assert_ne!(block.has_code, block.has_data);
            for &address in &block.cells {
                assert!(seen.insert(address), "cell {address} is in two blocks");
            }
        }
        assert!(components.code.iter().all(|block| block.has_code));
        assert!(components.data.iter().all(|block| block.has_data));
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), facts.accessed().collect::<Vec<_>>());
        components
    }

    #[test]
    fn test_sequential_code_forms_one_block() {
        let mut facts = AccessFacts::new().unwrap();
        for address in 10..13 {
            facts.record(AccessEvent::Rewritten { address });
            facts.record(AccessEvent::ReachedSequentially { address: address + 1 });
        }
        facts.record(AccessEvent::Executed { address: 11 });

        let components = extract_components(&mut facts, &entry_at(&[Opcode::Nop, Opcode::Halt]))
            .unwrap();

        assert_eq!(components.code.len(), 1);
        assert!(components.data.is_empty());
        assert_eq!(cells(&components.code[0]), [10, 11, 12, 13]);
        assert!(!components.code[0].fixed_offset);
        assert!(!components.unreliable());
    }

    #[test]
    fn test_flow_links_join_data_cells() {
        let mut facts = AccessFacts::new().unwrap();
        facts.record(AccessEvent::ReadWrite { address: 40 });
        facts.record(AccessEvent::ReadWrite { address: 20 });
        facts.record(AccessEvent::FlowEdge { from: 40, to: 20 });
        facts.record(AccessEvent::ReadWrite { address: 90 });

        let components = extract_components(&mut facts, &entry_at(&[Opcode::Nop, Opcode::Halt]))
            .unwrap();

        assert_eq!(components.data.len(), 2);
        assert_eq!(cells(&components.data[0]), [20, 40]);
        // 20 has a predecessor above it
        assert!(components.data[0].fixed_offset);
        assert_eq!(cells(&components.data[1]), [90]);
        assert!(!components.data[1].fixed_offset);
    }

    #[test]
    fn test_wrap_around_fixes_the_block() {
        let mut facts = AccessFacts::new().unwrap();
        facts.record(AccessEvent::Rewritten {
            address: LAST_ADDRESS,
        });
        facts.record(AccessEvent::ReachedSequentially { address: 0 });
        facts.record(AccessEvent::Executed { address: 0 });

        let components = extract_components(&mut facts, &entry_at(&[Opcode::Nop, Opcode::Halt]))
            .unwrap();

        assert_eq!(components.code.len(), 1);
        assert_eq!(cells(&components.code[0]), [0, LAST_ADDRESS]);
        assert!(components.code[0].fixed_offset);
    }

    #[test]
    fn test_mixed_block_is_fixed_data() {
        let mut facts = AccessFacts::new().unwrap();
        facts.record(AccessEvent::Executed { address: 5 });
        facts.record(AccessEvent::ReadWrite { address: 5 });

        let components = extract_components(&mut facts, &entry_at(&[Opcode::Nop, Opcode::Halt]))
            .unwrap();

        assert!(components.code.is_empty());
        assert_eq!(components.data.len(), 1);
        let block = &components.data[0];
        assert!(block.has_data && !block.has_code && block.fixed_offset);
    }

    #[test]
    fn test_modified_pointer_fixes_its_target() {
        let mut facts = AccessFacts::new().unwrap();
        facts.record(AccessEvent::ReadWrite { address: 7 });
        facts.record(AccessEvent::Jump {
            source: 7,
            destination: 300,
        });
        facts.record(AccessEvent::Rewritten { address: 301 });

        let components = extract_components(&mut facts, &entry_at(&[Opcode::Nop, Opcode::Halt]))
            .unwrap();

        assert!(facts.access(301).contains(AccessFlags::FIXED_OFFSET));
        assert_eq!(components.code.len(), 1);
        assert_eq!(cells(&components.code[0]), [301]);
        assert!(components.code[0].fixed_offset);
    }

    #[test]
    fn test_fixed_mark_alone_is_inconsistent() {
        let mut facts = AccessFacts::new().unwrap();
        facts.record(AccessEvent::ReadWrite { address: 7 });
        facts.insert(900, AccessFlags::FIXED_OFFSET);

        let components = extract_components(&mut facts, &entry_at(&[Opcode::Nop, Opcode::Halt]))
            .unwrap();

        assert_eq!(components.data.len(), 1);
        assert!(components.code.is_empty());
        assert_eq!(components.inconsistencies, 1);
        assert!(components.unreliable());
    }

    #[test]
    fn test_accumulator_is_observable_through_output() {
        let mut facts = AccessFacts::new().unwrap();
        facts.max_steps_from_entry = 5;

        extract_components(&mut facts, &entry_at(&[Opcode::Nop, Opcode::Output])).unwrap();
        assert!(facts.accumulator_matters);

        extract_components(&mut facts, &entry_at(&[Opcode::Nop, Opcode::Input])).unwrap();
        assert!(!facts.accumulator_matters);

        // the replay is too short to reach the Opr
        facts.max_steps_from_entry = 0;
        extract_components(
            &mut facts,
            &entry_at(&[Opcode::Nop, Opcode::Nop, Opcode::Operate]),
        )
        .unwrap();
        assert!(!facts.accumulator_matters);
    }

    #[test]
    fn test_recorded_run_is_partitioned() {
        let (mut facts, entry) = recorded(HELLO_WORLD);
        assert_eq!(facts.accessed().count(), 60);

        let components = assert_partition(&mut facts, &entry);
        assert!(components.code.is_empty());
        assert_eq!(components.data.len(), 3);
        assert_eq!(components.data[0].first(), Some(0));
        assert_eq!(components.data[0].len(), 40);
    }

    #[test]
    fn test_runs_from_entry_are_partitioned() {
        let initial = VmState::from_bytes(b"ba&`@]").unwrap();
        let entry = crate::analysis::find_entry(&initial, 0, &Interrupt::new()).unwrap();
        let mut facts = AccessFacts::new().unwrap();
        let mut state = entry.state.clone();
        execute(
            &mut state,
            &mut Channel::silent(),
            &StopCondition::unbounded(),
            Recording::Record(&mut facts),
            &Interrupt::new(),
        );

        let components = assert_partition(&mut facts, &entry);
        assert!(!components.code.is_empty());
        assert!(!components.data.is_empty());
    }
}
