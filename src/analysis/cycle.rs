//! Classification of self-modifying cells.
//!
//! A cell that is executed more than once goes through the rewrite permutation in between, so it
//! represents a different instruction on every visit. Following the permutation from the value
//! the cell holds at the entry point back to itself yields the full sequence of instructions the
//! cell can ever represent. The permutation splits the printable range into cycles of length 68,
//! 9, 6, 5, 4 and 2.

use std::fmt;

use crate::vm::{xlat, Opcode, PRINTABLE_MAX, PRINTABLE_MIN};

/// Cycles longer than this are assumed to be executed once only.
pub const LONG_CYCLE_THRESHOLD: usize = 9;

/// What a self-modifying cell represents over its rewrite cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellClass {
    /// Every value on the cycle decodes to a no-op at this address
    NopCycle,
    /// The instructions of a short cycle, starting with the current value
    Cycle(Vec<Opcode>),
    /// A long cycle, represented by the current instruction only
    Single(Opcode),
}

impl fmt::Display for CellClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellClass::NopCycle => f.write_str("RNop"),
            CellClass::Single(opcode) => f.write_str(opcode.mnemonic()),
            CellClass::Cycle(opcodes) => {
                for (index, opcode) in opcodes.iter().enumerate() {
                    if index > 0 {
                        f.write_str("/")?;
                    }
                    f.write_str(opcode.mnemonic())?;
                }
                Ok(())
            }
        }
    }
}

/// Classify a cell holding `value` at `address`, using [`LONG_CYCLE_THRESHOLD`].
///
/// Returns `None` if `value` is outside the printable range.
///
/// ```rust
/// use malscope::analysis::{classify_cell, CellClass};
/// use malscope::vm::Opcode;
///
/// assert_eq!(classify_cell(u32::from(b')'), 0), Some(CellClass::NopCycle));
/// assert_eq!(classify_cell(u32::from(b'b'), 0), Some(CellClass::Single(Opcode::Jump)));
/// assert_eq!(classify_cell(20, 0), None);
/// ```
#[must_use]
pub fn classify_cell(value: u32, address: u32) -> Option<CellClass> {
    classify_cell_with_threshold(value, address, LONG_CYCLE_THRESHOLD)
}

/// Classify a cell holding `value` at `address`; cycles longer than `threshold` are
/// [`CellClass::Single`].
#[must_use]
pub fn classify_cell_with_threshold(
    value: u32,
    address: u32,
    threshold: usize,
) -> Option<CellClass> {
    let length = cycle_length(value)?;

    let mut opcodes = Vec::with_capacity(length);
    let mut current = value;
    for _ in 0..length {
        opcodes.push(Opcode::decode(current, address)?);
        current = xlat(current);
    }

    if opcodes.iter().all(|&opcode| opcode == Opcode::Nop) {
        return Some(CellClass::NopCycle);
    }
    if length > threshold {
        return Some(CellClass::Single(opcodes[0]));
    }
    Some(CellClass::Cycle(opcodes))
}

/// Length of the rewrite cycle through `value`, or `None` if `value` is not printable.
#[must_use]
pub fn cycle_length(value: u32) -> Option<usize> {
    if !(PRINTABLE_MIN..=PRINTABLE_MAX).contains(&value) {
        return None;
    }

    let mut length = 1;
    let mut current = xlat(value);
    while current != value {
        current = xlat(current);
        length += 1;
    }
    Some(length)
}
