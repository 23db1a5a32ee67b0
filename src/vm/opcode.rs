//! Instruction set of the ternary machine.
//!
//! A memory cell does not carry an opcode by itself: the instruction a cell represents depends on
//! its value *and* on its address. The active opcode index of the cell at address `c` is
//! `(memory[c] + c) mod 94`, and only eight of the 94 indices are meaningful. Everything else
//! behaves as a no-op.
//!
//! | Index | Opcode | Mnemonic |
//! |------:|--------|----------|
//! | 4  | [`Opcode::Jump`]    | `Jmp`  |
//! | 5  | [`Opcode::Output`]  | `Out`  |
//! | 23 | [`Opcode::Input`]   | `In`   |
//! | 39 | [`Opcode::Rotate`]  | `Rot`  |
//! | 40 | [`Opcode::MoveD`]   | `MovD` |
//! | 62 | [`Opcode::Operate`] | `Opr`  |
//! | 68 | [`Opcode::Nop`]     | `Nop`  |
//! | 81 | [`Opcode::Halt`]    | `Hlt`  |

use bitflags::bitflags;
use strum::{Display, EnumCount, EnumIter, IntoStaticStr};

use crate::vm::{PRINTABLE_MAX, PRINTABLE_MIN};

/// Number of distinct opcode indices (the size of the printable alphabet).
pub const OPCODE_MODULUS: u32 = 94;

/// The eight instruction kinds of the machine.
///
/// The discriminant of each variant is its opcode index; [`Opcode::Nop`] carries the canonical
/// no-op index 68, although every unassigned index decodes to it as well.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    IntoStaticStr,
    EnumIter,
    EnumCount,
)]
#[repr(u8)]
pub enum Opcode {
    /// `C := memory[D]`
    #[strum(serialize = "Jmp")]
    Jump = 4,
    /// Emit the accumulator as a character
    #[strum(serialize = "Out")]
    Output = 5,
    /// Read one character into the accumulator
    #[strum(serialize = "In")]
    Input = 23,
    /// Rotate `memory[D]` right by one trit, store into `memory[D]` and `A`
    #[strum(serialize = "Rot")]
    Rotate = 39,
    /// `D := memory[D]`
    #[strum(serialize = "MovD")]
    MoveD = 40,
    /// Apply the tritwise operation to `A` and `memory[D]`, store into both
    #[strum(serialize = "Opr")]
    Operate = 62,
    /// Explicit no-op
    #[strum(serialize = "Nop")]
    Nop = 68,
    /// Stop the machine
    #[strum(serialize = "Hlt")]
    Halt = 81,
}

impl Opcode {
    /// Map an opcode index in `[0, 94)` to its instruction. Unassigned indices are [`Opcode::Nop`].
    #[must_use]
    pub const fn from_index(index: u32) -> Opcode {
        match index {
            4 => Opcode::Jump,
            5 => Opcode::Output,
            23 => Opcode::Input,
            39 => Opcode::Rotate,
            40 => Opcode::MoveD,
            62 => Opcode::Operate,
            81 => Opcode::Halt,
            _ => Opcode::Nop,
        }
    }

    /// Returns `true` if `index` is one of the eight indices a program image may contain.
    ///
    /// The explicit no-op index 68 is valid in an image; the other unassigned indices are not.
    #[must_use]
    pub const fn is_valid_index(index: u32) -> bool {
        matches!(index, 4 | 5 | 23 | 39 | 40 | 62 | 68 | 81)
    }

    /// Decode the instruction a cell holding `value` represents at `address`.
    ///
    /// Returns `None` when the value lies outside the printable range `[33, 126]`, which is an
    /// invalid-instruction fault for the executing machine.
    #[must_use]
    pub const fn decode(value: u32, address: u32) -> Option<Opcode> {
        if value < PRINTABLE_MIN || value > PRINTABLE_MAX {
            return None;
        }

        Some(Opcode::from_index((value + address % OPCODE_MODULUS) % OPCODE_MODULUS))
    }

    /// The opcode index of this instruction.
    #[must_use]
    pub const fn index(self) -> u32 {
        self as u32
    }

    /// The printable value that decodes to this instruction when stored at `address`.
    ///
    /// ```rust
    /// use malscope::vm::Opcode;
    ///
    /// let value = Opcode::Jump.encode(0);
    /// assert_eq!(value, u32::from(b'b'));
    /// assert_eq!(Opcode::decode(value, 0), Some(Opcode::Jump));
    /// ```
    #[must_use]
    pub const fn encode(self, address: u32) -> u32 {
        let value = (self.index() + OPCODE_MODULUS - address % OPCODE_MODULUS) % OPCODE_MODULUS;
        if value < PRINTABLE_MIN {
            value + OPCODE_MODULUS
        } else {
            value
        }
    }

    /// The assembler mnemonic (`Jmp`, `Out`, `In`, `Rot`, `MovD`, `Opr`, `Hlt`, `Nop`).
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        self.into()
    }

    /// The [`OpcodeMask`] bit of this instruction.
    #[must_use]
    pub const fn mask(self) -> OpcodeMask {
        match self {
            Opcode::Jump => OpcodeMask::JUMP,
            Opcode::Output => OpcodeMask::OUTPUT,
            Opcode::Input => OpcodeMask::INPUT,
            Opcode::Rotate => OpcodeMask::ROTATE,
            Opcode::MoveD => OpcodeMask::MOVE_D,
            Opcode::Operate => OpcodeMask::OPERATE,
            Opcode::Nop => OpcodeMask::NOP,
            Opcode::Halt => OpcodeMask::HALT,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// A set of instruction kinds, used to stop execution before one of them runs
    pub struct OpcodeMask: u8 {
        /// Stop before `Hlt`
        const HALT = 0x01;
        /// Stop before `Jmp`
        const JUMP = 0x02;
        /// Stop before `MovD`
        const MOVE_D = 0x04;
        /// Stop before `Opr`
        const OPERATE = 0x08;
        /// Stop before `Out`
        const OUTPUT = 0x10;
        /// Stop before `In`
        const INPUT = 0x20;
        /// Stop before `Rot`
        const ROTATE = 0x40;
        /// Stop before any no-op
        const NOP = 0x80;
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_decode_table() {
        assert_eq!(Opcode::decode(98, 0), Some(Opcode::Jump));
        assert_eq!(Opcode::decode(40, 0), Some(Opcode::MoveD));
        assert_eq!(Opcode::decode(61, 1), Some(Opcode::Operate));
        assert_eq!(Opcode::decode(33, 1), Some(Opcode::Nop));
        assert_eq!(Opcode::decode(94, 99), Some(Opcode::Output));
    }

    #[test]
    fn test_decode_rejects_unprintable() {
        assert_eq!(Opcode::decode(32, 0), None);
        assert_eq!(Opcode::decode(127, 0), None);
        assert_eq!(Opcode::decode(0, 4), None);
        assert_eq!(Opcode::decode(59048, 0), None);
    }

    #[test]
    fn test_unassigned_indices_are_nop() {
        for index in 0..OPCODE_MODULUS {
            let opcode = Opcode::from_index(index);
            if Opcode::is_valid_index(index) {
                assert_eq!(opcode.index(), index);
            } else {
                assert_eq!(opcode, Opcode::Nop, "index {index}");
            }
        }
    }

    #[test]
    fn test_encode_inverts_decode() {
        for address in [0_u32, 1, 33, 93, 94, 95, 4711, 59048] {
            for opcode in Opcode::iter() {
                let value = opcode.encode(address);
                assert!((PRINTABLE_MIN..=PRINTABLE_MAX).contains(&value));
                assert_eq!(Opcode::decode(value, address), Some(opcode));
            }
        }
    }

    #[test]
    fn test_mnemonics() {
        let names: Vec<&str> = Opcode::iter().map(Opcode::mnemonic).collect();
        assert_eq!(names, ["Jmp", "Out", "In", "Rot", "MovD", "Opr", "Nop", "Hlt"]);
        assert_eq!(Opcode::MoveD.to_string(), "MovD");
        assert_eq!(Opcode::COUNT, 8);
    }

    #[test]
    fn test_masks_are_distinct() {
        let all = Opcode::iter().fold(OpcodeMask::empty(), |acc, op| {
            assert!(!acc.contains(op.mask()));
            acc | op.mask()
        });
        assert_eq!(all, OpcodeMask::all());
    }
}
