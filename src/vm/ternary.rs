//! Ternary arithmetic of the machine.
//!
//! Machine words are ten trits wide (`3^10` values). Besides the two data operations
//! ([`operate`] and [`rotate_right`]) this module hosts the rewrite permutation that every
//! executed cell goes through ([`xlat`]).

use crate::vm::{OPCODE_MODULUS, PRINTABLE_MIN};

/// Number of trits in a machine word.
pub const TRITS: u32 = 10;

/// Weight of the most significant trit (`3^9`).
const TOP_TRIT: u32 = 19_683;

/// The tritwise operation table, indexed by `a_trit + 3 * d_trit`.
const OPERATE_TABLE: [u32; 9] = [1, 0, 0, 1, 0, 2, 2, 2, 1];

/// The rewrite permutation applied to an executed cell, indexed by `value - 33`.
pub const XLAT: &[u8; 94] =
    b"5z]&gqtyfr$(we4{WP)H-Zn,[%\\3dL+Q;>U!pJS72FhOA1CB6v^=I_0/8|jsb9m<.TVac`uY*MK'X~xDl}REokN:#?G\"i@";

/// Apply the tritwise operation table to `a` and `d`, digit by digit across all ten trits.
#[must_use]
pub fn operate(a: u32, d: u32) -> u32 {
    let mut a = a;
    let mut d = d;
    let mut weight = 1;
    let mut output = 0;

    for _ in 0..TRITS {
        output += weight * OPERATE_TABLE[(a % 3 + 3 * (d % 3)) as usize];
        a /= 3;
        d /= 3;
        weight *= 3;
    }

    output
}

/// Rotate a word right by one trit: the least significant trit becomes the most significant.
#[must_use]
pub const fn rotate_right(d: u32) -> u32 {
    d / 3 + TOP_TRIT * (d % 3)
}

/// The self-modification step: bring `value` back into the printable range, then substitute it
/// through [`XLAT`].
///
/// Values that a data operation left outside `[33, 126]` are normalised first, which the
/// reference interpreter would have rejected.
#[must_use]
pub fn xlat(value: u32) -> u32 {
    let mut value = value;
    if value < PRINTABLE_MIN {
        value += OPCODE_MODULUS;
    }
    value -= PRINTABLE_MIN;
    if value >= OPCODE_MODULUS {
        value %= OPCODE_MODULUS;
    }

    u32::from(XLAT[value as usize])
}
