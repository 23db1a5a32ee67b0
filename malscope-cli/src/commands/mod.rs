pub mod blocks;
pub mod common;
pub mod cycle;
pub mod disasm;
pub mod entry;
