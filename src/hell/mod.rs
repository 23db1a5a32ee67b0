//! HeLL assembly output.
//!
//! [`HellWriter`] renders a [`Disassembly`] as a HeLL source file: a `.CODE` section with one
//! labelled run of instructions per code block, and a `.DATA` section with the data words each
//! data block holds at the entry point. Blocks that have to keep their absolute address get an
//! `.OFFSET` directive.
//!
//! # Example
//!
//! ```rust,no_run
//! use malscope::{hell::{default_output_path, HellWriter}, prelude::*};
//! use std::{fs::File, path::Path};
//!
//! let input = Path::new("hello.mb");
//! let image = ProgramImage::from_file(input)?;
//! let traces = vec![Vec::new()];
//! let disassembly = Disassembler::new(DisassemblerConfig::scripted())
//!     .analyse(&image, RunDriver::Scripted { traces: &traces })?;
//!
//! let mut output = File::create(default_output_path(input))?;
//! HellWriter::new().write(&disassembly, &mut output)?;
//! # Ok::<(), malscope::Error>(())
//! ```

use std::{
    ffi::OsString,
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    analysis::{classify_cell_with_threshold, AccessFlags, ConnectedBlock, LONG_CYCLE_THRESHOLD},
    session::Disassembly,
    vm::{successor, Opcode, MEMORY_SIZE, OPCODE_MODULUS, WORD_MAX},
    Result,
};

/// File extension of HeLL sources.
pub const HELL_EXTENSION: &str = "hell";

const LAST_ADDRESS: u32 = MEMORY_SIZE as u32 - 1;

/// Writes a [`Disassembly`] as HeLL assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HellWriter {
    long_cycle_threshold: usize,
}

impl Default for HellWriter {
    fn default() -> Self {
        HellWriter {
            long_cycle_threshold: LONG_CYCLE_THRESHOLD,
        }
    }
}

impl HellWriter {
    /// A writer using the default long-cycle threshold.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite cycles longer than `threshold` are written as their current instruction only.
    #[must_use]
    pub fn with_long_cycle_threshold(mut self, threshold: usize) -> Self {
        self.long_cycle_threshold = threshold;
        self
    }

    /// Write the HeLL source of `disassembly` to `out`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if writing fails.
    pub fn write<W: Write + ?Sized>(&self, disassembly: &Disassembly, out: &mut W) -> Result<()> {
        self.write_code(disassembly, out)?;
        self.write_data(disassembly, out)?;
        out.flush()?;
        Ok(())
    }

    /// Render the HeLL source of `disassembly` into a string.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if rendering fails.
    pub fn render(&self, disassembly: &Disassembly) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(disassembly, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn write_code<W: Write + ?Sized>(&self, disassembly: &Disassembly, out: &mut W) -> Result<()> {
        let facts = &disassembly.facts;
        let entry = &disassembly.entry.state;

        writeln!(out, ".CODE")?;
        if facts.accumulator_matters {
            write!(out, "INIT_A:\n\tRot\n\tMovD\n\tJmp\n\n")?;
        }

        for block in &disassembly.components.code {
            let mut last_executed: Option<u32> = None;
            let mut first_line = true;

            for address in code_order(block) {
                let access = facts.access(address);
                let mut label = false;
                let executed = access.contains(AccessFlags::EXECUTED);

                if executed {
                    if last_executed.map(successor) != Some(address) {
                        label = true;
                        if block.fixed_offset {
                            if !first_line {
                                writeln!(out)?;
                            }
                            writeln!(out, ".OFFSET {address}")?;
                        }
                    }
                    last_executed = Some(address);
                }
                if access.contains(AccessFlags::REACHED_BY_JUMP) {
                    label = true;
                }

                if label {
                    writeln!(out, "CODE_{address}:")?;
                }
                if executed {
                    let value = entry.cell(address);
                    if access.contains(AccessFlags::REWRITTEN) {
                        match classify_cell_with_threshold(
                            value,
                            address,
                            self.long_cycle_threshold,
                        ) {
                            Some(class) => writeln!(out, "\t{class}")?,
                            None => writeln!(out, "\tInvalid")?,
                        }
                    } else {
                        writeln!(out, "\t{}", instruction(value, address).mnemonic())?;
                    }
                }
                first_line = false;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn write_data<W: Write + ?Sized>(&self, disassembly: &Disassembly, out: &mut W) -> Result<()> {
        let facts = &disassembly.facts;
        let entry = &disassembly.entry.state;

        writeln!(out, ".DATA")?;
        if facts.accumulator_matters {
            write!(out, "ENTRY:\n\tINIT_A {}<<1\n\tORIGINAL_ENTRY\n\n", entry.a)?;
        }

        for block in &disassembly.components.data {
            let mut last_written: Option<u32> = None;

            for &address in &block.cells {
                let access = facts.access(address);
                let offset = block.fixed_offset && last_written.is_none();
                let data_label =
                    last_written.is_none() || access.contains(AccessFlags::REACHED_BY_MOVE);
                let code_label = access.contains(AccessFlags::REACHED_BY_JUMP);

                if let Some(last) = last_written {
                    for _ in last + 1..address {
                        writeln!(out, "\t?-")?;
                    }
                }
                if offset {
                    writeln!(out, ".OFFSET {address}")?;
                }
                if address == entry.d {
                    if facts.accumulator_matters {
                        writeln!(out, "ORIGINAL_ENTRY:")?;
                    } else {
                        writeln!(out, "ENTRY:")?;
                    }
                }
                if code_label {
                    writeln!(out, "CODE_{address}:")?;
                }
                if data_label {
                    writeln!(out, "DATA_{address}:")?;
                }

                let value = entry.cell(address);
                if access.contains(AccessFlags::DATA_RW) {
                    writeln!(out, "\t{}", constant(value))?;
                } else if access.contains(AccessFlags::JUMP_SOURCE) {
                    writeln!(out, "\tCODE_{}", successor(value))?;
                } else if access.contains(AccessFlags::MOVE_SOURCE) {
                    writeln!(out, "\tDATA_{}", successor(value))?;
                } else if access.contains(AccessFlags::REACHED_BY_MOVE) {
                    // the value is irrelevant but the cell carries a label
                    writeln!(out, "\t?")?;
                } else {
                    writeln!(out, "\tINVALID")?;
                }
                last_written = Some(address);
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

/// The output file for `input`: its extension replaced by `.hell`, or `.hell` appended when it
/// has none or already is a HeLL file.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    match input.extension() {
        Some(extension) if extension != HELL_EXTENSION => input.with_extension(HELL_EXTENSION),
        _ => {
            let mut path = OsString::from(input.as_os_str());
            path.push(".");
            path.push(HELL_EXTENSION);
            PathBuf::from(path)
        }
    }
}

/// The instruction a cell value represents at `address`, without range check.
fn instruction(value: u32, address: u32) -> Opcode {
    Opcode::from_index((value % OPCODE_MODULUS + address % OPCODE_MODULUS) % OPCODE_MODULUS)
}

/// HeLL spelling of a data word.
fn constant(value: u32) -> String {
    match value {
        0 => "C0".to_string(),
        v if v == WORD_MAX / 2 => "C1".to_string(),
        v if v == WORD_MAX - 2 => "C20".to_string(),
        v if v == WORD_MAX - 1 => "C21".to_string(),
        WORD_MAX => "C2".to_string(),
        10 => "'\\n'".to_string(),
        32..=126 => format!("'{}'", char::from(value as u8)),
        _ => value.to_string(),
    }
}

/// Addresses of a code block in emission order.
///
/// A block that runs over the end of memory into address 0 starts at the lowest address of
/// the part at the end of memory, so the wrapped run stays contiguous.
fn code_order(block: &ConnectedBlock) -> Vec<u32> {
    if !(block.contains(0) && block.contains(LAST_ADDRESS)) {
        return block.cells.iter().copied().collect();
    }

    let mut start = LAST_ADDRESS;
    while start > 0 && block.contains(start - 1) {
        start -= 1;
    }
    if start == 0 {
        return block.cells.iter().copied().collect();
    }

    block
        .cells
        .range(start..)
        .chain(block.cells.range(..start))
        .copied()
        .collect()
}
