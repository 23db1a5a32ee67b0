use std::path::Path;

use malscope::{analysis::ConnectedBlock, vm::Interrupt};
use serde::Serialize;

use crate::{
    app::{GlobalOptions, SessionOptions},
    commands::common::{analyse, disassembler},
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
pub struct BlockInfo {
    pub kind: &'static str,
    pub first: u32,
    pub last: u32,
    pub cells: usize,
    pub fixed: bool,
}

#[derive(Debug, Serialize)]
pub struct BlocksReport {
    pub entry_step: u64,
    pub entry_optimized: bool,
    pub max_steps_from_entry: u64,
    pub accumulator_matters: bool,
    pub inconsistencies: usize,
    pub blocks: Vec<BlockInfo>,
}

fn block_info(kind: &'static str, block: &ConnectedBlock) -> BlockInfo {
    BlockInfo {
        kind,
        first: block.first().unwrap_or_default(),
        last: block.cells.last().copied().unwrap_or_default(),
        cells: block.len(),
        fixed: block.fixed_offset,
    }
}

pub fn run(
    path: &Path,
    opts: &SessionOptions,
    interrupt: &Interrupt,
    global: &GlobalOptions,
) -> anyhow::Result<()> {
    let disassembly = analyse(path, opts, &disassembler(opts, interrupt))?;
    let components = &disassembly.components;

    let report = BlocksReport {
        entry_step: disassembly.entry.steps,
        entry_optimized: disassembly.entry_optimized,
        max_steps_from_entry: disassembly.facts.max_steps_from_entry,
        accumulator_matters: disassembly.facts.accumulator_matters,
        inconsistencies: components.inconsistencies,
        blocks: components
            .code
            .iter()
            .map(|block| block_info("code", block))
            .chain(components.data.iter().map(|block| block_info("data", block)))
            .collect(),
    };

    print_output(&report, global, |report| {
        println!(
            "Entry point:     step {}{}",
            report.entry_step,
            if report.entry_optimized {
                " (moved by optimizer)"
            } else {
                ""
            }
        );
        println!("Steps recorded:  {}", report.max_steps_from_entry);
        let accumulator = if report.accumulator_matters {
            "initialised"
        } else {
            "unused"
        };
        println!("Accumulator:     {accumulator}");
        if report.inconsistencies > 0 {
            println!("Inconsistent:    {} blocks", report.inconsistencies);
        }
        println!();

        let mut tw = TabWriter::new(&[
            ("Kind", Align::Left),
            ("First", Align::Right),
            ("Last", Align::Right),
            ("Cells", Align::Right),
            ("Fixed", Align::Left),
        ]);
        for block in &report.blocks {
            tw.row(vec![
                block.kind.to_string(),
                block.first.to_string(),
                block.last.to_string(),
                block.cells.to_string(),
                if block.fixed { "yes" } else { "" }.to_string(),
            ]);
        }
        tw.print();
    })
}
