use std::path::Path;

use anyhow::Context;
use malscope::{
    analysis::find_entry,
    vm::{Interrupt, VmState, MEMORY_SIZE},
};
use serde::Serialize;

use crate::{app::GlobalOptions, commands::common::load_image, output::print_output};

#[derive(Debug, Serialize)]
pub struct EntryInfo {
    pub step: u64,
    pub a: u32,
    pub c: u32,
    pub d: u32,
    pub target: u32,
}

pub fn run(
    path: &Path,
    limit: u64,
    interrupt: &Interrupt,
    global: &GlobalOptions,
) -> anyhow::Result<()> {
    let image = load_image(path)?;
    let initial = VmState::load(&image)
        .with_context(|| format!("failed to load program: {}", path.display()))?;
    let entry = find_entry(&initial, limit, interrupt)
        .with_context(|| format!("no entry point in {}", path.display()))?;

    let state = &entry.state;
    let info = EntryInfo {
        step: entry.steps,
        a: state.a,
        c: state.c,
        d: state.d,
        target: (state.cell(state.d) + 1) % MEMORY_SIZE as u32,
    };

    print_output(&info, global, |info| {
        println!("Entry point:  step {}", info.step);
        println!("  A:          {}", info.a);
        println!("  C:          {}", info.c);
        println!("  D:          {}", info.d);
        println!("  Jmp target: {}", info.target);
    })
}
