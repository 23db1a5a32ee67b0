use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::Context;
use log::info;
use malscope::{hell::default_output_path, vm::Interrupt};

use crate::{
    app::SessionOptions,
    commands::common::{analyse, disassembler},
};

pub fn run(
    path: &Path,
    output: Option<&Path>,
    opts: &SessionOptions,
    interrupt: &Interrupt,
) -> anyhow::Result<()> {
    let output = output.map_or_else(|| default_output_path(path), Path::to_path_buf);
    let disassembler = disassembler(opts, interrupt);
    let disassembly = analyse(path, opts, &disassembler)?;

    let file = File::create(&output)
        .with_context(|| format!("failed to create output file: {}", output.display()))?;
    let mut w = BufWriter::new(file);
    disassembler
        .writer()
        .write(&disassembly, &mut w)
        .with_context(|| format!("failed to write HeLL source: {}", output.display()))?;
    w.flush()?;

    info!(
        "{} code and {} data blocks written to {}",
        disassembly.components.code.len(),
        disassembly.components.data.len(),
        output.display()
    );
    Ok(())
}
