use std::path::Path;

use anyhow::Context;
use log::warn;
use malscope::{
    file::ProgramImage,
    session::{trace_from_bytes, Disassembler, DisassemblerConfig, Disassembly, RunDriver},
    vm::{EndOfTrace, Interrupt},
};

use crate::{
    app::SessionOptions,
    console::{TerminalConsole, TerminalOperator},
};

/// Load a program image.
pub fn load_image(path: &Path) -> anyhow::Result<ProgramImage> {
    ProgramImage::from_file(path)
        .with_context(|| format!("failed to load program: {}", path.display()))
}

/// Session settings for `opts`; replayed traces switch to scripted mode.
fn session_config(opts: &SessionOptions) -> DisassemblerConfig {
    let mut config = if opts.traces.is_empty() {
        DisassemblerConfig::interactive()
    } else {
        DisassemblerConfig::scripted()
    };
    if opts.eof_after_trace {
        config = config.with_end_of_trace(EndOfTrace::EndOfInput);
    }
    if let Some(threshold) = opts.long_cycle {
        config = config.with_long_cycle_threshold(threshold);
    }
    config
        .with_optimize_entry(!opts.no_optimize)
        .with_entry_search_limit(opts.entry_limit)
}

/// A disassembler configured from `opts`, cancelled through `interrupt`.
pub fn disassembler(opts: &SessionOptions, interrupt: &Interrupt) -> Disassembler {
    Disassembler::new(session_config(opts)).with_interrupt(interrupt.clone())
}

/// Run a complete session on the program at `path`.
pub fn analyse(
    path: &Path,
    opts: &SessionOptions,
    disassembler: &Disassembler,
) -> anyhow::Result<Disassembly> {
    let image = load_image(path)?;

    let result = if opts.traces.is_empty() {
        let mut console = TerminalConsole;
        let mut operator = TerminalOperator;
        disassembler.analyse(
            &image,
            RunDriver::Interactive {
                console: &mut console,
                operator: &mut operator,
            },
        )
    } else {
        let traces = opts
            .traces
            .iter()
            .map(|trace| {
                std::fs::read(trace)
                    .map(|data| trace_from_bytes(&data))
                    .with_context(|| format!("failed to read input trace: {}", trace.display()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        disassembler.analyse(&image, RunDriver::Scripted { traces: &traces })
    };
    let disassembly =
        result.with_context(|| format!("failed to disassemble: {}", path.display()))?;

    if disassembly.components.unreliable() {
        warn!(
            "{} blocks are neither code nor data, the result is unreliable",
            disassembly.components.inconsistencies
        );
    }
    Ok(disassembly)
}
