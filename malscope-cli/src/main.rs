mod app;
mod commands;
mod console;
mod output;

use anyhow::Context;
use clap::Parser;
use malscope::vm::Interrupt;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    // The first Ctrl+C ends the current run, a second one before it was consumed exits.
    let interrupt = Interrupt::new();
    let handler = interrupt.clone();
    ctrlc::set_handler(move || {
        if handler.is_triggered() {
            eprintln!("\nCancelled.");
            std::process::exit(130);
        }
        handler.trigger();
    })
    .context("failed to set Ctrl+C handler")?;

    let cli = Cli::parse();

    // Show malscope info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("malscope", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Disasm {
            path,
            output,
            session,
        } => commands::disasm::run(path, output.as_deref(), session, &interrupt),
        Command::Blocks { path, session } => {
            commands::blocks::run(path, session, &interrupt, &cli.global)
        }
        Command::Entry { path, limit } => {
            commands::entry::run(path, *limit, &interrupt, &cli.global)
        }
        Command::Cycle { value, address } => commands::cycle::run(value, *address, &cli.global),
    }
}
