use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// malscope - dynamic disassembler for self-modifying ternary machine programs
#[derive(Debug, Parser)]
#[command(name = "malscope", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// How access facts are collected.
#[derive(Debug, Args)]
pub struct SessionOptions {
    /// Replay a recorded input file instead of running interactively (repeatable, one run each).
    #[arg(short = 'i', long = "input", value_name = "TRACE")]
    pub traces: Vec<PathBuf>,

    /// Keep the entry point found by the scan, do not try to move it to an earlier jump.
    #[arg(long)]
    pub no_optimize: bool,

    /// Step bound of the entry point scan, 0 for none.
    #[arg(long, default_value_t = 0)]
    pub entry_limit: u64,

    /// Feed end-of-input once a trace is used up instead of stopping the run.
    #[arg(long)]
    pub eof_after_trace: bool,

    /// Rewrite cycles longer than this are emitted as a single instruction.
    #[arg(long, value_name = "LENGTH")]
    pub long_cycle: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a program, record its memory accesses and write the reconstruction as HeLL source.
    Disasm {
        /// Path to the program file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Output path (default: the input path with a .hell extension).
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        #[command(flatten)]
        session: SessionOptions,
    },

    /// Run a program and list the reconstructed code and data blocks.
    Blocks {
        /// Path to the program file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[command(flatten)]
        session: SessionOptions,
    },

    /// Locate the entry point of a program without running it interactively.
    Entry {
        /// Path to the program file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Step bound of the scan, 0 for none.
        #[arg(short, long, default_value_t = 0)]
        limit: u64,
    },

    /// Show the rewrite cycle of a cell value and the instructions it represents.
    Cycle {
        /// Cell value: a printable character or a decimal number.
        #[arg(value_name = "VALUE")]
        value: String,

        /// Address of the cell.
        #[arg(short, long, default_value_t = 0)]
        address: u32,
    },
}
