//! The disassembly pipeline.

use log::info;

use crate::{
    analysis::{
        extract_components, find_entry, optimize_entry, AccessFacts, Components, EntryPoint,
    },
    file::ProgramImage,
    hell::HellWriter,
    session::{collect_interactive, collect_scripted, DisassemblerConfig, Operator},
    vm::{Console, Interrupt, VmState},
    Result,
};

/// How the access facts of a session are collected.
pub enum RunDriver<'a> {
    /// An operator runs the program at a console
    Interactive {
        /// Where the program reads and writes characters
        console: &'a mut dyn Console,
        /// Decides when collection ends
        operator: &'a mut dyn Operator,
    },
    /// Recorded input traces are replayed
    Scripted {
        /// One run per trace
        traces: &'a [Vec<u32>],
    },
}

/// Everything a session found out about a program.
#[derive(Debug, Clone)]
pub struct Disassembly {
    /// The state right after loading
    pub initial: VmState,
    /// The entry point, possibly moved by the optimizer
    pub entry: EntryPoint,
    /// Whether the optimizer moved the entry point
    pub entry_optimized: bool,
    /// Accumulated access facts
    pub facts: AccessFacts,
    /// The reconstructed blocks
    pub components: Components,
}

/// Drives a complete disassembly: load, find the entry point, collect access facts, optimise
/// the entry point, extract blocks.
///
/// ```rust,no_run
/// use malscope::prelude::*;
///
/// let image = ProgramImage::from_file(std::path::Path::new("hello.mb"))?;
/// let traces = vec![Vec::new()];
/// let disassembler = Disassembler::new(DisassemblerConfig::scripted());
/// let disassembly = disassembler.analyse(&image, RunDriver::Scripted { traces: &traces })?;
///
/// println!("{} code blocks", disassembly.components.code.len());
/// # Ok::<(), malscope::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Disassembler {
    config: DisassemblerConfig,
    interrupt: Interrupt,
}

impl Disassembler {
    /// Create a disassembler with its own interrupt token.
    #[must_use]
    pub fn new(config: DisassemblerConfig) -> Self {
        Disassembler {
            config,
            interrupt: Interrupt::new(),
        }
    }

    /// Use `interrupt` to cancel runs, e.g. one shared with a Ctrl+C handler.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// The configuration of this disassembler.
    #[must_use]
    pub fn config(&self) -> &DisassemblerConfig {
        &self.config
    }

    /// A HeLL writer using the long-cycle threshold of this configuration.
    #[must_use]
    pub fn writer(&self) -> HellWriter {
        HellWriter::new().with_long_cycle_threshold(self.config.long_cycle_threshold)
    }

    /// The token that cancels the current run.
    #[must_use]
    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Load `image` and analyse it.
    ///
    /// # Errors
    /// Returns loader errors, [`crate::Error::EntryPointNotFound`] and
    /// [`crate::Error::OutOfMemory`].
    pub fn analyse(&self, image: &ProgramImage, driver: RunDriver<'_>) -> Result<Disassembly> {
        let initial = VmState::load(image)?;
        info!("Program image loaded ({} bytes)", image.len());
        self.analyse_state(initial, driver)
    }

    /// Analyse an already loaded program.
    ///
    /// # Errors
    /// Returns [`crate::Error::EntryPointNotFound`] and [`crate::Error::OutOfMemory`].
    pub fn analyse_state(&self, initial: VmState, driver: RunDriver<'_>) -> Result<Disassembly> {
        let mut entry = find_entry(&initial, self.config.entry_search_limit, &self.interrupt)?;

        let mut facts = match driver {
            RunDriver::Interactive { console, operator } => {
                collect_interactive(&entry, console, operator, &self.interrupt)?
            }
            RunDriver::Scripted { traces } => {
                collect_scripted(&entry, traces, self.config.end_of_trace, &self.interrupt)?
            }
        };

        let entry_optimized = self.config.optimize_entry
            && optimize_entry(&mut entry, &mut facts, &initial, &self.interrupt);

        let components = extract_components(&mut facts, &entry)?;
        info!(
            "Analysis finished: {} code blocks, {} data blocks",
            components.code.len(),
            components.data.len()
        );

        Ok(Disassembly {
            initial,
            entry,
            entry_optimized,
            facts,
            components,
        })
    }
}
