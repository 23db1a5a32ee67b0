//! Access collection runs.
//!
//! The access facts of a program are gathered by running it from its entry point, either
//! interactively (an operator provides input at a [`Console`] and decides whether another run is
//! needed to cover more branches) or by replaying recorded input traces. All runs record into
//! the same [`AccessFacts`].

use log::{debug, info};

use crate::{
    analysis::{AccessFacts, EntryPoint},
    vm::{
        execute, Channel, Console, EndOfTrace, Execution, Interrupt, Recording, ReplayInput,
        StopCondition,
    },
    Result,
};

/// The person driving an interactive collection.
pub trait Operator {
    /// Asked once before the first run. Returning `false` ends the collection without any run.
    fn start(&mut self) -> bool;

    /// Asked after every run that interacted with the operator. Returning `true` starts
    /// another run from the entry point.
    fn repeat(&mut self, run: &Execution) -> bool;
}

/// An [`Operator`] that runs the program a fixed number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRuns {
    remaining: usize,
}

impl FixedRuns {
    /// Run at most `runs` times.
    #[must_use]
    pub fn new(runs: usize) -> Self {
        FixedRuns { remaining: runs }
    }
}

impl Operator for FixedRuns {
    fn start(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    fn repeat(&mut self, _run: &Execution) -> bool {
        self.start()
    }
}

/// Run the program interactively from `entry` until the operator is done.
///
/// A run that neither read input nor was interrupted ends the collection on its own: without
/// interaction there is no other branch to explore.
///
/// # Errors
/// Returns [`crate::Error::OutOfMemory`] if the access facts cannot be allocated.
pub fn collect_interactive(
    entry: &EntryPoint,
    console: &mut dyn Console,
    operator: &mut dyn Operator,
    interrupt: &Interrupt,
) -> Result<AccessFacts> {
    let mut facts = AccessFacts::new()?;
    if !operator.start() {
        info!("Collection cancelled before the first run");
        return Ok(facts);
    }

    loop {
        let mut state = entry.state.clone();
        let run = execute(
            &mut state,
            &mut Channel::Interactive(&mut *console),
            &StopCondition::unbounded(),
            Recording::Record(&mut facts),
            interrupt,
        );
        facts.max_steps_from_entry = facts.max_steps_from_entry.max(run.steps);
        info!(
            "Program {} {} steps behind entry point",
            if run.interrupted() {
                "interrupted"
            } else {
                "terminated"
            },
            run.steps
        );

        if run.input.is_empty() && !run.interrupted() {
            info!("Program terminated without user interaction, no further run is necessary");
            break;
        }
        if !operator.repeat(&run) {
            break;
        }
    }

    Ok(facts)
}

/// Replay every trace in `traces` from `entry`, one run each.
///
/// Without any trace the program runs once with empty input. An interrupted run ends the
/// collection.
///
/// # Errors
/// Returns [`crate::Error::OutOfMemory`] if the access facts cannot be allocated.
pub fn collect_scripted(
    entry: &EntryPoint,
    traces: &[Vec<u32>],
    end: EndOfTrace,
    interrupt: &Interrupt,
) -> Result<AccessFacts> {
    let mut facts = AccessFacts::new()?;
    let empty = [Vec::new()];
    let traces = if traces.is_empty() { &empty[..] } else { traces };

    for (index, trace) in traces.iter().enumerate() {
        let mut state = entry.state.clone();
        let run = execute(
            &mut state,
            &mut Channel::Replay(ReplayInput::new(trace, end)),
            &StopCondition::unbounded(),
            Recording::Record(&mut facts),
            interrupt,
        );
        facts.max_steps_from_entry = facts.max_steps_from_entry.max(run.steps);
        debug!(
            "trace {index}: {} steps, {} of {} values consumed ({:?})",
            run.steps,
            run.input.len(),
            trace.len(),
            run.stop
        );

        if run.interrupted() {
            info!("Collection interrupted after {} of {} traces", index + 1, traces.len());
            break;
        }
    }

    Ok(facts)
}

/// Convert the raw bytes of a recorded input file into an input trace, one value per byte.
#[must_use]
pub fn trace_from_bytes(data: &[u8]) -> Vec<u32> {
    data.iter().map(|&byte| u32::from(byte)).collect()
}
