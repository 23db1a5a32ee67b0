//! Entry point recovery.
//!
//! Programs for this machine are almost always produced by a generator that first runs a
//! bootstrap (building up the code it needs through self-modification) and then jumps into a
//! loop that does the actual work. The *entry point* is the machine state right before the last
//! `Jmp` of the bootstrap, found as the last `Jmp` before the first I/O instruction.
//!
//! [`find_entry`] locates that state. [`optimize_entry`] later moves it to an earlier `Jmp` when
//! the program is already running code known from the recorded runs by then, which shortens the
//! part of the bootstrap the reconstruction has to reproduce.

use log::{debug, info};

use crate::{
    analysis::{AccessFacts, AccessFlags},
    vm::{
        execute, Channel, Interrupt, Opcode, OpcodeMask, Recording, StopCondition,
        StopReason, VmState,
    },
    Error, Result,
};

/// A machine state at which the recorded runs start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// The state right before the entry `Jmp`
    pub state: VmState,
    /// Number of steps from the loaded image to `state`
    pub steps: u64,
}

/// Locate the entry point: the last `Jmp` before the first `Out` or `In`.
///
/// The program runs silently from `initial` until it is about to perform I/O (or halts, faults,
/// hits `limit` steps or is interrupted); the step index of the last `Jmp` seen is the entry
/// step, and a fresh copy of `initial` is advanced to it. A program that never jumps has its
/// entry at step 0.
///
/// # Arguments
/// * `initial` - The freshly loaded state
/// * `limit` - Step bound of the scan, `0` for none
/// * `interrupt` - Cancels the scan; the last `Jmp` seen so far is used
///
/// # Errors
/// Returns [`crate::Error::EntryPointNotFound`] if the instruction at the computed entry is not
/// a `Jmp`.
pub fn find_entry(initial: &VmState, limit: u64, interrupt: &Interrupt) -> Result<EntryPoint> {
    let mut scan = initial.clone();
    let stop = StopCondition::before(OpcodeMask::OUTPUT | OpcodeMask::INPUT).with_max_steps(limit);
    let result = execute(
        &mut scan,
        &mut Channel::silent(),
        &stop,
        Recording::Off,
        interrupt,
    );
    debug!(
        "entry scan stopped after {} steps ({:?})",
        result.steps, result.stop
    );

    let steps = result.last_jump.unwrap_or(0);
    // bounded by the scan that just finished; nobody else holds this token
    let mut state = initial.clone();
    advance(&mut state, steps, Recording::Off, &Interrupt::new());

    if state.current_opcode() != Some(Opcode::Jump) {
        return Err(Error::EntryPointNotFound { steps });
    }

    info!("Entry point found at step {steps}");
    Ok(EntryPoint { state, steps })
}

/// Try to move the entry point to an earlier `Jmp`.
///
/// Only applies when the entry `Jmp` itself was executed by a recorded run, i.e. the bootstrap
/// jumps into code that the main loop uses as well. The bootstrap is then replayed from
/// `initial`, with the loaded image as the first candidate: as long as it runs known code (per
/// a snapshot of `facts`) the search continues, and every time it leaves known code the next
/// `Jmp` becomes the candidate. A candidate that carries the replay through known code all the
/// way to the old entry replaces it; the steps in between are recorded into `facts` and counted
/// in [`AccessFacts::max_steps_from_entry`].
///
/// Returns `true` if the entry point moved. An interrupt at any point leaves `entry` and `facts`
/// untouched and returns `false`.
pub fn optimize_entry(
    entry: &mut EntryPoint,
    facts: &mut AccessFacts,
    initial: &VmState,
    interrupt: &Interrupt,
) -> bool {
    if !facts.access(entry.state.c).contains(AccessFlags::EXECUTED) {
        return false;
    }

    let snapshot = facts.clone();
    let mut state = initial.clone();
    let target = entry.steps;
    let mut position = 0;
    // the loaded image itself is the first candidate
    let mut candidate = Some(0);

    loop {
        let remaining = target - position;
        if remaining == 0 {
            break;
        }

        let known = execute(
            &mut state,
            &mut Channel::silent(),
            &StopCondition::steps(remaining).stop_on_unknown_code(),
            Recording::Consult(&snapshot),
            interrupt,
        );
        if known.interrupted() {
            return false;
        }
        position += known.steps;
        if position >= target {
            break;
        }

        let next_jump = execute(
            &mut state,
            &mut Channel::silent(),
            &StopCondition::before(OpcodeMask::JUMP).with_max_steps(target - position),
            Recording::Off,
            interrupt,
        );
        if next_jump.interrupted() {
            return false;
        }
        position += next_jump.steps;
        if next_jump.stop != StopReason::Opcode(Opcode::Jump) {
            candidate = None;
            break;
        }
        candidate = Some(position);

        let jump = execute(
            &mut state,
            &mut Channel::silent(),
            &StopCondition::steps(1),
            Recording::Off,
            interrupt,
        );
        if jump.interrupted() {
            return false;
        }
        if jump.steps == 0 {
            candidate = None;
            break;
        }
        position += jump.steps;
    }

    let Some(candidate) = candidate.filter(|&candidate| candidate < target) else {
        return false;
    };

    let Some(new_entry) = replay(initial, candidate, interrupt) else {
        return false;
    };
    let mut updated = facts.clone();
    let mut state = new_entry.clone();
    if !advance(
        &mut state,
        target - candidate + 1,
        Recording::Record(&mut updated),
        interrupt,
    ) {
        return false;
    }
    updated.max_steps_from_entry += target - candidate;
    *facts = updated;

    info!("Earlier entry point found at step {candidate}");
    entry.state = new_entry;
    entry.steps = candidate;
    true
}

/// A copy of `initial` advanced by `steps` steps, or `None` if the replay was interrupted.
fn replay(initial: &VmState, steps: u64, interrupt: &Interrupt) -> Option<VmState> {
    let mut state = initial.clone();
    advance(&mut state, steps, Recording::Off, interrupt).then_some(state)
}

/// Run `state` for at most `steps` steps; `false` if the run was interrupted.
fn advance(
    state: &mut VmState,
    steps: u64,
    recording: Recording<'_>,
    interrupt: &Interrupt,
) -> bool {
    if steps == 0 {
        return true;
    }
    let run = execute(
        state,
        &mut Channel::silent(),
        &StopCondition::steps(steps),
        recording,
        interrupt,
    );
    !run.interrupted()
}
