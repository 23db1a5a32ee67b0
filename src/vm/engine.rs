//! The execution engine.
//!
//! [`execute`] is the single primitive every analysis is built on: it runs a [`VmState`] step by
//! step until a [`StopCondition`] fires, optionally reporting every memory access to a
//! [`Recorder`] or consulting an existing one to stop on unknown code.
//!
//! # Stop order
//!
//! Before each step the engine checks, in this order:
//!
//! 1. a pending [`Interrupt`]
//! 2. the step bound
//! 3. whether `C` points at code the consulted recorder has never seen executed
//! 4. whether the cell at `C` holds a printable value at all
//! 5. the opcode mask
//! 6. for `Rot` and `Opr` with the unknown-code check, whether `D` points at code that was never
//!    accessed as data
//!
//! A step that stops is never partially applied: the state is exactly the state before the
//! instruction that would have run.

use log::{debug, warn};

use crate::vm::{
    io::{Channel, ConsoleRead},
    operate, rotate_right, xlat, Interrupt, Opcode, OpcodeMask, VmState, END_OF_INPUT,
    MEMORY_SIZE,
};

/// When a run has to stop.
///
/// The default condition never stops on its own; the run ends with `Hlt`, an invalid
/// instruction, exhausted input or an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StopCondition {
    /// Maximum number of steps, `0` for no bound
    pub max_steps: u64,
    /// Stop when `C` reaches a cell the consulted recorder has not seen executed
    pub on_unknown_code: bool,
    /// Stop before any of these instructions runs
    pub opcodes: OpcodeMask,
}

impl StopCondition {
    /// No stop condition at all.
    #[must_use]
    pub const fn unbounded() -> Self {
        StopCondition {
            max_steps: 0,
            on_unknown_code: false,
            opcodes: OpcodeMask::empty(),
        }
    }

    /// Stop after `max_steps` steps (`0` is unbounded).
    #[must_use]
    pub const fn steps(max_steps: u64) -> Self {
        StopCondition {
            max_steps,
            on_unknown_code: false,
            opcodes: OpcodeMask::empty(),
        }
    }

    /// Stop before any instruction in `opcodes`.
    #[must_use]
    pub const fn before(opcodes: OpcodeMask) -> Self {
        StopCondition {
            max_steps: 0,
            on_unknown_code: false,
            opcodes,
        }
    }

    /// Replace the step bound.
    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Replace the opcode mask.
    #[must_use]
    pub const fn with_opcodes(mut self, opcodes: OpcodeMask) -> Self {
        self.opcodes = opcodes;
        self
    }

    /// Also stop on code unknown to the consulted recorder.
    #[must_use]
    pub const fn stop_on_unknown_code(mut self) -> Self {
        self.on_unknown_code = true;
        self
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A `Hlt` instruction ran (and is counted as a step)
    Halted,
    /// The step bound was reached
    StepLimit,
    /// The next instruction is in the stop mask
    Opcode(Opcode),
    /// The next instruction (or its data cell) is outside the consulted access facts
    UnknownCode,
    /// The cell at `C` holds a value outside the printable range
    InvalidInstruction {
        /// Value of `C`
        address: u32,
        /// The offending cell value
        value: u32,
    },
    /// A replayed run reached `In` with its trace used up
    InputExhausted,
    /// The run was interrupted by the operator
    Interrupted,
}

/// Outcome of one [`execute`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Number of steps executed. A halting run counts its `Hlt`.
    pub steps: u64,
    /// Why the run ended
    pub stop: StopReason,
    /// Step index of the last `Jmp` executed, if any
    pub last_jump: Option<u64>,
    /// Every value `In` stored into the accumulator, in order
    pub input: Vec<u32>,
}

impl Execution {
    /// Returns `true` if the run ended because of an interrupt.
    #[must_use]
    pub fn interrupted(&self) -> bool {
        self.stop == StopReason::Interrupted
    }
}

/// A single memory access observed during a recorded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessEvent {
    /// The instruction at `address` ran (never reported for the first step of a run)
    Executed {
        /// Value of `C`
        address: u32,
    },
    /// `Jmp` read its target from `source`
    Jump {
        /// Value of `D`
        source: u32,
        /// The value read, the new `C` before the rewrite step
        destination: u32,
    },
    /// `MovD` read the new data pointer from `source`
    Move {
        /// Value of `D`
        source: u32,
        /// The value read, the new `D` before the increment
        destination: u32,
    },
    /// `Rot` or `Opr` read and wrote `address`
    ReadWrite {
        /// Value of `D`
        address: u32,
    },
    /// Two consecutive data accesses of the same run
    FlowEdge {
        /// The previous data access
        from: u32,
        /// The current data access
        to: u32,
    },
    /// The cell at `address` went through the rewrite permutation
    Rewritten {
        /// Value of `C` after the instruction
        address: u32,
    },
    /// `C` advanced to `address` by the regular increment
    ReachedSequentially {
        /// The new value of `C`
        address: u32,
    },
}

/// Sink for the memory accesses of recorded runs, and the knowledge base for consulting runs.
pub trait Recorder {
    /// Record one access.
    fn record(&mut self, event: AccessEvent);

    /// Returns `true` if `address` has been seen executed.
    fn is_known_code(&self, address: u32) -> bool;

    /// Returns `true` if `address` has been read and written as data.
    fn is_known_data(&self, address: u32) -> bool;
}

/// How a run interacts with a [`Recorder`].
pub enum Recording<'a> {
    /// Nothing is recorded or consulted
    Off,
    /// Every access is recorded; the recorder is consulted as well
    Record(&'a mut dyn Recorder),
    /// The recorder is only consulted for [`StopCondition::on_unknown_code`]
    Consult(&'a dyn Recorder),
}

impl Recording<'_> {
    fn knowledge(&self) -> Option<&dyn Recorder> {
        match self {
            Recording::Off => None,
            Recording::Record(recorder) => Some(&**recorder),
            Recording::Consult(recorder) => Some(*recorder),
        }
    }

    fn record(&mut self, event: AccessEvent) {
        if let Recording::Record(recorder) = self {
            recorder.record(event);
        }
    }

    fn is_recording(&self) -> bool {
        matches!(self, Recording::Record(_))
    }
}

/// Tracks the previous data access of a run to report flow edges.
struct DataFlow {
    last: Option<u32>,
}

impl DataFlow {
    fn access(&mut self, recording: &mut Recording<'_>, to: u32, next: u32) {
        if let Some(from) = self.last {
            recording.record(AccessEvent::FlowEdge { from, to });
        }
        self.last = Some(next);
    }
}

/// Run `state` until `stop` fires.
///
/// Output is only produced on an interactive channel; a replay channel discards it and feeds
/// `In` from its trace. With [`Recording::Record`] every access is reported as an
/// [`AccessEvent`].
///
/// A pending interrupt from before the call is discarded; requests made while the run is in
/// progress end it with [`StopReason::Interrupted`].
///
/// # Arguments
/// * `state` - The state to advance
/// * `channel` - Where output goes and input comes from
/// * `stop` - When to stop
/// * `recording` - Recording and consulting of access facts
/// * `interrupt` - Cancellation token polled once per step
pub fn execute(
    state: &mut VmState,
    channel: &mut Channel<'_>,
    stop: &StopCondition,
    mut recording: Recording<'_>,
    interrupt: &Interrupt,
) -> Execution {
    let mut steps: u64 = 0;
    let mut last_jump = None;
    let mut input = Vec::new();
    let mut flow = DataFlow { last: None };

    interrupt.clear();

    let finish = |steps, stop, last_jump, input| Execution {
        steps,
        stop,
        last_jump,
        input,
    };

    loop {
        if interrupt.take() {
            debug!("run interrupted after {steps} steps");
            return finish(steps, StopReason::Interrupted, last_jump, input);
        }
        if stop.max_steps > 0 && steps >= stop.max_steps {
            return finish(steps, StopReason::StepLimit, last_jump, input);
        }

        let c = state.c;
        let d = state.d;

        if stop.on_unknown_code {
            if let Some(known) = recording.knowledge() {
                if !known.is_known_code(c) {
                    return finish(steps, StopReason::UnknownCode, last_jump, input);
                }
            }
        }

        let value = state.cell(c);
        let Some(opcode) = Opcode::decode(value, c) else {
            if channel.is_interactive() {
                warn!("Invalid command 0x{value:05x} at 0x{c:05x}");
            }
            return finish(
                steps,
                StopReason::InvalidInstruction { address: c, value },
                last_jump,
                input,
            );
        };

        if stop.opcodes.contains(opcode.mask()) {
            return finish(steps, StopReason::Opcode(opcode), last_jump, input);
        }

        if stop.on_unknown_code && matches!(opcode, Opcode::Rotate | Opcode::Operate) {
            if let Some(known) = recording.knowledge() {
                if known.is_known_code(d) && !known.is_known_data(d) {
                    return finish(steps, StopReason::UnknownCode, last_jump, input);
                }
            }
        }

        // The consumed input value is only known after reading, so `In` resolves first.
        let read = if opcode == Opcode::Input {
            let read = match channel {
                Channel::Interactive(console) => match console.read() {
                    ConsoleRead::Char(value) => Some(value % MEMORY_SIZE as u32),
                    ConsoleRead::EndOfInput => Some(END_OF_INPUT),
                    ConsoleRead::Interrupted => {
                        interrupt.clear();
                        return finish(steps, StopReason::Interrupted, last_jump, input);
                    }
                },
                Channel::Replay(replay) => replay.next_value(),
            };
            match read {
                Some(value) => Some(value),
                None => return finish(steps, StopReason::InputExhausted, last_jump, input),
            }
        } else {
            None
        };

        if steps > 0 {
            recording.record(AccessEvent::Executed { address: c });
        }

        match opcode {
            Opcode::Jump => {
                let destination = state.cell(d);
                if recording.is_recording() {
                    recording.record(AccessEvent::Jump {
                        source: d,
                        destination,
                    });
                    flow.access(&mut recording, d, d);
                }
                state.c = destination;
                last_jump = Some(steps);
            }
            Opcode::Output => {
                if let Channel::Interactive(console) = channel {
                    console.write(state.a);
                }
            }
            Opcode::Input => {
                if let Some(value) = read {
                    state.a = value;
                    input.push(value);
                }
            }
            Opcode::Rotate => {
                if recording.is_recording() {
                    recording.record(AccessEvent::ReadWrite { address: d });
                    flow.access(&mut recording, d, d);
                }
                let rotated = rotate_right(state.cell(d));
                state.set_cell(d, rotated);
                state.a = rotated;
            }
            Opcode::MoveD => {
                let destination = state.cell(d);
                if recording.is_recording() {
                    recording.record(AccessEvent::Move {
                        source: d,
                        destination,
                    });
                    flow.access(&mut recording, d, successor(destination));
                }
                state.d = destination;
            }
            Opcode::Operate => {
                if recording.is_recording() {
                    recording.record(AccessEvent::ReadWrite { address: d });
                    flow.access(&mut recording, d, d);
                }
                let result = operate(state.a, state.cell(d));
                state.set_cell(d, result);
                state.a = result;
            }
            Opcode::Halt => {
                return finish(steps + 1, StopReason::Halted, last_jump, input);
            }
            Opcode::Nop => {}
        }

        let c = state.c;
        state.set_cell(c, xlat(state.cell(c)));
        recording.record(AccessEvent::Rewritten { address: c });
        state.c = successor(c);
        recording.record(AccessEvent::ReachedSequentially { address: state.c });
        state.d = successor(state.d);
        steps += 1;
    }
}

/// The address following `address`, wrapping at the end of memory.
#[must_use]
pub(crate) const fn successor(address: u32) -> u32 {
    (address + 1) % MEMORY_SIZE as u32
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{
        test::ProgramBuilder,
        vm::{BufferConsole, Console, EndOfTrace, ReplayInput},
    };

    #[derive(Default)]
    struct EventLog {
        events: Vec<AccessEvent>,
        code: HashSet<u32>,
        data: HashSet<u32>,
    }

    impl Recorder for EventLog {
        fn record(&mut self, event: AccessEvent) {
            self.events.push(event);
        }

        fn is_known_code(&self, address: u32) -> bool {
            self.code.contains(&address)
        }

        fn is_known_data(&self, address: u32) -> bool {
            self.data.contains(&address)
        }
    }

    fn run(state: &mut VmState, stop: StopCondition) -> Execution {
        execute(
            state,
            &mut Channel::silent(),
            &stop,
            Recording::Off,
            &Interrupt::new(),
        )
    }

    #[test]
    fn test_halt_counts_as_step() {
        let mut state = ProgramBuilder::new()
            .instructions(&[Opcode::Nop, Opcode::Halt])
            .build();

        let result = run(&mut state, StopCondition::unbounded());

        assert_eq!(result.steps, 2);
        assert_eq!(result.stop, StopReason::Halted);
        // Hlt is not rewritten, the Nop before it is
        assert_eq!(state.c, 1);
        assert_eq!(state.cell(1), Opcode::Halt.encode(1));
        assert_eq!(state.cell(0), xlat(Opcode::Nop.encode(0)));
    }

    #[test]
    fn test_step_limit() {
        let mut state = ProgramBuilder::new()
            .instructions(&[Opcode::Nop, Opcode::Nop, Opcode::Nop, Opcode::Halt])
            .build();

        let result = run(&mut state, StopCondition::steps(2));

        assert_eq!(result.steps, 2);
        assert_eq!(result.stop, StopReason::StepLimit);
        assert_eq!((state.c, state.d), (2, 2));
    }

    #[test]
    fn test_zero_steps_is_unbounded() {
        let mut state = ProgramBuilder::new()
            .instructions(&[Opcode::Nop, Opcode::Nop, Opcode::Halt])
            .build();

        assert_eq!(run(&mut state, StopCondition::steps(0)).stop, StopReason::Halted);
    }

    #[test]
    fn test_masked_opcode_stops_before_running() {
        let mut state = ProgramBuilder::new()
            .instructions(&[Opcode::Nop, Opcode::Output, Opcode::Halt])
            .build();
        let before = {
            let mut copy = state.clone();
            run(&mut copy, StopCondition::steps(1));
            copy
        };

        let result = run(&mut state, StopCondition::before(OpcodeMask::OUTPUT | OpcodeMask::INPUT));

        assert_eq!(result.steps, 1);
        assert_eq!(result.stop, StopReason::Opcode(Opcode::Output));
        assert_eq!(state, before);
    }

    #[test]
    fn test_invalid_instruction() {
        let mut state = ProgramBuilder::new()
            .instructions(&[Opcode::Nop, Opcode::Nop])
            .cell(2, 7)
            .build();

        let result = run(&mut state, StopCondition::unbounded());

        assert_eq!(result.steps, 2);
        assert_eq!(
            result.stop,
            StopReason::InvalidInstruction {
                address: 2,
                value: 7
            }
        );
    }

    #[test]
    fn test_jump_sets_c_then_rewrites_target() {
        // Jmp at 0 reads its target from memory[D = 0], which holds the Jmp itself (98)
        let mut state = ProgramBuilder::new()
            .instructions(&[Opcode::Jump, Opcode::Nop])
            .cell(98, 40)
            .cell(99, Opcode::Halt.encode(99))
            .build();

        let result = run(&mut state, StopCondition::unbounded());

        assert_eq!(result.last_jump, Some(0));
        assert_eq!(result.stop, StopReason::Halted);
        assert_eq!(result.steps, 2);
        assert_eq!((state.c, state.d), (99, 1));
        assert_eq!(state.cell(98), xlat(40));
        assert_eq!(state.cell(0), Opcode::Jump.encode(0));
    }

    #[test]
    fn test_rotate_and_operate_update_accumulator() {
        let mut state = ProgramBuilder::new()
            .instructions(&[Opcode::Rotate, Opcode::Operate, Opcode::Halt])
            .build();
        let rotated = rotate_right(Opcode::Rotate.encode(0));
        let operand = state.cell(1);

        run(&mut state, StopCondition::unbounded());

        // Rot wrote memory[0] before the rewrite step replaced it
        assert_eq!(state.cell(0), xlat(rotated));
        assert_eq!(state.a, operate(rotated, operand));
        assert_eq!(state.cell(1), xlat(operate(rotated, operand)));
    }

    #[test]
    fn test_replay_input_and_end_of_trace() {
        let program = ProgramBuilder::new()
            .instructions(&[Opcode::Input, Opcode::Input, Opcode::Input, Opcode::Halt])
            .build();

        let mut state = program.clone();
        let trace = [65, 66];
        let mut channel = Channel::Replay(ReplayInput::new(&trace, EndOfTrace::Stop));
        let result = execute(
            &mut state,
            &mut channel,
            &StopCondition::unbounded(),
            Recording::Off,
            &Interrupt::new(),
        );
        assert_eq!(result.stop, StopReason::InputExhausted);
        assert_eq!(result.steps, 2);
        assert_eq!(result.input, vec![65, 66]);
        assert_eq!(state.a, 66);
        assert_eq!(state.c, 2);

        let mut state = program;
        let mut channel = Channel::Replay(ReplayInput::new(&trace, EndOfTrace::EndOfInput));
        let result = execute(
            &mut state,
            &mut channel,
            &StopCondition::unbounded(),
            Recording::Off,
            &Interrupt::new(),
        );
        assert_eq!(result.stop, StopReason::Halted);
        assert_eq!(result.input, vec![65, 66, END_OF_INPUT]);
        assert_eq!(state.a, END_OF_INPUT);
    }

    #[test]
    fn test_interactive_output_and_end_of_input() {
        let mut state = ProgramBuilder::new()
            .instructions(&[Opcode::Input, Opcode::Output, Opcode::Input, Opcode::Halt])
            .build();
        let mut console = BufferConsole::new(vec![u32::from(b'x')]);

        let result = execute(
            &mut state,
            &mut Channel::Interactive(&mut console),
            &StopCondition::unbounded(),
            Recording::Off,
            &Interrupt::new(),
        );

        assert_eq!(result.stop, StopReason::Halted);
        assert_eq!(console.output_string(), "x");
        assert_eq!(result.input, vec![u32::from(b'x'), END_OF_INPUT]);
    }

    #[test]
    fn test_replay_discards_output() {
        let mut state = ProgramBuilder::new()
            .instructions(&[Opcode::Output, Opcode::Halt])
            .build();

        let result = run(&mut state, StopCondition::unbounded());
        assert_eq!(result.stop, StopReason::Halted);
    }

    struct InterruptingConsole {
        interrupt: Interrupt,
        writes: usize,
    }

    impl Console for InterruptingConsole {
        fn read(&mut self) -> ConsoleRead {
            ConsoleRead::Interrupted
        }

        fn write(&mut self, _value: u32) {
            self.writes += 1;
            self.interrupt.trigger();
        }
    }

    #[test]
    fn test_interrupt_during_run() {
        let interrupt = Interrupt::new();
        let mut console = InterruptingConsole {
            interrupt: interrupt.clone(),
            writes: 0,
        };
        let mut state = ProgramBuilder::new()
            .instructions(&[Opcode::Output, Opcode::Output, Opcode::Halt])
            .build();

        let result = execute(
            &mut state,
            &mut Channel::Interactive(&mut console),
            &StopCondition::unbounded(),
            Recording::Off,
            &interrupt,
        );

        assert!(result.interrupted());
        assert_eq!(result.steps, 1);
        assert_eq!(console.writes, 1);
        assert!(!interrupt.is_triggered());
    }

    #[test]
    fn test_stale_interrupt_is_discarded() {
        let interrupt = Interrupt::new();
        interrupt.trigger();
        let mut state = ProgramBuilder::new()
            .instructions(&[Opcode::Nop, Opcode::Halt])
            .build();

        let result = execute(
            &mut state,
            &mut Channel::silent(),
            &StopCondition::unbounded(),
            Recording::Off,
            &interrupt,
        );
        assert_eq!(result.stop, StopReason::Halted);
    }

    #[test]
    fn test_interrupted_read() {
        let interrupt = Interrupt::new();
        let mut console = InterruptingConsole {
            interrupt: interrupt.clone(),
            writes: 0,
        };
        let mut state = ProgramBuilder::new()
            .instructions(&[Opcode::Nop, Opcode::Input, Opcode::Halt])
            .build();

        let result = execute(
            &mut state,
            &mut Channel::Interactive(&mut console),
            &StopCondition::unbounded(),
            Recording::Off,
            &interrupt,
        );
        assert_eq!(result.stop, StopReason::Interrupted);
        assert_eq!(result.steps, 1);
        assert!(result.input.is_empty());
    }

    #[test]
    fn test_recorded_events() {
        let mut state = ProgramBuilder::new()
            .instructions(&[Opcode::Nop, Opcode::Rotate, Opcode::Halt])
            .build();
        let mut log = EventLog::default();

        execute(
            &mut state,
            &mut Channel::silent(),
            &StopCondition::unbounded(),
            Recording::Record(&mut log),
            &Interrupt::new(),
        );

        assert_eq!(
            log.events,
            vec![
                AccessEvent::Rewritten { address: 0 },
                AccessEvent::ReachedSequentially { address: 1 },
                AccessEvent::Executed { address: 1 },
                AccessEvent::ReadWrite { address: 1 },
                AccessEvent::Rewritten { address: 1 },
                AccessEvent::ReachedSequentially { address: 2 },
                AccessEvent::Executed { address: 2 },
            ]
        );
    }

    #[test]
    fn test_consulting_stops_on_unknown_code() {
        let program = ProgramBuilder::new()
            .instructions(&[Opcode::Nop, Opcode::Nop, Opcode::Rotate, Opcode::Halt])
            .build();
        let mut known = EventLog::default();
        known.code.extend([0, 1]);

        let mut state = program.clone();
        let result = execute(
            &mut state,
            &mut Channel::silent(),
            &StopCondition::unbounded().stop_on_unknown_code(),
            Recording::Consult(&known),
            &Interrupt::new(),
        );
        assert_eq!(result.stop, StopReason::UnknownCode);
        assert_eq!(result.steps, 2);
        assert!(known.events.is_empty());

        // Rot at 2 with D = 2: known code that was never data
        known.code.insert(2);
        let mut state = program.clone();
        let result = execute(
            &mut state,
            &mut Channel::silent(),
            &StopCondition::unbounded().stop_on_unknown_code(),
            Recording::Consult(&known),
            &Interrupt::new(),
        );
        assert_eq!(result.stop, StopReason::UnknownCode);
        assert_eq!(result.steps, 2);

        known.data.insert(2);
        known.code.insert(3);
        let mut state = program;
        let result = execute(
            &mut state,
            &mut Channel::silent(),
            &StopCondition::unbounded().stop_on_unknown_code(),
            Recording::Consult(&known),
            &Interrupt::new(),
        );
        assert_eq!(result.stop, StopReason::Halted);
    }

    #[test]
    fn test_unknown_code_check_needs_a_recorder() {
        let mut state = ProgramBuilder::new()
            .instructions(&[Opcode::Nop, Opcode::Halt])
            .build();

        let result = run(&mut state, StopCondition::unbounded().stop_on_unknown_code());
        assert_eq!(result.stop, StopReason::Halted);
    }

    #[test]
    fn test_successor_wraps() {
        assert_eq!(successor(0), 1);
        assert_eq!(successor(MEMORY_SIZE as u32 - 1), 0);
    }
}
