//! Character channels between the machine and the outside world.
//!
//! A run is either *interactive*, talking to a [`Console`] (usually the terminal), or a *replay*
//! that consumes a previously captured input trace and discards all output. Replays never block.

use crate::vm::END_OF_INPUT;

/// Result of reading one character from a [`Console`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleRead {
    /// A character was read
    Char(u32),
    /// The input stream is closed; the machine reads the sentinel [`END_OF_INPUT`]
    EndOfInput,
    /// Reading was interrupted; the current run ends as interrupted
    Interrupted,
}

/// Character source and sink of an interactive run.
pub trait Console {
    /// Read one character. May block.
    fn read(&mut self) -> ConsoleRead;

    /// Write the low byte of `value` as a character.
    fn write(&mut self, value: u32);
}

/// What a replayed run does once its input trace is used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndOfTrace {
    /// Stop the run before the `In` instruction that found no input
    Stop,
    /// Feed [`END_OF_INPUT`] to every further `In`, like a closed input stream
    #[default]
    EndOfInput,
}

/// A finite input trace consumed by a replayed run.
#[derive(Debug, Clone)]
pub struct ReplayInput<'a> {
    trace: &'a [u32],
    position: usize,
    end: EndOfTrace,
}

impl<'a> ReplayInput<'a> {
    /// Replay `trace`, then behave as `end` says.
    #[must_use]
    pub fn new(trace: &'a [u32], end: EndOfTrace) -> Self {
        ReplayInput {
            trace,
            position: 0,
            end,
        }
    }

    /// A replay without any input that stops at the first `In`.
    #[must_use]
    pub fn none() -> ReplayInput<'static> {
        ReplayInput::new(&[], EndOfTrace::Stop)
    }

    /// Number of trace values consumed so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.position
    }

    /// Next input value, or `None` when the run has to stop.
    pub fn next_value(&mut self) -> Option<u32> {
        if let Some(value) = self.trace.get(self.position) {
            self.position += 1;
            return Some(*value);
        }

        match self.end {
            EndOfTrace::Stop => None,
            EndOfTrace::EndOfInput => Some(END_OF_INPUT),
        }
    }
}

/// The channel a run talks through.
pub enum Channel<'a> {
    /// Output goes to the console, input is read from it
    Interactive(&'a mut dyn Console),
    /// Output is discarded, input comes from a trace
    Replay(ReplayInput<'a>),
}

impl Channel<'_> {
    /// A non-interactive channel with no input at all.
    #[must_use]
    pub fn silent() -> Channel<'static> {
        Channel::Replay(ReplayInput::none())
    }

    /// Returns `true` for [`Channel::Interactive`].
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        matches!(self, Channel::Interactive(_))
    }
}

/// A [`Console`] over in-memory buffers, handy for scripted sessions and tests.
///
/// Reads consume `input` front to back and report [`ConsoleRead::EndOfInput`] afterwards;
/// writes are collected in `output`.
#[derive(Debug, Clone, Default)]
pub struct BufferConsole {
    input: Vec<u32>,
    position: usize,
    /// Everything the machine wrote
    pub output: Vec<u8>,
}

impl BufferConsole {
    /// Create a console that will read `input`.
    #[must_use]
    pub fn new(input: impl Into<Vec<u32>>) -> Self {
        BufferConsole {
            input: input.into(),
            position: 0,
            output: Vec::new(),
        }
    }

    /// The collected output as lossy UTF-8.
    #[must_use]
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Console for BufferConsole {
    fn read(&mut self) -> ConsoleRead {
        match self.input.get(self.position) {
            Some(value) => {
                self.position += 1;
                ConsoleRead::Char(*value)
            }
            None => ConsoleRead::EndOfInput,
        }
    }

    fn write(&mut self, value: u32) {
        self.output.push((value & 0xFF) as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_stop() {
        let trace = [65, 66];
        let mut input = ReplayInput::new(&trace, EndOfTrace::Stop);

        assert_eq!(input.next_value(), Some(65));
        assert_eq!(input.next_value(), Some(66));
        assert_eq!(input.next_value(), None);
        assert_eq!(input.consumed(), 2);
    }

    #[test]
    fn test_replay_end_of_input() {
        let trace = [10];
        let mut input = ReplayInput::new(&trace, EndOfTrace::EndOfInput);

        assert_eq!(input.next_value(), Some(10));
        assert_eq!(input.next_value(), Some(END_OF_INPUT));
        assert_eq!(input.next_value(), Some(END_OF_INPUT));
    }

    #[test]
    fn test_silent_channel() {
        let channel = Channel::silent();
        assert!(!channel.is_interactive());

        let Channel::Replay(mut input) = channel else {
            panic!("silent channel must be a replay");
        };
        assert_eq!(input.next_value(), None);
    }

    #[test]
    fn test_buffer_console() {
        let mut console = BufferConsole::new(vec![u32::from(b'x')]);

        assert_eq!(console.read(), ConsoleRead::Char(u32::from(b'x')));
        assert_eq!(console.read(), ConsoleRead::EndOfInput);

        console.write(u32::from(b'H'));
        console.write(0x100 + u32::from(b'i'));
        assert_eq!(console.output_string(), "Hi");
    }
}
