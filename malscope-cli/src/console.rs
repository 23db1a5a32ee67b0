//! The terminal side of an interactive session.

use std::io::{self, BufRead, Read, Write};

use log::debug;
use malscope::{
    session::Operator,
    vm::{Console, ConsoleRead, Execution},
};

/// Connects the machine's `In` and `Out` to stdin and stdout.
pub struct TerminalConsole;

impl Console for TerminalConsole {
    fn read(&mut self) -> ConsoleRead {
        // a prompt printed without newline must be visible before blocking
        if let Err(error) = io::stdout().flush() {
            debug!("flushing stdout failed: {error}");
        }

        let mut byte = [0u8; 1];
        match io::stdin().lock().read(&mut byte) {
            Ok(0) => ConsoleRead::EndOfInput,
            Ok(_) => ConsoleRead::Char(u32::from(byte[0])),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => ConsoleRead::Interrupted,
            Err(error) => {
                debug!("reading stdin failed: {error}");
                ConsoleRead::EndOfInput
            }
        }
    }

    fn write(&mut self, value: u32) {
        let byte = (value & 0xff) as u8;
        let mut stdout = io::stdout().lock();
        let result = stdout.write_all(&[byte]).and_then(|()| {
            if byte == b'\n' {
                stdout.flush()
            } else {
                Ok(())
            }
        });
        if let Err(error) = result {
            debug!("writing stdout failed: {error}");
        }
    }
}

/// Asks the user on stderr whether to run the program once more.
pub struct TerminalOperator;

impl TerminalOperator {
    /// Read one line from stdin; `None` on end of input.
    fn answer() -> Option<String> {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    }
}

impl Operator for TerminalOperator {
    fn start(&mut self) -> bool {
        eprintln!("The program is run from its entry point now. Use it the way you want it");
        eprintln!("to be disassembled: every instruction and data cell it does not touch is");
        eprintln!("missing from the result. Press Ctrl+C to end a run that does not terminate.");
        eprint!("Press return to start. ");
        Self::answer().is_some()
    }

    fn repeat(&mut self, run: &Execution) -> bool {
        let _ = io::stdout().flush();
        eprintln!();
        if run.interrupted() {
            eprintln!("Run interrupted after {} steps.", run.steps);
        }
        eprint!("Do you want to run the program again? [Y/n] ");
        match Self::answer() {
            Some(answer) => !answer.trim_start().starts_with(&['n', 'N'][..]),
            None => false,
        }
    }
}
