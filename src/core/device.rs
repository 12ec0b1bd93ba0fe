//! Prompt driver for a directly opened terminal device
//!
//! Writes the prompt and reads the answer on the controlling terminal
//! itself (`/dev/tty`, or `CONIN$`/`CONOUT$` on Windows), never on the
//! process's standard streams, so it works with redirected stdio.

use std::io::{BufRead, Write};

use tracing::debug;

use super::console::Console;
use super::error::Result;
use super::guard::TerminalGuard;
use super::line::finish_line;

/// Run one prompt over already opened terminal streams.
///
/// When `echo` is false the guard opens its own handle, turns echo off for
/// the duration of the read and writes a newline afterwards so the cursor
/// still moves on. The guard is restored on every path out of here.
pub fn prompt_on<C, R, W>(
    guard: &TerminalGuard<C>,
    mut input: R,
    mut output: W,
    text: &str,
    echo: bool,
) -> Result<String>
where
    C: Console,
    R: BufRead,
    W: Write,
{
    if !echo {
        guard.open()?;
        guard.disable_echo()?;
    }

    let answer = converse(&mut input, &mut output, text, echo);
    guard.restore();

    finish_line(answer?)
}

fn converse<R, W>(input: &mut R, output: &mut W, text: &str, echo: bool) -> Result<Vec<u8>>
where
    R: BufRead,
    W: Write,
{
    output.write_all(text.as_bytes())?;
    output.flush()?;

    let mut line = Vec::new();
    let read = input.read_until(b'\n', &mut line);

    if !echo {
        // The user's Enter was not echoed. Best effort: a line already
        // read is returned even if the terminal rejects the newline.
        let _ = output.write_all(b"\n").and_then(|_| output.flush());
    }

    let n = read?;
    debug!(bytes = n, "read line from terminal");
    Ok(line)
}

#[cfg(any(unix, windows))]
pub use platform::DevicePrompt;

#[cfg(any(unix, windows))]
mod platform {
    use std::fs::{File, OpenOptions};
    use std::io::BufReader;

    use super::prompt_on;
    use crate::core::backend::LinePrompt;
    use crate::core::error::{PromptError, Result};
    use crate::core::guard::TTY;

    #[cfg(unix)]
    const INPUT_PATH: &str = crate::core::console::TTY_PATH;
    #[cfg(unix)]
    const OUTPUT_PATH: &str = crate::core::console::TTY_PATH;

    #[cfg(windows)]
    const INPUT_PATH: &str = "CONIN$";
    #[cfg(windows)]
    const OUTPUT_PATH: &str = "CONOUT$";

    /// Prompts on the controlling terminal through the process-wide guard
    #[derive(Debug, Clone, Copy, Default)]
    pub struct DevicePrompt;

    impl LinePrompt for DevicePrompt {
        fn prompt_line(&self, text: &str, echo: bool) -> Result<String> {
            let input = File::open(INPUT_PATH).map_err(PromptError::NoTerminal)?;
            let output = OpenOptions::new()
                .read(true)
                .write(true)
                .open(OUTPUT_PATH)
                .map_err(PromptError::NoTerminal)?;

            prompt_on(&TTY, BufReader::new(input), output, text, echo)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read};

    use super::*;
    use crate::core::error::PromptError;
    use crate::core::guard::testing::*;
    use crate::core::sigchain::{self, test_lock, COMMON_SIGNALS};

    #[test]
    fn test_hidden_password() {
        let _lock = test_lock();
        let guard = fake_guard(FakeConsole::new());
        let mut output = Vec::new();

        let line = prompt_on(
            &guard,
            Cursor::new(b"hunter2\n".to_vec()),
            &mut output,
            "Password: ",
            false,
        )
        .unwrap();

        assert_eq!(line, "hunter2");
        assert_eq!(output, b"Password: \n");
        assert_eq!(guard.console().mode(), ORIGINAL);
        assert!(!guard.is_open());
    }

    #[test]
    fn test_crlf_is_stripped() {
        let _lock = test_lock();
        let guard = fake_guard(FakeConsole::new());
        let line = prompt_on(
            &guard,
            Cursor::new(b"secret\r\n".to_vec()),
            io::sink(),
            "Password: ",
            false,
        )
        .unwrap();
        assert_eq!(line, "secret");
    }

    #[test]
    fn test_echo_touches_no_mode_or_signals() {
        let _lock = test_lock();
        let depths: Vec<usize> = COMMON_SIGNALS.iter().map(|&s| sigchain::depth(s)).collect();
        let guard = fake_guard(FakeConsole::new());
        let mut output = Vec::new();

        let line = prompt_on(
            &guard,
            Cursor::new(b"Ada\n".to_vec()),
            &mut output,
            "Name: ",
            true,
        )
        .unwrap();

        assert_eq!(line, "Ada");
        assert_eq!(output, b"Name: ");
        assert!(guard.console().calls().is_empty());
        let after: Vec<usize> = COMMON_SIGNALS.iter().map(|&s| sigchain::depth(s)).collect();
        assert_eq!(after, depths);
    }

    #[test]
    fn test_eof_without_data_is_no_input() {
        let _lock = test_lock();
        let guard = fake_guard(FakeConsole::new());
        let mut output = Vec::new();

        let result = prompt_on(&guard, Cursor::new(Vec::new()), &mut output, "Password: ", false);

        assert!(matches!(result, Err(PromptError::NoInput)));
        assert_eq!(output, b"Password: \n");
        assert_eq!(guard.console().mode(), ORIGINAL);
    }

    #[test]
    fn test_line_without_terminator_at_eof() {
        let guard = fake_guard(FakeConsole::new());
        let line = prompt_on(&guard, Cursor::new(b"abc".to_vec()), io::sink(), "> ", true).unwrap();
        assert_eq!(line, "abc");
    }

    #[test]
    fn test_only_first_line_is_consumed() {
        let guard = fake_guard(FakeConsole::new());
        let mut input = Cursor::new(b"one\ntwo\n".to_vec());
        let line = prompt_on(&guard, &mut input, io::sink(), "> ", true).unwrap();
        assert_eq!(line, "one");

        let mut rest = String::new();
        input.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "two\n");
    }

    #[test]
    fn test_mode_failure_skips_prompt() {
        let _lock = test_lock();
        let mut console = FakeConsole::new();
        console.fail_get = true;
        let guard = fake_guard(console);
        let mut output = Vec::new();

        let result = prompt_on(
            &guard,
            Cursor::new(b"x\n".to_vec()),
            &mut output,
            "Password: ",
            false,
        );

        assert!(matches!(result, Err(PromptError::ModeFailure(_))));
        assert!(output.is_empty());
        assert!(!guard.is_open());
    }

    #[test]
    fn test_no_terminal() {
        let mut console = FakeConsole::new();
        console.fail_open = true;
        let guard = fake_guard(console);

        let result = prompt_on(&guard, Cursor::new(b"x\n".to_vec()), io::sink(), "P: ", false);
        assert!(matches!(result, Err(PromptError::NoTerminal(_))));
    }

    struct BrokenInput;

    impl Read for BrokenInput {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "device gone"))
        }
    }

    #[test]
    fn test_read_error_still_restores() {
        let _lock = test_lock();
        let guard = fake_guard(FakeConsole::new());
        let mut output = Vec::new();

        let result = prompt_on(
            &guard,
            io::BufReader::new(BrokenInput),
            &mut output,
            "Password: ",
            false,
        );

        assert!(matches!(result, Err(PromptError::Io(_))));
        assert_eq!(output, b"Password: \n");
        assert_eq!(guard.console().mode(), ORIGINAL);
        assert!(!guard.is_open());
        assert!(!guard.echo_disabled());
    }

    /// Takes the prompt, then fails every later write
    struct PromptOnly {
        written: Vec<u8>,
        writes: usize,
    }

    impl Write for PromptOnly {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            if self.writes > 1 {
                return Err(io::Error::new(io::ErrorKind::Other, "terminal hung up"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_newline_failure_keeps_line() {
        let _lock = test_lock();
        let guard = fake_guard(FakeConsole::new());
        let mut output = PromptOnly {
            written: Vec::new(),
            writes: 0,
        };

        let line = prompt_on(
            &guard,
            Cursor::new(b"hunter2\n".to_vec()),
            &mut output,
            "Password: ",
            false,
        )
        .unwrap();

        assert_eq!(line, "hunter2");
        assert_eq!(output.written, b"Password: ");
        assert_eq!(guard.console().mode(), ORIGINAL);
        assert!(!guard.is_open());
    }
}
