//! Prompting through helper processes
//!
//! xterm-type emulators on Windows (mintty and friends) do not expose a
//! console the native API can attach to. There the prompt is driven by small
//! `sh` helpers that talk to `/dev/tty` directly: one toggles echo with
//! `stty`, one writes the prompt and reads the answer.
//!
//! ```text
//!  prompt ──stdin──▶ sh -c "cat >/dev/tty && read -r line </dev/tty && echo \"$line\""
//!  answer ◀─stdout──┘
//! ```

use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};

use tracing::{debug, error, warn};

use super::backend::LinePrompt;
use super::error::{PromptError, Result, SubprocessStage};
use super::line::finish_line;

/// Shell snippets used by [`SubprocessPrompt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperScripts {
    /// Interpreter, run as `<shell> -c <script>`
    pub shell: String,
    /// Copies stdin to the terminal, then echoes one line read from it
    pub read_line: String,
    pub echo_off: String,
    pub echo_on: String,
    /// Moves the terminal cursor to the next line
    pub new_line: String,
}

impl Default for HelperScripts {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            read_line: "cat >/dev/tty && read -r line </dev/tty && echo \"$line\"".to_string(),
            echo_off: "stty -echo </dev/tty".to_string(),
            echo_on: "stty echo </dev/tty".to_string(),
            new_line: "printf '\\n' >/dev/tty".to_string(),
        }
    }
}

/// `TERM` values that need the helper-process path
pub fn is_xterm(term: Option<&str>) -> bool {
    term.map_or(false, |t| t.starts_with("xterm"))
}

/// Line prompt backed by helper processes
#[derive(Debug, Clone, Default)]
pub struct SubprocessPrompt {
    scripts: HelperScripts,
}

impl SubprocessPrompt {
    pub fn new(scripts: HelperScripts) -> Self {
        Self { scripts }
    }

    pub fn scripts(&self) -> &HelperScripts {
        &self.scripts
    }

    fn command(&self, script: &str) -> Command {
        let mut cmd = Command::new(&self.scripts.shell);
        cmd.arg("-c").arg(script);
        cmd
    }

    /// Run a fire-and-forget helper. True when it exited successfully.
    fn run_helper(&self, script: &str) -> bool {
        let status = self
            .command(script)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) => status.success(),
            Err(e) => {
                debug!("helper `{}` failed to start: {}", script, e);
                false
            }
        }
    }

    fn converse(&self, text: &str) -> Result<String> {
        let mut child = self
            .command(&self.scripts.read_line)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| {
                error!("Could not access xterm: {}", source);
                PromptError::SubprocessFailure {
                    stage: SubprocessStage::Spawn,
                    source,
                }
            })?;

        let answer = exchange(&mut child, text);

        match child.wait() {
            Ok(status) => debug!("terminal helper exited with {}", status),
            Err(e) => debug!("could not wait for terminal helper: {}", e),
        }

        finish_line(answer?)
    }
}

fn missing_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "helper pipe not available")
}

/// Feed `text` to the helper, close its stdin, read its whole stdout.
fn exchange(child: &mut Child, text: &str) -> Result<Vec<u8>> {
    let written = match child.stdin.take() {
        // Dropping stdin closes the pipe so `cat` sees end-of-input.
        Some(mut stdin) => stdin.write_all(text.as_bytes()),
        None => Err(missing_pipe()),
    };
    if let Err(source) = written {
        error!("Could not write to xterm: {}", source);
        drop(child.stdout.take());
        return Err(PromptError::SubprocessFailure {
            stage: SubprocessStage::Write,
            source,
        });
    }

    let mut buf = Vec::new();
    let read = match child.stdout.take() {
        Some(mut stdout) => stdout.read_to_end(&mut buf),
        None => Err(missing_pipe()),
    };
    if let Err(source) = read {
        error!("Could not read from xterm: {}", source);
        return Err(PromptError::SubprocessFailure {
            stage: SubprocessStage::Read,
            source,
        });
    }

    Ok(buf)
}

impl LinePrompt for SubprocessPrompt {
    fn prompt_line(&self, text: &str, echo: bool) -> Result<String> {
        if !echo && !self.run_helper(&self.scripts.echo_off) {
            warn!("Could not disable echo on xterm");
        }

        let answer = self.converse(text);

        if !echo {
            if !self.run_helper(&self.scripts.echo_on) {
                warn!("Could not enable echo on xterm");
            }
            if !self.run_helper(&self.scripts.new_line) {
                debug!("could not move to a new line on xterm");
            }
        }

        answer
    }
}
