//! ttyprompt - read one line from the controlling terminal
//!
//! Shows a prompt on the terminal the process is attached to and reads a
//! single line back, optionally with echo turned off for passwords. The
//! terminal is put back into its original mode on every way out, including
//! a terminating signal arriving mid-read.
//!
//! ```no_run
//! let password = ttyprompt::prompt_line("Password: ", false)?;
//! # Ok::<(), ttyprompt::PromptError>(())
//! ```
//!
//! The backend is chosen once per process:
//!
//! | Platform | Backend |
//! |----------|---------|
//! | Unix | `/dev/tty` with termios |
//! | Windows console | `CONIN$`/`CONOUT$` with console modes |
//! | Windows, `TERM=xterm*` | `sh` helpers talking to `/dev/tty` |
//! | anything else | `rpassword` masked input |
//!
//! Prompts are not reentrant: callers must not run two at once.

pub mod config;
pub mod core;

use std::sync::OnceLock;

pub use crate::core::backend::{Backend, LinePrompt};
pub use crate::core::error::{PromptError, Result, SubprocessStage};

static BACKEND: OnceLock<Backend> = OnceLock::new();

/// Show `text` on the controlling terminal and read one line.
///
/// With `echo` false the typed characters are hidden and a newline is
/// written after the answer. The returned line has its trailing `\n` and
/// `\r` removed.
///
/// # Errors
///
/// Fails when there is no controlling terminal, its mode cannot be changed,
/// a helper process fails, or input ends before anything is read.
pub fn prompt_line(text: &str, echo: bool) -> Result<String> {
    BACKEND.get_or_init(Backend::detect).prompt_line(text, echo)
}
