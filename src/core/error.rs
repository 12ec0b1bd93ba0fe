//! Prompt errors

use std::fmt;
use std::io;
use thiserror::Error;

/// Which step of the helper-process exchange failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubprocessStage {
    Spawn,
    Write,
    Read,
}

impl fmt::Display for SubprocessStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            SubprocessStage::Spawn => "access",
            SubprocessStage::Write => "write to",
            SubprocessStage::Read => "read from",
        };
        f.write_str(what)
    }
}

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("No controlling terminal: {0}")]
    NoTerminal(#[source] io::Error),

    #[error("Failed to change terminal mode: {0}")]
    ModeFailure(#[source] io::Error),

    #[error("Could not {stage} terminal helper: {source}")]
    SubprocessFailure {
        stage: SubprocessStage,
        #[source]
        source: io::Error,
    },

    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("End of input before a line was read")]
    NoInput,

    #[error("Input line is not valid UTF-8")]
    Encoding,

    #[error("Another prompt already holds the terminal")]
    Busy,
}

pub type Result<T> = std::result::Result<T, PromptError>;
