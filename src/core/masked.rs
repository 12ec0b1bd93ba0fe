//! Fallback for platforms without a terminal device
//!
//! Hands the prompt to the platform's masked-input reader and returns its
//! answer untouched.

use std::io;

use super::backend::LinePrompt;
use super::error::{PromptError, Result};

/// Reads one masked line after showing the prompt
pub type MaskedReader = fn(&str) -> io::Result<String>;

fn read_with_rpassword(text: &str) -> io::Result<String> {
    rpassword::prompt_password(text)
}

#[derive(Debug, Clone, Copy)]
pub struct MaskedPrompt {
    reader: MaskedReader,
}

impl MaskedPrompt {
    pub fn new(reader: MaskedReader) -> Self {
        Self { reader }
    }
}

impl Default for MaskedPrompt {
    fn default() -> Self {
        Self::new(read_with_rpassword)
    }
}

impl LinePrompt for MaskedPrompt {
    /// `echo` is ignored; the reader always masks.
    fn prompt_line(&self, text: &str, _echo: bool) -> Result<String> {
        (self.reader)(text).map_err(PromptError::NoTerminal)
    }
}
