//! Backend selection
//!
//! Picks one of the three prompt implementations from the platform and the
//! environment:
//!
//! - **Subprocess**: Windows under an xterm-type emulator (`TERM=xterm*`)
//! - **Device**: any other Unix or Windows process
//! - **Masked**: everything else

use std::env;

use tracing::debug;

use super::error::Result;
use super::masked::MaskedPrompt;
use super::xterm::{is_xterm, SubprocessPrompt};

#[cfg(any(unix, windows))]
use super::device::DevicePrompt;

/// Something that can show a prompt and read one line back
pub trait LinePrompt {
    /// Show `text`, read one line, strip its terminator.
    ///
    /// With `echo` false the typed characters are not displayed.
    fn prompt_line(&self, text: &str, echo: bool) -> Result<String>;
}

#[derive(Debug, Clone)]
pub enum Backend {
    #[cfg(any(unix, windows))]
    Device(DevicePrompt),
    Subprocess(SubprocessPrompt),
    Masked(MaskedPrompt),
}

impl Backend {
    /// Probe the current process.
    pub fn detect() -> Self {
        let term = env::var("TERM").ok();
        let backend = Self::select(cfg!(windows), term.as_deref());
        debug!("prompt backend: {}", backend.name());
        backend
    }

    /// Selection rule, separated from the probing for tests.
    pub fn select(windows: bool, term: Option<&str>) -> Self {
        if windows && is_xterm(term) {
            return Backend::Subprocess(SubprocessPrompt::default());
        }
        Self::native()
    }

    #[cfg(any(unix, windows))]
    fn native() -> Self {
        Backend::Device(DevicePrompt)
    }

    #[cfg(not(any(unix, windows)))]
    fn native() -> Self {
        Backend::Masked(MaskedPrompt::default())
    }

    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(any(unix, windows))]
            Backend::Device(_) => "device",
            Backend::Subprocess(_) => "subprocess",
            Backend::Masked(_) => "masked",
        }
    }
}

impl LinePrompt for Backend {
    fn prompt_line(&self, text: &str, echo: bool) -> Result<String> {
        match self {
            #[cfg(any(unix, windows))]
            Backend::Device(prompt) => prompt.prompt_line(text, echo),
            Backend::Subprocess(prompt) => prompt.prompt_line(text, echo),
            Backend::Masked(prompt) => prompt.prompt_line(text, echo),
        }
    }
}
