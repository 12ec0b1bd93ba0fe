//! Core prompt components.
//!
//! - **sigchain**: per-signal handler stacks with push/pop
//! - **console**: platform terminal devices (termios, console mode)
//! - **guard**: terminal state guard; saves, disables and restores echo
//! - **device**: prompt driver over the controlling terminal
//! - **xterm**: helper-process prompt for xterm-type emulators on Windows
//! - **masked**: masked-input fallback for platforms with no terminal device
//! - **backend**: picks one of the above
//!
//! # Architecture
//!
//! ```text
//! Backend
//! ├── DevicePrompt ── TerminalGuard ── Console
//! │                        └── sigchain
//! ├── SubprocessPrompt (sh + /dev/tty)
//! └── MaskedPrompt (rpassword)
//! ```

pub mod backend;
pub mod console;
pub mod device;
pub mod error;
pub mod guard;
pub mod line;
pub mod masked;
pub mod sigchain;
pub mod xterm;
