//! Terminal state guard
//!
//! Owns the open terminal handle and the mode it had before echo was turned
//! off. The same restore logic runs on the normal exit path and from the
//! signal trampoline, so it only touches atomics and the console's
//! async-signal-safe calls.
//!
//! # Lifecycle
//!
//! ```text
//! unset ──open──▶ open ──disable_echo──▶ armed
//!   ▲                │                     │
//!   └────restore─────┴──restore/on_signal──┘
//! ```
//!
//! While armed, a restore-then-reraise handler is pushed for the common
//! terminating signals. The pushed signals are tracked in a bitmask apart
//! from the armed flag: `on_signal` pops only the signal it handles,
//! `restore` pops the rest, and each bit is claimed by exactly one of them.
//! The handle is closed exactly once.

use std::cell::UnsafeCell;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use libc::c_int;
use tracing::debug;

use super::console::Console;
use super::error::{PromptError, Result};
use super::sigchain::{self, Handler, COMMON_SIGNALS};

pub struct TerminalGuard<C: Console> {
    console: C,
    /// Installed for the common signals while echo is off
    trampoline: Handler,
    /// A handle is open
    open: AtomicBool,
    /// A saved mode is pending restore
    armed: AtomicBool,
    /// Signals the trampoline is pushed for, one bit per signal number
    pushed: AtomicU32,
    handle: UnsafeCell<Option<C::Handle>>,
    saved: UnsafeCell<Option<C::Mode>>,
}

// Safety: `handle` is written only while `open` is false and `saved` only
// while `armed` is false; both are published with Release stores and read
// after Acquire loads of the matching flag.
unsafe impl<C> Sync for TerminalGuard<C>
where
    C: Console + Sync,
    C::Handle: Send,
    C::Mode: Send,
{
}

impl<C: Console> TerminalGuard<C> {
    /// Create an unset guard. `trampoline` must end up calling
    /// [`TerminalGuard::on_signal`] on this same guard.
    pub const fn new(console: C, trampoline: Handler) -> Self {
        Self {
            console,
            trampoline,
            open: AtomicBool::new(false),
            armed: AtomicBool::new(false),
            pushed: AtomicU32::new(0),
            handle: UnsafeCell::new(None),
            saved: UnsafeCell::new(None),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Echo is currently turned off by this guard
    pub fn echo_disabled(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Open the controlling terminal.
    ///
    /// Only one handle may be open per guard; a second call before
    /// `restore` fails with [`PromptError::Busy`].
    pub fn open(&self) -> Result<()> {
        if self.is_open() {
            return Err(PromptError::Busy);
        }

        let handle = self.console.open().map_err(PromptError::NoTerminal)?;
        unsafe {
            *self.handle.get() = Some(handle);
        }
        self.open.store(true, Ordering::Release);
        debug!("terminal opened");
        Ok(())
    }

    /// Save the current mode, push the signal trampoline and turn echo off.
    ///
    /// On any failure the trampoline is not left installed and the handle
    /// is closed.
    pub fn disable_echo(&self) -> Result<()> {
        let handle = self.current_handle().ok_or_else(|| {
            PromptError::NoTerminal(io::Error::new(
                io::ErrorKind::NotConnected,
                "terminal is not open",
            ))
        })?;
        if self.echo_disabled() {
            return Ok(());
        }

        let saved = match self.console.get_mode(handle) {
            Ok(mode) => mode,
            Err(e) => {
                self.close_handle();
                return Err(PromptError::ModeFailure(e));
            }
        };
        unsafe {
            *self.saved.get() = Some(saved);
        }
        self.armed.store(true, Ordering::Release);

        // Blocked so the trampoline cannot run before its bits are set.
        let pushed = sigchain::with_blocked(COMMON_SIGNALS, || -> io::Result<()> {
            sigchain::push_common(self.trampoline)?;
            self.pushed
                .store(sigchain::mask_of(COMMON_SIGNALS), Ordering::Release);
            Ok(())
        });
        if let Err(e) = pushed {
            self.armed.store(false, Ordering::Release);
            self.close_handle();
            return Err(PromptError::ModeFailure(e));
        }

        let quiet = self.console.without_echo(saved);
        if let Err(e) = self.console.set_mode(handle, &quiet) {
            self.armed.store(false, Ordering::Release);
            self.release_signals();
            self.close_handle();
            return Err(PromptError::ModeFailure(e));
        }

        debug!("terminal echo disabled");
        Ok(())
    }

    /// Put the saved mode back and close the handle.
    ///
    /// No-op when nothing is open. Never fails: a mode that cannot be
    /// re-applied is dropped on the floor and the handle is closed anyway.
    pub fn restore(&self) {
        if self.echo_disabled() {
            // Apply before disarming so a signal landing in between still
            // finds the mode pending.
            self.put_back_mode();
            if self.armed.swap(false, Ordering::AcqRel) {
                debug!("terminal mode restored");
            }
        }
        self.release_signals();
        self.close_handle();
    }

    /// Signal path: restore, drop this handler for `sig`, then hand `sig`
    /// back to the previous disposition through `reraise`.
    ///
    /// The other signals stay pushed until the main line calls `restore`.
    /// Async-signal-safe as long as the console is.
    pub fn on_signal(&self, sig: c_int, reraise: fn(c_int)) {
        if self.armed.swap(false, Ordering::AcqRel) {
            self.put_back_mode();
        }
        self.close_handle();
        let bit = sigchain::bit(sig);
        if self.pushed.fetch_and(!bit, Ordering::AcqRel) & bit != 0 {
            sigchain::pop(sig);
        }
        reraise(sig);
    }

    /// Pop every signal the trampoline is still pushed for.
    ///
    /// Runs with those signals blocked: one arriving after its bit is
    /// claimed here is delivered to the previous disposition once popped.
    fn release_signals(&self) {
        if self.pushed.load(Ordering::Acquire) == 0 {
            return;
        }
        sigchain::with_blocked(COMMON_SIGNALS, || {
            let pushed = self.pushed.swap(0, Ordering::AcqRel);
            for &sig in COMMON_SIGNALS.iter().rev() {
                if pushed & sigchain::bit(sig) != 0 {
                    sigchain::pop(sig);
                }
            }
        });
    }

    fn current_handle(&self) -> Option<C::Handle> {
        if !self.is_open() {
            return None;
        }
        unsafe { *self.handle.get() }
    }

    fn put_back_mode(&self) {
        let saved = unsafe { *self.saved.get() };
        if let (Some(handle), Some(saved)) = (self.current_handle(), saved) {
            let _ = self.console.set_mode(handle, &saved);
        }
    }

    fn close_handle(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            if let Some(handle) = unsafe { *self.handle.get() } {
                self.console.close(handle);
            }
        }
    }
}

impl<C: Console> Drop for TerminalGuard<C> {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(any(unix, windows))]
mod tty {
    use libc::c_int;

    use super::TerminalGuard;
    use crate::core::console::PlatformConsole;

    /// The process-wide guard for the controlling terminal.
    pub static TTY: TerminalGuard<PlatformConsole> =
        TerminalGuard::new(PlatformConsole, restore_tty_on_signal);

    extern "C" fn restore_tty_on_signal(sig: c_int) {
        TTY.on_signal(sig, raise);
    }

    fn raise(sig: c_int) {
        unsafe {
            libc::raise(sig);
        }
    }
}

#[cfg(any(unix, windows))]
pub use tty::TTY;
