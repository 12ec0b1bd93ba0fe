//! Signal handler chain
//!
//! Keeps a small stack of previous dispositions per signal so a handler can
//! be pushed for the duration of an operation and popped again, putting back
//! whatever was installed before. On Unix the whole `sigaction` (handler,
//! flags and mask) is saved, so a host's `SA_SIGINFO` handler comes back
//! intact. Pop only touches atomics and `sigaction(2)`/`signal(2)`, so it
//! may be called from inside a signal handler.
//!
//! A push is not atomic with respect to the signal it installs for: callers
//! whose handler pops the chain run the push under [`with_blocked`].

use std::cell::UnsafeCell;
use std::io;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

use libc::c_int;

/// A plain C signal handler.
pub type Handler = extern "C" fn(c_int);

/// Signals that normally terminate an interactive process.
#[cfg(unix)]
pub const COMMON_SIGNALS: &[c_int] = &[
    libc::SIGINT,
    libc::SIGHUP,
    libc::SIGTERM,
    libc::SIGQUIT,
    libc::SIGPIPE,
];

/// Signals that normally terminate an interactive process.
#[cfg(windows)]
pub const COMMON_SIGNALS: &[c_int] = &[libc::SIGINT, libc::SIGTERM];

#[cfg(not(any(unix, windows)))]
pub const COMMON_SIGNALS: &[c_int] = &[];

/// Maximum nesting per signal
const MAX_DEPTH: usize = 8;

/// Table size; covers every standard signal number and fits a `u32` mask
const MAX_SIGNAL: usize = 32;

#[cfg(unix)]
mod raw {
    use std::io;

    use libc::c_int;
    use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};

    use super::Handler;

    pub type Saved = SigAction;

    fn to_signal(sig: c_int) -> io::Result<Signal> {
        Signal::try_from(sig).map_err(io::Error::from)
    }

    pub fn install(sig: c_int, handler: Handler) -> io::Result<Saved> {
        let signal = to_signal(sig)?;
        let action = SigAction::new(SigHandler::Handler(handler), SaFlags::empty(), SigSet::empty());
        // Safety: chain handlers only make async-signal-safe calls.
        let old = unsafe { signal::sigaction(signal, &action) }?;
        Ok(old)
    }

    pub fn reinstall(sig: c_int, saved: &Saved) {
        if let Ok(signal) = Signal::try_from(sig) {
            // Safety: `saved` is the action the kernel reported for `sig`.
            let _ = unsafe { signal::sigaction(signal, saved) };
        }
    }

    pub fn with_blocked<R>(signals: &[c_int], f: impl FnOnce() -> R) -> R {
        let mut set = SigSet::empty();
        for &sig in signals {
            if let Ok(signal) = Signal::try_from(sig) {
                set.add(signal);
            }
        }

        let mut old = SigSet::empty();
        let blocked =
            signal::pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&set), Some(&mut old)).is_ok();
        let result = f();
        if blocked {
            let _ = signal::pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&old), None);
        }
        result
    }
}

#[cfg(not(unix))]
mod raw {
    use std::io;

    use libc::{c_int, sighandler_t};

    use super::Handler;

    pub type Saved = sighandler_t;

    /// `SIG_ERR` is `-1` cast to the handler type
    const SIG_ERR: sighandler_t = !0;

    pub fn install(sig: c_int, handler: Handler) -> io::Result<Saved> {
        // Safety: `handler` is an `extern "C" fn(c_int)`, which is what
        // `signal` expects behind `sighandler_t`.
        let old = unsafe { libc::signal(sig, handler as sighandler_t) };
        if old == SIG_ERR {
            return Err(io::Error::last_os_error());
        }
        Ok(old)
    }

    pub fn reinstall(sig: c_int, saved: &Saved) {
        // Safety: `saved` was returned by `signal` for this very signal.
        unsafe {
            libc::signal(sig, *saved);
        }
    }

    /// The CRT has no signal mask; handlers run on their own thread.
    pub fn with_blocked<R>(_signals: &[c_int], f: impl FnOnce() -> R) -> R {
        f()
    }
}

type Slot = UnsafeCell<MaybeUninit<raw::Saved>>;

struct SignalStack {
    len: AtomicUsize,
    saved: [Slot; MAX_DEPTH],
}

// Safety: slot `i` is written only while `len == i`, before the Release
// store that makes `len > i`, and read only after an Acquire load of `len`.
unsafe impl Sync for SignalStack {}

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: Slot = UnsafeCell::new(MaybeUninit::uninit());

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_STACK: SignalStack = SignalStack {
    len: AtomicUsize::new(0),
    saved: [EMPTY_SLOT; MAX_DEPTH],
};

static STACKS: [SignalStack; MAX_SIGNAL] = [EMPTY_STACK; MAX_SIGNAL];

fn stack_for(sig: c_int) -> Option<&'static SignalStack> {
    usize::try_from(sig).ok().and_then(|idx| STACKS.get(idx))
}

/// Install `handler` for `sig`, remembering the previous disposition.
pub fn push(sig: c_int, handler: Handler) -> io::Result<()> {
    let stack = stack_for(sig).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("signal {} out of range", sig))
    })?;

    let len = stack.len.load(Ordering::Acquire);
    if len == MAX_DEPTH {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("signal chain for {} is full", sig),
        ));
    }

    let old = raw::install(sig, handler)?;
    unsafe {
        (*stack.saved[len].get()).write(old);
    }
    stack.len.store(len + 1, Ordering::Release);
    Ok(())
}

/// Put back the disposition that was in place before the last `push`.
///
/// Does nothing when nothing was pushed for `sig`. Async-signal-safe.
pub fn pop(sig: c_int) {
    let Some(stack) = stack_for(sig) else {
        return;
    };

    let len = stack.len.load(Ordering::Acquire);
    if len == 0 {
        return;
    }

    // Safety: slots below `len` were initialized by `push`.
    let saved = unsafe { (*stack.saved[len - 1].get()).assume_init_ref() };
    raw::reinstall(sig, saved);
    stack.len.store(len - 1, Ordering::Release);
}

/// Push `handler` for every signal in `signals`.
///
/// All or nothing: if one push fails the ones already made are popped.
pub fn push_all(signals: &[c_int], handler: Handler) -> io::Result<()> {
    for (done, &sig) in signals.iter().enumerate() {
        if let Err(e) = push(sig, handler) {
            for &pushed in signals[..done].iter().rev() {
                pop(pushed);
            }
            return Err(e);
        }
    }
    Ok(())
}

/// Push `handler` for [`COMMON_SIGNALS`].
pub fn push_common(handler: Handler) -> io::Result<()> {
    push_all(COMMON_SIGNALS, handler)
}

/// Pop one level for every signal in [`COMMON_SIGNALS`].
pub fn pop_common() {
    for &sig in COMMON_SIGNALS {
        pop(sig);
    }
}

/// Number of handlers currently pushed for `sig`
pub fn depth(sig: c_int) -> usize {
    stack_for(sig).map_or(0, |stack| stack.len.load(Ordering::Acquire))
}

/// Bit for `sig` in a `u32` signal mask; zero when out of range.
pub fn bit(sig: c_int) -> u32 {
    match u32::try_from(sig) {
        Ok(n) if (n as usize) < MAX_SIGNAL => 1 << n,
        _ => 0,
    }
}

/// Mask with the bit of every signal in `signals` set.
pub fn mask_of(signals: &[c_int]) -> u32 {
    signals.iter().fold(0, |mask, &sig| mask | bit(sig))
}

/// Run `f` with `signals` blocked on the calling thread.
///
/// Signals raised meanwhile stay pending and are delivered once the old
/// mask is back, to whatever disposition is installed by then.
pub fn with_blocked<R>(signals: &[c_int], f: impl FnOnce() -> R) -> R {
    raw::with_blocked(signals, f)
}

/// Serializes tests that change process-wide signal dispositions.
#[cfg(test)]
pub(crate) static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
pub(crate) fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}
