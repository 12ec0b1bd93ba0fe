//! Platform terminal devices
//!
//! [`Console`] is the narrow set of operations the terminal guard needs:
//! open the device, read and write its mode, and close it. `set_mode` and
//! `close` are called from signal handlers and must stay async-signal-safe
//! (no allocation, no locks, no buffered I/O).

use std::io;

pub trait Console {
    /// Raw device handle
    type Handle: Copy;
    /// Snapshot of the device's mode flags
    type Mode: Copy;

    /// Open the controlling terminal for reading and writing.
    fn open(&self) -> io::Result<Self::Handle>;

    /// Read the current mode.
    fn get_mode(&self, handle: Self::Handle) -> io::Result<Self::Mode>;

    /// Apply `mode`. Must be async-signal-safe.
    fn set_mode(&self, handle: Self::Handle, mode: &Self::Mode) -> io::Result<()>;

    /// `mode` with character echo turned off.
    fn without_echo(&self, mode: Self::Mode) -> Self::Mode;

    /// Release the handle. Must be async-signal-safe.
    fn close(&self, handle: Self::Handle);
}

#[cfg(unix)]
pub use unix::{DevTty as PlatformConsole, TTY_PATH};

#[cfg(windows)]
pub use windows_console::ConIn as PlatformConsole;

#[cfg(unix)]
mod unix {
    use std::io;
    use std::os::unix::io::{BorrowedFd, RawFd};

    use nix::fcntl::{self, OFlag};
    use nix::sys::stat::Mode;
    use nix::sys::termios;

    use super::Console;

    pub const TTY_PATH: &str = "/dev/tty";

    /// `/dev/tty`, driven through termios
    #[derive(Debug, Clone, Copy, Default)]
    pub struct DevTty;

    impl Console for DevTty {
        type Handle = RawFd;
        type Mode = libc::termios;

        fn open(&self) -> io::Result<RawFd> {
            let fd = fcntl::open(TTY_PATH, OFlag::O_RDWR | OFlag::O_CLOEXEC, Mode::empty())?;
            Ok(fd)
        }

        fn get_mode(&self, handle: RawFd) -> io::Result<libc::termios> {
            // Safety: the guard keeps `handle` open until it calls `close`.
            let fd = unsafe { BorrowedFd::borrow_raw(handle) };
            let attrs = termios::tcgetattr(fd)?;
            Ok(attrs.into())
        }

        fn set_mode(&self, handle: RawFd, mode: &libc::termios) -> io::Result<()> {
            // Raw libc so this stays usable from a signal handler.
            let rc = unsafe { libc::tcsetattr(handle, libc::TCSAFLUSH, mode) };
            if rc < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }

        fn without_echo(&self, mut mode: libc::termios) -> libc::termios {
            mode.c_lflag &= !libc::ECHO;
            mode
        }

        fn close(&self, handle: RawFd) {
            unsafe {
                libc::close(handle);
            }
        }
    }

}

#[cfg(windows)]
mod windows_console {
    use std::io;

    use windows::core::w;
    use windows::Win32::Foundation::{CloseHandle, GENERIC_READ, GENERIC_WRITE, HANDLE};
    use windows::Win32::Storage::FileSystem::{
        CreateFileW, FILE_ATTRIBUTE_NORMAL, FILE_SHARE_READ, OPEN_EXISTING,
    };
    use windows::Win32::System::Console::{
        GetConsoleMode, SetConsoleMode, CONSOLE_MODE, ENABLE_ECHO_INPUT,
    };

    use super::Console;

    fn to_io(e: windows::core::Error) -> io::Error {
        io::Error::new(io::ErrorKind::Other, e)
    }

    fn handle(raw: isize) -> HANDLE {
        HANDLE(raw as *mut _)
    }

    /// `CONIN$`, driven through the console mode flags
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ConIn;

    impl Console for ConIn {
        type Handle = isize;
        type Mode = CONSOLE_MODE;

        fn open(&self) -> io::Result<isize> {
            let h = unsafe {
                CreateFileW(
                    w!("CONIN$"),
                    GENERIC_READ.0 | GENERIC_WRITE.0,
                    FILE_SHARE_READ,
                    None,
                    OPEN_EXISTING,
                    FILE_ATTRIBUTE_NORMAL,
                    HANDLE::default(),
                )
            }
            .map_err(to_io)?;
            Ok(h.0 as isize)
        }

        fn get_mode(&self, raw: isize) -> io::Result<CONSOLE_MODE> {
            let mut mode = CONSOLE_MODE(0);
            unsafe { GetConsoleMode(handle(raw), &mut mode) }.map_err(to_io)?;
            Ok(mode)
        }

        fn set_mode(&self, raw: isize, mode: &CONSOLE_MODE) -> io::Result<()> {
            unsafe { SetConsoleMode(handle(raw), *mode) }.map_err(to_io)
        }

        fn without_echo(&self, mode: CONSOLE_MODE) -> CONSOLE_MODE {
            CONSOLE_MODE(mode.0 & !ENABLE_ECHO_INPUT.0)
        }

        fn close(&self, raw: isize) {
            unsafe {
                let _ = CloseHandle(handle(raw));
            }
        }
    }
}
