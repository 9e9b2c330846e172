//! Process terminal backend.
//!
//! Writes rendered bytes to the controlling terminal's stdout fd and answers
//! the queries the render pass needs: window size, capability flags, and a
//! best-effort cursor-position probe. The host editor owns raw mode and
//! input; this backend only assumes the terminal is already in a mode where
//! a DSR response arrives on stdin unbuffered.

use std::env;

use crate::core::terminal::{TermCaps, TerminalBackend};

#[cfg(unix)]
use libc::c_int;
#[cfg(unix)]
use signal_hook::iterator::Signals;
#[cfg(unix)]
use std::thread::{self, JoinHandle};

#[cfg(unix)]
fn wait_writable(fd: c_int) -> std::io::Result<()> {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLOUT,
        revents: 0,
    };
    loop {
        let result = unsafe { libc::poll(&mut fds, 1, -1) };
        if result < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if result == 0 {
            continue;
        }
        if (fds.revents & libc::POLLOUT) != 0 {
            return Ok(());
        }
        return Err(std::io::Error::other(format!(
            "poll(POLLOUT) returned revents=0x{:x}",
            fds.revents
        )));
    }
}

#[cfg(unix)]
fn poll_readable(fd: c_int, timeout_ms: i32) -> bool {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let result = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    result > 0 && (fds.revents & libc::POLLIN) != 0
}

#[cfg(unix)]
fn write_all_fd_with<FWrite, FWait>(
    fd: c_int,
    bytes: &[u8],
    mut write_once: FWrite,
    mut wait_writable: FWait,
) -> std::io::Result<()>
where
    FWrite: FnMut(c_int, &[u8]) -> std::io::Result<usize>,
    FWait: FnMut(c_int) -> std::io::Result<()>,
{
    let mut written = 0;
    while written < bytes.len() {
        match write_once(fd, &bytes[written..]) {
            Ok(0) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "write returned 0",
                ));
            }
            Ok(count) => {
                let remaining = bytes.len() - written;
                if count > remaining {
                    return Err(std::io::Error::other(
                        "write returned more bytes than requested",
                    ));
                }
                written += count;
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                wait_writable(fd)?;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(unix)]
fn write_fd(fd: c_int, data: &str) -> std::io::Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    write_all_fd_with(
        fd,
        data.as_bytes(),
        |fd, buf| {
            let result =
                unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
            if result < 0 {
                Err(std::io::Error::last_os_error())
            } else {
                Ok(result as usize)
            }
        },
        wait_writable,
    )
}

#[cfg(unix)]
fn read_winsize(fd: c_int) -> Option<(u16, u16)> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 && size.ws_row > 0 {
        Some((size.ws_col, size.ws_row))
    } else {
        None
    }
}

/// Detect capability flags once, from the environment. The render path only
/// ever branches on the returned flags.
pub fn detect_caps() -> TermCaps {
    let term = env::var("TERM").unwrap_or_default();
    let dumb = term.is_empty() || term == "dumb";

    let lang = env::var("LC_ALL")
        .or_else(|_| env::var("LC_CTYPE"))
        .or_else(|_| env::var("LANG"))
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cjk = ["ja", "ko", "zh"]
        .iter()
        .any(|prefix| lang.starts_with(prefix));

    TermCaps {
        insert_delete_cols: !dumb,
        consistent_autowrap: !dumb,
        double_width_reconciliation: cjk,
    }
}

/// Terminal backend bound to the process stdout/stdin fds.
#[cfg(unix)]
pub struct ProcessTerminal {
    stdin_fd: c_int,
    stdout_fd: c_int,
    caps: TermCaps,
}

#[cfg(unix)]
impl ProcessTerminal {
    pub fn new() -> Self {
        Self {
            stdin_fd: libc::STDIN_FILENO,
            stdout_fd: libc::STDOUT_FILENO,
            caps: detect_caps(),
        }
    }

    /// Bind to explicit fds, for pty-backed tests.
    pub fn with_fds(stdin_fd: i32, stdout_fd: i32) -> Self {
        Self {
            stdin_fd,
            stdout_fd,
            caps: detect_caps(),
        }
    }

    /// Issue a DSR probe and parse the `ESC [ row ; col R` response.
    /// Returns `None` when the terminal does not answer promptly.
    fn probe_cursor(&mut self) -> Option<(u16, u16)> {
        write_fd(self.stdout_fd, "\x1b[6n").ok()?;

        let mut response = Vec::with_capacity(16);
        let mut buf = [0u8; 16];
        while !response.ends_with(b"R") {
            if !poll_readable(self.stdin_fd, 100) {
                return None;
            }
            let read_len =
                unsafe { libc::read(self.stdin_fd, buf.as_mut_ptr() as *mut _, buf.len()) };
            if read_len <= 0 {
                return None;
            }
            response.extend_from_slice(&buf[..read_len as usize]);
            if response.len() > 64 {
                return None;
            }
        }
        parse_dsr(&response)
    }
}

/// Extract `(col, row)` from a DSR response, 0-based. Bytes before the final
/// `ESC [` are ignored so stray input does not poison the parse.
fn parse_dsr(response: &[u8]) -> Option<(u16, u16)> {
    let start = response
        .windows(2)
        .rposition(|pair| pair == b"\x1b[")?;
    let body = std::str::from_utf8(&response[start + 2..]).ok()?;
    let body = body.strip_suffix('R')?;
    let (row, col) = body.split_once(';')?;
    let row: u16 = row.trim().parse().ok()?;
    let col: u16 = col.trim().parse().ok()?;
    Some((col.saturating_sub(1), row.saturating_sub(1)))
}

#[cfg(unix)]
impl Default for ProcessTerminal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
impl TerminalBackend for ProcessTerminal {
    fn write(&mut self, data: &str) {
        // Rendering cannot usefully recover from a dead tty; drop the bytes.
        let _ = write_fd(self.stdout_fd, data);
    }

    fn flush(&mut self) {
        // write(2) is unbuffered.
    }

    fn size(&self) -> (u16, u16) {
        read_winsize(self.stdout_fd).unwrap_or((80, 24))
    }

    fn cursor_position(&mut self) -> Option<(u16, u16)> {
        self.probe_cursor()
    }

    fn caps(&self) -> TermCaps {
        self.caps
    }
}

/// Watches SIGWINCH on a dedicated thread and invokes the handler for each
/// delivery. Dropping the guard closes the signal stream and joins the
/// thread.
#[cfg(unix)]
pub struct ResizeWatcherGuard {
    handle: signal_hook::iterator::Handle,
    thread: Option<JoinHandle<()>>,
}

#[cfg(unix)]
impl Drop for ResizeWatcherGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(unix)]
pub fn watch_resize<F>(on_resize: F) -> std::io::Result<ResizeWatcherGuard>
where
    F: FnMut() + Send + 'static,
{
    let mut signals = Signals::new([libc::SIGWINCH])?;
    let handle = signals.handle();
    let mut on_resize = on_resize;

    let thread = thread::spawn(move || {
        for _ in signals.forever() {
            on_resize();
        }
    });

    Ok(ResizeWatcherGuard {
        handle,
        thread: Some(thread),
    })
}

#[cfg(not(unix))]
pub struct ProcessTerminal;

#[cfg(not(unix))]
impl ProcessTerminal {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(unix))]
impl Default for ProcessTerminal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(unix))]
impl TerminalBackend for ProcessTerminal {
    fn write(&mut self, _data: &str) {}

    fn flush(&mut self) {}

    fn size(&self) -> (u16, u16) {
        (80, 24)
    }
}
