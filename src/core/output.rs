//! Output coalescing.
//!
//! A render pass wraps its backend in a `CoalesceScope` so every byte it
//! produces reaches the terminal in a single write. Scopes nest: an inner
//! scope buffers into the outer one, and only the outermost scope ever
//! touches the device.

use super::terminal::{TermCaps, TerminalBackend};

pub struct CoalesceScope<'a> {
    inner: &'a mut dyn TerminalBackend,
    buf: String,
}

impl<'a> CoalesceScope<'a> {
    pub fn new(inner: &'a mut dyn TerminalBackend) -> Self {
        Self {
            inner,
            buf: String::new(),
        }
    }

    /// Flush everything buffered so far without ending the scope. Used
    /// before a cursor-position probe, which must observe all prior output.
    pub fn split(&mut self) {
        if !self.buf.is_empty() {
            self.inner.write(&self.buf);
            self.inner.flush();
            self.buf.clear();
        }
    }

    /// Drop the buffered bytes without writing them.
    pub fn discard(&mut self) {
        self.buf.clear();
    }

    #[cfg(test)]
    pub fn buffered(&self) -> &str {
        &self.buf
    }
}

impl TerminalBackend for CoalesceScope<'_> {
    fn write(&mut self, data: &str) {
        self.buf.push_str(data);
    }

    fn flush(&mut self) {}

    fn size(&self) -> (u16, u16) {
        self.inner.size()
    }

    fn cursor_position(&mut self) -> Option<(u16, u16)> {
        self.split();
        self.inner.cursor_position()
    }

    fn caps(&self) -> TermCaps {
        self.inner.caps()
    }
}

impl Drop for CoalesceScope<'_> {
    fn drop(&mut self) {
        self.split();
    }
}
