// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Console abstraction for script-visible output.
//!
//! `p`, `puts`, `print` and unhandled-exception reports all route
//! through the [`Console`] trait, so targets can back it with whatever
//! byte sink they have and tests can capture output.


use core::fmt;

/// Byte-level output sink.
pub trait Console {
    /// Write raw bytes.
    fn write_bytes(&mut self, bytes: &[u8]);

    /// Write a string.
    fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }
}

/// Adapter making any [`Console`] usable with `core::fmt` machinery.
pub struct FmtWriter<'a, C: Console>(pub &'a mut C);

impl<C: Console> fmt::Write for FmtWriter<'_, C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}

/// Console rendering into a fixed byte buffer, dropping overflow.
///
/// Used where a value must be rendered to bytes without the host
/// allocator (string interpolation, exception reports).
pub struct SliceConsole<'a> {
    buffer: &'a mut [u8],
    len: usize,
}

impl<'a> SliceConsole<'a> {
    /// Render into `buffer`.
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, len: 0 }
    }

    /// The bytes rendered so far.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }
}

impl Console for SliceConsole<'_> {
    fn write_bytes(&mut self, bytes: &[u8]) {
        let avail = self.buffer.len() - self.len;
        let take = bytes.len().min(avail);
        self.buffer[self.len..self.len + take].copy_from_slice(&bytes[..take]);
        self.len += take;
    }
}

/// Console printing to the host's stdout.
#[cfg(any(test, feature = "std"))]
pub struct StdoutConsole;

#[cfg(any(test, feature = "std"))]
impl Console for StdoutConsole {
    fn write_bytes(&mut self, bytes: &[u8]) {
        use std::io::Write;
        let mut out = std::io::stdout();
        let _ = out.write_all(bytes);
    }
}

/// Console capturing output into a buffer, for tests.
#[cfg(any(test, feature = "std"))]
pub struct BufferConsole {
    buffer: std::vec::Vec<u8>,
}

#[cfg(any(test, feature = "std"))]
impl BufferConsole {
    /// Create an empty capture buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: std::vec::Vec::new(),
        }
    }

    /// Everything written so far.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Everything written so far, as UTF-8 (lossy for byte strings).
    #[must_use]
    pub fn as_string(&self) -> std::string::String {
        std::string::String::from_utf8_lossy(&self.buffer).into_owned()
    }

    /// Discard captured output.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(any(test, feature = "std"))]
impl Default for BufferConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "std"))]
impl Console for BufferConsole {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }
}
