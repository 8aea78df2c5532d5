//! Byte sources the decoder pulls frames from.
//!
//! The decoder only needs to know how many bytes are buffered, look at the
//! next one, take one, and throw the rest away. A UART driver provides that
//! natively; for anything implementing `std::io::Read` (a serial port, a
//! file, a socket) `StreamSource` keeps the buffer itself.

use std::collections::VecDeque;
use std::io::{self, Read};

/// Enough for three base-size frames.
pub const DEFAULT_CAPACITY: usize = 96;

pub trait ByteSource {
    /// Number of bytes buffered and readable without blocking.
    fn available(&self) -> usize;

    /// Next byte, without consuming it.
    fn peek(&self) -> Option<u8>;

    /// Consumes and returns the next byte.
    fn read(&mut self) -> Option<u8>;

    /// Discards everything buffered.
    fn flush(&mut self);
}

/// In-memory FIFO of received bytes.
#[derive(Debug, Clone)]
pub struct BufferedSource {
    buffer: VecDeque<u8>,
    capacity: usize,
}

impl Default for BufferedSource {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl BufferedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        BufferedSource {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends received bytes. Like a UART ring buffer, when full the oldest
    /// bytes are overwritten.
    pub fn push(&mut self, data: &[u8]) {
        for &b in data {
            if self.buffer.len() == self.capacity {
                self.buffer.pop_front();
            }
            self.buffer.push_back(b);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl ByteSource for BufferedSource {
    fn available(&self) -> usize {
        self.buffer.len()
    }

    fn peek(&self) -> Option<u8> {
        self.buffer.front().copied()
    }

    fn read(&mut self) -> Option<u8> {
        self.buffer.pop_front()
    }

    fn flush(&mut self) {
        self.buffer.clear();
    }
}

/// Buffers bytes from a blocking reader, typically a serial port opened with
/// a read timeout.
pub struct StreamSource<R> {
    inner: R,
    buffer: BufferedSource,
}

impl<R: Read> StreamSource<R> {
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        StreamSource {
            inner,
            buffer: BufferedSource::with_capacity(capacity),
        }
    }

    /// Pulls whatever the reader yields in one read into the buffer and
    /// returns the number of new bytes. A timeout counts as zero bytes.
    pub fn fill(&mut self) -> io::Result<usize> {
        let mut chunk = [0; DEFAULT_CAPACITY];
        match self.inner.read(&mut chunk) {
            Ok(n) => {
                self.buffer.push(&chunk[..n]);
                Ok(n)
            }
            Err(e)
                if e.kind() == io::ErrorKind::TimedOut
                    || e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::Interrupted =>
            {
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R> ByteSource for StreamSource<R> {
    fn available(&self) -> usize {
        self.buffer.available()
    }

    fn peek(&self) -> Option<u8> {
        self.buffer.peek()
    }

    fn read(&mut self) -> Option<u8> {
        self.buffer.read()
    }

    fn flush(&mut self) {
        self.buffer.flush();
    }
}
