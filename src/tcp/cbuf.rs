use std::fmt;
use std::io;
use std::io::{Read, Write};

/// Fixed-capacity ring of bytes. The storage is allocated once and never
/// grows; writes beyond the free space are truncated.
#[derive(Clone)]
pub struct CircularBuffer {
    buf: Box<[u8]>,
    head: usize, // Index of the oldest byte
    len: usize,  // Bytes currently stored
}

impl CircularBuffer {
    pub fn new(capacity: usize) -> Self {
        CircularBuffer {
            buf: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn used_space(&self) -> usize {
        self.len
    }

    pub fn free_space(&self) -> usize {
        self.buf.len() - self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append up to `free_space()` bytes, returning how many were stored.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let cap = self.buf.len();
        let n = data.len().min(self.free_space());
        if n == 0 {
            return 0;
        }

        let tail = (self.head + self.len) % cap;
        let first = n.min(cap - tail);
        self.buf[tail..tail + first].copy_from_slice(&data[..first]);
        self.buf[..n - first].copy_from_slice(&data[first..n]);
        self.len += n;
        n
    }

    /// Discard up to `n` bytes from the front, returning how many were dropped.
    pub fn pop(&mut self, n: usize) -> usize {
        let n = n.min(self.len);
        if n == 0 {
            return 0;
        }
        self.head = (self.head + n) % self.buf.len();
        self.len -= n;
        if self.len == 0 {
            self.head = 0;
        }
        n
    }

    /// Copy up to `n` bytes from the front without consuming them.
    pub fn peek(&self, n: usize) -> Vec<u8> {
        let n = n.min(self.len);
        let mut out = Vec::with_capacity(n);
        let (a, b) = self.as_slices();
        let first = n.min(a.len());
        out.extend_from_slice(&a[..first]);
        out.extend_from_slice(&b[..n - first]);
        out
    }

    /// The stored bytes as up to two contiguous runs.
    pub fn as_slices(&self) -> (&[u8], &[u8]) {
        let cap = self.buf.len();
        if self.len == 0 {
            return (&[], &[]);
        }
        let end = self.head + self.len;
        if end <= cap {
            (&self.buf[self.head..end], &[])
        } else {
            (&self.buf[self.head..], &self.buf[..end - cap])
        }
    }
}

impl PartialEq for CircularBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.capacity() == other.capacity()
            && self.len == other.len
            && self.peek(self.len) == other.peek(other.len)
    }
}

impl Eq for CircularBuffer {}

impl fmt::Debug for CircularBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircularBuffer")
            .field("capacity", &self.capacity())
            .field("used", &self.len)
            .finish()
    }
}

impl Read for CircularBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.peek(buf.len());
        buf[..data.len()].copy_from_slice(&data);
        Ok(self.pop(data.len()))
    }
}

impl Write for CircularBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(CircularBuffer::write(self, buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// -- Unit tests --
