//! Reference Writer - Append-only byte output
//!
//! Every byte of a dump goes through [`ReferenceWriter`], which forwards to a
//! caller-supplied [`DumpSink`] and counts what was written. Each call is one
//! sink write; buffering and flushing belong to the sink.

use crate::error::{DumpError, Result};
use std::io::{self, Write};

/// Destination of dump bytes
///
/// Implemented for every [`std::io::Write`] and for [`CallbackSink`].
pub trait DumpSink {
    /// Append `bytes`; a failure ends the current dump
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl<W: Write> DumpSink for W {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)
    }
}

/// Sink that hands each chunk to a closure
///
/// # Example
///
/// ```rust
/// use heapgraph::writer::{CallbackSink, DumpSink};
///
/// let mut chunks = Vec::new();
/// let mut sink = CallbackSink::new(|bytes: &[u8]| {
///     chunks.push(bytes.to_vec());
///     Ok(())
/// });
/// sink.write_bytes(b"{}").unwrap();
/// drop(sink);
/// assert_eq!(chunks, vec![b"{}".to_vec()]);
/// ```
pub struct CallbackSink<F> {
    callback: F,
}

impl<F> CallbackSink<F>
where
    F: FnMut(&[u8]) -> io::Result<()>,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> DumpSink for CallbackSink<F>
where
    F: FnMut(&[u8]) -> io::Result<()>,
{
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        (self.callback)(bytes)
    }
}

/// Counting writer over a sink
pub struct ReferenceWriter<'s, S: DumpSink + ?Sized> {
    sink: &'s mut S,
    bytes_written: u64,
}

impl<'s, S: DumpSink + ?Sized> ReferenceWriter<'s, S> {
    pub fn new(sink: &'s mut S) -> Self {
        Self {
            sink,
            bytes_written: 0,
        }
    }

    /// Write raw bytes
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink.write_bytes(bytes).map_err(DumpError::Sink)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Write a static fragment such as `", \"refs\": ["`
    #[inline]
    pub fn write_static(&mut self, fragment: &'static str) -> Result<()> {
        self.write_raw(fragment.as_bytes())
    }

    /// Write an unsigned decimal number
    pub fn write_unsigned(&mut self, value: u64) -> Result<()> {
        let mut buf = NumberBuf::new();
        let digits = buf.format_unsigned(value);
        self.write_raw(digits)
    }

    /// Write a signed decimal number
    pub fn write_signed(&mut self, value: i64) -> Result<()> {
        let mut buf = NumberBuf::new();
        let digits = buf.format_signed(value);
        self.write_raw(digits)
    }

    /// Bytes successfully handed to the sink
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

/// Stack buffer for decimal formatting; 20 digits plus a sign
struct NumberBuf {
    buf: [u8; 24],
}

impl NumberBuf {
    fn new() -> Self {
        Self { buf: [0; 24] }
    }

    fn format_unsigned(&mut self, mut value: u64) -> &[u8] {
        let mut pos = self.buf.len();
        loop {
            pos -= 1;
            self.buf[pos] = b'0' + (value % 10) as u8;
            value /= 10;
            if value == 0 {
                break;
            }
        }
        &self.buf[pos..]
    }

    fn format_signed(&mut self, value: i64) -> &[u8] {
        let len = self.format_unsigned(value.unsigned_abs()).len();
        let mut start = self.buf.len() - len;
        if value < 0 {
            start -= 1;
            self.buf[start] = b'-';
        }
        &self.buf[start..]
    }
}
