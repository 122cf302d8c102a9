//! # Byte link
//!
//! The rover protocol only needs two things from the physical link: write some bytes, and read
//! one newline terminated line. [`ByteLink`] captures that, [`SerialLink`] provides it over a
//! real serial port and [`SimLink`] provides a scripted device for tests.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, trace};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::{
    collections::VecDeque,
    io::{self, Read, Write},
    time::{Duration, Instant},
};

use crate::error::LinkError;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// How long a single read on the serial port may block before the deadline is rechecked.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Size of the chunk read from the port in one go.
const READ_CHUNK_SIZE: usize = 64;

/// Longest line held back waiting for a terminator. Longer runs are returned as a line as is.
pub const MAX_LINE_LEN: usize = 256;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A bidirectional byte stream to the rover.
pub trait ByteLink {
    /// Write all of `bytes` to the link.
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read one line from the link, without its `\n` or `\r\n` terminator.
    ///
    /// ## Returns
    /// - `Ok(Some(line))` once a full line has been received.
    /// - `Ok(None)` if the stream has ended.
    /// - An error of kind [`io::ErrorKind::TimedOut`] if `deadline` passes first. With no deadline
    ///   this blocks until a line arrives.
    fn read_line(&mut self, deadline: Option<Instant>) -> io::Result<Option<String>>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A [`ByteLink`] over a serial port.
pub struct SerialLink {
    port: Box<dyn SerialPort>,

    /// Bytes received but not yet returned as a line.
    pending: Vec<u8>,
}

/// Scripted in-memory link.
///
/// Inbound lines are queued up front (or pushed later), and everything written to the link is
/// recorded so it can be checked byte for byte.
#[derive(Debug, Default, Clone)]
pub struct SimLink {
    inbound: VecDeque<String>,

    written: Vec<u8>,

    lines_read: usize,

    /// Behave like a silent device rather than a closed one once the script runs out.
    stall_when_empty: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SerialLink {
    /// Open the serial port at `address` with 8N1 framing and no flow control.
    pub fn open(address: &str, baud_rate: u32) -> Result<Self, LinkError> {
        let port = serialport::new(address, baud_rate)
            .timeout(POLL_TIMEOUT)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .open()?;

        info!("Serial link opened on {} at {} baud", address, baud_rate);

        Ok(Self::from_port(port))
    }

    /// Wrap an already opened port.
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            pending: Vec::new(),
        }
    }
}

impl ByteLink for SerialLink {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        trace!("link tx: {:02X?}", bytes);
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn read_line(&mut self, deadline: Option<Instant>) -> io::Result<Option<String>> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            if let Some(line) = take_line(&mut self.pending) {
                return Ok(Some(line));
            }

            if let Some(d) = deadline {
                if Instant::now() >= d {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "line read timed out"));
                }
            }

            match self.port.read(&mut chunk) {
                // End of stream, hand back whatever partial line is left first
                Ok(0) => {
                    if self.pending.is_empty() {
                        return Ok(None);
                    }
                    let rest = std::mem::take(&mut self.pending);
                    return Ok(Some(String::from_utf8_lossy(&rest).into_owned()));
                }
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => (),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => (),
                Err(e) => return Err(e),
            }
        }
    }
}

impl SimLink {
    /// Create a link which will deliver `lines` in order and then report end of stream.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inbound: lines.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Create a link which delivers `lines` and then goes silent instead of closing.
    ///
    /// Once silent a read with a deadline times out. A read without a deadline would block
    /// forever on a real device, so it fails with [`io::ErrorKind::WouldBlock`] instead.
    pub fn stalling<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stall_when_empty: true,
            ..Self::new(lines)
        }
    }

    /// Queue another inbound line.
    pub fn push_line<S: Into<String>>(&mut self, line: S) {
        self.inbound.push_back(line.into());
    }

    /// Every byte written to the link so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Forget the bytes written so far.
    pub fn clear_written(&mut self) {
        self.written.clear();
    }

    /// Number of lines consumed by readers.
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Number of queued lines not yet read.
    pub fn lines_remaining(&self) -> usize {
        self.inbound.len()
    }
}

impl ByteLink for SimLink {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    fn read_line(&mut self, deadline: Option<Instant>) -> io::Result<Option<String>> {
        match self.inbound.pop_front() {
            Some(mut line) => {
                self.lines_read += 1;
                strip_terminator(&mut line);
                Ok(Some(line))
            }
            None if self.stall_when_empty => match deadline {
                Some(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "simulated device is silent")),
                None => Err(io::Error::new(io::ErrorKind::WouldBlock, "simulated device is silent")),
            },
            None => Ok(None),
        }
    }
}

impl<L: ByteLink + ?Sized> ByteLink for Box<L> {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_bytes(bytes)
    }

    fn read_line(&mut self, deadline: Option<Instant>) -> io::Result<Option<String>> {
        (**self).read_line(deadline)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Remove the first complete line from `buf`, if there is one.
///
/// Once `MAX_LINE_LEN` bytes arrive without a terminator they are returned as a line, so a
/// device sending noise (wrong baud rate, bootloader chatter) can't grow the buffer forever.
fn take_line(buf: &mut Vec<u8>) -> Option<String> {
    let end = match buf.iter().position(|&b| b == b'\n') {
        Some(pos) if pos < MAX_LINE_LEN => pos + 1,
        _ if buf.len() >= MAX_LINE_LEN => MAX_LINE_LEN,
        _ => return None,
    };
    let raw: Vec<u8> = buf.drain(..end).collect();
    let mut line = String::from_utf8_lossy(&raw).into_owned();
    strip_terminator(&mut line);
    Some(line)
}

fn strip_terminator(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
    }
    if line.ends_with('\r') {
        line.pop();
    }
}
