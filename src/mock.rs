//! Scripted transport for exercising the driver without hardware.
//!
//! [`MockTransport`] answers `read_until` calls from a queue of pre-loaded
//! lines and records every `write`. Individual writes or reads can be made to
//! fail, so each step of an exchange can be tested in isolation.
//!
//! ```
//! use im540::{Im540, MockTransport};
//!
//! let mut mock = MockTransport::new();
//! mock.push_line(b"\x06\r\n");
//! mock.push_line(b"01,1.5E-05\r\n");
//!
//! let mut gauge = Im540::new(mock);
//! let reading = gauge.get_pressure(1).unwrap();
//! assert!(reading.measurement_ok);
//! ```

use std::collections::VecDeque;
use std::io;

use crate::errors::{DriverError, Result};
use crate::transport::Transport;

#[derive(Debug)]
enum ScriptedRead {
    Line(Vec<u8>),
    Fail(io::ErrorKind),
}

#[derive(Debug)]
pub struct MockTransport {
    connected: bool,
    reads: VecDeque<ScriptedRead>,
    written: Vec<Vec<u8>>,
    read_count: usize,
    failing_write: Option<usize>,
    delimiters: Vec<Vec<u8>>,
}

impl MockTransport {
    /// A mock in the connected state with nothing scripted.
    pub fn new() -> Self {
        Self {
            connected: true,
            reads: VecDeque::new(),
            written: Vec::new(),
            read_count: 0,
            failing_write: None,
            delimiters: Vec::new(),
        }
    }

    /// A mock that reports itself disconnected until `connect` is called.
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new()
        }
    }

    /// Queue bytes to be returned by the next unanswered `read_until`.
    pub fn push_line(&mut self, line: &[u8]) -> &mut Self {
        self.reads.push_back(ScriptedRead::Line(line.to_vec()));
        self
    }

    /// Queue an I/O failure in place of a line.
    pub fn push_read_error(&mut self, kind: io::ErrorKind) -> &mut Self {
        self.reads.push_back(ScriptedRead::Fail(kind));
        self
    }

    /// Make the `n`-th write (zero based) fail with a broken pipe.
    pub fn fail_write(&mut self, n: usize) -> &mut Self {
        self.failing_write = Some(n);
        self
    }

    /// Every successful write, in order.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.written
    }

    pub fn write_count(&self) -> usize {
        self.written.len()
    }

    /// Number of `read_until` calls made, including failed ones.
    pub fn read_count(&self) -> usize {
        self.read_count
    }

    /// Delimiters passed to `read_until`, in order.
    pub fn delimiters(&self) -> &[Vec<u8>] {
        &self.delimiters
    }

    /// Scripted reads not consumed yet.
    pub fn remaining_reads(&self) -> usize {
        self.reads.len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(DriverError::NotConnected);
        }
        let attempt = self.written.len();
        if self.failing_write == Some(attempt) {
            self.failing_write = None;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted write failure").into());
        }
        self.written.push(data.to_vec());
        Ok(())
    }

    fn read_until(&mut self, delimiter: &[u8]) -> Result<Vec<u8>> {
        if !self.connected {
            return Err(DriverError::NotConnected);
        }
        self.read_count += 1;
        self.delimiters.push(delimiter.to_vec());
        match self.reads.pop_front() {
            Some(ScriptedRead::Line(line)) => Ok(line),
            Some(ScriptedRead::Fail(kind)) => {
                Err(io::Error::new(kind, "scripted read failure").into())
            }
            None => Err(DriverError::Timeout("no scripted reply left".into())),
        }
    }
}
