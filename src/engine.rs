//! The request/response exchange.
//!
//! Every command is a two-line conversation on a half-duplex line:
//!
//! ```text
//! host   -> "PRS,1" CR LF
//! device <- ACK CR LF          (NAK CR LF if the command is refused)
//! host   -> ENQ
//! device <- "80,1.23E-05" CR LF
//! ```
//!
//! The device holds the data line back until it is polled with ENQ, so the
//! host always reads the acknowledgment first. [`Exchange`] walks these steps
//! one state at a time. A failed step moves it to [`ExchangeState::Failed`],
//! from which no further I/O is done.

use log::{debug, trace, warn};

use crate::errors::{DriverError, Result};
use crate::protocol::{frame_command, is_rejection, printable, strip_terminator, CRLF, ENQ};
use crate::transport::Transport;

/// Progress of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// Nothing written yet.
    Idle,
    /// Command line written.
    Sent,
    /// Acknowledgment line received and accepted.
    AckRead,
    /// Enquiry byte written.
    EnquirySent,
    /// Data line received; the exchange is complete.
    PayloadRead,
    /// A step failed. The exchange is over and cannot be resumed.
    Failed,
}

/// A single command exchange over a borrowed transport.
///
/// The transport is held exclusively for the lifetime of the exchange, so a
/// second exchange cannot start on the same link until this one is dropped.
pub struct Exchange<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    command: Vec<u8>,
    state: ExchangeState,
    ack: Vec<u8>,
    payload: Vec<u8>,
}

impl<'a, T: Transport + ?Sized> Exchange<'a, T> {
    /// Prepare an exchange for `command`. The line terminator is appended if missing.
    pub fn new(transport: &'a mut T, command: &str) -> Self {
        Self {
            transport,
            command: frame_command(command),
            state: ExchangeState::Idle,
            ack: Vec::new(),
            payload: Vec::new(),
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// The framed command as it goes on the wire.
    pub fn command(&self) -> &[u8] {
        &self.command
    }

    /// Acknowledgment line as received, terminator included.
    pub fn ack(&self) -> &[u8] {
        &self.ack
    }

    /// Advance one state. Returns the new state.
    ///
    /// Any error moves the exchange to [`ExchangeState::Failed`]; stepping a
    /// failed exchange returns an error without touching the transport.
    pub fn step(&mut self) -> Result<ExchangeState> {
        match self.advance() {
            Ok(state) => {
                self.state = state;
                Ok(state)
            }
            Err(e) => {
                self.state = ExchangeState::Failed;
                Err(e)
            }
        }
    }

    fn advance(&mut self) -> Result<ExchangeState> {
        Ok(match self.state {
            ExchangeState::Idle => {
                if !self.transport.is_connected() {
                    return Err(DriverError::NotConnected);
                }
                trace!("tx {}", printable(&self.command));
                self.transport.write(&self.command)?;
                ExchangeState::Sent
            }
            ExchangeState::Sent => {
                self.ack = self.transport.read_until(CRLF)?;
                trace!("rx ack {}", printable(&self.ack));
                if is_rejection(&self.ack) {
                    let ack = String::from_utf8_lossy(&self.ack).into_owned();
                    warn!(
                        "device rejected {}: {}",
                        printable(strip_terminator(&self.command)),
                        printable(&self.ack)
                    );
                    return Err(DriverError::Rejected { ack });
                }
                ExchangeState::AckRead
            }
            ExchangeState::AckRead => {
                self.transport.write(&[ENQ])?;
                ExchangeState::EnquirySent
            }
            ExchangeState::EnquirySent => {
                self.payload = self.transport.read_until(CRLF)?;
                trace!("rx data {}", printable(&self.payload));
                ExchangeState::PayloadRead
            }
            ExchangeState::PayloadRead => ExchangeState::PayloadRead,
            ExchangeState::Failed => {
                return Err(DriverError::Protocol(format!(
                    "exchange for {} already failed",
                    printable(strip_terminator(&self.command))
                )));
            }
        })
    }

    /// Run the remaining steps and return the data line without its terminator.
    pub fn run(mut self) -> Result<String> {
        while self.state != ExchangeState::PayloadRead {
            self.step()?;
        }
        let payload = String::from_utf8_lossy(strip_terminator(&self.payload)).into_owned();
        debug!(
            "{} -> {}",
            printable(strip_terminator(&self.command)),
            printable(payload.as_bytes())
        );
        Ok(payload)
    }
}

/// Perform one complete exchange of `command` and return the reply payload.
pub fn exchange<T: Transport + ?Sized>(transport: &mut T, command: &str) -> Result<String> {
    Exchange::new(transport, command).run()
}
