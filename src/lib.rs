//! Driver for the Leybold Ionivac IM540 vacuum gauge controller.
//!
//! The controller is reached over RS-232 (or a serial-to-Ethernet bridge) and
//! speaks a line-based ASCII protocol with ACK/NAK/ENQ handshaking. This crate
//! provides:
//!
//! - the framing and exchange state machine ([`protocol`], [`engine`]),
//! - decoders for pressure and status replies ([`bits`], [`readings`]),
//! - the typed command set and the talk-only reader ([`Im540`]),
//! - serial, TCP and scripted transports ([`transport`]),
//! - optional Python bindings (`python` feature).
//!
//! # Example
//!
//! ```no_run
//! use im540::{Im540, Status};
//!
//! # fn main() -> im540::Result<()> {
//! let mut gauge = Im540::open_serial("/dev/ttyUSB0", 9600)?;
//! gauge.connect()?;
//! for (channel, reading) in gauge.get_pressures()?.iter().enumerate() {
//!     println!("channel {}: {}", channel + 1, reading);
//! }
//! gauge.set_emission(1, Status::Off)?;
//! # Ok(())
//! # }
//! ```

pub mod bits;
pub mod config;
pub mod engine;
mod errors;
mod im540;
pub mod logging;
mod mock;
pub mod options;
pub mod protocol;
mod readings;
mod serial;
mod tcp;
pub mod transport;

#[cfg(feature = "python")]
mod python;

pub use config::{Link, LinkConfig};
pub use engine::{exchange, Exchange, ExchangeState};
pub use errors::*;
pub use im540::{Im540, TALK_ONLY_MAX_PERIOD, TALK_ONLY_MIN_PERIOD};
pub use mock::MockTransport;
pub use options::{
    AmplifierRange, AnodeVoltage, AutoOffset, BayardCurrent, CathodeVoltage, Ctr,
    EmissionCurrent, InterfaceBoard, MainFrequency, Offset, ResetOptions, Resolution, Status,
};
pub use readings::{parse_measurements, Measurement};
pub use serial::{SerialTransport, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT};
pub use tcp::TcpTransport;
pub use transport::Transport;
