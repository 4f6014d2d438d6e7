//! IM540 device driver.
//!
//! This module provides the typed command set of the Ionivac IM540 vacuum
//! gauge controller on top of the request/response exchange in
//! [`crate::engine`], plus the receive-only reader for talk-only mode.
//!
//! # Talk-only mode
//!
//! After [`Im540::turn_talk_only_on`] the controller pushes a pressure line
//! for every channel at the configured period without being polled. Those
//! lines are read with [`Im540::read_talk_only`]. Regular commands should not
//! be mixed in until [`Im540::turn_talk_only_off`] has been called; the driver
//! does not enforce this.

use std::time::Duration;

use log::{debug, info, warn};

use crate::config::{LinkConfig, DEFAULT_SERIAL_PATH};
use crate::engine;
use crate::errors::{DriverError, Result};
use crate::options::{Offset, Status};
use crate::protocol::{is_stream_error, printable, without_terminators, CRLF};
use crate::readings::{parse_measurements, Measurement};
use crate::serial::{SerialTransport, DEFAULT_BAUD_RATE};
use crate::tcp::TcpTransport;
use crate::transport::Transport;

// IM540 command mnemonics
const CMD_GET_DEGASSING: &str = "GDS";
const CMD_DEGASSING: &str = "DGS";
const CMD_EMISSION: &str = "EMI";
const CMD_OFFSET: &str = "OFC";
const CMD_PRESSURE: &str = "PRS";
const CMD_PRESSURES: &str = "PRX";
const CMD_TALK_ONLY: &str = "TRA";

/// Shortest talk-only output period, in seconds.
pub const TALK_ONLY_MIN_PERIOD: f32 = 0.1;
/// Longest talk-only output period, in seconds.
pub const TALK_ONLY_MAX_PERIOD: f32 = 60.0;

/// Reply of `TRA` once talk-only output is switched off.
const TALK_ONLY_OFF_REPLY: &str = "0.0";

/// IM540 device driver.
///
/// Owns its transport exclusively; every method takes `&mut self`, so at most
/// one exchange is in flight per driver. Share a driver between threads by
/// giving it a single owning worker.
///
/// # Example
/// ```ignore
/// let mut gauge = Im540::open_serial("/dev/ttyUSB0", 9600)?;
/// gauge.connect()?;
/// let reading = gauge.get_pressure(1)?;
/// println!("{:.2E} mbar, ok={}", reading.pressure, reading.measurement_ok);
/// ```
pub struct Im540<T: Transport> {
    transport: T,
    talk_only_period: Option<f32>,
}

impl Im540<SerialTransport> {
    /// Driver for a controller on a serial port. The port is opened by [`Im540::connect`].
    pub fn open_serial(path: &str, baud_rate: u32) -> Result<Self> {
        if path.is_empty() {
            return Err(DriverError::Config("serial port path is empty".into()));
        }
        Ok(Self::new(SerialTransport::new(path, baud_rate)))
    }
}

impl Im540<TcpTransport> {
    /// Driver for a controller behind a serial-to-Ethernet bridge.
    pub fn open_tcp(address: &str, timeout: Duration) -> Self {
        Self::new(TcpTransport::new(address).with_timeout(timeout))
    }
}

impl Im540<Box<dyn Transport + Send>> {
    /// Driver for whatever link `config` describes.
    pub fn from_config(config: &LinkConfig) -> Result<Self> {
        Ok(Self::new(config.open()?))
    }
}

impl Default for Im540<SerialTransport> {
    fn default() -> Self {
        Self::new(SerialTransport::new(DEFAULT_SERIAL_PATH, DEFAULT_BAUD_RATE))
    }
}

impl<T: Transport> Im540<T> {
    // ------------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------------

    pub fn new(transport: T) -> Self {
        Self {
            transport,
            talk_only_period: None,
        }
    }

    pub fn connect(&mut self) -> Result<()> {
        self.transport.connect()
    }

    pub fn disconnect(&mut self) -> Result<()> {
        self.talk_only_period = None;
        self.transport.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send one command and return the device's data line.
    ///
    /// The command is terminated with CR LF if needed. Fails with
    /// [`DriverError::NotConnected`] before any I/O when the link is down and
    /// with [`DriverError::Rejected`] when the device answers NAK.
    pub fn request(&mut self, command: &str) -> Result<String> {
        engine::exchange(&mut self.transport, command)
    }

    // ------------------------------------------------------------------------
    // Degassing / emission / offset
    // ------------------------------------------------------------------------

    /// Query whether degassing is running.
    pub fn get_degassing(&mut self) -> Result<Status> {
        let response = self.request(CMD_GET_DEGASSING)?;
        Ok(switch_state(&response))
    }

    /// Start or stop degassing.
    pub fn set_degassing(&mut self, option: Status) -> Result<()> {
        let command = format!("{CMD_DEGASSING},{option}");
        let response = self.request(&command)?;
        confirm(&command, &option.to_string(), &response)?;
        info!("degassing set to {:?}", option);
        Ok(())
    }

    /// Query the emission state of a channel.
    ///
    /// The reply may echo the channel before the state (`"1,1"`); the last
    /// field is taken as the state.
    pub fn get_emission(&mut self, channel: u8) -> Result<Status> {
        let response = self.request(&format!("{CMD_EMISSION},{channel}"))?;
        let state = response
            .rsplit(',')
            .next()
            .map(str::trim)
            .unwrap_or_default();
        Ok(switch_state(state))
    }

    /// Switch emission of a channel on or off.
    pub fn set_emission(&mut self, channel: u8, option: Status) -> Result<()> {
        let command = format!("{CMD_EMISSION},{channel},{option}");
        let response = self.request(&command)?;
        confirm(&command, &option.to_string(), &response)?;
        info!("emission on channel {} set to {:?}", channel, option);
        Ok(())
    }

    /// Query the offset correction state of a channel.
    pub fn get_offset(&mut self, channel: u8) -> Result<Offset> {
        let response = self.request(&format!("{CMD_OFFSET},{channel}"))?;
        Ok(match response.trim() {
            "1" => Offset::Apply,
            "2" => Offset::IsRunning,
            _ => Offset::Ignore,
        })
    }

    pub fn set_offset(&mut self, channel: u8, option: Offset) -> Result<()> {
        let command = format!("{CMD_OFFSET},{channel},{option}");
        let response = self.request(&command)?;
        confirm(&command, &option.to_string(), &response)?;
        info!("offset correction on channel {} set to {:?}", channel, option);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Pressure
    // ------------------------------------------------------------------------

    /// Read status and pressure of one sensor.
    pub fn get_pressure(&mut self, channel: u8) -> Result<Measurement> {
        let response = self.request(&format!("{CMD_PRESSURE},{channel}"))?;
        let measurements = parse_measurements(&response)?;
        if measurements.len() > 1 {
            debug!(
                "{},{} returned {} readings, using the first",
                CMD_PRESSURE,
                channel,
                measurements.len()
            );
        }
        measurements
            .into_iter()
            .next()
            .ok_or_else(|| {
                DriverError::Protocol(format!("{CMD_PRESSURE},{channel} returned no reading"))
            })
    }

    /// Read status and pressure of every sensor, in channel order.
    pub fn get_pressures(&mut self) -> Result<Vec<Measurement>> {
        let response = self.request(CMD_PRESSURES)?;
        parse_measurements(&response)
    }

    // ------------------------------------------------------------------------
    // Talk-only mode
    // ------------------------------------------------------------------------

    /// Start unsolicited output with the given period in seconds (0.1 to 60).
    pub fn turn_talk_only_on(&mut self, period: f32) -> Result<()> {
        if !(TALK_ONLY_MIN_PERIOD..=TALK_ONLY_MAX_PERIOD).contains(&period) {
            return Err(DriverError::OutOfRange {
                name: "period",
                value: period,
                min: TALK_ONLY_MIN_PERIOD,
                max: TALK_ONLY_MAX_PERIOD,
            });
        }
        self.request(&format!("{CMD_TALK_ONLY}, 0, {period:.1}"))?;
        self.talk_only_period = Some(period);
        info!("talk-only output on, period={:.1}s", period);
        Ok(())
    }

    /// Stop unsolicited output.
    pub fn turn_talk_only_off(&mut self) -> Result<()> {
        let command = format!("{CMD_TALK_ONLY}, 0, 0");
        let response = self.request(&command)?;
        confirm(&command, TALK_ONLY_OFF_REPLY, &response)?;
        self.talk_only_period = None;
        info!("talk-only output off");
        Ok(())
    }

    /// Current talk-only period in seconds; 0 when output is off.
    pub fn get_talk_only_rate(&mut self) -> Result<f32> {
        let response = self.request(&format!("{CMD_TALK_ONLY}, 0"))?;
        let trimmed = response.trim();
        trimmed
            .parse::<f32>()
            .map_err(|source| DriverError::InvalidNumber {
                input: trimmed.to_string(),
                source,
            })
    }

    /// Period set by the last successful [`Im540::turn_talk_only_on`], if output
    /// has not been switched off since.
    pub fn talk_only_period(&self) -> Option<f32> {
        self.talk_only_period
    }

    /// Block until the next talk-only line arrives and decode it.
    ///
    /// Reads directly from the transport: nothing is written and no ENQ is sent.
    pub fn read_talk_only(&mut self) -> Result<Vec<Measurement>> {
        let line = self.transport.read_until(CRLF)?;
        if is_stream_error(&line) {
            warn!("talk-only line carries NAK: {}", printable(&line));
            return Err(DriverError::Stream { raw: line });
        }
        parse_measurements(&without_terminators(&line))
    }
}

/// `"1"` means on; anything else is reported as off.
fn switch_state(response: &str) -> Status {
    if response.trim() == "1" {
        Status::On
    } else {
        Status::Off
    }
}

fn confirm(command: &str, expected: &str, received: &str) -> Result<()> {
    if received == expected {
        Ok(())
    } else {
        Err(DriverError::Confirmation {
            command: command.to_string(),
            expected: expected.to_string(),
            received: received.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::mock::MockTransport;
    use crate::protocol::{ENQ, NAK};

    const ACK_LINE: &[u8] = b"\x06\r\n";

    fn gauge_replying(data: &[u8]) -> Im540<MockTransport> {
        let mut mock = MockTransport::new();
        mock.push_line(ACK_LINE).push_line(data);
        Im540::new(mock)
    }

    fn sent_command(gauge: &Im540<MockTransport>) -> &[u8] {
        &gauge.transport().writes()[0]
    }

    #[test]
    fn degassing_query() {
        let mut gauge = gauge_replying(b"1\r\n");
        assert_eq!(gauge.get_degassing().unwrap(), Status::On);
        assert_eq!(sent_command(&gauge), b"GDS\r\n");

        let mut gauge = gauge_replying(b"0\r\n");
        assert_eq!(gauge.get_degassing().unwrap(), Status::Off);
    }

    #[test]
    fn set_degassing_confirms_echo() {
        let mut gauge = gauge_replying(b"1\r\n");
        gauge.set_degassing(Status::On).unwrap();
        assert_eq!(sent_command(&gauge), b"DGS,1\r\n");

        let mut gauge = gauge_replying(b"0\r\n");
        match gauge.set_degassing(Status::On) {
            Err(DriverError::Confirmation {
                expected, received, ..
            }) => {
                assert_eq!(expected, "1");
                assert_eq!(received, "0");
            }
            other => panic!("expected Confirmation, got {other:?}"),
        }
    }

    #[test]
    fn emission_query_uses_last_field() {
        let mut gauge = gauge_replying(b"2,1\r\n");
        assert_eq!(gauge.get_emission(2).unwrap(), Status::On);
        assert_eq!(sent_command(&gauge), b"EMI,2\r\n");

        let mut gauge = gauge_replying(b"0\r\n");
        assert_eq!(gauge.get_emission(1).unwrap(), Status::Off);
    }

    #[test]
    fn set_emission_formats_channel_and_state() {
        let mut gauge = gauge_replying(b"0\r\n");
        gauge.set_emission(2, Status::Off).unwrap();
        assert_eq!(sent_command(&gauge), b"EMI,2,0\r\n");
    }

    #[test]
    fn offset_states() {
        for (reply, expected) in [
            (&b"0\r\n"[..], Offset::Ignore),
            (&b"1\r\n"[..], Offset::Apply),
            (&b"2\r\n"[..], Offset::IsRunning),
        ] {
            let mut gauge = gauge_replying(reply);
            assert_eq!(gauge.get_offset(3).unwrap(), expected);
            assert_eq!(sent_command(&gauge), b"OFC,3\r\n");
        }
    }

    #[test]
    fn set_offset_confirms_echo() {
        let mut gauge = gauge_replying(b"1\r\n");
        gauge.set_offset(1, Offset::Apply).unwrap();
        assert_eq!(sent_command(&gauge), b"OFC,1,1\r\n");

        let mut gauge = gauge_replying(b"2\r\n");
        assert!(matches!(
            gauge.set_offset(1, Offset::Apply),
            Err(DriverError::Confirmation { .. })
        ));
    }

    #[test]
    fn single_pressure() {
        let mut gauge = gauge_replying(b"80,1.5E-05\r\n");
        let m = gauge.get_pressure(1).unwrap();
        assert_relative_eq!(m.pressure, 1.5e-5);
        assert!(m.is_selected);
        assert_eq!(sent_command(&gauge), b"PRS,1\r\n");
        assert_eq!(gauge.transport().writes()[1], vec![ENQ]);
    }

    #[test]
    fn all_pressures() {
        let mut gauge = gauge_replying(b"01,1.23E-05,08,0.0\r\n");
        let all = gauge.get_pressures().unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].measurement_ok);
        assert!(all[1].no_sensor);
        assert_eq!(sent_command(&gauge), b"PRX\r\n");
    }

    #[test]
    fn malformed_pressure_reply_is_an_error() {
        let mut gauge = gauge_replying(b"01\r\n");
        assert!(matches!(
            gauge.get_pressure(1),
            Err(DriverError::OddTokenCount(1))
        ));
    }

    #[test]
    fn talk_only_period_is_range_checked_before_io() {
        let mut gauge = Im540::new(MockTransport::new());
        for period in [0.05, 61.0, -1.0, f32::NAN] {
            assert!(matches!(
                gauge.turn_talk_only_on(period),
                Err(DriverError::OutOfRange { .. })
            ));
        }
        assert_eq!(gauge.transport().write_count(), 0);
        assert_eq!(gauge.talk_only_period(), None);
    }

    #[test]
    fn talk_only_on_formats_period() {
        let mut gauge = gauge_replying(b"2.5\r\n");
        gauge.turn_talk_only_on(2.5).unwrap();
        assert_eq!(sent_command(&gauge), b"TRA, 0, 2.5\r\n");
        assert_eq!(gauge.talk_only_period(), Some(2.5));
    }

    #[test]
    fn talk_only_bounds_are_inclusive() {
        let mut gauge = gauge_replying(b"0.1\r\n");
        gauge.turn_talk_only_on(0.1).unwrap();
        let mut gauge = gauge_replying(b"60.0\r\n");
        gauge.turn_talk_only_on(60.0).unwrap();
        assert_eq!(sent_command(&gauge), b"TRA, 0, 60.0\r\n");
    }

    #[test]
    fn talk_only_off_expects_zero() {
        let mut gauge = gauge_replying(b"0.0\r\n");
        gauge.turn_talk_only_off().unwrap();
        assert_eq!(sent_command(&gauge), b"TRA, 0, 0\r\n");

        let mut gauge = gauge_replying(b"0\r\n");
        assert!(matches!(
            gauge.turn_talk_only_off(),
            Err(DriverError::Confirmation { .. })
        ));
    }

    #[test]
    fn talk_only_rate() {
        let mut gauge = gauge_replying(b"1.5\r\n");
        assert_relative_eq!(gauge.get_talk_only_rate().unwrap(), 1.5);
        assert_eq!(sent_command(&gauge), b"TRA, 0\r\n");

        let mut gauge = gauge_replying(b"fast\r\n");
        assert!(matches!(
            gauge.get_talk_only_rate(),
            Err(DriverError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn talk_only_read_bypasses_exchange() {
        let mut mock = MockTransport::new();
        mock.push_line(b"80,1.0E-03,80,2.0E-03\r\n");
        let mut gauge = Im540::new(mock);
        let readings = gauge.read_talk_only().unwrap();
        assert_eq!(readings.len(), 2);
        assert_relative_eq!(readings[1].pressure, 2.0e-3);
        assert_eq!(gauge.transport().write_count(), 0);
        assert_eq!(gauge.transport().read_count(), 1);
    }

    #[test]
    fn talk_only_nak_line_is_a_stream_error() {
        let mut mock = MockTransport::new();
        mock.push_line(&[NAK, b'\n', b'\r', b'\n']);
        let mut gauge = Im540::new(mock);
        match gauge.read_talk_only() {
            Err(DriverError::Stream { raw }) => assert_eq!(raw, vec![NAK, b'\n', b'\r', b'\n']),
            other => panic!("expected Stream, got {other:?}"),
        }
    }

    #[test]
    fn rejected_command_reports_ack_text() {
        let mut mock = MockTransport::new();
        mock.push_line(b"\x15\r\n");
        let mut gauge = Im540::new(mock);
        assert!(matches!(
            gauge.set_degassing(Status::On),
            Err(DriverError::Rejected { .. })
        ));
    }

    #[test]
    fn disconnect_clears_talk_only_state() {
        let mut gauge = gauge_replying(b"1.0\r\n");
        gauge.turn_talk_only_on(1.0).unwrap();
        gauge.disconnect().unwrap();
        assert!(!gauge.is_connected());
        assert_eq!(gauge.talk_only_period(), None);
        assert!(matches!(
            gauge.get_pressures(),
            Err(DriverError::NotConnected)
        ));
    }

    #[test]
    fn transport_is_handed_back() {
        let mut gauge = gauge_replying(b"0\r\n");
        gauge.get_degassing().unwrap();
        let mock = gauge.into_transport();
        assert_eq!(mock.write_count(), 2);
        assert_eq!(mock.remaining_reads(), 0);
    }

    #[test]
    fn empty_serial_path_is_refused() {
        assert!(matches!(
            Im540::open_serial("", 9600),
            Err(DriverError::Config(_))
        ));
    }
}
