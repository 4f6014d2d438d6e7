use std::io::Write;
use std::time::Duration;

use log::{debug, info, warn};
use serialport::{ClearBuffer, SerialPort};

use crate::errors::{DriverError, Result};
use crate::transport::{read_until_delimiter, Transport};

/// Factory default of the IM540 RS-232 interface.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default read timeout for serial operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// RS-232 link to the controller (8N1, no flow control).
///
/// The port is opened by [`Transport::connect`], not on construction.
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            timeout: DEFAULT_TIMEOUT,
            port: None,
        }
    }

    /// Set the read/write timeout applied when the port is opened.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(DriverError::NotConnected)
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }
        let port = serialport::new(&self.path, self.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(self.timeout)
            .open()?;

        // Stale bytes from an earlier session would be taken for the next reply.
        if let Err(e) = port.clear(ClearBuffer::All) {
            warn!("could not clear serial buffers on {}: {}", self.path, e);
        }

        info!(
            "serial link open: path={}, baud={}, timeout={:?}",
            self.path, self.baud_rate, self.timeout
        );
        self.port = Some(port);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            info!("serial link closed: path={}", self.path);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port()?;
        port.write_all(data)?;
        port.flush()?;
        debug!("serial wrote {} bytes", data.len());
        Ok(())
    }

    fn read_until(&mut self, delimiter: &[u8]) -> Result<Vec<u8>> {
        let port = self.port()?;
        read_until_delimiter(port, delimiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_before_connect_is_refused() {
        let mut link = SerialTransport::new("/dev/null-im540", DEFAULT_BAUD_RATE);
        assert!(!link.is_connected());
        assert!(matches!(link.write(b"PRX\r\n"), Err(DriverError::NotConnected)));
        assert!(matches!(link.read_until(b"\r\n"), Err(DriverError::NotConnected)));
        assert!(link.disconnect().is_ok());
    }

    #[test]
    fn builder_keeps_settings() {
        let link = SerialTransport::new("/dev/ttyUSB1", 19200).with_timeout(Duration::from_millis(250));
        assert_eq!(link.path(), "/dev/ttyUSB1");
        assert_eq!(link.baud_rate(), 19200);
        assert_eq!(link.timeout, Duration::from_millis(250));
    }
}
