use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info};

use crate::errors::{DriverError, Result};
use crate::transport::{read_until_delimiter, Transport};

/// Link through a serial-to-Ethernet bridge that forwards the RS-232 bytes unchanged.
pub struct TcpTransport {
    address: String,
    timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: crate::serial::DEFAULT_TIMEOUT,
            stream: None,
        }
    }

    /// Timeout for connecting and for each read/write.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or(DriverError::NotConnected)
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let addr = self
            .address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| DriverError::Config(format!("{} did not resolve", self.address)))?;

        let stream = TcpStream::connect_timeout(&addr, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.set_nodelay(true)?;

        info!("tcp link open: address={}", addr);
        self.stream = Some(stream);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            // The peer may already have gone away; the socket is dropped either way.
            let _ = stream.shutdown(Shutdown::Both);
            info!("tcp link closed: address={}", self.address);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream()?;
        stream.write_all(data)?;
        stream.flush()?;
        debug!("tcp wrote {} bytes", data.len());
        Ok(())
    }

    fn read_until(&mut self, delimiter: &[u8]) -> Result<Vec<u8>> {
        let stream = self.stream()?;
        read_until_delimiter(stream, delimiter)
    }
}
