//! Byte-level link to the controller.
//!
//! The driver only needs five operations from a link: open, close, query
//! whether it is open, write bytes, and block until a delimiter has been read.
//! Serial ports, TCP bridges and the test mock all provide them.

use std::io::{self, Read};

use crate::errors::{DriverError, Result};
use crate::protocol::MAX_LINE_LEN;

/// A blocking, half-duplex link. One call completes before the next is issued.
pub trait Transport {
    /// Open the link.
    fn connect(&mut self) -> Result<()>;
    /// Close the link. Closing an already closed link is not an error.
    fn disconnect(&mut self) -> Result<()>;
    fn is_connected(&self) -> bool;
    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> Result<()>;
    /// Read until `delimiter` has been received. The returned bytes include it.
    fn read_until(&mut self, delimiter: &[u8]) -> Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read_until(&mut self, delimiter: &[u8]) -> Result<Vec<u8>> {
        (**self).read_until(delimiter)
    }
}

/// Read byte by byte from `reader` until the buffer ends with `delimiter`.
///
/// Read timeouts configured on the underlying stream surface as
/// [`DriverError::Timeout`]; a closed stream surfaces as an `UnexpectedEof` I/O error.
pub(crate) fn read_until_delimiter<R: Read + ?Sized>(
    reader: &mut R,
    delimiter: &[u8],
) -> Result<Vec<u8>> {
    if delimiter.is_empty() {
        return Err(DriverError::Protocol("empty read delimiter".into()));
    }

    let mut line = Vec::with_capacity(64);
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("link closed after {} bytes without a delimiter", line.len()),
                )
                .into());
            }
            Ok(_) => {
                line.push(byte[0]);
                if line.ends_with(delimiter) {
                    return Ok(line);
                }
                if line.len() > MAX_LINE_LEN {
                    return Err(DriverError::Protocol(format!(
                        "no delimiter within {MAX_LINE_LEN} bytes"
                    )));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e)
                if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock =>
            {
                return Err(DriverError::Timeout(format!(
                    "waiting for delimiter, {} bytes received",
                    line.len()
                )));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::protocol::CRLF;

    /// Reader that hands out its bytes and then reports a timeout.
    struct Stalling(Cursor<Vec<u8>>);

    impl Read for Stalling {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.read(buf)? {
                0 => Err(io::Error::from(io::ErrorKind::TimedOut)),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn stops_right_after_delimiter() {
        let mut input = Cursor::new(b"\x06\r\n80,1.0E-05\r\n".to_vec());
        assert_eq!(read_until_delimiter(&mut input, CRLF).unwrap(), b"\x06\r\n");
        assert_eq!(
            read_until_delimiter(&mut input, CRLF).unwrap(),
            b"80,1.0E-05\r\n"
        );
    }

    #[test]
    fn lone_cr_does_not_end_the_line() {
        let mut input = Cursor::new(b"a\rb\r\n".to_vec());
        assert_eq!(read_until_delimiter(&mut input, CRLF).unwrap(), b"a\rb\r\n");
    }

    #[test]
    fn eof_before_delimiter() {
        let mut input = Cursor::new(b"80,1.0".to_vec());
        match read_until_delimiter(&mut input, CRLF) {
            Err(DriverError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected EOF error, got {other:?}"),
        }
    }

    #[test]
    fn stream_timeout_maps_to_timeout() {
        let mut input = Stalling(Cursor::new(b"80,".to_vec()));
        assert!(matches!(
            read_until_delimiter(&mut input, CRLF),
            Err(DriverError::Timeout(_))
        ));
    }

    #[test]
    fn runaway_line_is_cut_off() {
        let mut input = Cursor::new(vec![b'x'; MAX_LINE_LEN + 10]);
        assert!(matches!(
            read_until_delimiter(&mut input, CRLF),
            Err(DriverError::Protocol(_))
        ));
    }

    #[test]
    fn empty_delimiter_is_refused() {
        let mut input = Cursor::new(b"abc".to_vec());
        assert!(read_until_delimiter(&mut input, b"").is_err());
    }
}
