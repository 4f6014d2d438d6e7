//! Link configuration.
//!
//! A gauge installation is described by a small JSON document:
//!
//! ```json
//! { "link": { "kind": "serial", "path": "/dev/ttyUSB0", "baud_rate": 9600 }, "timeout_ms": 1000 }
//! { "link": { "kind": "tcp", "address": "10.0.0.12:4001" } }
//! ```
//!
//! Missing fields take the factory defaults of the controller.

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{DriverError, Result};
use crate::serial::{SerialTransport, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT};
use crate::tcp::TcpTransport;
use crate::transport::Transport;

pub const DEFAULT_SERIAL_PATH: &str = "/dev/ttyUSB0";

fn default_path() -> String {
    DEFAULT_SERIAL_PATH.to_string()
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Link {
    Serial {
        #[serde(default = "default_path")]
        path: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
    Tcp {
        address: String,
    },
}

impl Default for Link {
    fn default() -> Self {
        Link::Serial {
            path: default_path(),
            baud_rate: default_baud_rate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(default)]
    pub link: Link,
    /// Read/write timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            link: Link::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl LinkConfig {
    pub fn serial(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            link: Link::Serial {
                path: path.into(),
                baud_rate,
            },
            ..Self::default()
        }
    }

    pub fn tcp(address: impl Into<String>) -> Self {
        Self {
            link: Link::Tcp {
                address: address.into(),
            },
            ..Self::default()
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| DriverError::Config(format!("invalid link configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| DriverError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config = Self::from_json_str(&text)?;
        debug!("loaded link configuration from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(DriverError::Config("timeout_ms must be positive".into()));
        }
        match &self.link {
            Link::Serial { path, .. } if path.is_empty() => {
                Err(DriverError::Config("serial path is empty".into()))
            }
            Link::Serial { baud_rate: 0, .. } => {
                Err(DriverError::Config("baud_rate must be positive".into()))
            }
            Link::Tcp { address } if address.is_empty() => {
                Err(DriverError::Config("tcp address is empty".into()))
            }
            _ => Ok(()),
        }
    }

    /// Build the transport this configuration describes. It is returned unconnected.
    pub fn open(&self) -> Result<Box<dyn Transport + Send>> {
        self.validate()?;
        let transport: Box<dyn Transport + Send> = match &self.link {
            Link::Serial { path, baud_rate } => {
                Box::new(SerialTransport::new(path.clone(), *baud_rate).with_timeout(self.timeout()))
            }
            Link::Tcp { address } => {
                Box::new(TcpTransport::new(address.clone()).with_timeout(self.timeout()))
            }
        };
        Ok(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_document() {
        let config = LinkConfig::from_json_str(
            r#"{"link":{"kind":"serial","path":"/dev/ttyS3","baud_rate":19200},"timeout_ms":250}"#,
        )
        .unwrap();
        assert_eq!(config, {
            let mut expected = LinkConfig::serial("/dev/ttyS3", 19200);
            expected.timeout_ms = 250;
            expected
        });
        assert_eq!(config.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn tcp_document_takes_default_timeout() {
        let config =
            LinkConfig::from_json_str(r#"{"link":{"kind":"tcp","address":"10.0.0.12:4001"}}"#)
                .unwrap();
        assert_eq!(config.link, Link::Tcp { address: "10.0.0.12:4001".into() });
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn empty_document_is_the_factory_default() {
        let config = LinkConfig::from_json_str("{}").unwrap();
        assert_eq!(config, LinkConfig::default());
        assert_eq!(
            config.link,
            Link::Serial {
                path: "/dev/ttyUSB0".into(),
                baud_rate: 9600
            }
        );
    }

    #[test]
    fn unknown_kind_is_a_config_error() {
        assert!(matches!(
            LinkConfig::from_json_str(r#"{"link":{"kind":"usb"}}"#),
            Err(DriverError::Config(_))
        ));
    }

    #[test]
    fn invalid_values_are_refused() {
        for text in [
            r#"{"timeout_ms":0}"#,
            r#"{"link":{"kind":"serial","path":""}}"#,
            r#"{"link":{"kind":"serial","baud_rate":0}}"#,
            r#"{"link":{"kind":"tcp","address":""}}"#,
        ] {
            assert!(
                matches!(LinkConfig::from_json_str(text), Err(DriverError::Config(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn round_trips_through_json() {
        let config = LinkConfig::tcp("gauge.lab:4001");
        let text = serde_json::to_string(&config).unwrap();
        assert!(text.contains(r#""kind":"tcp""#));
        assert_eq!(LinkConfig::from_json_str(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        assert!(matches!(
            LinkConfig::from_file("/nonexistent/im540.json"),
            Err(DriverError::Config(_))
        ));
    }

    #[test]
    fn open_returns_unconnected_transport() {
        let transport = LinkConfig::tcp("127.0.0.1:1").open().unwrap();
        assert!(!transport.is_connected());
    }
}
