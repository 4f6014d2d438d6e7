//! Decoding of pressure replies.
//!
//! A pressure reply is a comma-separated run of `status,pressure` pairs, one
//! pair per gauge channel, e.g. `80,1.23E-05,80,4.56E-06`. The status is two
//! hex digits forming an 8-bit flag field; the pressure is a decimal float in
//! whatever unit the controller is set to.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bits::{bits_to_hex, hex_to_bits};
use crate::errors::{DriverError, Result};

/// Bits in one status field.
const STATUS_BITS: usize = 8;

/// One gauge reading: pressure plus the channel status flags.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Measurement {
    pub pressure: f64,
    pub measurement_ok: bool,
    pub underflow: bool,
    pub overflow: bool,
    pub no_sensor: bool,
    pub sensor_error: bool,
    pub emission_on: bool,
    pub degassing_on: bool,
    pub is_selected: bool,
}

impl Measurement {
    /// Build a measurement from a decoded status field, bit 0 being the most significant.
    pub fn from_status_bits(pressure: f64, status: &[bool]) -> Result<Self> {
        if status.len() != STATUS_BITS {
            return Err(DriverError::StatusLength(status.len()));
        }
        Ok(Self {
            pressure,
            measurement_ok: status[7],
            underflow: status[6],
            overflow: status[5],
            no_sensor: status[4],
            sensor_error: status[3],
            emission_on: status[2],
            degassing_on: status[1],
            is_selected: status[0],
        })
    }

    /// The flags laid out in wire order, most significant bit first.
    pub fn status_bits(&self) -> [bool; STATUS_BITS] {
        [
            self.is_selected,
            self.degassing_on,
            self.emission_on,
            self.sensor_error,
            self.no_sensor,
            self.overflow,
            self.underflow,
            self.measurement_ok,
        ]
    }

    /// The status field as the device would send it, e.g. `"80"`.
    pub fn status_hex(&self) -> String {
        // Eight bits always fill two whole digits.
        bits_to_hex(&self.status_bits()).unwrap_or_default()
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3E} [{}]", self.pressure, self.status_hex())?;
        if !self.measurement_ok {
            f.write_str(" not ok")?;
        }
        if self.no_sensor {
            f.write_str(" no-sensor")?;
        }
        if self.sensor_error {
            f.write_str(" sensor-error")?;
        }
        if self.overflow {
            f.write_str(" overflow")?;
        }
        if self.underflow {
            f.write_str(" underflow")?;
        }
        Ok(())
    }
}

/// Decode a pressure reply into one [`Measurement`] per channel, in reply order.
///
/// The reply must hold a non-zero, even number of fields. Any malformed pair
/// fails the whole reply; no partial results are returned.
pub fn parse_measurements(reply: &str) -> Result<Vec<Measurement>> {
    let fields: Vec<&str> = reply.split(',').map(str::trim).collect();
    // An empty reply still splits into one (empty) field.
    if fields.len() % 2 != 0 {
        return Err(DriverError::OddTokenCount(fields.len()));
    }

    fields
        .chunks_exact(2)
        .map(|pair| {
            let status = hex_to_bits(pair[0])?;
            if status.len() != STATUS_BITS {
                return Err(DriverError::StatusLength(status.len()));
            }
            let pressure = pair[1]
                .parse::<f64>()
                .map_err(|source| DriverError::InvalidNumber {
                    input: pair[1].to_string(),
                    source,
                })?;
            Measurement::from_status_bits(pressure, &status)
        })
        .collect()
}
