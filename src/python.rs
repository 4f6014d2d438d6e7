//! Python bindings, built with the `python` feature.

use pyo3::exceptions::{PyConnectionError, PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::config::LinkConfig;
use crate::errors::DriverError;
use crate::im540::Im540;
use crate::options::{Offset, Status};
use crate::readings::Measurement;
use crate::serial::DEFAULT_BAUD_RATE;
use crate::transport::Transport;

fn to_py_err(e: DriverError) -> PyErr {
    match e {
        DriverError::NotConnected | DriverError::Serial(_) => PyConnectionError::new_err(e.to_string()),
        DriverError::Io(_) | DriverError::Timeout(_) | DriverError::Stream { .. } => {
            PyIOError::new_err(e.to_string())
        }
        DriverError::OutOfRange { .. } | DriverError::Config(_) => PyValueError::new_err(e.to_string()),
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

fn parse_switch(state: &str) -> PyResult<Status> {
    match state.to_ascii_lowercase().as_str() {
        "on" | "1" => Ok(Status::On),
        "off" | "0" => Ok(Status::Off),
        other => Err(PyValueError::new_err(format!(
            "state must be 'on' or 'off', got {other:?}"
        ))),
    }
}

/// One gauge reading.
///
/// Attributes:
///     pressure: Pressure in the controller's configured unit.
///     measurement_ok, underflow, overflow, no_sensor, sensor_error,
///     emission_on, degassing_on, is_selected: Channel status flags.
#[pyclass(name = "Measurement", frozen, eq)]
#[derive(Clone, PartialEq)]
struct PyMeasurement {
    #[pyo3(get)]
    pressure: f64,
    #[pyo3(get)]
    measurement_ok: bool,
    #[pyo3(get)]
    underflow: bool,
    #[pyo3(get)]
    overflow: bool,
    #[pyo3(get)]
    no_sensor: bool,
    #[pyo3(get)]
    sensor_error: bool,
    #[pyo3(get)]
    emission_on: bool,
    #[pyo3(get)]
    degassing_on: bool,
    #[pyo3(get)]
    is_selected: bool,
}

impl From<Measurement> for PyMeasurement {
    fn from(m: Measurement) -> Self {
        PyMeasurement {
            pressure: m.pressure,
            measurement_ok: m.measurement_ok,
            underflow: m.underflow,
            overflow: m.overflow,
            no_sensor: m.no_sensor,
            sensor_error: m.sensor_error,
            emission_on: m.emission_on,
            degassing_on: m.degassing_on,
            is_selected: m.is_selected,
        }
    }
}

impl From<&PyMeasurement> for Measurement {
    fn from(m: &PyMeasurement) -> Self {
        Measurement {
            pressure: m.pressure,
            measurement_ok: m.measurement_ok,
            underflow: m.underflow,
            overflow: m.overflow,
            no_sensor: m.no_sensor,
            sensor_error: m.sensor_error,
            emission_on: m.emission_on,
            degassing_on: m.degassing_on,
            is_selected: m.is_selected,
        }
    }
}

#[pymethods]
impl PyMeasurement {
    fn __repr__(&self) -> String {
        format!(
            "Measurement(pressure={:e}, status={}, ok={})",
            self.pressure,
            Measurement::from(self).status_hex(),
            self.measurement_ok
        )
    }

    fn __str__(&self) -> String {
        Measurement::from(self).to_string()
    }

    /// Status byte as two hex digits, as sent by the controller.
    #[getter]
    fn status(&self) -> String {
        Measurement::from(self).status_hex()
    }

    /// Convert to dictionary for easy serialization.
    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new(py);
        dict.set_item("pressure", self.pressure)?;
        dict.set_item("measurement_ok", self.measurement_ok)?;
        dict.set_item("underflow", self.underflow)?;
        dict.set_item("overflow", self.overflow)?;
        dict.set_item("no_sensor", self.no_sensor)?;
        dict.set_item("sensor_error", self.sensor_error)?;
        dict.set_item("emission_on", self.emission_on)?;
        dict.set_item("degassing_on", self.degassing_on)?;
        dict.set_item("is_selected", self.is_selected)?;
        Ok(dict)
    }
}

/// IM540 gauge controller.
///
/// Example:
///     >>> gauge = Im540("/dev/ttyUSB0")
///     >>> gauge.pressure(1).pressure
///     1.5e-05
///     >>> gauge.set_emission(1, "off")
#[pyclass(name = "Im540", unsendable)]
struct PyIm540 {
    inner: Im540<Box<dyn Transport + Send>>,
}

impl PyIm540 {
    fn open(config: LinkConfig) -> PyResult<Self> {
        let mut inner = Im540::from_config(&config).map_err(to_py_err)?;
        inner.connect().map_err(to_py_err)?;
        Ok(PyIm540 { inner })
    }
}

#[pymethods]
impl PyIm540 {
    /// Open the controller on a serial port.
    ///
    /// Raises:
    ///     ConnectionError: If the port cannot be opened
    #[new]
    #[pyo3(signature = (path, baud_rate=DEFAULT_BAUD_RATE, timeout_ms=1000))]
    fn new(path: &str, baud_rate: u32, timeout_ms: u64) -> PyResult<Self> {
        let mut config = LinkConfig::serial(path, baud_rate);
        config.timeout_ms = timeout_ms;
        Self::open(config)
    }

    /// Open the controller behind a serial-to-Ethernet bridge (`host:port`).
    #[staticmethod]
    #[pyo3(signature = (address, timeout_ms=1000))]
    fn tcp(address: &str, timeout_ms: u64) -> PyResult<Self> {
        let mut config = LinkConfig::tcp(address);
        config.timeout_ms = timeout_ms;
        Self::open(config)
    }

    /// Open the controller described by a JSON link configuration file.
    #[staticmethod]
    fn from_config(path: &str) -> PyResult<Self> {
        Self::open(LinkConfig::from_file(path).map_err(to_py_err)?)
    }

    fn close(&mut self) -> PyResult<()> {
        self.inner.disconnect().map_err(to_py_err)
    }

    #[getter]
    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    /// Send a raw command and return the data line.
    fn request(&mut self, command: &str) -> PyResult<String> {
        self.inner.request(command).map_err(to_py_err)
    }

    /// Read one channel.
    fn pressure(&mut self, channel: u8) -> PyResult<PyMeasurement> {
        self.inner
            .get_pressure(channel)
            .map(PyMeasurement::from)
            .map_err(to_py_err)
    }

    /// Read every channel.
    fn pressures(&mut self) -> PyResult<Vec<PyMeasurement>> {
        self.inner
            .get_pressures()
            .map(|all| all.into_iter().map(PyMeasurement::from).collect())
            .map_err(to_py_err)
    }

    /// True while degassing is running.
    fn degassing(&mut self) -> PyResult<bool> {
        self.inner
            .get_degassing()
            .map(|s| s == Status::On)
            .map_err(to_py_err)
    }

    fn set_degassing(&mut self, state: &str) -> PyResult<()> {
        let state = parse_switch(state)?;
        self.inner.set_degassing(state).map_err(to_py_err)
    }

    fn emission(&mut self, channel: u8) -> PyResult<bool> {
        self.inner
            .get_emission(channel)
            .map(|s| s == Status::On)
            .map_err(to_py_err)
    }

    fn set_emission(&mut self, channel: u8, state: &str) -> PyResult<()> {
        let state = parse_switch(state)?;
        self.inner.set_emission(channel, state).map_err(to_py_err)
    }

    /// Offset correction state: "ignore", "apply" or "running".
    fn offset(&mut self, channel: u8) -> PyResult<&'static str> {
        self.inner
            .get_offset(channel)
            .map(|o| match o {
                Offset::Ignore => "ignore",
                Offset::Apply => "apply",
                Offset::IsRunning => "running",
            })
            .map_err(to_py_err)
    }

    /// Args:
    ///     apply: True to apply the stored offset, False to ignore it.
    fn set_offset(&mut self, channel: u8, apply: bool) -> PyResult<()> {
        let option = if apply { Offset::Apply } else { Offset::Ignore };
        self.inner.set_offset(channel, option).map_err(to_py_err)
    }

    /// Start talk-only output.
    ///
    /// Args:
    ///     period: Output period in seconds (0.1 to 60).
    ///
    /// Raises:
    ///     ValueError: If the period is out of range
    fn talk_only_on(&mut self, period: f32) -> PyResult<()> {
        self.inner.turn_talk_only_on(period).map_err(to_py_err)
    }

    fn talk_only_off(&mut self) -> PyResult<()> {
        self.inner.turn_talk_only_off().map_err(to_py_err)
    }

    fn talk_only_rate(&mut self) -> PyResult<f32> {
        self.inner.get_talk_only_rate().map_err(to_py_err)
    }

    /// Block for the next talk-only line.
    fn read_talk_only(&mut self) -> PyResult<Vec<PyMeasurement>> {
        self.inner
            .read_talk_only()
            .map(|all| all.into_iter().map(PyMeasurement::from).collect())
            .map_err(to_py_err)
    }

    fn __repr__(&self) -> String {
        format!("Im540(connected={})", self.inner.is_connected())
    }
}

/// Send Rust log output to stderr, level from `IM540_LOG`/`RUST_LOG`.
#[pyfunction]
fn init_logging() -> String {
    crate::logging::init_rust_logging().to_string()
}

#[pymodule]
fn im540(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyIm540>()?;
    m.add_class::<PyMeasurement>()?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;

    m.add("DEFAULT_BAUD_RATE", DEFAULT_BAUD_RATE)?;
    m.add("TALK_ONLY_MIN_PERIOD", crate::im540::TALK_ONLY_MIN_PERIOD)?;
    m.add("TALK_ONLY_MAX_PERIOD", crate::im540::TALK_ONLY_MAX_PERIOD)?;

    Ok(())
}
