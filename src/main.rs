use std::path::PathBuf;
use std::process::exit;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use serde::Serialize;

use im540::logging::init_rust_logging;
use im540::{Im540, LinkConfig, Measurement, Offset, Status, Transport, DEFAULT_BAUD_RATE};

#[derive(Parser, Debug)]
#[command(name = "im540", about = "Query and configure an IM540 vacuum gauge controller")]
struct Args {
    /// Serial port of the controller
    #[arg(short, long, default_value = "/dev/ttyUSB0", global = true)]
    port: String,
    /// Baud rate of the serial port
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE, global = true)]
    baud: u32,
    /// Reach the controller through a serial-to-Ethernet bridge (host:port) instead
    #[arg(long, global = true)]
    tcp: Option<String>,
    /// JSON link configuration; overrides --port, --baud and --tcp
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Read/write timeout in milliseconds
    #[arg(long, default_value_t = 1000, global = true)]
    timeout_ms: u64,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read one channel
    Pressure { channel: u8 },
    /// Read every channel
    Pressures,
    /// Show or switch degassing
    Degas { state: Option<Switch> },
    /// Show or switch emission of a channel
    Emission { channel: u8, state: Option<Switch> },
    /// Show or set offset correction of a channel
    Offset {
        channel: u8,
        mode: Option<OffsetMode>,
    },
    /// Turn talk-only output on, print the pushed lines, then turn it off
    TalkOnly {
        /// Output period in seconds (0.1 to 60)
        period: f32,
        /// Number of lines to read before switching output off
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
    /// Show the talk-only period (0 when off)
    Rate,
    /// Send a raw command and print the reply
    Raw { command: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Switch {
    On,
    Off,
}

impl From<Switch> for Status {
    fn from(s: Switch) -> Self {
        match s {
            Switch::On => Status::On,
            Switch::Off => Status::Off,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OffsetMode {
    Ignore,
    Apply,
}

impl From<OffsetMode> for Offset {
    fn from(m: OffsetMode) -> Self {
        match m {
            OffsetMode::Ignore => Offset::Ignore,
            OffsetMode::Apply => Offset::Apply,
        }
    }
}

fn main() {
    init_rust_logging();
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        exit(1);
    }
}

fn link_config(args: &Args) -> Result<LinkConfig> {
    if let Some(path) = &args.config {
        return LinkConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()));
    }
    let mut config = match &args.tcp {
        Some(address) => LinkConfig::tcp(address.as_str()),
        None => LinkConfig::serial(args.port.as_str(), args.baud),
    };
    config.timeout_ms = args.timeout_ms;
    Ok(config)
}

fn emit<T: Serialize + std::fmt::Display>(json: bool, value: &T) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(value)?);
    } else {
        println!("{value}");
    }
    Ok(())
}

fn emit_all(json: bool, readings: &[Measurement]) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(readings)?);
    } else {
        for (i, reading) in readings.iter().enumerate() {
            println!("channel {}: {}", i + 1, reading);
        }
    }
    Ok(())
}

fn status_word(status: Status) -> &'static str {
    match status {
        Status::On => "on",
        Status::Off => "off",
        Status::NotSet => "unset",
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let config = link_config(&args)?;

    let mut gauge = Im540::from_config(&config)?;
    gauge
        .connect()
        .with_context(|| format!("connecting to {:?}", config.link))?;
    info!("connected: {:?}", config.link);

    let result = execute(&mut gauge, &args);
    gauge.disconnect()?;
    result
}

fn execute<T: Transport>(gauge: &mut Im540<T>, args: &Args) -> Result<()> {
    let json = args.json;
    match &args.command {
        Command::Pressure { channel } => {
            let reading = gauge
                .get_pressure(*channel)
                .with_context(|| format!("reading channel {channel}"))?;
            emit(json, &reading)?;
        }
        Command::Pressures => {
            let readings = gauge.get_pressures().context("reading all channels")?;
            emit_all(json, &readings)?;
        }
        Command::Degas { state: Some(state) } => {
            gauge.set_degassing((*state).into())?;
        }
        Command::Degas { state: None } => {
            emit(json, &status_word(gauge.get_degassing()?))?;
        }
        Command::Emission {
            channel,
            state: Some(state),
        } => {
            gauge.set_emission(*channel, (*state).into())?;
        }
        Command::Emission {
            channel,
            state: None,
        } => {
            emit(json, &status_word(gauge.get_emission(*channel)?))?;
        }
        Command::Offset {
            channel,
            mode: Some(mode),
        } => {
            gauge.set_offset(*channel, (*mode).into())?;
        }
        Command::Offset {
            channel,
            mode: None,
        } => {
            let word = match gauge.get_offset(*channel)? {
                Offset::Ignore => "ignore",
                Offset::Apply => "apply",
                Offset::IsRunning => "running",
            };
            emit(json, &word)?;
        }
        Command::TalkOnly { period, count } => {
            gauge.turn_talk_only_on(*period)?;
            let streamed = (0..*count).try_for_each(|_| {
                let readings = gauge.read_talk_only()?;
                emit_all(json, &readings)
            });
            // Output is switched off even when reading failed.
            gauge
                .turn_talk_only_off()
                .context("switching talk-only output off")?;
            streamed?;
        }
        Command::Rate => {
            emit(json, &gauge.get_talk_only_rate()?)?;
        }
        Command::Raw { command } => {
            emit(json, &gauge.request(command)?)?;
        }
    }
    Ok(())
}
