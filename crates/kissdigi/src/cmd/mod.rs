use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use kissdigi_ax25::Address;
use kissdigi_transport::Endpoint;

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod config;
pub mod decode;
pub mod envinfo;
pub mod monitor;
pub mod run;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the digipeater against a TNC.
    Run(RunArgs),
    /// Print frames heard by a TNC.
    Monitor(MonitorArgs),
    /// Send a single UI frame.
    Send(SendArgs),
    /// Decode a captured KISS byte stream.
    Decode(DecodeArgs),
    /// Print the station configuration as JSON.
    Config(ConfigArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Config(args) => config::run(args),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// TNC endpoint: tcp://host:port, unix:/path or a socket path.
    pub endpoint: Endpoint,
    /// Station config file (JSON).
    #[arg(long, value_name = "FILE", env = "KISSDIGI_CONFIG")]
    pub config: Option<PathBuf>,
    /// Override the station callsign.
    #[arg(long, value_name = "CALL-SSID")]
    pub call: Option<Address>,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// TNC endpoint: tcp://host:port, unix:/path or a socket path.
    pub endpoint: Endpoint,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// TNC endpoint: tcp://host:port, unix:/path or a socket path.
    pub endpoint: Endpoint,
    /// Source callsign.
    #[arg(long, value_name = "CALL-SSID")]
    pub from: Address,
    /// Destination callsign.
    #[arg(long, value_name = "CALL-SSID")]
    pub to: Address,
    /// Digipeater path (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub via: Vec<Address>,
    /// Information field text.
    #[arg(long)]
    pub data: String,
    /// TNC port (0-15, except 12).
    #[arg(long, default_value = "0", value_parser = parse_kiss_port)]
    pub port: u8,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Captured KISS bytes. Reads stdin when omitted.
    pub file: Option<PathBuf>,
    /// Largest KISS payload accepted.
    #[arg(long, default_value_t = kissdigi_kiss::DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Load, validate and print this file instead of the defaults.
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}

fn parse_kiss_port(input: &str) -> Result<u8, String> {
    let port: u8 = input
        .parse()
        .map_err(|_| format!("invalid port number: {input}"))?;
    kissdigi_kiss::data_command(port)
        .map(|_| port)
        .map_err(|err| err.to_string())
}

pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }

    #[test]
    fn kiss_port_excludes_twelve() {
        assert_eq!(parse_kiss_port("11").unwrap(), 11);
        assert_eq!(parse_kiss_port("15").unwrap(), 15);
        assert_eq!(parse_kiss_port("12").unwrap_err(), "invalid kiss port 12");
        assert!(parse_kiss_port("16").is_err());
        assert!(parse_kiss_port("x").is_err());
    }
}
