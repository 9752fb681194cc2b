use std::io::Read;
use std::path::Path;
use std::time::Duration;

use kissdigi_ax25::Address;
use kissdigi_kiss::{KissConfig, DEFAULT_MAX_PAYLOAD};
use kissdigi_table::TableConfig;
use serde::{Deserialize, Serialize};

use crate::beacon::{BeaconConfig, MAX_BEACONS};
use crate::digipeat::RepeatModes;
use crate::error::{DigiError, Result};
use crate::filter::FilterConfig;

/// Largest station config file `load` will read.
pub const MAX_CONFIG_FILE_SIZE: usize = 64 * 1024;

/// Most vias a synthesized frame may carry.
pub const MAX_DEFAULT_PATH: usize = 2;

/// Highest slot count a table may be configured with.
pub const MAX_SLOTS: usize = 127;

/// Everything the station runtime needs to know.
///
/// Missing fields take their defaults, so a config file only needs the
/// values it changes:
///
/// ```json
/// { "call": "VE1ABC-1", "path": ["WIDE1-1"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Our callsign and SSID.
    pub call: Address,
    /// Destination (tocall) of frames we originate.
    pub destination: Address,
    /// Vias of frames we originate.
    pub path: Vec<Address>,
    pub repeat: RepeatModes,
    pub filter: FilterConfig,
    /// Pipeline tick period in milliseconds. Default: 100.
    pub tick_ms: u64,
    /// Lifetime of a received frame, in ticks. Default: 250.
    pub receive_ttl: u8,
    /// Delay before a digipeated frame is sent, in ticks. Default: 20.
    pub transmit_ttl: u8,
    /// Frame table slots. Default: 8.
    pub slots: usize,
    /// Payload arena size in bytes. Default: 640.
    pub arena_bytes: usize,
    /// Bound on waiting for the frame table lock. Default: 1000.
    pub lock_timeout_ms: u64,
    /// TNC port for outbound frames. Port 12 is rejected: its data command
    /// byte collides with FEND.
    pub kiss_port: u8,
    /// Largest KISS payload accepted from the modem.
    pub max_payload: usize,
    pub beacons: Vec<BeaconConfig>,
}

impl Default for StationConfig {
    fn default() -> Self {
        let table = TableConfig::default();
        Self {
            call: Address::new("N0CALL", 0).unwrap_or_default(),
            destination: Address::new("APZKDG", 0).unwrap_or_default(),
            path: Address::new("WIDE2", 1).into_iter().collect(),
            repeat: RepeatModes::default(),
            filter: FilterConfig::default(),
            tick_ms: 100,
            receive_ttl: table.receive_ttl,
            transmit_ttl: 20,
            slots: table.slots,
            arena_bytes: table.arena_capacity,
            lock_timeout_ms: 1_000,
            kiss_port: 0,
            max_payload: DEFAULT_MAX_PAYLOAD,
            beacons: Vec::new(),
        }
    }
}

impl StationConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let io_err = |source| DigiError::ConfigIo {
            path: path.to_path_buf(),
            source,
        };
        let file = std::fs::File::open(path).map_err(io_err)?;
        let len = file.metadata().map_err(io_err)?.len();
        if len > MAX_CONFIG_FILE_SIZE as u64 {
            return Err(DigiError::Config(format!(
                "config file too large ({len} bytes): {}",
                path.display()
            )));
        }

        let mut content = String::new();
        file.take(MAX_CONFIG_FILE_SIZE as u64 + 1)
            .read_to_string(&mut content)
            .map_err(io_err)?;
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(DigiError::Config(format!(
                "config file too large while reading: {}",
                path.display()
            )));
        }
        Self::from_json(&content)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(DigiError::Config(msg));
        if self.call.callsign().is_empty() {
            return fail("call must be set".into());
        }
        if self.call.is_repeated() || self.destination.is_repeated() {
            return fail("call and destination must not carry a repeated mark".into());
        }
        if self.path.len() > MAX_DEFAULT_PATH {
            return fail(format!(
                "path has {} vias; at most {MAX_DEFAULT_PATH} allowed",
                self.path.len()
            ));
        }
        if self.receive_ttl == 0 || self.transmit_ttl == 0 {
            return fail("receive_ttl and transmit_ttl must be greater than zero".into());
        }
        if self.tick_ms == 0 {
            return fail("tick_ms must be greater than zero".into());
        }
        if !(1..=MAX_SLOTS).contains(&self.slots) {
            return fail(format!("slots must be in 1..={MAX_SLOTS}, got {}", self.slots));
        }
        if !kissdigi_kiss::is_data_port(self.kiss_port) {
            return fail(format!("kiss_port {} cannot carry data frames", self.kiss_port));
        }
        if self.beacons.len() > MAX_BEACONS {
            return fail(format!(
                "{} beacons configured; at most {MAX_BEACONS} allowed",
                self.beacons.len()
            ));
        }
        if let Some(empty) = self.beacons.iter().position(|b| b.text.is_empty()) {
            return fail(format!("beacon {empty} has no text"));
        }
        Ok(())
    }

    /// Sizing for the frame table.
    pub fn table_config(&self) -> TableConfig {
        TableConfig {
            slots: self.slots,
            arena_capacity: self.arena_bytes,
            receive_ttl: self.receive_ttl,
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
        }
    }

    /// KISS reader limits. The read timeout lets the receive thread notice
    /// shutdown while the modem is quiet.
    pub fn kiss_config(&self) -> KissConfig {
        KissConfig {
            max_payload_size: self.max_payload,
            read_timeout: Some(Duration::from_millis(250)),
            write_timeout: Some(Duration::from_secs(5)),
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
