use std::collections::BTreeMap;

use kissdigi_digi::StationConfig;
use kissdigi_kiss::port::MAX_PORT;
use serde::Serialize;

use crate::cmd::EnvinfoArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_value, OutputFormat};

const ENV_VARS: [&str; 3] = ["KISSDIGI_CONFIG", "KISSDIGI_LOG_LEVEL", "RUST_LOG"];

/// Station limits a fresh `run` starts from.
#[derive(Serialize)]
struct StationDefaults {
    call: String,
    slots: usize,
    arena_bytes: usize,
    tick_ms: u64,
    receive_ttl: u8,
    transmit_ttl: u8,
    max_payload: usize,
    kiss_ports: Vec<u8>,
}

impl StationDefaults {
    fn current() -> Self {
        let config = StationConfig::default();
        Self {
            call: config.call.to_string(),
            slots: config.slots,
            arena_bytes: config.arena_bytes,
            tick_ms: config.tick_ms,
            receive_ttl: config.receive_ttl,
            transmit_ttl: config.transmit_ttl,
            max_payload: config.max_payload,
            kiss_ports: (0..=MAX_PORT)
                .filter(|&port| kissdigi_kiss::is_data_port(port))
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct EnvInfo {
    version: &'static str,
    target: &'static str,
    os: &'static str,
    arch: &'static str,
    features: Vec<&'static str>,
    defaults: StationDefaults,
    environment: BTreeMap<&'static str, Option<String>>,
}

impl EnvInfo {
    fn collect() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            target: option_env!("KISSDIGI_BUILD_TARGET").unwrap_or("unknown"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            features: active_features(),
            defaults: StationDefaults::current(),
            environment: ENV_VARS
                .iter()
                .map(|&name| (name, std::env::var(name).ok()))
                .collect(),
        }
    }
}

pub fn run(_args: EnvinfoArgs, format: OutputFormat) -> CliResult<i32> {
    print_value(
        "https://schemas.3leaps.dev/kissdigi/cli/v1/envinfo.schema.json",
        &EnvInfo::collect(),
        format,
    );
    Ok(SUCCESS)
}

fn active_features() -> Vec<&'static str> {
    let mut features = vec!["cli"];
    if cfg!(feature = "async") {
        features.push("async");
    }
    features
}
