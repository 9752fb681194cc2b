use kissdigi_digi::{Station, StationConfig};
use tracing::info;

use crate::cmd::{install_ctrlc_handler, parse_duration, RunArgs};
use crate::exit::{digi_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_value, OutputFormat};

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.connect_timeout)?;
    let config = load_config(&args)?;

    let mut station = Station::new(config).map_err(|err| digi_error("invalid config", err))?;
    install_ctrlc_handler(station.running())?;

    let stream = args
        .endpoint
        .connect(Some(timeout))
        .map_err(|err| transport_error("connect failed", err))?;
    info!(endpoint = %args.endpoint, "connected to TNC");

    let stats = station
        .run(stream)
        .map_err(|err| digi_error("station stopped", err))?;
    print_value(
        "https://schemas.3leaps.dev/kissdigi/cli/v1/run-summary.schema.json",
        &stats,
        format,
    );
    Ok(SUCCESS)
}

fn load_config(args: &RunArgs) -> CliResult<StationConfig> {
    let mut config = match &args.config {
        Some(path) => StationConfig::load(path).map_err(|err| digi_error("config", err))?,
        None => StationConfig::default(),
    };
    if let Some(call) = args.call {
        config.call = call;
    }
    config
        .validate()
        .map_err(|err| digi_error("invalid config", err))?;
    Ok(config)
}
