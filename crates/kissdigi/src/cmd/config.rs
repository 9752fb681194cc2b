use kissdigi_digi::StationConfig;

use crate::cmd::ConfigArgs;
use crate::exit::{digi_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: ConfigArgs) -> CliResult<i32> {
    let config = match &args.file {
        Some(path) => StationConfig::load(path).map_err(|err| digi_error("config", err))?,
        None => StationConfig::default(),
    };
    let json = serde_json::to_string_pretty(&config)
        .map_err(|err| CliError::new(INTERNAL, format!("config serialization failed: {err}")))?;
    println!("{json}");
    Ok(SUCCESS)
}
