use bytes::Bytes;
use kissdigi_ax25::{Ax25Frame, Header};
use kissdigi_kiss::{KissConfig, KissWriter};
use tracing::info;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{ax25_error, kiss_error, transport_error, CliResult, SUCCESS};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let timeout = parse_duration(&args.connect_timeout)?;
    let frame = build_frame(&args)?;

    let stream = args
        .endpoint
        .connect(Some(timeout))
        .map_err(|err| transport_error("connect failed", err))?;
    let mut writer = KissWriter::with_config_modem(
        stream,
        KissConfig {
            write_timeout: Some(timeout),
            ..KissConfig::default()
        },
    )
    .map_err(|err| kiss_error("connect failed", err))?;

    writer
        .send(args.port, &frame.encode())
        .map_err(|err| kiss_error("send failed", err))?;
    info!(frame = %frame, port = args.port, "frame sent");

    Ok(SUCCESS)
}

fn build_frame(args: &SendArgs) -> CliResult<Ax25Frame> {
    let header = Header::ui(args.to, args.from, args.via.clone())
        .map_err(|err| ax25_error("invalid path", err))?;
    Ok(Ax25Frame {
        header,
        info: Bytes::copy_from_slice(args.data.as_bytes()),
    })
}
