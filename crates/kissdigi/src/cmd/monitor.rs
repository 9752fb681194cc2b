use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kissdigi_ax25::Ax25Frame;
use kissdigi_kiss::{KissConfig, KissError, KissReader};
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, parse_duration, MonitorArgs};
use crate::exit::{kiss_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

const POLL_TIMEOUT: Duration = Duration::from_millis(250);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.connect_timeout)?;
    let stream = args
        .endpoint
        .connect(Some(timeout))
        .map_err(|err| transport_error("connect failed", err))?;
    let mut reader = KissReader::with_config_modem(
        stream,
        KissConfig {
            read_timeout: Some(POLL_TIMEOUT),
            ..KissConfig::default()
        },
    )
    .map_err(|err| kiss_error("connect failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(KissError::BadStream(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                continue
            }
            Err(KissError::ConnectionClosed) => {
                info!("TNC closed the link");
                break;
            }
            Err(err @ (KissError::BadFrame { .. } | KissError::BufferOverflow { .. })) => {
                warn!(error = %err, "discarding KISS frame");
                continue;
            }
            Err(err) => return Err(kiss_error("receive failed", err)),
        };

        let decoded = match Ax25Frame::decode(&frame.payload) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(error = %err, port = frame.port, len = frame.payload.len(), "undecodable AX.25 frame");
                continue;
            }
        };

        print_frame(&decoded, frame.port, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    Ok(SUCCESS)
}
