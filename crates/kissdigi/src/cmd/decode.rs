use std::io::Read;

use bytes::BytesMut;
use kissdigi_ax25::Ax25Frame;
use kissdigi_kiss::{KissDecoder, KissFrame};
use tracing::{debug, warn};

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, OutputFormat};

/// Frames and problems found in a capture.
#[derive(Debug, Default)]
struct Capture {
    frames: Vec<(u8, Ax25Frame)>,
    errors: usize,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = match &args.file {
        Some(path) => std::fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|err| io_error("failed reading stdin", err))?;
            buf
        }
    };

    let capture = decode_capture(&bytes, args.max_payload);
    for (port, frame) in &capture.frames {
        print_frame(frame, *port, format);
    }
    debug!(frames = capture.frames.len(), errors = capture.errors, "capture decoded");

    if capture.errors > 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

fn decode_capture(bytes: &[u8], max_payload: usize) -> Capture {
    let mut decoder = KissDecoder::new(max_payload);
    let mut src = BytesMut::from(bytes);
    let mut capture = Capture::default();
    loop {
        match decoder.decode(&mut src) {
            Ok(Some(KissFrame { port, payload })) => match Ax25Frame::decode(&payload) {
                Ok(frame) => capture.frames.push((port, frame)),
                Err(err) => {
                    warn!(error = %err, port, len = payload.len(), "undecodable AX.25 frame");
                    capture.errors += 1;
                }
            },
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "discarding KISS frame");
                capture.errors += 1;
            }
        }
    }
    if decoder.in_frame() {
        warn!("capture ends inside a frame");
        capture.errors += 1;
    }
    capture
}

#[cfg(test)]
mod tests {
    use super::*;
    use kissdigi_ax25::Header;
    use kissdigi_kiss::{encode_data, encode_frame, FEND};

    fn ui(info: &[u8]) -> Vec<u8> {
        Ax25Frame {
            header: Header::ui(
                "APRS".parse().unwrap(),
                "N0CALL".parse().unwrap(),
                Vec::new(),
            )
            .unwrap(),
            info: bytes::Bytes::copy_from_slice(info),
        }
        .encode()
        .to_vec()
    }

    #[test]
    fn decodes_every_frame_with_its_port() {
        let mut wire = BytesMut::new();
        encode_data(0, &ui(b"one"), &mut wire).unwrap();
        encode_data(3, &ui(&[FEND, b'x']), &mut wire).unwrap();

        let capture = decode_capture(&wire, 1024);
        assert_eq!(capture.errors, 0);
        assert_eq!(capture.frames.len(), 2);
        assert_eq!(capture.frames[1].0, 3);
        assert_eq!(capture.frames[1].1.info.as_ref(), &[FEND, b'x']);
    }

    #[test]
    fn counts_bad_frames_and_keeps_going() {
        let mut wire = BytesMut::new();
        encode_frame(b"\x10", 0x01, &mut wire);
        encode_data(0, b"short", &mut wire).unwrap();
        encode_data(1, b"", &mut wire).unwrap();
        encode_data(0, &ui(b"ok"), &mut wire).unwrap();
        wire.extend_from_slice(&[FEND, 0x00, 0x82]);

        let capture = decode_capture(&wire, 1024);
        assert_eq!(capture.frames.len(), 1);
        assert_eq!(capture.errors, 4);
    }
}
