use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::ModemStream;

/// KISS over TCP.
///
/// Software modems and network TNCs expose KISS on a TCP port (8001 is the
/// common default). The link is a plain byte stream; no extra framing.
pub struct TcpModem;

impl TcpModem {
    /// Default KISS-over-TCP port.
    pub const DEFAULT_PORT: u16 = 8001;

    /// Connect to a KISS TCP endpoint (blocking).
    pub fn connect(addr: &str) -> Result<ModemStream> {
        Self::connect_timeout(addr, None)
    }

    /// Connect with an optional per-address connect timeout.
    ///
    /// Every resolved address is tried in order; the last failure is reported.
    pub fn connect_timeout(addr: &str, timeout: Option<Duration>) -> Result<ModemStream> {
        let addrs = addr.to_socket_addrs().map_err(|e| TransportError::Connect {
            endpoint: addr.to_string(),
            source: e,
        })?;

        let mut last_err = None;
        for sock_addr in addrs {
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(&sock_addr, timeout),
                None => TcpStream::connect(sock_addr),
            };
            match attempt {
                Ok(stream) => {
                    // KISS frames are small; don't let Nagle hold a frame back.
                    stream.set_nodelay(true)?;
                    debug!(%sock_addr, "connected to kiss tcp endpoint");
                    return Ok(ModemStream::from_tcp(stream));
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(TransportError::Connect {
            endpoint: addr.to_string(),
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "address resolved to no socket addresses",
                )
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn connect_and_exchange_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 3];
            conn.read_exact(&mut buf).unwrap();
            conn.write_all(&buf).unwrap();
        });

        let mut stream = TcpModem::connect(&addr).unwrap();
        assert_eq!(stream.transport_name(), "tcp");
        stream.write_all(&[0xC0, 0x00, 0xC0]).unwrap();
        let mut echoed = [0u8; 3];
        stream.read_exact(&mut echoed).unwrap();
        assert_eq!(echoed, [0xC0, 0x00, 0xC0]);

        handle.join().unwrap();
    }

    #[test]
    fn connect_refused_reports_endpoint() {
        // Bind then drop to get a port that is very likely closed.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };

        let err = TcpModem::connect_timeout(&addr, Some(Duration::from_millis(200))).unwrap_err();
        match err {
            TransportError::Connect { endpoint, .. } => assert_eq!(endpoint, addr),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cloned_stream_shares_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            conn.write_all(b"ok").unwrap();
        });

        let stream = TcpModem::connect(&addr).unwrap();
        let mut reader = stream.try_clone().unwrap();
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ok");

        handle.join().unwrap();
    }
}
