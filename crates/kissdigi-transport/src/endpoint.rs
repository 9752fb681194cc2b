use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::stream::ModemStream;
use crate::tcp::TcpModem;

/// Where the KISS TNC lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `tcp://host:port`
    Tcp(String),
    /// `unix:/path/to/socket` or a bare path.
    Unix(PathBuf),
}

impl Endpoint {
    /// Connect to the endpoint (blocking).
    pub fn connect(&self, timeout: Option<Duration>) -> Result<ModemStream> {
        match self {
            Endpoint::Tcp(addr) => TcpModem::connect_timeout(addr, timeout),
            #[cfg(unix)]
            Endpoint::Unix(path) => crate::uds::UnixDomainSocket::connect(path),
            #[cfg(not(unix))]
            Endpoint::Unix(path) => Err(TransportError::Unsupported(format!(
                "unix socket {}",
                path.display()
            ))),
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TransportError::InvalidEndpoint(input.to_string()));
        }

        if let Some(rest) = input.strip_prefix("tcp://") {
            if rest.is_empty() {
                return Err(TransportError::InvalidEndpoint(input.to_string()));
            }
            // A bare host gets the conventional KISS port.
            if rest.rsplit_once(':').is_none() {
                return Ok(Endpoint::Tcp(format!("{rest}:{}", TcpModem::DEFAULT_PORT)));
            }
            return Ok(Endpoint::Tcp(rest.to_string()));
        }

        if let Some(rest) = input.strip_prefix("unix:") {
            if rest.is_empty() {
                return Err(TransportError::InvalidEndpoint(input.to_string()));
            }
            return Ok(Endpoint::Unix(PathBuf::from(rest)));
        }

        if input.contains("://") {
            return Err(TransportError::InvalidEndpoint(input.to_string()));
        }

        Ok(Endpoint::Unix(PathBuf::from(input)))
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tcp_with_port() {
        let ep: Endpoint = "tcp://127.0.0.1:8001".parse().unwrap();
        assert_eq!(ep, Endpoint::Tcp("127.0.0.1:8001".to_string()));
    }

    #[test]
    fn tcp_without_port_uses_kiss_default() {
        let ep: Endpoint = "tcp://tnc.local".parse().unwrap();
        assert_eq!(ep, Endpoint::Tcp("tnc.local:8001".to_string()));
    }

    #[test]
    fn parses_unix_forms() {
        let ep: Endpoint = "unix:/tmp/tnc.sock".parse().unwrap();
        assert_eq!(ep, Endpoint::Unix(PathBuf::from("/tmp/tnc.sock")));

        let bare: Endpoint = "/tmp/tnc.sock".parse().unwrap();
        assert_eq!(bare, ep);
    }

    #[test]
    fn rejects_unknown_scheme_and_empty() {
        assert!(matches!(
            "serial:///dev/ttyUSB0".parse::<Endpoint>(),
            Err(TransportError::InvalidEndpoint(_))
        ));
        assert!("".parse::<Endpoint>().is_err());
        assert!("tcp://".parse::<Endpoint>().is_err());
    }

    #[test]
    fn display_roundtrips() {
        for text in ["tcp://localhost:8001", "unix:/tmp/a.sock"] {
            let ep: Endpoint = text.parse().unwrap();
            assert_eq!(ep.to_string(), text);
        }
    }
}
