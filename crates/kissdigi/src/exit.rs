use std::fmt;
use std::io;

use kissdigi_ax25::Ax25Error;
use kissdigi_digi::DigiError;
use kissdigi_kiss::KissError;
use kissdigi_table::TableError;
use kissdigi_transport::TransportError;

// Exit code constants aligned with rsfulmen/DDR-0002 semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::NotFound
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::InvalidEndpoint(_) | TransportError::PathTooLong { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn kiss_error(context: &str, err: KissError) -> CliError {
    match err {
        KissError::BadStream(source) => io_error(context, source),
        KissError::BadFrame { .. } | KissError::BufferOverflow { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        KissError::InvalidPort { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        KissError::ConnectionClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn ax25_error(context: &str, err: Ax25Error) -> CliError {
    match err {
        Ax25Error::InvalidCallsign(_) | Ax25Error::ViaOverflow { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn table_error(context: &str, err: TableError) -> CliError {
    match err {
        TableError::LockTimeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        TableError::Decode(err) => ax25_error(context, err),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn digi_error(context: &str, err: DigiError) -> CliError {
    match err {
        DigiError::Transport(err) => transport_error(context, err),
        DigiError::Kiss(err) => kiss_error(context, err),
        DigiError::Ax25(err) => ax25_error(context, err),
        DigiError::Table(err) => table_error(context, err),
        DigiError::ConfigIo { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        DigiError::ConfigParse(_) | DigiError::Config(_) | DigiError::BeaconTableFull { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        DigiError::ReceiverPanicked => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
