use std::io::{Read, Write};
use std::net::TcpStream;

use crate::error::Result;

/// A connected modem link. Implements `Read + Write`.
///
/// This is the fundamental I/O type returned by transport operations.
/// The KISS reader and writer are generic over any `Read`/`Write`, but the
/// station runtime needs `try_clone` to split one link into a receive half
/// and a transmit half, which this type provides for every backend.
pub struct ModemStream {
    inner: ModemStreamInner,
}

enum ModemStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for ModemStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ModemStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            ModemStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ModemStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ModemStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            ModemStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            ModemStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            ModemStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl ModemStream {
    /// Wrap a connected TCP stream.
    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: ModemStreamInner::Tcp(stream),
        }
    }

    /// Wrap a connected Unix domain socket stream.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: ModemStreamInner::Unix(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            ModemStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            ModemStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            ModemStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            ModemStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            ModemStreamInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
            #[cfg(unix)]
            ModemStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
        }
    }

    /// Shut down both directions of the link.
    ///
    /// Unblocks a receive thread parked in `read` on a cloned handle.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            ModemStreamInner::Tcp(stream) => stream
                .shutdown(std::net::Shutdown::Both)
                .map_err(Into::into),
            #[cfg(unix)]
            ModemStreamInner::Unix(stream) => stream
                .shutdown(std::net::Shutdown::Both)
                .map_err(Into::into),
        }
    }

    /// Short transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            ModemStreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            ModemStreamInner::Unix(_) => "unix-domain-socket",
        }
    }
}

impl std::fmt::Debug for ModemStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            ModemStreamInner::Tcp(stream) => f
                .debug_struct("ModemStream")
                .field("type", &"tcp")
                .field("peer", &stream.peer_addr().ok())
                .finish(),
            #[cfg(unix)]
            ModemStreamInner::Unix(_) => f
                .debug_struct("ModemStream")
                .field("type", &"unix")
                .finish(),
        }
    }
}
