use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::{Result, TableError};
use crate::table::FrameTable;

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A [`FrameTable`] (with its arena) shared between the receive thread and
/// the tick loop.
///
/// `lock` polls rather than blocking indefinitely, so a stuck holder turns
/// into a `LockTimeout` error instead of a hang.
#[derive(Debug, Clone)]
pub struct SharedTable {
    inner: Arc<Mutex<FrameTable>>,
    lock_timeout: Duration,
}

impl SharedTable {
    /// Share `table`, using its configured lock timeout.
    pub fn new(table: FrameTable) -> Self {
        let lock_timeout = table.config().lock_timeout;
        Self {
            inner: Arc::new(Mutex::new(table)),
            lock_timeout,
        }
    }

    /// Acquire the table, polling every millisecond up to the lock timeout.
    pub fn lock(&self) -> Result<MutexGuard<'_, FrameTable>> {
        let started = Instant::now();
        loop {
            match self.inner.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(_)) => return Err(TableError::Poisoned),
                Err(TryLockError::WouldBlock) => {
                    let waited = started.elapsed();
                    if waited >= self.lock_timeout {
                        warn!(?waited, "frame table lock timed out");
                        return Err(TableError::LockTimeout { waited });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }

    /// Run `f` with the table locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut FrameTable) -> R) -> Result<R> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }
}
