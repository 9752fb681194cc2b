use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DigiError, Result};

/// Beacon entries a station can hold.
pub const MAX_BEACONS: usize = 8;

/// Minimum separation between two beacons after `reset`.
pub const RESPACE_WINDOW: Duration = Duration::from_secs(15);

/// Schedules further out than this are treated as stale.
pub const MAX_SCHEDULE_AHEAD: Duration = Duration::from_secs(60 * 60);

/// One configured beacon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    /// Seconds between transmissions; 0 sends once.
    pub interval_secs: u64,
    /// Seconds from start (or reset) to the first transmission.
    pub offset_secs: u64,
    /// Information field sent verbatim.
    pub text: String,
}

impl BeaconConfig {
    pub fn is_one_shot(&self) -> bool {
        self.interval_secs == 0
    }
}

#[derive(Debug, Clone)]
struct Beacon {
    config: BeaconConfig,
    /// `None` once a one-shot beacon has gone out.
    due: Option<Instant>,
}

/// Scheduled beacons, checked once per main-loop pass.
#[derive(Debug, Clone, Default)]
pub struct BeaconTable {
    entries: Vec<Beacon>,
}

impl BeaconTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from config and space the schedules.
    pub fn from_configs(configs: &[BeaconConfig], now: Instant) -> Result<Self> {
        let mut table = Self::new();
        for config in configs {
            table.add(config.clone(), now)?;
        }
        table.reset(now);
        Ok(table)
    }

    /// Add a beacon, first due `offset_secs` from `now`.
    pub fn add(&mut self, config: BeaconConfig, now: Instant) -> Result<usize> {
        if self.entries.len() >= MAX_BEACONS {
            return Err(DigiError::BeaconTableFull { max: MAX_BEACONS });
        }
        let due = Some(now + Duration::from_secs(config.offset_secs));
        self.entries.push(Beacon { config, due });
        Ok(self.entries.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// When beacon `index` next goes out, if ever.
    pub fn due(&self, index: usize) -> Option<Instant> {
        self.entries.get(index).and_then(|b| b.due)
    }

    /// Earliest pending beacon.
    pub fn next_due(&self) -> Option<Instant> {
        self.entries.iter().filter_map(|b| b.due).min()
    }

    /// Repair the schedule after a clock jump or at startup.
    ///
    /// Schedules in the past or more than an hour ahead restart from their
    /// offset. Any beacon within [`RESPACE_WINDOW`] of an earlier entry is
    /// pushed back until it clears every earlier one.
    pub fn reset(&mut self, now: Instant) {
        for beacon in &mut self.entries {
            if let Some(due) = beacon.due {
                if due < now || due > now + MAX_SCHEDULE_AHEAD {
                    beacon.due = Some(now + Duration::from_secs(beacon.config.offset_secs));
                }
            }
        }

        for i in 1..self.entries.len() {
            let Some(mut due) = self.entries[i].due else {
                continue;
            };
            loop {
                let clash = self.entries[..i]
                    .iter()
                    .filter_map(|b| b.due)
                    .filter(|&other| due.max(other) - due.min(other) < RESPACE_WINDOW)
                    .max();
                match clash {
                    Some(other) => due = other + RESPACE_WINDOW,
                    None => break,
                }
            }
            self.entries[i].due = Some(due);
        }
    }

    /// Send every beacon that is due.
    ///
    /// `send` returns whether the frame was queued. A beacon that could not
    /// be queued stays due and is tried again on the next pass. Returns the
    /// number sent.
    pub fn process(&mut self, now: Instant, mut send: impl FnMut(&str) -> bool) -> usize {
        let mut sent = 0;
        for (index, beacon) in self.entries.iter_mut().enumerate() {
            let Some(due) = beacon.due else { continue };
            if due > now || !send(&beacon.config.text) {
                continue;
            }
            sent += 1;
            beacon.due = if beacon.config.is_one_shot() {
                None
            } else {
                Some(now + Duration::from_secs(beacon.config.interval_secs))
            };
            debug!(index, next = ?beacon.due.map(|d| d - now), "beacon sent");
        }
        sent
    }
}
