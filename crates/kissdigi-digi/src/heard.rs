use std::time::{Duration, Instant};

use kissdigi_ax25::Address;

/// Stations tracked at once.
pub const HEARD_SLOTS: usize = 12;

/// Hourly buckets kept per station.
pub const HEARD_HOURS: usize = 8;

const HOUR: Duration = Duration::from_secs(60 * 60);

/// Entries silent this long are dropped.
pub const HEARD_EXPIRY: Duration = Duration::from_secs(60 * 60 * HEARD_HOURS as u64);

/// Traffic seen from one source address.
#[derive(Debug, Clone)]
pub struct HeardEntry {
    pub station: Address,
    /// Frames heard per hour; index 0 is the current hour.
    pub heard: [u32; HEARD_HOURS],
    /// Of those, frames with no repeated via.
    pub direct: [u32; HEARD_HOURS],
    pub last_heard: Instant,
    bucket_start: Instant,
}

impl HeardEntry {
    fn new(station: Address, now: Instant) -> Self {
        Self {
            station,
            heard: [0; HEARD_HOURS],
            direct: [0; HEARD_HOURS],
            last_heard: now,
            bucket_start: now,
        }
    }

    pub fn total_heard(&self) -> u32 {
        self.heard.iter().sum()
    }

    pub fn total_direct(&self) -> u32 {
        self.direct.iter().sum()
    }

    /// Shift buckets forward for every whole hour since the current one began.
    fn roll(&mut self, now: Instant) {
        while now.saturating_duration_since(self.bucket_start) >= HOUR {
            self.heard.copy_within(..HEARD_HOURS - 1, 1);
            self.direct.copy_within(..HEARD_HOURS - 1, 1);
            self.heard[0] = 0;
            self.direct[0] = 0;
            self.bucket_start += HOUR;
        }
    }
}

/// Recently heard stations, fed from admitted frames.
#[derive(Debug, Clone, Default)]
pub struct HeardList {
    entries: Vec<HeardEntry>,
}

impl HeardList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a frame from `station`. Returns false if the list is full
    /// and the station is not already on it.
    pub fn record(&mut self, station: &Address, direct: bool, now: Instant) -> bool {
        let key = station.with_repeated(false);
        let index = match self.entries.iter().position(|e| e.station.same_station(&key)) {
            Some(index) => index,
            None if self.entries.len() < HEARD_SLOTS => {
                self.entries.push(HeardEntry::new(key, now));
                self.entries.len() - 1
            }
            None => return false,
        };
        let entry = &mut self.entries[index];
        entry.roll(now);
        entry.heard[0] += 1;
        if direct {
            entry.direct[0] += 1;
        }
        entry.last_heard = now;
        true
    }

    /// Expire silent stations and roll hourly buckets.
    pub fn refresh(&mut self, now: Instant) {
        self.entries
            .retain(|e| now.saturating_duration_since(e.last_heard) < HEARD_EXPIRY);
        for entry in &mut self.entries {
            entry.roll(now);
        }
    }

    pub fn get(&self, station: &Address) -> Option<&HeardEntry> {
        self.entries.iter().find(|e| e.station.same_station(station))
    }

    pub fn entries(&self) -> &[HeardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(text: &str) -> Address {
        text.parse().unwrap()
    }

    #[test]
    fn counts_heard_and_direct() {
        let now = Instant::now();
        let mut list = HeardList::new();
        assert!(list.record(&addr("N0CALL-5"), true, now));
        assert!(list.record(&addr("N0CALL-5"), false, now));

        let entry = list.get(&addr("N0CALL-5")).unwrap();
        assert_eq!(entry.heard[0], 2);
        assert_eq!(entry.direct[0], 1);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn ssid_distinguishes_stations() {
        let now = Instant::now();
        let mut list = HeardList::new();
        list.record(&addr("N0CALL-5"), true, now);
        list.record(&addr("N0CALL-6"), true, now);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn full_list_refuses_new_stations() {
        let now = Instant::now();
        let mut list = HeardList::new();
        for ssid in 0..HEARD_SLOTS as u8 {
            assert!(list.record(&Address::new("N0CALL", ssid).unwrap(), true, now));
        }
        assert!(!list.record(&addr("OTHER"), true, now));
        assert!(list.record(&addr("N0CALL-3"), true, now));
    }

    #[test]
    fn buckets_roll_hourly() {
        let start = Instant::now();
        let mut list = HeardList::new();
        list.record(&addr("N0CALL"), true, start);
        list.record(&addr("N0CALL"), false, start + HOUR + Duration::from_secs(1));

        let entry = list.get(&addr("N0CALL")).unwrap();
        assert_eq!(entry.heard[..3], [1, 1, 0]);
        assert_eq!(entry.direct[..3], [0, 1, 0]);
        assert_eq!(entry.total_heard(), 2);
        assert_eq!(entry.total_direct(), 1);

        list.refresh(start + HOUR * 3);
        let entry = list.get(&addr("N0CALL")).unwrap();
        assert_eq!(entry.heard[..4], [0, 0, 1, 1]);
    }

    #[test]
    fn silent_stations_expire() {
        let start = Instant::now();
        let mut list = HeardList::new();
        list.record(&addr("OLD"), true, start);
        list.record(&addr("NEW"), true, start + HOUR * 2);

        list.refresh(start + HEARD_EXPIRY - Duration::from_secs(1));
        assert_eq!(list.len(), 2);
        list.refresh(start + HEARD_EXPIRY);
        assert_eq!(list.len(), 1);
        assert!(list.get(&addr("NEW")).is_some());
    }
}
