use std::fmt;
use std::time::Duration;

use bytes::BytesMut;
use kissdigi_ax25::{info_crc, Header, Tnc2};
use tracing::{debug, trace};

use crate::arena::{Handle, PayloadArena};
use crate::error::{Result, TableError};

/// Index of a slot in a [`FrameTable`].
pub type SlotId = usize;

/// Default slot count.
pub const DEFAULT_SLOTS: usize = 8;

/// Default arena size: eight slots of 80 info bytes on average.
pub const DEFAULT_ARENA_CAPACITY: usize = DEFAULT_SLOTS * 80;

/// Default lifetime given to a freshly allocated slot, in ticks.
pub const DEFAULT_RECEIVE_TTL: u8 = 250;

/// Default bound on waiting for the shared table lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

/// Pipeline stage membership of a slot.
///
/// These are independent booleans, not a single state: a frame moves
/// through the stages by having flags set, and several may be set at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFlags {
    /// Slot allocated.
    pub used: bool,
    /// Frame content decoded or synthesized.
    pub valid: bool,
    pub admission: bool,
    pub forward: bool,
    pub transmit: bool,
    pub reclaim: bool,
}

impl QueueFlags {
    fn allocated() -> Self {
        Self {
            used: true,
            ..Self::default()
        }
    }
}

impl fmt::Display for QueueFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.used, "U"),
            (self.valid, "V"),
            (self.admission, "I"),
            (self.forward, "F"),
            (self.transmit, "T"),
            (self.reclaim, "Z"),
        ];
        for (set, letter) in flags {
            f.write_str(if set { letter } else { "-" })?;
        }
        Ok(())
    }
}

/// One in-flight frame.
#[derive(Debug, Default)]
pub struct FrameSlot {
    pub header: Header,
    /// Countdown in ticks; never goes below zero.
    pub lifetime: u8,
    pub flags: QueueFlags,
    info: Option<Handle>,
    info_crc: u16,
}

impl FrameSlot {
    /// CRC-16 of the information field as last stored.
    pub fn info_crc(&self) -> u16 {
        self.info_crc
    }

    /// Decrement the lifetime, stopping at zero.
    pub fn tick(&mut self) {
        self.lifetime = self.lifetime.saturating_sub(1);
    }
}

/// Sizing and timing knobs for a [`FrameTable`].
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Number of frame slots. Default: 8.
    pub slots: usize,
    /// Payload arena size in bytes. Default: 640.
    pub arena_capacity: usize,
    /// Lifetime assigned on `alloc`, in ticks. Default: 250.
    pub receive_ttl: u8,
    /// How long `SharedTable::lock` polls before giving up. Default: 1 s.
    pub lock_timeout: Duration,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            slots: DEFAULT_SLOTS,
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            receive_ttl: DEFAULT_RECEIVE_TTL,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

/// Fixed table of frame slots sharing one payload arena.
#[derive(Debug)]
pub struct FrameTable {
    slots: Vec<FrameSlot>,
    arena: PayloadArena,
    config: TableConfig,
}

impl FrameTable {
    /// Create a table with default sizing.
    pub fn new() -> Self {
        Self::with_config(TableConfig::default())
    }

    /// Create a table with explicit sizing.
    pub fn with_config(config: TableConfig) -> Self {
        Self {
            slots: (0..config.slots).map(|_| FrameSlot::default()).collect(),
            arena: PayloadArena::new(config.arena_capacity),
            config,
        }
    }

    /// Claim the first unused slot.
    pub fn alloc(&mut self) -> Result<SlotId> {
        let receive_ttl = self.config.receive_ttl;
        let Some((id, slot)) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| !slot.flags.used)
        else {
            return Err(TableError::NoSlotsAvailable);
        };
        if let Some(stale) = slot.info.take() {
            self.arena.free(stale)?;
        }
        slot.info_crc = 0;
        slot.lifetime = receive_ttl;
        slot.flags = QueueFlags::allocated();
        trace!(slot = id, "slot allocated");
        Ok(id)
    }

    /// Release a slot and its payload.
    pub fn free(&mut self, slot: SlotId) -> Result<()> {
        self.free_info(slot)?;
        let entry = self.slot_mut(slot)?;
        entry.flags = QueueFlags::default();
        entry.header = Header::default();
        trace!(slot, "slot freed");
        Ok(())
    }

    /// Replace the slot's information field and its CRC.
    ///
    /// Returns the number of bytes stored.
    pub fn set_info(&mut self, slot: SlotId, bytes: &[u8]) -> Result<usize> {
        self.free_info(slot)?;
        let handle = if bytes.is_empty() {
            None
        } else {
            Some(self.arena.allocate(bytes)?)
        };
        let entry = self.slot_mut(slot)?;
        entry.info = handle;
        entry.info_crc = info_crc(bytes);
        Ok(bytes.len())
    }

    /// The slot's information field (empty if none).
    pub fn info(&self, slot: SlotId) -> Result<&[u8]> {
        let entry = self.frame(slot)?;
        Ok(entry
            .info
            .as_ref()
            .map(|handle| self.arena.read(handle))
            .unwrap_or_default())
    }

    /// Release the slot's information field, compacting the arena.
    pub fn free_info(&mut self, slot: SlotId) -> Result<()> {
        let entry = self
            .slots
            .get_mut(slot)
            .ok_or(TableError::InvalidSlot(slot))?;
        entry.info_crc = 0;
        if let Some(handle) = entry.info.take() {
            self.arena.free(handle)?;
        }
        Ok(())
    }

    /// AX.25-decode `raw` into the slot and mark it for Admission.
    ///
    /// Returns the information field length. On error the slot keeps only
    /// its `used` flag; the caller is expected to free it.
    pub fn decode_into(&mut self, slot: SlotId, raw: &[u8]) -> Result<usize> {
        let (header, offset) = Header::decode(raw)?;
        let len = self.set_info(slot, &raw[offset..])?;
        let entry = self.slot_mut(slot)?;
        entry.header = header;
        entry.flags.valid = true;
        entry.flags.admission = true;
        debug!(
            slot,
            source = %entry.header.source,
            destination = %entry.header.destination,
            hops = entry.header.hops(),
            info_len = len,
            "frame decoded"
        );
        Ok(len)
    }

    /// Encode the slot back into a raw AX.25 frame.
    pub fn encode_from(&self, slot: SlotId) -> Result<BytesMut> {
        let entry = self.frame(slot)?;
        let info = self.info(slot)?;
        let mut dst = BytesMut::with_capacity(entry.header.encoded_len() + info.len());
        entry.header.encode_into(&mut dst);
        dst.extend_from_slice(info);
        Ok(dst)
    }

    pub fn frame(&self, slot: SlotId) -> Result<&FrameSlot> {
        self.slots.get(slot).ok_or(TableError::InvalidSlot(slot))
    }

    /// Mutable access to header, lifetime and flags.
    pub fn frame_mut(&mut self, slot: SlotId) -> Result<&mut FrameSlot> {
        self.slot_mut(slot)
    }

    fn slot_mut(&mut self, slot: SlotId) -> Result<&mut FrameSlot> {
        self.slots.get_mut(slot).ok_or(TableError::InvalidSlot(slot))
    }

    /// All slots with their ids, used or not.
    pub fn slots(&self) -> impl Iterator<Item = (SlotId, &FrameSlot)> {
        self.slots.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots currently allocated.
    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|s| s.flags.used).count()
    }

    pub fn arena(&self) -> &PayloadArena {
        &self.arena
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// One-line debug rendering: `[flags] SRC>DST,VIA:info`.
    pub fn describe(&self, slot: SlotId) -> Result<String> {
        let entry = self.frame(slot)?;
        let line = Tnc2 {
            header: &entry.header,
            info: self.info(slot)?,
        };
        Ok(format!("[{}] {line}", entry.flags))
    }
}

impl Default for FrameTable {
    fn default() -> Self {
        Self::new()
    }
}
