use crate::error::{Result, TableError};

/// Names one live region of a [`PayloadArena`].
///
/// Handles are indices into the arena's region table, never byte offsets,
/// so they stay valid while compaction moves the bytes. A handle is
/// consumed by [`PayloadArena::free`].
#[derive(Debug, PartialEq, Eq)]
pub struct Handle(usize);

#[derive(Debug, Clone, Copy)]
struct Region {
    offset: usize,
    len: usize,
}

/// Fixed-capacity byte pool with compaction on free.
///
/// Occupied regions are packed against the high end of the buffer; the
/// free space is always a single run at the low end, so an allocation
/// either fits or fails outright.
#[derive(Debug)]
pub struct PayloadArena {
    buf: Box<[u8]>,
    regions: Vec<Option<Region>>,
    free: usize,
}

impl PayloadArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            regions: Vec::new(),
            free: capacity,
        }
    }

    /// Copy `bytes` into a new region at the free/occupied boundary.
    pub fn allocate(&mut self, bytes: &[u8]) -> Result<Handle> {
        if bytes.len() > self.free {
            return Err(TableError::InsufficientSpace {
                requested: bytes.len(),
                free: self.free,
            });
        }
        let offset = self.free - bytes.len();
        self.buf[offset..self.free].copy_from_slice(bytes);
        self.free = offset;

        let region = Some(Region {
            offset,
            len: bytes.len(),
        });
        let index = match self.regions.iter().position(Option::is_none) {
            Some(index) => {
                self.regions[index] = region;
                index
            }
            None => {
                self.regions.push(region);
                self.regions.len() - 1
            }
        };
        Ok(Handle(index))
    }

    /// Release a region and close the gap it leaves.
    ///
    /// Regions below the freed one slide up by its length, keeping their
    /// relative order. Returns the number of bytes released.
    pub fn free(&mut self, handle: Handle) -> Result<usize> {
        let Some(region) = self.regions.get_mut(handle.0).and_then(Option::take) else {
            return Err(TableError::InvalidHandle);
        };
        let Region { offset, len } = region;
        if len > 0 {
            self.buf.copy_within(self.free..offset, self.free + len);
            for moved in self.regions.iter_mut().flatten() {
                if moved.offset <= offset {
                    moved.offset += len;
                }
            }
            self.free += len;
        }
        Ok(len)
    }

    /// Bytes of a live region. A stale handle reads as empty.
    pub fn read(&self, handle: &Handle) -> &[u8] {
        match self.regions.get(handle.0).copied().flatten() {
            Some(Region { offset, len }) => &self.buf[offset..offset + len],
            None => &[],
        }
    }

    /// Length of a live region.
    pub fn len_of(&self, handle: &Handle) -> usize {
        self.read(handle).len()
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn occupied(&self) -> usize {
        self.buf.len() - self.free
    }

    pub fn free_space(&self) -> usize {
        self.free
    }

    /// Live regions as `(offset, len)`, sorted by offset.
    pub fn regions(&self) -> Vec<(usize, usize)> {
        let mut out: Vec<_> = self
            .regions
            .iter()
            .flatten()
            .map(|r| (r.offset, r.len))
            .collect();
        out.sort_unstable();
        out
    }

    /// Whether live regions tile `[free_space, capacity)` with no gaps.
    pub fn is_packed(&self) -> bool {
        let mut cursor = self.free;
        for (offset, len) in self.regions() {
            if offset != cursor {
                return false;
            }
            cursor += len;
        }
        cursor == self.capacity()
    }
}
