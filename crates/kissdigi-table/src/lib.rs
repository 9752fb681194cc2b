//! In-flight frame storage for the digipeater.
//!
//! A fixed number of [`FrameSlot`]s hold decoded AX.25 headers and pipeline
//! state. Their information fields live in one [`PayloadArena`] that
//! compacts on free, and the whole table is shared through a
//! [`SharedTable`] whose lock polls with a bounded wait.

pub mod arena;
pub mod error;
pub mod shared;
pub mod table;

pub use arena::{Handle, PayloadArena};
pub use error::{Result, TableError};
pub use shared::SharedTable;
pub use table::{
    FrameSlot, FrameTable, QueueFlags, SlotId, TableConfig, DEFAULT_ARENA_CAPACITY,
    DEFAULT_LOCK_TIMEOUT, DEFAULT_RECEIVE_TTL, DEFAULT_SLOTS,
};
